// Catalog
pub mod brands;
pub mod categories;
pub mod products;

// Site configuration
pub mod settings;

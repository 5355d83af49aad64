pub mod brands;
pub mod categories;
pub mod common;
pub mod products;
pub mod settings;

use crate::db::DbPool;
use crate::services::{
    brands::BrandService, categories::CategoryService, products::ProductService,
    settings::SettingService,
};
use std::sync::Arc;

// Re-export AppState so handler modules can import it as crate::handlers::AppState
pub use crate::AppState;

/// Services layer that encapsulates business logic used by HTTP handlers
#[derive(Clone)]
pub struct AppServices {
    pub categories: Arc<CategoryService>,
    pub products: Arc<ProductService>,
    pub brands: Arc<BrandService>,
    pub settings: Arc<SettingService>,
}

impl AppServices {
    pub fn new(db_pool: Arc<DbPool>) -> Self {
        Self {
            categories: Arc::new(CategoryService::new(db_pool.clone())),
            products: Arc::new(ProductService::new(db_pool.clone())),
            brands: Arc::new(BrandService::new(db_pool.clone())),
            settings: Arc::new(SettingService::new(db_pool)),
        }
    }
}

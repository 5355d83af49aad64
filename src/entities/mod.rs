pub mod brand;
pub mod brand_category;
pub mod category;
pub mod product;
pub mod product_detail;
pub mod product_image;
pub mod role;
pub mod setting;
pub mod user;
pub mod user_role;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Product entity
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize, Validate)]
#[sea_orm(table_name = "products")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    /// Product name, unique across the catalog
    #[sea_orm(unique, column_type = "String(StringLen::N(256))")]
    #[validate(length(
        min = 1,
        max = 256,
        message = "Product name must be between 1 and 256 characters"
    ))]
    pub name: String,

    /// URL alias; derived from the name when left blank
    #[sea_orm(unique, column_type = "String(StringLen::N(256))")]
    #[validate(length(min = 1, max = 256, message = "Alias must be between 1 and 256 characters"))]
    pub alias: String,

    #[sea_orm(column_type = "String(StringLen::N(512))")]
    #[validate(length(max = 512, message = "Short description cannot exceed 512 characters"))]
    pub short_description: String,

    #[sea_orm(column_type = "String(StringLen::N(4096))")]
    #[validate(length(max = 4096, message = "Full description cannot exceed 4096 characters"))]
    pub full_description: String,

    pub created_time: DateTime<Utc>,
    pub updated_time: DateTime<Utc>,

    pub enabled: bool,
    pub in_stock: bool,

    pub cost: Decimal,
    pub price: Decimal,
    pub discount_percent: Decimal,

    pub length: Decimal,
    pub width: Decimal,
    pub height: Decimal,
    pub weight: Decimal,

    /// File name of the main image inside `product-images/<id>/`
    #[sea_orm(nullable)]
    pub main_image: Option<String>,

    pub category_id: Option<i32>,
    pub brand_id: Option<i32>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::category::Entity",
        from = "Column::CategoryId",
        to = "super::category::Column::Id"
    )]
    Category,
    #[sea_orm(
        belongs_to = "super::brand::Entity",
        from = "Column::BrandId",
        to = "super::brand::Column::Id"
    )]
    Brand,
    #[sea_orm(has_many = "super::product_image::Entity")]
    Images,
    #[sea_orm(has_many = "super::product_detail::Entity")]
    Details,
}

impl Related<super::category::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Category.def()
    }
}

impl Related<super::brand::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Brand.def()
    }
}

impl Related<super::product_image::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Images.def()
    }
}

impl Related<super::product_detail::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Details.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// Path the admin pages use to display the main image
    pub fn main_image_path(&self) -> Option<String> {
        self.main_image.as_ref().map(|image| {
            format!("/{}/{}/{}", crate::storage::PRODUCT_IMAGES_DIR, self.id, image)
        })
    }
}

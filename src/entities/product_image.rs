use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Extra image attached to a product, stored under `product-images/<id>/extras/`
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "product_images")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    #[sea_orm(column_type = "String(StringLen::N(256))")]
    pub name: String,
    pub product_id: i32,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::product::Entity",
        from = "Column::ProductId",
        to = "super::product::Column::Id",
        on_delete = "Cascade"
    )]
    Product,
}

impl Related<super::product::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Product.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    pub fn image_path(&self) -> String {
        format!(
            "/{}/{}/{}/{}",
            crate::storage::PRODUCT_IMAGES_DIR,
            self.product_id,
            crate::storage::EXTRAS_DIR,
            self.name
        )
    }
}

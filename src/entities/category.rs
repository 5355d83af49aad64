use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Product category. The hierarchy is stored only as `parent_id`; tree
/// views are assembled by the service from a lookup table.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "categories")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    #[sea_orm(unique, column_type = "String(StringLen::N(128))")]
    pub name: String,
    #[sea_orm(column_type = "String(StringLen::N(64))")]
    pub alias: String,
    #[sea_orm(column_type = "String(StringLen::N(128))", nullable)]
    pub image: Option<String>,
    pub enabled: bool,
    pub parent_id: Option<i32>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(belongs_to = "Entity", from = "Column::ParentId", to = "Column::Id")]
    Parent,
    #[sea_orm(has_many = "super::product::Entity")]
    Products,
    #[sea_orm(has_many = "super::brand_category::Entity")]
    BrandCategories,
}

impl Related<super::product::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Products.def()
    }
}

impl Related<super::brand::Entity> for Entity {
    fn to() -> RelationDef {
        super::brand_category::Relation::Brand.def()
    }

    fn via() -> Option<RelationDef> {
        Some(super::brand_category::Relation::Category.def().rev())
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// Path the admin pages use to display the category image
    pub fn image_path(&self) -> Option<String> {
        self.image
            .as_ref()
            .map(|image| format!("/{}/{}/{}", crate::storage::CATEGORY_IMAGES_DIR, self.id, image))
    }
}

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "brands")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    #[sea_orm(unique, column_type = "String(StringLen::N(45))")]
    pub name: String,
    #[sea_orm(column_type = "String(StringLen::N(128))", nullable)]
    pub logo: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::brand_category::Entity")]
    BrandCategories,
    #[sea_orm(has_many = "super::product::Entity")]
    Products,
}

impl Related<super::category::Entity> for Entity {
    fn to() -> RelationDef {
        super::brand_category::Relation::Category.def()
    }

    fn via() -> Option<RelationDef> {
        Some(super::brand_category::Relation::Brand.def().rev())
    }
}

impl Related<super::product::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Products.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    pub fn logo_path(&self) -> Option<String> {
        self.logo
            .as_ref()
            .map(|logo| format!("/{}/{}/{}", crate::storage::BRAND_LOGOS_DIR, self.id, logo))
    }
}

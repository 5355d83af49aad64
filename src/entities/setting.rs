use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Site-wide key/value setting
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "settings")]
pub struct Model {
    #[sea_orm(
        primary_key,
        auto_increment = false,
        column_type = "String(StringLen::N(128))"
    )]
    pub key: String,
    #[sea_orm(column_type = "String(StringLen::N(1024))")]
    pub value: String,
    pub category: SettingCategory,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

/// Maximum stored length of a setting value
pub const MAX_VALUE_LENGTH: usize = 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumIter, DeriveActiveEnum)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(45))")]
pub enum SettingCategory {
    #[sea_orm(string_value = "GENERAL")]
    General,
    #[sea_orm(string_value = "MAIL_SERVER")]
    MailServer,
    #[sea_orm(string_value = "MAIL_TEMPLATES")]
    MailTemplates,
    #[sea_orm(string_value = "CURRENCY")]
    Currency,
    #[sea_orm(string_value = "PAYMENT")]
    Payment,
}

impl SettingCategory {
    pub fn label(&self) -> &'static str {
        match self {
            SettingCategory::General => "General",
            SettingCategory::MailServer => "Mail Server",
            SettingCategory::MailTemplates => "Mail Templates",
            SettingCategory::Currency => "Currency",
            SettingCategory::Payment => "Payment",
        }
    }
}

use crate::{
    db::DbPool,
    entities::setting::{
        self, Column as SettingColumn, Entity as Setting, SettingCategory, MAX_VALUE_LENGTH,
    },
    errors::ServiceError,
};
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, QueryOrder, Set, TransactionTrait};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info, instrument};

/// Rows created on first start when missing
pub const DEFAULT_SETTINGS: &[(&str, &str, SettingCategory)] = &[
    ("SITE_NAME", "Shopme", SettingCategory::General),
    ("SITE_LOGO", "/images/ShopmeAdminSmall.png", SettingCategory::General),
    ("COPYRIGHT", "Copyright (C) Shopme Ltd.", SettingCategory::General),
    ("CURRENCY_ID", "1", SettingCategory::Currency),
    ("CURRENCY_SYMBOL", "$", SettingCategory::Currency),
    ("CURRENCY_SYMBOL_POSITION", "before", SettingCategory::Currency),
    ("DECIMAL_POINT_TYPE", "POINT", SettingCategory::Currency),
    ("DECIMAL_DIGITS", "2", SettingCategory::Currency),
    ("THOUSANDS_POINT_TYPE", "COMMA", SettingCategory::Currency),
    ("MAIL_HOST", "smtp.example.com", SettingCategory::MailServer),
    ("MAIL_PORT", "587", SettingCategory::MailServer),
    ("MAIL_USERNAME", "", SettingCategory::MailServer),
    ("MAIL_PASSWORD", "", SettingCategory::MailServer),
    ("MAIL_FROM", "no-reply@example.com", SettingCategory::MailServer),
    ("MAIL_SENDER_NAME", "Shopme", SettingCategory::MailServer),
    ("SMTP_AUTH", "true", SettingCategory::MailServer),
    ("SMTP_SECURED", "true", SettingCategory::MailServer),
];

/// Service for managing site settings
#[derive(Clone)]
pub struct SettingService {
    db_pool: Arc<DbPool>,
}

impl SettingService {
    pub fn new(db_pool: Arc<DbPool>) -> Self {
        Self { db_pool }
    }

    #[instrument(skip(self))]
    pub async fn list_all(&self) -> Result<Vec<setting::Model>, ServiceError> {
        let db = &*self.db_pool;
        Ok(Setting::find()
            .order_by_asc(SettingColumn::Key)
            .all(db)
            .await?)
    }

    #[instrument(skip(self))]
    pub async fn list_by_categories(
        &self,
        categories: &[SettingCategory],
    ) -> Result<Vec<setting::Model>, ServiceError> {
        let db = &*self.db_pool;
        Ok(Setting::find()
            .filter(SettingColumn::Category.is_in(categories.iter().copied()))
            .order_by_asc(SettingColumn::Key)
            .all(db)
            .await?)
    }

    /// Updates the values of existing keys; unknown keys are ignored.
    /// Returns the number of settings written.
    #[instrument(skip(self, values), fields(submitted = values.len()))]
    pub async fn save_values(&self, values: Vec<(String, String)>) -> Result<usize, ServiceError> {
        if let Some((key, _)) = values
            .iter()
            .find(|(_, value)| value.chars().count() > MAX_VALUE_LENGTH)
        {
            return Err(ServiceError::ValidationError(format!(
                "The value of {} cannot exceed {} characters",
                key, MAX_VALUE_LENGTH
            )));
        }

        let db = &*self.db_pool;
        let txn = db.begin().await?;
        let mut updated = 0;

        for (key, value) in values {
            let Some(existing) = Setting::find_by_id(key.clone()).one(&txn).await? else {
                debug!(key = %key, "Ignoring unknown setting");
                continue;
            };
            if existing.value == value {
                continue;
            }
            let mut active: setting::ActiveModel = existing.into();
            active.value = Set(value);
            active.update(&txn).await?;
            updated += 1;
        }

        txn.commit().await?;
        info!(updated, "Settings saved");
        Ok(updated)
    }

    /// Inserts the default rows that are not present yet.
    #[instrument(skip(self))]
    pub async fn ensure_defaults(&self) -> Result<usize, ServiceError> {
        let db = &*self.db_pool;
        let existing: HashSet<String> = Setting::find()
            .all(db)
            .await?
            .into_iter()
            .map(|s| s.key)
            .collect();

        let mut inserted = 0;
        for (key, value, category) in DEFAULT_SETTINGS {
            if existing.contains(*key) {
                continue;
            }
            setting::ActiveModel {
                key: Set((*key).to_string()),
                value: Set((*value).to_string()),
                category: Set(*category),
            }
            .insert(db)
            .await?;
            inserted += 1;
        }

        if inserted > 0 {
            info!(inserted, "Default settings created");
        }
        Ok(inserted)
    }
}

use crate::{
    db::DbPool,
    entities::{
        brand::{self, Column as BrandColumn, Entity as Brand},
        brand_category::{self, Column as LinkColumn, Entity as BrandCategory},
        category::{self, Column as CategoryColumn, Entity as Category},
    },
    errors::ServiceError,
};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, ModelTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set, TransactionTrait,
};
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use tracing::{info, instrument};
use validator::Validate;

/// Brand form submission
#[derive(Debug, Clone, Default, Validate)]
pub struct BrandInput {
    pub id: Option<i32>,
    #[validate(length(
        min = 1,
        max = 45,
        message = "Brand name must be between 1 and 45 characters"
    ))]
    pub name: String,
    pub category_ids: Vec<i32>,
    /// Sanitized name of a newly uploaded logo
    pub logo: Option<String>,
}

#[derive(Debug, Clone)]
pub struct BrandWithCategories {
    pub brand: brand::Model,
    pub categories: Vec<category::Model>,
}

impl BrandWithCategories {
    pub fn category_ids(&self) -> Vec<i32> {
        self.categories.iter().map(|c| c.id).collect()
    }
}

/// Service for managing brands
#[derive(Clone)]
pub struct BrandService {
    db_pool: Arc<DbPool>,
}

impl BrandService {
    pub fn new(db_pool: Arc<DbPool>) -> Self {
        Self { db_pool }
    }

    /// Brands sorted by name, each with its linked categories
    #[instrument(skip(self))]
    pub async fn list_all(&self) -> Result<Vec<BrandWithCategories>, ServiceError> {
        let db = &*self.db_pool;
        let brands = Brand::find()
            .order_by_asc(BrandColumn::Name)
            .all(db)
            .await?;
        let categories: HashMap<i32, category::Model> = Category::find()
            .all(db)
            .await?
            .into_iter()
            .map(|c| (c.id, c))
            .collect();

        let mut links: HashMap<i32, Vec<category::Model>> = HashMap::new();
        for link in BrandCategory::find().all(db).await? {
            if let Some(category) = categories.get(&link.category_id) {
                links.entry(link.brand_id).or_default().push(category.clone());
            }
        }

        Ok(brands
            .into_iter()
            .map(|brand| {
                let mut categories = links.remove(&brand.id).unwrap_or_default();
                categories.sort_by(|a, b| a.name.cmp(&b.name));
                BrandWithCategories { brand, categories }
            })
            .collect())
    }

    #[instrument(skip(self))]
    pub async fn get(&self, id: i32) -> Result<BrandWithCategories, ServiceError> {
        let db = &*self.db_pool;
        let brand = Brand::find_by_id(id)
            .one(db)
            .await?
            .ok_or_else(|| ServiceError::not_found("brand", id))?;
        let categories = brand
            .find_related(Category)
            .order_by_asc(CategoryColumn::Name)
            .all(db)
            .await?;
        Ok(BrandWithCategories { brand, categories })
    }

    /// Inserts or updates a brand and replaces its category links.
    #[instrument(skip(self))]
    pub async fn save(&self, mut input: BrandInput) -> Result<brand::Model, ServiceError> {
        let db = &*self.db_pool;
        input.name = input.name.trim().to_string();
        input.validate()?;

        let category_ids: BTreeSet<i32> = input.category_ids.iter().copied().collect();

        let txn = db.begin().await?;

        let mut duplicate = Brand::find().filter(BrandColumn::Name.eq(input.name.as_str()));
        if let Some(id) = input.id {
            duplicate = duplicate.filter(BrandColumn::Id.ne(id));
        }
        if duplicate.count(&txn).await? > 0 {
            return Err(ServiceError::ValidationError(format!(
                "There is another brand having the name {}",
                input.name
            )));
        }

        if !category_ids.is_empty() {
            let found = Category::find()
                .filter(CategoryColumn::Id.is_in(category_ids.iter().copied()))
                .count(&txn)
                .await?;
            if found != category_ids.len() as u64 {
                return Err(ServiceError::ValidationError(
                    "One or more selected categories do not exist".to_string(),
                ));
            }
        }

        let saved = match input.id {
            Some(id) => {
                let existing = Brand::find_by_id(id)
                    .one(&txn)
                    .await?
                    .ok_or_else(|| ServiceError::not_found("brand", id))?;
                let mut active: brand::ActiveModel = existing.into();
                active.name = Set(input.name);
                if let Some(logo) = input.logo {
                    active.logo = Set(Some(logo));
                }
                active.update(&txn).await?
            }
            None => {
                brand::ActiveModel {
                    name: Set(input.name),
                    logo: Set(input.logo),
                    ..Default::default()
                }
                .insert(&txn)
                .await?
            }
        };

        BrandCategory::delete_many()
            .filter(LinkColumn::BrandId.eq(saved.id))
            .exec(&txn)
            .await?;
        if !category_ids.is_empty() {
            let links = category_ids.iter().map(|category_id| brand_category::ActiveModel {
                brand_id: Set(saved.id),
                category_id: Set(*category_id),
            });
            BrandCategory::insert_many(links)
                .exec_without_returning(&txn)
                .await?;
        }

        txn.commit().await?;
        info!(brand_id = saved.id, categories = category_ids.len(), "Brand saved");
        Ok(saved)
    }

    #[instrument(skip(self))]
    pub async fn delete(&self, id: i32) -> Result<(), ServiceError> {
        let db = &*self.db_pool;
        let txn = db.begin().await?;

        if Brand::find_by_id(id).one(&txn).await?.is_none() {
            return Err(ServiceError::not_found("brand", id));
        }

        BrandCategory::delete_many()
            .filter(LinkColumn::BrandId.eq(id))
            .exec(&txn)
            .await?;
        Brand::delete_by_id(id).exec(&txn).await?;

        txn.commit().await?;
        info!(brand_id = id, "Brand deleted");
        Ok(())
    }
}

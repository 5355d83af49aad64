use crate::{
    db::DbPool,
    entities::{
        brand::{self, Entity as Brand},
        category::{self, Entity as Category},
        product::{self, Column as ProductColumn, Entity as Product},
        product_detail::{self, Column as DetailColumn, Entity as ProductDetail},
        product_image::{self, Column as ImageColumn, Entity as ProductImage},
    },
    errors::ServiceError,
};
use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    sea_query::Expr, ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, Set, TransactionTrait,
};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, info, instrument};
use validator::Validate;

/// Extra image record; `id == 0` marks an image not yet stored
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageInput {
    pub id: i32,
    pub name: String,
}

/// Detail record; `id == 0` marks a detail not yet stored
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetailInput {
    pub id: i32,
    pub name: String,
    pub value: String,
}

/// A product as submitted by the form, before anything is persisted.
#[derive(Debug, Clone, Default, Validate)]
pub struct ProductDraft {
    pub id: Option<i32>,
    #[validate(length(
        min = 1,
        max = 256,
        message = "Product name must be between 1 and 256 characters"
    ))]
    pub name: String,
    #[validate(length(max = 256, message = "Alias cannot exceed 256 characters"))]
    pub alias: String,
    #[validate(length(max = 512, message = "Short description cannot exceed 512 characters"))]
    pub short_description: String,
    #[validate(length(max = 4096, message = "Full description cannot exceed 4096 characters"))]
    pub full_description: String,
    pub enabled: bool,
    pub in_stock: bool,
    pub cost: Decimal,
    pub price: Decimal,
    pub discount_percent: Decimal,
    pub length: Decimal,
    pub width: Decimal,
    pub height: Decimal,
    pub weight: Decimal,
    pub category_id: Option<i32>,
    pub brand_id: Option<i32>,
    main_image: Option<String>,
    images: Vec<ImageInput>,
    details: Vec<DetailInput>,
}

impl ProductDraft {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn main_image(&self) -> Option<&str> {
        self.main_image.as_deref()
    }

    pub fn set_main_image(&mut self, name: impl Into<String>) {
        self.main_image = Some(name.into());
    }

    pub fn images(&self) -> &[ImageInput] {
        &self.images
    }

    pub fn details(&self) -> &[DetailInput] {
        &self.details
    }

    /// Replaces the extra images with the records echoed back by the form.
    pub fn set_existing_images(&mut self, images: Vec<ImageInput>) {
        self.images = images;
    }

    pub fn contains_image_name(&self, name: &str) -> bool {
        self.images.iter().any(|image| image.name == name)
    }

    /// Appends a newly uploaded extra image unless one with the same name exists.
    /// Returns whether the image was added.
    pub fn add_extra_image(&mut self, name: impl Into<String>) -> bool {
        let name = name.into();
        if self.contains_image_name(&name) {
            return false;
        }
        self.images.push(ImageInput { id: 0, name });
        true
    }

    pub fn add_detail(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.details.push(DetailInput {
            id: 0,
            name: name.into(),
            value: value.into(),
        });
    }

    pub fn add_existing_detail(
        &mut self,
        id: i32,
        name: impl Into<String>,
        value: impl Into<String>,
    ) {
        self.details.push(DetailInput {
            id,
            name: name.into(),
            value: value.into(),
        });
    }

    /// Stored details are always kept; new ones only when name and value are both filled in.
    pub fn apply_detail_records(&mut self, records: Vec<DetailInput>) {
        for record in records {
            if record.id != 0 {
                self.add_existing_detail(record.id, record.name, record.value);
            } else if !record.name.is_empty() && !record.value.is_empty() {
                self.add_detail(record.name, record.value);
            }
        }
    }
}

/// A stored product together with its owned rows and references
#[derive(Debug, Clone)]
pub struct ProductWithRelations {
    pub product: product::Model,
    pub images: Vec<product_image::Model>,
    pub details: Vec<product_detail::Model>,
    pub category: Option<category::Model>,
    pub brand: Option<brand::Model>,
}

impl ProductWithRelations {
    pub fn contains_image_name(&self, name: &str) -> bool {
        self.images.iter().any(|image| image.name == name)
    }
}

/// Row of the product list
#[derive(Debug, Clone)]
pub struct ProductSummary {
    pub product: product::Model,
    pub brand_name: Option<String>,
    pub category_name: Option<String>,
}

fn derive_alias(alias: &str, name: &str) -> String {
    let source = if alias.trim().is_empty() { name } else { alias };
    source.trim().replace(' ', "-")
}

/// Service for managing products
#[derive(Clone)]
pub struct ProductService {
    db_pool: Arc<DbPool>,
}

impl ProductService {
    pub fn new(db_pool: Arc<DbPool>) -> Self {
        Self { db_pool }
    }

    /// All products ordered by id, with brand and category names resolved
    #[instrument(skip(self))]
    pub async fn list_all(&self) -> Result<Vec<ProductSummary>, ServiceError> {
        let db = &*self.db_pool;
        let products = Product::find()
            .order_by_asc(ProductColumn::Id)
            .all(db)
            .await?;

        let brands: HashMap<i32, String> = Brand::find()
            .all(db)
            .await?
            .into_iter()
            .map(|b| (b.id, b.name))
            .collect();
        let categories: HashMap<i32, String> = Category::find()
            .all(db)
            .await?
            .into_iter()
            .map(|c| (c.id, c.name))
            .collect();

        Ok(products
            .into_iter()
            .map(|product| ProductSummary {
                brand_name: product.brand_id.and_then(|id| brands.get(&id).cloned()),
                category_name: product
                    .category_id
                    .and_then(|id| categories.get(&id).cloned()),
                product,
            })
            .collect())
    }

    #[instrument(skip(self))]
    pub async fn get(&self, id: i32) -> Result<ProductWithRelations, ServiceError> {
        let db = &*self.db_pool;
        let product = Product::find_by_id(id)
            .one(db)
            .await?
            .ok_or_else(|| ServiceError::not_found("product", id))?;
        load_relations(db, product).await
    }

    /// Persists the draft with its images and details in one transaction.
    ///
    /// Image and detail rows of the product that the draft no longer lists
    /// are deleted; the rest are updated in place and new ones inserted.
    #[instrument(skip(self, draft), fields(product_id = ?draft.id, name = %draft.name))]
    pub async fn save(&self, mut draft: ProductDraft) -> Result<ProductWithRelations, ServiceError> {
        let db = &*self.db_pool;
        draft.name = draft.name.trim().to_string();
        draft.alias = derive_alias(&draft.alias, &draft.name);
        draft.validate()?;

        for detail in &draft.details {
            if detail.name.chars().count() > 255 || detail.value.chars().count() > 255 {
                return Err(ServiceError::ValidationError(
                    "Product detail names and values cannot exceed 255 characters".to_string(),
                ));
            }
        }

        let txn = db.begin().await?;

        let mut duplicate = Product::find().filter(ProductColumn::Name.eq(draft.name.as_str()));
        if let Some(id) = draft.id {
            duplicate = duplicate.filter(ProductColumn::Id.ne(id));
        }
        if duplicate.count(&txn).await? > 0 {
            return Err(ServiceError::ValidationError(format!(
                "There is another product having the name {}",
                draft.name
            )));
        }

        let mut same_alias =
            Product::find().filter(ProductColumn::Alias.eq(draft.alias.as_str()));
        if let Some(id) = draft.id {
            same_alias = same_alias.filter(ProductColumn::Id.ne(id));
        }
        if same_alias.count(&txn).await? > 0 {
            return Err(ServiceError::ValidationError(format!(
                "There is another product having the alias {}",
                draft.alias
            )));
        }

        if let Some(category_id) = draft.category_id {
            if Category::find_by_id(category_id).one(&txn).await?.is_none() {
                return Err(ServiceError::ValidationError(format!(
                    "Category with ID {} does not exist",
                    category_id
                )));
            }
        }
        if let Some(brand_id) = draft.brand_id {
            if Brand::find_by_id(brand_id).one(&txn).await?.is_none() {
                return Err(ServiceError::ValidationError(format!(
                    "Brand with ID {} does not exist",
                    brand_id
                )));
            }
        }

        let now = Utc::now();
        let product = match draft.id {
            Some(id) => {
                let existing = Product::find_by_id(id)
                    .one(&txn)
                    .await?
                    .ok_or_else(|| ServiceError::not_found("product", id))?;
                let mut active: product::ActiveModel = existing.into();
                active.name = Set(draft.name.clone());
                active.alias = Set(draft.alias.clone());
                active.short_description = Set(draft.short_description.clone());
                active.full_description = Set(draft.full_description.clone());
                active.updated_time = Set(now);
                active.enabled = Set(draft.enabled);
                active.in_stock = Set(draft.in_stock);
                active.cost = Set(draft.cost);
                active.price = Set(draft.price);
                active.discount_percent = Set(draft.discount_percent);
                active.length = Set(draft.length);
                active.width = Set(draft.width);
                active.height = Set(draft.height);
                active.weight = Set(draft.weight);
                active.category_id = Set(draft.category_id);
                active.brand_id = Set(draft.brand_id);
                if let Some(main_image) = &draft.main_image {
                    active.main_image = Set(Some(main_image.clone()));
                }
                active.update(&txn).await?
            }
            None => {
                product::ActiveModel {
                    name: Set(draft.name.clone()),
                    alias: Set(draft.alias.clone()),
                    short_description: Set(draft.short_description.clone()),
                    full_description: Set(draft.full_description.clone()),
                    created_time: Set(now),
                    updated_time: Set(now),
                    enabled: Set(draft.enabled),
                    in_stock: Set(draft.in_stock),
                    cost: Set(draft.cost),
                    price: Set(draft.price),
                    discount_percent: Set(draft.discount_percent),
                    length: Set(draft.length),
                    width: Set(draft.width),
                    height: Set(draft.height),
                    weight: Set(draft.weight),
                    main_image: Set(draft.main_image.clone()),
                    category_id: Set(draft.category_id),
                    brand_id: Set(draft.brand_id),
                    ..Default::default()
                }
                .insert(&txn)
                .await?
            }
        };

        sync_images(&txn, product.id, &draft.images).await?;
        sync_details(&txn, product.id, &draft.details).await?;

        let saved = load_relations(&txn, product).await?;
        txn.commit().await?;

        info!(
            product_id = saved.product.id,
            images = saved.images.len(),
            details = saved.details.len(),
            "Product saved"
        );
        Ok(saved)
    }

    /// Sets the enabled flag. An unknown id updates nothing and is not an error.
    #[instrument(skip(self))]
    pub async fn update_enabled_status(&self, id: i32, enabled: bool) -> Result<(), ServiceError> {
        let db = &*self.db_pool;
        let result = Product::update_many()
            .col_expr(ProductColumn::Enabled, Expr::value(enabled))
            .filter(ProductColumn::Id.eq(id))
            .exec(db)
            .await?;
        info!(
            product_id = id,
            enabled,
            rows = result.rows_affected,
            "Product status updated"
        );
        Ok(())
    }

    /// Deletes the product with its image and detail rows.
    #[instrument(skip(self))]
    pub async fn delete(&self, id: i32) -> Result<(), ServiceError> {
        let db = &*self.db_pool;
        let txn = db.begin().await?;

        if Product::find_by_id(id).one(&txn).await?.is_none() {
            return Err(ServiceError::not_found("product", id));
        }

        ProductImage::delete_many()
            .filter(ImageColumn::ProductId.eq(id))
            .exec(&txn)
            .await?;
        ProductDetail::delete_many()
            .filter(DetailColumn::ProductId.eq(id))
            .exec(&txn)
            .await?;
        Product::delete_by_id(id).exec(&txn).await?;

        txn.commit().await?;
        info!(product_id = id, "Product deleted");
        Ok(())
    }
}

async fn load_relations<C: ConnectionTrait>(
    db: &C,
    product: product::Model,
) -> Result<ProductWithRelations, ServiceError> {
    let images = ProductImage::find()
        .filter(ImageColumn::ProductId.eq(product.id))
        .order_by_asc(ImageColumn::Id)
        .all(db)
        .await?;
    let details = ProductDetail::find()
        .filter(DetailColumn::ProductId.eq(product.id))
        .order_by_asc(DetailColumn::Id)
        .all(db)
        .await?;
    let category = match product.category_id {
        Some(id) => Category::find_by_id(id).one(db).await?,
        None => None,
    };
    let brand = match product.brand_id {
        Some(id) => Brand::find_by_id(id).one(db).await?,
        None => None,
    };

    Ok(ProductWithRelations {
        product,
        images,
        details,
        category,
        brand,
    })
}

async fn sync_images<C: ConnectionTrait>(
    db: &C,
    product_id: i32,
    images: &[ImageInput],
) -> Result<(), ServiceError> {
    let stored: HashMap<i32, product_image::Model> = ProductImage::find()
        .filter(ImageColumn::ProductId.eq(product_id))
        .all(db)
        .await?
        .into_iter()
        .map(|image| (image.id, image))
        .collect();

    let kept: HashSet<i32> = images
        .iter()
        .filter(|image| stored.contains_key(&image.id))
        .map(|image| image.id)
        .collect();

    let removed: Vec<i32> = stored
        .keys()
        .filter(|id| !kept.contains(id))
        .copied()
        .collect();
    if !removed.is_empty() {
        ProductImage::delete_many()
            .filter(ImageColumn::Id.is_in(removed.clone()))
            .exec(db)
            .await?;
        debug!(product_id, removed = ?removed, "Removed product images");
    }

    for image in images {
        match stored.get(&image.id) {
            Some(existing) if existing.name == image.name => {}
            Some(existing) => {
                let mut active: product_image::ActiveModel = existing.clone().into();
                active.name = Set(image.name.clone());
                active.update(db).await?;
            }
            None => {
                product_image::ActiveModel {
                    name: Set(image.name.clone()),
                    product_id: Set(product_id),
                    ..Default::default()
                }
                .insert(db)
                .await?;
            }
        }
    }

    Ok(())
}

async fn sync_details<C: ConnectionTrait>(
    db: &C,
    product_id: i32,
    details: &[DetailInput],
) -> Result<(), ServiceError> {
    let stored: HashMap<i32, product_detail::Model> = ProductDetail::find()
        .filter(DetailColumn::ProductId.eq(product_id))
        .all(db)
        .await?
        .into_iter()
        .map(|detail| (detail.id, detail))
        .collect();

    let kept: HashSet<i32> = details
        .iter()
        .filter(|detail| stored.contains_key(&detail.id))
        .map(|detail| detail.id)
        .collect();

    let removed: Vec<i32> = stored
        .keys()
        .filter(|id| !kept.contains(id))
        .copied()
        .collect();
    if !removed.is_empty() {
        ProductDetail::delete_many()
            .filter(DetailColumn::Id.is_in(removed.clone()))
            .exec(db)
            .await?;
        debug!(product_id, removed = ?removed, "Removed product details");
    }

    for detail in details {
        match stored.get(&detail.id) {
            Some(existing) if existing.name == detail.name && existing.value == detail.value => {}
            Some(existing) => {
                let mut active: product_detail::ActiveModel = existing.clone().into();
                active.name = Set(detail.name.clone());
                active.value = Set(detail.value.clone());
                active.update(db).await?;
            }
            None => {
                product_detail::ActiveModel {
                    name: Set(detail.name.clone()),
                    value: Set(detail.value.clone()),
                    product_id: Set(product_id),
                    ..Default::default()
                }
                .insert(db)
                .await?;
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: i32, name: &str, value: &str) -> DetailInput {
        DetailInput {
            id,
            name: name.to_string(),
            value: value.to_string(),
        }
    }

    #[test]
    fn new_details_need_name_and_value() {
        let mut draft = ProductDraft::default();
        draft.apply_detail_records(vec![
            record(0, "Color", "Red"),
            record(0, "", "Blue"),
            record(0, "Size", ""),
        ]);

        assert_eq!(draft.details(), &[record(0, "Color", "Red")]);
    }

    #[test]
    fn stored_details_are_kept_even_when_blank() {
        let mut draft = ProductDraft::default();
        draft.apply_detail_records(vec![record(7, "", ""), record(0, "Weight", "2kg")]);

        assert_eq!(draft.details().len(), 2);
        assert_eq!(draft.details()[0].id, 7);
        assert_eq!(draft.details()[1].id, 0);
    }

    #[test]
    fn extra_images_are_deduplicated_by_name() {
        let mut draft = ProductDraft::default();
        draft.set_existing_images(vec![ImageInput {
            id: 3,
            name: "side.png".to_string(),
        }]);

        assert!(!draft.add_extra_image("side.png"));
        assert!(draft.add_extra_image("back.png"));
        assert!(draft.contains_image_name("back.png"));
        assert_eq!(draft.images().len(), 2);
        assert_eq!(draft.images()[1].id, 0);
    }

    #[test]
    fn main_image_is_tracked_separately() {
        let mut draft = ProductDraft::default();
        assert_eq!(draft.main_image(), None);
        draft.set_main_image("front.png");
        assert_eq!(draft.main_image(), Some("front.png"));
        assert!(!draft.contains_image_name("front.png"));
    }

    #[test]
    fn alias_replaces_spaces() {
        assert_eq!(derive_alias("", " Canon EOS M50 "), "Canon-EOS-M50");
        assert_eq!(derive_alias("eos m50", "Canon EOS M50"), "eos-m50");
    }
}

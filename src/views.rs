//! Page models rendered by askama.
//!
//! Each page struct carries display-ready values so the templates stay
//! free of logic beyond loops and conditionals.

use askama::Template;
use rust_decimal::Decimal;

use crate::entities::{brand, category, product, setting::SettingCategory};
use crate::services::{
    brands::BrandWithCategories,
    categories::{CategoryOption, SortDirection},
    products::{ProductSummary, ProductWithRelations},
};

#[derive(Template)]
#[template(path = "error.html")]
pub struct ErrorPage {
    pub status: u16,
    pub reason: String,
    pub message: String,
    pub request_id: Option<String>,
}

/// `<option>` of a select box
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectOption {
    pub value: i32,
    pub label: String,
    pub selected: bool,
}

impl SelectOption {
    pub fn from_categories(options: Vec<CategoryOption>, selected: &[i32]) -> Vec<Self> {
        options
            .into_iter()
            .map(|o| SelectOption {
                selected: selected.contains(&o.id),
                value: o.id,
                label: o.label,
            })
            .collect()
    }
}

// Categories

pub struct CategoryRow {
    pub id: i32,
    pub name: String,
    pub alias: String,
    pub image_path: Option<String>,
    pub enabled: bool,
}

impl From<category::Model> for CategoryRow {
    fn from(model: category::Model) -> Self {
        Self {
            image_path: model.image_path(),
            id: model.id,
            name: model.name,
            alias: model.alias,
            enabled: model.enabled,
        }
    }
}

#[derive(Template)]
#[template(path = "categories/categories.html")]
pub struct CategoriesPage {
    pub message: Option<String>,
    pub categories: Vec<CategoryRow>,
    pub sort_dir: &'static str,
    pub reverse_sort_dir: &'static str,
}

impl CategoriesPage {
    pub fn new(
        message: Option<String>,
        categories: Vec<category::Model>,
        sort_dir: SortDirection,
    ) -> Self {
        Self {
            message,
            categories: categories.into_iter().map(CategoryRow::from).collect(),
            sort_dir: sort_dir.as_str(),
            reverse_sort_dir: sort_dir.reverse().as_str(),
        }
    }
}

#[derive(Default)]
pub struct CategoryForm {
    pub id: Option<i32>,
    pub name: String,
    pub alias: String,
    pub enabled: bool,
    pub image_path: Option<String>,
}

impl From<&category::Model> for CategoryForm {
    fn from(model: &category::Model) -> Self {
        Self {
            id: Some(model.id),
            name: model.name.clone(),
            alias: model.alias.clone(),
            enabled: model.enabled,
            image_path: model.image_path(),
        }
    }
}

#[derive(Template)]
#[template(path = "categories/category_form.html")]
pub struct CategoryFormPage {
    pub page_title: String,
    pub category: CategoryForm,
    pub parents: Vec<SelectOption>,
}

// Products

pub struct ProductRow {
    pub id: i32,
    pub name: String,
    pub image_path: Option<String>,
    pub brand_name: String,
    pub category_name: String,
    pub enabled: bool,
}

impl From<ProductSummary> for ProductRow {
    fn from(summary: ProductSummary) -> Self {
        Self {
            image_path: summary.product.main_image_path(),
            id: summary.product.id,
            name: summary.product.name,
            brand_name: summary.brand_name.unwrap_or_default(),
            category_name: summary.category_name.unwrap_or_default(),
            enabled: summary.product.enabled,
        }
    }
}

#[derive(Template)]
#[template(path = "products/products.html")]
pub struct ProductsPage {
    pub message: Option<String>,
    pub products: Vec<ProductRow>,
}

pub struct ImageRow {
    pub id: i32,
    pub name: String,
    pub path: String,
}

pub struct DetailRow {
    pub id: i32,
    pub name: String,
    pub value: String,
}

pub struct ProductForm {
    pub id: Option<i32>,
    pub name: String,
    pub alias: String,
    pub short_description: String,
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
    pub main_image_path: Option<String>,
}

impl Default for ProductForm {
    fn default() -> Self {
        Self {
            id: None,
            name: String::new(),
            alias: String::new(),
            short_description: String::new(),
            full_description: String::new(),
            enabled: true,
            in_stock: true,
            cost: Decimal::ZERO,
            price: Decimal::ZERO,
            discount_percent: Decimal::ZERO,
            length: Decimal::ZERO,
            width: Decimal::ZERO,
            height: Decimal::ZERO,
            weight: Decimal::ZERO,
            main_image_path: None,
        }
    }
}

impl From<&product::Model> for ProductForm {
    fn from(model: &product::Model) -> Self {
        Self {
            id: Some(model.id),
            name: model.name.clone(),
            alias: model.alias.clone(),
            short_description: model.short_description.clone(),
            full_description: model.full_description.clone(),
            enabled: model.enabled,
            in_stock: model.in_stock,
            cost: model.cost,
            price: model.price,
            discount_percent: model.discount_percent,
            length: model.length,
            width: model.width,
            height: model.height,
            weight: model.weight,
            main_image_path: model.main_image_path(),
        }
    }
}

fn image_rows(product: &ProductWithRelations) -> Vec<ImageRow> {
    product
        .images
        .iter()
        .map(|image| ImageRow {
            id: image.id,
            name: image.name.clone(),
            path: image.image_path(),
        })
        .collect()
}

fn detail_rows(product: &ProductWithRelations) -> Vec<DetailRow> {
    product
        .details
        .iter()
        .map(|detail| DetailRow {
            id: detail.id,
            name: detail.name.clone(),
            value: detail.value.clone(),
        })
        .collect()
}

#[derive(Template)]
#[template(path = "products/product_form.html")]
pub struct ProductFormPage {
    pub page_title: String,
    pub product: ProductForm,
    pub brands: Vec<SelectOption>,
    pub categories: Vec<SelectOption>,
    pub images: Vec<ImageRow>,
    pub details: Vec<DetailRow>,
    pub number_of_existing_extra_images: usize,
}

impl ProductFormPage {
    pub fn new_product(brands: &[brand::Model], categories: Vec<CategoryOption>) -> Self {
        Self {
            page_title: "Create New Product".to_string(),
            product: ProductForm::default(),
            brands: brand_options(brands, None),
            categories: SelectOption::from_categories(categories, &[]),
            images: Vec::new(),
            details: Vec::new(),
            number_of_existing_extra_images: 0,
        }
    }

    pub fn edit_product(
        product: &ProductWithRelations,
        brands: &[brand::Model],
        categories: Vec<CategoryOption>,
    ) -> Self {
        let images = image_rows(product);
        let selected_category: Vec<i32> = product.product.category_id.into_iter().collect();
        Self {
            page_title: format!("Edit Product (ID: {})", product.product.id),
            product: ProductForm::from(&product.product),
            brands: brand_options(brands, product.product.brand_id),
            categories: SelectOption::from_categories(categories, &selected_category),
            number_of_existing_extra_images: images.len(),
            images,
            details: detail_rows(product),
        }
    }
}

fn brand_options(brands: &[brand::Model], selected: Option<i32>) -> Vec<SelectOption> {
    brands
        .iter()
        .map(|b| SelectOption {
            value: b.id,
            label: b.name.clone(),
            selected: selected == Some(b.id),
        })
        .collect()
}

#[derive(Template)]
#[template(path = "products/product_detail_modal.html")]
pub struct ProductDetailModal {
    pub product: ProductForm,
    pub brand_name: String,
    pub category_name: String,
    pub created_time: String,
    pub updated_time: String,
    pub images: Vec<ImageRow>,
    pub details: Vec<DetailRow>,
}

impl From<&ProductWithRelations> for ProductDetailModal {
    fn from(product: &ProductWithRelations) -> Self {
        Self {
            product: ProductForm::from(&product.product),
            brand_name: product
                .brand
                .as_ref()
                .map(|b| b.name.clone())
                .unwrap_or_default(),
            category_name: product
                .category
                .as_ref()
                .map(|c| c.name.clone())
                .unwrap_or_default(),
            created_time: product
                .product
                .created_time
                .format("%Y-%m-%d %H:%M:%S")
                .to_string(),
            updated_time: product
                .product
                .updated_time
                .format("%Y-%m-%d %H:%M:%S")
                .to_string(),
            images: image_rows(product),
            details: detail_rows(product),
        }
    }
}

// Brands

pub struct BrandRow {
    pub id: i32,
    pub name: String,
    pub logo_path: Option<String>,
    pub categories: Vec<String>,
}

impl From<BrandWithCategories> for BrandRow {
    fn from(row: BrandWithCategories) -> Self {
        Self {
            logo_path: row.brand.logo_path(),
            id: row.brand.id,
            name: row.brand.name,
            categories: row.categories.into_iter().map(|c| c.name).collect(),
        }
    }
}

#[derive(Template)]
#[template(path = "brands/brands.html")]
pub struct BrandsPage {
    pub message: Option<String>,
    pub brands: Vec<BrandRow>,
}

#[derive(Default)]
pub struct BrandForm {
    pub id: Option<i32>,
    pub name: String,
    pub logo_path: Option<String>,
}

#[derive(Template)]
#[template(path = "brands/brand_form.html")]
pub struct BrandFormPage {
    pub page_title: String,
    pub brand: BrandForm,
    pub categories: Vec<SelectOption>,
}

impl BrandFormPage {
    pub fn new_brand(categories: Vec<CategoryOption>) -> Self {
        Self {
            page_title: "Create New Brand".to_string(),
            brand: BrandForm::default(),
            categories: SelectOption::from_categories(categories, &[]),
        }
    }

    pub fn edit_brand(brand: &BrandWithCategories, categories: Vec<CategoryOption>) -> Self {
        Self {
            page_title: format!("Edit Brand (ID: {})", brand.brand.id),
            brand: BrandForm {
                id: Some(brand.brand.id),
                name: brand.brand.name.clone(),
                logo_path: brand.brand.logo_path(),
            },
            categories: SelectOption::from_categories(categories, &brand.category_ids()),
        }
    }
}

// Settings

pub struct SettingRow {
    pub key: String,
    pub value: String,
}

pub struct SettingGroup {
    pub label: &'static str,
    pub settings: Vec<SettingRow>,
}

#[derive(Template)]
#[template(path = "settings/settings.html")]
pub struct SettingsPage {
    pub message: Option<String>,
    pub groups: Vec<SettingGroup>,
}

impl SettingsPage {
    /// Groups settings by category in a fixed order, skipping empty groups.
    pub fn new(
        message: Option<String>,
        settings: Vec<crate::entities::setting::Model>,
    ) -> Self {
        const ORDER: [SettingCategory; 5] = [
            SettingCategory::General,
            SettingCategory::MailServer,
            SettingCategory::MailTemplates,
            SettingCategory::Currency,
            SettingCategory::Payment,
        ];

        let groups = ORDER
            .iter()
            .map(|category| SettingGroup {
                label: category.label(),
                settings: settings
                    .iter()
                    .filter(|s| s.category == *category)
                    .map(|s| SettingRow {
                        key: s.key.clone(),
                        value: s.value.clone(),
                    })
                    .collect(),
            })
            .filter(|group| !group.settings.is_empty())
            .collect();

        Self { message, groups }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::setting;

    #[test]
    fn categories_page_links_to_reverse_order() {
        let page = CategoriesPage::new(None, Vec::new(), SortDirection::Desc);
        assert_eq!(page.sort_dir, "desc");
        assert_eq!(page.reverse_sort_dir, "asc");
        let html = page.render().unwrap();
        assert!(html.contains("sortDir=asc"));
    }

    #[test]
    fn settings_are_grouped_in_display_order() {
        let settings = vec![
            setting::Model {
                key: "CURRENCY_SYMBOL".into(),
                value: "$".into(),
                category: SettingCategory::Currency,
            },
            setting::Model {
                key: "SITE_NAME".into(),
                value: "Shopme".into(),
                category: SettingCategory::General,
            },
        ];

        let page = SettingsPage::new(None, settings);
        let labels: Vec<&str> = page.groups.iter().map(|g| g.label).collect();
        assert_eq!(labels, vec!["General", "Currency"]);
    }

    #[test]
    fn flash_message_is_escaped() {
        let page = ProductsPage {
            message: Some("<b>saved".into()),
            products: Vec::new(),
        };
        let html = page.render().unwrap();
        assert!(html.contains("&lt;b&gt;saved"));
        assert!(!html.contains("<b>saved"));
    }
}

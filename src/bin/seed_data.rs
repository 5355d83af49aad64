//! Seed data script - populates the database with demo catalog data
//!
//! Run with: cargo run --bin seed-data
//!
//! This creates:
//! - the default site settings
//! - the back-office roles (Admin, Salesperson, Editor, Shipper, Assistant)
//! - a small category tree (Electronics > Cameras > Digital Cameras, Computers)
//! - two brands linked to those categories
//! - two products with extra details
//!
//! Catalog rows are only created when the categories table is empty.

use rust_decimal_macros::dec;
use sea_orm::{ActiveModelTrait, EntityTrait, PaginatorTrait, Set};
use std::sync::Arc;
use tracing::info;

use shopme_admin::{
    db,
    entities::role,
    services::{
        brands::{BrandInput, BrandService},
        categories::{CategoryInput, CategoryService, SortDirection},
        products::{ProductDraft, ProductService},
        settings::SettingService,
    },
};

const ROLES: [(&str, &str); 5] = [
    ("Admin", "Manage everything"),
    ("Salesperson", "Manage product price, customers, shipping, orders and sales report"),
    ("Editor", "Manage categories, brands, products, articles and menus"),
    ("Shipper", "View products, view orders and update order status"),
    ("Assistant", "Manage questions and reviews"),
];

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    info!("=== Shopme Admin Seed Data ===");

    let database_url = std::env::var("DATABASE_URL")
        .or_else(|_| std::env::var("APP__DATABASE_URL"))
        .unwrap_or_else(|_| "sqlite://shopme.db?mode=rwc".to_string());

    let pool = db::establish_connection(&database_url).await?;
    db::run_migrations(&pool).await?;
    let pool = Arc::new(pool);

    let inserted = SettingService::new(pool.clone()).ensure_defaults().await?;
    info!("Created {} default settings", inserted);

    if role::Entity::find().count(&*pool).await? == 0 {
        for (name, description) in ROLES {
            role::ActiveModel {
                name: Set(name.to_string()),
                description: Set(description.to_string()),
                ..Default::default()
            }
            .insert(&*pool)
            .await?;
        }
        info!("Created {} roles", ROLES.len());
    }

    let categories = CategoryService::new(pool.clone());
    if !categories.list_all(SortDirection::Asc).await?.is_empty() {
        info!("Catalog already has categories; skipping demo catalog");
        return Ok(());
    }

    let electronics = categories
        .save(category("Electronics", None))
        .await?;
    let cameras = categories
        .save(category("Cameras", Some(electronics.id)))
        .await?;
    let digital = categories
        .save(category("Digital Cameras", Some(cameras.id)))
        .await?;
    let computers = categories
        .save(category("Computers", Some(electronics.id)))
        .await?;
    info!("Created 4 categories");

    let brands = BrandService::new(pool.clone());
    let canon = brands
        .save(BrandInput {
            name: "Canon".to_string(),
            category_ids: vec![cameras.id, digital.id],
            ..Default::default()
        })
        .await?;
    let lenovo = brands
        .save(BrandInput {
            name: "Lenovo".to_string(),
            category_ids: vec![computers.id],
            ..Default::default()
        })
        .await?;
    info!("Created 2 brands");

    let products = ProductService::new(pool.clone());

    let mut camera = ProductDraft::new("Canon EOS M50 Mark II");
    camera.short_description = "Mirrorless camera with 24.1MP sensor".to_string();
    camera.enabled = true;
    camera.in_stock = true;
    camera.cost = dec!(450);
    camera.price = dec!(599.99);
    camera.discount_percent = dec!(5);
    camera.length = dec!(11.6);
    camera.width = dec!(5.9);
    camera.height = dec!(8.8);
    camera.weight = dec!(0.9);
    camera.category_id = Some(digital.id);
    camera.brand_id = Some(canon.id);
    camera.add_detail("Sensor", "APS-C CMOS");
    camera.add_detail("Video", "4K 24p");
    products.save(camera).await?;

    let mut laptop = ProductDraft::new("Lenovo ThinkPad X1 Carbon");
    laptop.short_description = "14 inch business ultrabook".to_string();
    laptop.enabled = true;
    laptop.in_stock = true;
    laptop.cost = dec!(1100);
    laptop.price = dec!(1429);
    laptop.length = dec!(31.5);
    laptop.width = dec!(22.2);
    laptop.height = dec!(1.5);
    laptop.weight = dec!(2.5);
    laptop.category_id = Some(computers.id);
    laptop.brand_id = Some(lenovo.id);
    laptop.add_detail("Memory", "16 GB");
    products.save(laptop).await?;
    info!("Created 2 products");

    info!("=== Seed complete ===");
    Ok(())
}

fn category(name: &str, parent_id: Option<i32>) -> CategoryInput {
    CategoryInput {
        name: name.to_string(),
        parent_id,
        enabled: true,
        ..Default::default()
    }
}

mod common;

use axum::http::StatusCode;
use common::{body_text, expect_redirect, Part, TestApp};
use serde_json::Value;
use shopme_admin::{
    entities::setting::SettingCategory,
    services::{brands::BrandInput, categories::CategoryInput},
};

#[allow(dead_code)]
fn assert_app_state_bounds() {
    fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<shopme_admin::AppState>();
}

async fn create_category(app: &TestApp, name: &str) -> i32 {
    app.state
        .services
        .categories
        .save(CategoryInput {
            name: name.to_string(),
            enabled: true,
            ..Default::default()
        })
        .await
        .unwrap()
        .id
}

#[tokio::test]
async fn health_reports_database_status() {
    let app = TestApp::new().await;

    let response = app.get("/health").await;
    assert_eq!(response.status(), StatusCode::OK);

    let json: Value = serde_json::from_str(&body_text(response).await).unwrap();
    assert_eq!(json["status"], "healthy");
    assert_eq!(json["checks"]["database"], "healthy");
}

#[tokio::test]
async fn root_redirects_to_products() {
    let app = TestApp::new().await;
    let response = app.get("/").await;
    assert!(response.status().is_redirection());
    assert_eq!(response.headers()["location"], "/products");
}

#[tokio::test]
async fn brand_is_saved_with_categories_and_logo() {
    let app = TestApp::new().await;
    let cameras = create_category(&app, "Cameras").await;
    let lenses = create_category(&app, "Lenses").await;

    let response = app
        .post_multipart(
            "/brands/save",
            &[
                Part::text("id", ""),
                Part::text("name", "Canon"),
                Part::text("categories", cameras),
                Part::text("categories", lenses),
                Part::file("fileImage", "canon.png", b"logo"),
            ],
        )
        .await;
    assert_eq!(
        expect_redirect(&response, "/brands").as_deref(),
        Some("The brand has been saved successfully.")
    );

    let brands = app.state.services.brands.list_all().await.unwrap();
    assert_eq!(brands.len(), 1);
    let brand = &brands[0];
    assert_eq!(brand.brand.logo.as_deref(), Some("canon.png"));
    let mut category_ids = brand.category_ids();
    category_ids.sort_unstable();
    assert_eq!(category_ids, vec![cameras, lenses]);
    assert!(app
        .upload_path(&format!("brand-logos/{}/canon.png", brand.brand.id))
        .exists());

    let html = body_text(app.get("/brands").await).await;
    assert!(html.contains("Canon"));
    assert!(html.contains("Lenses"));

    // Re-save with a single category and no new logo.
    let response = app
        .post_multipart(
            "/brands/save",
            &[
                Part::text("id", brand.brand.id),
                Part::text("name", "Canon"),
                Part::text("categories", lenses),
                Part::empty_file("fileImage"),
            ],
        )
        .await;
    expect_redirect(&response, "/brands");

    let updated = app.state.services.brands.get(brand.brand.id).await.unwrap();
    assert_eq!(updated.category_ids(), vec![lenses]);
    assert_eq!(updated.brand.logo.as_deref(), Some("canon.png"));
}

#[tokio::test]
async fn duplicate_brand_names_are_rejected() {
    let app = TestApp::new().await;
    app.state
        .services
        .brands
        .save(BrandInput {
            name: "Sony".to_string(),
            ..Default::default()
        })
        .await
        .unwrap();

    let response = app
        .post_multipart("/brands/save", &[Part::text("name", "Sony")])
        .await;
    assert_eq!(
        expect_redirect(&response, "/brands").as_deref(),
        Some("There is another brand having the name Sony")
    );
}

#[tokio::test]
async fn deleting_a_brand_removes_its_logo_directory() {
    let app = TestApp::new().await;
    let response = app
        .post_multipart(
            "/brands/save",
            &[
                Part::text("name", "Nikon"),
                Part::file("fileImage", "nikon.png", b"logo"),
            ],
        )
        .await;
    expect_redirect(&response, "/brands");
    let id = app.state.services.brands.list_all().await.unwrap()[0].brand.id;

    let response = app.get(&format!("/brands/delete/{}", id)).await;
    assert_eq!(
        expect_redirect(&response, "/brands"),
        Some(format!("The brand ID {} has been deleted successfully", id))
    );
    assert!(!app.upload_path(&format!("brand-logos/{}", id)).exists());

    let response = app.get(&format!("/brands/edit/{}", id)).await;
    assert_eq!(
        expect_redirect(&response, "/brands"),
        Some(format!("Could not find any brand with ID {}", id))
    );
}

#[tokio::test]
async fn settings_page_groups_defaults() {
    let app = TestApp::new().await;

    let response = app.get("/settings").await;
    assert_eq!(response.status(), StatusCode::OK);
    let html = body_text(response).await;
    assert!(html.contains("SITE_NAME"));
    assert!(html.contains("CURRENCY_SYMBOL"));
}

#[tokio::test]
async fn settings_save_updates_known_keys_only() {
    let app = TestApp::new().await;

    let response = app
        .post_form(
            "/settings/save",
            &[
                ("SITE_NAME", "Shopme Outlet"),
                ("CURRENCY_SYMBOL", "€"),
                ("NOT_A_SETTING", "ignored"),
            ],
        )
        .await;
    assert_eq!(
        expect_redirect(&response, "/settings").as_deref(),
        Some("The settings have been saved.")
    );

    let settings = app.state.services.settings.list_all().await.unwrap();
    let value = |key: &str| {
        settings
            .iter()
            .find(|s| s.key == key)
            .map(|s| s.value.clone())
    };
    assert_eq!(value("SITE_NAME").as_deref(), Some("Shopme Outlet"));
    assert_eq!(value("CURRENCY_SYMBOL").as_deref(), Some("€"));
    assert_eq!(value("NOT_A_SETTING"), None);

    let currency = app
        .state
        .services
        .settings
        .list_by_categories(&[SettingCategory::Currency])
        .await
        .unwrap();
    assert!(currency.iter().all(|s| s.category == SettingCategory::Currency));
    assert!(currency.iter().any(|s| s.key == "CURRENCY_SYMBOL"));
}

#[tokio::test]
async fn overlong_setting_values_are_rejected() {
    let app = TestApp::new().await;
    let long_value = "x".repeat(1025);

    let response = app
        .post_form("/settings/save", &[("SITE_NAME", long_value.as_str())])
        .await;
    let message = expect_redirect(&response, "/settings").unwrap();
    assert!(message.contains("cannot exceed 1024 characters"));

    let settings = app.state.services.settings.list_all().await.unwrap();
    let site_name = settings.iter().find(|s| s.key == "SITE_NAME").unwrap();
    assert_eq!(site_name.value, "Shopme");
}

#[tokio::test]
async fn defaults_are_only_inserted_once() {
    let app = TestApp::new().await;
    let inserted = app.state.services.settings.ensure_defaults().await.unwrap();
    assert_eq!(inserted, 0);
}

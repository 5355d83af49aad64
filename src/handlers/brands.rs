use super::common::{
    log_storage_result, redirect_on_user_error, redirect_with_flash, render_page, Flash,
    MultipartForm,
};
use crate::{
    errors::ServiceError,
    services::brands::BrandInput,
    views::{BrandFormPage, BrandRow, BrandsPage},
    AppState,
};
use axum::{
    extract::{rejection::PathRejection, Multipart, Path, State},
    response::Response,
    routing::{get, post},
    Router,
};

const BRANDS_URL: &str = "/brands";

/// Creates the router for brand endpoints
pub fn brands_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_brands))
        .route("/new", get(new_brand))
        .route("/edit/:id", get(edit_brand))
        .route("/save", post(save_brand))
        .route("/delete/:id", get(delete_brand))
}

pub async fn list_brands(
    State(state): State<AppState>,
    flash: Flash,
) -> Result<Response, ServiceError> {
    let brands = state.services.brands.list_all().await?;
    let page = BrandsPage {
        message: flash.message(),
        brands: brands.into_iter().map(BrandRow::from).collect(),
    };
    render_page(&page, &flash)
}

pub async fn new_brand(
    State(state): State<AppState>,
    flash: Flash,
) -> Result<Response, ServiceError> {
    let categories = state.services.categories.list_categories_used_in_form().await?;
    render_page(&BrandFormPage::new_brand(categories), &flash)
}

pub async fn edit_brand(
    State(state): State<AppState>,
    id: Result<Path<i32>, PathRejection>,
    flash: Flash,
) -> Result<Response, ServiceError> {
    let Path(id) = id?;
    let brand = match state.services.brands.get(id).await {
        Ok(brand) => brand,
        Err(err) => return redirect_on_user_error(BRANDS_URL, err),
    };
    let categories = state.services.categories.list_categories_used_in_form().await?;
    render_page(&BrandFormPage::edit_brand(&brand, categories), &flash)
}

pub async fn save_brand(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Response, ServiceError> {
    let form = MultipartForm::read(multipart).await?;
    let logo = form.file("fileImage");

    let input = BrandInput {
        id: form.optional_id("id")?,
        name: form.string("name"),
        category_ids: form.ids("categories")?,
        logo: logo.map(|file| file.file_name.clone()),
    };

    let saved = match state.services.brands.save(input).await {
        Ok(saved) => saved,
        Err(err) => return redirect_on_user_error(BRANDS_URL, err),
    };

    if let Some(file) = logo {
        let dir = state.storage.brand_dir(saved.id);
        if log_storage_result(state.storage.clean_dir(&dir).await, "clean brand logo directory")
            .is_some()
        {
            log_storage_result(
                state
                    .storage
                    .save_file(&dir, &file.file_name, &file.content)
                    .await,
                "save brand logo",
            );
        }
    }

    Ok(redirect_with_flash(
        BRANDS_URL,
        "The brand has been saved successfully.",
    ))
}

pub async fn delete_brand(
    State(state): State<AppState>,
    id: Result<Path<i32>, PathRejection>,
) -> Result<Response, ServiceError> {
    let Path(id) = id?;
    if let Err(err) = state.services.brands.delete(id).await {
        return redirect_on_user_error(BRANDS_URL, err);
    }

    log_storage_result(
        state.storage.remove_dir(&state.storage.brand_dir(id)).await,
        "remove brand logo directory",
    );

    Ok(redirect_with_flash(
        BRANDS_URL,
        format!("The brand ID {} has been deleted successfully", id),
    ))
}

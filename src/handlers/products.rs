use super::common::{
    log_storage_result, redirect_on_user_error, redirect_with_flash, render_page,
    zip_detail_records, zip_image_records, Flash, MultipartForm,
};
use crate::{
    entities::brand,
    errors::ServiceError,
    services::products::{ProductDraft, ProductWithRelations},
    storage::FileStorage,
    views::{ProductDetailModal, ProductFormPage, ProductRow, ProductsPage},
    AppState,
};
use axum::{
    extract::{rejection::PathRejection, Multipart, Path, State},
    response::Response,
    routing::{get, post},
    Router,
};
use tracing::{debug, error, info, instrument};

const PRODUCTS_URL: &str = "/products";

/// Creates the router for product endpoints
pub fn products_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_products))
        .route("/new", get(new_product))
        .route("/edit/:id", get(edit_product))
        .route("/details/:id", get(product_details))
        .route("/save", post(save_product))
        .route("/:id/enabled/:status", get(update_enabled_status))
        .route("/delete/:id", get(delete_product))
}

pub async fn list_products(
    State(state): State<AppState>,
    flash: Flash,
) -> Result<Response, ServiceError> {
    let products = state.services.products.list_all().await?;
    let page = ProductsPage {
        message: flash.message(),
        products: products.into_iter().map(ProductRow::from).collect(),
    };
    render_page(&page, &flash)
}

async fn brand_models(state: &AppState) -> Result<Vec<brand::Model>, ServiceError> {
    Ok(state
        .services
        .brands
        .list_all()
        .await?
        .into_iter()
        .map(|row| row.brand)
        .collect())
}

pub async fn new_product(
    State(state): State<AppState>,
    flash: Flash,
) -> Result<Response, ServiceError> {
    let brands = brand_models(&state).await?;
    let categories = state.services.categories.list_categories_used_in_form().await?;
    render_page(&ProductFormPage::new_product(&brands, categories), &flash)
}

pub async fn edit_product(
    State(state): State<AppState>,
    id: Result<Path<i32>, PathRejection>,
    flash: Flash,
) -> Result<Response, ServiceError> {
    let Path(id) = id?;
    let product = match state.services.products.get(id).await {
        Ok(product) => product,
        Err(err) => return redirect_on_user_error(PRODUCTS_URL, err),
    };

    let brands = brand_models(&state).await?;
    let categories = state.services.categories.list_categories_used_in_form().await?;
    render_page(
        &ProductFormPage::edit_product(&product, &brands, categories),
        &flash,
    )
}

pub async fn product_details(
    State(state): State<AppState>,
    id: Result<Path<i32>, PathRejection>,
    flash: Flash,
) -> Result<Response, ServiceError> {
    let Path(id) = id?;
    match state.services.products.get(id).await {
        Ok(product) => render_page(&ProductDetailModal::from(&product), &flash),
        Err(err) => redirect_on_user_error(PRODUCTS_URL, err),
    }
}

/// Builds the draft from the submitted form. Nothing is persisted here.
fn draft_from_form(form: &MultipartForm) -> Result<ProductDraft, ServiceError> {
    let mut draft = ProductDraft::new(form.string("name"));
    draft.id = form.optional_id("id")?;
    draft.alias = form.string("alias");
    draft.short_description = form.string("shortDescription");
    draft.full_description = form.string("fullDescription");
    draft.enabled = form.checkbox("enabled");
    draft.in_stock = form.checkbox("inStock");
    draft.cost = form.decimal("cost")?;
    draft.price = form.decimal("price")?;
    draft.discount_percent = form.decimal("discountPercent")?;
    draft.length = form.decimal("length")?;
    draft.width = form.decimal("width")?;
    draft.height = form.decimal("height")?;
    draft.weight = form.decimal("weight")?;
    draft.category_id = form.optional_id("categoryId")?;
    draft.brand_id = form.optional_id("brandId")?;

    if let Some(main) = form.file("fileImage") {
        draft.set_main_image(main.file_name.clone());
    }

    draft.set_existing_images(zip_image_records(
        form.texts("imageIDs"),
        form.texts("imageNames"),
    )?);

    for extra in form.files("extraImage") {
        if !draft.add_extra_image(extra.file_name.clone()) {
            debug!(file_name = %extra.file_name, "Extra image already attached");
        }
    }

    draft.apply_detail_records(zip_detail_records(
        form.texts("detailIDs"),
        form.texts("detailNames"),
        form.texts("detailValues"),
    )?);

    Ok(draft)
}

pub async fn save_product(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Response, ServiceError> {
    let form = MultipartForm::read(multipart).await?;
    let draft = draft_from_form(&form)?;

    let saved = match state.services.products.save(draft).await {
        Ok(saved) => saved,
        Err(err) => return redirect_on_user_error(PRODUCTS_URL, err),
    };

    save_uploaded_images(&state.storage, &saved, &form).await;
    remove_unreferenced_extra_images(&state.storage, &saved).await;

    Ok(redirect_with_flash(
        PRODUCTS_URL,
        "The product has been saved successfully.",
    ))
}

async fn save_uploaded_images(storage: &FileStorage, saved: &ProductWithRelations, form: &MultipartForm) {
    let product_id = saved.product.id;

    if let Some(main) = form.file("fileImage") {
        let dir = storage.product_dir(product_id);
        if log_storage_result(storage.clean_dir(&dir).await, "clean product image directory")
            .is_some()
        {
            log_storage_result(
                storage.save_file(&dir, &main.file_name, &main.content).await,
                "save product main image",
            );
        }
    }

    let extras_dir = storage.product_extras_dir(product_id);
    for extra in form.files("extraImage") {
        log_storage_result(
            storage
                .save_file(&extras_dir, &extra.file_name, &extra.content)
                .await,
            "save product extra image",
        );
    }
}

/// Deletes files in the extras directory that no image of the product names.
#[instrument(skip(storage, saved), fields(product_id = saved.product.id))]
async fn remove_unreferenced_extra_images(storage: &FileStorage, saved: &ProductWithRelations) {
    let extras_dir = storage.product_extras_dir(saved.product.id);
    let file_names = match storage.list_file_names(&extras_dir).await {
        Ok(names) => names,
        Err(err) if err.is_not_found() => {
            debug!("No extra images directory");
            return;
        }
        Err(err) => {
            error!(error = %err, "Could not list extra images");
            return;
        }
    };

    for file_name in file_names {
        if saved.contains_image_name(&file_name) {
            continue;
        }
        match storage.delete_file(&extras_dir, &file_name).await {
            Ok(()) => info!(file_name = %file_name, "Deleted unreferenced extra image"),
            Err(err) => error!(file_name = %file_name, error = %err, "Could not delete extra image"),
        }
    }
}

pub async fn update_enabled_status(
    State(state): State<AppState>,
    params: Result<Path<(i32, bool)>, PathRejection>,
) -> Result<Response, ServiceError> {
    let Path((id, enabled)) = params?;
    state
        .services
        .products
        .update_enabled_status(id, enabled)
        .await?;

    let status = if enabled { "enabled" } else { "disabled" };
    Ok(redirect_with_flash(
        PRODUCTS_URL,
        format!("The product ID {} has been {}", id, status),
    ))
}

pub async fn delete_product(
    State(state): State<AppState>,
    id: Result<Path<i32>, PathRejection>,
) -> Result<Response, ServiceError> {
    let Path(id) = id?;
    if let Err(err) = state.services.products.delete(id).await {
        return redirect_on_user_error(PRODUCTS_URL, err);
    }

    log_storage_result(
        state
            .storage
            .remove_dir(&state.storage.product_extras_dir(id))
            .await,
        "remove product extras directory",
    );
    log_storage_result(
        state.storage.remove_dir(&state.storage.product_dir(id)).await,
        "remove product image directory",
    );

    Ok(redirect_with_flash(
        PRODUCTS_URL,
        format!("The product ID {} has been deleted successfully", id),
    ))
}

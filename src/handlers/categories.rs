use super::common::{
    log_storage_result, redirect_on_user_error, redirect_with_flash, render_page, Flash,
    MultipartForm,
};
use crate::{
    errors::ServiceError,
    services::categories::{CategoryInput, SortDirection},
    views::{CategoriesPage, CategoryForm, CategoryFormPage, SelectOption},
    AppState,
};
use axum::{
    extract::{rejection::PathRejection, Multipart, Path, Query, State},
    response::Response,
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use tracing::info;

const CATEGORIES_URL: &str = "/categories";

#[derive(Debug, Deserialize, Default)]
pub struct CategoryListQuery {
    #[serde(rename = "sortDir")]
    pub sort_dir: Option<String>,
}

/// Creates the router for category endpoints
pub fn categories_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_categories))
        .route("/new", get(new_category))
        .route("/edit/:id", get(edit_category))
        .route("/save", post(save_category))
        .route("/:id/enabled/:status", get(update_enabled_status))
        .route("/delete/:id", get(delete_category))
}

pub async fn list_categories(
    State(state): State<AppState>,
    Query(query): Query<CategoryListQuery>,
    flash: Flash,
) -> Result<Response, ServiceError> {
    let sort_dir = SortDirection::parse(query.sort_dir.as_deref());
    let categories = state.services.categories.list_all(sort_dir).await?;
    render_page(
        &CategoriesPage::new(flash.message(), categories, sort_dir),
        &flash,
    )
}

pub async fn new_category(
    State(state): State<AppState>,
    flash: Flash,
) -> Result<Response, ServiceError> {
    let parents = state.services.categories.list_categories_used_in_form().await?;
    let page = CategoryFormPage {
        page_title: "Create New Category".to_string(),
        category: CategoryForm {
            enabled: true,
            ..Default::default()
        },
        parents: SelectOption::from_categories(parents, &[]),
    };
    render_page(&page, &flash)
}

pub async fn edit_category(
    State(state): State<AppState>,
    id: Result<Path<i32>, PathRejection>,
    flash: Flash,
) -> Result<Response, ServiceError> {
    let Path(id) = id?;
    let category = match state.services.categories.get(id).await {
        Ok(category) => category,
        Err(err) => return redirect_on_user_error(CATEGORIES_URL, err),
    };

    let parents = state
        .services
        .categories
        .list_categories_used_in_form()
        .await?
        .into_iter()
        .filter(|option| option.id != id)
        .collect();
    let selected: Vec<i32> = category.parent_id.into_iter().collect();

    let page = CategoryFormPage {
        page_title: format!("Edit Category (ID: {})", id),
        category: CategoryForm::from(&category),
        parents: SelectOption::from_categories(parents, &selected),
    };
    render_page(&page, &flash)
}

pub async fn save_category(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Response, ServiceError> {
    let form = MultipartForm::read(multipart).await?;
    let upload = form.file("fileImage");

    let input = CategoryInput {
        id: form.optional_id("id")?,
        name: form.string("name"),
        alias: form.string("alias"),
        parent_id: form.optional_id("parentId")?,
        enabled: form.checkbox("enabled"),
        image: upload.map(|file| file.file_name.clone()),
    };

    let saved = match state.services.categories.save(input).await {
        Ok(saved) => saved,
        Err(err) => return redirect_on_user_error(CATEGORIES_URL, err),
    };

    if let Some(file) = upload {
        let dir = state.storage.category_dir(saved.id);
        if log_storage_result(state.storage.clean_dir(&dir).await, "clean category image directory")
            .is_some()
        {
            log_storage_result(
                state
                    .storage
                    .save_file(&dir, &file.file_name, &file.content)
                    .await,
                "save category image",
            );
        }
    }

    info!(category_id = saved.id, "Category saved");
    Ok(redirect_with_flash(
        CATEGORIES_URL,
        "The category has been saved successfully.",
    ))
}

pub async fn update_enabled_status(
    State(state): State<AppState>,
    params: Result<Path<(i32, bool)>, PathRejection>,
) -> Result<Response, ServiceError> {
    let Path((id, enabled)) = params?;
    if let Err(err) = state
        .services
        .categories
        .update_enabled_status(id, enabled)
        .await
    {
        return redirect_on_user_error(CATEGORIES_URL, err);
    }

    let status = if enabled { "enabled" } else { "disabled" };
    Ok(redirect_with_flash(
        CATEGORIES_URL,
        format!("The category ID {} has been {}", id, status),
    ))
}

pub async fn delete_category(
    State(state): State<AppState>,
    id: Result<Path<i32>, PathRejection>,
) -> Result<Response, ServiceError> {
    let Path(id) = id?;
    if let Err(err) = state.services.categories.delete(id).await {
        return redirect_on_user_error(CATEGORIES_URL, err);
    }

    log_storage_result(
        state.storage.remove_dir(&state.storage.category_dir(id)).await,
        "remove category image directory",
    );

    Ok(redirect_with_flash(
        CATEGORIES_URL,
        format!("The category ID {} has been deleted successfully", id),
    ))
}

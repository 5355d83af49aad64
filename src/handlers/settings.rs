use super::common::{redirect_on_user_error, redirect_with_flash, render_page, Flash};
use crate::{errors::ServiceError, views::SettingsPage, AppState};
use axum::{
    extract::{rejection::FormRejection, State},
    response::Response,
    routing::{get, post},
    Form, Router,
};

const SETTINGS_URL: &str = "/settings";

/// Creates the router for settings endpoints
pub fn settings_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(show_settings))
        .route("/save", post(save_settings))
}

pub async fn show_settings(
    State(state): State<AppState>,
    flash: Flash,
) -> Result<Response, ServiceError> {
    let settings = state.services.settings.list_all().await?;
    render_page(&SettingsPage::new(flash.message(), settings), &flash)
}

/// Every input of the settings form is named after its setting key.
pub async fn save_settings(
    State(state): State<AppState>,
    form: Result<Form<Vec<(String, String)>>, FormRejection>,
) -> Result<Response, ServiceError> {
    let Form(values) = form?;
    match state.services.settings.save_values(values).await {
        Ok(_) => Ok(redirect_with_flash(
            SETTINGS_URL,
            "The settings have been saved.",
        )),
        Err(err) => redirect_on_user_error(SETTINGS_URL, err),
    }
}

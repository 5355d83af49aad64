use crate::errors::ServiceError;
use crate::services::products::{DetailInput, ImageInput};
use crate::storage::sanitize_file_name;
use askama::Template;
use axum::{
    async_trait,
    body::Bytes,
    extract::{FromRequestParts, Multipart},
    http::{header, request::Parts, HeaderMap, HeaderValue, StatusCode},
    response::{Html, IntoResponse, Response},
};
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::convert::Infallible;
use std::str::FromStr;
use tracing::warn;

/// Cookie carrying a one-shot message across a redirect
pub const FLASH_COOKIE: &str = "flash";

const CLEAR_FLASH: &str = "flash=; Max-Age=0; Path=/";

/// Flash message read from the incoming request, if any
#[derive(Debug, Clone, Default)]
pub struct Flash(Option<String>);

impl Flash {
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let message = headers
            .get_all(header::COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .flat_map(|cookies| cookies.split(';'))
            .filter_map(|pair| pair.trim().split_once('='))
            .find(|(name, _)| *name == FLASH_COOKIE)
            .and_then(|(_, value)| decode_flash(value))
            .filter(|message| !message.is_empty());
        Flash(message)
    }

    pub fn message(&self) -> Option<String> {
        self.0.clone()
    }

    pub fn is_present(&self) -> bool {
        self.0.is_some()
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for Flash
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Flash::from_headers(&parts.headers))
    }
}

fn encode_flash(message: &str) -> String {
    url::form_urlencoded::byte_serialize(message.as_bytes()).collect()
}

fn decode_flash(value: &str) -> Option<String> {
    url::form_urlencoded::parse(value.as_bytes())
        .next()
        .map(|(decoded, _)| decoded.into_owned())
}

/// 303 redirect that stores `message` in the flash cookie
pub fn redirect_with_flash(location: &str, message: impl AsRef<str>) -> Response {
    let cookie = format!(
        "{}={}; Path=/; HttpOnly; SameSite=Lax",
        FLASH_COOKIE,
        encode_flash(message.as_ref())
    );
    (
        StatusCode::SEE_OTHER,
        [(header::LOCATION, location.to_string()), (header::SET_COOKIE, cookie)],
    )
        .into_response()
}

/// Turns errors meant for the admin user into a flash redirect; the rest propagate.
pub fn redirect_on_user_error(location: &str, err: ServiceError) -> Result<Response, ServiceError> {
    if err.is_user_facing() {
        Ok(redirect_with_flash(location, err.to_string()))
    } else {
        Err(err)
    }
}

/// Renders a page and clears the flash cookie it consumed.
pub fn render_page<T: Template>(page: &T, flash: &Flash) -> Result<Response, ServiceError> {
    let body = page.render()?;
    let mut response = Html(body).into_response();
    if flash.is_present() {
        response
            .headers_mut()
            .append(header::SET_COOKIE, HeaderValue::from_static(CLEAR_FLASH));
    }
    Ok(response)
}

/// A non-empty uploaded file with its sanitized name
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub file_name: String,
    pub content: Bytes,
}

/// Multipart form split into text fields and uploaded files.
///
/// Field names ending in `[]` are stored without the suffix, so `extraImage`
/// and `extraImage[]` address the same values.
#[derive(Debug, Default)]
pub struct MultipartForm {
    fields: HashMap<String, Vec<String>>,
    files: HashMap<String, Vec<UploadedFile>>,
}

impl MultipartForm {
    pub async fn read(mut multipart: Multipart) -> Result<Self, ServiceError> {
        let mut form = MultipartForm::default();

        while let Some(field) = multipart.next_field().await? {
            let name = field
                .name()
                .unwrap_or_default()
                .trim_end_matches("[]")
                .to_string();
            if name.is_empty() {
                continue;
            }

            match field.file_name().map(str::to_owned) {
                Some(raw_name) => {
                    let content = field.bytes().await?;
                    // Browsers submit untouched file inputs as empty parts.
                    if content.is_empty() {
                        continue;
                    }
                    let file_name = sanitize_file_name(&raw_name).ok_or_else(|| {
                        ServiceError::BadRequest(format!("Invalid upload file name {:?}", raw_name))
                    })?;
                    form.files
                        .entry(name)
                        .or_default()
                        .push(UploadedFile { file_name, content });
                }
                None => {
                    let value = field.text().await?;
                    form.fields.entry(name).or_default().push(value);
                }
            }
        }

        Ok(form)
    }

    pub fn text(&self, name: &str) -> Option<&str> {
        self.fields
            .get(name)
            .and_then(|values| values.first())
            .map(String::as_str)
    }

    /// Trimmed text value, empty when the field is missing
    pub fn string(&self, name: &str) -> String {
        self.text(name).unwrap_or_default().trim().to_string()
    }

    pub fn texts(&self, name: &str) -> &[String] {
        self.fields.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn file(&self, name: &str) -> Option<&UploadedFile> {
        self.files.get(name).and_then(|files| files.first())
    }

    pub fn files(&self, name: &str) -> &[UploadedFile] {
        self.files.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    /// HTML checkboxes are only submitted when ticked.
    pub fn checkbox(&self, name: &str) -> bool {
        self.texts(name)
            .iter()
            .any(|v| matches!(v.trim(), "true" | "on" | "1"))
    }

    pub fn optional_id(&self, name: &str) -> Result<Option<i32>, ServiceError> {
        parse_optional_id(name, self.text(name))
    }

    pub fn ids(&self, name: &str) -> Result<Vec<i32>, ServiceError> {
        self.texts(name)
            .iter()
            .filter(|v| !v.trim().is_empty())
            .map(|v| parse_id(name, v))
            .collect()
    }

    pub fn decimal(&self, name: &str) -> Result<Decimal, ServiceError> {
        parse_decimal(name, self.text(name))
    }
}

fn parse_id(field: &str, raw: &str) -> Result<i32, ServiceError> {
    raw.trim()
        .parse::<i32>()
        .map_err(|_| ServiceError::BadRequest(format!("Invalid number {:?} for {}", raw, field)))
}

/// Blank and zero mean "no id".
fn parse_optional_id(field: &str, raw: Option<&str>) -> Result<Option<i32>, ServiceError> {
    match raw.map(str::trim) {
        None | Some("") => Ok(None),
        Some(value) => {
            let id = parse_id(field, value)?;
            Ok((id > 0).then_some(id))
        }
    }
}

fn parse_decimal(field: &str, raw: Option<&str>) -> Result<Decimal, ServiceError> {
    match raw.map(str::trim) {
        None | Some("") => Ok(Decimal::ZERO),
        Some(value) => Decimal::from_str(value).map_err(|_| {
            ServiceError::BadRequest(format!("Invalid number {:?} for {}", value, field))
        }),
    }
}

/// Zips the `detailIDs`, `detailNames` and `detailValues` arrays.
pub fn zip_detail_records(
    ids: &[String],
    names: &[String],
    values: &[String],
) -> Result<Vec<DetailInput>, ServiceError> {
    if ids.len() != names.len() || names.len() != values.len() {
        return Err(ServiceError::BadRequest(format!(
            "Product detail fields do not line up ({} ids, {} names, {} values)",
            ids.len(),
            names.len(),
            values.len()
        )));
    }

    ids.iter()
        .zip(names)
        .zip(values)
        .map(|((id, name), value)| {
            Ok(DetailInput {
                id: parse_id("detailIDs", id)?,
                name: name.clone(),
                value: value.clone(),
            })
        })
        .collect()
}

/// Zips the `imageIDs` and `imageNames` arrays echoed back for stored extra images.
pub fn zip_image_records(ids: &[String], names: &[String]) -> Result<Vec<ImageInput>, ServiceError> {
    if ids.len() != names.len() {
        return Err(ServiceError::BadRequest(format!(
            "Product image fields do not line up ({} ids, {} names)",
            ids.len(),
            names.len()
        )));
    }

    ids.iter()
        .zip(names)
        .map(|(id, name)| {
            let name = sanitize_file_name(name).ok_or_else(|| {
                ServiceError::BadRequest(format!("Invalid image name {:?}", name))
            })?;
            Ok(ImageInput {
                id: parse_id("imageIDs", id)?,
                name,
            })
        })
        .collect()
}

/// Logs a failed post-commit disk step without affecting the response.
pub fn log_storage_result<T>(
    result: Result<T, crate::storage::StorageError>,
    action: &str,
) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(err) => {
            warn!(error = %err, "Could not {}", action);
            None
        }
    }
}

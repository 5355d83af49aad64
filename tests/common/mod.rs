#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    response::Response,
    Router,
};
use shopme_admin::{config::AppConfig, db, storage::FileStorage, AppState};
use tempfile::TempDir;
use tower::ServiceExt;

const BOUNDARY: &str = "----shopme-test-boundary";

/// One part of a multipart request body
pub enum Part {
    Text(&'static str, String),
    File(&'static str, String, Vec<u8>),
}

impl Part {
    pub fn text(name: &'static str, value: impl ToString) -> Self {
        Part::Text(name, value.to_string())
    }

    pub fn file(name: &'static str, file_name: &str, content: &[u8]) -> Self {
        Part::File(name, file_name.to_string(), content.to_vec())
    }

    /// What a browser sends for a file input left empty
    pub fn empty_file(name: &'static str) -> Self {
        Part::File(name, String::new(), Vec::new())
    }
}

fn multipart_body(parts: &[Part]) -> Vec<u8> {
    let mut body = Vec::new();
    for part in parts {
        body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
        match part {
            Part::Text(name, value) => {
                body.extend_from_slice(
                    format!("Content-Disposition: form-data; name=\"{}\"\r\n\r\n", name)
                        .as_bytes(),
                );
                body.extend_from_slice(value.as_bytes());
            }
            Part::File(name, file_name, content) => {
                body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n",
                        name, file_name
                    )
                    .as_bytes(),
                );
                body.extend_from_slice(b"Content-Type: application/octet-stream\r\n\r\n");
                body.extend_from_slice(content);
            }
        }
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
    body
}

/// Helper harness for spinning up the admin app backed by an in-memory SQLite
/// database and a temporary upload root.
pub struct TestApp {
    router: Router,
    pub state: AppState,
    upload_root: TempDir,
}

impl TestApp {
    pub async fn new() -> Self {
        let upload_root = TempDir::new().expect("create upload root");

        let mut cfg = AppConfig::new(
            "sqlite::memory:".to_string(),
            "127.0.0.1".to_string(),
            18_080,
            "test".to_string(),
        );
        // Every connection to sqlite::memory: opens a separate database.
        cfg.db_max_connections = 1;
        cfg.db_min_connections = 1;
        cfg.upload_root = upload_root.path().to_string_lossy().into_owned();

        let pool = db::establish_connection_from_app_config(&cfg)
            .await
            .expect("failed to create test database");
        db::run_migrations(&pool)
            .await
            .expect("failed to run migrations in tests");

        let state = AppState::new(Arc::new(pool), cfg);
        state
            .services
            .settings
            .ensure_defaults()
            .await
            .expect("default settings");

        let router = shopme_admin::app_router(state.clone());

        Self {
            router,
            state,
            upload_root,
        }
    }

    pub fn storage(&self) -> &FileStorage {
        &self.state.storage
    }

    pub fn upload_path(&self, relative: &str) -> PathBuf {
        self.upload_root.path().join(relative)
    }

    pub async fn send(&self, request: Request<Body>) -> Response {
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router is infallible")
    }

    pub async fn get(&self, uri: &str) -> Response {
        self.send(
            Request::builder()
                .method(Method::GET)
                .uri(uri)
                .body(Body::empty())
                .unwrap(),
        )
        .await
    }

    pub async fn get_with_cookie(&self, uri: &str, cookie: &str) -> Response {
        self.send(
            Request::builder()
                .method(Method::GET)
                .uri(uri)
                .header(header::COOKIE, cookie)
                .body(Body::empty())
                .unwrap(),
        )
        .await
    }

    pub async fn post_multipart(&self, uri: &str, parts: &[Part]) -> Response {
        self.send(
            Request::builder()
                .method(Method::POST)
                .uri(uri)
                .header(
                    header::CONTENT_TYPE,
                    format!("multipart/form-data; boundary={}", BOUNDARY),
                )
                .body(Body::from(multipart_body(parts)))
                .unwrap(),
        )
        .await
    }

    pub async fn post_form(&self, uri: &str, pairs: &[(&str, &str)]) -> Response {
        let body: String = url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(pairs)
            .finish();
        self.send(
            Request::builder()
                .method(Method::POST)
                .uri(uri)
                .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                .body(Body::from(body))
                .unwrap(),
        )
        .await
    }
}

/// Asserts a 303 to `location` and returns the decoded flash message.
pub fn expect_redirect(response: &Response, location: &str) -> Option<String> {
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(response.headers()[header::LOCATION], location);
    flash_message(response)
}

pub fn flash_message(response: &Response) -> Option<String> {
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .filter_map(|cookie| cookie.split(';').next())
        .filter_map(|pair| pair.split_once('='))
        .find(|(name, value)| *name == "flash" && !value.is_empty())
        .and_then(|(_, value)| {
            url::form_urlencoded::parse(value.as_bytes())
                .next()
                .map(|(decoded, _)| decoded.into_owned())
        })
}

pub async fn body_text(response: Response) -> String {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

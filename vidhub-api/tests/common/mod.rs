//! Common test utilities for integration tests
//!
//! The router is driven in-process with `tower::ServiceExt::oneshot` against
//! a [`MemoryStore`] and a fake media host, so no database or network is
//! needed. Staged uploads go to a per-test temporary directory.

#![allow(dead_code)]

use std::{
    path::PathBuf,
    sync::{Arc, Mutex},
};

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{header, HeaderMap, Request, StatusCode},
    Router,
};
use chrono::Duration;
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::ServiceExt;
use vidhub_api::{
    app::{build_router, AppState},
    config::{ApiConfig, Config, DatabaseConfig, UploadConfig},
};
use vidhub_shared::{
    auth::jwt::TokenConfig,
    media::{CloudinaryConfig, MediaError, MediaHost, UploadedMedia},
    store::MemoryStore,
};

pub const ACCESS_SECRET: &str = "test-access-secret-at-least-32-bytes-long";
pub const REFRESH_SECRET: &str = "test-refresh-secret-at-least-32-bytes-long";

/// Files whose content starts with this marker are rejected by [`FakeMediaHost`]
pub const FAIL_UPLOAD: &[u8] = b"FAIL";

/// Media host that records uploads instead of sending them anywhere
#[derive(Default)]
pub struct FakeMediaHost {
    uploads: Mutex<Vec<PathBuf>>,
}

impl FakeMediaHost {
    /// Paths that were passed to `upload`, in call order
    pub fn uploaded_paths(&self) -> Vec<PathBuf> {
        self.uploads.lock().unwrap().clone()
    }
}

#[async_trait]
impl MediaHost for FakeMediaHost {
    async fn upload(&self, local_path: &std::path::Path) -> Result<UploadedMedia, MediaError> {
        let bytes = tokio::fs::read(local_path).await.map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => MediaError::FileNotFound(local_path.to_path_buf()),
            _ => MediaError::Io(e),
        })?;
        self.uploads.lock().unwrap().push(local_path.to_path_buf());

        if bytes.starts_with(FAIL_UPLOAD) {
            return Err(MediaError::Rejected {
                status: 400,
                message: "Invalid image file".to_string(),
            });
        }

        let name = local_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        Ok(UploadedMedia {
            url: format!("http://media.test/{}", name),
            secure_url: format!("https://media.test/{}", name),
            public_id: name,
        })
    }
}

/// Minimal multipart/form-data body builder
pub struct MultipartBody {
    boundary: String,
    buf: Vec<u8>,
}

impl MultipartBody {
    pub fn new() -> Self {
        Self {
            boundary: "vidhub-test-boundary-7MA4YWxkTrZu0gW".to_string(),
            buf: Vec::new(),
        }
    }

    pub fn text(mut self, name: &str, value: &str) -> Self {
        self.buf.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"{}\"\r\n\r\n{}\r\n",
                self.boundary, name, value
            )
            .as_bytes(),
        );
        self
    }

    pub fn file(mut self, name: &str, file_name: &str, content: &[u8]) -> Self {
        self.buf.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\nContent-Type: application/octet-stream\r\n\r\n",
                self.boundary, name, file_name
            )
            .as_bytes(),
        );
        self.buf.extend_from_slice(content);
        self.buf.extend_from_slice(b"\r\n");
        self
    }

    pub fn content_type(&self) -> String {
        format!("multipart/form-data; boundary={}", self.boundary)
    }

    pub fn finish(mut self) -> (String, Vec<u8>) {
        self.buf
            .extend_from_slice(format!("--{}--\r\n", self.boundary).as_bytes());
        (self.content_type(), self.buf)
    }
}

/// Response with the body parsed as JSON
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Value,
}

impl TestResponse {
    /// All `Set-Cookie` header values
    pub fn set_cookies(&self) -> Vec<String> {
        self.headers
            .get_all(header::SET_COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .map(str::to_string)
            .collect()
    }

    /// `Set-Cookie` line for `name`
    pub fn set_cookie(&self, name: &str) -> Option<String> {
        let prefix = format!("{}=", name);
        self.set_cookies().into_iter().find(|c| c.starts_with(&prefix))
    }

    pub fn message(&self) -> &str {
        self.body["message"].as_str().unwrap_or_default()
    }
}

/// A logged-in test user
pub struct Session {
    pub user: Value,
    pub access_token: String,
    pub refresh_token: String,
}

impl Session {
    pub fn id(&self) -> uuid::Uuid {
        self.user["id"].as_str().unwrap().parse().unwrap()
    }
}

/// Test context containing all necessary resources
pub struct TestContext {
    pub app: Router,
    pub store: Arc<MemoryStore>,
    pub media: Arc<FakeMediaHost>,
    pub upload_dir: TempDir,
}

impl TestContext {
    pub fn new() -> Self {
        Self::with_token_expiry(Duration::minutes(15), Duration::days(7))
    }

    /// Context whose tokens live for the given durations (negative = already expired)
    pub fn with_token_expiry(access: Duration, refresh: Duration) -> Self {
        let upload_dir = tempfile::tempdir().unwrap();

        let config = Config {
            api: ApiConfig {
                host: "127.0.0.1".to_string(),
                port: 0,
                cors_origins: vec!["*".to_string()],
                production: false,
            },
            database: DatabaseConfig {
                url: "postgresql://unused/vidhub".to_string(),
                max_connections: 1,
            },
            tokens: TokenConfig {
                access_secret: ACCESS_SECRET.to_string(),
                access_expiry: access,
                refresh_secret: REFRESH_SECRET.to_string(),
                refresh_expiry: refresh,
            },
            cloudinary: CloudinaryConfig {
                cloud_name: "test".to_string(),
                api_key: "test".to_string(),
                api_secret: "test".to_string(),
            },
            uploads: UploadConfig {
                dir: upload_dir.path().join("staging"),
                max_bytes: 1024 * 1024,
            },
        };

        let store = Arc::new(MemoryStore::new());
        let media = Arc::new(FakeMediaHost::default());
        let state = AppState::new(store.clone(), media.clone(), config);

        Self {
            app: build_router(state),
            store,
            media,
            upload_dir,
        }
    }

    /// Files currently left in the staging directory
    pub fn staged_files(&self) -> Vec<PathBuf> {
        match std::fs::read_dir(self.upload_dir.path().join("staging")) {
            Ok(entries) => entries.filter_map(|e| e.ok()).map(|e| e.path()).collect(),
            Err(_) => Vec::new(),
        }
    }

    pub async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = self.app.clone().oneshot(request).await.unwrap();

        let status = response.status();
        let headers = response.headers().clone();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|_| {
                Value::String(String::from_utf8_lossy(&bytes).into_owned())
            })
        };

        TestResponse {
            status,
            headers,
            body,
        }
    }

    pub async fn get(&self, uri: &str, access_token: Option<&str>) -> TestResponse {
        let mut builder = Request::builder().method("GET").uri(uri);
        if let Some(token) = access_token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        self.send(builder.body(Body::empty()).unwrap()).await
    }

    pub async fn send_json(
        &self,
        method: &str,
        uri: &str,
        access_token: Option<&str>,
        body: Value,
    ) -> TestResponse {
        let mut builder = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(token) = access_token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        self.send(builder.body(Body::from(body.to_string())).unwrap()).await
    }

    pub async fn send_multipart(
        &self,
        method: &str,
        uri: &str,
        access_token: Option<&str>,
        form: MultipartBody,
    ) -> TestResponse {
        let (content_type, bytes) = form.finish();
        let mut builder = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, content_type);
        if let Some(token) = access_token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        self.send(builder.body(Body::from(bytes)).unwrap()).await
    }

    /// Registration form with every field and an avatar
    pub fn registration_form(username: &str, email: &str, password: &str) -> MultipartBody {
        MultipartBody::new()
            .text("fullName", &format!("{} Example", username))
            .text("email", email)
            .text("username", username)
            .text("password", password)
            .file("avatar", "avatar.png", b"\x89PNG avatar bytes")
    }

    pub async fn register(&self, username: &str, email: &str, password: &str) -> TestResponse {
        self.send_multipart(
            "POST",
            "/api/v1/users/register",
            None,
            Self::registration_form(username, email, password),
        )
        .await
    }

    pub async fn login(&self, username: &str, password: &str) -> TestResponse {
        self.send_json(
            "POST",
            "/api/v1/users/login",
            None,
            json!({ "username": username, "password": password }),
        )
        .await
    }

    /// Registers `username` and logs in
    pub async fn signed_in(&self, username: &str) -> Session {
        let email = format!("{}@example.com", username);
        let registered = self.register(username, &email, "password123").await;
        assert_eq!(registered.status, StatusCode::CREATED, "{}", registered.body);

        let login = self.login(username, "password123").await;
        assert_eq!(login.status, StatusCode::OK, "{}", login.body);

        Session {
            user: login.body["data"]["user"].clone(),
            access_token: login.body["data"]["accessToken"].as_str().unwrap().to_string(),
            refresh_token: login.body["data"]["refreshToken"].as_str().unwrap().to_string(),
        }
    }
}

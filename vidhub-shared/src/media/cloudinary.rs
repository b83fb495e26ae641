/// Cloudinary upload client
///
/// Uses the signed upload endpoint with `resource_type` = `auto`, so images
/// and videos go through the same call. Requests are signed with SHA-256:
/// the signed parameters are sorted by name, joined as `k=v&k=v`, suffixed
/// with the API secret and hashed.

use std::collections::BTreeMap;
use std::path::Path;

use async_trait::async_trait;
use chrono::Utc;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};

use super::{MediaError, MediaHost, UploadedMedia};

const API_BASE: &str = "https://api.cloudinary.com/v1_1";

/// Account credentials
#[derive(Debug, Clone)]
pub struct CloudinaryConfig {
    pub cloud_name: String,
    pub api_key: String,
    pub api_secret: String,
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    url: String,
    secure_url: String,
    public_id: String,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: ErrorMessage,
}

#[derive(Debug, Deserialize)]
struct ErrorMessage {
    message: String,
}

/// Signs a parameter set for the upload API
pub fn sign_params(params: &BTreeMap<&str, String>, api_secret: &str) -> String {
    let to_sign = params
        .iter()
        .map(|(key, value)| format!("{}={}", key, value))
        .collect::<Vec<_>>()
        .join("&");

    let mut hasher = Sha256::new();
    hasher.update(to_sign.as_bytes());
    hasher.update(api_secret.as_bytes());
    hex::encode(hasher.finalize())
}

/// HTTP client for one Cloudinary account
#[derive(Clone)]
pub struct CloudinaryClient {
    config: CloudinaryConfig,
    http: reqwest::Client,
}

impl CloudinaryClient {
    pub fn new(config: CloudinaryConfig) -> Self {
        Self {
            config,
            http: reqwest::Client::new(),
        }
    }

    fn upload_url(&self) -> String {
        format!("{}/{}/auto/upload", API_BASE, self.config.cloud_name)
    }
}

#[async_trait]
impl MediaHost for CloudinaryClient {
    async fn upload(&self, local_path: &Path) -> Result<UploadedMedia, MediaError> {
        if !tokio::fs::try_exists(local_path).await.unwrap_or(false) {
            return Err(MediaError::FileNotFound(local_path.to_path_buf()));
        }

        let bytes = tokio::fs::read(local_path).await?;
        let file_name = local_path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload".to_string());

        let timestamp = Utc::now().timestamp().to_string();
        let mut signed = BTreeMap::new();
        signed.insert("timestamp", timestamp.clone());
        let signature = sign_params(&signed, &self.config.api_secret);

        let form = Form::new()
            .part("file", Part::bytes(bytes).file_name(file_name.clone()))
            .text("api_key", self.config.api_key.clone())
            .text("timestamp", timestamp)
            .text("signature", signature)
            .text("signature_algorithm", "sha256");

        debug!(file = %file_name, "Uploading file to media host");

        let response = self.http.post(self.upload_url()).multipart(form).send().await?;
        let status = response.status();

        if !status.is_success() {
            let message = match response.json::<ErrorBody>().await {
                Ok(body) => body.error.message,
                Err(_) => status.canonical_reason().unwrap_or("unknown error").to_string(),
            };
            warn!(status = status.as_u16(), %message, "Media host rejected upload");
            return Err(MediaError::Rejected {
                status: status.as_u16(),
                message,
            });
        }

        let body: UploadResponse = response.json().await?;
        info!(public_id = %body.public_id, "Uploaded file to media host");

        Ok(UploadedMedia {
            url: body.url,
            secure_url: body.secure_url,
            public_id: body.public_id,
        })
    }
}

/// Remote media hosting
///
/// Avatars and cover images are staged on local disk by the API and then
/// pushed to a media host, which returns a public URL. [`MediaHost`] is the
/// seam; [`cloudinary::CloudinaryClient`] is the production implementation.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub mod cloudinary;

pub use cloudinary::{CloudinaryClient, CloudinaryConfig};

/// Result of a successful upload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadedMedia {
    /// Plain URL as reported by the host
    pub url: String,

    /// HTTPS URL; this is what gets stored on the user
    pub secure_url: String,

    /// Host-side identifier
    pub public_id: String,
}

/// Error type for media uploads
#[derive(Debug, thiserror::Error)]
pub enum MediaError {
    /// Local file vanished before upload
    #[error("File not found: {}", .0.display())]
    FileNotFound(PathBuf),

    #[error("Failed to read file: {0}")]
    Io(#[from] std::io::Error),

    /// Transport or decoding failure
    #[error("Media host request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// Host answered with a non-success status
    #[error("Media host rejected upload ({status}): {message}")]
    Rejected { status: u16, message: String },
}

/// Something that can turn a local file into a public URL
#[async_trait]
pub trait MediaHost: Send + Sync {
    async fn upload(&self, local_path: &Path) -> Result<UploadedMedia, MediaError>;
}

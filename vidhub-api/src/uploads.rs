/// Multipart staging
///
/// Text parts are collected into a map. File parts are streamed to the
/// staging directory under a random name (the extension is preserved) and
/// wrapped in a [`StagedFile`] that deletes the file when dropped, whether
/// or not the upload to the media host succeeded.

use std::{
    collections::HashMap,
    path::{Path, PathBuf},
};

use axum::extract::Multipart;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};

/// A file on local disk that is removed on drop
#[derive(Debug)]
pub struct StagedFile {
    path: PathBuf,
    original_name: String,
    size: u64,
}

impl StagedFile {
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// File name as sent by the client
    pub fn original_name(&self) -> &str {
        &self.original_name
    }

    pub fn size(&self) -> u64 {
        self.size
    }
}

impl Drop for StagedFile {
    fn drop(&mut self) {
        match std::fs::remove_file(&self.path) {
            Ok(()) => debug!(path = %self.path.display(), "Removed staged upload"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!(path = %self.path.display(), error = %e, "Failed to remove staged upload"),
        }
    }
}

/// Parsed multipart form
#[derive(Debug, Default)]
pub struct MultipartForm {
    fields: HashMap<String, String>,
    files: HashMap<String, StagedFile>,
}

impl MultipartForm {
    /// Reads every part of `multipart`
    ///
    /// Only parts named in `file_fields` may carry files, at most one each.
    /// A file part without a file name or without content counts as absent.
    pub async fn read(
        mut multipart: Multipart,
        staging_dir: &Path,
        file_fields: &[&str],
    ) -> ApiResult<Self> {
        let mut form = MultipartForm::default();

        while let Some(mut field) = multipart.next_field().await? {
            let name = field.name().unwrap_or_default().to_string();

            let Some(file_name) = field.file_name().map(str::to_string) else {
                let value = field.text().await?;
                form.fields.insert(name, value);
                continue;
            };

            if !file_fields.contains(&name.as_str()) {
                return Err(ApiError::BadRequest(format!("Unexpected file field '{}'", name)));
            }
            if form.files.contains_key(&name) {
                return Err(ApiError::BadRequest(format!("Only one '{}' file is allowed", name)));
            }
            if file_name.is_empty() {
                continue;
            }

            tokio::fs::create_dir_all(staging_dir).await?;
            let mut staged = StagedFile {
                path: staging_dir.join(staged_name(&file_name)),
                original_name: file_name,
                size: 0,
            };

            let mut file = tokio::fs::File::create(&staged.path).await?;
            while let Some(chunk) = field.chunk().await? {
                file.write_all(&chunk).await?;
                staged.size += chunk.len() as u64;
            }
            file.flush().await?;

            if staged.size == 0 {
                continue;
            }

            debug!(field = %name, size = staged.size, "Staged upload");
            form.files.insert(name, staged);
        }

        Ok(form)
    }

    /// Text field value, if sent
    pub fn text(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }

    /// Takes ownership of a staged file
    pub fn take_file(&mut self, name: &str) -> Option<StagedFile> {
        self.files.remove(name)
    }
}

/// Random file name that keeps a sanitized extension of `original`
fn staged_name(original: &str) -> String {
    let extension = Path::new(original)
        .extension()
        .and_then(|ext| ext.to_str())
        .filter(|ext| !ext.is_empty() && ext.len() <= 10 && ext.chars().all(|c| c.is_ascii_alphanumeric()))
        .map(|ext| format!(".{}", ext.to_ascii_lowercase()))
        .unwrap_or_default();

    format!("{}{}", Uuid::new_v4().simple(), extension)
}

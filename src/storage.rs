use std::path::{Path, PathBuf};

use tokio::fs;
use tracing::debug;

use crate::errors::AppError;

/// URL prefix under which stored uploads are served.
pub const UPLOADS_ROUTE: &str = "/uploads";

/// Stores widget uploads on local disk, one directory per session.
#[derive(Clone)]
pub struct UploadStore {
    root: PathBuf,
    public_base_url: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StoredFile {
    pub relative_path: String,
    pub url: String,
}

impl UploadStore {
    pub fn new(root: impl Into<PathBuf>, public_base_url: &str) -> Self {
        Self {
            root: root.into(),
            public_base_url: public_base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub async fn save(
        &self,
        session_id: &str,
        original_name: &str,
        bytes: &[u8],
    ) -> Result<StoredFile, AppError> {
        let dir_name = sanitize_segment(session_id);
        if dir_name.is_empty() {
            return Err(AppError::InvalidUpload { message: "invalid session id".to_string() });
        }

        let file_name = match extension_of(original_name) {
            Some(ext) => format!("{}.{ext}", uuid::Uuid::new_v4()),
            None => uuid::Uuid::new_v4().to_string(),
        };

        let dir = self.root.join(&dir_name);
        fs::create_dir_all(&dir).await?;
        fs::write(dir.join(&file_name), bytes).await?;

        let relative_path = format!("{dir_name}/{file_name}");
        debug!("Stored upload {original_name} as {relative_path} ({} bytes)", bytes.len());
        Ok(StoredFile {
            url: format!("{}{UPLOADS_ROUTE}/{relative_path}", self.public_base_url),
            relative_path,
        })
    }
}

fn sanitize_segment(raw: &str) -> String {
    raw.chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '-' || *c == '_')
        .collect()
}

/// Extensions kept on stored files. Anything else is stored without one and
/// served as `application/octet-stream`.
const ALLOWED_EXTENSIONS: &[&str] = &[
    "png", "jpg", "jpeg", "gif", "webp", "pdf", "txt", "doc", "docx",
];

fn extension_of(name: &str) -> Option<String> {
    let ext = Path::new(name).extension()?.to_str()?.to_ascii_lowercase();
    ALLOWED_EXTENSIONS.contains(&ext.as_str()).then_some(ext)
}

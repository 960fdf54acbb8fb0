//! Disk-backed storage for uploaded documents.
//!
//! Files land in the configured upload directory under a unique
//! sanitized name. Storage is best-effort with respect to the
//! database: a crash between the file write and the metadata insert
//! can orphan a file, which is accepted (the file is never the source
//! of truth).

use std::path::{Path, PathBuf};

use chrono::Utc;
use stockroom_core::StockroomError;
use tracing::warn;
use uuid::Uuid;

use crate::error::ApiResult;

/// Metadata of a stored upload, fed into the document records.
#[derive(Debug, Clone)]
pub struct StoredUpload {
    pub file_name: String,
    pub stored_file_name: String,
    pub file_size: u64,
    pub mime_type: Option<String>,
}

pub struct UploadStore {
    dir: PathBuf,
}

impl UploadStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path_of(&self, stored_file_name: &str) -> PathBuf {
        self.dir.join(stored_file_name)
    }

    /// Persist the uploaded bytes under a unique name.
    pub async fn save(
        &self,
        original_name: &str,
        mime_type: Option<String>,
        bytes: &[u8],
    ) -> ApiResult<StoredUpload> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| StockroomError::Internal(format!("upload dir: {e}")))?;

        let stored_file_name = format!(
            "{}-{}-{}",
            Utc::now().timestamp_millis(),
            Uuid::new_v4().simple(),
            sanitize_file_name(original_name),
        );

        let path = self.path_of(&stored_file_name);
        tokio::fs::write(&path, bytes)
            .await
            .map_err(|e| StockroomError::Internal(format!("file write: {e}")))?;

        Ok(StoredUpload {
            file_name: original_name.to_string(),
            stored_file_name,
            file_size: bytes.len() as u64,
            mime_type,
        })
    }

    /// Read a stored file back; `None` when it is missing on disk.
    pub async fn read(&self, stored_file_name: &str) -> ApiResult<Option<Vec<u8>>> {
        match tokio::fs::read(self.path_of(stored_file_name)).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StockroomError::Internal(format!("file read: {e}")).into()),
        }
    }

    /// Best-effort removal; a failure is logged, never surfaced.
    pub async fn remove(&self, stored_file_name: &str) {
        if let Err(e) = tokio::fs::remove_file(self.path_of(stored_file_name)).await {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!(stored_file_name, error = %e, "could not remove stored file");
            }
        }
    }
}

/// Keep `[A-Za-z0-9._-]`, replace anything else, and drop any path
/// components the client sent along.
fn sanitize_file_name(original: &str) -> String {
    let base = Path::new(original)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("upload");
    let sanitized: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();
    if sanitized.is_empty() {
        "upload".into()
    } else {
        sanitized
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_replaces_special_characters() {
        assert_eq!(sanitize_file_name("guía despacho.pdf"), "gu_a_despacho.pdf");
        assert_eq!(sanitize_file_name("act-2024_v1.PDF"), "act-2024_v1.PDF");
    }

    #[test]
    fn sanitize_strips_path_components() {
        assert_eq!(sanitize_file_name("../../etc/passwd"), "passwd");
        assert_eq!(sanitize_file_name("/tmp/x.pdf"), "x.pdf");
    }

    #[test]
    fn sanitize_never_returns_empty() {
        assert_eq!(sanitize_file_name(""), "upload");
    }

    #[tokio::test]
    async fn save_and_read_roundtrip() {
        let dir = std::env::temp_dir().join(format!("stockroom-up-{}", Uuid::new_v4()));
        let store = UploadStore::new(&dir);

        let stored = store
            .save("receipt.pdf", Some("application/pdf".into()), b"content")
            .await
            .unwrap();
        assert_eq!(stored.file_name, "receipt.pdf");
        assert_eq!(stored.file_size, 7);
        assert!(stored.stored_file_name.ends_with("receipt.pdf"));

        let bytes = store.read(&stored.stored_file_name).await.unwrap();
        assert_eq!(bytes.as_deref(), Some(b"content".as_slice()));

        store.remove(&stored.stored_file_name).await;
        assert!(store.read(&stored.stored_file_name).await.unwrap().is_none());

        tokio::fs::remove_dir_all(&dir).await.ok();
    }
}

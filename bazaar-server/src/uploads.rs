//! Attachment store.
//!
//! Binary content is written before a message is posted; the message only
//! records the returned URL. [`LocalAttachmentStore`] writes into the
//! configured upload directory, which the router serves under `/uploads`.

use std::future::Future;
use std::path::{Path, PathBuf};

use chrono::Utc;
use tracing::{info, warn};

use crate::error::DmError;

/// URL prefix the upload directory is served under.
pub const UPLOADS_ROUTE: &str = "/uploads";

/// Extensions we expect to see. Anything else is still accepted.
const ALLOWED_EXTENSIONS: &[&str] = &[
    "jpg", "jpeg", "png", "gif", "webp", "heic", "mp4", "mov", "webm", "pdf", "txt", "doc",
    "docx", "xls", "xlsx", "zip",
];

/// Persists uploaded bytes and hands back a stable relative URL.
pub trait AttachmentStore: Send + Sync + 'static {
    fn store(
        &self,
        filename: &str,
        bytes: &[u8],
    ) -> impl Future<Output = Result<String, DmError>> + Send;
}

/// Filesystem-backed [`AttachmentStore`].
#[derive(Clone, Debug)]
pub struct LocalAttachmentStore {
    root: PathBuf,
}

impl LocalAttachmentStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl AttachmentStore for LocalAttachmentStore {
    async fn store(&self, filename: &str, bytes: &[u8]) -> Result<String, DmError> {
        if bytes.is_empty() {
            return Err(DmError::Validation("uploaded file is empty".into()));
        }
        let base = sanitize_filename(filename)
            .ok_or_else(|| DmError::Validation("invalid file name".into()))?;
        if !has_allowed_extension(&base) {
            warn!(filename = %base, "upload extension not in allow-list; storing anyway");
        }

        tokio::fs::create_dir_all(&self.root).await?;
        let stored_name = format!(
            "{}_{}",
            Utc::now().timestamp_nanos_opt().unwrap_or_default(),
            base
        );
        tokio::fs::write(self.root.join(&stored_name), bytes).await?;

        info!(file = %stored_name, size = bytes.len(), "attachment stored");
        Ok(format!("{UPLOADS_ROUTE}/{stored_name}"))
    }
}

/// Keep only the final path component so callers cannot escape the root.
fn sanitize_filename(raw: &str) -> Option<String> {
    let base = raw.rsplit(['/', '\\']).next()?.trim();
    if base.is_empty() || base == "." || base == ".." {
        return None;
    }
    Some(base.to_owned())
}

fn has_allowed_extension(name: &str) -> bool {
    Path::new(name)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| ALLOWED_EXTENSIONS.iter().any(|a| a.eq_ignore_ascii_case(e)))
        .unwrap_or(false)
}

// ── Tests ──────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod test {
    use super::*;
    use tracing_test::traced_test;

    fn temp_root() -> PathBuf {
        std::env::temp_dir().join(format!("bazaar-uploads-{}", uuid::Uuid::new_v4()))
    }

    #[test]
    fn filenames_are_reduced_to_their_base() {
        assert_eq!(sanitize_filename("../../etc/passwd").as_deref(), Some("passwd"));
        assert_eq!(sanitize_filename("C:\\tmp\\cat.png").as_deref(), Some("cat.png"));
        assert_eq!(sanitize_filename("dir/"), None);
        assert_eq!(sanitize_filename(".."), None);
    }

    #[tokio::test]
    async fn stores_file_under_root_and_returns_url() {
        let root = temp_root();
        let store = LocalAttachmentStore::new(&root);

        let url = store.store("photos/cat.png", b"\x89PNG").await.unwrap();
        assert!(url.starts_with("/uploads/"));
        assert!(url.ends_with("_cat.png"));

        let name = url.trim_start_matches("/uploads/");
        let written = tokio::fs::read(root.join(name)).await.unwrap();
        assert_eq!(written, b"\x89PNG");
        let _ = tokio::fs::remove_dir_all(&root).await;
    }

    #[tokio::test]
    async fn empty_upload_is_rejected() {
        let store = LocalAttachmentStore::new(temp_root());
        assert!(matches!(
            store.store("a.png", b"").await,
            Err(DmError::Validation(_))
        ));
    }

    #[tokio::test]
    #[traced_test]
    async fn unknown_extension_is_only_advisory() {
        let root = temp_root();
        let store = LocalAttachmentStore::new(&root);

        let url = store.store("payload.exe", b"MZ").await.unwrap();
        assert!(url.ends_with("_payload.exe"));
        assert!(logs_contain("not in allow-list"));
        let _ = tokio::fs::remove_dir_all(&root).await;
    }
}

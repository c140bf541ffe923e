//! Loading loan-offer documents from disk.

use std::path::{Path, PathBuf};

use fixr_core::{ArenaError, UploadDocument};
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug)]
pub enum DocumentError {
    #[error("reading {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error(transparent)]
    Rejected(#[from] ArenaError),
}

/// Read and validate a document for upload.
///
/// Type and size are checked here so an unsupported file never reaches the
/// network.
pub async fn read_document(path: &Path) -> Result<UploadDocument, DocumentError> {
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|source| DocumentError::Io {
            path: path.to_path_buf(),
            source,
        })?;
    let doc = UploadDocument::new(file_name, bytes);
    doc.validate()?;
    debug!(file = %doc.file_name, size = %doc.size_label(), "document ready");
    Ok(doc)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[tokio::test]
    async fn reads_a_pdf() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("offer.pdf");
        std::fs::File::create(&path)
            .unwrap()
            .write_all(b"%PDF-1.7 loan offer")
            .unwrap();

        let doc = read_document(&path).await.unwrap();
        assert_eq!(doc.file_name, "offer.pdf");
        assert_eq!(doc.bytes, b"%PDF-1.7 loan offer");
        assert_eq!(doc.mime_type(), "application/pdf");
    }

    #[tokio::test]
    async fn rejects_unsupported_type() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("offer.png");
        std::fs::write(&path, b"\x89PNG").unwrap();

        let err = read_document(&path).await.unwrap_err();
        assert!(matches!(err, DocumentError::Rejected(_)));
    }

    #[tokio::test]
    async fn missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = read_document(&dir.path().join("absent.pdf"))
            .await
            .unwrap_err();
        assert!(matches!(err, DocumentError::Io { .. }));
        assert!(err.to_string().contains("absent.pdf"));
    }
}

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use tokio::fs;

/// Rendered certificate files, grouped in one folder per certificate type.
#[async_trait]
pub trait CertificateStore: Send + Sync + 'static {
    /// Writes `bytes` to `<folder>/<file_name>`, creating the folder when absent.
    async fn save(&self, folder: &str, file_name: &str, bytes: &[u8]) -> Result<PathBuf>;

    async fn load(&self, folder: &str, file_name: &str) -> Result<Vec<u8>>;
}

pub struct LocalFolderStore {
    root: PathBuf,
}

impl LocalFolderStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, folder: &str, file_name: &str) -> Result<PathBuf> {
        for segment in [folder, file_name] {
            if segment.is_empty()
                || segment == "."
                || segment == ".."
                || segment.contains(|ch: char| ch == '/' || ch == '\\')
            {
                bail!("invalid certificate path segment `{segment}`");
            }
        }
        Ok(self.root.join(folder).join(file_name))
    }
}

#[async_trait]
impl CertificateStore for LocalFolderStore {
    async fn save(&self, folder: &str, file_name: &str, bytes: &[u8]) -> Result<PathBuf> {
        let path = self.resolve(folder, file_name)?;
        let dir = self.root.join(folder);
        fs::create_dir_all(&dir)
            .await
            .with_context(|| format!("failed to create certificate folder {}", dir.display()))?;
        fs::write(&path, bytes)
            .await
            .with_context(|| format!("failed to write certificate {}", path.display()))?;
        Ok(path)
    }

    async fn load(&self, folder: &str, file_name: &str) -> Result<Vec<u8>> {
        let path = self.resolve(folder, file_name)?;
        fs::read(&path)
            .await
            .with_context(|| format!("failed to read certificate {}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn save_creates_missing_folder() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalFolderStore::new(dir.path());

        let path = store
            .save("iccCertificate", "Asha_Rao_certificate.pdf", b"%PDF-1.3")
            .await
            .unwrap();

        assert_eq!(path, dir.path().join("iccCertificate/Asha_Rao_certificate.pdf"));
        let loaded = store
            .load("iccCertificate", "Asha_Rao_certificate.pdf")
            .await
            .unwrap();
        assert_eq!(loaded, b"%PDF-1.3");
    }

    #[tokio::test]
    async fn rejects_traversal_segments() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalFolderStore::new(dir.path());

        assert!(store.save("..", "x.pdf", b"x").await.is_err());
        assert!(store.save("lorCertificate", "../x.pdf", b"x").await.is_err());
        assert!(store.load("lorCertificate", "").await.is_err());
    }

    #[tokio::test]
    async fn load_reports_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalFolderStore::new(dir.path());
        let err = store.load("offerletter", "nobody_certificate.pdf").await;
        assert!(err.is_err());
    }
}

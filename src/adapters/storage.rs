use crate::domain::ports::Storage;
use crate::utils::error::{DocError, Result};
use std::path::{Component, Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

static TEMP_COUNTER: AtomicU64 = AtomicU64::new(0);

#[derive(Debug, Clone)]
pub struct LocalStorage {
    base_path: PathBuf,
}

impl LocalStorage {
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// Joins `path` under the root; absolute paths and `..` are refused.
    fn resolve(&self, path: &str) -> Result<PathBuf> {
        let relative = Path::new(path);
        let escapes = relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
        if path.is_empty() || escapes {
            return Err(DocError::InvalidRequest {
                message: format!("Path '{}' is outside the storage root", path),
            });
        }
        Ok(self.base_path.join(relative))
    }
}

impl Storage for LocalStorage {
    async fn read_file(&self, path: &str) -> Result<Vec<u8>> {
        let full_path = self.resolve(path)?;
        let data = tokio::fs::read(full_path).await?;
        Ok(data)
    }

    async fn write_file(&self, path: &str, data: &[u8]) -> Result<()> {
        let full_path = self.resolve(path)?;

        if let Some(parent) = full_path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        // 先寫入暫存檔再改名，讀者不會看到寫到一半的檔案
        let seq = TEMP_COUNTER.fetch_add(1, Ordering::Relaxed);
        let mut temp_name = full_path.as_os_str().to_owned();
        temp_name.push(format!(".{}.{}.tmp", std::process::id(), seq));
        let temp_path = PathBuf::from(temp_name);

        if let Err(e) = tokio::fs::write(&temp_path, data).await {
            let _ = tokio::fs::remove_file(&temp_path).await;
            return Err(e.into());
        }
        tokio::fs::rename(&temp_path, &full_path).await?;

        tracing::debug!("Wrote {} bytes to {}", data.len(), full_path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_write_then_read() {
        let dir = TempDir::new().unwrap();
        let storage = LocalStorage::new(dir.path());

        storage.write_file("nested/report.txt", b"hello").await.unwrap();
        assert_eq!(storage.read_file("nested/report.txt").await.unwrap(), b"hello");

        storage.write_file("nested/report.txt", b"replaced").await.unwrap();
        assert_eq!(storage.read_file("nested/report.txt").await.unwrap(), b"replaced");

        let leftovers: Vec<_> = std::fs::read_dir(dir.path().join("nested"))
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(leftovers.len(), 1);
    }

    #[tokio::test]
    async fn test_rejects_escaping_paths() {
        let dir = TempDir::new().unwrap();
        let storage = LocalStorage::new(dir.path());

        assert!(storage.write_file("../outside.txt", b"x").await.is_err());
        assert!(storage.write_file("/etc/outside.txt", b"x").await.is_err());
        assert!(storage.read_file("").await.is_err());
    }
}

use crate::domain::model::{DocumentRecord, NewDocument};
use crate::domain::ports::DocumentRepository;
use crate::utils::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;

pub const CATALOG_FILE: &str = "index.json";

#[derive(Debug, Default, Serialize, Deserialize)]
struct CatalogState {
    next_id: u64,
    documents: Vec<DocumentRecord>,
}

/// Document catalog kept in memory and mirrored to `index.json`.
pub struct JsonCatalog {
    path: PathBuf,
    state: Mutex<CatalogState>,
}

impl JsonCatalog {
    /// Loads `<dir>/index.json` if present, otherwise starts empty.
    pub async fn open(dir: impl AsRef<Path>) -> Result<Self> {
        let path = dir.as_ref().join(CATALOG_FILE);
        let state = match tokio::fs::read(&path).await {
            Ok(bytes) => {
                let mut state: CatalogState = serde_json::from_slice(&bytes)?;
                // 確保 id 不會被重用
                let max_id = state.documents.iter().map(|d| d.id).max().unwrap_or(0);
                state.next_id = state.next_id.max(max_id + 1);
                tracing::info!("📚 Loaded {} documents from {}", state.documents.len(), path.display());
                state
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => CatalogState {
                next_id: 1,
                documents: Vec::new(),
            },
            Err(e) => return Err(e.into()),
        };

        Ok(Self {
            path,
            state: Mutex::new(state),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn persist(&self, state: &CatalogState) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let json = serde_json::to_vec_pretty(state)?;
        let mut temp = self.path.clone().into_os_string();
        temp.push(".tmp");
        tokio::fs::write(&temp, json).await?;
        tokio::fs::rename(&temp, &self.path).await?;
        Ok(())
    }
}

#[async_trait]
impl DocumentRepository for JsonCatalog {
    async fn upsert(&self, document: NewDocument) -> Result<DocumentRecord> {
        let mut state = self.state.lock().await;

        let id = state.next_id;
        let record = document.into_record(id);

        let previous = state.documents.iter().position(|d| d.text_path == record.text_path);
        let replaced = previous.map(|idx| state.documents.remove(idx));
        state.documents.push(record.clone());
        state.next_id = id + 1;

        if let Err(e) = self.persist(&state).await {
            // 回滾記憶體狀態，維持與磁碟一致
            state.documents.pop();
            if let (Some(idx), Some(old)) = (previous, replaced) {
                state.documents.insert(idx, old);
            }
            state.next_id = id;
            return Err(e);
        }

        if let Some(idx) = previous {
            tracing::debug!("Replaced catalog entry at position {} for {}", idx, record.text_path);
        }
        Ok(record)
    }

    async fn list(&self) -> Result<Vec<DocumentRecord>> {
        Ok(self.state.lock().await.documents.clone())
    }

    async fn get(&self, id: u64) -> Result<Option<DocumentRecord>> {
        let state = self.state.lock().await;
        Ok(state.documents.iter().find(|d| d.id == id).cloned())
    }

    async fn count(&self) -> usize {
        self.state.lock().await.documents.len()
    }
}

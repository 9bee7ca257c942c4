use crate::adapters::extractors::ExtractorRegistry;
use crate::domain::model::{
    file_extension, output_file_name, DocumentKind, DocumentRecord, DocumentView, NewDocument,
    UploadedFile,
};
use crate::domain::ports::{DocumentRepository, KeywordTagger, Storage};
use crate::utils::error::{DocError, Result};
use crate::utils::monitor::SystemMonitor;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};

pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 50 * 1024 * 1024;
pub const DEFAULT_MAX_FILES_PER_REQUEST: usize = 10;

/// Extracted and tagged, not yet written.
struct PreparedDocument {
    document: NewDocument,
    text: String,
}

/// Turns uploaded documents into text files plus catalog entries.
pub struct IngestService<S: Storage> {
    storage: S,
    catalog: Arc<dyn DocumentRepository>,
    extractors: ExtractorRegistry,
    tagger: Option<Arc<dyn KeywordTagger>>,
    max_upload_bytes: usize,
    max_files_per_request: usize,
    // 序列化「寫檔 + 更新目錄」，同名上傳不會交錯
    write_lock: Mutex<()>,
    monitor: SystemMonitor,
}

impl<S: Storage> IngestService<S> {
    pub fn new(storage: S, catalog: Arc<dyn DocumentRepository>) -> Self {
        Self {
            storage,
            catalog,
            extractors: ExtractorRegistry::default(),
            tagger: None,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            max_files_per_request: DEFAULT_MAX_FILES_PER_REQUEST,
            write_lock: Mutex::new(()),
            monitor: SystemMonitor::default(),
        }
    }

    pub fn with_extractors(mut self, extractors: ExtractorRegistry) -> Self {
        self.extractors = extractors;
        self
    }

    pub fn with_tagger(mut self, tagger: Option<Arc<dyn KeywordTagger>>) -> Self {
        self.tagger = tagger;
        self
    }

    pub fn with_max_upload_bytes(mut self, max_upload_bytes: usize) -> Self {
        self.max_upload_bytes = max_upload_bytes;
        self
    }

    pub fn with_max_files_per_request(mut self, max_files_per_request: usize) -> Self {
        self.max_files_per_request = max_files_per_request;
        self
    }

    pub fn with_monitor(mut self, monitor: SystemMonitor) -> Self {
        self.monitor = monitor;
        self
    }

    pub fn tagger(&self) -> Option<&Arc<dyn KeywordTagger>> {
        self.tagger.as_ref()
    }

    pub fn monitor(&self) -> &SystemMonitor {
        &self.monitor
    }

    pub fn supported_extensions(&self) -> Vec<&'static str> {
        self.extractors.supported_extensions()
    }

    /// Checks size, name and type without touching storage.
    pub fn validate(&self, file: &UploadedFile) -> Result<(DocumentKind, String)> {
        if file.bytes.len() > self.max_upload_bytes {
            return Err(DocError::PayloadTooLarge {
                file_name: file.file_name.clone(),
                size: file.bytes.len(),
                limit: self.max_upload_bytes,
            });
        }

        let text_path = output_file_name(&file.file_name)?;
        let kind = DocumentKind::from_file_name(&file.file_name)
            .filter(|kind| self.extractors.supports(*kind))
            .ok_or_else(|| DocError::UnsupportedFileType {
                file_name: file.file_name.clone(),
                extension: file_extension(&file.file_name).unwrap_or("").to_string(),
            })?;
        Ok((kind, text_path))
    }

    #[instrument(skip(self, file), fields(file_name = %file.file_name, size = file.bytes.len()))]
    pub async fn ingest(&self, file: UploadedFile) -> Result<DocumentView> {
        let prepared = self.prepare(file).await?;
        let _guard = self.write_lock.lock().await;
        self.commit(prepared).await
    }

    /// Extracts and tags every file before storing any, so a failing file
    /// leaves no trace of the batch on disk or in the catalog.
    pub async fn ingest_all(&self, files: Vec<UploadedFile>) -> Result<Vec<DocumentView>> {
        if files.is_empty() {
            return Err(DocError::MissingFileField);
        }
        if files.len() > self.max_files_per_request {
            return Err(DocError::InvalidRequest {
                message: format!(
                    "Too many files in one request: {} (limit {})",
                    files.len(),
                    self.max_files_per_request
                ),
            });
        }
        for file in &files {
            self.validate(file)?;
        }

        let mut prepared = Vec::with_capacity(files.len());
        for file in files {
            prepared.push(self.prepare(file).await?);
        }

        let _guard = self.write_lock.lock().await;
        let mut views = Vec::with_capacity(prepared.len());
        for document in prepared {
            views.push(self.commit(document).await?);
        }
        Ok(views)
    }

    async fn prepare(&self, file: UploadedFile) -> Result<PreparedDocument> {
        let (kind, text_path) = self.validate(&file)?;
        info!("📥 Ingesting {:?} document {}", kind, file.file_name);

        let UploadedFile {
            file_name,
            content_type,
            bytes,
        } = file;
        let length = bytes.len() as u64;

        let text = self.extract_text(kind, &file_name, bytes).await?;
        debug!("Extracted {} characters", text.chars().count());

        let tags = self.tag(&text).await;

        Ok(PreparedDocument {
            document: NewDocument {
                file_name,
                length,
                kind,
                content_type,
                text_path,
                char_count: text.chars().count(),
                tags,
            },
            text,
        })
    }

    /// Caller holds `write_lock`.
    async fn commit(&self, prepared: PreparedDocument) -> Result<DocumentView> {
        let PreparedDocument { document, text } = prepared;
        self.storage.write_file(&document.text_path, text.as_bytes()).await?;
        let record = self.catalog.upsert(document).await?;

        info!("✅ Stored document {} as {}", record.id, record.text_path);
        self.monitor.log_stats(&format!("ingest {}", record.file_name));

        Ok(DocumentView {
            record,
            extracted_text: text,
        })
    }

    async fn extract_text(&self, kind: DocumentKind, file_name: &str, bytes: Vec<u8>) -> Result<String> {
        let extractor = self
            .extractors
            .find(kind)
            .ok_or_else(|| DocError::UnsupportedFileType {
                file_name: file_name.to_string(),
                extension: file_extension(file_name).unwrap_or("").to_string(),
            })?;

        let name = file_name.to_string();
        tokio::task::spawn_blocking(move || extractor.extract(&name, &bytes))
            .await
            .map_err(|e| DocError::ExtractionError {
                file_name: file_name.to_string(),
                message: format!("extraction task failed: {}", e),
            })?
    }

    /// Tagging is best effort: failures are logged and yield no tags.
    async fn tag(&self, text: &str) -> Vec<String> {
        let Some(tagger) = self.tagger.clone() else {
            return Vec::new();
        };

        let owned = text.to_string();
        match tokio::task::spawn_blocking(move || tagger.extract_keywords(&owned)).await {
            Ok(Ok(keywords)) => keywords.into_iter().map(|k| k.text).collect(),
            Ok(Err(e)) => {
                warn!("⚠️ Keyword extraction failed: {}", e);
                Vec::new()
            }
            Err(e) => {
                warn!("⚠️ Keyword task failed: {}", e);
                Vec::new()
            }
        }
    }

    pub async fn list(&self) -> Result<Vec<DocumentRecord>> {
        self.catalog.list().await
    }

    pub async fn count(&self) -> usize {
        self.catalog.count().await
    }

    pub async fn get(&self, id: u64) -> Result<DocumentView> {
        let record = self.catalog.get(id).await?.ok_or(DocError::NotFound { id })?;
        let bytes = self.storage.read_file(&record.text_path).await?;
        Ok(DocumentView {
            record,
            extracted_text: String::from_utf8_lossy(&bytes).into_owned(),
        })
    }
}

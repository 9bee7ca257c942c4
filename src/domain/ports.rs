use crate::domain::model::{DocumentKind, DocumentRecord, Keyword, NewDocument};
use crate::utils::error::Result;
use async_trait::async_trait;

pub trait Storage: Send + Sync {
    fn read_file(&self, path: &str) -> impl std::future::Future<Output = Result<Vec<u8>>> + Send;
    fn write_file(
        &self,
        path: &str,
        data: &[u8],
    ) -> impl std::future::Future<Output = Result<()>> + Send;
}

pub trait ConfigProvider: Send + Sync {
    fn bind_address(&self) -> &str;
    fn output_path(&self) -> &str;
    fn max_upload_bytes(&self) -> usize;
    fn max_files_per_request(&self) -> usize;
    fn accepted_kinds(&self) -> Vec<DocumentKind>;
    fn static_dir(&self) -> Option<&str>;
    fn keywords_enabled(&self) -> bool;
}

/// Converts raw document bytes into plain text. Implementations are CPU bound
/// and are called from the blocking pool.
pub trait TextExtractor: Send + Sync {
    fn kind(&self) -> DocumentKind;
    fn extract(&self, file_name: &str, bytes: &[u8]) -> Result<String>;
}

/// Sentence embedding model. Returned vectors share one dimension.
pub trait Embedder: Send + Sync {
    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>>;
}

pub trait KeywordTagger: Send + Sync {
    fn extract_keywords(&self, text: &str) -> Result<Vec<Keyword>>;

    fn extract_keywords_top(&self, text: &str, top_n: usize) -> Result<Vec<Keyword>> {
        let mut keywords = self.extract_keywords(text)?;
        keywords.truncate(top_n);
        Ok(keywords)
    }
}

#[async_trait]
pub trait DocumentRepository: Send + Sync {
    /// Stores the document, replacing any record that points at the same text file.
    async fn upsert(&self, document: NewDocument) -> Result<DocumentRecord>;
    async fn list(&self) -> Result<Vec<DocumentRecord>>;
    async fn get(&self, id: u64) -> Result<Option<DocumentRecord>>;
    async fn count(&self) -> usize;
}

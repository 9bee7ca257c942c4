pub mod catalog;
pub mod ingest;
pub mod keywords;
pub mod stop_words;

pub use crate::domain::model::{DocumentKind, DocumentRecord, DocumentView, Keyword, UploadedFile};
pub use crate::domain::ports::{ConfigProvider, DocumentRepository, Embedder, KeywordTagger, Storage};
pub use crate::utils::error::Result;

// Adapters layer: concrete implementations for external systems (filesystem, document formats, models).

#[cfg(feature = "local-model")]
pub mod embedder;
pub mod extractors;
pub mod storage;

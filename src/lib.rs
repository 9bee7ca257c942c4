pub mod adapters;
pub mod api;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::cli::CliConfig;
pub use config::Settings;

#[cfg(feature = "local-model")]
pub use adapters::embedder::MiniLmEmbedder;
pub use adapters::storage::LocalStorage;
pub use core::{ingest::IngestService, keywords::KeywordExtractor};
pub use utils::error::{DocError, Result};

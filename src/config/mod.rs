#[cfg(feature = "cli")]
pub mod cli;
pub mod toml_config;

use crate::core::keywords::KeywordConfig;
use crate::domain::model::DocumentKind;
use crate::domain::ports::ConfigProvider;
use crate::utils::error::{DocError, Result};
use crate::utils::validation::{
    validate_non_empty_string, validate_path, validate_positive_number, validate_socket_addr, Validate,
};

pub const DEFAULT_BIND: &str = "127.0.0.1:8080";
pub const DEFAULT_OUTPUT_PATH: &str = "./output";
pub const DEFAULT_MODEL_ID: &str = "sentence-transformers/all-MiniLM-L6-v2";

/// Converts a megabyte setting to bytes, rejecting values that overflow `usize`.
pub fn megabytes_to_bytes(field: &str, mb: usize) -> Result<usize> {
    mb.checked_mul(1024 * 1024)
        .ok_or_else(|| DocError::InvalidConfigValueError {
            field: field.to_string(),
            value: mb.to_string(),
            reason: "Value is too large to express in bytes".to_string(),
        })
}

#[derive(Debug, Clone)]
pub struct KeywordSettings {
    pub enabled: bool,
    pub model_id: String,
    pub config: KeywordConfig,
}

impl Default for KeywordSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            model_id: DEFAULT_MODEL_ID.to_string(),
            config: KeywordConfig::default(),
        }
    }
}

/// Fully resolved runtime settings (TOML file plus command-line overrides).
#[derive(Debug, Clone)]
pub struct Settings {
    pub bind: String,
    pub output_path: String,
    pub max_upload_bytes: usize,
    pub max_files_per_request: usize,
    pub accepted_kinds: Vec<DocumentKind>,
    pub static_dir: Option<String>,
    pub keywords: KeywordSettings,
    pub monitor: bool,
    pub json_logs: bool,
    pub verbose: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            bind: DEFAULT_BIND.to_string(),
            output_path: DEFAULT_OUTPUT_PATH.to_string(),
            max_upload_bytes: crate::core::ingest::DEFAULT_MAX_UPLOAD_BYTES,
            max_files_per_request: crate::core::ingest::DEFAULT_MAX_FILES_PER_REQUEST,
            accepted_kinds: DocumentKind::ALL.to_vec(),
            static_dir: None,
            keywords: KeywordSettings::default(),
            monitor: false,
            json_logs: false,
            verbose: false,
        }
    }
}

impl ConfigProvider for Settings {
    fn bind_address(&self) -> &str {
        &self.bind
    }

    fn output_path(&self) -> &str {
        &self.output_path
    }

    fn max_upload_bytes(&self) -> usize {
        self.max_upload_bytes
    }

    fn max_files_per_request(&self) -> usize {
        self.max_files_per_request
    }

    fn accepted_kinds(&self) -> Vec<DocumentKind> {
        self.accepted_kinds.clone()
    }

    fn static_dir(&self) -> Option<&str> {
        self.static_dir.as_deref()
    }

    fn keywords_enabled(&self) -> bool {
        self.keywords.enabled
    }
}

impl Validate for Settings {
    fn validate(&self) -> Result<()> {
        validate_socket_addr("server.bind", &self.bind)?;
        validate_path("storage.output_path", &self.output_path)?;
        validate_positive_number("server.max_upload_bytes", self.max_upload_bytes, 1)?;
        validate_positive_number("server.max_files_per_request", self.max_files_per_request, 1)?;
        if let Some(dir) = &self.static_dir {
            validate_path("server.static_dir", dir)?;
        }
        if self.keywords.enabled {
            validate_non_empty_string("keywords.model_id", &self.keywords.model_id)?;
        }
        self.keywords.config.validate()
    }
}

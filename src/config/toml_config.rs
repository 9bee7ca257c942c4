use crate::config::{
    megabytes_to_bytes, KeywordSettings, Settings, DEFAULT_BIND, DEFAULT_MODEL_ID, DEFAULT_OUTPUT_PATH,
};
use crate::core::ingest::{DEFAULT_MAX_FILES_PER_REQUEST, DEFAULT_MAX_UPLOAD_BYTES};
use crate::core::keywords::{KeywordConfig, Selection};
use crate::domain::model::DocumentKind;
use crate::utils::error::{DocError, Result};
use crate::utils::validation::{validate_file_extensions, Validate};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TomlConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    pub keywords: Option<KeywordsConfig>,
    pub monitoring: Option<MonitoringConfig>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServerConfig {
    pub bind: Option<String>,
    pub max_upload_mb: Option<usize>,
    /// Files accepted in one multipart request.
    pub max_files_per_request: Option<usize>,
    pub static_dir: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorageConfig {
    pub output_path: Option<String>,
    /// Extensions without the dot, e.g. `["pdf", "docx"]`.
    pub accepted_extensions: Option<Vec<String>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeywordsConfig {
    pub enabled: bool,
    pub model_id: Option<String>,
    pub top_n: Option<usize>,
    pub ngram_min: Option<usize>,
    pub ngram_max: Option<usize>,
    pub use_stop_words: Option<bool>,
    pub extra_stop_words: Option<Vec<String>>,
    /// `similarity`, `mmr` or `max_sum`
    pub strategy: Option<String>,
    pub diversity: Option<f32>,
    pub nr_candidates: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitoringConfig {
    pub enabled: bool,
    pub json_logs: Option<bool>,
    pub verbose: Option<bool>,
}

const ACCEPTED_EXTENSIONS: &[&str] = &["pdf", "docx", "txt", "text"];

impl TomlConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(DocError::IoError)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed = Self::substitute_env_vars(content)?;
        Ok(toml::from_str(&processed)?)
    }

    /// 替換環境變數 (例如 ${OUTPUT_DIR})，未設定的變數保持原樣
    fn substitute_env_vars(content: &str) -> Result<String> {
        let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| DocError::ConfigError {
            message: e.to_string(),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.into_owned())
    }

    fn accepted_kinds(&self) -> Vec<DocumentKind> {
        match &self.storage.accepted_extensions {
            Some(extensions) => {
                let mut kinds: Vec<DocumentKind> = extensions
                    .iter()
                    .filter_map(|ext| DocumentKind::from_extension(ext.trim_start_matches('.')))
                    .collect();
                kinds.dedup();
                kinds
            }
            None => DocumentKind::ALL.to_vec(),
        }
    }

    fn keyword_settings(&self) -> Result<KeywordSettings> {
        let Some(section) = &self.keywords else {
            return Ok(KeywordSettings::default());
        };

        let defaults = KeywordConfig::default();
        let selection = match section.strategy.as_deref().unwrap_or("similarity") {
            "similarity" => Selection::Similarity,
            "mmr" => Selection::Mmr {
                diversity: section.diversity.unwrap_or(0.5),
            },
            "max_sum" => Selection::MaxSum {
                nr_candidates: section.nr_candidates.unwrap_or(20),
            },
            other => {
                return Err(DocError::InvalidConfigValueError {
                    field: "keywords.strategy".to_string(),
                    value: other.to_string(),
                    reason: "Expected one of: similarity, mmr, max_sum".to_string(),
                })
            }
        };

        let ngram_min = section.ngram_min.unwrap_or(defaults.ngram_range.0);
        Ok(KeywordSettings {
            enabled: section.enabled,
            model_id: section
                .model_id
                .clone()
                .unwrap_or_else(|| DEFAULT_MODEL_ID.to_string()),
            config: KeywordConfig {
                top_n: section.top_n.unwrap_or(defaults.top_n),
                ngram_range: (ngram_min, section.ngram_max.unwrap_or(ngram_min.max(defaults.ngram_range.1))),
                use_stop_words: section.use_stop_words.unwrap_or(defaults.use_stop_words),
                extra_stop_words: section.extra_stop_words.clone().unwrap_or_default(),
                selection,
            },
        })
    }

    /// Resolves the file into runtime settings; missing values take defaults.
    pub fn into_settings(self) -> Result<Settings> {
        self.validate()?;

        let monitoring = self.monitoring.clone();
        Ok(Settings {
            bind: self.server.bind.clone().unwrap_or_else(|| DEFAULT_BIND.to_string()),
            output_path: self
                .storage
                .output_path
                .clone()
                .unwrap_or_else(|| DEFAULT_OUTPUT_PATH.to_string()),
            max_upload_bytes: match self.server.max_upload_mb {
                Some(mb) => megabytes_to_bytes("server.max_upload_mb", mb)?,
                None => DEFAULT_MAX_UPLOAD_BYTES,
            },
            max_files_per_request: self
                .server
                .max_files_per_request
                .unwrap_or(DEFAULT_MAX_FILES_PER_REQUEST),
            accepted_kinds: self.accepted_kinds(),
            static_dir: self.server.static_dir.clone(),
            keywords: self.keyword_settings()?,
            monitor: monitoring.as_ref().map(|m| m.enabled).unwrap_or(false),
            json_logs: monitoring.as_ref().and_then(|m| m.json_logs).unwrap_or(false),
            verbose: monitoring.as_ref().and_then(|m| m.verbose).unwrap_or(false),
        })
    }
}

impl Validate for TomlConfig {
    fn validate(&self) -> Result<()> {
        if let Some(extensions) = &self.storage.accepted_extensions {
            validate_file_extensions("storage.accepted_extensions", extensions, ACCEPTED_EXTENSIONS)?;
            if extensions.is_empty() {
                return Err(DocError::InvalidConfigValueError {
                    field: "storage.accepted_extensions".to_string(),
                    value: "[]".to_string(),
                    reason: "At least one extension must be accepted".to_string(),
                });
            }
        }
        self.keyword_settings()?.config.validate()
    }
}

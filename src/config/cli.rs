use crate::config::toml_config::TomlConfig;
use crate::config::{megabytes_to_bytes, Settings};
use crate::utils::error::Result;
use crate::utils::validation::Validate;
use clap::Parser;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize, Parser)]
#[command(name = "doc-tagger")]
#[command(about = "Upload documents, extract their text and tag them with keywords")]
pub struct CliConfig {
    /// Path to a TOML configuration file
    #[arg(short, long)]
    pub config: Option<String>,

    /// Address to listen on, e.g. 127.0.0.1:8080
    #[arg(long)]
    pub bind: Option<String>,

    /// Directory receiving extracted text files and index.json
    #[arg(long)]
    pub output_path: Option<String>,

    /// Largest accepted upload in megabytes
    #[arg(long)]
    pub max_upload_mb: Option<usize>,

    /// Most files accepted in one upload request
    #[arg(long)]
    pub max_files: Option<usize>,

    /// Serve static files from this directory at /
    #[arg(long)]
    pub static_dir: Option<String>,

    /// Load the keyword model and tag uploaded documents
    #[arg(long)]
    pub keywords: bool,

    /// Number of keywords per document
    #[arg(long)]
    pub top_n: Option<usize>,

    #[arg(short, long, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, help = "Emit logs as JSON lines")]
    pub json_logs: bool,

    #[arg(long, help = "Log CPU and memory usage after each upload")]
    pub monitor: bool,
}

impl CliConfig {
    /// Loads the TOML file (if any) and applies command-line overrides on top.
    pub fn resolve(&self) -> Result<Settings> {
        let base = match &self.config {
            Some(path) => TomlConfig::from_file(path)?,
            None => TomlConfig::default(),
        };
        let mut settings = base.into_settings()?;

        // 命令列參數優先於設定檔
        if let Some(bind) = &self.bind {
            settings.bind = bind.clone();
        }
        if let Some(output_path) = &self.output_path {
            settings.output_path = output_path.clone();
        }
        if let Some(mb) = self.max_upload_mb {
            settings.max_upload_bytes = megabytes_to_bytes("max_upload_mb", mb)?;
        }
        if let Some(max_files) = self.max_files {
            settings.max_files_per_request = max_files;
        }
        if let Some(dir) = &self.static_dir {
            settings.static_dir = Some(dir.clone());
        }
        if self.keywords {
            settings.keywords.enabled = true;
        }
        if let Some(top_n) = self.top_n {
            settings.keywords.config.top_n = top_n;
        }
        settings.verbose |= self.verbose;
        settings.json_logs |= self.json_logs;
        settings.monitor |= self.monitor;

        settings.validate()?;
        Ok(settings)
    }
}

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DocError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Zip operation failed: {0}")]
    ZipError(#[from] zip::result::ZipError),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Configuration validation failed for '{field}': {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Invalid value '{value}' for '{field}': {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing required configuration: {field}")]
    MissingConfigError { field: String },

    #[error("Invalid request: {message}")]
    InvalidRequest { message: String },

    #[error("No file field found in upload")]
    MissingFileField,

    #[error("Unsupported file type '{extension}' for '{file_name}'")]
    UnsupportedFileType { file_name: String, extension: String },

    #[error("File '{file_name}' is {size} bytes, limit is {limit} bytes")]
    PayloadTooLarge {
        file_name: String,
        size: usize,
        limit: usize,
    },

    #[error("Failed to extract text from '{file_name}': {message}")]
    ExtractionError { file_name: String, message: String },

    #[error("Embedding error: {message}")]
    EmbeddingError { message: String },

    #[error("Keyword model is not loaded")]
    ModelUnavailable,

    #[error("Document {id} not found")]
    NotFound { id: u64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Configuration,
    Request,
    Extraction,
    Model,
    Storage,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl DocError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            DocError::ConfigError { .. }
            | DocError::ConfigValidationError { .. }
            | DocError::InvalidConfigValueError { .. }
            | DocError::MissingConfigError { .. } => ErrorCategory::Configuration,
            DocError::InvalidRequest { .. }
            | DocError::MissingFileField
            | DocError::UnsupportedFileType { .. }
            | DocError::PayloadTooLarge { .. }
            | DocError::NotFound { .. } => ErrorCategory::Request,
            DocError::ExtractionError { .. } | DocError::ZipError(_) => ErrorCategory::Extraction,
            DocError::EmbeddingError { .. } | DocError::ModelUnavailable => ErrorCategory::Model,
            DocError::IoError(_) | DocError::SerializationError(_) => ErrorCategory::Storage,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self.category() {
            ErrorCategory::Request => ErrorSeverity::Low,
            ErrorCategory::Extraction | ErrorCategory::Model => ErrorSeverity::Medium,
            ErrorCategory::Configuration => ErrorSeverity::High,
            ErrorCategory::Storage => ErrorSeverity::Critical,
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self {
            DocError::IoError(_) => "Check that the output directory exists and is writable",
            DocError::SerializationError(_) => {
                "The catalog file may be corrupted; move index.json aside and restart"
            }
            DocError::ZipError(_) => "Make sure the upload is a valid .docx document",
            DocError::ConfigError { .. }
            | DocError::ConfigValidationError { .. }
            | DocError::InvalidConfigValueError { .. } => {
                "Review the configuration file and command-line flags"
            }
            DocError::MissingConfigError { .. } => "Add the missing setting to the configuration",
            DocError::InvalidRequest { .. } => "Send a multipart/form-data request with a file part",
            DocError::MissingFileField => "Attach at least one file to the form",
            DocError::UnsupportedFileType { .. } => "Upload a .pdf, .docx, .txt or .text file",
            DocError::PayloadTooLarge { .. } => "Split the document or raise --max-upload-mb",
            DocError::ExtractionError { .. } => {
                "The document may be encrypted, scanned or damaged; try re-exporting it"
            }
            DocError::EmbeddingError { .. } => "Check the model cache and available memory",
            DocError::ModelUnavailable => "Start the server with --keywords to load the model",
            DocError::NotFound { .. } => "List documents with GET /api/files to find valid ids",
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            DocError::IoError(e) => format!("Could not access a file: {}", e),
            DocError::SerializationError(_) => "The document catalog could not be read".to_string(),
            DocError::ConfigValidationError { field, message } => {
                format!("Setting '{}' is invalid: {}", field, message)
            }
            DocError::InvalidConfigValueError { field, reason, .. } => {
                format!("Setting '{}' is invalid: {}", field, reason)
            }
            DocError::ExtractionError { file_name, .. } => {
                format!("No text could be read from '{}'", file_name)
            }
            other => other.to_string(),
        }
    }
}

impl From<toml::de::Error> for DocError {
    fn from(e: toml::de::Error) -> Self {
        DocError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        }
    }
}

pub type Result<T> = std::result::Result<T, DocError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_follows_category() {
        assert_eq!(DocError::MissingFileField.severity(), ErrorSeverity::Low);
        assert_eq!(DocError::ModelUnavailable.severity(), ErrorSeverity::Medium);
        let config = DocError::MissingConfigError {
            field: "server.bind".to_string(),
        };
        assert_eq!(config.category(), ErrorCategory::Configuration);
        assert_eq!(config.severity(), ErrorSeverity::High);
        let io = DocError::from(std::io::Error::other("disk full"));
        assert_eq!(io.severity(), ErrorSeverity::Critical);
    }

    #[test]
    fn test_user_friendly_message_hides_parser_detail() {
        let err = DocError::ExtractionError {
            file_name: "scan.pdf".to_string(),
            message: "invalid xref table".to_string(),
        };
        assert_eq!(err.user_friendly_message(), "No text could be read from 'scan.pdf'");
        assert!(err.to_string().contains("invalid xref table"));
    }
}

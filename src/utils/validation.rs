use crate::utils::error::{DocError, Result};
use std::collections::HashSet;
use std::net::SocketAddr;

pub trait Validate {
    fn validate(&self) -> Result<()>;
}

pub fn validate_socket_addr(field_name: &str, addr: &str) -> Result<()> {
    if addr.trim().is_empty() {
        return Err(DocError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: addr.to_string(),
            reason: "Address cannot be empty".to_string(),
        });
    }

    addr.parse::<SocketAddr>()
        .map(|_| ())
        .map_err(|e| DocError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: addr.to_string(),
            reason: format!("Expected host:port, {}", e),
        })
}

pub fn validate_path(field_name: &str, path: &str) -> Result<()> {
    if path.is_empty() {
        return Err(DocError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: path.to_string(),
            reason: "Path cannot be empty".to_string(),
        });
    }

    if path.contains('\0') {
        return Err(DocError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: path.to_string(),
            reason: "Path contains null bytes".to_string(),
        });
    }

    Ok(())
}

pub fn validate_positive_number(field_name: &str, value: usize, min_value: usize) -> Result<()> {
    if value < min_value {
        return Err(DocError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: format!("Value must be at least {}", min_value),
        });
    }
    Ok(())
}

/// Checks that every entry is a bare extension (no dot) from the allowed set.
pub fn validate_file_extensions(
    field_name: &str,
    extensions: &[String],
    allowed_extensions: &[&str],
) -> Result<()> {
    let allowed_set: HashSet<&str> = allowed_extensions.iter().copied().collect();

    for extension in extensions {
        let normalized = extension.trim_start_matches('.').to_ascii_lowercase();
        if !allowed_set.contains(normalized.as_str()) {
            return Err(DocError::InvalidConfigValueError {
                field: field_name.to_string(),
                value: extension.clone(),
                reason: format!(
                    "Unsupported file extension. Allowed extensions: {}",
                    allowed_extensions.join(", ")
                ),
            });
        }
    }

    Ok(())
}

pub fn validate_non_empty_string(field_name: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(DocError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: "Value cannot be empty or whitespace-only".to_string(),
        });
    }
    Ok(())
}

pub fn validate_range<T: PartialOrd + std::fmt::Display + Copy>(
    field_name: &str,
    value: T,
    min: T,
    max: T,
) -> Result<()> {
    if value < min || value > max {
        return Err(DocError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: format!("Value must be between {} and {}", min, max),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_socket_addr() {
        assert!(validate_socket_addr("server.bind", "127.0.0.1:8080").is_ok());
        assert!(validate_socket_addr("server.bind", "0.0.0.0:0").is_ok());
        assert!(validate_socket_addr("server.bind", "").is_err());
        assert!(validate_socket_addr("server.bind", "localhost").is_err());
    }

    #[test]
    fn test_validate_positive_number() {
        assert!(validate_positive_number("keywords.top_n", 5, 1).is_ok());
        assert!(validate_positive_number("keywords.top_n", 0, 1).is_err());
    }

    #[test]
    fn test_validate_file_extensions() {
        let extensions = vec!["pdf".to_string(), ".DOCX".to_string()];
        assert!(validate_file_extensions("ext", &extensions, &["pdf", "docx", "txt"]).is_ok());

        let invalid = vec!["exe".to_string()];
        assert!(validate_file_extensions("ext", &invalid, &["pdf", "docx"]).is_err());
    }

    #[test]
    fn test_validate_range() {
        assert!(validate_range("keywords.diversity", 0.5, 0.0, 1.0).is_ok());
        assert!(validate_range("keywords.diversity", 1.5, 0.0, 1.0).is_err());
    }
}

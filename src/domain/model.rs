use crate::utils::error::{DocError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Extension written for every extracted text file.
pub const TEXT_EXTENSION: &str = "txt";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentKind {
    PlainText,
    Pdf,
    Docx,
}

impl DocumentKind {
    pub const ALL: [DocumentKind; 3] = [DocumentKind::PlainText, DocumentKind::Pdf, DocumentKind::Docx];

    pub fn from_extension(extension: &str) -> Option<Self> {
        match extension.to_ascii_lowercase().as_str() {
            "txt" | "text" => Some(DocumentKind::PlainText),
            "pdf" => Some(DocumentKind::Pdf),
            "docx" => Some(DocumentKind::Docx),
            _ => None,
        }
    }

    pub fn from_file_name(file_name: &str) -> Option<Self> {
        file_extension(file_name).and_then(Self::from_extension)
    }

    pub fn extensions(self) -> &'static [&'static str] {
        match self {
            DocumentKind::PlainText => &["txt", "text"],
            DocumentKind::Pdf => &["pdf"],
            DocumentKind::Docx => &["docx"],
        }
    }
}

/// Last path component of a client-supplied name. Both `/` and `\` separate,
/// since browsers on Windows may send full paths.
pub fn base_name(file_name: &str) -> &str {
    file_name.rsplit(['/', '\\']).next().unwrap_or(file_name)
}

pub fn file_extension(file_name: &str) -> Option<&str> {
    let base = base_name(file_name);
    match base.rfind('.') {
        Some(idx) if idx > 0 && idx + 1 < base.len() => Some(&base[idx + 1..]),
        _ => None,
    }
}

/// `uploads/Report.PDF` -> `Report.txt`
pub fn output_file_name(file_name: &str) -> Result<String> {
    let base = base_name(file_name.trim());
    if base.is_empty() || base == "." || base == ".." || base.contains('\0') {
        return Err(DocError::InvalidRequest {
            message: format!("Invalid file name '{}'", file_name.escape_default()),
        });
    }

    let stem = match base.rfind('.') {
        Some(idx) if idx > 0 => &base[..idx],
        _ => base,
    };
    Ok(format!("{}.{}", stem, TEXT_EXTENSION))
}

#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub file_name: String,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

impl UploadedFile {
    pub fn new(file_name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            file_name: file_name.into(),
            content_type: None,
            bytes: bytes.into(),
        }
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentRecord {
    pub id: u64,
    pub file_name: String,
    pub length: u64,
    pub kind: DocumentKind,
    pub content_type: Option<String>,
    /// Relative to the storage root.
    pub text_path: String,
    pub char_count: usize,
    #[serde(default)]
    pub tags: Vec<String>,
    pub created_at: DateTime<Utc>,
}

/// A record before the catalog assigns its id.
#[derive(Debug, Clone)]
pub struct NewDocument {
    pub file_name: String,
    pub length: u64,
    pub kind: DocumentKind,
    pub content_type: Option<String>,
    pub text_path: String,
    pub char_count: usize,
    pub tags: Vec<String>,
}

impl NewDocument {
    pub fn into_record(self, id: u64) -> DocumentRecord {
        DocumentRecord {
            id,
            file_name: self.file_name,
            length: self.length,
            kind: self.kind,
            content_type: self.content_type,
            text_path: self.text_path,
            char_count: self.char_count,
            tags: self.tags,
            created_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct DocumentView {
    #[serde(flatten)]
    pub record: DocumentRecord,
    pub extracted_text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Keyword {
    pub text: String,
    pub score: f32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_from_file_name() {
        assert_eq!(DocumentKind::from_file_name("a.pdf"), Some(DocumentKind::Pdf));
        assert_eq!(DocumentKind::from_file_name("A.PDF"), Some(DocumentKind::Pdf));
        assert_eq!(DocumentKind::from_file_name("notes.text"), Some(DocumentKind::PlainText));
        assert_eq!(DocumentKind::from_file_name("notes.txt"), Some(DocumentKind::PlainText));
        assert_eq!(DocumentKind::from_file_name("dir.pdf/letter.docx"), Some(DocumentKind::Docx));
        assert_eq!(DocumentKind::from_file_name("image.png"), None);
        assert_eq!(DocumentKind::from_file_name(".pdf"), None);
        assert_eq!(DocumentKind::from_file_name("pdf"), None);
    }

    #[test]
    fn test_output_file_name_substitutes_extension() {
        assert_eq!(output_file_name("report.pdf").unwrap(), "report.txt");
        assert_eq!(output_file_name("archive.tar.pdf").unwrap(), "archive.tar.txt");
        assert_eq!(output_file_name("notes").unwrap(), "notes.txt");
        assert_eq!(output_file_name(".hidden").unwrap(), ".hidden.txt");
    }

    #[test]
    fn test_output_file_name_strips_directories() {
        assert_eq!(output_file_name("../../etc/passwd.pdf").unwrap(), "passwd.txt");
        assert_eq!(output_file_name("C:\\Users\\me\\cv.docx").unwrap(), "cv.txt");
    }

    #[test]
    fn test_output_file_name_rejects_bad_names() {
        assert!(output_file_name("").is_err());
        assert!(output_file_name("uploads/").is_err());
        assert!(output_file_name("..").is_err());
        assert!(output_file_name("a\0b.pdf").is_err());
    }
}

use crate::domain::model::DocumentKind;
use crate::domain::ports::TextExtractor;
use crate::utils::error::{DocError, Result};
use docx_rust::document::{
    BodyContent, Paragraph, ParagraphContent, RunContent, Table, TableCellContent, TableRowContent,
};
use docx_rust::DocxFile;
use std::collections::BTreeMap;
use std::io::{self, Cursor, Read};
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

const UTF8_BOM: &[u8] = &[0xEF, 0xBB, 0xBF];

/// `.txt` / `.text`: decoded as UTF-8, invalid sequences replaced.
#[derive(Debug, Default, Clone, Copy)]
pub struct PlainTextExtractor;

impl TextExtractor for PlainTextExtractor {
    fn kind(&self) -> DocumentKind {
        DocumentKind::PlainText
    }

    fn extract(&self, _file_name: &str, bytes: &[u8]) -> Result<String> {
        let bytes = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);
        Ok(String::from_utf8_lossy(bytes).into_owned())
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct PdfExtractor;

impl PdfExtractor {
    /// The header may be preceded by junk, but must appear in the first 1024 bytes.
    fn has_pdf_header(bytes: &[u8]) -> bool {
        let window = &bytes[..bytes.len().min(1024)];
        window.windows(5).any(|w| w == b"%PDF-")
    }
}

impl TextExtractor for PdfExtractor {
    fn kind(&self) -> DocumentKind {
        DocumentKind::Pdf
    }

    fn extract(&self, file_name: &str, bytes: &[u8]) -> Result<String> {
        if !Self::has_pdf_header(bytes) {
            return Err(DocError::ExtractionError {
                file_name: file_name.to_string(),
                message: "missing %PDF header".to_string(),
            });
        }

        // pdf-extract 在遇到損壞的檔案時可能 panic
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| pdf_extract::extract_text_from_mem(bytes)));

        match outcome {
            Ok(Ok(text)) => Ok(normalize_pdf_text(&text)),
            Ok(Err(e)) => Err(DocError::ExtractionError {
                file_name: file_name.to_string(),
                message: e.to_string(),
            }),
            Err(_) => Err(DocError::ExtractionError {
                file_name: file_name.to_string(),
                message: "PDF parser aborted on malformed input".to_string(),
            }),
        }
    }
}

/// Trims line ends and collapses runs of blank lines to one.
fn normalize_pdf_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut blank_run = 0;
    for line in text.lines() {
        let line = line.trim_end();
        if line.is_empty() {
            blank_run += 1;
            if blank_run > 1 || out.is_empty() {
                continue;
            }
        } else {
            blank_run = 0;
        }
        out.push_str(line);
        out.push('\n');
    }
    let trimmed_len = out.trim_end().len();
    out.truncate(trimmed_len);
    out
}

/// Upper bound on the bytes a `.docx` container may inflate to.
pub const DEFAULT_MAX_EXPANDED_BYTES: u64 = 128 * 1024 * 1024;

/// Word documents via `docx-rust`: one line per paragraph, table cells split by tabs.
#[derive(Debug, Clone, Copy)]
pub struct DocxExtractor {
    max_expanded_bytes: u64,
}

impl Default for DocxExtractor {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_EXPANDED_BYTES)
    }
}

fn extraction_error(file_name: &str, message: impl std::fmt::Display) -> DocError {
    DocError::ExtractionError {
        file_name: file_name.to_string(),
        message: message.to_string(),
    }
}

impl DocxExtractor {
    pub fn new(max_expanded_bytes: u64) -> Self {
        Self { max_expanded_bytes }
    }

    /// Inflates every entry into a sink, counting bytes, before the parser loads anything.
    fn check_expanded_size(&self, file_name: &str, bytes: &[u8]) -> Result<()> {
        let limit = self.max_expanded_bytes;
        let mut archive =
            zip::ZipArchive::new(Cursor::new(bytes)).map_err(|e| extraction_error(file_name, e))?;

        let mut total: u64 = 0;
        for index in 0..archive.len() {
            let entry = archive.by_index(index).map_err(|e| extraction_error(file_name, e))?;
            let budget = limit.saturating_sub(total);
            if entry.size() > budget {
                return Err(extraction_error(
                    file_name,
                    format!("'{}' declares {} bytes, over the {} byte limit", entry.name(), entry.size(), limit),
                ));
            }

            // 宣告大小可能造假，以實際解壓量為準
            let mut limited = entry.take(budget.saturating_add(1));
            let inflated =
                io::copy(&mut limited, &mut io::sink()).map_err(|e| extraction_error(file_name, e))?;
            total = total.saturating_add(inflated);
            if total > limit {
                return Err(extraction_error(
                    file_name,
                    format!("archive expands beyond the {} byte limit", limit),
                ));
            }
        }
        Ok(())
    }
}

impl TextExtractor for DocxExtractor {
    fn kind(&self) -> DocumentKind {
        DocumentKind::Docx
    }

    fn extract(&self, file_name: &str, bytes: &[u8]) -> Result<String> {
        self.check_expanded_size(file_name, bytes)?;

        let docx_file = DocxFile::from_reader(Cursor::new(bytes))
            .map_err(|e| extraction_error(file_name, format!("Failed to open DOCX: {}", e)))?;
        let docx = docx_file
            .parse()
            .map_err(|e| extraction_error(file_name, format!("Failed to parse DOCX: {}", e)))?;

        Ok(text_from_docx(&docx))
    }
}

fn text_from_docx(docx: &docx_rust::Docx) -> String {
    let mut lines = Vec::new();
    for content in &docx.document.body.content {
        match content {
            BodyContent::Paragraph(paragraph) => lines.push(paragraph_text(paragraph)),
            BodyContent::Table(table) => lines.extend(table_lines(table)),
            _ => {}
        }
    }

    let mut text = lines.join("\n");
    let trimmed_len = text.trim_end().len();
    text.truncate(trimmed_len);
    text
}

fn paragraph_text(paragraph: &Paragraph) -> String {
    let mut text = String::new();
    for content in &paragraph.content {
        let ParagraphContent::Run(run) = content else {
            continue;
        };
        for run_content in &run.content {
            match run_content {
                RunContent::Text(run_text) => text.push_str(&run_text.text),
                RunContent::Tab(_) => text.push('\t'),
                RunContent::Break(_) => text.push('\n'),
                _ => {}
            }
        }
    }
    text
}

fn table_lines(table: &Table) -> Vec<String> {
    table
        .rows
        .iter()
        .map(|row| {
            let cells: Vec<String> = row
                .cells
                .iter()
                .filter_map(|cell| match cell {
                    TableRowContent::TableCell(cell) => {
                        let paragraphs: Vec<String> = cell
                            .content
                            .iter()
                            .filter_map(|content| match content {
                                TableCellContent::Paragraph(paragraph) => Some(paragraph_text(paragraph)),
                                #[allow(unreachable_patterns)]
                                _ => None,
                            })
                            .collect();
                        Some(paragraphs.join(" "))
                    }
                    #[allow(unreachable_patterns)]
                    _ => None,
                })
                .collect();
            cells.join("\t")
        })
        .collect()
}

/// Routes a document kind to the extractor that handles it.
#[derive(Clone)]
pub struct ExtractorRegistry {
    extractors: BTreeMap<&'static str, Arc<dyn TextExtractor>>,
}

impl ExtractorRegistry {
    pub fn empty() -> Self {
        Self {
            extractors: BTreeMap::new(),
        }
    }

    pub fn with_kinds(kinds: &[DocumentKind]) -> Self {
        let mut registry = Self::empty();
        for kind in kinds {
            let extractor: Arc<dyn TextExtractor> = match kind {
                DocumentKind::PlainText => Arc::new(PlainTextExtractor),
                DocumentKind::Pdf => Arc::new(PdfExtractor),
                DocumentKind::Docx => Arc::new(DocxExtractor::default()),
            };
            registry.register(extractor);
        }
        registry
    }

    pub fn register(&mut self, extractor: Arc<dyn TextExtractor>) {
        for extension in extractor.kind().extensions() {
            self.extractors.insert(extension, extractor.clone());
        }
    }

    pub fn find(&self, kind: DocumentKind) -> Option<Arc<dyn TextExtractor>> {
        kind.extensions()
            .iter()
            .find_map(|ext| self.extractors.get(ext).cloned())
    }

    pub fn supports(&self, kind: DocumentKind) -> bool {
        self.find(kind).is_some()
    }

    pub fn supported_extensions(&self) -> Vec<&'static str> {
        self.extractors.keys().copied().collect()
    }
}

impl Default for ExtractorRegistry {
    fn default() -> Self {
        Self::with_kinds(&DocumentKind::ALL)
    }
}

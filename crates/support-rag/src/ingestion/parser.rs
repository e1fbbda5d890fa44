//! Text extraction for PDF, Word, plain text and Markdown files

use regex::Regex;
use std::sync::OnceLock;
use std::time::Duration;

use crate::error::{Error, Result};
use crate::types::document::content_hash;
use crate::types::FileType;

/// How long pdf-extract may run before the lopdf fallback takes over
const PDF_EXTRACT_TIMEOUT: Duration = Duration::from_secs(60);

/// Typographic characters that PDF producers emit, with ASCII replacements
const PDF_REPLACEMENTS: &[(char, &str)] = &[
    ('\u{FB00}', "ff"),
    ('\u{FB01}', "fi"),
    ('\u{FB02}', "fl"),
    ('\u{FB03}', "ffi"),
    ('\u{FB04}', "ffl"),
    ('\u{2010}', "-"),
    ('\u{2011}', "-"),
    ('\u{2012}', "-"),
    ('\u{2013}', "-"),
    ('\u{2014}', "--"),
    ('\u{2018}', "'"),
    ('\u{2019}', "'"),
    ('\u{201A}', "'"),
    ('\u{201C}', "\""),
    ('\u{201D}', "\""),
    ('\u{201E}', "\""),
    ('\u{2022}', "* "),
    ('\u{2026}', "..."),
    ('\u{00A0}', " "),
    ('\u{2002}', " "),
    ('\u{2003}', " "),
    ('\u{2009}', " "),
    ('\u{2212}', "-"),
    ('\0', ""),
];

fn blank_lines() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\n{3,}").expect("static regex"))
}

/// Replace ligatures and typographic punctuation, drop empty lines
pub fn cleanup_pdf_text(text: &str) -> String {
    let mut result = String::with_capacity(text.len());
    for ch in text.chars() {
        match PDF_REPLACEMENTS.iter().find(|(c, _)| *c == ch) {
            Some((_, replacement)) => result.push_str(replacement),
            None => result.push(ch),
        }
    }

    result
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Extracted text of one file
#[derive(Debug, Clone)]
pub struct ParsedDocument {
    /// File type
    pub file_type: FileType,
    /// Extracted text content
    pub content: String,
    /// SHA-256 of the content
    pub content_hash: String,
    /// Total pages (PDF only)
    pub total_pages: Option<u32>,
}

impl ParsedDocument {
    fn new(file_type: FileType, content: String, total_pages: Option<u32>) -> Self {
        Self {
            file_type,
            content_hash: content_hash(&content),
            content,
            total_pages,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.content.trim().is_empty()
    }
}

/// Multi-format file parser
pub struct FileParser;

impl FileParser {
    /// Parse a file based on its extension
    pub fn parse(filename: &str, data: &[u8]) -> Result<ParsedDocument> {
        let extension = std::path::Path::new(filename)
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("");

        let file_type = FileType::from_extension(extension)
            .ok_or_else(|| Error::UnsupportedFileType(extension.to_string()))?;

        match file_type {
            FileType::Pdf => Self::parse_pdf(filename, data),
            FileType::Docx => Self::parse_docx(filename, data),
            FileType::Txt | FileType::Markdown => Ok(Self::parse_text(data, file_type)),
        }
    }

    /// Parse PDF document
    fn parse_pdf(filename: &str, data: &[u8]) -> Result<ParsedDocument> {
        let content = Self::extract_pdf_with_timeout(filename, data)?;
        let content = cleanup_pdf_text(&content);

        if content.is_empty() {
            return Err(Error::file_parse(
                filename,
                "No text content could be extracted from PDF",
            ));
        }

        let total_pages = lopdf::Document::load_mem(data)
            .ok()
            .map(|doc| doc.get_pages().len() as u32);

        Ok(ParsedDocument::new(FileType::Pdf, content, total_pages))
    }

    /// Run pdf-extract on its own thread so a pathological font cannot hang ingestion
    fn extract_pdf_with_timeout(filename: &str, data: &[u8]) -> Result<String> {
        use std::sync::mpsc;
        use std::thread;

        let data_vec = data.to_vec();
        let (tx, rx) = mpsc::channel();

        thread::spawn(move || {
            let result = pdf_extract::extract_text_from_mem(&data_vec);
            let _ = tx.send(result);
        });

        match rx.recv_timeout(PDF_EXTRACT_TIMEOUT) {
            Ok(Ok(text)) if !text.trim().is_empty() => Ok(text),
            Ok(Ok(_)) => {
                tracing::debug!(file = filename, "pdf-extract returned no text, trying fallback");
                Self::extract_pdf_text_fallback(filename, data)
            }
            Ok(Err(e)) => {
                tracing::warn!(file = filename, error = %e, "pdf-extract failed, trying fallback");
                Self::extract_pdf_text_fallback(filename, data)
            }
            Err(mpsc::RecvTimeoutError::Timeout) => {
                // The extraction thread keeps running detached
                tracing::error!(
                    file = filename,
                    "PDF extraction timed out after {}s",
                    PDF_EXTRACT_TIMEOUT.as_secs()
                );
                Self::extract_pdf_text_fallback(filename, data)
            }
            Err(mpsc::RecvTimeoutError::Disconnected) => {
                tracing::error!(file = filename, "PDF extraction thread crashed");
                Self::extract_pdf_text_fallback(filename, data)
            }
        }
    }

    /// Fallback PDF text extraction using lopdf directly
    fn extract_pdf_text_fallback(filename: &str, data: &[u8]) -> Result<String> {
        let doc = lopdf::Document::load_mem(data)
            .map_err(|e| Error::file_parse(filename, format!("Failed to load PDF: {}", e)))?;

        let mut all_text = String::new();
        for (page_num, page_id) in doc.get_pages() {
            match doc.get_page_content(page_id) {
                Ok(content) => {
                    let text = Self::extract_text_from_content(&content);
                    if !text.trim().is_empty() {
                        all_text.push_str(&format!("\n--- Page {} ---\n", page_num));
                        all_text.push_str(&text);
                    }
                }
                Err(e) => {
                    tracing::debug!(file = filename, page = page_num, error = %e, "No page content");
                }
            }
        }

        if all_text.trim().is_empty() {
            return Err(Error::file_parse(
                filename,
                "PDF appears to be image-based or has no extractable text",
            ));
        }

        Ok(all_text)
    }

    /// Pull literal strings shown by Tj/TJ operators inside BT..ET blocks
    fn extract_text_from_content(content: &[u8]) -> String {
        let content_str = String::from_utf8_lossy(content);
        let mut text = String::new();
        let mut in_text_block = false;
        let mut current_text = String::new();

        for line in content_str.lines() {
            let line = line.trim();

            if line == "BT" {
                in_text_block = true;
                continue;
            }

            if line == "ET" {
                in_text_block = false;
                if !current_text.is_empty() {
                    text.push_str(&current_text);
                    text.push(' ');
                    current_text.clear();
                }
                continue;
            }

            if in_text_block && (line.ends_with("Tj") || line.ends_with("TJ")) {
                if let (Some(start), Some(end)) = (line.find('('), line.rfind(')')) {
                    if start < end {
                        let decoded = line[start + 1..end]
                            .replace("\\n", "\n")
                            .replace("\\r", "\r")
                            .replace("\\t", "\t")
                            .replace("\\(", "(")
                            .replace("\\)", ")")
                            .replace("\\\\", "\\");
                        current_text.push_str(&decoded);
                    }
                }
            }
        }

        text
    }

    /// Parse DOCX document: paragraph runs, then table cells
    fn parse_docx(filename: &str, data: &[u8]) -> Result<ParsedDocument> {
        let doc = docx_rs::read_docx(data).map_err(|e| Error::file_parse(filename, e.to_string()))?;

        let mut content = String::new();
        for child in &doc.document.children {
            match child {
                docx_rs::DocumentChild::Paragraph(p) => push_paragraph(&mut content, p),
                docx_rs::DocumentChild::Table(table) => push_table(&mut content, table),
                _ => {}
            }
        }

        let content = blank_lines().replace_all(content.trim(), "\n\n").to_string();
        if content.is_empty() {
            return Err(Error::file_parse(filename, "Document contains no text"));
        }

        Ok(ParsedDocument::new(FileType::Docx, content, None))
    }

    /// Parse plain text or markdown
    fn parse_text(data: &[u8], file_type: FileType) -> ParsedDocument {
        let content = String::from_utf8_lossy(data).to_string();
        ParsedDocument::new(file_type, content, None)
    }
}

fn push_paragraph(out: &mut String, paragraph: &docx_rs::Paragraph) {
    for child in &paragraph.children {
        if let docx_rs::ParagraphChild::Run(run) = child {
            for child in &run.children {
                match child {
                    docx_rs::RunChild::Text(t) => out.push_str(&t.text),
                    docx_rs::RunChild::Tab(_) => out.push('\t'),
                    docx_rs::RunChild::Break(_) => out.push('\n'),
                    _ => {}
                }
            }
        }
    }
    out.push('\n');
}

fn push_table(out: &mut String, table: &docx_rs::Table) {
    for row in &table.rows {
        #[allow(irrefutable_let_patterns)]
        let docx_rs::TableChild::TableRow(row) = row else {
            continue;
        };
        let mut cells = Vec::new();
        for cell in &row.cells {
            #[allow(irrefutable_let_patterns)]
            let docx_rs::TableRowChild::TableCell(cell) = cell else {
                continue;
            };
            let mut text = String::new();
            for content in &cell.children {
                match content {
                    docx_rs::TableCellContent::Paragraph(p) => push_paragraph(&mut text, p),
                    docx_rs::TableCellContent::Table(inner) => push_table(&mut text, inner),
                    _ => {}
                }
            }
            let text = text.split_whitespace().collect::<Vec<_>>().join(" ");
            if !text.is_empty() {
                cells.push(text);
            }
        }
        if !cells.is_empty() {
            out.push_str(&cells.join(" | "));
            out.push('\n');
        }
    }
}

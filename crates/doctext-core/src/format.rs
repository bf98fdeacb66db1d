//! Format detection from the file name or URL extension.
//!
//! Only the trailing extension of the URL path is considered; the query string
//! and fragment are ignored. There is no content sniffing.

use std::fmt;

/// Extraction strategy selected for a downloaded document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentFormat {
    Pdf,
    Docx,
    /// Legacy binary Word document, converted by an external tool.
    Doc,
    /// Unrecognized extension (lower-cased, without the dot; empty if none).
    Unknown(String),
}

impl DocumentFormat {
    /// Map a bare extension (without the dot) to a format, case-insensitively.
    pub fn from_extension(ext: &str) -> Self {
        let lower = ext.trim_start_matches('.').to_lowercase();
        match lower.as_str() {
            "pdf" => DocumentFormat::Pdf,
            "docx" => DocumentFormat::Docx,
            "doc" => DocumentFormat::Doc,
            _ => DocumentFormat::Unknown(lower),
        }
    }

    pub fn extension(&self) -> &str {
        match self {
            DocumentFormat::Pdf => "pdf",
            DocumentFormat::Docx => "docx",
            DocumentFormat::Doc => "doc",
            DocumentFormat::Unknown(ext) => ext,
        }
    }

    pub fn is_supported(&self) -> bool {
        !matches!(self, DocumentFormat::Unknown(_))
    }
}

impl fmt::Display for DocumentFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DocumentFormat::Unknown(ext) if ext.is_empty() => write!(f, "(no extension)"),
            DocumentFormat::Unknown(ext) => write!(f, ".{}", ext),
            known => write!(f, "{}", known.extension()),
        }
    }
}

/// Detect the document format of `file_url`.
///
/// Accepts absolute URLs as well as plain file names or paths.
pub fn detect_format(file_url: &str) -> DocumentFormat {
    let path = match reqwest::Url::parse(file_url) {
        Ok(url) => url.path().to_string(),
        Err(_) => strip_query(file_url).to_string(),
    };
    DocumentFormat::from_extension(extension_of(&path))
}

/// Extension of the last path segment, or `""` when it has none.
pub fn extension_of(path: &str) -> &str {
    let name = path.rsplit(['/', '\\']).next().unwrap_or("");
    match name.rfind('.') {
        // A leading dot marks a hidden file, not an extension
        Some(0) | None => "",
        Some(idx) => &name[idx + 1..],
    }
}

fn strip_query(raw: &str) -> &str {
    let end = raw.find(['?', '#']).unwrap_or(raw.len());
    &raw[..end]
}

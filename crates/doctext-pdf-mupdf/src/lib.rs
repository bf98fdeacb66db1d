use std::path::Path;

use mupdf::{Document, TextPageFlags};

use doctext_core::{BackendError, PdfBackend};

/// MuPDF-based implementation of [`PdfBackend`].
///
/// This crate is the sole AGPL island: it isolates the mupdf dependency so
/// that the DOCX and legacy-DOC code paths do not transitively depend on it.
///
/// Text is read block by block and line by line, one `\n` per line. Pages
/// without a text layer (scans, images) come back as empty strings.
#[derive(Debug, Clone, Copy)]
pub struct MupdfBackend {
    expand_ligatures: bool,
}

impl Default for MupdfBackend {
    fn default() -> Self {
        Self {
            expand_ligatures: true,
        }
    }
}

impl MupdfBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keep typographic ligatures (`ﬁ`, `ﬂ`, ...) as single code points.
    pub fn keep_ligatures(mut self) -> Self {
        self.expand_ligatures = false;
        self
    }
}

impl PdfBackend for MupdfBackend {
    fn extract_pages(&self, path: &Path) -> Result<Vec<String>, BackendError> {
        let path_str = path
            .to_str()
            .ok_or_else(|| BackendError::OpenError("invalid path encoding".into()))?;

        let document =
            Document::open(path_str).map_err(|e| BackendError::OpenError(e.to_string()))?;

        if document
            .needs_password()
            .map_err(|e| BackendError::OpenError(e.to_string()))?
        {
            return Err(BackendError::Encrypted);
        }

        let mut pages = Vec::new();
        for page_result in document
            .pages()
            .map_err(|e| BackendError::ExtractionError(e.to_string()))?
        {
            let page = page_result.map_err(|e| BackendError::ExtractionError(e.to_string()))?;
            let text_page = page
                .to_text_page(TextPageFlags::empty())
                .map_err(|e| BackendError::ExtractionError(e.to_string()))?;

            let mut page_text = String::new();
            for block in text_page.blocks() {
                for line in block.lines() {
                    for c in line.chars() {
                        let ch = c.char().unwrap_or('\u{FFFD}');
                        match ligature_expansion(ch).filter(|_| self.expand_ligatures) {
                            Some(expanded) => page_text.push_str(expanded),
                            None => page_text.push(ch),
                        }
                    }
                    page_text.push('\n');
                }
            }
            pages.push(page_text);
        }

        tracing::debug!(path = %path.display(), pages = pages.len(), "extracted PDF pages");
        Ok(pages)
    }
}

fn ligature_expansion(ch: char) -> Option<&'static str> {
    match ch {
        '\u{FB00}' => Some("ff"),
        '\u{FB01}' => Some("fi"),
        '\u{FB02}' => Some("fl"),
        '\u{FB03}' => Some("ffi"),
        '\u{FB04}' => Some("ffl"),
        '\u{FB05}' | '\u{FB06}' => Some("st"),
        _ => None,
    }
}

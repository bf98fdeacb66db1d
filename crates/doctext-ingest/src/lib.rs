use std::path::Path;
use std::time::Duration;

use thiserror::Error;

use doctext_core::{BackendError, Config, TextCleaning, clean_text};

pub mod converter;
pub mod docx;
pub mod pipeline;

// Re-export domain types for convenience
pub use doctext_core::{DocumentFormat, ExtractionOutcome, JobRequest};
pub use pipeline::{JobError, JobEvent, JobReport, Pipeline, ProcessedDocument};

#[derive(Error, Debug)]
pub enum ExtractError {
    #[error("PDF extraction error: {0}")]
    Pdf(#[from] BackendError),
    #[error("PDF extraction error: {primary}; fallback converter also failed: {fallback}")]
    PdfFallback { primary: String, fallback: String },
    #[error("DOCX extraction error: {0}")]
    Docx(String),
    #[error("converter '{program}' exited with {status}: {stderr}")]
    Converter {
        program: String,
        status: String,
        stderr: String,
    },
    #[error("failed to run converter '{program}': {source}")]
    ConverterSpawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error("converter '{program}' timed out after {secs}s")]
    ConverterTimeout { program: String, secs: u64 },
    #[error("no text could be extracted from the document")]
    NoText,
    #[error("no extraction strategy for {0}")]
    Unsupported(DocumentFormat),
    #[cfg(not(feature = "pdf"))]
    #[error("PDF support not compiled in (enable the `pdf` feature of doctext-ingest)")]
    NoPdfSupport,
}

/// Knobs for the extraction strategies, derived from [`Config`].
#[derive(Debug, Clone)]
pub struct ExtractOptions {
    pub antiword_path: String,
    pub pdftotext_path: String,
    pub pdf_fallback: bool,
    pub converter_timeout: Duration,
    pub text_cleaning: TextCleaning,
    pub allow_empty_text: bool,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self::from(&Config::default())
    }
}

impl From<&Config> for ExtractOptions {
    fn from(config: &Config) -> Self {
        Self {
            antiword_path: config.antiword_path.clone(),
            pdftotext_path: config.pdftotext_path.clone(),
            pdf_fallback: config.pdf_fallback,
            converter_timeout: config.converter_timeout(),
            text_cleaning: config.text_cleaning,
            allow_empty_text: config.allow_empty_text,
        }
    }
}

/// Extract plain text from a document on disk.
///
/// Dispatches on `format`:
/// - `Pdf` → MuPDF, pages joined with `\n` (optionally `pdftotext` as fallback)
/// - `Docx` → paragraphs of `word/document.xml`, then table rows
/// - `Doc` → stdout of the external converter (`antiword`)
///
/// The result is cleaned per `options.text_cleaning`. A blank result is an
/// error unless `options.allow_empty_text` is set.
pub async fn extract_text(
    path: &Path,
    format: &DocumentFormat,
    options: &ExtractOptions,
) -> Result<String, ExtractError> {
    let raw = match format {
        DocumentFormat::Pdf => extract_pdf(path, options).await?,
        DocumentFormat::Docx => docx::extract_docx_text(path)?,
        DocumentFormat::Doc => {
            converter::run_converter(
                &options.antiword_path,
                &[path.as_os_str()],
                options.converter_timeout,
            )
            .await?
        }
        DocumentFormat::Unknown(_) => return Err(ExtractError::Unsupported(format.clone())),
    };

    let text = clean_text(&raw, options.text_cleaning);
    if text.is_empty() && !options.allow_empty_text {
        return Err(ExtractError::NoText);
    }
    tracing::debug!(format = %format, chars = text.chars().count(), "text extracted");
    Ok(text)
}

#[cfg(feature = "pdf")]
async fn extract_pdf(path: &Path, options: &ExtractOptions) -> Result<String, ExtractError> {
    use doctext_core::PdfBackend;

    let backend = doctext_pdf_mupdf::MupdfBackend::default();
    match backend.extract_text(path) {
        Ok(text) if !text.trim().is_empty() || !options.pdf_fallback => Ok(text),
        Ok(blank) => {
            // No text layer found; a scanned PDF stays blank unless pdftotext does better
            match converter::pdftotext(path, options).await {
                Ok(text) => Ok(text),
                Err(e) => {
                    tracing::debug!(error = %e, "pdftotext fallback unavailable");
                    Ok(blank)
                }
            }
        }
        Err(primary) if options.pdf_fallback => {
            tracing::info!(error = %primary, "MuPDF failed, trying pdftotext");
            match converter::pdftotext(path, options).await {
                Ok(text) if !text.trim().is_empty() => Ok(text),
                Ok(_) => Err(ExtractError::Pdf(primary)),
                Err(fallback) => Err(ExtractError::PdfFallback {
                    primary: primary.to_string(),
                    fallback: fallback.to_string(),
                }),
            }
        }
        Err(primary) => Err(ExtractError::Pdf(primary)),
    }
}

#[cfg(not(feature = "pdf"))]
async fn extract_pdf(path: &Path, options: &ExtractOptions) -> Result<String, ExtractError> {
    if options.pdf_fallback {
        return converter::pdftotext(path, options).await;
    }
    Err(ExtractError::NoPdfSupport)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn unknown_format_is_rejected() {
        let err = extract_text(
            Path::new("/tmp/whatever.xyz"),
            &DocumentFormat::Unknown("xyz".into()),
            &ExtractOptions::default(),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ExtractError::Unsupported(_)));
        assert!(err.to_string().contains(".xyz"));
    }

    #[test]
    fn options_follow_config() {
        let config = Config {
            antiword_path: "/opt/bin/antiword".into(),
            converter_timeout_secs: 5,
            text_cleaning: TextCleaning::Strict,
            ..Config::default()
        };
        let options = ExtractOptions::from(&config);
        assert_eq!(options.antiword_path, "/opt/bin/antiword");
        assert_eq!(options.converter_timeout, Duration::from_secs(5));
        assert_eq!(options.text_cleaning, TextCleaning::Strict);
        assert!(options.pdf_fallback);
    }
}

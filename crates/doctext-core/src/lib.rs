use std::time::Duration;

use thiserror::Error;

pub mod backend;
pub mod config_file;
pub mod fetch;
pub mod format;
pub mod notify;
pub mod text;

// Re-export for convenience
pub use backend::{BackendError, PdfBackend};
pub use fetch::{DownloadError, DownloadedArtifact, FetchOptions, FetchProgress, download};
pub use format::{DocumentFormat, detect_format};
pub use notify::{CallbackPayload, JobStatus, NotifyError, PayloadMetadata, notify};
pub use text::{TextCleaning, clean_text};

// HTTP types that appear in public error variants
pub use reqwest::{StatusCode, Url};

/// Default user agent sent with every outbound request.
pub const DEFAULT_USER_AGENT: &str = concat!("doctext/", env!("CARGO_PKG_VERSION"));

/// One text-extraction job, as handed over by the workflow trigger.
///
/// Built once through [`JobRequest::new`], which rejects a malformed callback
/// URL since there would be nowhere to report to. `file_url` is kept as given
/// and checked by the fetcher, so a bad one still yields a `failed` callback.
/// The auth token never shows up in `Debug` output.
#[derive(Clone)]
pub struct JobRequest {
    file_url: String,
    application_id: String,
    callback_url: reqwest::Url,
    auth_token: String,
}

impl JobRequest {
    pub fn new(
        file_url: &str,
        application_id: impl Into<String>,
        callback_url: &str,
        auth_token: impl Into<String>,
    ) -> Result<Self, CoreError> {
        let callback_url = parse_http_url(callback_url)
            .map_err(|reason| CoreError::Validation(format!("callback_url {reason}")))?;
        Ok(Self {
            file_url: file_url.trim().to_string(),
            application_id: application_id.into(),
            callback_url,
            auth_token: auth_token.into(),
        })
    }

    pub fn file_url(&self) -> &str {
        &self.file_url
    }

    pub fn application_id(&self) -> &str {
        &self.application_id
    }

    pub fn callback_url(&self) -> &reqwest::Url {
        &self.callback_url
    }

    pub fn auth_token(&self) -> &str {
        &self.auth_token
    }
}

impl std::fmt::Debug for JobRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JobRequest")
            .field("file_url", &self.file_url)
            .field("application_id", &self.application_id)
            .field("callback_url", &self.callback_url.as_str())
            .field("auth_token", &"***")
            .finish()
    }
}

/// Parse an absolute `http`/`https` URL. The error reads as a predicate,
/// e.g. "is not a valid URL (...): cv.pdf".
pub(crate) fn parse_http_url(raw: &str) -> Result<reqwest::Url, String> {
    let url = reqwest::Url::parse(raw.trim())
        .map_err(|e| format!("is not a valid URL ({e}): {raw}"))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(format!("must use http or https, got {other}: {raw}")),
    }
}

/// Final result of the extraction stage, consumed once by the notifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtractionOutcome {
    Success { text: String },
    Failure { error: String },
}

impl ExtractionOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, ExtractionOutcome::Success { .. })
    }
}

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("invalid job request: {0}")]
    Validation(String),
    #[error("invalid configuration: {0}")]
    Config(String),
}

/// Resolved runtime configuration.
///
/// Built from defaults, then overlaid with the TOML config file, environment
/// variables and CLI flags (see [`config_file`]).
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub download_timeout_secs: u64,
    pub callback_timeout_secs: u64,
    pub user_agent: String,
    /// Download size cap in megabytes (0 = unlimited).
    pub max_download_mb: u64,
    /// Legacy `.doc` converter; invoked as `<antiword_path> <file>`.
    pub antiword_path: String,
    /// Fallback PDF converter; invoked as `<pdftotext_path> -layout <file> -`.
    pub pdftotext_path: String,
    pub pdf_fallback: bool,
    pub converter_timeout_secs: u64,
    pub text_cleaning: TextCleaning,
    pub allow_empty_text: bool,
    /// Add `file_type`, `text_length` and `processed_at` to the callback body.
    pub include_metadata: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            download_timeout_secs: 30,
            callback_timeout_secs: 30,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            max_download_mb: 0,
            antiword_path: "antiword".to_string(),
            pdftotext_path: "pdftotext".to_string(),
            pdf_fallback: true,
            converter_timeout_secs: 30,
            text_cleaning: TextCleaning::default(),
            allow_empty_text: false,
            include_metadata: false,
        }
    }
}

impl Config {
    pub fn download_timeout(&self) -> Duration {
        Duration::from_secs(self.download_timeout_secs)
    }

    pub fn callback_timeout(&self) -> Duration {
        Duration::from_secs(self.callback_timeout_secs)
    }

    pub fn converter_timeout(&self) -> Duration {
        Duration::from_secs(self.converter_timeout_secs)
    }

    pub fn fetch_options(&self) -> FetchOptions {
        FetchOptions {
            timeout: self.download_timeout(),
            max_bytes: self.max_download_mb.saturating_mul(1024 * 1024),
        }
    }

    /// Reject values that would make every request fail immediately.
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.download_timeout_secs == 0 {
            return Err(CoreError::Config("download timeout must be > 0".into()));
        }
        if self.callback_timeout_secs == 0 {
            return Err(CoreError::Config("callback timeout must be > 0".into()));
        }
        if self.converter_timeout_secs == 0 {
            return Err(CoreError::Config("converter timeout must be > 0".into()));
        }
        if self.antiword_path.trim().is_empty() {
            return Err(CoreError::Config("antiword path must not be empty".into()));
        }
        if self.pdftotext_path.trim().is_empty() {
            return Err(CoreError::Config("pdftotext path must not be empty".into()));
        }
        Ok(())
    }
}

/// Build the shared HTTP client used for both the download and the callback.
///
/// Per-request timeouts are applied at call sites; the client only carries the
/// user agent.
pub fn build_client(config: &Config) -> Result<reqwest::Client, CoreError> {
    reqwest::Client::builder()
        .user_agent(config.user_agent.as_str())
        .build()
        .map_err(CoreError::Http)
}

//! Document download into a temporary file.
//!
//! The body is streamed chunk by chunk into a `tempfile` whose suffix matches
//! the URL extension, so extension-sensitive decoders can open it directly.
//! The file is deleted when the [`DownloadedArtifact`] is dropped.

use std::io::Write;
use std::path::Path;
use std::time::Duration;

use futures_util::StreamExt;
use tempfile::NamedTempFile;
use thiserror::Error;

use crate::format::{DocumentFormat, detect_format, extension_of};

#[derive(Error, Debug)]
pub enum DownloadError {
    #[error("invalid download URL: {reason}")]
    InvalidUrl { reason: String },
    #[error("HTTP {status} while downloading {url}")]
    Status {
        status: reqwest::StatusCode,
        url: String,
    },
    #[error("request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("download exceeds the {limit_mb} MB size limit")]
    TooLarge { limit_mb: u64 },
    #[error("failed to write temporary file: {0}")]
    Io(#[from] std::io::Error),
}

/// Progress events emitted while the body is being streamed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchProgress {
    Downloading {
        bytes_downloaded: u64,
        total_bytes: Option<u64>,
    },
}

#[derive(Debug, Clone)]
pub struct FetchOptions {
    pub timeout: Duration,
    /// Maximum body size in bytes (0 = unlimited).
    pub max_bytes: u64,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            max_bytes: 0,
        }
    }
}

/// Downloaded bytes on disk plus the format inferred from the URL.
#[derive(Debug)]
pub struct DownloadedArtifact {
    file: NamedTempFile,
    pub format: DocumentFormat,
    pub bytes: u64,
}

impl DownloadedArtifact {
    pub fn path(&self) -> &Path {
        self.file.path()
    }

    /// Delete the temporary file now instead of on drop.
    pub fn discard(self) {
        let path = self.file.path().to_path_buf();
        if let Err(e) = self.file.close() {
            tracing::warn!(path = %path.display(), error = %e, "failed to remove temporary file");
        }
    }
}

/// Download `file_url` into a temporary file.
///
/// Fails on URLs that are not absolute http(s), connection errors, timeouts,
/// non-2xx statuses, and bodies larger than `options.max_bytes`.
pub async fn download(
    client: &reqwest::Client,
    file_url: &str,
    options: &FetchOptions,
    mut progress: impl FnMut(FetchProgress),
) -> Result<DownloadedArtifact, DownloadError> {
    let url = &crate::parse_http_url(file_url).map_err(|reason| DownloadError::InvalidUrl {
        reason: format!("file_url {reason}"),
    })?;
    let request_error = |source| DownloadError::Request {
        url: url.to_string(),
        source,
    };

    tracing::debug!(url = %url, "sending download request");
    let response = client
        .get(url.clone())
        .timeout(options.timeout)
        .send()
        .await
        .map_err(request_error)?;

    let status = response.status();
    if !status.is_success() {
        return Err(DownloadError::Status {
            status,
            url: url.to_string(),
        });
    }

    let total_bytes = response.content_length();
    if options.max_bytes > 0
        && let Some(total) = total_bytes
        && total > options.max_bytes
    {
        return Err(DownloadError::TooLarge {
            limit_mb: options.max_bytes / 1024 / 1024,
        });
    }

    let ext = extension_of(url.path());
    let suffix = if ext.is_empty() {
        String::new()
    } else {
        format!(".{}", ext.to_lowercase())
    };
    let mut file = tempfile::Builder::new()
        .prefix("doctext-")
        .suffix(&suffix)
        .tempfile()?;

    progress(FetchProgress::Downloading {
        bytes_downloaded: 0,
        total_bytes,
    });

    let mut bytes_downloaded: u64 = 0;
    let mut stream = response.bytes_stream();
    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(request_error)?;
        bytes_downloaded += chunk.len() as u64;
        if options.max_bytes > 0 && bytes_downloaded > options.max_bytes {
            return Err(DownloadError::TooLarge {
                limit_mb: options.max_bytes / 1024 / 1024,
            });
        }
        file.write_all(&chunk)?;

        progress(FetchProgress::Downloading {
            bytes_downloaded,
            total_bytes,
        });
    }
    file.flush()?;

    tracing::info!(
        url = %url,
        bytes = bytes_downloaded,
        path = %file.path().display(),
        "download complete"
    );

    Ok(DownloadedArtifact {
        file,
        format: detect_format(url.as_str()),
        bytes: bytes_downloaded,
    })
}

//! Webhook notification of the job outcome.

use std::time::Duration;

use serde::Serialize;
use thiserror::Error;

use crate::ExtractionOutcome;

/// Maximum number of response-body characters kept in a rejection error.
const MAX_ERROR_BODY_CHARS: usize = 512;

#[derive(Error, Debug)]
pub enum NotifyError {
    #[error("callback request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("callback {url} rejected the notification with HTTP {status}: {body}")]
    Rejected {
        url: String,
        status: reqwest::StatusCode,
        body: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Completed,
    Failed,
}

/// Optional fields appended to the callback body when metadata is enabled.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PayloadMetadata {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text_length: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub processed_at: Option<String>,
}

/// JSON body posted to the callback URL.
///
/// Exactly one of `extracted_text` (when completed) or `error` (when failed)
/// is present.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CallbackPayload {
    pub application_id: String,
    pub status: JobStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extracted_text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(flatten)]
    pub metadata: Option<PayloadMetadata>,
}

impl CallbackPayload {
    pub fn new(application_id: impl Into<String>, outcome: &ExtractionOutcome) -> Self {
        let (status, extracted_text, error) = match outcome {
            ExtractionOutcome::Success { text } => (JobStatus::Completed, Some(text.clone()), None),
            ExtractionOutcome::Failure { error } => (JobStatus::Failed, None, Some(error.clone())),
        };
        Self {
            application_id: application_id.into(),
            status,
            extracted_text,
            error,
            metadata: None,
        }
    }

    /// Attach `file_type`, `text_length` (completed jobs only) and a UTC
    /// `processed_at` timestamp.
    pub fn with_metadata(mut self, file_type: Option<&str>) -> Self {
        self.metadata = Some(PayloadMetadata {
            file_type: file_type.filter(|t| !t.is_empty()).map(str::to_string),
            text_length: self.extracted_text.as_ref().map(|t| t.chars().count()),
            processed_at: Some(
                chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Secs, true),
            ),
        });
        self
    }

    pub fn to_json(&self) -> String {
        // A struct of strings and integers always serializes
        serde_json::to_string(self).unwrap_or_default()
    }
}

/// POST `payload` to `callback_url` with a bearer token.
///
/// Any transport failure or non-2xx status is returned as an error; there is
/// no retry.
pub async fn notify(
    client: &reqwest::Client,
    callback_url: &reqwest::Url,
    auth_token: &str,
    payload: &CallbackPayload,
    timeout: Duration,
) -> Result<(), NotifyError> {
    tracing::info!(
        url = %callback_url,
        application_id = %payload.application_id,
        status = ?payload.status,
        "sending callback"
    );

    let resp = client
        .post(callback_url.clone())
        .bearer_auth(auth_token)
        .json(payload)
        .timeout(timeout)
        .send()
        .await
        .map_err(|source| NotifyError::Request {
            url: callback_url.to_string(),
            source,
        })?;

    let status = resp.status();
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        return Err(NotifyError::Rejected {
            url: callback_url.to_string(),
            status,
            body: truncate_chars(body.trim(), MAX_ERROR_BODY_CHARS),
        });
    }

    tracing::info!(url = %callback_url, status = status.as_u16(), "callback delivered");
    Ok(())
}

fn truncate_chars(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        Some((idx, _)) => format!("{}...", &s[..idx]),
        None => s.to_string(),
    }
}

//! The job pipeline: download, detect, extract, notify.
//!
//! Every stage failure before the callback is folded into a `failed` payload
//! so the callback always hears about the job. Only a failed callback is
//! surfaced to the caller as an error.

use thiserror::Error;

use doctext_core::{
    CallbackPayload, Config, CoreError, DocumentFormat, DownloadError, ExtractionOutcome,
    FetchProgress, JobRequest, JobStatus, NotifyError, build_client, detect_format, download,
    notify,
};

use crate::{ExtractError, ExtractOptions, extract_text};

#[derive(Error, Debug)]
pub enum JobError {
    #[error("download failed: {0}")]
    Download(#[from] DownloadError),
    #[error("unsupported file format: {0} (expected .pdf, .docx or .doc)")]
    UnsupportedFormat(DocumentFormat),
    #[error("text extraction failed: {0}")]
    Extraction(#[from] ExtractError),
}

/// Stage transitions reported to the pipeline observer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobEvent {
    Downloading {
        bytes_downloaded: u64,
        total_bytes: Option<u64>,
    },
    Extracting {
        format: DocumentFormat,
        bytes: u64,
    },
    Notifying {
        status: JobStatus,
    },
    Done {
        delivered: bool,
    },
}

impl From<FetchProgress> for JobEvent {
    fn from(progress: FetchProgress) -> Self {
        match progress {
            FetchProgress::Downloading {
                bytes_downloaded,
                total_bytes,
            } => JobEvent::Downloading {
                bytes_downloaded,
                total_bytes,
            },
        }
    }
}

/// Text pulled out of a successfully downloaded document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessedDocument {
    pub text: String,
    pub format: DocumentFormat,
    pub bytes: u64,
}

/// What happened to a job, and the payload describing it.
#[derive(Debug, Clone)]
pub struct JobReport {
    pub outcome: ExtractionOutcome,
    pub payload: CallbackPayload,
    pub format: DocumentFormat,
    /// Downloaded size; 0 when the download itself failed.
    pub bytes: u64,
}

impl JobReport {
    pub fn succeeded(&self) -> bool {
        self.outcome.is_success()
    }
}

pub struct Pipeline {
    config: Config,
    client: reqwest::Client,
    options: ExtractOptions,
}

impl Pipeline {
    pub fn new(config: Config) -> Result<Self, CoreError> {
        config.validate()?;
        let client = build_client(&config)?;
        let options = ExtractOptions::from(&config);
        Ok(Self {
            config,
            client,
            options,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Download the document and extract its text.
    ///
    /// The temporary file is removed before this returns, whatever the
    /// outcome.
    pub async fn process(
        &self,
        request: &JobRequest,
        progress: impl Fn(JobEvent),
    ) -> Result<ProcessedDocument, JobError> {
        let artifact = download(
            &self.client,
            request.file_url(),
            &self.config.fetch_options(),
            |p| progress(JobEvent::from(p)),
        )
        .await?;

        if !artifact.format.is_supported() {
            let format = artifact.format.clone();
            artifact.discard();
            return Err(JobError::UnsupportedFormat(format));
        }

        let format = artifact.format.clone();
        let bytes = artifact.bytes;
        progress(JobEvent::Extracting {
            format: format.clone(),
            bytes,
        });
        tracing::info!(format = %format, bytes, "extracting text");

        let result = extract_text(artifact.path(), &format, &self.options).await;
        artifact.discard();
        let text = result?;

        Ok(ProcessedDocument {
            text,
            format,
            bytes,
        })
    }

    /// Run every stage except the callback and build the payload to send.
    ///
    /// Never fails: stage errors become a `failed` payload.
    pub async fn execute(&self, request: &JobRequest, progress: impl Fn(JobEvent)) -> JobReport {
        let (outcome, format, bytes) = match self.process(request, &progress).await {
            Ok(doc) => {
                tracing::info!(
                    application_id = %request.application_id(),
                    chars = doc.text.chars().count(),
                    "extraction succeeded"
                );
                (
                    ExtractionOutcome::Success { text: doc.text },
                    doc.format,
                    doc.bytes,
                )
            }
            Err(e) => {
                tracing::warn!(
                    application_id = %request.application_id(),
                    error = %e,
                    "job failed"
                );
                let format = match &e {
                    JobError::UnsupportedFormat(format) => format.clone(),
                    _ => detect_format(request.file_url()),
                };
                (
                    ExtractionOutcome::Failure {
                        error: e.to_string(),
                    },
                    format,
                    0,
                )
            }
        };

        let mut payload = CallbackPayload::new(request.application_id(), &outcome);
        if self.config.include_metadata {
            payload = payload.with_metadata(Some(format.extension()));
        }

        JobReport {
            outcome,
            payload,
            format,
            bytes,
        }
    }

    /// Run the whole job and deliver the outcome to the callback URL.
    ///
    /// `Ok` means the callback accepted the notification, whether the job
    /// itself succeeded or not.
    pub async fn run(
        &self,
        request: &JobRequest,
        progress: impl Fn(JobEvent),
    ) -> Result<JobReport, NotifyError> {
        let report = self.execute(request, &progress).await;

        progress(JobEvent::Notifying {
            status: report.payload.status,
        });
        let delivered = notify(
            &self.client,
            request.callback_url(),
            request.auth_token(),
            &report.payload,
            self.config.callback_timeout(),
        )
        .await;

        progress(JobEvent::Done {
            delivered: delivered.is_ok(),
        });
        delivered.map(|()| report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_config_is_rejected() {
        let config = Config {
            download_timeout_secs: 0,
            ..Config::default()
        };
        assert!(matches!(Pipeline::new(config), Err(CoreError::Config(_))));
    }

    #[test]
    fn unsupported_format_message_names_the_extension() {
        let err = JobError::UnsupportedFormat(DocumentFormat::Unknown("xyz".into()));
        let msg = err.to_string();
        assert!(msg.contains(".xyz"));
        assert!(msg.contains(".pdf"));
    }

    #[test]
    fn fetch_progress_maps_to_downloading() {
        let event = JobEvent::from(FetchProgress::Downloading {
            bytes_downloaded: 10,
            total_bytes: Some(20),
        });
        assert_eq!(
            event,
            JobEvent::Downloading {
                bytes_downloaded: 10,
                total_bytes: Some(20),
            }
        );
    }
}

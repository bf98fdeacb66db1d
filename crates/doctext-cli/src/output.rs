use std::io::Write;

use doctext_core::{JobStatus, NotifyError};
use doctext_ingest::{ExtractionOutcome, JobReport, JobRequest};
use indicatif::HumanBytes;
use owo_colors::OwoColorize;

/// Whether to use colored output.
#[derive(Debug, Clone, Copy)]
pub struct ColorMode(pub bool);

impl ColorMode {
    pub fn enabled(&self) -> bool {
        self.0
    }
}

pub fn status_label(status: JobStatus) -> &'static str {
    match status {
        JobStatus::Completed => "completed",
        JobStatus::Failed => "failed",
    }
}

/// Print the outcome of a job whose callback was delivered.
pub fn print_job_summary(
    w: &mut dyn Write,
    request: &JobRequest,
    report: &JobReport,
    color: ColorMode,
) -> std::io::Result<()> {
    let label = status_label(report.payload.status);
    let header = format!("Application {}: {}", request.application_id(), label);

    match &report.outcome {
        ExtractionOutcome::Success { text } => {
            if color.enabled() {
                writeln!(w, "{}", header.green().bold())?;
            } else {
                writeln!(w, "{}", header)?;
            }
            writeln!(
                w,
                "  Extracted {} characters from {} ({})",
                text.chars().count(),
                report.format,
                HumanBytes(report.bytes)
            )?;
        }
        ExtractionOutcome::Failure { error } => {
            if color.enabled() {
                writeln!(w, "{}", header.red().bold())?;
                writeln!(w, "  {}", error.red())?;
            } else {
                writeln!(w, "{}", header)?;
                writeln!(w, "  {}", error)?;
            }
        }
    }

    let delivered = format!("Callback delivered to {}", request.callback_url());
    if color.enabled() {
        writeln!(w, "{}", delivered.dimmed())?;
    } else {
        writeln!(w, "{}", delivered)?;
    }
    Ok(())
}

/// Print why the callback could not be delivered.
pub fn print_notify_error(
    w: &mut dyn Write,
    error: &NotifyError,
    color: ColorMode,
) -> std::io::Result<()> {
    let hint = match error {
        NotifyError::Rejected { status, .. } if status.as_u16() == 401 || status.as_u16() == 403 => {
            Some("check AUTH_TOKEN")
        }
        NotifyError::Request { .. } => Some("is the callback URL reachable?"),
        _ => None,
    };

    if color.enabled() {
        writeln!(w, "{} {}", "Notification failed:".red().bold(), error)?;
        if let Some(hint) = hint {
            writeln!(w, "  {}", hint.yellow())?;
        }
    } else {
        writeln!(w, "Notification failed: {}", error)?;
        if let Some(hint) = hint {
            writeln!(w, "  {}", hint)?;
        }
    }
    Ok(())
}

/// Header shown before the payload of a dry run.
pub fn print_dry_run(
    w: &mut dyn Write,
    request: &JobRequest,
    color: ColorMode,
) -> std::io::Result<()> {
    if color.enabled() {
        writeln!(
            w,
            "{} payload for {} (not sent)",
            "DRY RUN:".bold().cyan(),
            request.callback_url().bold()
        )
    } else {
        writeln!(
            w,
            "DRY RUN: payload for {} (not sent)",
            request.callback_url()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use doctext_core::CallbackPayload;
    use doctext_ingest::DocumentFormat;

    fn request() -> JobRequest {
        JobRequest::new(
            "https://files.example.com/cv.pdf",
            "42",
            "https://api.example.com/hook",
            "tok",
        )
        .unwrap()
    }

    fn report(outcome: ExtractionOutcome) -> JobReport {
        JobReport {
            payload: CallbackPayload::new("42", &outcome),
            outcome,
            format: DocumentFormat::Pdf,
            bytes: 2048,
        }
    }

    #[test]
    fn success_summary() {
        let mut out = Vec::new();
        let report = report(ExtractionOutcome::Success {
            text: "Jane Doe".into(),
        });
        print_job_summary(&mut out, &request(), &report, ColorMode(false)).unwrap();
        let out = String::from_utf8(out).unwrap();
        assert!(out.starts_with("Application 42: completed\n"));
        assert!(out.contains("Extracted 8 characters from pdf (2.00 KiB)"));
        assert!(out.contains("Callback delivered to https://api.example.com/hook"));
    }

    #[test]
    fn failure_summary_shows_error() {
        let mut out = Vec::new();
        let report = report(ExtractionOutcome::Failure {
            error: "download failed: HTTP 404 Not Found".into(),
        });
        print_job_summary(&mut out, &request(), &report, ColorMode(false)).unwrap();
        let out = String::from_utf8(out).unwrap();
        assert!(out.starts_with("Application 42: failed\n"));
        assert!(out.contains("  download failed: HTTP 404 Not Found\n"));
    }

    #[test]
    fn notify_error_names_status_and_hint() {
        let err = NotifyError::Rejected {
            url: "https://api.example.com/hook".into(),
            status: doctext_core::StatusCode::UNAUTHORIZED,
            body: "bad token".into(),
        };
        let mut out = Vec::new();
        print_notify_error(&mut out, &err, ColorMode(false)).unwrap();
        let out = String::from_utf8(out).unwrap();
        assert!(out.starts_with("Notification failed: callback https://api.example.com/hook"));
        assert!(out.contains("401"));
        assert!(out.ends_with("  check AUTH_TOKEN\n"));
    }

    #[test]
    fn dry_run_header_names_callback() {
        let mut out = Vec::new();
        print_dry_run(&mut out, &request(), ColorMode(false)).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "DRY RUN: payload for https://api.example.com/hook (not sent)\n"
        );
    }
}

//! External command-line converters (`antiword` for legacy `.doc`, `pdftotext`
//! as the PDF fallback).

use std::ffi::OsStr;
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use tokio::process::Command;

use crate::{ExtractError, ExtractOptions};

/// Run `program args...` and return its stdout verbatim.
///
/// A non-zero exit status is an error carrying the converter's stderr. The
/// child is killed if it outlives `timeout`.
pub async fn run_converter(
    program: &str,
    args: &[&OsStr],
    timeout: Duration,
) -> Result<String, ExtractError> {
    tracing::debug!(program, ?args, "running converter");

    let child = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|source| ExtractError::ConverterSpawn {
            program: program.to_string(),
            source,
        })?;

    let output = match tokio::time::timeout(timeout, child.wait_with_output()).await {
        Ok(result) => result.map_err(|source| ExtractError::ConverterSpawn {
            program: program.to_string(),
            source,
        })?,
        Err(_) => {
            return Err(ExtractError::ConverterTimeout {
                program: program.to_string(),
                secs: timeout.as_secs(),
            });
        }
    };

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        return Err(ExtractError::Converter {
            program: program.to_string(),
            status: output.status.to_string(),
            stderr: if stderr.is_empty() {
                "(no output)".to_string()
            } else {
                stderr
            },
        });
    }

    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

/// `pdftotext -layout <path> -`
pub async fn pdftotext(path: &Path, options: &ExtractOptions) -> Result<String, ExtractError> {
    run_converter(
        &options.pdftotext_path,
        &[
            OsStr::new("-layout"),
            path.as_os_str(),
            OsStr::new("-"),
        ],
        options.converter_timeout,
    )
    .await
}

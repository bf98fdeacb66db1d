use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::{Config, CoreError, TextCleaning};

/// On-disk TOML configuration structure.
/// All fields are optional so partial configs work (merge with defaults).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConfigFile {
    pub http: Option<HttpConfig>,
    pub extraction: Option<ExtractionConfig>,
    pub callback: Option<CallbackConfig>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HttpConfig {
    pub download_timeout_secs: Option<u64>,
    pub callback_timeout_secs: Option<u64>,
    pub user_agent: Option<String>,
    pub max_download_mb: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtractionConfig {
    pub antiword_path: Option<String>,
    pub pdftotext_path: Option<String>,
    pub pdf_fallback: Option<bool>,
    pub converter_timeout_secs: Option<u64>,
    pub text_cleaning: Option<TextCleaning>,
    pub allow_empty_text: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CallbackConfig {
    pub include_metadata: Option<bool>,
}

/// Platform config directory path: `<config_dir>/doctext/config.toml`.
pub fn config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("doctext").join("config.toml"))
}

/// Load config by cascading CWD `.doctext.toml` over platform config.
/// CWD values override platform values. Missing or unparsable files are
/// skipped with a warning.
pub fn load_config() -> ConfigFile {
    let platform = config_path().and_then(|p| load_lenient(&p));
    let cwd = load_lenient(Path::new(".doctext.toml"));

    match (platform, cwd) {
        (None, None) => ConfigFile::default(),
        (Some(p), None) => p,
        (None, Some(c)) => c,
        (Some(p), Some(c)) => merge(p, c),
    }
}

fn load_lenient(path: &Path) -> Option<ConfigFile> {
    if !path.exists() {
        return None;
    }
    match load_from_path(path) {
        Ok(config) => Some(config),
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "ignoring config file");
            None
        }
    }
}

/// Load a config from an explicit path. Unlike [`load_config`], a missing or
/// malformed file is an error.
pub fn load_from_path(path: &Path) -> Result<ConfigFile, CoreError> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| CoreError::Config(format!("cannot read {}: {}", path.display(), e)))?;
    toml::from_str(&content)
        .map_err(|e| CoreError::Config(format!("cannot parse {}: {}", path.display(), e)))
}

/// Merge two configs: `overlay` values take precedence over `base`.
pub fn merge(base: ConfigFile, overlay: ConfigFile) -> ConfigFile {
    let base_http = base.http.unwrap_or_default();
    let over_http = overlay.http.unwrap_or_default();
    let base_ext = base.extraction.unwrap_or_default();
    let over_ext = overlay.extraction.unwrap_or_default();
    let base_cb = base.callback.unwrap_or_default();
    let over_cb = overlay.callback.unwrap_or_default();

    ConfigFile {
        http: Some(HttpConfig {
            download_timeout_secs: over_http
                .download_timeout_secs
                .or(base_http.download_timeout_secs),
            callback_timeout_secs: over_http
                .callback_timeout_secs
                .or(base_http.callback_timeout_secs),
            user_agent: over_http.user_agent.or(base_http.user_agent),
            max_download_mb: over_http.max_download_mb.or(base_http.max_download_mb),
        }),
        extraction: Some(ExtractionConfig {
            antiword_path: over_ext.antiword_path.or(base_ext.antiword_path),
            pdftotext_path: over_ext.pdftotext_path.or(base_ext.pdftotext_path),
            pdf_fallback: over_ext.pdf_fallback.or(base_ext.pdf_fallback),
            converter_timeout_secs: over_ext
                .converter_timeout_secs
                .or(base_ext.converter_timeout_secs),
            text_cleaning: over_ext.text_cleaning.or(base_ext.text_cleaning),
            allow_empty_text: over_ext.allow_empty_text.or(base_ext.allow_empty_text),
        }),
        callback: Some(CallbackConfig {
            include_metadata: over_cb.include_metadata.or(base_cb.include_metadata),
        }),
    }
}

/// Apply file values on top of `config`.
pub fn apply_to_config(file: &ConfigFile, config: &mut Config) {
    if let Some(http) = &file.http {
        if let Some(v) = http.download_timeout_secs {
            config.download_timeout_secs = v;
        }
        if let Some(v) = http.callback_timeout_secs {
            config.callback_timeout_secs = v;
        }
        if let Some(v) = &http.user_agent {
            config.user_agent = v.clone();
        }
        if let Some(v) = http.max_download_mb {
            config.max_download_mb = v;
        }
    }
    if let Some(ext) = &file.extraction {
        if let Some(v) = &ext.antiword_path {
            config.antiword_path = v.clone();
        }
        if let Some(v) = &ext.pdftotext_path {
            config.pdftotext_path = v.clone();
        }
        if let Some(v) = ext.pdf_fallback {
            config.pdf_fallback = v;
        }
        if let Some(v) = ext.converter_timeout_secs {
            config.converter_timeout_secs = v;
        }
        if let Some(v) = ext.text_cleaning {
            config.text_cleaning = v;
        }
        if let Some(v) = ext.allow_empty_text {
            config.allow_empty_text = v;
        }
    }
    if let Some(cb) = &file.callback
        && let Some(v) = cb.include_metadata
    {
        config.include_metadata = v;
    }
}

/// Apply `DOCTEXT_*` environment variables on top of `config`.
///
/// `lookup` abstracts `std::env::var` so tests do not touch the process
/// environment.
pub fn apply_env(
    config: &mut Config,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<(), CoreError> {
    if let Some(v) = lookup("DOCTEXT_DOWNLOAD_TIMEOUT") {
        config.download_timeout_secs = parse_secs("DOCTEXT_DOWNLOAD_TIMEOUT", &v)?;
    }
    if let Some(v) = lookup("DOCTEXT_CALLBACK_TIMEOUT") {
        config.callback_timeout_secs = parse_secs("DOCTEXT_CALLBACK_TIMEOUT", &v)?;
    }
    if let Some(v) = lookup("DOCTEXT_ANTIWORD") {
        config.antiword_path = v;
    }
    if let Some(v) = lookup("DOCTEXT_PDFTOTEXT") {
        config.pdftotext_path = v;
    }
    if let Some(v) = lookup("DOCTEXT_TEXT_CLEANING") {
        config.text_cleaning = v
            .parse()
            .map_err(|e| CoreError::Config(format!("DOCTEXT_TEXT_CLEANING: {e}")))?;
    }
    Ok(())
}

fn parse_secs(name: &str, value: &str) -> Result<u64, CoreError> {
    value
        .trim()
        .parse()
        .map_err(|_| CoreError::Config(format!("{name} must be a number of seconds, got '{value}'")))
}

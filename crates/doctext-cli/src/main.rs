use std::io::{IsTerminal, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;

use clap::{Parser, Subcommand, ValueEnum};
use indicatif::{HumanBytes, ProgressBar, ProgressStyle};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use doctext_core::{Config, config_file};
use doctext_ingest::{
    DocumentFormat, ExtractOptions, JobEvent, JobRequest, Pipeline, extract_text,
};

mod output;

use output::ColorMode;

/// Document text extractor - download a PDF/DOCX/DOC, extract its text and post it to a webhook
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Download a document, extract its text and notify the callback URL
    Process {
        /// URL of the document to download (.pdf, .docx or .doc)
        #[arg(env = "DOCTEXT_FILE_URL")]
        file_url: String,

        /// Identifier echoed back in the callback payload
        #[arg(env = "DOCTEXT_APPLICATION_ID")]
        application_id: String,

        /// Webhook that receives the result
        #[arg(env = "DOCTEXT_CALLBACK_URL")]
        callback_url: String,

        /// Bearer token for the callback request
        #[arg(env = "DOCTEXT_AUTH_TOKEN", hide_env_values = true)]
        auth_token: Option<String>,

        /// Config file to use instead of the default cascade
        #[arg(long)]
        config: Option<PathBuf>,

        /// Download timeout in seconds
        #[arg(long)]
        download_timeout: Option<u64>,

        /// Callback timeout in seconds
        #[arg(long)]
        callback_timeout: Option<u64>,

        /// Add file_type, text_length and processed_at to the payload
        #[arg(long)]
        include_metadata: bool,

        /// Exit non-zero when the job failed, even if the failure was reported
        #[arg(long)]
        strict_exit: bool,

        /// Print the payload instead of posting it
        #[arg(long)]
        dry_run: bool,

        /// Hide the download progress bar
        #[arg(long)]
        no_progress: bool,

        /// Disable colored output
        #[arg(long)]
        no_color: bool,
    },

    /// Extract the text of a local file and print it
    Extract {
        /// Path to the document
        path: PathBuf,

        /// Override the format inferred from the file extension
        #[arg(long, value_enum)]
        format: Option<FormatArg>,

        /// Config file to use instead of the default cascade
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum FormatArg {
    Pdf,
    Docx,
    Doc,
}

impl From<FormatArg> for DocumentFormat {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Pdf => DocumentFormat::Pdf,
            FormatArg::Docx => DocumentFormat::Docx,
            FormatArg::Doc => DocumentFormat::Doc,
        }
    }
}

/// Flags of `process` that override resolved configuration values.
#[derive(Debug, Default)]
struct ConfigOverrides {
    download_timeout: Option<u64>,
    callback_timeout: Option<u64>,
    include_metadata: bool,
}

impl ConfigOverrides {
    fn apply(&self, config: &mut Config) {
        if let Some(secs) = self.download_timeout {
            config.download_timeout_secs = secs;
        }
        if let Some(secs) = self.callback_timeout {
            config.callback_timeout_secs = secs;
        }
        if self.include_metadata {
            config.include_metadata = true;
        }
    }
}

struct ProcessOptions {
    strict_exit: bool,
    dry_run: bool,
    no_progress: bool,
    color: ColorMode,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let no_color = matches!(cli.command, Command::Process { no_color: true, .. });
    init_tracing(no_color);

    let result = match cli.command {
        Command::Process {
            file_url,
            application_id,
            callback_url,
            auth_token,
            config,
            download_timeout,
            callback_timeout,
            include_metadata,
            strict_exit,
            dry_run,
            no_progress,
            no_color,
        } => {
            let overrides = ConfigOverrides {
                download_timeout,
                callback_timeout,
                include_metadata,
            };
            let options = ProcessOptions {
                strict_exit,
                dry_run,
                no_progress,
                color: ColorMode(!no_color && std::io::stdout().is_terminal()),
            };
            process(
                &file_url,
                application_id,
                &callback_url,
                auth_token,
                config.as_deref(),
                &overrides,
                options,
            )
            .await
        }
        Command::Extract {
            path,
            format,
            config,
        } => extract(&path, format, config.as_deref()).await,
    };

    match result {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

/// Log to stderr so stdout stays reserved for extracted text and payloads.
fn init_tracing(no_color: bool) {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "doctext=info".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_ansi(!no_color && std::io::stderr().is_terminal()),
        )
        .init();
}

/// Resolve configuration: config file, then `DOCTEXT_*` env vars, then flags.
fn resolve_config(
    config_path: Option<&Path>,
    overrides: &ConfigOverrides,
) -> anyhow::Result<Config> {
    let file = match config_path {
        Some(path) => config_file::load_from_path(path)?,
        None => config_file::load_config(),
    };

    let mut config = Config::default();
    config_file::apply_to_config(&file, &mut config);
    config_file::apply_env(&mut config, |key| std::env::var(key).ok())?;
    overrides.apply(&mut config);
    config.validate()?;
    Ok(config)
}

async fn process(
    file_url: &str,
    application_id: String,
    callback_url: &str,
    auth_token: Option<String>,
    config_path: Option<&Path>,
    overrides: &ConfigOverrides,
    options: ProcessOptions,
) -> anyhow::Result<ExitCode> {
    let auth_token = auth_token
        .filter(|t| !t.is_empty())
        .ok_or_else(|| anyhow::anyhow!("missing AUTH_TOKEN (argument or DOCTEXT_AUTH_TOKEN)"))?;
    let request = JobRequest::new(file_url, application_id, callback_url, auth_token)?;
    let config = resolve_config(config_path, overrides)?;
    tracing::debug!(?config, ?request, "resolved job");

    let pipeline = Pipeline::new(config)?;
    let bar = progress_bar(options.no_progress);
    let observer = progress_observer(&bar);

    let mut stdout = std::io::stdout();

    if options.dry_run {
        let report = pipeline.execute(&request, &observer).await;
        bar.finish_and_clear();
        output::print_dry_run(&mut std::io::stderr(), &request, options.color)?;
        writeln!(stdout, "{}", serde_json::to_string_pretty(&report.payload)?)?;
        return Ok(exit_code(report.succeeded(), options.strict_exit));
    }

    match pipeline.run(&request, &observer).await {
        Ok(report) => {
            output::print_job_summary(&mut stdout, &request, &report, options.color)?;
            Ok(exit_code(report.succeeded(), options.strict_exit))
        }
        Err(e) => {
            bar.finish_and_clear();
            output::print_notify_error(&mut std::io::stderr(), &e, options.color)?;
            Ok(ExitCode::FAILURE)
        }
    }
}

async fn extract(
    path: &Path,
    format: Option<FormatArg>,
    config_path: Option<&Path>,
) -> anyhow::Result<ExitCode> {
    if !path.exists() {
        anyhow::bail!("File not found: {}", path.display());
    }

    let format = match format {
        Some(arg) => DocumentFormat::from(arg),
        None => DocumentFormat::from_extension(
            &path
                .extension()
                .map(|e| e.to_string_lossy().to_string())
                .unwrap_or_default(),
        ),
    };
    if !format.is_supported() {
        anyhow::bail!(
            "Unsupported file format {} for {} (use --format pdf|docx|doc)",
            format,
            path.display()
        );
    }

    let config = resolve_config(config_path, &ConfigOverrides::default())?;
    let text = extract_text(path, &format, &ExtractOptions::from(&config)).await?;

    let mut stdout = std::io::stdout();
    writeln!(stdout, "{}", text)?;
    Ok(ExitCode::SUCCESS)
}

fn exit_code(succeeded: bool, strict_exit: bool) -> ExitCode {
    if fails_process(succeeded, strict_exit) {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

/// A reported job failure only fails the process under `--strict-exit`.
fn fails_process(succeeded: bool, strict_exit: bool) -> bool {
    !succeeded && strict_exit
}

fn progress_bar(hidden: bool) -> ProgressBar {
    if hidden {
        return ProgressBar::hidden();
    }
    let bar = ProgressBar::new(0);
    bar.set_style(spinner_style());
    bar.set_message("Downloading...");
    bar.enable_steady_tick(Duration::from_millis(120));
    bar
}

fn spinner_style() -> ProgressStyle {
    ProgressStyle::with_template("{spinner:.cyan} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
}

fn download_style() -> ProgressStyle {
    ProgressStyle::with_template(
        "{spinner:.cyan} {msg} [{bar:40.cyan/dim}] {bytes}/{total_bytes} ({bytes_per_sec}, eta {eta})",
    )
    .unwrap_or_else(|_| ProgressStyle::default_bar())
}

/// Translate pipeline events into progress bar updates.
fn progress_observer(bar: &ProgressBar) -> impl Fn(JobEvent) + '_ {
    let download_style = download_style();
    move |event| match event {
        JobEvent::Downloading {
            bytes_downloaded,
            total_bytes,
        } => {
            if let Some(total) = total_bytes
                && bar.length() != Some(total)
            {
                bar.set_length(total);
                bar.set_style(download_style.clone());
            }
            bar.set_position(bytes_downloaded);
        }
        JobEvent::Extracting { format, bytes } => {
            bar.set_style(spinner_style());
            bar.set_message(format!("Extracting {} text ({})", format, HumanBytes(bytes)));
        }
        JobEvent::Notifying { status } => {
            bar.set_message(format!("Sending {} result...", output::status_label(status)));
        }
        JobEvent::Done { .. } => bar.finish_and_clear(),
    }
}

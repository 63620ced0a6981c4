//! Trace replay entry point.
//!
//! Feeds a host event trace (one JSON notification per line) through a
//! [`Recorder`] writing to the configured session directory.
//!
//! ```bash
//! recorder trace.jsonl [recorder.ron]
//! RECORDER_CONFIG=recorder.ron recorder - < trace.jsonl
//! ```

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use recorder::{LogSink, Recorder, RecorderConfig};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if it exists (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let mut args = std::env::args().skip(1);
    let trace = args
        .next()
        .context("usage: recorder <trace.jsonl | -> [config.ron]")?;
    let config_path = args
        .next()
        .map(PathBuf::from)
        .or_else(|| std::env::var_os("RECORDER_CONFIG").map(PathBuf::from));

    let config = load_config(config_path.as_deref())?;
    let session_id = config.resolve_session_id();
    let _guard = setup_logging(&session_id)?;

    let mut recorder = Recorder::with_file_sink(RecorderConfig {
        session_id: Some(session_id),
        ..config
    })?;
    tracing::info!(
        "Recording session {} into {}",
        recorder.session_id(),
        recorder.sink().session_dir().display()
    );

    if trace == "-" {
        replay(&mut recorder, BufReader::new(tokio::io::stdin())).await?;
    } else {
        let file = tokio::fs::File::open(&trace)
            .await
            .with_context(|| format!("failed to open trace {trace}"))?;
        replay(&mut recorder, BufReader::new(file)).await?;
    }

    let report = recorder.end_session()?;
    if !report.is_ok() {
        tracing::warn!(
            "{} categories could not be flushed at session end",
            report.failures.len()
        );
    }
    Ok(())
}

/// Configuration file (when given) with environment overrides on top.
fn load_config(path: Option<&Path>) -> Result<RecorderConfig> {
    let config = match path {
        Some(path) => RecorderConfig::load_from_file(path)
            .with_context(|| format!("failed to load {}", path.display()))?,
        None => RecorderConfig::default(),
    };
    let config = config.with_env_overrides();
    config.validate()?;
    Ok(config)
}

/// Feeds every line of `reader` to the recorder. Malformed lines are logged
/// and skipped.
async fn replay<S, R>(recorder: &mut Recorder<S>, reader: R) -> Result<()>
where
    S: LogSink,
    R: AsyncBufRead + Unpin,
{
    let mut lines = reader.lines();
    let mut line_no = 0usize;
    while let Some(line) = lines.next_line().await? {
        line_no += 1;
        if line.trim().is_empty() {
            continue;
        }
        if let Err(e) = recorder.handle_raw(&line) {
            tracing::warn!("Skipping trace line {}: {}", line_no, e);
        }
        for command in recorder.drain_commands() {
            tracing::debug!("Host command (no host attached): {:?}", command);
        }
    }
    tracing::info!("Replayed {} trace lines", line_no);
    Ok(())
}

/// Setup logging to both stderr and file.
///
/// The returned guard must stay alive for the file writer to flush.
fn setup_logging(session_id: &str) -> Result<WorkerGuard> {
    let session_log_dir = log_directory().join(session_id);
    std::fs::create_dir_all(&session_log_dir)?;

    let file_appender = tracing_appender::rolling::never(&session_log_dir, "recorder.log");
    let (non_blocking_file, guard) = tracing_appender::non_blocking(file_appender);

    let env_filter = tracing_subscriber::EnvFilter::from_default_env()
        .add_directive(tracing::Level::INFO.into());

    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(non_blocking_file)
        .with_ansi(false);
    let stderr_layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .with(stderr_layer)
        .init();

    tracing::info!("Logging initialized: session={}", session_id);
    tracing::info!("Log file: {}/recorder.log", session_log_dir.display());

    Ok(guard)
}

/// Platform cache directory for recorder logs.
fn log_directory() -> PathBuf {
    directories::ProjectDirs::from("", "", "session-recorder")
        .map(|dirs| dirs.cache_dir().join("logs"))
        .unwrap_or_else(|| std::env::temp_dir().join("session-recorder").join("logs"))
}

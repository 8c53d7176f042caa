//! Logging setup: human-readable events on stderr plus an optional JSONL file.
//!
//! The file target is chosen, first match wins, from `LICITACOES_LOG_PATH`
//! (explicit file), `LICITACOES_LOG_DIR`, the config `log_dir`, and finally
//! the platform data directory. File logging is best effort: if the
//! directory cannot be created the CLI still runs with stderr logging only.

use std::path::{Path, PathBuf};

use tracing::level_filters::LevelFilter;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, fmt};

const LOG_PATH_ENV: &str = "LICITACOES_LOG_PATH";
const LOG_DIR_ENV: &str = "LICITACOES_LOG_DIR";
const LOG_FILE_NAME: &str = "licitacoes.jsonl";

/// Where the JSONL log goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObservabilityConfig {
    /// Log file, or `None` to log to stderr only.
    pub log_file: Option<PathBuf>,
}

impl ObservabilityConfig {
    /// Read the environment, falling back to the config `log_dir`.
    pub fn from_env_with_overrides(config_log_dir: Option<PathBuf>) -> Self {
        let default_dir = licitacoes_core::config::user_data_local_dir()
            .map(|dir| dir.join("logs").into_std_path_buf());
        Self::resolve(
            std::env::var_os(LOG_PATH_ENV).map(PathBuf::from),
            std::env::var_os(LOG_DIR_ENV).map(PathBuf::from),
            config_log_dir,
            default_dir,
        )
    }

    fn resolve(
        env_path: Option<PathBuf>,
        env_dir: Option<PathBuf>,
        config_dir: Option<PathBuf>,
        default_dir: Option<PathBuf>,
    ) -> Self {
        let log_file = env_path
            .filter(|p| !p.as_os_str().is_empty())
            .or_else(|| {
                env_dir
                    .filter(|p| !p.as_os_str().is_empty())
                    .or(config_dir)
                    .or(default_dir)
                    .map(|dir| dir.join(LOG_FILE_NAME))
            });
        Self { log_file }
    }
}

/// Keeps the background log writer alive; drop it last.
pub struct ObservabilityGuard {
    _file: Option<WorkerGuard>,
}

/// Filter for the JSONL file. `RUST_LOG` wins over flags and config.
pub fn env_filter(quiet: bool, verbose: u8, config_level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(quiet, verbose, config_level)))
}

fn default_directive(quiet: bool, verbose: u8, config_level: &str) -> String {
    if quiet {
        return "error".to_string();
    }
    match verbose {
        0 => config_level.to_string(),
        1 => "debug".to_string(),
        _ => "trace".to_string(),
    }
}

/// Level for stderr, kept quieter than the file so command output stays readable.
pub const fn stderr_level(quiet: bool, verbose: u8) -> LevelFilter {
    if quiet {
        return LevelFilter::ERROR;
    }
    match verbose {
        0 => LevelFilter::WARN,
        1 => LevelFilter::INFO,
        2 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    }
}

/// Install the global subscriber.
pub fn init_observability(
    config: &ObservabilityConfig,
    file_filter: EnvFilter,
    stderr: LevelFilter,
) -> anyhow::Result<ObservabilityGuard> {
    let stderr_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_filter(stderr);

    let (file_layer, guard) = match config.log_file.as_deref().and_then(open_log_file) {
        Some((writer, guard)) => {
            let layer = fmt::layer()
                .json()
                .with_writer(writer)
                .with_ansi(false)
                .with_filter(file_filter);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(file_layer)
        .try_init()?;

    Ok(ObservabilityGuard { _file: guard })
}

fn open_log_file(
    path: &Path,
) -> Option<(tracing_appender::non_blocking::NonBlocking, WorkerGuard)> {
    let dir = path.parent().filter(|d| !d.as_os_str().is_empty())?;
    let file_name = path.file_name()?;
    if let Err(err) = std::fs::create_dir_all(dir) {
        eprintln!("warning: file logging disabled, cannot create {}: {err}", dir.display());
        return None;
    }
    let appender = tracing_appender::rolling::never(dir, file_name);
    Some(tracing_appender::non_blocking(appender))
}

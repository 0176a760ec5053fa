use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use chrono::{DateTime, FixedOffset, Local};
use tracing::{error, info};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

utils::configurable_constants! {

    /// The log destination. If unset or empty, logs go to the console.
    ///
    /// If this path exists as a directory or the path ends with a /, a new timestamped log file is
    /// created in that directory; otherwise the path is used as the log file itself.
    ref LOG_DEST : Option<String> = None;

    /// The format the logs are printed in. If "json", then logs are dumped as json blobs; otherwise they
    /// are treated as text.  By default logging to files is done in json and console logging is done with text.
    ref LOG_FORMAT : Option<String> = None;

    /// The base name for a log file when logging to a directory.  The timestamp and pid are appended to this name.
    ref LOG_PREFIX : String = "drive_sync".to_string();
}

/// Default log level for the library to use. Override using the `RUST_LOG` env variable.
const DEFAULT_LOG_LEVEL_FILE: &str = "info";
const DEFAULT_LOG_LEVEL_CONSOLE: &str = "warn";

#[derive(Clone, Debug, PartialEq)]
pub enum LoggingMode {
    Directory(PathBuf),
    File(PathBuf),
    Console,
}

#[derive(Clone, Debug, PartialEq)]
pub struct LoggingConfig {
    pub logging_mode: LoggingMode,
    pub use_json: bool,
    pub version: String,
}

impl LoggingConfig {
    /// Reads the logging destination and format from the environment.
    pub fn from_env(version: String) -> LoggingConfig {
        Self::from_settings(version, LOG_DEST.as_deref(), LOG_FORMAT.as_deref())
    }

    pub fn from_settings(version: String, log_dest: Option<&str>, log_format: Option<&str>) -> LoggingConfig {
        let logging_mode = match log_dest {
            None | Some("") => LoggingMode::Console,
            Some(dest) => {
                let path = PathBuf::from(dest);
                if dest.ends_with('/') || dest.ends_with('\\') || path.is_dir() {
                    LoggingMode::Directory(path)
                } else {
                    LoggingMode::File(path)
                }
            },
        };

        let use_json = match log_format {
            Some(format) => format.trim().eq_ignore_ascii_case("json"),
            None => logging_mode != LoggingMode::Console,
        };

        Self {
            logging_mode,
            use_json,
            version,
        }
    }
}

/// The main entry point to set up logging.  Should only be called once.
pub fn init_logging(cfg: LoggingConfig) {
    let maybe_log_file = match &cfg.logging_mode {
        LoggingMode::Directory(log_dir) => Some(log_file_in_dir(log_dir)),
        LoggingMode::File(path) => Some(path.clone()),
        LoggingMode::Console => None,
    };

    if let Some(log_file) = maybe_log_file {
        // Attempt logging to a file, but fallback to console logging on error.
        if let Err(e) = init_logging_to_file(&log_file, cfg.use_json) {
            init_logging_to_console(&cfg);
            error!("Error logging to file {log_file:?} ({e}); falling back to console logging.");
        }
    } else {
        init_logging_to_console(&cfg);
    }

    info!("drive_sync {}", &cfg.version);
}

fn env_filter(default_level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_level))
        .unwrap_or_default()
}

fn init_logging_to_console(cfg: &LoggingConfig) {
    let fmt_layer_base = tracing_subscriber::fmt::layer()
        .with_line_number(true)
        .with_file(true)
        .with_target(false);
    let fmt_filter = env_filter(DEFAULT_LOG_LEVEL_CONSOLE);

    if cfg.use_json {
        let _ = tracing_subscriber::registry()
            .with(fmt_layer_base.json().with_filter(fmt_filter))
            .try_init();
    } else {
        let _ = tracing_subscriber::registry()
            .with(fmt_layer_base.pretty().with_filter(fmt_filter))
            .try_init();
    }
}

fn init_logging_to_file(path: &Path, use_json: bool) -> Result<(), std::io::Error> {
    use tracing_appender::{non_blocking, rolling};

    let Some(file_name) = path.file_name() else {
        return Err(std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            format!("log path {path:?} has no file name"),
        ));
    };

    let log_directory = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => {
            std::fs::create_dir_all(parent)?;
            parent
        },
        _ => Path::new("."),
    };

    // Make sure the log location is writeable so we error early here and dump to stderr on failure.
    std::fs::OpenOptions::new().create(true).append(true).open(path)?;

    let file_appender = rolling::never(log_directory, file_name);
    let (writer, guard) = non_blocking(file_appender);

    // The guard flushes on drop, so it has to live as long as the process.
    static FILE_GUARD: OnceLock<tracing_appender::non_blocking::WorkerGuard> = OnceLock::new();
    let _ = FILE_GUARD.set(guard);

    let fmt_layer_base = tracing_subscriber::fmt::layer()
        .with_line_number(true)
        .with_file(true)
        .with_target(false)
        .with_ansi(false)
        .with_writer(writer);
    let fmt_filter = env_filter(DEFAULT_LOG_LEVEL_FILE);

    if use_json {
        let _ = tracing_subscriber::registry()
            .with(fmt_layer_base.json().with_filter(fmt_filter))
            .try_init();
    } else {
        let _ = tracing_subscriber::registry()
            .with(fmt_layer_base.with_filter(fmt_filter))
            .try_init();
    }

    Ok(())
}

/// Build `<prefix>_<YYYYMMDD>T<HHMMSS><mmm><+/-HHMM>_<pid>.log` in `dir`.
pub fn log_file_in_dir(dir: impl AsRef<Path>) -> PathBuf {
    let now_local: DateTime<Local> = Local::now();
    let now_fixed: DateTime<FixedOffset> = now_local.with_timezone(now_local.offset());

    // ISO 8601 basic, filename-safe (no colons): 20250915T083210123-0700
    let ts = now_fixed.format("%Y%m%dT%H%M%S%3f%z");

    let pid = std::process::id();
    dir.as_ref().join(format!("{}_{}_{}.log", LOG_PREFIX.as_str(), ts, pid))
}

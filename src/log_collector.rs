//! Decoupled logging pipeline for driver runs.
//!
//! Every record emitted through the `log` facade is sent down an unbounded
//! crossbeam channel to a background thread that persists it to disk.
//!
//! ```text
//! log::info!() / child output
//!     |
//! [LogCollector] (non-blocking)
//!     | (crossbeam channel)
//!     v
//! [DiskPersister thread]
//!     |
//! logs/full/<ts>_full.log      every line
//! logs/parsed/<ts>_parsed.log  milestones (target "parsed")
//! ```
//!
//! Records at or above the echo level are also printed to stderr so the
//! driver stays readable in a terminal.

use chrono::Local;
use crossbeam_channel::{unbounded, Sender};
use log::{Level, LevelFilter, Log, Metadata, Record};
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Environment variable overriding the log directory.
pub const LOG_DIR_ENV: &str = "APP_BUILDER_LOG_DIR";

/// Internal log line or special marker
enum LogMessage {
    Line(LogLine),
    /// Flush marker with channel sender to signal completion
    Flush(std::sync::mpsc::Sender<()>),
}

/// Get the logs path: `$APP_BUILDER_LOG_DIR`, else `./logs`
pub fn get_global_logs_path() -> Result<PathBuf, String> {
    if let Some(dir) = std::env::var_os(LOG_DIR_ENV) {
        return Ok(PathBuf::from(dir));
    }
    let cwd = std::env::current_dir()
        .map_err(|e| format!("Failed to get current working directory: {}", e))?;
    Ok(cwd.join("logs"))
}

/// A log line with metadata
#[derive(Clone, Debug)]
pub struct LogLine {
    pub message: String,
    /// Log type: "full" or "parsed"
    pub log_type: String,
    pub timestamp: String,
}

impl LogLine {
    pub fn new(message: String) -> Self {
        LogLine {
            message,
            log_type: "full".to_string(),
            timestamp: Local::now().format("%H:%M:%S%.3f").to_string(),
        }
    }

    pub fn parsed(message: String) -> Self {
        LogLine {
            message,
            log_type: "parsed".to_string(),
            timestamp: Local::now().format("%H:%M:%S%.3f").to_string(),
        }
    }
}

/// Unified logger persisting every line to disk on a background thread.
#[derive(Clone)]
pub struct LogCollector {
    tx: Sender<LogMessage>,
    full_log_path: PathBuf,
    parsed_log_path: PathBuf,
    echo_level: LevelFilter,
}

impl LogCollector {
    /// Create the log directories and files for this run and start the persister thread.
    pub fn new(log_dir: PathBuf, echo_level: LevelFilter) -> Result<Self, String> {
        let full_log_dir = log_dir.join("full");
        let parsed_log_dir = log_dir.join("parsed");
        std::fs::create_dir_all(&full_log_dir)
            .map_err(|e| format!("Failed to create full log dir: {}", e))?;
        std::fs::create_dir_all(&parsed_log_dir)
            .map_err(|e| format!("Failed to create parsed log dir: {}", e))?;

        let full_log_path = create_session_log(&full_log_dir, "full")?;
        let parsed_log_path = create_session_log(&parsed_log_dir, "parsed")?;

        let mut full_file = open_append(&full_log_path)?;
        let mut parsed_file = open_append(&parsed_log_path)?;

        let (tx, rx) = unbounded::<LogMessage>();

        // OS thread rather than a tokio task: logs must drain even while the
        // runtime is blocked on a child process.
        std::thread::spawn(move || {
            while let Ok(msg) = rx.recv() {
                match msg {
                    LogMessage::Line(log_line) => {
                        let formatted = format!("[{}] {}\n", log_line.timestamp, log_line.message);
                        let _ = full_file.write_all(formatted.as_bytes());
                        if log_line.log_type == "parsed" {
                            let _ = parsed_file.write_all(formatted.as_bytes());
                        }
                    }
                    LogMessage::Flush(done) => {
                        let _ = full_file.flush();
                        let _ = parsed_file.flush();
                        let _ = done.send(());
                    }
                }
            }
            let _ = full_file.flush();
            let _ = parsed_file.flush();
        });

        Ok(LogCollector {
            tx,
            full_log_path,
            parsed_log_path,
            echo_level,
        })
    }

    /// Path of this run's full log file
    pub fn full_log_path(&self) -> &Path {
        &self.full_log_path
    }

    /// Path of this run's milestone log file
    pub fn parsed_log_path(&self) -> &Path {
        &self.parsed_log_path
    }

    /// Send a log line (non-blocking)
    pub fn log_line(&self, line: LogLine) {
        let _ = self.tx.send(LogMessage::Line(line));
    }

    /// Send a simple string log
    pub fn log_str(&self, message: impl Into<String>) {
        self.log_line(LogLine::new(message.into()));
    }

    /// Send a parsed (high-level) log
    pub fn log_parsed(&self, message: impl Into<String>) {
        self.log_line(LogLine::parsed(message.into()));
    }

    /// Wait for all pending logs to be written to disk.
    ///
    /// Sends a flush marker down the channel and waits for the background
    /// thread to reach it, so every line sent before this call is on disk.
    pub async fn wait_for_empty(&self) -> Result<(), String> {
        let (tx, rx) = std::sync::mpsc::channel::<()>();

        self.tx
            .send(LogMessage::Flush(tx))
            .map_err(|e| format!("Failed to send flush marker: {}", e))?;

        tokio::task::spawn_blocking(move || rx.recv())
            .await
            .map_err(|e| format!("Flush task failed: {}", e))?
            .map_err(|e| format!("Flush signal interrupted: {}", e))?;

        Ok(())
    }

    /// Install as the global `log` backend.
    pub fn install(&self) -> Result<(), log::SetLoggerError> {
        log::set_boxed_logger(Box::new(self.clone()))?;
        log::set_max_level(LevelFilter::Trace);
        Ok(())
    }
}

impl Log for LogCollector {
    fn enabled(&self, _metadata: &Metadata) -> bool {
        true
    }

    fn log(&self, record: &Record) {
        let message = format!("[{}] {}", record.level(), record.args());

        if record.level() <= self.echo_level {
            match record.level() {
                Level::Error | Level::Warn => eprintln!("[app_builder] {}", message),
                _ => eprintln!("[app_builder] {}", record.args()),
            }
        }

        // Target-aware routing: "parsed" marks high-level milestones
        if record.target() == "parsed" {
            self.log_parsed(message);
        } else {
            self.log_str(message);
        }
    }

    fn flush(&self) {}
}

fn create_session_log(log_dir: &Path, log_type: &str) -> Result<PathBuf, String> {
    let timestamp = Local::now().format("%Y%m%d_%H%M%S");
    let log_path = log_dir.join(format!("{}_{}.log", timestamp, log_type));
    File::create(&log_path).map_err(|e| format!("Failed to create log file: {}", e))?;
    Ok(log_path)
}

fn open_append(path: &Path) -> Result<File, String> {
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| format!("Failed to open log file {}: {}", path.display(), e))
}

//! Invocation log file.
//!
//! Appends one timestamped line per entry to a configured file:
//!
//! ```text
//! [2026-10-19T08:15:02.114Z] [PID:4711] [INFO] Run command: pickles2-get-version
//! ```
//!
//! `info`, `warn` and `error` are written whenever a log path is set. Only
//! `debug` is additionally gated on debug mode. Every operation reports
//! success as a `bool` and never fails past this module; write errors go to
//! the tracing diagnostic stream instead.

use arc_swap::ArcSwapOption;
use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use serde_json::Value;
use std::fmt;
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Severity tag written after the PID.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Debug,
    Info,
    Warning,
    Error,
}

impl LogLevel {
    pub fn tag(self) -> &'static str {
        match self {
            LogLevel::Debug => "[DEBUG]",
            LogLevel::Info => "[INFO]",
            LogLevel::Warning => "[WARNING]",
            LogLevel::Error => "[ERROR]",
        }
    }
}

/// Options used to build a [`FileLogger`].
#[derive(Debug, Clone, Default)]
pub struct LoggerOptions {
    /// Destination file. `None` turns every call into a no-op.
    pub log_path: Option<PathBuf>,
    /// Whether `debug` lines are written.
    pub debug_mode: bool,
}

/// Append-only file logger shared by all tool invocations.
///
/// Configuration can be changed through `&self`; changes apply to the next
/// call.
pub struct FileLogger {
    log_path: ArcSwapOption<PathBuf>,
    debug_mode: AtomicBool,
}

impl FileLogger {
    pub fn new(options: LoggerOptions) -> Self {
        Self {
            log_path: ArcSwapOption::from(options.log_path.map(Arc::new)),
            debug_mode: AtomicBool::new(options.debug_mode),
        }
    }

    /// A logger that never writes.
    pub fn disabled() -> Self {
        Self::new(LoggerOptions::default())
    }

    /// Write one line. Strings are written verbatim, other values as compact
    /// JSON, and values that refuse to serialize in their `Debug` form.
    pub fn log<T: Serialize + fmt::Debug + ?Sized>(&self, message: &T) -> bool {
        self.write_line(&render(message))
    }

    pub fn error<T: Serialize + fmt::Debug + ?Sized>(&self, value: &T) -> bool {
        self.write_leveled(LogLevel::Error, &render(value))
    }

    /// Log a structured error with its cause chain.
    pub fn exception(&self, err: &anyhow::Error) -> bool {
        self.write_leveled(LogLevel::Error, &format_error(err))
    }

    pub fn warn<T: Serialize + fmt::Debug + ?Sized>(&self, message: &T) -> bool {
        self.write_leveled(LogLevel::Warning, &render(message))
    }

    pub fn info<T: Serialize + fmt::Debug + ?Sized>(&self, message: &T) -> bool {
        self.write_leveled(LogLevel::Info, &render(message))
    }

    pub fn debug<T: Serialize + fmt::Debug + ?Sized>(&self, message: &T) -> bool {
        if !self.is_debug_mode() {
            return false;
        }
        self.write_leveled(LogLevel::Debug, &render(message))
    }

    pub fn set_debug_mode(&self, enabled: bool) {
        self.debug_mode.store(enabled, Ordering::Relaxed);
    }

    pub fn set_log_path(&self, path: Option<PathBuf>) {
        self.log_path.store(path.map(Arc::new));
    }

    pub fn is_debug_mode(&self) -> bool {
        self.debug_mode.load(Ordering::Relaxed)
    }

    pub fn log_path(&self) -> Option<PathBuf> {
        self.log_path.load_full().map(|p| p.as_ref().clone())
    }

    fn write_leveled(&self, level: LogLevel, message: &str) -> bool {
        self.write_line(&format!("{} {}", level.tag(), message))
    }

    fn write_line(&self, message: &str) -> bool {
        let Some(path) = self.log_path.load_full() else {
            return false;
        };

        let timestamp = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);
        let line = format!("[{}] [PID:{}] {}\n", timestamp, std::process::id(), message);

        match append(&path, &line) {
            Ok(()) => true,
            Err(e) => {
                tracing::error!(path = %path.display(), error = %e, "Failed to write log");
                false
            }
        }
    }
}

impl Default for FileLogger {
    fn default() -> Self {
        Self::disabled()
    }
}

fn append(path: &Path, line: &str) -> io::Result<()> {
    if let Some(dir) = path.parent()
        && !dir.as_os_str().is_empty()
        && !dir.exists()
    {
        fs::create_dir_all(dir)?;
    }

    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    file.write_all(line.as_bytes())
}

/// Render a message the way it appears in the log file.
pub fn render<T: Serialize + fmt::Debug + ?Sized>(message: &T) -> String {
    match serde_json::to_value(message) {
        Ok(Value::String(s)) => s,
        Ok(other) => other.to_string(),
        Err(_) => format!("{:?}", message),
    }
}

fn format_error(err: &anyhow::Error) -> String {
    let mut out = format!("Error: {}", err);
    for cause in err.chain().skip(1) {
        out.push_str(&format!("\nCaused by: {}", cause));
    }
    out
}

//! File logger
//!
//! Plain-text log lines `[timestamp] [LEVEL] [context] message` appended to
//! the per-user log file once [`init`] has run. Before that, only errors are
//! echoed to stderr so library users and tests stay quiet.

use chrono::Local;
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Mutex;

use crate::core::app_dirs;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
pub enum LogLevel {
    Debug = 0,
    Info = 1,
    Error = 2,
}

impl LogLevel {
    fn as_str(self) -> &'static str {
        match self {
            LogLevel::Debug => "DEBUG",
            LogLevel::Info => "INFO",
            LogLevel::Error => "ERROR",
        }
    }
}

static LOG_LEVEL: AtomicU8 = AtomicU8::new(LogLevel::Info as u8);

struct Sink {
    path: PathBuf,
    file: File,
}

static SINK: Mutex<Option<Sink>> = Mutex::new(None);

/// Open (append) the log file at `path`, or the default location
pub fn init(path: Option<PathBuf>) -> std::io::Result<()> {
    let path = path.unwrap_or_else(app_dirs::get_log_file_path);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let file = OpenOptions::new().create(true).append(true).open(&path)?;
    if let Ok(mut sink) = SINK.lock() {
        *sink = Some(Sink { path, file });
    }
    Ok(())
}

pub fn set_log_level(level: LogLevel) {
    LOG_LEVEL.store(level as u8, Ordering::Relaxed);
}

pub fn is_debug_enabled() -> bool {
    LOG_LEVEL.load(Ordering::Relaxed) == LogLevel::Debug as u8
}

/// Path of the active log file, if the file sink is open
pub fn get_log_path() -> Option<PathBuf> {
    SINK.lock().ok()?.as_ref().map(|s| s.path.clone())
}

/// Last `count` lines of the active log file
pub fn get_recent_logs(count: usize) -> Vec<String> {
    let Some(path) = get_log_path() else {
        return Vec::new();
    };
    let content = fs::read_to_string(path).unwrap_or_default();
    let lines: Vec<&str> = content.lines().collect();
    let start = lines.len().saturating_sub(count);
    lines[start..].iter().map(|l| l.to_string()).collect()
}

fn write_line(level: LogLevel, message: &str, context: Option<&str>) {
    if (level as u8) < LOG_LEVEL.load(Ordering::Relaxed) {
        return;
    }

    let line = match context {
        Some(ctx) => format!(
            "[{}] [{}] [{}] {}",
            Local::now().format("%Y-%m-%d %H:%M:%S%.3f"),
            level.as_str(),
            ctx,
            message
        ),
        None => format!(
            "[{}] [{}] {}",
            Local::now().format("%Y-%m-%d %H:%M:%S%.3f"),
            level.as_str(),
            message
        ),
    };

    let Ok(mut guard) = SINK.lock() else {
        return;
    };
    match guard.as_mut() {
        Some(sink) => {
            let _ = writeln!(sink.file, "{}", line);
        }
        None if level == LogLevel::Error => eprintln!("{}", line),
        None => {}
    }
}

pub fn log_debug(message: &str, context: Option<&str>) {
    write_line(LogLevel::Debug, message, context);
}

pub fn log_info(message: &str, context: Option<&str>) {
    write_line(LogLevel::Info, message, context);
}

pub fn log_error(message: &str, context: Option<&str>) {
    write_line(LogLevel::Error, message, context);
}

/// Debug log that skips formatting entirely unless debug logging is on
#[macro_export]
macro_rules! log_debug {
    ($msg:expr, $ctx:expr) => {
        if $crate::logger::is_debug_enabled() {
            $crate::logger::log_debug($msg, Some($ctx));
        }
    };
}

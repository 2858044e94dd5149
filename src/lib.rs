//! # buflog
//! Thread-safe buffered logger writing leveled, timestamped lines to a
//! single append-only file.
//!
//! Messages are formatted on the calling thread and handed to a dedicated
//! writer thread over an unbounded channel, so logging never blocks on disk
//! I/O. The writer accumulates lines in a buffer and flushes it when the
//! buffer grows past a byte threshold, when enough messages have piled up
//! since the last flush, or when a flush interval elapses, whichever comes
//! first. Dropping the logger waits for everything already enqueued to
//! reach the file.
//!
//! ## Usage
//! ```toml
//! // Cargo.toml
//! ...
//! [dependencies]
//! buflog = "0.1.0"
//! ```
//!
//! ```rust
//! use buflog::logger_config;
//!
//! let logger = logger_config().open("/tmp/buflog_doc_basic.log");
//! logger.info("Hello, world!");
//! drop(logger); // joins the writer thread, flushing everything
//! assert!(
//!     std::fs::read_to_string("/tmp/buflog_doc_basic.log")
//!         .unwrap()
//!         .ends_with("Hello, world!\n")
//! );
//! ```
//!
//! ## Multi-threaded logging
//! Any number of threads can share one logger; the writer thread is the
//! only place the file is touched.
//! ```rust
//! use std::sync::Arc;
//!
//! use buflog::{LogLevel, logger_config};
//!
//! let logger = Arc::new(
//!     logger_config()
//!         .with_min_level(LogLevel::Info)
//!         .open("/tmp/buflog_doc_threads.log"),
//! );
//! let handles: Vec<_> = (0..5)
//!     .map(|i| {
//!         let logger = Arc::clone(&logger);
//!         std::thread::spawn(move || logger.warning(&format!("Hello from thread {i}!")))
//!     })
//!     .collect();
//! for h in handles {
//!     h.join().unwrap();
//! }
//! ```
//!
//! ## Through the `log` facade
//! The logger can be installed globally so the `log` crate macros feed it.
//! ```rust
//! use buflog::logger_config;
//!
//! let _guard = logger_config()
//!     .open("/tmp/buflog_doc_facade.log")
//!     .init_global()
//!     .unwrap();
//! log::info!("Hello, world!");
//! // guard ensures logs are flushed when dropped
//! ```

mod config;
mod level;
mod log_writer;
mod utils;

pub use config::{BUFLOG_CONFIG, BufLogConfig};
pub use level::LogLevel;
pub use log_writer::{LogFile, LogWriter};
pub use utils::{LogSender, LoggerGuard, format_line, format_timestamp, spawn_log_thread};

use std::{io, path::Path, sync::Arc};

use chrono::Local;
use log::{Log, Metadata, Record};

/// Asynchronous file-backed log sink.
///
/// Owns the channel to its writer thread. Dropping the logger signals the
/// thread to stop, waits for it to drain and flush everything already
/// enqueued, and closes the file.
pub struct Logger {
    sender: Option<Arc<LogSender>>,
    min_level: LogLevel,
}

impl Logger {
    /// Formats `message` with the current wall-clock time and queues it for
    /// the writer thread.
    ///
    /// No-op when the sink failed to open or when `level` is below the
    /// configured minimum; never blocks on disk I/O and is safe to call
    /// from any number of threads.
    pub fn log(&self, level: LogLevel, message: &str) {
        let Some(sender) = &self.sender else {
            return;
        };
        if level < self.min_level {
            return;
        }
        sender.send(format_line(level, Local::now(), message)).ok();
    }

    pub fn debug(&self, message: &str) {
        self.log(LogLevel::Debug, message);
    }

    pub fn info(&self, message: &str) {
        self.log(LogLevel::Info, message);
    }

    pub fn warning(&self, message: &str) {
        self.log(LogLevel::Warning, message);
    }

    pub fn error(&self, message: &str) {
        self.log(LogLevel::Error, message);
    }

    /// Whether the output file opened successfully at construction.
    pub fn is_valid(&self) -> bool {
        self.sender.is_some()
    }

    /// Installs this logger as the `log` crate's global logger, so the
    /// `log::info!` family of macros writes to the file sink.
    ///
    /// Returns a guard that flushes and shuts the logger down when dropped.
    pub fn init_global(self) -> Result<LoggerGuard, log::SetLoggerError> {
        let guard = LoggerGuard::new(self.sender.iter().cloned().collect());
        log::set_max_level(self.min_level.to_level_filter());
        log::set_boxed_logger(Box::new(self))?;
        Ok(guard)
    }
}

impl Log for Logger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        self.is_valid() && LogLevel::from(metadata.level()) >= self.min_level
    }

    fn log(&self, record: &Record) {
        self.log(record.level().into(), &record.args().to_string());
    }

    fn flush(&self) {}
}

/// Builder for configuring and opening a [`Logger`].
pub struct ConfigBuilder {
    clear_file: bool,
    min_level: LogLevel,
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self {
            clear_file: true,
            min_level: LogLevel::Debug,
        }
    }
}

impl ConfigBuilder {
    /// Keeps existing file content, appending new lines after it.
    pub fn append(self) -> Self {
        Self {
            clear_file: false,
            ..self
        }
    }

    /// Dynamically set whether existing file content is truncated on open.
    pub fn with_clear_file(self, yes: bool) -> Self {
        Self {
            clear_file: yes,
            ..self
        }
    }

    /// Drops messages below `level` before they are formatted.
    pub fn with_min_level(self, level: LogLevel) -> Self {
        Self {
            min_level: level,
            ..self
        }
    }

    /// Opens the log file and spawns the writer thread.
    pub fn try_open<P: AsRef<Path>>(self, path: P) -> Result<Logger, io::Error> {
        let writer = LogFile::new(path, self.clear_file)?;
        Ok(Logger {
            sender: Some(Arc::new(spawn_log_thread(writer))),
            min_level: self.min_level,
        })
    }

    /// Like [`try_open`](Self::try_open), but never fails: when the file
    /// cannot be opened the error is reported to stderr and the returned
    /// logger silently ignores every call.
    pub fn open<P: AsRef<Path>>(self, path: P) -> Logger {
        let min_level = self.min_level;
        match self.try_open(path.as_ref()) {
            Ok(logger) => logger,
            Err(err) => {
                eprintln!(
                    "buflog: failed to open log file {}: {err}",
                    path.as_ref().display()
                );
                Logger {
                    sender: None,
                    min_level,
                }
            }
        }
    }
}

/// Returns a default ConfigBuilder for configuring the logger.
pub fn logger_config() -> ConfigBuilder {
    ConfigBuilder::default()
}

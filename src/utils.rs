use std::{
    ops::Deref,
    sync::{
        Arc, Mutex,
        atomic::{AtomicBool, Ordering},
    },
    thread::JoinHandle,
    time::{Duration, Instant},
};

use chrono::{DateTime, Local};
use crossbeam_channel::{RecvTimeoutError, Sender, unbounded};

use crate::{config::BUFLOG_CONFIG, level::LogLevel, log_writer::LogWriter};

/// Guard that ensures the logger is properly shut down when dropped.
/// Hold this guard for the lifetime of your logging session.
pub struct LoggerGuard {
    senders: Vec<Arc<LogSender>>,
}

impl LoggerGuard {
    pub fn new(senders: Vec<Arc<LogSender>>) -> Self {
        Self { senders }
    }
}

impl Drop for LoggerGuard {
    fn drop(&mut self) {
        for sender in &self.senders {
            sender.shutdown();
        }
    }
}

/// Producer-side handle to the writer thread: the line channel, the running
/// flag, and the joinable thread handle.
pub struct LogSender {
    sender: Sender<String>,
    running: Arc<AtomicBool>,
    handler: Arc<Mutex<Option<JoinHandle<()>>>>,
}

impl Deref for LogSender {
    type Target = Sender<String>;
    fn deref(&self) -> &Self::Target {
        &self.sender
    }
}

impl Drop for LogSender {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl LogSender {
    pub fn new(sender: Sender<String>, running: Arc<AtomicBool>, handler: JoinHandle<()>) -> Self {
        Self {
            sender,
            running,
            handler: Arc::new(Mutex::new(Some(handler))),
        }
    }

    /// Stops the writer thread and waits for it to drain and flush every
    /// line enqueued so far. Idempotent.
    pub fn shutdown(&self) {
        let mut guard = self.handler.lock().unwrap();
        if let Some(handle) = guard.take() {
            self.running.store(false, Ordering::Release);
            // The empty line is the reserved wake-up; formatted lines are
            // always newline-terminated, so never empty.
            let _ = self.sender.send(String::new());
            handle.join().expect("unable to join log writer thread");
        }
    }
}

/// Formats an instant as `YYYY-MM-DD HH:MM:SS.mmm` in local time.
pub fn format_timestamp(instant: DateTime<Local>) -> String {
    instant.format("%Y-%m-%d %H:%M:%S%.3f").to_string()
}

/// Renders one newline-terminated log line: `[timestamp] [LEVEL] text`.
pub fn format_line(level: LogLevel, instant: DateTime<Local>, message: &str) -> String {
    format!("[{}] [{level}] {message}\n", format_timestamp(instant))
}

/// The size/count/time flush triggers, folded into one flush decision.
struct FlushPolicy {
    max_bytes: usize,
    budget: u64,
    interval: Duration,
    remaining: u64,
    last_flush: Instant,
}

impl FlushPolicy {
    fn from_config() -> Self {
        let config = &*BUFLOG_CONFIG;
        Self {
            max_bytes: config.FLUSH_MAX_BYTES as usize,
            budget: config.FLUSH_MESSAGE_BUDGET,
            interval: Duration::from_millis(config.FLUSH_INTERVAL_MS),
            remaining: config.FLUSH_MESSAGE_BUDGET,
            last_flush: Instant::now(),
        }
    }

    /// Accounts one dequeued line against the message budget.
    fn on_line(&mut self) {
        self.remaining = self.remaining.saturating_sub(1);
    }

    /// Flushes when any trigger fires: buffered bytes at the size
    /// threshold, message budget exhausted, or flush interval elapsed.
    fn maybe_flush<W: LogWriter>(&mut self, writer: &mut W) {
        if writer.pending() == 0 {
            return;
        }
        if writer.pending() < self.max_bytes
            && self.remaining > 0
            && self.last_flush.elapsed() < self.interval
        {
            return;
        }
        flush_now(writer);
        self.remaining = self.budget;
        self.last_flush = Instant::now();
    }
}

fn flush_now<W: LogWriter>(writer: &mut W) {
    if let Err(err) = writer.flush() {
        eprintln!("buflog: failed to write log buffer: {err}");
    }
}

/// Spawns the writer thread and returns its producer-side handle.
///
/// The thread drains the channel into the writer's buffer and flushes under
/// the hybrid size/count/time policy while the running flag is set. Once
/// the flag drops (or every sender is gone) it drains whatever is still
/// queued, issues one final flush and exits, closing the writer with it.
pub fn spawn_log_thread<W: LogWriter + Send + 'static>(mut writer: W) -> LogSender {
    let (sender, receiver) = unbounded::<String>();
    let running = Arc::new(AtomicBool::new(true));
    let thread_running = Arc::clone(&running);
    let handler = std::thread::spawn(move || {
        let idle_wait = Duration::from_millis(BUFLOG_CONFIG.IDLE_WAIT_MS);
        let mut policy = FlushPolicy::from_config();
        while thread_running.load(Ordering::Acquire) {
            while let Ok(line) = receiver.try_recv() {
                if line.is_empty() {
                    continue;
                }
                writer.append(&line);
                policy.on_line();
                policy.maybe_flush(&mut writer);
            }
            policy.maybe_flush(&mut writer);
            match receiver.recv_timeout(idle_wait) {
                Ok(line) => {
                    if !line.is_empty() {
                        writer.append(&line);
                        policy.on_line();
                        policy.maybe_flush(&mut writer);
                    }
                }
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => break,
            }
        }
        // Terminal drain: collect everything still queued, one last flush.
        while let Ok(line) = receiver.try_recv() {
            if !line.is_empty() {
                writer.append(&line);
            }
        }
        flush_now(&mut writer);
    });
    LogSender::new(sender, running, handler)
}

#[test]
fn test_format_timestamp_shape() {
    let ts = format_timestamp(Local::now());
    let pattern = regex::Regex::new(r"^\d{4}-\d{2}-\d{2} \d{2}:\d{2}:\d{2}\.\d{3}$").unwrap();
    assert!(pattern.is_match(&ts), "unexpected timestamp: {ts}");
}

#[test]
fn test_format_line() {
    let instant = chrono::NaiveDate::from_ymd_opt(2024, 3, 7)
        .unwrap()
        .and_hms_milli_opt(13, 5, 9, 42)
        .unwrap()
        .and_local_timezone(Local)
        .unwrap();
    assert_eq!(
        format_line(LogLevel::Warning, instant, "disk pressure"),
        "[2024-03-07 13:05:09.042] [WARNING] disk pressure\n"
    );
}

#[cfg(test)]
mod tests {
    use std::io;

    use super::*;

    #[derive(Default)]
    struct MockWriter {
        buf: String,
        flushed: Vec<String>,
        fail_next: bool,
    }

    impl LogWriter for MockWriter {
        fn append(&mut self, line: &str) {
            self.buf.push_str(line);
        }

        fn pending(&self) -> usize {
            self.buf.len()
        }

        fn flush(&mut self) -> io::Result<()> {
            let pending = std::mem::take(&mut self.buf);
            if self.fail_next {
                self.fail_next = false;
                return Err(io::Error::other("mock write failure"));
            }
            self.flushed.push(pending);
            Ok(())
        }
    }

    fn make_policy(max_bytes: usize, budget: u64, interval_ms: u64) -> FlushPolicy {
        FlushPolicy {
            max_bytes,
            budget,
            interval: Duration::from_millis(interval_ms),
            remaining: budget,
            last_flush: Instant::now(),
        }
    }

    #[test]
    fn empty_buffer_never_flushes() {
        let mut writer = MockWriter::default();
        let mut policy = make_policy(1, 1, 0);
        policy.maybe_flush(&mut writer);
        assert!(writer.flushed.is_empty());
    }

    #[test]
    fn size_threshold_triggers_flush() {
        let mut writer = MockWriter::default();
        let mut policy = make_policy(8, 100, 60_000);
        writer.append("0123456789\n");
        policy.on_line();
        policy.maybe_flush(&mut writer);
        assert_eq!(writer.flushed, vec!["0123456789\n".to_string()]);
        assert_eq!(policy.remaining, 100);
    }

    #[test]
    fn message_budget_triggers_flush_independent_of_time() {
        let mut writer = MockWriter::default();
        let mut policy = make_policy(usize::MAX, 3, 60_000);
        for i in 0..3 {
            writer.append(&format!("line {i}\n"));
            policy.on_line();
            policy.maybe_flush(&mut writer);
        }
        assert_eq!(writer.flushed, vec!["line 0\nline 1\nline 2\n".to_string()]);
    }

    #[test]
    fn flush_interval_triggers_flush() {
        let mut writer = MockWriter::default();
        let mut policy = make_policy(usize::MAX, 100, 100);
        writer.append("lonely line\n");
        policy.on_line();
        policy.maybe_flush(&mut writer);
        assert!(writer.flushed.is_empty());
        policy.last_flush = Instant::now() - Duration::from_millis(500);
        policy.maybe_flush(&mut writer);
        assert_eq!(writer.flushed, vec!["lonely line\n".to_string()]);
    }

    #[test]
    fn below_every_threshold_keeps_buffering() {
        let mut writer = MockWriter::default();
        let mut policy = make_policy(1024, 10, 60_000);
        writer.append("short\n");
        policy.on_line();
        policy.maybe_flush(&mut writer);
        assert!(writer.flushed.is_empty());
        assert_eq!(writer.pending(), 6);
    }

    #[test]
    fn failed_flush_abandons_buffer_and_resets_policy() {
        let mut writer = MockWriter {
            fail_next: true,
            ..Default::default()
        };
        let mut policy = make_policy(usize::MAX, 1, 60_000);
        writer.append("doomed line\n");
        policy.on_line();
        policy.maybe_flush(&mut writer);
        assert!(writer.flushed.is_empty());
        assert_eq!(writer.pending(), 0);

        writer.append("next line\n");
        policy.on_line();
        policy.maybe_flush(&mut writer);
        assert_eq!(writer.flushed, vec!["next line\n".to_string()]);
    }

    struct SharedWriter {
        buf: String,
        flushed: Arc<Mutex<String>>,
    }

    impl LogWriter for SharedWriter {
        fn append(&mut self, line: &str) {
            self.buf.push_str(line);
        }

        fn pending(&self) -> usize {
            self.buf.len()
        }

        fn flush(&mut self) -> io::Result<()> {
            let pending = std::mem::take(&mut self.buf);
            self.flushed.lock().unwrap().push_str(&pending);
            Ok(())
        }
    }

    #[test]
    fn writer_thread_drains_everything_on_shutdown() {
        let flushed = Arc::new(Mutex::new(String::new()));
        let writer = SharedWriter {
            buf: String::new(),
            flushed: Arc::clone(&flushed),
        };
        let sender = spawn_log_thread(writer);
        for i in 0..50 {
            sender.send(format!("line {i}\n")).unwrap();
        }
        sender.shutdown();
        let flushed = flushed.lock().unwrap();
        let expected: String = (0..50).map(|i| format!("line {i}\n")).collect();
        assert_eq!(*flushed, expected);
    }
}

use std::{
    fs::File,
    io::{self, Write},
    path::Path,
};

/// Sink abstraction used by the writer thread: lines accumulate in an
/// in-memory buffer until [`flush`](LogWriter::flush) pushes them out.
pub trait LogWriter {
    /// Appends one newline-terminated line to the pending buffer.
    fn append(&mut self, line: &str);
    /// Number of buffered bytes not yet flushed.
    fn pending(&self) -> usize;
    /// Writes the pending buffer out. The buffer is cleared even when the
    /// write fails, so a failed flush abandons exactly that content.
    fn flush(&mut self) -> io::Result<()>;
}

/// File-backed [`LogWriter`]. The file handle lives on the writer thread
/// for the logger's whole lifetime and closes when the thread exits.
pub struct LogFile {
    file: File,
    buf: String,
}

impl LogFile {
    /// Opens the log file, creating it if needed, truncating existing
    /// content when `truncate` is set and appending after it otherwise.
    pub fn new<P: AsRef<Path>>(path: P, truncate: bool) -> Result<Self, io::Error> {
        let mut options = File::options();
        options.create(true).write(true);
        if truncate {
            options.truncate(true);
        } else {
            options.append(true);
        }
        let file = options.open(path)?;
        Ok(Self {
            file,
            buf: String::new(),
        })
    }
}

impl LogWriter for LogFile {
    fn append(&mut self, line: &str) {
        self.buf.push_str(line);
    }

    fn pending(&self) -> usize {
        self.buf.len()
    }

    fn flush(&mut self) -> io::Result<()> {
        if self.buf.is_empty() {
            return Ok(());
        }
        let pending = std::mem::take(&mut self.buf);
        self.file.write_all(pending.as_bytes())?;
        self.file.flush()
    }
}

#[test]
fn test_log_file_buffers_until_flush() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("buffered.log");
    let mut log_file = LogFile::new(&path, true).unwrap();
    log_file.append("Hello, world!\n");
    log_file.append("rust is awesome !\n");
    assert_eq!(log_file.pending(), 32);
    assert_eq!(std::fs::read_to_string(&path).unwrap(), "");
    log_file.flush().unwrap();
    assert_eq!(log_file.pending(), 0);
    assert_eq!(
        std::fs::read_to_string(&path).unwrap(),
        "Hello, world!\nrust is awesome !\n"
    );
}

#[test]
fn test_log_file_empty_flush_writes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("empty.log");
    let mut log_file = LogFile::new(&path, true).unwrap();
    log_file.flush().unwrap();
    assert_eq!(std::fs::read_to_string(&path).unwrap(), "");
}

#[test]
fn test_log_file_truncate_vs_append() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("mode.log");
    std::fs::write(&path, "old content\n").unwrap();

    let mut appending = LogFile::new(&path, false).unwrap();
    appending.append("new line\n");
    appending.flush().unwrap();
    assert_eq!(
        std::fs::read_to_string(&path).unwrap(),
        "old content\nnew line\n"
    );

    let mut truncating = LogFile::new(&path, true).unwrap();
    truncating.append("fresh start\n");
    truncating.flush().unwrap();
    assert_eq!(std::fs::read_to_string(&path).unwrap(), "fresh start\n");
}

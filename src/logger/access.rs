//! Access log destination
//!
//! A shared append-only file. Every append writes one complete,
//! newline-terminated line under the lock, so concurrent requests never
//! interleave partial lines.

use std::fs::File;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tokio::task::JoinHandle;

use super::writer::open_log_file;

#[derive(Clone)]
pub struct AccessLog {
    path: Arc<PathBuf>,
    // Opened on first append, dropped after a failed write so the next append reopens
    file: Arc<Mutex<Option<File>>>,
}

impl AccessLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Arc::new(path.into()),
            file: Arc::new(Mutex::new(None)),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append a line without waiting for the write
    ///
    /// Errors are reported on the diagnostic error log and never returned.
    /// The handle is only useful to callers that want to wait for the write.
    pub fn append(&self, line: String) -> JoinHandle<()> {
        let log = self.clone();
        tokio::task::spawn_blocking(move || {
            if let Err(e) = log.write_line(&line) {
                super::log_error(&format!("Error writing to log file: {e}"));
            }
        })
    }

    /// Synchronously append one line
    pub fn write_line(&self, line: &str) -> io::Result<()> {
        let mut buf = String::with_capacity(line.len() + 1);
        buf.push_str(line.trim_end_matches('\n'));
        buf.push('\n');

        let mut guard = self
            .file
            .lock()
            .map_err(|_| io::Error::other("access log lock poisoned"))?;

        if guard.is_none() {
            *guard = Some(open_log_file(self.path.as_path())?);
        }

        let result = match guard.as_mut() {
            Some(file) => file.write_all(buf.as_bytes()),
            None => Ok(()),
        };
        if result.is_err() {
            *guard = None;
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_appends_keep_lines_whole() {
        let dir = tempfile::tempdir().unwrap();
        let log = AccessLog::new(dir.path().join("logs/server_logs.txt"));

        let handles: Vec<_> = (0..64)
            .map(|i| log.append(format!("line-{i:02} {}", "x".repeat(512))))
            .collect();
        for handle in handles {
            handle.await.unwrap();
        }

        let content = std::fs::read_to_string(log.path()).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 64);
        for line in lines {
            assert!(line.starts_with("line-"));
            assert_eq!(line.len(), "line-00 ".len() + 512);
        }
        assert!(content.ends_with('\n'));
    }

    #[test]
    fn test_existing_newline_not_doubled() {
        let dir = tempfile::tempdir().unwrap();
        let log = AccessLog::new(dir.path().join("access.txt"));
        log.write_line("first\n").unwrap();
        log.write_line("second").unwrap();
        let content = std::fs::read_to_string(log.path()).unwrap();
        assert_eq!(content, "first\nsecond\n");
    }

    #[tokio::test]
    async fn test_write_failure_is_swallowed() {
        let dir = tempfile::tempdir().unwrap();
        // A directory cannot be opened as a log file
        let log = AccessLog::new(dir.path());
        assert!(log.write_line("nope").is_err());
        log.append("still fine".to_string()).await.unwrap();
    }
}

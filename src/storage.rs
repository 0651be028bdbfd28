//! File storage for the task log
//!
//! The log is a plain-text file with one record per line. It is the whole
//! durable state: there is no index or snapshot next to it.

use std::fs::{self, File};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::lock::{lock_path_for, FileLock};
use crate::record::LogRecord;

/// One raw line of the log with its 1-based line number.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogLine {
    pub number: usize,
    pub text: String,
    utf8: bool,
}

impl LogLine {
    pub fn new(number: usize, text: impl Into<String>) -> Self {
        Self {
            number,
            text: text.into(),
            utf8: true,
        }
    }

    /// Bytes that are not UTF-8 keep a lossy `text` and fail to parse.
    fn from_bytes(number: usize, bytes: &[u8]) -> Self {
        match std::str::from_utf8(bytes) {
            Ok(text) => Self::new(number, text),
            Err(_) => Self {
                number,
                text: String::from_utf8_lossy(bytes).into_owned(),
                utf8: false,
            },
        }
    }

    pub fn parse(&self) -> Result<LogRecord> {
        if !self.utf8 {
            return Err(Error::MalformedRecord(format!(
                "line is not valid UTF-8: '{}'",
                self.text
            )));
        }
        LogRecord::parse(&self.text)
    }
}

/// Append-only task log on disk.
#[derive(Debug, Clone)]
pub struct TaskLog {
    path: PathBuf,
}

impl TaskLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn lock_path(&self) -> PathBuf {
        lock_path_for(&self.path)
    }

    /// Take the single-writer lock for this log.
    pub fn lock(&self, timeout_ms: u64) -> Result<FileLock> {
        FileLock::acquire(self.lock_path(), timeout_ms)
    }

    /// Read every non-blank line. A missing log reads as empty.
    pub fn read_lines(&self) -> Result<Vec<LogLine>> {
        if !self.path.exists() {
            tracing::debug!(log = %self.path.display(), "no task log yet");
            return Ok(Vec::new());
        }

        let content = fs::read(&self.path)?;
        let mut lines = Vec::new();

        for (idx, raw) in content.split(|byte| *byte == b'\n').enumerate() {
            let raw = raw.strip_suffix(b"\r").unwrap_or(raw);
            if raw.iter().all(u8::is_ascii_whitespace) {
                continue;
            }
            lines.push(LogLine::from_bytes(idx + 1, raw));
        }

        tracing::debug!(log = %self.path.display(), lines = lines.len(), "read task log");
        Ok(lines)
    }

    /// Append one record as a new line.
    pub fn append(&self, record: &LogRecord) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        let line = record.to_line();
        let mut file = fs::OpenOptions::new()
            .read(true)
            .create(true)
            .append(true)
            .open(&self.path)?;

        // A hand-edited log may lack its final newline.
        if needs_leading_newline(&mut file)? {
            writeln!(file)?;
        }
        writeln!(file, "{}", line)?;
        file.sync_all()?;

        tracing::debug!(log = %self.path.display(), record = %line, "appended record");
        Ok(())
    }
}

fn needs_leading_newline(file: &mut File) -> Result<bool> {
    if file.metadata()?.len() == 0 {
        return Ok(false);
    }
    let mut last = [0u8; 1];
    file.seek(SeekFrom::End(-1))?;
    file.read_exact(&mut last)?;
    Ok(last[0] != b'\n')
}

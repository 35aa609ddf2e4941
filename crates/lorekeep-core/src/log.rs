//! # Entry Log
//!
//! The append-only JSONL file behind process memory. This is the only
//! module that touches persistent storage.
//!
//! Format: one JSON object per line, `\n` terminated.
//!
//! ## Write Contract
//!
//! - Records are only ever appended; nothing is rewritten in place
//! - Each record goes out as a single `write_all` of `json + "\n"`
//! - Deletion is a new record with `deprecated = true`
//!
//! ## Lossy Read Contract
//!
//! A line that is not valid UTF-8, not valid JSON, not an entry object, or
//! has a blank `id` is skipped with a `warn` log and iteration continues.
//! One corrupt line never hides the rest of the log. Callers that need
//! strict reads must not rely on this module to fail for them.

use crate::query::EntryFilter;
use crate::{Entry, MemoryError, Timestamp};
use std::fs::{self, File, OpenOptions};
use std::io::{self, BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

// =============================================================================
// RECORD PARSING
// =============================================================================

/// Parse one raw log line into an entry.
///
/// `line` is the 1-based line number, used only for error reporting.
pub fn parse_record(raw: &[u8], line: usize) -> Result<Entry, MemoryError> {
    let entry: Entry =
        serde_json::from_slice(raw).map_err(|e| MemoryError::MalformedRecord {
            line,
            reason: e.to_string(),
        })?;
    if !entry.has_identifier() {
        return Err(MemoryError::MalformedRecord {
            line,
            reason: "missing 'id' field".to_string(),
        });
    }
    Ok(entry)
}

// =============================================================================
// ENTRY LOG
// =============================================================================

/// Handle to a JSONL process memory file.
///
/// Holds only the path; every operation opens the file for its own
/// duration, so a log handle is cheap and never keeps a descriptor open.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryLog {
    path: PathBuf,
}

impl EntryLog {
    /// Create a handle for the log at `path`. The file need not exist yet.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Location of the log file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// True if the log file exists.
    #[must_use]
    pub fn exists(&self) -> bool {
        self.path.is_file()
    }

    /// Append one record and return it as written.
    ///
    /// Stamps `timestamp_created` with the current time if absent.
    /// Fails with `MissingIdentifier` if the id is blank; nothing is
    /// written in that case.
    pub fn append(&self, mut entry: Entry) -> Result<Entry, MemoryError> {
        if !entry.has_identifier() {
            return Err(MemoryError::MissingIdentifier);
        }
        if entry.timestamp_created.is_none() {
            entry.timestamp_created = Some(Timestamp::now());
        }

        let mut line = serde_json::to_string(&entry)
            .map_err(|e| MemoryError::SerializationError(e.to_string()))?;
        line.push('\n');

        self.write_line(line.as_bytes()).map_err(|e| {
            MemoryError::IoError(format!(
                "Failed to append entry to '{}': {}",
                self.path.display(),
                e
            ))
        })?;

        tracing::debug!(id = %entry.id, deprecated = entry.deprecated, "appended entry");
        Ok(entry)
    }

    fn write_line(&self, bytes: &[u8]) -> io::Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        file.write_all(bytes)?;
        file.flush()
    }

    /// Stream raw records in append order.
    ///
    /// Every call opens the file afresh, so a stream can be restarted by
    /// calling this again. A missing file yields an empty stream.
    pub fn stream(&self) -> Result<EntryStream, MemoryError> {
        let reader = match File::open(&self.path) {
            Ok(file) => Some(BufReader::new(file)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => None,
            Err(e) => {
                return Err(MemoryError::IoError(format!(
                    "Failed to open '{}': {}",
                    self.path.display(),
                    e
                )));
            }
        };
        Ok(EntryStream {
            lines: reader.map(|r| r.split(b'\n')),
            line: 0,
            skipped: 0,
        })
    }
}

// =============================================================================
// ENTRY STREAM
// =============================================================================

/// Lazy, forward-only iterator over the raw records of a log.
///
/// Yields `Err(IoError)` only when the file itself cannot be read;
/// malformed lines are counted in [`EntryStream::skipped`] instead.
#[derive(Debug)]
pub struct EntryStream {
    lines: Option<io::Split<BufReader<File>>>,
    line: usize,
    skipped: usize,
}

impl EntryStream {
    /// Number of malformed lines skipped so far.
    #[must_use]
    pub fn skipped(&self) -> usize {
        self.skipped
    }

    /// Keep only records passing `filter`. Read errors pass through.
    pub fn matching(self, filter: EntryFilter) -> impl Iterator<Item = Result<Entry, MemoryError>> {
        self.filter(move |record| match record {
            Ok(entry) => filter.matches(entry),
            Err(_) => true,
        })
    }
}

impl Iterator for EntryStream {
    type Item = Result<Entry, MemoryError>;

    fn next(&mut self) -> Option<Self::Item> {
        let lines = self.lines.as_mut()?;
        loop {
            let raw = match lines.next()? {
                Ok(raw) => raw,
                Err(e) => return Some(Err(MemoryError::IoError(e.to_string()))),
            };
            self.line = self.line.saturating_add(1);

            let trimmed = raw.trim_ascii();
            if trimmed.is_empty() {
                continue;
            }

            match parse_record(trimmed, self.line) {
                Ok(entry) => return Some(Ok(entry)),
                Err(err) => {
                    self.skipped = self.skipped.saturating_add(1);
                    tracing::warn!(%err, "skipping malformed process memory record");
                }
            }
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================

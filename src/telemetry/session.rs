//! Per-session tail state and line framing

use super::watched::WatchedResource;
use anyhow::{Context, Result};
use std::fs::{self, File};
use std::io::{Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

/// Splits a byte stream into complete `\n`-terminated lines.
///
/// Bytes after the last newline are held back until a later chunk
/// completes them. Buffering raw bytes keeps a multi-byte character that
/// straddles two reads intact.
#[derive(Debug, Default)]
pub struct LineFramer {
    pending: Vec<u8>,
}

impl LineFramer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a chunk and return every line it completes, in order.
    ///
    /// Lines are decoded lossily, lose a trailing `\r`, and blank lines are skipped.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.pending.extend_from_slice(chunk);

        let Some(last_newline) = self.pending.iter().rposition(|b| *b == b'\n') else {
            return Vec::new();
        };
        let rest = self.pending.split_off(last_newline + 1);
        let complete = std::mem::replace(&mut self.pending, rest);

        complete
            .split(|b| *b == b'\n')
            .map(String::from_utf8_lossy)
            .map(|line| line.trim_end_matches('\r').to_string())
            .filter(|line| !line.trim().is_empty())
            .collect()
    }

    /// Bytes of the trailing incomplete line
    pub fn pending(&self) -> &[u8] {
        &self.pending
    }
}

/// One tailed session file
pub struct Session {
    pub id: String,
    pub path: PathBuf,
    offset: u64,
    framer: LineFramer,
    /// Per-file watch + poll pair
    pub(super) watch: WatchedResource,
    /// Short-lived poll waiting for the file to appear
    pub(super) creation: WatchedResource,
}

impl Session {
    pub fn new(id: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            id: id.into(),
            path: path.into(),
            offset: 0,
            framer: LineFramer::new(),
            watch: WatchedResource::new(),
            creation: WatchedResource::new(),
        }
    }

    /// Bytes consumed so far; never decreases
    pub fn offset(&self) -> u64 {
        self.offset
    }

    pub fn pending_bytes(&self) -> usize {
        self.framer.pending().len()
    }

    /// Read everything appended since the last call and return the completed lines.
    ///
    /// A file that is no larger than the offset (unchanged, or truncated)
    /// yields nothing and leaves the offset alone.
    pub fn read_new_lines(&mut self) -> Result<Vec<String>> {
        let len = fs::metadata(&self.path)
            .with_context(|| format!("Failed to stat {}", self.path.display()))?
            .len();
        if len <= self.offset {
            return Ok(Vec::new());
        }

        let chunk = read_range(&self.path, self.offset, len - self.offset)?;
        self.offset += chunk.len() as u64;
        Ok(self.framer.push(&chunk))
    }

    /// Close the file watcher, the poll timer and any pending creation poll
    pub fn close(&mut self) {
        self.watch.close();
        self.creation.close();
    }
}

/// Read up to `len` bytes starting at `offset`
fn read_range(path: &Path, offset: u64, len: u64) -> Result<Vec<u8>> {
    let mut file =
        File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
    file.seek(SeekFrom::Start(offset))?;

    let mut buf = Vec::with_capacity(usize::try_from(len).unwrap_or(0));
    file.take(len)
        .read_to_end(&mut buf)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    Ok(buf)
}

/// Session id for a telemetry file name: the name without its `.jsonl` extension
pub fn session_id_from_file_name(file_name: &str) -> Option<&str> {
    file_name
        .strip_suffix(".jsonl")
        .filter(|stem| !stem.is_empty())
}

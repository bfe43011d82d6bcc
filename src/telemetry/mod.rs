//! Session telemetry tailing
//!
//! Agents append one `<sessionId>.jsonl` file per session to a telemetry
//! directory. The [`SessionTailer`] discovers those files, follows each one
//! from its current offset and hands every complete line to the adapter
//! for the configured runtime.
//!
//! # Architecture
//!
//! ```text
//! ~/.pi/agent/pixel-agents/
//! ├── abc.jsonl   <- Session "abc" (watch + poll)
//! └── def.jsonl   <- Session "def" (watch + poll)
//!
//!  native notify ─┐
//!  poll timers  ──┼──▶ Trigger channel ──▶ SessionTailer ──▶ RecordAdapter ──▶ EventHandler
//!  creation poll ─┘      (one consumer)
//! ```
//!
//! All triggers are consumed by one loop, so handlers for a session never
//! run concurrently and session state needs no lock.

pub mod session;
pub mod tailer;
pub mod watched;

pub use session::{LineFramer, Session};
pub use tailer::SessionTailer;
pub use watched::WatchedResource;

use crate::data::RuntimeKind;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default directory-level and per-file poll period
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Default period of the file-creation check
pub const DEFAULT_CREATION_POLL_INTERVAL: Duration = Duration::from_millis(20);

/// How long a session waits for its file to appear
pub const DEFAULT_CREATION_TIMEOUT: Duration = Duration::from_secs(30);

/// Default telemetry directory
fn default_telemetry_dir() -> PathBuf {
    dirs::home_dir()
        .map(|h| h.join(".pi/agent/pixel-agents"))
        .unwrap_or_else(|| PathBuf::from("/tmp/.pi/agent/pixel-agents"))
}

/// Get the telemetry directory (respects $TELEMUX_TELEMETRY_DIR)
pub fn telemetry_dir() -> PathBuf {
    std::env::var("TELEMUX_TELEMETRY_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| default_telemetry_dir())
}

/// Work for the tailer loop, sent by timers and native watchers
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Trigger {
    /// Re-list the telemetry directory
    ScanDirectory,
    /// Native notification for paths inside the directory
    DirectoryChanged(Vec<PathBuf>),
    /// Read whatever was appended to a session file
    ReadSession(String),
    /// Check whether a session's file exists yet
    CheckCreated(String),
}

/// Tailer settings
#[derive(Debug, Clone)]
pub struct TailerConfig {
    pub dir: PathBuf,
    pub poll_interval: Duration,
    pub creation_poll_interval: Duration,
    pub creation_timeout: Duration,
    /// Runtime whose adapter interprets the records
    pub runtime: RuntimeKind,
}

impl TailerConfig {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            ..Self::default()
        }
    }

    pub fn with_runtime(mut self, runtime: RuntimeKind) -> Self {
        self.runtime = runtime;
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }
}

impl Default for TailerConfig {
    fn default() -> Self {
        Self {
            dir: telemetry_dir(),
            poll_interval: DEFAULT_POLL_INTERVAL,
            creation_poll_interval: DEFAULT_CREATION_POLL_INTERVAL,
            creation_timeout: DEFAULT_CREATION_TIMEOUT,
            runtime: RuntimeKind::Pi,
        }
    }
}

/// Whether a path names a session telemetry file
pub fn is_session_file(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .and_then(session::session_id_from_file_name)
        .is_some()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recognizes_session_files() {
        assert!(is_session_file(Path::new("/tmp/x/abc.jsonl")));
        assert!(!is_session_file(Path::new("/tmp/x/abc.json")));
        assert!(!is_session_file(Path::new("/tmp/x/")));
    }

    #[test]
    fn builder_overrides_defaults() {
        let config = TailerConfig::new("/data/telemetry")
            .with_runtime(RuntimeKind::Claude)
            .with_poll_interval(Duration::from_millis(5));
        assert_eq!(config.dir, PathBuf::from("/data/telemetry"));
        assert_eq!(config.runtime, RuntimeKind::Claude);
        assert_eq!(config.poll_interval, Duration::from_millis(5));
        assert_eq!(config.creation_timeout, DEFAULT_CREATION_TIMEOUT);
    }
}

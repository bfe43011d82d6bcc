//! Session tailer: discovery, routing and dispatch
//!
//! Directory discovery and per-file tailing each pair a native watcher
//! with an interval poll. The native side is best-effort; every trigger
//! funnels into one channel consumed by [`SessionTailer::step`] and friends.

use super::session::{session_id_from_file_name, Session};
use super::watched::WatchedResource;
use super::{is_session_file, TailerConfig, Trigger};
use crate::data::AgentId;
use crate::integrations::{adapter_for, RecordAdapter};
use crate::orchestrator::{EventHandler, RuntimeOrchestrator};
use anyhow::{Context, Result};
use notify::RecursiveMode;
use std::collections::{HashMap, HashSet};
use std::fs;
use std::future::Future;
use std::io::ErrorKind;
use std::path::PathBuf;
use std::time::Duration;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::time::{self, Instant};

/// Tails every session file in the telemetry directory
pub struct SessionTailer<H = RuntimeOrchestrator> {
    config: TailerConfig,
    adapter: Box<dyn RecordAdapter>,
    handler: H,
    /// Session id -> agent id, maintained by the caller
    routes: HashMap<String, AgentId>,
    sessions: HashMap<String, Session>,
    /// File names already handed to a session
    known_files: HashSet<String>,
    directory: WatchedResource,
    running: bool,
    tx: UnboundedSender<Trigger>,
    rx: UnboundedReceiver<Trigger>,
}

impl<H: EventHandler> SessionTailer<H> {
    /// Tailer using the adapter for `config.runtime`
    pub fn new(config: TailerConfig, handler: H) -> Self {
        let adapter = adapter_for(config.runtime);
        Self::with_adapter(config, adapter, handler)
    }

    pub fn with_adapter(config: TailerConfig, adapter: Box<dyn RecordAdapter>, handler: H) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            config,
            adapter,
            handler,
            routes: HashMap::new(),
            sessions: HashMap::new(),
            known_files: HashSet::new(),
            directory: WatchedResource::new(),
            running: false,
            tx,
            rx,
        }
    }

    pub fn config(&self) -> &TailerConfig {
        &self.config
    }

    pub fn handler(&self) -> &H {
        &self.handler
    }

    pub fn handler_mut(&mut self) -> &mut H {
        &mut self.handler
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Ids of sessions currently being tailed, sorted
    pub fn session_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.sessions.keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Bytes consumed so far for a tailed session
    pub fn session_offset(&self, session_id: &str) -> Option<u64> {
        self.sessions.get(session_id).map(Session::offset)
    }

    /// Agent a session's records are routed to
    pub fn agent_for(&self, session_id: &str) -> Option<AgentId> {
        self.routes.get(session_id).copied()
    }

    /// Ensure the directory exists, begin discovery and tail existing files.
    ///
    /// Must be called from within a tokio runtime. Calling it while
    /// already running does nothing.
    pub fn start(&mut self) {
        if self.running {
            return;
        }
        self.running = true;

        if let Err(e) = self.ensure_telemetry_dir() {
            tracing::warn!("{:#}", e);
        }
        self.start_directory_watching();
        self.scan_directory();
    }

    /// Close every watcher and timer and forget all session state.
    ///
    /// Routes registered by the caller are kept. Safe to call repeatedly.
    pub fn stop(&mut self) {
        self.directory.close();
        for session in self.sessions.values_mut() {
            session.close();
        }
        self.sessions.clear();
        self.known_files.clear();
        self.running = false;

        // Anything queued before the handles closed is stale now
        while self.rx.try_recv().is_ok() {}
    }

    /// Route records of `session_id` to `agent_id`
    pub fn register_session(&mut self, session_id: &str, agent_id: AgentId) {
        self.routes.insert(session_id.to_string(), agent_id);
        tracing::info!("Registered session {} -> agent {}", session_id, agent_id);
    }

    /// Drop the route and stop tailing the session. No-op for unknown sessions.
    ///
    /// The file stays known, so registering the same session id again does
    /// not resume tailing until the next `stop()` / `start()` cycle.
    pub fn unregister_session(&mut self, session_id: &str) {
        self.routes.remove(session_id);
        if let Some(mut session) = self.sessions.remove(session_id) {
            session.close();
            tracing::info!("Stopped tailing session {}", session_id);
        }
    }

    /// Wait for the next trigger and handle it.
    ///
    /// Returns false without waiting when the tailer is not running, so
    /// `while tailer.step().await {}` ends after `stop()`.
    pub async fn step(&mut self) -> bool {
        if !self.running {
            return false;
        }
        match self.rx.recv().await {
            Some(trigger) => {
                self.handle(trigger);
                true
            }
            None => false,
        }
    }

    /// Handle triggers as they arrive for `duration`
    pub async fn run_for(&mut self, duration: Duration) {
        let deadline = Instant::now() + duration;
        while let Ok(Some(trigger)) = time::timeout_at(deadline, self.rx.recv()).await {
            self.handle(trigger);
        }
    }

    /// Handle triggers until `shutdown` completes
    pub async fn run_until<F: Future>(&mut self, shutdown: F) {
        tokio::pin!(shutdown);
        loop {
            tokio::select! {
                _ = &mut shutdown => break,
                trigger = self.rx.recv() => match trigger {
                    Some(trigger) => self.handle(trigger),
                    None => break,
                },
            }
        }
    }

    /// Handle every trigger already queued without waiting. Returns how many ran.
    pub fn dispatch_pending(&mut self) -> usize {
        let mut handled = 0;
        while let Ok(trigger) = self.rx.try_recv() {
            self.handle(trigger);
            handled += 1;
        }
        handled
    }

    /// Run one trigger. Triggers after `stop()` or for removed sessions are discarded.
    pub fn handle(&mut self, trigger: Trigger) {
        if !self.running {
            return;
        }
        match trigger {
            Trigger::ScanDirectory => self.scan_directory(),
            Trigger::DirectoryChanged(paths) => self.on_directory_changed(paths),
            Trigger::ReadSession(id) => self.read_session(&id),
            Trigger::CheckCreated(id) => self.check_created(&id),
        }
    }

    fn ensure_telemetry_dir(&self) -> Result<()> {
        let dir = &self.config.dir;
        fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create telemetry dir {}", dir.display()))
    }

    fn start_directory_watching(&mut self) {
        let dir = self.config.dir.clone();

        let watched = self.directory.watch_native(
            &dir,
            RecursiveMode::NonRecursive,
            self.tx.clone(),
            |event| {
                let paths: Vec<PathBuf> = event
                    .paths
                    .into_iter()
                    .filter(|p| is_session_file(p))
                    .collect();
                (!paths.is_empty()).then_some(Trigger::DirectoryChanged(paths))
            },
        );
        if let Err(e) = watched {
            tracing::warn!("Native watch on telemetry dir failed, polling only: {:#}", e);
        }

        self.directory.poll_every(
            self.config.poll_interval,
            None,
            self.tx.clone(),
            Trigger::ScanDirectory,
        );
    }

    /// Start tailing any session file not seen before
    fn scan_directory(&mut self) {
        let entries = match fs::read_dir(&self.config.dir) {
            Ok(e) => e,
            Err(e) => {
                tracing::trace!("Cannot list {}: {}", self.config.dir.display(), e);
                return;
            }
        };

        let mut names: Vec<String> = entries
            .flatten()
            .filter_map(|entry| entry.file_name().into_string().ok())
            .filter(|name| session_id_from_file_name(name).is_some())
            .collect();
        names.sort();

        for name in names {
            self.discover(name);
        }
    }

    fn on_directory_changed(&mut self, paths: Vec<PathBuf>) {
        for path in paths {
            if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
                self.discover(name.to_string());
            }
        }
    }

    fn discover(&mut self, file_name: String) {
        if self.known_files.contains(&file_name) {
            return;
        }
        self.start_session(&file_name);
        self.known_files.insert(file_name);
    }

    /// Begin tailing a file, which may not exist yet
    fn start_session(&mut self, file_name: &str) {
        let Some(session_id) = session_id_from_file_name(file_name) else {
            return;
        };
        if self.sessions.contains_key(session_id) {
            return;
        }

        let path = self.config.dir.join(file_name);
        tracing::info!("Starting telemetry tail for session: {}", session_id);

        let mut session = Session::new(session_id, path);
        if let Err(e) = attach_file_watcher(&mut session, &self.tx) {
            tracing::debug!("Native watch failed for session {}: {:#}", session_id, e);
        }
        session.watch.poll_every(
            self.config.poll_interval,
            None,
            self.tx.clone(),
            Trigger::ReadSession(session_id.to_string()),
        );
        session.creation.poll_every(
            self.config.creation_poll_interval,
            Some(self.config.creation_timeout),
            self.tx.clone(),
            Trigger::CheckCreated(session_id.to_string()),
        );

        self.sessions.insert(session_id.to_string(), session);
    }

    /// Creation poll tick: once the file exists, stop checking and read it
    fn check_created(&mut self, session_id: &str) {
        let Some(session) = self.sessions.get_mut(session_id) else {
            return;
        };
        if !session.path.exists() {
            return;
        }

        session.creation.close();
        if !session.watch.is_watching_native() {
            if let Err(e) = attach_file_watcher(session, &self.tx) {
                tracing::debug!("Native watch failed for session {}: {:#}", session_id, e);
            }
        }
        self.read_session(session_id);
    }

    fn read_session(&mut self, session_id: &str) {
        let Some(session) = self.sessions.get_mut(session_id) else {
            tracing::trace!("Discarding read for removed session {}", session_id);
            return;
        };

        let lines = match session.read_new_lines() {
            Ok(lines) => lines,
            Err(e) => {
                if is_not_found(&e) {
                    tracing::trace!("Session {} has no file yet", session_id);
                } else {
                    tracing::warn!("Read error for session {}: {:#}", session_id, e);
                }
                return;
            }
        };

        for line in lines {
            self.process_line(session_id, &line);
        }
    }

    /// Parse one complete line and route the record to its agent
    fn process_line(&mut self, session_id: &str, line: &str) {
        let record: serde_json::Value = match serde_json::from_str(line) {
            Ok(r) => r,
            Err(e) => {
                tracing::warn!("Failed to parse telemetry line in session {}: {}", session_id, e);
                return;
            }
        };

        let Some(agent_id) = self.routes.get(session_id).copied() else {
            tracing::trace!("No agent registered for session {}, dropping record", session_id);
            return;
        };

        for event in self.adapter.process_record(agent_id, &record) {
            self.handler.handle_event(event);
        }
    }
}

fn attach_file_watcher(session: &mut Session, tx: &UnboundedSender<Trigger>) -> Result<()> {
    let trigger = Trigger::ReadSession(session.id.clone());
    let path = session.path.clone();
    session
        .watch
        .watch_native(&path, RecursiveMode::NonRecursive, tx.clone(), move |_| {
            Some(trigger.clone())
        })
}

fn is_not_found(err: &anyhow::Error) -> bool {
    err.chain()
        .filter_map(|cause| cause.downcast_ref::<std::io::Error>())
        .any(|io| io.kind() == ErrorKind::NotFound)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::RuntimeEvent;
    use crate::orchestrator::RuntimeMode;
    use tempfile::TempDir;

    #[derive(Default)]
    struct Collect(Vec<RuntimeEvent>);

    impl EventHandler for Collect {
        fn handle_event(&mut self, event: RuntimeEvent) {
            self.0.push(event);
        }
    }

    fn collecting_tailer(dir: &TempDir) -> SessionTailer<Collect> {
        SessionTailer::new(TailerConfig::new(dir.path()), Collect::default())
    }

    #[test]
    fn unregister_unknown_session_is_noop() {
        let dir = TempDir::new().unwrap();
        let mut tailer = collecting_tailer(&dir);
        tailer.unregister_session("never-started");
        assert!(tailer.session_ids().is_empty());
    }

    #[test]
    fn triggers_before_start_are_discarded() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("a.jsonl"), "").unwrap();
        let mut tailer = collecting_tailer(&dir);
        tailer.handle(Trigger::ScanDirectory);
        assert!(tailer.session_ids().is_empty());
    }

    #[test]
    fn lines_without_route_are_dropped() {
        let dir = TempDir::new().unwrap();
        let mut tailer = collecting_tailer(&dir);
        tailer.process_line("abc", r#"{"type":"agent_start","timestamp":1}"#);
        assert!(tailer.handler().0.is_empty());

        tailer.register_session("abc", 9);
        tailer.process_line("abc", "not json");
        tailer.process_line("abc", r#"{"type":"agent_start","timestamp":1}"#);
        assert_eq!(tailer.handler().0.len(), 1);
        assert_eq!(tailer.handler().0[0].agent_id, 9);
    }

    #[tokio::test]
    async fn directory_change_starts_session_for_missing_file() {
        let dir = TempDir::new().unwrap();
        let mut tailer = SessionTailer::new(
            TailerConfig::new(dir.path()),
            RuntimeOrchestrator::new(RuntimeMode::PiDefault),
        );
        tailer.start();
        tailer.handle(Trigger::DirectoryChanged(vec![dir.path().join("late.jsonl")]));

        assert_eq!(tailer.session_ids(), vec!["late".to_string()]);
        assert_eq!(tailer.session_offset("late"), Some(0));
        tailer.stop();
    }

    #[tokio::test]
    async fn step_returns_false_when_not_running() {
        let dir = TempDir::new().unwrap();
        let mut tailer = collecting_tailer(&dir);
        assert!(!tailer.step().await);

        tailer.start();
        tailer.stop();
        let stepped = time::timeout(Duration::from_millis(300), tailer.step()).await;
        assert_eq!(stepped.ok(), Some(false));
    }

    #[test]
    fn not_found_is_detected_through_context() {
        let err = anyhow::Error::from(std::io::Error::from(ErrorKind::NotFound)).context("stat");
        assert!(is_not_found(&err));
        assert!(!is_not_found(&anyhow::anyhow!("other")));
    }
}

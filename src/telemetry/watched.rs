//! Native watch + interval poll pair
//!
//! Native notifications are best-effort and only reduce latency; the poll
//! is what correctness rests on. Both feed [`Trigger`]s into the tailer's
//! channel, so whatever fires, the work runs on the tailer's loop.

use super::Trigger;
use anyhow::{Context, Result};
use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::Path;
use std::time::Duration;
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};

/// Shortest poll period accepted; tokio intervals reject zero
const MIN_POLL_INTERVAL: Duration = Duration::from_millis(1);

/// A watched file or directory: optional native watcher plus optional poll timer
#[derive(Default)]
pub struct WatchedResource {
    watcher: Option<RecommendedWatcher>,
    poll: Option<JoinHandle<()>>,
}

impl WatchedResource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a native change notification for `path`.
    ///
    /// `on_change` maps each notification to the trigger to send, or `None`
    /// to ignore it. Fails if the platform watcher cannot be set up or the
    /// path cannot be watched (for instance, it does not exist yet).
    pub fn watch_native<F>(
        &mut self,
        path: &Path,
        mode: RecursiveMode,
        tx: UnboundedSender<Trigger>,
        on_change: F,
    ) -> Result<()>
    where
        F: Fn(Event) -> Option<Trigger> + Send + 'static,
    {
        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) => {
                    if let Some(trigger) = on_change(event) {
                        let _ = tx.send(trigger);
                    }
                }
                Err(e) => tracing::debug!("Native watcher error: {}", e),
            },
            Config::default(),
        )
        .context("Failed to create native watcher")?;

        watcher
            .watch(path, mode)
            .with_context(|| format!("Failed to watch {}", path.display()))?;

        self.watcher = Some(watcher);
        Ok(())
    }

    /// Send `trigger` every `interval`, optionally giving up after `limit`.
    ///
    /// Replaces any poll already running. Requires a tokio runtime; without
    /// one the poll is not started and a warning is logged.
    pub fn poll_every(
        &mut self,
        interval: Duration,
        limit: Option<Duration>,
        tx: UnboundedSender<Trigger>,
        trigger: Trigger,
    ) {
        self.stop_polling();

        let runtime = match tokio::runtime::Handle::try_current() {
            Ok(handle) => handle,
            Err(e) => {
                tracing::warn!("Cannot start poll timer outside a tokio runtime: {}", e);
                return;
            }
        };

        let interval = interval.max(MIN_POLL_INTERVAL);
        let ticks = async move {
            let mut ticker = time::interval_at(Instant::now() + interval, interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                ticker.tick().await;
                if tx.send(trigger.clone()).is_err() {
                    break;
                }
            }
        };

        let handle = match limit {
            Some(limit) => runtime.spawn(async move {
                let _ = time::timeout(limit, ticks).await;
            }),
            None => runtime.spawn(ticks),
        };
        self.poll = Some(handle);
    }

    pub fn is_watching_native(&self) -> bool {
        self.watcher.is_some()
    }

    /// Whether the poll timer is still ticking
    pub fn is_polling(&self) -> bool {
        self.poll.as_ref().is_some_and(|h| !h.is_finished())
    }

    fn stop_polling(&mut self) {
        if let Some(handle) = self.poll.take() {
            handle.abort();
        }
    }

    /// Close the watcher and cancel the poll timer
    pub fn close(&mut self) {
        self.watcher = None;
        self.stop_polling();
    }
}

impl Drop for WatchedResource {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    #[tokio::test]
    async fn poll_sends_trigger_until_closed() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut resource = WatchedResource::new();
        resource.poll_every(Duration::from_millis(5), None, tx, Trigger::ScanDirectory);

        assert_eq!(rx.recv().await, Some(Trigger::ScanDirectory));
        assert!(resource.is_polling());

        resource.close();
        assert!(!resource.is_polling());
    }

    #[tokio::test]
    async fn limited_poll_expires_on_its_own() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut resource = WatchedResource::new();
        resource.poll_every(
            Duration::from_millis(5),
            Some(Duration::from_millis(30)),
            tx,
            Trigger::CheckCreated("s".to_string()),
        );

        tokio::time::sleep(Duration::from_millis(150)).await;
        assert!(!resource.is_polling());

        // Drain what was sent while it ran; the sender is gone afterwards.
        while rx.try_recv().is_ok() {}
        assert!(rx.recv().await.is_none());
    }

    #[test]
    fn native_watch_fails_for_missing_path() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let mut resource = WatchedResource::new();
        let result = resource.watch_native(
            Path::new("/nonexistent/telemux/session.jsonl"),
            RecursiveMode::NonRecursive,
            tx,
            |_| None,
        );
        assert!(result.is_err());
        assert!(!resource.is_watching_native());
    }
}

//! Utility functions and helpers.

use tokio::sync::mpsc;

/// Send a value through an unbounded channel, logging a warning if it fails.
///
/// Delivery is fire-and-forget: a closed receiver is not an error for the sender.
pub fn send_or_log<T>(tx: &mpsc::UnboundedSender<T>, value: T, context: &str) {
    if let Err(e) = tx.send(value) {
        tracing::warn!("Failed to send {}: {}", context, e);
    }
}

//! Bounded event history

use crate::data::RuntimeEvent;
use std::collections::VecDeque;

/// Number of events the orchestrator retains
pub const HISTORY_CAPACITY: usize = 200;

/// FIFO ring buffer of the most recent events
#[derive(Debug, Clone)]
pub struct EventHistory {
    events: VecDeque<RuntimeEvent>,
    capacity: usize,
}

impl EventHistory {
    pub fn new(capacity: usize) -> Self {
        Self {
            events: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Append an event, evicting the oldest once full
    pub fn push(&mut self, event: RuntimeEvent) {
        if self.capacity == 0 {
            return;
        }
        while self.events.len() >= self.capacity {
            self.events.pop_front();
        }
        self.events.push_back(event);
    }

    /// Up to `limit` most recent events, oldest first
    pub fn recent(&self, limit: usize) -> Vec<RuntimeEvent> {
        let skip = self.events.len().saturating_sub(limit);
        self.events.iter().skip(skip).cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

impl Default for EventHistory {
    fn default() -> Self {
        Self::new(HISTORY_CAPACITY)
    }
}

// ── Bounded recent-alert log ──

use std::collections::VecDeque;

use crate::model::AlertMessage;

/// Keeps the `capacity` most recent alerts, oldest first.
///
/// Every appended alert is recorded, duplicates included; once full, each
/// append evicts the oldest entry.
#[derive(Debug, Clone)]
pub struct AlertBuffer {
    entries: VecDeque<AlertMessage>,
    capacity: usize,
}

impl AlertBuffer {
    /// A capacity of zero is treated as one.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn append(&mut self, alert: AlertMessage) {
        self.entries.push_back(alert);
        while self.entries.len() > self.capacity {
            self.entries.pop_front();
        }
    }

    /// Current contents, oldest first (arrival order).
    pub fn snapshot(&self) -> Vec<AlertMessage> {
        self.entries.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

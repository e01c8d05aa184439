use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One message relayed through the registry and its answer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub agent_name: String,
    pub agent_url: String,
    pub message: String,
    pub response: String,
    pub is_error: bool,
    pub timestamp: DateTime<Utc>,
}

/// Bounded, newest-first log of relayed exchanges.
#[derive(Debug, Clone)]
pub struct MessageHistory {
    entries: Arc<Mutex<VecDeque<HistoryEntry>>>,
    capacity: usize,
}

impl MessageHistory {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: Arc::new(Mutex::new(VecDeque::with_capacity(capacity))),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Insert at the front, evicting the oldest entry when full.
    pub fn record(&self, entry: HistoryEntry) {
        if self.capacity == 0 {
            return;
        }
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.push_front(entry);
        entries.truncate(self.capacity);
    }

    /// Entries, newest first.
    pub fn snapshot(&self) -> Vec<HistoryEntry> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(message: &str) -> HistoryEntry {
        HistoryEntry {
            agent_name: "Tool Agent".into(),
            agent_url: "http://localhost:9999".into(),
            message: message.into(),
            response: "ok".into(),
            is_error: false,
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn test_newest_first() {
        let history = MessageHistory::new(20);
        history.record(entry("first"));
        history.record(entry("second"));

        let snapshot = history.snapshot();
        assert_eq!(snapshot[0].message, "second");
        assert_eq!(snapshot[1].message, "first");
    }

    #[test]
    fn test_evicts_oldest_at_capacity() {
        let history = MessageHistory::new(3);
        for i in 0..5 {
            history.record(entry(&format!("m{i}")));
        }

        let messages: Vec<_> = history.snapshot().into_iter().map(|e| e.message).collect();
        assert_eq!(messages, vec!["m4", "m3", "m2"]);
    }

    #[test]
    fn test_zero_capacity_keeps_nothing() {
        let history = MessageHistory::new(0);
        history.record(entry("dropped"));
        assert!(history.is_empty());
    }
}

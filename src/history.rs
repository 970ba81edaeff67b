use std::collections::VecDeque;
use std::time::SystemTime;

use crate::payload::SensorReading;

pub const DEFAULT_HISTORY_CAPACITY: usize = 200;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HistoryEntry {
    pub timestamp: SystemTime,
    pub temperature: f64,
    pub humidity: f64,
}

impl From<&SensorReading> for HistoryEntry {
    fn from(reading: &SensorReading) -> Self {
        Self {
            timestamp: reading.timestamp,
            temperature: reading.temperature,
            humidity: reading.humidity,
        }
    }
}

/// Fixed-capacity sample window; the oldest entry is evicted on overflow.
#[derive(Debug, Clone)]
pub struct HistoryBuffer {
    entries: VecDeque<HistoryEntry>,
    capacity: usize,
}

impl HistoryBuffer {
    /// A zero capacity is raised to one.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, entry: HistoryEntry) {
        if self.entries.len() == self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(entry);
    }

    /// Owned copy, oldest first.
    pub fn snapshot(&self) -> Vec<HistoryEntry> {
        self.entries.iter().copied().collect()
    }

    pub fn latest(&self) -> Option<&HistoryEntry> {
        self.entries.back()
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

impl Default for HistoryBuffer {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, UNIX_EPOCH};

    fn entry(secs: u64, temperature: f64) -> HistoryEntry {
        HistoryEntry {
            timestamp: UNIX_EPOCH + Duration::from_secs(secs),
            temperature,
            humidity: 50.0,
        }
    }

    #[test]
    fn evicts_oldest_past_capacity() {
        let mut history = HistoryBuffer::new(2);
        let (a, b, c) = (entry(1, 20.0), entry(2, 21.0), entry(3, 22.0));
        history.push(a);
        history.push(b);
        history.push(c);
        assert_eq!(history.snapshot(), vec![b, c]);
        assert_eq!(history.latest(), Some(&c));
    }

    #[test]
    fn never_exceeds_capacity() {
        let mut history = HistoryBuffer::new(5);
        for i in 0..=5 {
            history.push(entry(i, i as f64));
            assert!(history.len() <= history.capacity());
        }
        let temps: Vec<f64> = history.snapshot().iter().map(|e| e.temperature).collect();
        assert_eq!(temps, vec![1.0, 2.0, 3.0, 4.0, 5.0]);
    }

    #[test]
    fn snapshot_is_independent_of_later_pushes() {
        let mut history = HistoryBuffer::new(3);
        history.push(entry(1, 20.0));
        let snap = history.snapshot();
        history.push(entry(2, 21.0));
        assert_eq!(snap.len(), 1);
        assert_eq!(history.len(), 2);
    }

    #[test]
    fn zero_capacity_holds_one() {
        let mut history = HistoryBuffer::new(0);
        history.push(entry(1, 20.0));
        history.push(entry(2, 21.0));
        assert_eq!(history.capacity(), 1);
        assert_eq!(history.snapshot(), vec![entry(2, 21.0)]);
    }
}

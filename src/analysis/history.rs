//! Bounded FIFO histories of per-frame features.

use std::collections::VecDeque;

/// Fixed-capacity ring buffer; inserting into a full history evicts the oldest entry
#[derive(Debug, Clone)]
pub struct History<T> {
    entries: VecDeque<T>,
    capacity: usize,
}

impl<T> History<T> {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Append `value`, returning the evicted entry when the history was full
    pub fn push(&mut self, value: T) -> Option<T> {
        let evicted = if self.entries.len() == self.capacity {
            self.entries.pop_front()
        } else {
            None
        };
        self.entries.push_back(value);
        evicted
    }

    pub fn latest(&self) -> Option<&T> {
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

impl History<f32> {
    /// Arithmetic mean, `None` when empty
    pub fn mean(&self) -> Option<f32> {
        if self.entries.is_empty() {
            return None;
        }
        Some(self.entries.iter().sum::<f32>() / self.entries.len() as f32)
    }
}

/// Per-signal histories written only by the spectral analyzer
#[derive(Debug, Clone)]
pub struct FeatureHistory {
    pub spectrum: History<Vec<f32>>,
    pub waveform: History<Vec<f32>>,
    pub bass: History<f32>,
    pub mid: History<f32>,
    pub treble: History<f32>,
    pub energy: History<f32>,
    pub transient: History<f32>,
}

impl FeatureHistory {
    pub fn new(capacity: usize) -> Self {
        Self {
            spectrum: History::new(capacity),
            waveform: History::new(capacity),
            bass: History::new(capacity),
            mid: History::new(capacity),
            treble: History::new(capacity),
            energy: History::new(capacity),
            transient: History::new(capacity),
        }
    }

    /// Number of analyzed frames retained
    pub fn len(&self) -> usize {
        self.energy.len()
    }

    pub fn is_empty(&self) -> bool {
        self.energy.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_history_never_exceeds_capacity() {
        let mut history = History::new(3);
        for i in 0..10 {
            history.push(i);
            assert!(history.len() <= 3);
        }
        assert_eq!(history.len(), 3);
    }

    #[test]
    fn test_full_history_evicts_oldest() {
        let mut history = History::new(3);
        assert_eq!(history.push(1), None);
        assert_eq!(history.push(2), None);
        assert_eq!(history.push(3), None);

        assert_eq!(history.push(4), Some(1));
        assert_eq!(history.push(5), Some(2));
        assert_eq!(history.latest(), Some(&5));
    }

    #[test]
    fn test_mean() {
        let mut history = History::new(4);
        assert_eq!(history.mean(), None);

        for v in [1.0, 2.0, 3.0, 4.0, 5.0] {
            history.push(v);
        }
        // 1.0 evicted
        assert_eq!(history.mean(), Some(3.5));
    }

    #[test]
    fn test_zero_capacity_is_bumped_to_one() {
        let mut history = History::new(0);
        history.push('a');
        history.push('b');
        assert_eq!(history.capacity(), 1);
        assert_eq!(history.latest(), Some(&'b'));
    }
}

use std::collections::VecDeque;

use super::spectral::SpectralFrame;

/// Bounded FIFO of recent spectral frames backing the spectrogram display.
///
/// Appends evict the oldest frame once capacity is reached. The caller is
/// responsible for only appending frames produced while the session is
/// playing, and for clearing on replay so stale history does not bleed into
/// a fresh run.
pub struct SpectralHistory {
    frames: VecDeque<SpectralFrame>,
    capacity: usize,
}

impl SpectralHistory {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            frames: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn append(&mut self, frame: SpectralFrame) {
        if self.frames.len() == self.capacity {
            self.frames.pop_front();
        }
        self.frames.push_back(frame);
    }

    pub fn clear(&mut self) {
        self.frames.clear();
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Snapshot in insertion order, oldest first.
    pub fn frames(&self) -> Vec<SpectralFrame> {
        self.frames.iter().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(tag: f32) -> SpectralFrame {
        SpectralFrame { bands: vec![tag] }
    }

    #[test]
    fn never_exceeds_capacity_and_keeps_newest_in_order() {
        let mut history = SpectralHistory::new(3);
        for i in 0..10 {
            history.append(frame(i as f32));
            assert!(history.len() <= 3);
        }
        let tags: Vec<f32> = history.frames().iter().map(|f| f.bands[0]).collect();
        assert_eq!(tags, vec![7.0, 8.0, 9.0]);
    }

    #[test]
    fn clear_empties_the_buffer() {
        let mut history = SpectralHistory::new(4);
        history.append(frame(1.0));
        history.append(frame(2.0));
        history.clear();
        assert!(history.is_empty());
        assert_eq!(history.capacity(), 4);
    }

    #[test]
    fn zero_capacity_is_clamped_to_one() {
        let mut history = SpectralHistory::new(0);
        history.append(frame(1.0));
        history.append(frame(2.0));
        assert_eq!(history.len(), 1);
        assert_eq!(history.frames()[0].bands[0], 2.0);
    }
}

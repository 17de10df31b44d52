//! Fixed-capacity experience store with uniform sampling.

use crate::sample::SharedSample;

/// Ring buffer of transitions. Once full, new samples overwrite the
/// oldest; sampling is uniform with replacement.
pub struct ReplayBuffer {
    samples: Vec<SharedSample>,
    capacity: usize,
    cursor: usize,
}

impl ReplayBuffer {
    /// # Panics
    ///
    /// Panics if `capacity` is zero.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "replay buffer capacity must be positive");
        Self {
            samples: Vec::new(),
            capacity,
            cursor: 0,
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn add(&mut self, sample: SharedSample) {
        if self.samples.len() < self.capacity {
            self.samples.push(sample);
        } else {
            self.samples[self.cursor] = sample;
            self.cursor = (self.cursor + 1) % self.capacity;
        }
    }

    /// Draws `count` samples uniformly with replacement. An empty buffer
    /// yields an empty batch.
    #[must_use]
    pub fn batch(&self, count: usize, rng: &mut fastrand::Rng) -> Vec<SharedSample> {
        if self.samples.is_empty() {
            return Vec::new();
        }
        (0..count)
            .map(|_| self.samples[rng.usize(..self.samples.len())].clone())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::sample::Sample;

    fn sample(reward: f32) -> SharedSample {
        Arc::new(Sample {
            observation: vec![0.0],
            action: vec![0.0],
            reward,
            next_observation: vec![0.0],
            done: false,
        })
    }

    #[test]
    fn fills_then_overwrites_oldest() {
        let mut buffer = ReplayBuffer::new(3);
        for i in 0..5 {
            buffer.add(sample(i as f32));
        }
        assert_eq!(buffer.len(), 3);
        let rewards: Vec<f32> = buffer.samples.iter().map(|s| s.reward).collect();
        // Samples 0 and 1 were overwritten by 3 and 4.
        assert_eq!(rewards, vec![3.0, 4.0, 2.0]);
    }

    #[test]
    fn empty_buffer_yields_empty_batch() {
        let buffer = ReplayBuffer::new(10);
        let mut rng = fastrand::Rng::with_seed(1);
        assert!(buffer.batch(100, &mut rng).is_empty());
    }

    #[test]
    fn batch_draws_with_replacement() {
        let mut buffer = ReplayBuffer::new(10);
        buffer.add(sample(7.0));
        let mut rng = fastrand::Rng::with_seed(1);
        let batch = buffer.batch(5, &mut rng);
        assert_eq!(batch.len(), 5);
        assert!(batch.iter().all(|s| s.reward == 7.0));
    }

    #[test]
    #[should_panic(expected = "capacity must be positive")]
    fn zero_capacity_is_rejected() {
        let _ = ReplayBuffer::new(0);
    }
}

//! Uniform-random stand-in for a learned network.
//!
//! Useful for exercising the full training pipeline (collection, replay,
//! checkpointing, evaluation) before a real actor-critic backend is
//! plugged in. Training is a no-op and checkpoints carry no weights.

use std::sync::{Arc, Mutex, PoisonError};

use coach::{Losses, Network, SharedSample};

pub struct RandomPolicy {
    action_len: usize,
    rng: Mutex<fastrand::Rng>,
}

impl RandomPolicy {
    #[must_use]
    pub fn new(action_len: usize, seed: u64) -> Self {
        Self {
            action_len,
            rng: Mutex::new(fastrand::Rng::with_seed(seed)),
        }
    }

    fn rng(&self) -> std::sync::MutexGuard<'_, fastrand::Rng> {
        self.rng.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Network for RandomPolicy {
    fn predict(&self, _observation: &[f32]) -> Vec<f32> {
        let mut rng = self.rng();
        (0..self.action_len).map(|_| rng.f32() * 2.0 - 1.0).collect()
    }

    fn train(&mut self, _batch: &[SharedSample], _discount: f32, _interpolation: f32) -> Losses {
        Losses::default()
    }

    fn snapshot(&self) -> Arc<dyn Network> {
        // Snapshots fork the random stream so concurrent consumers do not
        // contend on one mutex.
        let seed = self.rng().u64(..);
        Arc::new(Self::new(self.action_len, seed))
    }

    fn save(&self) -> String {
        String::new()
    }

    fn restore(&mut self, _data: &str) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn predictions_have_the_action_length_and_range() {
        let policy = RandomPolicy::new(3, 42);
        for _ in 0..50 {
            let action = policy.predict(&[0.0; 8]);
            assert_eq!(action.len(), 3);
            assert!(action.iter().all(|a| (-1.0..=1.0).contains(a)));
        }
    }

    #[test]
    fn snapshots_predict_independently() {
        let policy = RandomPolicy::new(2, 42);
        let snapshot = policy.snapshot();
        let a = snapshot.predict(&[]);
        let b = policy.predict(&[]);
        assert_eq!(a.len(), b.len());
    }
}

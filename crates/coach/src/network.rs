//! The policy/value network boundary the trainer drives.

use std::sync::Arc;

use crate::sample::SharedSample;

/// Losses reported by one optimization step.
#[derive(Clone, Copy, Debug, Default)]
pub struct Losses {
    pub policy: f32,
    pub value: f32,
}

/// An actor-critic network as seen by the training loop.
///
/// Prediction is immutable so frozen snapshots can serve concurrent
/// rollouts; optimization requires exclusive access. An empty batch is a
/// zero-loss no-op.
pub trait Network: Send + Sync {
    /// Deterministic policy output for one observation, one value per
    /// action dimension in [-1, 1].
    fn predict(&self, observation: &[f32]) -> Vec<f32>;

    /// One optimization step over a batch of transitions.
    fn train(&mut self, batch: &[SharedSample], discount: f32, interpolation: f32) -> Losses;

    /// An immutable snapshot of the current weights for rollout actors and
    /// checkpoint consumers.
    fn snapshot(&self) -> Arc<dyn Network>;

    /// Opaque serialized weights, restored by [`Network::restore`].
    fn save(&self) -> String;

    fn restore(&mut self, data: &str);
}

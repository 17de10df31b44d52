//! One environment transition as stored in the replay buffer.

use std::sync::Arc;

/// A single transition. Samples are immutable once recorded and shared
/// between the buffer and in-flight training batches.
#[derive(Clone, Debug)]
pub struct Sample {
    pub observation: Vec<f32>,
    pub action: Vec<f32>,
    pub reward: f32,
    pub next_observation: Vec<f32>,
    /// True when the transition ended its episode for a reason other than
    /// the step horizon. Timeouts are not failures and bootstrap normally.
    pub done: bool,
}

/// Samples circulate as shared pointers so a batch never copies
/// observation vectors.
pub type SharedSample = Arc<Sample>;

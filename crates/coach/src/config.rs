//! Training hyperparameters and the run schedule.

use serde::{Deserialize, Serialize};

/// Optimizer and exploration hyperparameters. Serialized alongside
/// checkpoints so a resumed run trains exactly as it started; omitted
/// fields take the defaults.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TrainConfig {
    pub discount: f32,
    pub batch_size: usize,
    /// Warm-up steps driven by uniform random actions before the policy
    /// takes over.
    pub random_steps: u64,
    pub buffer_capacity: usize,
    pub learning_rate: f32,
    /// Soft-update coefficient for the target networks.
    pub interpolation: f32,
    pub hidden_layers: Vec<usize>,
    pub noise_sigma: f32,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            discount: 0.99,
            batch_size: 100,
            random_steps: 10_000,
            buffer_capacity: 1_000_000,
            learning_rate: 3e-4,
            interpolation: 0.995,
            hidden_layers: vec![64, 64],
            noise_sigma: 0.2,
        }
    }
}

/// How long to run and how often to optimize.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RunConfig {
    pub epochs: u32,
    /// Environment steps per epoch, summed over all actors.
    pub epoch_steps: u64,
    /// Collected steps before the first optimization.
    pub training_start_steps: u64,
    /// Steps collected between optimization rounds.
    pub training_interval: u64,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            epochs: 1000,
            epoch_steps: 4000,
            training_start_steps: 1000,
            training_interval: 50,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_fill_missing_fields() {
        let config: TrainConfig = serde_json::from_str("{\"batchSize\": 32}").unwrap();
        assert_eq!(config.batch_size, 32);
        assert!((config.discount - 0.99).abs() < f32::EPSILON);
        assert_eq!(config.hidden_layers, vec![64, 64]);
    }
}

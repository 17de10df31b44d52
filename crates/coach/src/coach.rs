//! Per-actor rollout driver: owns one environment and its exploration
//! noise, produces one transition per step.

use sim::{Env, StepError};

use crate::config::TrainConfig;
use crate::network::Network;
use crate::noise::OuNoise;
use crate::sample::{Sample, SharedSample};

/// Drives a single environment and records transitions. Episode
/// boundaries (done or timeout) restart the environment and reset the
/// noise process transparently; finished episode returns accumulate until
/// drained for reporting.
pub struct Coach<E> {
    env: E,
    noise: OuNoise,
    rng: fastrand::Rng,
    episode_reward: f32,
    episode_started: bool,
    finished: Vec<f32>,
}

impl<E: Env> Coach<E> {
    #[must_use]
    pub fn new(env: E, config: &TrainConfig, seed: u64) -> Self {
        let noise = OuNoise::new(env.action_len(), config.noise_sigma);
        Self {
            env,
            noise,
            rng: fastrand::Rng::with_seed(seed),
            episode_reward: 0.0,
            episode_started: false,
            finished: Vec::new(),
        }
    }

    #[must_use]
    pub fn env(&self) -> &E {
        &self.env
    }

    /// Collects one transition. With `random` set the action is uniform
    /// noise, which seeds the replay buffer before the policy is worth
    /// following; otherwise it is the policy output perturbed by the noise
    /// process and clamped to the actuation range.
    ///
    /// # Errors
    ///
    /// Propagates [`StepError`] from the environment; the driving loop is
    /// expected to be bug-free, so any error aborts the run.
    pub fn step(&mut self, network: &dyn Network, random: bool) -> Result<SharedSample, StepError> {
        if !self.episode_started || self.env.done() || self.env.timeout() {
            if self.episode_started {
                self.finished.push(self.episode_reward);
            }
            self.env.restart();
            self.noise.reset();
            self.episode_reward = 0.0;
            self.episode_started = true;
        }

        let observation = self.env.observation().to_vec();
        let action = if random {
            self.env.random_action()
        } else {
            let mut action = network.predict(&observation);
            for (value, noise) in action.iter_mut().zip(self.noise.next(&mut self.rng)) {
                *value = (*value + noise).clamp(-1.0, 1.0);
            }
            action
        };

        let reward = self.env.step(&action)?;
        self.episode_reward += reward;

        Ok(SharedSample::new(Sample {
            observation,
            action,
            reward,
            next_observation: self.env.observation().to_vec(),
            done: self.env.done(),
        }))
    }

    /// Returns of the episodes finished since the last drain.
    pub fn drain_finished(&mut self) -> Vec<f32> {
        std::mem::take(&mut self.finished)
    }
}

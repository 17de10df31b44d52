//! The outer training loop: epochs, collection intervals and the
//! collect/optimize overlap when several actors run in parallel.

use std::time::{Duration, Instant};

use sim::{Env, StepError};

use crate::checkpoint::CheckpointSlot;
use crate::coach::Coach;
use crate::config::{RunConfig, TrainConfig};
use crate::network::{Losses, Network};
use crate::replay::ReplayBuffer;
use crate::sample::SharedSample;

/// Summary of one finished epoch.
#[derive(Clone, Debug)]
pub struct EpochStats {
    pub epoch: u32,
    pub total_steps: u64,
    pub episodes: usize,
    pub mean_reward: f32,
    pub policy_loss: f32,
    pub value_loss: f32,
    /// Wall time spent collecting transitions.
    pub play_time: Duration,
    /// Wall time spent in `Network::train`.
    pub train_time: Duration,
}

#[derive(Default)]
struct EpochAccum {
    losses: Losses,
    trainings: u64,
    play_time: Duration,
    train_time: Duration,
}

/// Owns the replay buffer and the global step count, and schedules
/// collection against optimization.
///
/// With one actor the two alternate on the calling thread. With several,
/// each interval freezes a snapshot of the network for the rollout
/// threads while the calling thread keeps optimizing the live network;
/// the interval's samples enter the buffer in actor order after the
/// rollout threads join, so runs with equal seeds fill the buffer
/// identically regardless of thread timing.
pub struct Scheduler {
    train: TrainConfig,
    run: RunConfig,
    replay: ReplayBuffer,
    rng: fastrand::Rng,
    total_steps: u64,
}

impl Scheduler {
    #[must_use]
    pub fn new(train: TrainConfig, run: RunConfig, seed: u64) -> Self {
        let replay = ReplayBuffer::new(train.buffer_capacity);
        Self {
            train,
            run,
            replay,
            rng: fastrand::Rng::with_seed(seed),
            total_steps: 0,
        }
    }

    #[must_use]
    pub fn total_steps(&self) -> u64 {
        self.total_steps
    }

    #[must_use]
    pub fn buffered_samples(&self) -> usize {
        self.replay.len()
    }

    /// Runs the configured number of epochs. After each epoch the current
    /// network is snapshotted into `slot` and reported through `on_epoch`.
    ///
    /// # Errors
    ///
    /// Propagates the first [`StepError`] any actor hits; the run is not
    /// resumable past a contract violation.
    pub fn run<E, N>(
        &mut self,
        actors: &mut [Coach<E>],
        network: &mut N,
        slot: &CheckpointSlot,
        mut on_epoch: impl FnMut(&EpochStats, &N),
    ) -> Result<(), StepError>
    where
        E: Env + Send,
        N: Network,
    {
        if actors.is_empty() {
            tracing::warn!("no actors configured, nothing to train");
            return Ok(());
        }

        for epoch in 1..=self.run.epochs {
            let stats = self.run_epoch(epoch, actors, network)?;
            slot.publish(network.snapshot());
            tracing::info!(
                epoch = stats.epoch,
                total_steps = stats.total_steps,
                episodes = stats.episodes,
                mean_reward = stats.mean_reward,
                policy_loss = stats.policy_loss,
                value_loss = stats.value_loss,
                play_seconds = stats.play_time.as_secs_f32(),
                train_seconds = stats.train_time.as_secs_f32(),
                "epoch finished"
            );
            on_epoch(&stats, network);
        }
        Ok(())
    }

    fn run_epoch<E, N>(
        &mut self,
        epoch: u32,
        actors: &mut [Coach<E>],
        network: &mut N,
    ) -> Result<EpochStats, StepError>
    where
        E: Env + Send,
        N: Network,
    {
        let mut accum = EpochAccum::default();

        let mut remaining = self.run.epoch_steps;
        while remaining > 0 {
            let interval = remaining.min(self.run.training_interval);
            if actors.len() <= 1 {
                self.collect_serial(&mut actors[0], network, interval, &mut accum)?;
            } else {
                self.collect_parallel(actors, network, interval, &mut accum)?;
            }
            remaining -= interval;
        }

        let mut rewards = Vec::new();
        for actor in actors.iter_mut() {
            rewards.extend(actor.drain_finished());
        }
        let episodes = rewards.len();
        let mean_reward = if episodes == 0 {
            0.0
        } else {
            rewards.iter().sum::<f32>() / episodes as f32
        };
        let scale = if accum.trainings == 0 {
            1.0
        } else {
            accum.trainings as f32
        };

        Ok(EpochStats {
            epoch,
            total_steps: self.total_steps,
            episodes,
            mean_reward,
            policy_loss: accum.losses.policy / scale,
            value_loss: accum.losses.value / scale,
            play_time: accum.play_time,
            train_time: accum.train_time,
        })
    }

    fn collect_serial<E, N>(
        &mut self,
        actor: &mut Coach<E>,
        network: &mut N,
        interval: u64,
        accum: &mut EpochAccum,
    ) -> Result<(), StepError>
    where
        E: Env,
        N: Network,
    {
        let started = Instant::now();
        for _ in 0..interval {
            let random = self.total_steps < self.train.random_steps;
            let sample = actor.step(network, random)?;
            self.replay.add(sample);
            self.total_steps += 1;
        }
        accum.play_time += started.elapsed();

        if self.total_steps >= self.run.training_start_steps {
            let started = Instant::now();
            for _ in 0..interval {
                let batch = self.replay.batch(self.train.batch_size, &mut self.rng);
                let losses = network.train(&batch, self.train.discount, self.train.interpolation);
                accum.losses.policy += losses.policy;
                accum.losses.value += losses.value;
                accum.trainings += 1;
            }
            accum.train_time += started.elapsed();
        }
        Ok(())
    }

    fn collect_parallel<E, N>(
        &mut self,
        actors: &mut [Coach<E>],
        network: &mut N,
        interval: u64,
        accum: &mut EpochAccum,
    ) -> Result<(), StepError>
    where
        E: Env + Send,
        N: Network,
    {
        // Exploration mode is decided once per interval from the step
        // count at its start, so every actor in the interval agrees.
        let random = self.total_steps < self.train.random_steps;
        let train_now = self.total_steps >= self.run.training_start_steps;
        let frozen = network.snapshot();
        let shares = split_evenly(interval, actors.len());

        let replay = &self.replay;
        let rng = &mut self.rng;
        let train = &self.train;

        let started = Instant::now();
        let collected: Vec<Result<Vec<SharedSample>, StepError>> = std::thread::scope(|scope| {
            let handles: Vec<_> = actors
                .iter_mut()
                .zip(&shares)
                .map(|(actor, share)| {
                    let frozen = frozen.clone();
                    let share = *share;
                    scope.spawn(move || {
                        let mut samples: Vec<SharedSample> = Vec::with_capacity(share as usize);
                        for _ in 0..share {
                            samples.push(actor.step(frozen.as_ref(), random)?);
                        }
                        Ok::<_, StepError>(samples)
                    })
                })
                .collect();

            if train_now && !replay.is_empty() {
                let training_started = Instant::now();
                for _ in 0..interval {
                    let batch = replay.batch(train.batch_size, rng);
                    let losses = network.train(&batch, train.discount, train.interpolation);
                    accum.losses.policy += losses.policy;
                    accum.losses.value += losses.value;
                    accum.trainings += 1;
                }
                accum.train_time += training_started.elapsed();
            }

            handles
                .into_iter()
                .map(|handle| match handle.join() {
                    Ok(result) => result,
                    Err(panic) => std::panic::resume_unwind(panic),
                })
                .collect()
        });
        accum.play_time += started.elapsed();

        for result in collected {
            for sample in result? {
                self.replay.add(sample);
                self.total_steps += 1;
            }
        }
        Ok(())
    }
}

/// Splits `total` into `parts` near-equal shares, remainder to the front.
fn split_evenly(total: u64, parts: usize) -> Vec<u64> {
    let parts64 = parts as u64;
    let base = total / parts64;
    let remainder = total % parts64;
    (0..parts64).map(|i| base + u64::from(i < remainder)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shares_cover_the_interval_exactly() {
        for (total, parts) in [(50, 3), (50, 4), (7, 8), (1, 2), (100, 1)] {
            let shares = split_evenly(total, parts);
            assert_eq!(shares.len(), parts);
            assert_eq!(shares.iter().sum::<u64>(), total);
            let max = shares.iter().max().copied().unwrap_or(0);
            let min = shares.iter().min().copied().unwrap_or(0);
            assert!(max - min <= 1);
        }
    }
}

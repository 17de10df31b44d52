//! Evaluation thread: plays episodes with the latest published
//! checkpoint, without exploration noise, while training continues.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use coach::CheckpointSlot;
use sim::Env;

/// Wall-clock budget per evaluation step, so playback stays watchable
/// instead of spinning as fast as the solver allows.
const FRAME: Duration = Duration::from_millis(40);

pub struct Tester {
    stop: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl Tester {
    /// Starts the evaluation loop on its own thread. The environment
    /// restarts whenever its episode ends or a fresh checkpoint arrives.
    #[must_use]
    pub fn spawn<E>(env: E, slot: Arc<CheckpointSlot>) -> Self
    where
        E: Env + Send + 'static,
    {
        let stop = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&stop);
        let handle = std::thread::spawn(move || run(env, &slot, &flag));
        Self {
            stop,
            handle: Some(handle),
        }
    }

    /// Signals the thread and waits for it to finish.
    pub fn stop(mut self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                tracing::warn!("evaluation thread panicked");
            }
        }
    }
}

fn run<E: Env>(mut env: E, slot: &Arc<CheckpointSlot>, stop: &AtomicBool) {
    let mut network = slot.latest();
    env.restart();
    let mut episode_reward = 0.0;

    while !stop.load(Ordering::Relaxed) {
        let started = Instant::now();

        if env.done() || env.timeout() || slot.changed_since(&network) {
            tracing::debug!(episode_reward, "evaluation episode finished");
            network = slot.latest();
            env.restart();
            episode_reward = 0.0;
        }

        let action = network.predict(env.observation());
        match env.step(&action) {
            Ok(reward) => episode_reward += reward,
            Err(error) => {
                tracing::warn!(%error, "evaluation step failed");
                env.restart();
                episode_reward = 0.0;
            }
        }

        if let Some(rest) = FRAME.checked_sub(started.elapsed()) {
            std::thread::sleep(rest);
        }
    }
}

//! Generic episode lifecycle shared by every environment: observation
//! buffer, action-length contract, move counter, done/timeout flags and the
//! environment-private random stream.

use std::time::{SystemTime, UNIX_EPOCH};

use crate::StepError;

/// Episode bookkeeping. Starts in the done state so the driver restarts it
/// before the first step.
pub struct Episode {
    observation: Vec<f32>,
    action_len: usize,
    max_moves: u32,
    move_number: u32,
    done: bool,
    seed: u64,
    rng: Option<fastrand::Rng>,
}

impl Episode {
    /// Allocates the zeroed observation buffer and derives a fresh random
    /// seed from wall-clock time. The seed is taken once here, not per
    /// reset, so repeated episodes draw from one stream.
    #[must_use]
    pub fn new(observation_len: usize, action_len: usize, max_moves: u32) -> Self {
        let seed = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_or(0, |d| u64::from(d.subsec_nanos()) ^ d.as_secs());
        Self {
            observation: vec![0.0; observation_len],
            action_len,
            max_moves,
            move_number: 0,
            done: true,
            seed,
            rng: None,
        }
    }

    #[must_use]
    pub fn observation(&self) -> &[f32] {
        &self.observation
    }

    pub fn observation_mut(&mut self) -> &mut [f32] {
        &mut self.observation
    }

    #[must_use]
    pub fn action_len(&self) -> usize {
        self.action_len
    }

    #[must_use]
    pub fn move_number(&self) -> u32 {
        self.move_number
    }

    #[must_use]
    pub fn done(&self) -> bool {
        self.done
    }

    pub fn set_done(&mut self, done: bool) {
        self.done = done;
    }

    #[must_use]
    pub fn timeout(&self) -> bool {
        self.move_number >= self.max_moves
    }

    /// Zeroes the move counter and clears the done flag.
    pub fn reset(&mut self) {
        self.move_number = 0;
        self.done = false;
    }

    /// Validates the step contract without mutating any state.
    ///
    /// # Errors
    ///
    /// See [`crate::Env::step`].
    pub fn begin_step(&self, action: &[f32]) -> Result<(), StepError> {
        if action.len() != self.action_len {
            return Err(StepError::InvalidActionLength {
                expected: self.action_len,
                got: action.len(),
            });
        }
        if self.done {
            return Err(StepError::EnvironmentDone);
        }
        Ok(())
    }

    pub fn finish_step(&mut self) {
        self.move_number += 1;
    }

    /// The episode's random stream, built lazily from the stored seed and
    /// shared thereafter.
    pub fn rng(&mut self) -> &mut fastrand::Rng {
        self.rng.get_or_insert_with(|| fastrand::Rng::with_seed(self.seed))
    }

    /// Each component uniform in [-1, 1].
    pub fn random_action(&mut self) -> Vec<f32> {
        let len = self.action_len;
        let rng = self.rng();
        (0..len).map(|_| rng.f32() * 2.0 - 1.0).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_done_with_zeroed_observation() {
        let episode = Episode::new(12, 3, 100);
        assert!(episode.done());
        assert_eq!(episode.observation().len(), 12);
        assert!(episode.observation().iter().all(|v| *v == 0.0));
    }

    #[test]
    fn begin_step_rejects_wrong_action_length() {
        let mut episode = Episode::new(4, 2, 100);
        episode.reset();
        let err = episode.begin_step(&[0.0; 3]).unwrap_err();
        assert_eq!(
            err,
            StepError::InvalidActionLength {
                expected: 2,
                got: 3
            }
        );
        assert_eq!(episode.move_number(), 0);
    }

    #[test]
    fn begin_step_rejects_done_episode() {
        let episode = Episode::new(4, 2, 100);
        assert_eq!(
            episode.begin_step(&[0.0; 2]),
            Err(StepError::EnvironmentDone)
        );
    }

    #[test]
    fn times_out_at_the_horizon() {
        let mut episode = Episode::new(1, 1, 3);
        episode.reset();
        for _ in 0..3 {
            assert!(!episode.timeout());
            episode.finish_step();
        }
        assert!(episode.timeout());
        assert!(!episode.done());
    }

    #[test]
    fn random_actions_stay_in_range() {
        let mut episode = Episode::new(1, 5, 10);
        for _ in 0..100 {
            let action = episode.random_action();
            assert_eq!(action.len(), 5);
            assert!(action.iter().all(|a| (-1.0..=1.0).contains(a)));
        }
    }
}

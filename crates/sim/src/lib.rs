#![deny(clippy::all, clippy::pedantic)]
#![allow(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::float_cmp,
    clippy::module_name_repetitions
)]

//! Simulation environments for articulated creatures.
//!
//! The crate composes three independently testable layers instead of an
//! inheritance chain: [`episode::Episode`] (generic episode lifecycle),
//! [`goal::GoalTracker`] (moving target, ego-centric kinematics, progress
//! reward) and [`creature::CreatureEnv`] (body construction, torque
//! actuation, observation assembly) on top of the [`world::PhysicsWorld`]
//! adapter that owns every rapier handle.

pub mod creature;
pub mod episode;
mod error;
pub mod goal;
pub mod world;

pub use creature::CreatureEnv;
pub use error::StepError;

/// Capability surface every trainable environment exposes to the driver.
///
/// `step` reports contract violations instead of recovering from them: a
/// wrong action length or a step after `done` indicates a bug in the
/// caller, not a runtime condition.
pub trait Env {
    /// Resets the episode and recomputes the observation from the fresh
    /// physical state.
    fn restart(&mut self);

    /// Applies one action, advances physics and returns the shaped reward.
    ///
    /// # Errors
    ///
    /// [`StepError::InvalidActionLength`] if the action's length does not
    /// match [`Env::action_len`], [`StepError::EnvironmentDone`] if called
    /// after the episode ended. State is untouched in both cases.
    fn step(&mut self, action: &[f32]) -> Result<f32, StepError>;

    /// The current observation vector.
    fn observation(&self) -> &[f32];

    fn done(&self) -> bool;

    /// True once the move counter reached the episode horizon. Distinct
    /// from [`Env::done`]: a timed-out episode must be restarted by the
    /// driver.
    fn timeout(&self) -> bool;

    fn action_len(&self) -> usize;

    /// Uniform random action in [-1, 1] per component, drawn from the
    /// environment's private random stream.
    fn random_action(&mut self) -> Vec<f32>;
}

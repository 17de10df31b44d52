#![deny(clippy::all, clippy::pedantic)]
#![allow(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::float_cmp,
    clippy::module_name_repetitions
)]

//! Off-policy training orchestration for creature environments.
//!
//! The crate is organized around one seam: [`Network`] is the only thing
//! it does not implement itself. Everything around the network is here:
//! transition collection ([`Coach`]), experience storage
//! ([`ReplayBuffer`]), exploration noise ([`noise::OuNoise`]), the
//! epoch/interval schedule ([`Scheduler`]) and checkpoint hand-off
//! ([`CheckpointSlot`]).

mod checkpoint;
#[allow(clippy::module_inception)]
mod coach;
pub mod config;
mod network;
pub mod noise;
mod replay;
mod sample;
mod schedule;

pub use checkpoint::CheckpointSlot;
pub use coach::Coach;
pub use config::{RunConfig, TrainConfig};
pub use network::{Losses, Network};
pub use replay::ReplayBuffer;
pub use sample::{Sample, SharedSample};
pub use schedule::{EpochStats, Scheduler};

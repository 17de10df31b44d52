#![deny(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

//! Process-level glue: the training document on disk, the stand-in
//! policy and the evaluation thread. The binary in `main.rs` wires these
//! to the trainer.

pub mod document;
pub mod policy;
pub mod tester;

pub use document::{Checkpoint, Document};
pub use policy::RandomPolicy;
pub use tester::Tester;

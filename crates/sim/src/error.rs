use thiserror::Error;

/// Contract violations at the environment boundary. Fatal for the driving
/// trainer; never retried.
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
pub enum StepError {
    #[error("invalid action length {got}, environment expects {expected}")]
    InvalidActionLength { expected: usize, got: usize },
    #[error("environment done")]
    EnvironmentDone,
}

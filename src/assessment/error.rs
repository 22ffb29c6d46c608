// src/assessment/error.rs

use thiserror::Error;

use super::{round::Round, weighting::Criterion};

/// A write was aimed at a round that no longer (or does not yet) accept answers.
///
/// Callers should re-sync from the server completion flags when they see this.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RoundLockedError {
    #[error("round '{0}' is already completed")]
    AlreadyCompleted(Round),

    #[error("round '{requested}' is not the current round (current: '{current}')")]
    NotCurrent { requested: Round, current: Round },

    #[error("attempt is finished; round '{0}' is locked")]
    AttemptFinished(Round),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionStartError {
    #[error("no valid attempt context to attach a proctoring session to")]
    MissingAttempt,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum VerdictError {
    #[error("subscore '{name}' must be within [0, 100], got {value}")]
    SubscoreOutOfRange { name: &'static str, value: f64 },
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum WeightingError {
    #[error("{0} must be between 0 and 100, got {1}")]
    OutOfRange(Criterion, f64),

    #[error("weights must sum to 100, got {0}")]
    BadTotal(f64),
}

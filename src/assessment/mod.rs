// src/assessment/mod.rs

//! Round orchestration, proctoring and scoring logic.
//!
//! Everything here is synchronous and storage-free; the HTTP layer feeds it
//! server state and persists what it returns.

pub mod error;
pub mod orchestrator;
pub mod proctor;
pub mod round;
pub mod verdict;
pub mod violation;
pub mod weighting;

pub use error::{RoundLockedError, SessionStartError, VerdictError, WeightingError};
pub use orchestrator::{Advance, CompletionFlags, Initialized, RoundOrchestrator, RoundSubmission};
pub use proctor::{DetectorSignal, ProctoringSession, SessionStatus, SessionSummary};
pub use round::{AnswerValue, QuestionId, Round, RoundProgress, RoundStatus};
pub use verdict::{Evaluation, Subscores, Verdict, VerdictCalculator, VerdictPolicy};
pub use violation::{Severity, ViolationAggregator, ViolationCounts, ViolationEvent, ViolationKind};
pub use weighting::{Criterion, EvaluationWeighting, WeightingRecord};

// src/store/mod.rs

//! Persistence boundary for the assessment core.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use crate::assessment::{
    AnswerValue, CompletionFlags, QuestionId, Round, RoundSubmission, SessionSummary,
    ViolationCounts, WeightingRecord,
};

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{0} not found")]
    NotFound(String),

    /// The write lost against state that is already committed.
    #[error("conflict: {0}")]
    Conflict(String),

    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionRecordStatus {
    Active,
    Completed,
}

impl SessionRecordStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            SessionRecordStatus::Active => "active",
            SessionRecordStatus::Completed => "completed",
        }
    }
}

/// A proctoring session as kept by the store.
#[derive(Debug, Clone, Serialize)]
pub struct ProctorSessionRecord {
    pub session_id: Uuid,
    pub candidate_id: i64,
    pub assessment_id: Option<i64>,
    pub status: SessionRecordStatus,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub event_count: i64,
    pub violation_counts: ViolationCounts,
}

impl ProctorSessionRecord {
    pub fn duration_minutes(&self) -> Option<f64> {
        let end = self.end_time?;
        let seconds = (end - self.start_time).num_seconds() as f64;
        Some((seconds / 60.0 * 100.0).round() / 100.0)
    }
}

#[async_trait]
pub trait AssessmentStore: Send + Sync {
    /// Authoritative round completion for a candidate's attempt.
    async fn completion_flags(&self, candidate_id: i64) -> Result<CompletionFlags, StoreError>;

    /// In-progress answers cached for `round`. Advisory only.
    async fn draft_answers(
        &self,
        candidate_id: i64,
        round: Round,
    ) -> Result<HashMap<QuestionId, AnswerValue>, StoreError>;

    async fn save_draft_answer(
        &self,
        candidate_id: i64,
        round: Round,
        question_id: QuestionId,
        value: &AnswerValue,
    ) -> Result<(), StoreError>;

    /// Stores the final payload and flips the round's completion flag in one
    /// unit. Fails with `Conflict` if the round was already completed.
    async fn submit_round_answers(
        &self,
        candidate_id: i64,
        submission: &RoundSubmission,
    ) -> Result<(), StoreError>;

    async fn open_proctor_session(
        &self,
        candidate_id: i64,
        session_id: Uuid,
        assessment_id: Option<i64>,
        started_at: DateTime<Utc>,
    ) -> Result<(), StoreError>;

    async fn close_proctor_session(&self, summary: &SessionSummary) -> Result<(), StoreError>;

    async fn proctor_session(
        &self,
        session_id: Uuid,
    ) -> Result<Option<ProctorSessionRecord>, StoreError>;

    /// Newest first.
    async fn candidate_sessions(
        &self,
        candidate_id: i64,
    ) -> Result<Vec<ProctorSessionRecord>, StoreError>;

    async fn weighting(&self, recruiter_id: i64) -> Result<Option<WeightingRecord>, StoreError>;

    async fn save_weighting(
        &self,
        recruiter_id: i64,
        record: &WeightingRecord,
    ) -> Result<(), StoreError>;
}

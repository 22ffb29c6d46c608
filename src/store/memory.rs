// src/store/memory.rs

use std::{
    collections::{BTreeMap, HashMap},
    sync::atomic::{AtomicBool, Ordering},
};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use uuid::Uuid;

use super::{AssessmentStore, ProctorSessionRecord, SessionRecordStatus, StoreError};
use crate::assessment::{
    AnswerValue, CompletionFlags, QuestionId, Round, RoundSubmission, SessionSummary,
    ViolationCounts, WeightingRecord,
};

#[derive(Debug, Default)]
struct CandidateState {
    flags: CompletionFlags,
    drafts: HashMap<Round, HashMap<QuestionId, AnswerValue>>,
    submitted: HashMap<Round, BTreeMap<QuestionId, Option<AnswerValue>>>,
}

#[derive(Debug, Default)]
struct State {
    candidates: HashMap<i64, CandidateState>,
    sessions: Vec<ProctorSessionRecord>,
    weightings: HashMap<i64, WeightingRecord>,
}

/// Process-local store. Used by the test suite and for running without a
/// database.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<State>,
    unavailable: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_candidates(ids: impl IntoIterator<Item = i64>) -> Self {
        let candidates = ids
            .into_iter()
            .map(|id| (id, CandidateState::default()))
            .collect();
        Self {
            state: Mutex::new(State {
                candidates,
                ..Default::default()
            }),
            unavailable: AtomicBool::new(false),
        }
    }

    pub async fn add_candidate(&self, candidate_id: i64, flags: CompletionFlags) {
        self.state.lock().await.candidates.insert(
            candidate_id,
            CandidateState {
                flags,
                ..Default::default()
            },
        );
    }

    /// Makes every write fail with `Unavailable`, as a dropped connection would.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    pub async fn submitted_answers(
        &self,
        candidate_id: i64,
        round: Round,
    ) -> Option<BTreeMap<QuestionId, Option<AnswerValue>>> {
        let state = self.state.lock().await;
        state
            .candidates
            .get(&candidate_id)
            .and_then(|c| c.submitted.get(&round).cloned())
    }

    fn check_available(&self) -> Result<(), StoreError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("memory store offline".to_string()));
        }
        Ok(())
    }
}

fn candidate_mut(state: &mut State, candidate_id: i64) -> Result<&mut CandidateState, StoreError> {
    state
        .candidates
        .get_mut(&candidate_id)
        .ok_or_else(|| StoreError::NotFound(format!("candidate {}", candidate_id)))
}

#[async_trait]
impl AssessmentStore for MemoryStore {
    async fn completion_flags(&self, candidate_id: i64) -> Result<CompletionFlags, StoreError> {
        let mut state = self.state.lock().await;
        Ok(candidate_mut(&mut state, candidate_id)?.flags)
    }

    async fn draft_answers(
        &self,
        candidate_id: i64,
        round: Round,
    ) -> Result<HashMap<QuestionId, AnswerValue>, StoreError> {
        let mut state = self.state.lock().await;
        let candidate = candidate_mut(&mut state, candidate_id)?;
        Ok(candidate.drafts.get(&round).cloned().unwrap_or_default())
    }

    async fn save_draft_answer(
        &self,
        candidate_id: i64,
        round: Round,
        question_id: QuestionId,
        value: &AnswerValue,
    ) -> Result<(), StoreError> {
        self.check_available()?;
        let mut state = self.state.lock().await;
        let candidate = candidate_mut(&mut state, candidate_id)?;
        if candidate.flags.is_completed(round) {
            return Err(StoreError::Conflict(format!("round {} already completed", round)));
        }
        candidate
            .drafts
            .entry(round)
            .or_default()
            .insert(question_id, value.clone());
        Ok(())
    }

    async fn submit_round_answers(
        &self,
        candidate_id: i64,
        submission: &RoundSubmission,
    ) -> Result<(), StoreError> {
        self.check_available()?;
        let mut state = self.state.lock().await;
        let candidate = candidate_mut(&mut state, candidate_id)?;
        if candidate.flags.is_completed(submission.round) {
            return Err(StoreError::Conflict(format!(
                "round {} already completed",
                submission.round
            )));
        }
        candidate.flags.mark_completed(submission.round);
        candidate.drafts.remove(&submission.round);
        candidate
            .submitted
            .insert(submission.round, submission.answers.clone());
        Ok(())
    }

    async fn open_proctor_session(
        &self,
        candidate_id: i64,
        session_id: Uuid,
        assessment_id: Option<i64>,
        started_at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        self.check_available()?;
        let mut state = self.state.lock().await;
        candidate_mut(&mut state, candidate_id)?;
        state.sessions.push(ProctorSessionRecord {
            session_id,
            candidate_id,
            assessment_id,
            status: SessionRecordStatus::Active,
            start_time: started_at,
            end_time: None,
            event_count: 0,
            violation_counts: ViolationCounts::default(),
        });
        Ok(())
    }

    async fn close_proctor_session(&self, summary: &SessionSummary) -> Result<(), StoreError> {
        let Some(session_id) = summary.session_id else {
            return Ok(());
        };
        self.check_available()?;
        let mut state = self.state.lock().await;
        let record = state
            .sessions
            .iter_mut()
            .find(|s| s.session_id == session_id)
            .ok_or_else(|| StoreError::NotFound(format!("proctor session {}", session_id)))?;
        record.status = SessionRecordStatus::Completed;
        record.end_time = Some(summary.ended_at);
        record.event_count = summary.event_count as i64;
        record.violation_counts = summary.counts();
        Ok(())
    }

    async fn proctor_session(
        &self,
        session_id: Uuid,
    ) -> Result<Option<ProctorSessionRecord>, StoreError> {
        let state = self.state.lock().await;
        Ok(state
            .sessions
            .iter()
            .find(|s| s.session_id == session_id)
            .cloned())
    }

    async fn candidate_sessions(
        &self,
        candidate_id: i64,
    ) -> Result<Vec<ProctorSessionRecord>, StoreError> {
        let state = self.state.lock().await;
        let mut sessions: Vec<_> = state
            .sessions
            .iter()
            .filter(|s| s.candidate_id == candidate_id)
            .cloned()
            .collect();
        sessions.sort_by(|a, b| b.start_time.cmp(&a.start_time));
        Ok(sessions)
    }

    async fn weighting(&self, recruiter_id: i64) -> Result<Option<WeightingRecord>, StoreError> {
        Ok(self.state.lock().await.weightings.get(&recruiter_id).copied())
    }

    async fn save_weighting(
        &self,
        recruiter_id: i64,
        record: &WeightingRecord,
    ) -> Result<(), StoreError> {
        self.check_available()?;
        self.state
            .lock()
            .await
            .weightings
            .insert(recruiter_id, *record);
        Ok(())
    }
}

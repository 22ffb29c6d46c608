// src/assessment/orchestrator.rs

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{
    error::RoundLockedError,
    round::{AnswerValue, QuestionId, Round, RoundProgress},
};

/// Authoritative per-round completion state, as read from the backing store.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletionFlags {
    pub mcq: bool,
    pub psychometric: bool,
    pub text_based: bool,
    pub coding: bool,
}

impl CompletionFlags {
    pub fn is_completed(&self, round: Round) -> bool {
        match round {
            Round::Mcq => self.mcq,
            Round::Psychometric => self.psychometric,
            Round::TextBased => self.text_based,
            Round::Coding => self.coding,
        }
    }

    pub fn mark_completed(&mut self, round: Round) {
        match round {
            Round::Mcq => self.mcq = true,
            Round::Psychometric => self.psychometric = true,
            Round::TextBased => self.text_based = true,
            Round::Coding => self.coding = true,
        }
    }

    pub fn all_completed(&self) -> bool {
        Round::ALL.iter().all(|r| self.is_completed(*r))
    }
}

/// Where the attempt goes after a round is completed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "round", rename_all = "snake_case")]
pub enum Advance {
    Next(Round),
    Finished,
}

/// The payload handed to the persistence layer when a round locks.
///
/// Every asked question appears in `answers`; unanswered ones map to `None`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RoundSubmission {
    pub round: Round,
    pub answers: BTreeMap<QuestionId, Option<AnswerValue>>,
    pub completed_at: DateTime<Utc>,
    pub advance: Advance,
}

impl RoundSubmission {
    pub fn unanswered(&self) -> impl Iterator<Item = QuestionId> + '_ {
        self.answers
            .iter()
            .filter(|(_, answer)| answer.is_none())
            .map(|(id, _)| *id)
    }
}

/// Result of deriving attempt state from completion flags.
#[derive(Debug)]
pub enum Initialized {
    Active(RoundOrchestrator),
    /// All four rounds are complete; the caller should leave the assessment.
    Finished,
}

impl Initialized {
    pub fn into_active(self) -> Option<RoundOrchestrator> {
        match self {
            Initialized::Active(orchestrator) => Some(orchestrator),
            Initialized::Finished => None,
        }
    }
}

/// Owns the four rounds of one candidate attempt and walks them in order.
///
/// `current` is always the first round that is not completed, and it is the
/// only round in progress.
#[derive(Debug, Clone)]
pub struct RoundOrchestrator {
    rounds: [RoundProgress; 4],
    current: Option<Round>,
}

impl RoundOrchestrator {
    fn fresh() -> Self {
        Self {
            rounds: Round::ALL.map(RoundProgress::new),
            current: None,
        }
    }

    /// Builds attempt state from the server's completion flags.
    pub fn initialize(flags: CompletionFlags) -> Initialized {
        Self::initialize_at(flags, Utc::now())
    }

    fn initialize_at(flags: CompletionFlags, now: DateTime<Utc>) -> Initialized {
        if flags.all_completed() {
            return Initialized::Finished;
        }
        let mut orchestrator = Self::fresh();
        orchestrator.reconcile_at(flags, now);
        Initialized::Active(orchestrator)
    }

    /// Rebuilds state after a reload. Only the flags decide sequencing; cached
    /// answers are carried over for the round that is still current.
    pub fn resume(flags: CompletionFlags, cached: &RoundOrchestrator) -> Initialized {
        let mut orchestrator = match Self::initialize(flags) {
            Initialized::Active(orchestrator) => orchestrator,
            Initialized::Finished => return Initialized::Finished,
        };
        if let Some(current) = orchestrator.current {
            let stale = cached.progress(current);
            if !stale.is_completed() {
                let progress = &mut orchestrator.rounds[current.index()];
                for (question_id, value) in stale.answers() {
                    if let Err(e) = progress.upsert(*question_id, value.clone()) {
                        tracing::warn!(
                            %current,
                            question_id = *question_id,
                            "dropping cached answer: {}",
                            e
                        );
                    }
                }
            }
        }
        Initialized::Active(orchestrator)
    }

    /// Applies server completion flags. Completion only ever moves forward:
    /// flagged rounds lock, locally completed rounds stay locked.
    pub fn reconcile(&mut self, flags: CompletionFlags) {
        self.reconcile_at(flags, Utc::now());
    }

    fn reconcile_at(&mut self, flags: CompletionFlags, now: DateTime<Utc>) {
        for progress in &mut self.rounds {
            if flags.is_completed(progress.round()) && !progress.is_completed() {
                tracing::debug!(round = %progress.round(), "round completed on server, locking");
                progress.lock(now);
            }
        }
        self.advance_to_first_open(now);
    }

    fn advance_to_first_open(&mut self, now: DateTime<Utc>) -> Advance {
        self.current = self
            .rounds
            .iter()
            .find(|p| !p.is_completed())
            .map(RoundProgress::round);

        match self.current {
            Some(round) => {
                self.rounds[round.index()].begin(now);
                Advance::Next(round)
            }
            None => Advance::Finished,
        }
    }

    pub fn current_round(&self) -> Option<Round> {
        self.current
    }

    pub fn is_finished(&self) -> bool {
        self.current.is_none()
    }

    pub fn progress(&self, round: Round) -> &RoundProgress {
        &self.rounds[round.index()]
    }

    pub fn rounds(&self) -> &[RoundProgress] {
        &self.rounds
    }

    fn ensure_current(&self, round: Round) -> Result<(), RoundLockedError> {
        if self.progress(round).is_completed() {
            return Err(RoundLockedError::AlreadyCompleted(round));
        }
        match self.current {
            None => Err(RoundLockedError::AttemptFinished(round)),
            Some(current) if current != round => Err(RoundLockedError::NotCurrent {
                requested: round,
                current,
            }),
            Some(_) => Ok(()),
        }
    }

    pub fn record_answer(
        &mut self,
        round: Round,
        question_id: QuestionId,
        value: AnswerValue,
    ) -> Result<(), RoundLockedError> {
        self.ensure_current(round)?;
        self.rounds[round.index()].upsert(question_id, value)
    }

    /// Candidate-submitted completion. `final_answers` override anything
    /// recorded earlier for the same question.
    pub fn complete_round(
        &mut self,
        round: Round,
        question_ids: &[QuestionId],
        final_answers: HashMap<QuestionId, AnswerValue>,
    ) -> Result<RoundSubmission, RoundLockedError> {
        self.ensure_current(round)?;
        let progress = &mut self.rounds[round.index()];
        for (question_id, value) in final_answers {
            progress.upsert(question_id, value)?;
        }
        Ok(self.finish_round(round, question_ids, Utc::now()))
    }

    /// Forced completion (time expiry). Only answers already recorded count;
    /// everything else is submitted as not attempted.
    pub fn force_complete(
        &mut self,
        round: Round,
        question_ids: &[QuestionId],
    ) -> Result<RoundSubmission, RoundLockedError> {
        self.ensure_current(round)?;
        tracing::info!(%round, "forcing round completion");
        Ok(self.finish_round(round, question_ids, Utc::now()))
    }

    /// Locks `round` and moves `current` on. Infallible so the two steps
    /// cannot be separated.
    fn finish_round(
        &mut self,
        round: Round,
        question_ids: &[QuestionId],
        now: DateTime<Utc>,
    ) -> RoundSubmission {
        let progress = &mut self.rounds[round.index()];

        let mut answers: BTreeMap<QuestionId, Option<AnswerValue>> = question_ids
            .iter()
            .map(|id| (*id, progress.answers().get(id).cloned()))
            .collect();
        for (id, value) in progress.answers() {
            answers.entry(*id).or_insert_with(|| Some(value.clone()));
        }

        progress.lock(now);
        let advance = self.advance_to_first_open(now);

        RoundSubmission {
            round,
            answers,
            completed_at: now,
            advance,
        }
    }
}

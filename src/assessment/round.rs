// src/assessment/round.rs

use std::{collections::HashMap, fmt};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::error::RoundLockedError;

pub type QuestionId = i64;

/// The four assessment rounds, declared in their fixed order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Round {
    Mcq,
    Psychometric,
    TextBased,
    Coding,
}

impl Round {
    pub const ALL: [Round; 4] = [
        Round::Mcq,
        Round::Psychometric,
        Round::TextBased,
        Round::Coding,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    /// The round after this one, or `None` for the last round.
    pub fn next(self) -> Option<Round> {
        Self::ALL.get(self.index() + 1).copied()
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Round::Mcq => "mcq",
            Round::Psychometric => "psychometric",
            Round::TextBased => "text_based",
            Round::Coding => "coding",
        }
    }

    /// Whether an answer of this shape belongs in this round.
    pub fn accepts(self, value: &AnswerValue) -> bool {
        matches!(
            (self, value),
            (Round::Mcq, AnswerValue::Choice(_))
                | (Round::Psychometric, AnswerValue::Scale(1..=5))
                | (Round::TextBased, AnswerValue::Text(_))
                | (Round::Coding, AnswerValue::Text(_))
        )
    }
}

impl fmt::Display for Round {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoundStatus {
    NotStarted,
    InProgress,
    Completed,
}

/// A candidate's answer to one question.
///
/// Wire shape: `{"kind": "choice", "value": 2}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum AnswerValue {
    /// Option index for multiple-choice questions.
    Choice(u32),
    /// Likert value for psychometric items.
    Scale(u8),
    /// Free text, or source code in the coding round.
    Text(String),
}

/// Progress through a single round.
///
/// `completed_at` is set exactly when the status is `Completed`; once
/// completed the answers are frozen and writes fail with `RoundLockedError`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RoundProgress {
    round: Round,
    status: RoundStatus,
    answers: HashMap<QuestionId, AnswerValue>,
    started_at: Option<DateTime<Utc>>,
    completed_at: Option<DateTime<Utc>>,
}

impl RoundProgress {
    pub fn new(round: Round) -> Self {
        Self {
            round,
            status: RoundStatus::NotStarted,
            answers: HashMap::new(),
            started_at: None,
            completed_at: None,
        }
    }

    pub fn round(&self) -> Round {
        self.round
    }

    pub fn status(&self) -> RoundStatus {
        self.status
    }

    pub fn answers(&self) -> &HashMap<QuestionId, AnswerValue> {
        &self.answers
    }

    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        self.started_at
    }

    pub fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.completed_at
    }

    pub fn is_completed(&self) -> bool {
        self.status == RoundStatus::Completed
    }

    /// Moves a not-started round into progress. No-op otherwise.
    pub(crate) fn begin(&mut self, now: DateTime<Utc>) {
        if self.status == RoundStatus::NotStarted {
            self.status = RoundStatus::InProgress;
            self.started_at = Some(now);
        }
    }

    pub(crate) fn upsert(
        &mut self,
        question_id: QuestionId,
        value: AnswerValue,
    ) -> Result<(), RoundLockedError> {
        if self.is_completed() {
            return Err(RoundLockedError::AlreadyCompleted(self.round));
        }
        self.answers.insert(question_id, value);
        Ok(())
    }

    /// Freezes the round. The caller has already checked it was not completed.
    pub(crate) fn lock(&mut self, now: DateTime<Utc>) {
        self.started_at.get_or_insert(now);
        self.status = RoundStatus::Completed;
        self.completed_at = Some(now);
    }
}

// src/models/round.rs

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::assessment::{AnswerValue, QuestionId, RoundProgress, RoundStatus};

/// Upper bound on a single free-text or coding answer.
const MAX_TEXT_ANSWER_LEN: usize = 20_000;

/// DTO for recording one answer while a round is in progress.
#[derive(Debug, Deserialize, Validate)]
pub struct RecordAnswerRequest {
    #[validate(custom(function = validate_answer))]
    pub value: AnswerValue,
}

/// DTO for a candidate-submitted round.
#[derive(Debug, Deserialize, Validate)]
pub struct CompleteRoundRequest {
    /// Every question served in the round, answered or not.
    #[validate(length(min = 1, max = 500, message = "A round must list its questions."))]
    pub question_ids: Vec<QuestionId>,

    /// Final answers; they override anything recorded earlier.
    #[serde(default)]
    #[validate(custom(function = validate_answer_map))]
    pub answers: HashMap<QuestionId, AnswerValue>,
}

/// DTO for a round whose timer ran out.
#[derive(Debug, Deserialize, Validate)]
pub struct ExpireRoundRequest {
    #[validate(length(min = 1, max = 500, message = "A round must list its questions."))]
    pub question_ids: Vec<QuestionId>,
}

/// One row of the round status overview.
#[derive(Debug, Serialize)]
pub struct RoundView {
    pub round: String,
    pub status: RoundStatus,
    pub answered: usize,
    pub started_at: Option<chrono::DateTime<chrono::Utc>>,
    pub completed_at: Option<chrono::DateTime<chrono::Utc>>,
}

impl From<&RoundProgress> for RoundView {
    fn from(progress: &RoundProgress) -> Self {
        Self {
            round: progress.round().as_str().to_string(),
            status: progress.status(),
            answered: progress.answers().len(),
            started_at: progress.started_at(),
            completed_at: progress.completed_at(),
        }
    }
}

fn validate_answer(value: &AnswerValue) -> Result<(), validator::ValidationError> {
    if let AnswerValue::Text(text) = value {
        if text.len() > MAX_TEXT_ANSWER_LEN {
            return Err(validator::ValidationError::new("answer_too_long"));
        }
    }
    Ok(())
}

fn validate_answer_map(
    answers: &HashMap<QuestionId, AnswerValue>,
) -> Result<(), validator::ValidationError> {
    answers.values().try_for_each(validate_answer)
}

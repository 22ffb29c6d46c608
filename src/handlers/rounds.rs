// src/handlers/rounds.rs

use std::collections::HashMap;

use axum::{
    Extension, Json,
    extract::{Path, State},
    response::IntoResponse,
};
use validator::Validate;

use crate::{
    assessment::{
        AnswerValue, Initialized, QuestionId, Round, RoundLockedError, RoundOrchestrator,
        RoundStatus,
    },
    error::AppError,
    models::round::{CompleteRoundRequest, ExpireRoundRequest, RecordAnswerRequest, RoundView},
    state::AppState,
    store::AssessmentStore,
    utils::{html::clean_html, jwt::Claims},
};

/// Rebuilds the candidate's attempt from server flags and hydrates the current
/// round with cached drafts. `None` once every round is completed.
pub(crate) async fn load_orchestrator(
    store: &dyn AssessmentStore,
    candidate_id: i64,
) -> Result<Option<RoundOrchestrator>, AppError> {
    let flags = store.completion_flags(candidate_id).await?;
    let mut orchestrator = match RoundOrchestrator::initialize(flags) {
        Initialized::Active(orchestrator) => orchestrator,
        Initialized::Finished => return Ok(None),
    };

    if let Some(current) = orchestrator.current_round() {
        let drafts = store.draft_answers(candidate_id, current).await?;
        for (question_id, value) in drafts {
            orchestrator.record_answer(current, question_id, value)?;
        }
    }
    Ok(Some(orchestrator))
}

pub(crate) fn round_views(orchestrator: Option<&RoundOrchestrator>) -> Vec<RoundView> {
    match orchestrator {
        Some(orchestrator) => orchestrator.rounds().iter().map(RoundView::from).collect(),
        None => Round::ALL
            .into_iter()
            .map(|round| RoundView {
                round: round.as_str().to_string(),
                status: RoundStatus::Completed,
                answered: 0,
                started_at: None,
                completed_at: None,
            })
            .collect(),
    }
}

/// Checks the answer kind against the round and sanitizes free text.
fn prepare_answer(round: Round, value: AnswerValue) -> Result<AnswerValue, AppError> {
    if !round.accepts(&value) {
        return Err(AppError::BadRequest(format!(
            "Answer does not fit the {} round",
            round
        )));
    }
    Ok(match (round, value) {
        (Round::TextBased, AnswerValue::Text(text)) => AnswerValue::Text(clean_html(&text)),
        (_, value) => value,
    })
}

async fn active_orchestrator(
    state: &AppState,
    candidate_id: i64,
    round: Round,
) -> Result<RoundOrchestrator, AppError> {
    load_orchestrator(state.store.as_ref(), candidate_id)
        .await?
        .ok_or_else(|| RoundLockedError::AttemptFinished(round).into())
}

/// Current round, finished flag and per-round status.
pub async fn round_status(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let orchestrator = load_orchestrator(state.store.as_ref(), claims.user_id()).await?;

    Ok(Json(serde_json::json!({
        "finished": orchestrator.is_none(),
        "current_round": orchestrator.as_ref().and_then(RoundOrchestrator::current_round),
        "rounds": round_views(orchestrator.as_ref()),
    })))
}

/// Records one answer in the current round's draft cache.
pub async fn record_answer(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path((round, question_id)): Path<(Round, QuestionId)>,
    Json(req): Json<RecordAnswerRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(e) = req.validate() {
        return Err(AppError::BadRequest(e.to_string()));
    }
    let candidate_id = claims.user_id();
    let value = prepare_answer(round, req.value)?;

    let mut orchestrator = active_orchestrator(&state, candidate_id, round).await?;
    orchestrator.record_answer(round, question_id, value.clone())?;

    state
        .store
        .save_draft_answer(candidate_id, round, question_id, &value)
        .await
        .map_err(|e| {
            tracing::error!("Failed to cache answer for candidate {}: {:?}", candidate_id, e);
            AppError::from(e)
        })?;

    Ok(Json(serde_json::json!({
        "round": round,
        "question_id": question_id,
        "answered": orchestrator.progress(round).answers().len(),
    })))
}

/// Candidate-submitted completion of the current round.
pub async fn complete_round(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(round): Path<Round>,
    Json(req): Json<CompleteRoundRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(e) = req.validate() {
        return Err(AppError::BadRequest(e.to_string()));
    }
    let candidate_id = claims.user_id();

    let answers = req
        .answers
        .into_iter()
        .map(|(question_id, value)| prepare_answer(round, value).map(|value| (question_id, value)))
        .collect::<Result<HashMap<_, _>, AppError>>()?;

    let mut orchestrator = active_orchestrator(&state, candidate_id, round).await?;
    let submission = orchestrator.complete_round(round, &req.question_ids, answers)?;

    state
        .store
        .submit_round_answers(candidate_id, &submission)
        .await?;

    tracing::info!(
        candidate_id,
        %round,
        unanswered = submission.unanswered().count(),
        "round submitted"
    );

    Ok(Json(submission))
}

/// Time ran out: locks the round with whatever was recorded so far.
pub async fn expire_round(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(round): Path<Round>,
    Json(req): Json<ExpireRoundRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(e) = req.validate() {
        return Err(AppError::BadRequest(e.to_string()));
    }
    let candidate_id = claims.user_id();

    let mut orchestrator = active_orchestrator(&state, candidate_id, round).await?;
    let submission = orchestrator.force_complete(round, &req.question_ids)?;

    state
        .store
        .submit_round_answers(candidate_id, &submission)
        .await?;

    Ok(Json(submission))
}

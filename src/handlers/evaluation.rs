// src/handlers/evaluation.rs

use axum::{
    Extension, Json,
    extract::{Path, State},
    response::IntoResponse,
};
use validator::Validate;

use crate::{
    assessment::{EvaluationWeighting, Subscores, VerdictCalculator, WeightingRecord},
    error::AppError,
    models::evaluation::{AdjustRequest, CriteriaRequest, VerdictRequest},
    state::AppState,
    store::SessionRecordStatus,
    utils::jwt::Claims,
};

async fn current_record(state: &AppState, recruiter_id: i64) -> Result<WeightingRecord, AppError> {
    Ok(state
        .store
        .weighting(recruiter_id)
        .await?
        .unwrap_or_else(WeightingRecord::defaults))
}

/// Returns the recruiter's saved weighting, or the defaults.
pub async fn get_criteria(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let record = current_record(&state, claims.user_id()).await?;
    Ok(Json(record))
}

pub async fn update_criteria(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<CriteriaRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(e) = req.validate() {
        return Err(AppError::BadRequest(e.to_string()));
    }
    let record = req.into_record();
    record.validate()?;

    state
        .store
        .save_weighting(claims.user_id(), &record)
        .await
        .map_err(|e| {
            tracing::error!("Failed to save evaluation criteria: {:?}", e);
            AppError::from(e)
        })?;

    Ok(Json(serde_json::json!({
        "message": "Evaluation criteria saved",
        "criteria": record,
    })))
}

pub async fn reset_criteria(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let current = current_record(&state, claims.user_id()).await?;
    let mut weighting = EvaluationWeighting::from_record(current);
    weighting.reset();
    let record = weighting.to_record();

    state.store.save_weighting(claims.user_id(), &record).await?;

    Ok(Json(serde_json::json!({
        "message": "Evaluation criteria reset to defaults",
        "criteria": record,
    })))
}

/// Applies one edit to a client-held editing session. Nothing is saved.
///
/// The echoed weights must already be a valid record.
pub async fn adjust_criteria(
    Json(req): Json<AdjustRequest>,
) -> Result<impl IntoResponse, AppError> {
    req.weights.validate()?;
    let mut weighting = EvaluationWeighting::with_locked(req.weights, &req.locked);
    weighting.edit(req.field, req.value);

    Ok(Json(serde_json::json!({
        "weights": weighting.to_record(),
        "locked": weighting.locked(),
        "total": weighting.total(),
    })))
}

/// Overall score and hire verdict for a candidate under the recruiter's weighting.
pub async fn verdict(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(candidate_id): Path<i64>,
    Json(req): Json<VerdictRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(e) = req.validate() {
        return Err(AppError::BadRequest(e.to_string()));
    }

    let fairplay = match req.fairplay {
        Some(fairplay) => fairplay,
        None => state
            .store
            .candidate_sessions(candidate_id)
            .await?
            .into_iter()
            .find(|s| s.status == SessionRecordStatus::Completed)
            .map(|s| s.violation_counts.fairplay_score())
            .ok_or_else(|| {
                AppError::BadRequest(
                    "No completed proctoring session; fairplay must be supplied".to_string(),
                )
            })?,
    };

    let subscores = Subscores {
        technical: req.technical,
        psychometric: req.psychometric,
        soft_skill: req.soft_skill,
        fairplay,
    };
    let weighting =
        EvaluationWeighting::from_record(current_record(&state, claims.user_id()).await?);
    let evaluation =
        VerdictCalculator::new(state.config.verdict_policy()).evaluate(&weighting, &subscores)?;

    tracing::info!(
        candidate_id,
        overall = evaluation.overall,
        verdict = ?evaluation.verdict,
        "verdict computed"
    );

    Ok(Json(serde_json::json!({
        "candidate_id": candidate_id,
        "subscores": subscores,
        "overall": evaluation.overall,
        "verdict": evaluation.verdict,
    })))
}

// src/handlers/attempt.rs

use axum::{Extension, Json, extract::State, response::IntoResponse};

use crate::{
    error::AppError,
    handlers::{
        proctor::{close_session, open_session},
        rounds::{load_orchestrator, round_views},
    },
    models::proctor::StartSessionRequest,
    state::AppState,
    utils::jwt::Claims,
};

/// Enters the assessment: opens proctoring and derives round state together.
///
/// An attempt that turns out to be finished closes the session it just opened.
pub async fn start_attempt(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<StartSessionRequest>,
) -> Result<impl IntoResponse, AppError> {
    let candidate_id = claims.user_id();

    let (opened, orchestrator) = tokio::join!(
        open_session(&state, candidate_id, req.assessment_id),
        load_orchestrator(state.store.as_ref(), candidate_id),
    );

    let orchestrator = match orchestrator {
        Ok(orchestrator) => orchestrator,
        Err(e) => {
            if opened.is_ok() {
                let _ = close_session(&state, candidate_id).await;
            }
            return Err(e);
        }
    };
    let session_id = opened?;

    let Some(orchestrator) = orchestrator else {
        tracing::info!(candidate_id, "attempt already finished, closing session");
        close_session(&state, candidate_id).await?;
        return Ok(Json(serde_json::json!({
            "session_id": null,
            "current_round": null,
            "finished": true,
            "rounds": round_views(None),
        })));
    };

    Ok(Json(serde_json::json!({
        "session_id": session_id,
        "current_round": orchestrator.current_round(),
        "finished": false,
        "rounds": round_views(Some(&orchestrator)),
    })))
}

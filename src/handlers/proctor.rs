// src/handlers/proctor.rs

use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::Utc;
use uuid::Uuid;
use validator::Validate;

use crate::{
    assessment::{ProctoringSession, SessionStatus, SessionSummary, Severity, ViolationKind},
    error::AppError,
    models::proctor::{LogViolationRequest, SessionReport, SignalRequest, StartSessionRequest},
    state::AppState,
    store::StoreError,
    utils::jwt::Claims,
};

/// Sends `summaries` to the store in order. On the first failure that
/// summary and everything after it are parked in the candidate's slot.
async fn persist_summaries(
    state: &AppState,
    candidate_id: i64,
    summaries: Vec<SessionSummary>,
) -> Result<(), StoreError> {
    let mut pending = summaries.into_iter();
    while let Some(summary) = pending.next() {
        if let Err(e) = state.store.close_proctor_session(&summary).await {
            let mut sessions = state.proctor.lock().await;
            let slot = sessions.entry(candidate_id).or_default();
            slot.unsent.push(summary);
            slot.unsent.extend(pending);
            return Err(e);
        }
    }
    Ok(())
}

/// Aborts `session_id` if it is still the live session, dropping the slot
/// when nothing else is left in it.
async fn abort_session(state: &AppState, candidate_id: i64, session_id: Uuid) {
    let mut sessions = state.proctor.lock().await;
    if let Some(slot) = sessions.get_mut(&candidate_id) {
        if slot.session.accepts(session_id) {
            slot.session.abort();
        }
        if slot.is_vacant() {
            sessions.remove(&candidate_id);
        }
    }
}

/// Starts (or restarts) the candidate's proctoring session and registers it
/// with the store.
///
/// Parked summaries are flushed first and a replaced session is persisted
/// before the new one counts. Any store failure leaves no new session
/// running and loses no summary.
pub(crate) async fn open_session(
    state: &AppState,
    candidate_id: i64,
    assessment_id: Option<i64>,
) -> Result<Uuid, AppError> {
    let parked = {
        let mut sessions = state.proctor.lock().await;
        sessions
            .get_mut(&candidate_id)
            .map(|slot| std::mem::take(&mut slot.unsent))
            .unwrap_or_default()
    };
    if !parked.is_empty() {
        tracing::info!(candidate_id, count = parked.len(), "retrying parked summaries");
        persist_summaries(state, candidate_id, parked).await?;
    }

    let (session_id, started_at, replaced) = {
        let mut sessions = state.proctor.lock().await;
        let slot = sessions.entry(candidate_id).or_default();
        let replaced = slot.session.is_active().then(|| slot.session.end());
        let session_id = match slot.session.start(candidate_id) {
            Ok(session_id) => session_id,
            Err(e) => {
                slot.unsent.extend(replaced);
                return Err(e.into());
            }
        };
        (
            session_id,
            slot.session.started_at().unwrap_or_else(Utc::now),
            replaced,
        )
    };

    if let Some(summary) = replaced {
        if let Err(e) = persist_summaries(state, candidate_id, vec![summary]).await {
            tracing::error!(
                "Failed to close replaced session for candidate {}: {:?}",
                candidate_id,
                e
            );
            abort_session(state, candidate_id, session_id).await;
            return Err(e.into());
        }
    }

    if let Err(e) = state
        .store
        .open_proctor_session(candidate_id, session_id, assessment_id, started_at)
        .await
    {
        tracing::error!("Failed to register proctoring session {}: {:?}", session_id, e);
        abort_session(state, candidate_id, session_id).await;
        return Err(e.into());
    }

    tracing::info!(candidate_id, %session_id, "proctoring session started");
    Ok(session_id)
}

/// Ends the candidate's session locally, then persists its summary along
/// with any parked ones.
///
/// The local session is idle even when the store write fails; the summary
/// then comes back with the 503 and is retried on the next call.
pub(crate) async fn close_session(
    state: &AppState,
    candidate_id: i64,
) -> Result<SessionSummary, AppError> {
    let (summary, mut pending) = {
        let mut sessions = state.proctor.lock().await;
        match sessions.get_mut(&candidate_id) {
            Some(slot) => {
                let mut pending = std::mem::take(&mut slot.unsent);
                let summary = if slot.session.is_active() {
                    slot.session.end()
                } else {
                    pending.pop().unwrap_or_else(|| slot.session.end())
                };
                (summary, pending)
            }
            None => (ProctoringSession::new().end(), Vec::new()),
        }
    };

    let Some(session_id) = summary.session_id else {
        return Ok(summary);
    };

    pending.push(summary.clone());
    if let Err(e) = persist_summaries(state, candidate_id, pending).await {
        tracing::error!("Failed to persist session {} summary: {:?}", session_id, e);
        return Err(AppError::SummaryNotPersisted(e.to_string(), Box::new(summary)));
    }

    {
        let mut sessions = state.proctor.lock().await;
        if sessions.get(&candidate_id).is_some_and(|slot| slot.is_vacant()) {
            sessions.remove(&candidate_id);
        }
    }

    tracing::info!(
        candidate_id,
        %session_id,
        events = summary.event_count,
        "proctoring session ended"
    );
    Ok(summary)
}

pub async fn start_session(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<StartSessionRequest>,
) -> Result<impl IntoResponse, AppError> {
    let session_id = open_session(&state, claims.user_id(), req.assessment_id).await?;

    Ok(Json(serde_json::json!({
        "session_id": session_id,
        "status": SessionStatus::Active,
    })))
}

pub async fn end_session(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let summary = close_session(&state, claims.user_id()).await?;

    // Scores only describe a session that actually ran.
    if summary.session_id.is_none() {
        return Ok(Json(serde_json::json!({ "summary": summary })));
    }

    let counts = summary.counts();
    Ok(Json(serde_json::json!({
        "summary": summary,
        "risk_score": counts.risk_score(),
        "fairplay_score": counts.fairplay_score(),
    })))
}

/// Detector report. Always 202; `recorded` tells whether the live session
/// with the given id took it.
pub async fn log_violation(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<LogViolationRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(e) = req.validate() {
        return Err(AppError::BadRequest(e.to_string()));
    }
    let candidate_id = claims.user_id();
    let kind = ViolationKind::from(req.r#type);
    let severity = kind.severity();

    let session_id = req.session_id;

    let recorded = {
        let mut sessions = state.proctor.lock().await;
        match sessions.get_mut(&candidate_id) {
            Some(slot) if slot.session.accepts(session_id) => {
                slot.session.record_violation(kind.clone(), req.details)
            }
            _ => false,
        }
    };

    if recorded {
        let tag = kind.as_tag();
        match severity {
            Severity::High => {
                tracing::warn!(candidate_id, %session_id, kind = tag, "violation")
            }
            Severity::Medium => {
                tracing::info!(candidate_id, %session_id, kind = tag, "violation")
            }
            Severity::Low => {
                tracing::debug!(candidate_id, %session_id, kind = tag, "violation")
            }
        }
    } else {
        tracing::debug!(candidate_id, %session_id, "violation for a session that is not live");
    }

    Ok((
        StatusCode::ACCEPTED,
        Json(serde_json::json!({
            "recorded": recorded,
            "severity": severity,
        })),
    ))
}

/// Advisory detector status; never gates recording.
pub async fn signal(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<SignalRequest>,
) -> Result<impl IntoResponse, AppError> {
    let mut sessions = state.proctor.lock().await;
    let status = match sessions.get_mut(&claims.user_id()) {
        Some(slot) => {
            slot.session.signal(req.signal);
            slot.session.status()
        }
        None => SessionStatus::Idle,
    };

    Ok(Json(serde_json::json!({ "status": status })))
}

/// Recruiter view of one stored session.
pub async fn get_session(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let record = state
        .store
        .proctor_session(session_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Proctoring session not found".to_string()))?;

    Ok(Json(SessionReport::from(record)))
}

pub async fn candidate_sessions(
    State(state): State<AppState>,
    Path(candidate_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let sessions: Vec<SessionReport> = state
        .store
        .candidate_sessions(candidate_id)
        .await?
        .into_iter()
        .map(SessionReport::from)
        .collect();

    Ok(Json(sessions))
}

// src/models/proctor.rs

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::{assessment::ViolationCounts, store::ProctorSessionRecord};

/// Detector tags are lowercase snake_case words.
static VIOLATION_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z][a-z0-9_]*$").unwrap());

#[derive(Debug, Default, Deserialize)]
pub struct StartSessionRequest {
    pub assessment_id: Option<i64>,
}

/// DTO for a detector-reported violation.
#[derive(Debug, Deserialize, Validate)]
pub struct LogViolationRequest {
    #[validate(length(min = 1, max = 64), regex(path = *VIOLATION_TAG))]
    pub r#type: String,

    /// Session the detector was started under. Stale ids are ignored.
    pub session_id: Uuid,

    #[serde(default)]
    #[validate(custom(function = validate_details_size))]
    pub details: serde_json::Value,
}

/// Keeps detector diagnostics small; they are stored verbatim.
fn validate_details_size(details: &serde_json::Value) -> Result<(), validator::ValidationError> {
    if details.to_string().len() > 4096 {
        return Err(validator::ValidationError::new("details_too_large"));
    }
    Ok(())
}

#[derive(Debug, Deserialize)]
pub struct SignalRequest {
    pub signal: crate::assessment::DetectorSignal,
}

/// Recruiter view of a proctoring session.
#[derive(Debug, Serialize)]
pub struct SessionReport {
    pub session_id: Uuid,
    pub candidate_id: i64,
    pub assessment_id: Option<i64>,
    pub status: String,
    pub start_time: chrono::DateTime<chrono::Utc>,
    pub end_time: Option<chrono::DateTime<chrono::Utc>>,
    pub duration_minutes: Option<f64>,
    pub event_count: i64,
    pub violation_counts: ViolationCounts,
    pub risk_score: u32,
    pub fairplay_score: f64,
}

impl From<ProctorSessionRecord> for SessionReport {
    fn from(record: ProctorSessionRecord) -> Self {
        Self {
            duration_minutes: record.duration_minutes(),
            risk_score: record.violation_counts.risk_score(),
            fairplay_score: record.violation_counts.fairplay_score(),
            session_id: record.session_id,
            candidate_id: record.candidate_id,
            assessment_id: record.assessment_id,
            status: record.status.as_str().to_string(),
            start_time: record.start_time,
            end_time: record.end_time,
            event_count: record.event_count,
            violation_counts: record.violation_counts,
        }
    }
}

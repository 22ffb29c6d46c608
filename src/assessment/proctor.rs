// src/assessment/proctor.rs

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{
    error::SessionStartError,
    violation::{ViolationAggregator, ViolationCounts, ViolationEvent, ViolationKind},
};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    #[default]
    Idle,
    Active,
    /// Alerting only; events are still accepted.
    Warning,
    Error,
}

/// Latest state reported by a detector. Drives the advisory status only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DetectorSignal {
    Alert,
    Clear,
    Fault,
}

/// What `ProctoringSession::end` hands back for transmission.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionSummary {
    pub session_id: Option<Uuid>,
    pub attempt_id: Option<i64>,
    pub event_count: usize,
    /// Empty when no session was ever started.
    pub counts_by_type: BTreeMap<String, u32>,
    pub started_at: Option<DateTime<Utc>>,
    pub ended_at: DateTime<Utc>,
}

impl SessionSummary {
    pub fn counts(&self) -> ViolationCounts {
        ViolationCounts::from(self.counts_by_type.clone())
    }
}

/// One monitoring session bound to one candidate attempt.
///
/// Violations are kept as an append-only log and only folded into counts at
/// `end`. Writes without a live `session_id` are dropped.
#[derive(Debug, Default)]
pub struct ProctoringSession {
    session_id: Option<Uuid>,
    attempt_id: Option<i64>,
    status: SessionStatus,
    events: Vec<ViolationEvent>,
    started_at: Option<DateTime<Utc>>,
}

impl ProctoringSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Opens a session for `attempt_id` and returns a fresh session id.
    ///
    /// Calling it again replaces the running session and empties the log.
    pub fn start(&mut self, attempt_id: i64) -> Result<Uuid, SessionStartError> {
        if attempt_id <= 0 {
            return Err(SessionStartError::MissingAttempt);
        }
        if let Some(previous) = self.session_id {
            tracing::debug!(%previous, attempt_id, "replacing running proctoring session");
        }

        let session_id = Uuid::new_v4();
        self.session_id = Some(session_id);
        self.attempt_id = Some(attempt_id);
        self.status = SessionStatus::Active;
        self.events.clear();
        self.started_at = Some(Utc::now());
        Ok(session_id)
    }

    pub fn session_id(&self) -> Option<Uuid> {
        self.session_id
    }

    pub fn attempt_id(&self) -> Option<i64> {
        self.attempt_id
    }

    pub fn status(&self) -> SessionStatus {
        self.status
    }

    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        self.started_at
    }

    pub fn events(&self) -> &[ViolationEvent] {
        &self.events
    }

    pub fn is_active(&self) -> bool {
        self.session_id.is_some()
    }

    /// Whether writes tagged with `session_id` belong to the live session.
    pub fn accepts(&self, session_id: Uuid) -> bool {
        self.session_id == Some(session_id)
    }

    /// Appends a violation. Returns `false` (and records nothing) when no
    /// session is running; detectors may fire before start completes.
    pub fn record_violation(&mut self, kind: ViolationKind, details: serde_json::Value) -> bool {
        if !self.is_active() {
            tracing::debug!(kind = kind.as_tag(), "dropping violation outside a session");
            return false;
        }
        self.events.push(ViolationEvent {
            kind,
            timestamp: Utc::now(),
            details,
        });
        true
    }

    pub fn signal(&mut self, signal: DetectorSignal) {
        if !self.is_active() {
            return;
        }
        self.status = match signal {
            DetectorSignal::Alert => SessionStatus::Warning,
            DetectorSignal::Clear => SessionStatus::Active,
            DetectorSignal::Fault => SessionStatus::Error,
        };
    }

    /// Finalizes the session: folds the log into counts, returns to idle and
    /// forgets the session id. Safe to call when nothing was started.
    pub fn end(&mut self) -> SessionSummary {
        let ended_at = Utc::now();
        let Some(session_id) = self.session_id.take() else {
            return SessionSummary {
                session_id: None,
                attempt_id: None,
                event_count: 0,
                counts_by_type: BTreeMap::new(),
                started_at: None,
                ended_at,
            };
        };

        let events = std::mem::take(&mut self.events);
        let counts = ViolationAggregator::aggregate(&events);
        self.status = SessionStatus::Idle;

        SessionSummary {
            session_id: Some(session_id),
            attempt_id: self.attempt_id.take(),
            event_count: events.len(),
            counts_by_type: counts.into(),
            started_at: self.started_at.take(),
            ended_at,
        }
    }

    /// Drops a session that never got registered upstream.
    pub fn abort(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_violation_before_start_is_dropped() {
        let mut session = ProctoringSession::new();

        let recorded = session.record_violation(ViolationKind::TabSwitch, serde_json::json!({}));

        assert!(!recorded);
        assert!(session.events().is_empty());
        assert_eq!(session.status(), SessionStatus::Idle);
    }

    #[test]
    fn test_end_without_start_is_empty() {
        let mut session = ProctoringSession::new();

        let summary = session.end();

        assert_eq!(summary.session_id, None);
        assert_eq!(summary.event_count, 0);
        assert!(summary.counts_by_type.is_empty());
    }

    #[test]
    fn test_start_requires_attempt() {
        let mut session = ProctoringSession::new();
        assert_eq!(session.start(0), Err(SessionStartError::MissingAttempt));
        assert!(!session.is_active());
    }

    #[test]
    fn test_restart_issues_new_id_and_resets_log() {
        let mut session = ProctoringSession::new();
        let first = session.start(7).unwrap();
        session.record_violation(ViolationKind::NoFace, serde_json::Value::Null);

        let second = session.start(7).unwrap();

        assert_ne!(first, second);
        assert!(session.events().is_empty());
        assert!(!session.accepts(first));
        assert!(session.accepts(second));
    }

    #[test]
    fn test_warning_does_not_gate_recording() {
        let mut session = ProctoringSession::new();
        session.start(3).unwrap();
        session.signal(DetectorSignal::Alert);
        assert_eq!(session.status(), SessionStatus::Warning);

        assert!(session.record_violation(ViolationKind::LookingAway, serde_json::Value::Null));
        session.signal(DetectorSignal::Fault);
        assert!(session.record_violation(ViolationKind::PhoneDetected, serde_json::Value::Null));
        session.signal(DetectorSignal::Clear);
        assert_eq!(session.status(), SessionStatus::Active);
        assert_eq!(session.events().len(), 2);
    }

    #[test]
    fn test_end_summarizes_and_invalidates() {
        let mut session = ProctoringSession::new();
        let id = session.start(11).unwrap();
        session.record_violation(ViolationKind::TabSwitch, serde_json::Value::Null);
        session.record_violation(ViolationKind::TabSwitch, serde_json::Value::Null);
        session.record_violation(ViolationKind::from("glare"), serde_json::Value::Null);

        let summary = session.end();

        assert_eq!(summary.session_id, Some(id));
        assert_eq!(summary.attempt_id, Some(11));
        assert_eq!(summary.event_count, 3);
        assert_eq!(summary.counts_by_type.get("tab_switch"), Some(&2));
        assert_eq!(summary.counts_by_type.get("glare"), Some(&1));
        assert_eq!(summary.counts_by_type.get("no_face"), Some(&0));

        assert_eq!(session.status(), SessionStatus::Idle);
        assert!(!session.accepts(id));
        assert!(!session.record_violation(ViolationKind::NoFace, serde_json::Value::Null));
    }
}

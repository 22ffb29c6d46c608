// src/state.rs

use std::{collections::HashMap, sync::Arc};

use axum::extract::FromRef;
use tokio::sync::Mutex;

use crate::{
    assessment::{ProctoringSession, SessionSummary},
    config::Config,
    store::AssessmentStore,
};

/// Per-candidate proctoring state.
#[derive(Debug, Default)]
pub struct ProctorSlot {
    pub session: ProctoringSession,
    /// Summaries of ended sessions the store has not accepted yet.
    pub unsent: Vec<SessionSummary>,
}

impl ProctorSlot {
    /// Nothing running and nothing left to persist.
    pub fn is_vacant(&self) -> bool {
        !self.session.is_active() && self.unsent.is_empty()
    }
}

/// Proctoring state keyed by candidate. Vacant slots are removed.
pub type ProctorRegistry = Arc<Mutex<HashMap<i64, ProctorSlot>>>;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn AssessmentStore>,
    pub proctor: ProctorRegistry,
    pub config: Config,
}

impl AppState {
    pub fn new(store: Arc<dyn AssessmentStore>, config: Config) -> Self {
        Self {
            store,
            proctor: ProctorRegistry::default(),
            config,
        }
    }
}

impl FromRef<AppState> for Arc<dyn AssessmentStore> {
    fn from_ref(state: &AppState) -> Self {
        state.store.clone()
    }
}

impl FromRef<AppState> for ProctorRegistry {
    fn from_ref(state: &AppState) -> Self {
        state.proctor.clone()
    }
}

impl FromRef<AppState> for Config {
    fn from_ref(state: &AppState) -> Self {
        state.config.clone()
    }
}

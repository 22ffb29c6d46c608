// src/models/evaluation.rs

use serde::Deserialize;
use validator::Validate;

use crate::assessment::{Criterion, WeightingRecord};

/// DTO for saving a weighting configuration.
#[derive(Debug, Deserialize, Validate)]
pub struct CriteriaRequest {
    #[validate(range(min = 0.0, max = 100.0))]
    pub technical_skill: f64,
    #[validate(range(min = 0.0, max = 100.0))]
    pub psychometric_assessment: f64,
    #[validate(range(min = 0.0, max = 100.0))]
    pub soft_skill: f64,
    #[validate(range(min = 0.0, max = 100.0))]
    pub fairplay: f64,
}

impl CriteriaRequest {
    pub fn into_record(self) -> WeightingRecord {
        WeightingRecord {
            technical_skill: self.technical_skill,
            psychometric_assessment: self.psychometric_assessment,
            soft_skill: self.soft_skill,
            fairplay: self.fairplay,
            is_default: false,
        }
    }
}

/// One edit in a recruiter's weighting session.
///
/// The client echoes back the weights and locked fields it got from the
/// previous edit; a fresh session starts with no locks.
#[derive(Debug, Deserialize)]
pub struct AdjustRequest {
    pub weights: WeightingRecord,
    #[serde(default)]
    pub locked: Vec<Criterion>,
    pub field: Criterion,
    pub value: f64,
}

#[derive(Debug, Deserialize, Validate)]
pub struct VerdictRequest {
    #[validate(range(min = 0.0, max = 100.0))]
    pub technical: f64,
    #[validate(range(min = 0.0, max = 100.0))]
    pub psychometric: f64,
    #[validate(range(min = 0.0, max = 100.0))]
    pub soft_skill: f64,
    /// Derived from the candidate's latest completed session when omitted.
    #[validate(range(min = 0.0, max = 100.0))]
    pub fairplay: Option<f64>,
}

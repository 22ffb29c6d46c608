// src/assessment/weighting.rs

use std::fmt;

use serde::{Deserialize, Serialize};

use super::error::WeightingError;

/// Allowed distance of the weight total from 100.
pub const SUM_TOLERANCE: f64 = 0.01;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Criterion {
    TechnicalSkill,
    PsychometricAssessment,
    SoftSkill,
    Fairplay,
}

impl Criterion {
    pub const ALL: [Criterion; 4] = [
        Criterion::TechnicalSkill,
        Criterion::PsychometricAssessment,
        Criterion::SoftSkill,
        Criterion::Fairplay,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Criterion::TechnicalSkill => "technical_skill",
            Criterion::PsychometricAssessment => "psychometric_assessment",
            Criterion::SoftSkill => "soft_skill",
            Criterion::Fairplay => "fairplay",
        }
    }
}

impl fmt::Display for Criterion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Persisted weighting configuration, one per recruiter.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WeightingRecord {
    pub technical_skill: f64,
    pub psychometric_assessment: f64,
    pub soft_skill: f64,
    pub fairplay: f64,
    #[serde(default)]
    pub is_default: bool,
}

impl WeightingRecord {
    pub fn defaults() -> Self {
        Self {
            technical_skill: 50.0,
            psychometric_assessment: 15.0,
            soft_skill: 15.0,
            fairplay: 20.0,
            is_default: true,
        }
    }

    fn as_array(&self) -> [f64; 4] {
        [
            self.technical_skill,
            self.psychometric_assessment,
            self.soft_skill,
            self.fairplay,
        ]
    }

    pub fn total(&self) -> f64 {
        self.as_array().iter().sum()
    }

    /// Checks a recruiter-submitted record before it is saved.
    pub fn validate(&self) -> Result<(), WeightingError> {
        for (criterion, value) in Criterion::ALL.into_iter().zip(self.as_array()) {
            if !(0.0..=100.0).contains(&value) {
                return Err(WeightingError::OutOfRange(criterion, value));
            }
        }
        let total = self.total();
        if (total - 100.0).abs() > SUM_TOLERANCE {
            return Err(WeightingError::BadTotal(total));
        }
        Ok(())
    }
}

fn round_cents(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Four percentage weights kept summing to 100 while a recruiter edits them.
///
/// Each edit locks the edited field for the rest of the editing session and
/// redistributes the difference over the unlocked fields in proportion to
/// their current values.
#[derive(Debug, Clone, PartialEq)]
pub struct EvaluationWeighting {
    weights: [f64; 4],
    locked: [bool; 4],
    is_default: bool,
}

impl Default for EvaluationWeighting {
    fn default() -> Self {
        Self::from_record(WeightingRecord::defaults())
    }
}

impl EvaluationWeighting {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads a fetched record. Starts a new editing session (no locks).
    pub fn from_record(record: WeightingRecord) -> Self {
        Self {
            weights: record.as_array(),
            locked: [false; 4],
            is_default: record.is_default,
        }
    }

    /// Restores an editing session that is still in progress on a client.
    pub fn with_locked(record: WeightingRecord, locked: &[Criterion]) -> Self {
        let mut weighting = Self::from_record(record);
        for criterion in locked {
            weighting.locked[criterion.index()] = true;
        }
        weighting
    }

    pub fn weight(&self, criterion: Criterion) -> f64 {
        self.weights[criterion.index()]
    }

    pub fn total(&self) -> f64 {
        self.weights.iter().sum()
    }

    pub fn is_default(&self) -> bool {
        self.is_default
    }

    pub fn is_locked(&self, criterion: Criterion) -> bool {
        self.locked[criterion.index()]
    }

    pub fn locked(&self) -> Vec<Criterion> {
        Criterion::ALL
            .into_iter()
            .filter(|c| self.is_locked(*c))
            .collect()
    }

    pub fn to_record(&self) -> WeightingRecord {
        let [technical_skill, psychometric_assessment, soft_skill, fairplay] = self.weights;
        WeightingRecord {
            technical_skill,
            psychometric_assessment,
            soft_skill,
            fairplay,
            is_default: self.is_default,
        }
    }

    /// Back to {50, 15, 15, 20}, default flag set, locks cleared.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Ends the editing session after the record reached the server.
    pub fn mark_saved(&mut self) {
        self.locked = [false; 4];
    }

    /// Sets `field` to `raw` (clamped to [0, 100]) and rebalances the rest.
    pub fn edit(&mut self, field: Criterion, raw: f64) {
        if raw.is_nan() {
            tracing::debug!(%field, "ignoring NaN weight edit");
            return;
        }
        let i = field.index();
        let clamped = raw.clamp(0.0, 100.0);
        let value = round_cents(clamped);
        // Loaded records may carry more than two decimals.
        if clamped == self.weights[i] || value == self.weights[i] {
            return;
        }

        self.locked[i] = true;
        self.is_default = false;

        let others: Vec<usize> = (0..4).filter(|j| *j != i).collect();
        let pool: Vec<usize> = others
            .iter()
            .copied()
            .filter(|j| !self.locked[*j])
            .collect();
        let locked_sum: f64 = others
            .iter()
            .filter(|j| self.locked[**j])
            .map(|j| self.weights[*j])
            .sum();
        let pool_sum: f64 = pool.iter().map(|j| self.weights[*j]).sum();
        let target = 100.0 - value - locked_sum;

        let pool = if pool.is_empty() || pool_sum <= 0.0 || target < 0.0 {
            // Nothing proportional left to draw from: reopen every other field.
            for j in &others {
                self.locked[*j] = false;
            }
            let others_sum: f64 = others.iter().map(|j| self.weights[*j]).sum();
            self.spread_evenly(&others, 100.0 - value - others_sum);
            others
        } else {
            for j in &pool {
                self.weights[*j] = round_cents(self.weights[*j] * target / pool_sum);
            }
            pool
        };
        self.weights[i] = value;

        let residual = 100.0 - self.total();
        if residual != 0.0 {
            let largest = pool
                .iter()
                .copied()
                .max_by(|a, b| self.weights[*a].total_cmp(&self.weights[*b]))
                .unwrap_or(i);
            self.weights[largest] = round_cents(self.weights[largest] + residual).max(0.0);
        }
    }

    /// Adds `adjustment` across `fields` in equal shares, never taking a
    /// field below 0 or above 100.
    fn spread_evenly(&mut self, fields: &[usize], adjustment: f64) {
        let mut open: Vec<usize> = fields.to_vec();
        let mut remaining = adjustment;

        for _ in 0..=fields.len() {
            if open.is_empty() || remaining.abs() < 1e-9 {
                break;
            }
            let share = remaining / open.len() as f64;
            let mut still_open = Vec::with_capacity(open.len());
            for j in open {
                let current = self.weights[j];
                let applied = if share < 0.0 {
                    share.max(-current)
                } else {
                    share.min(100.0 - current)
                };
                self.weights[j] = current + applied;
                remaining -= applied;
                if applied == share {
                    still_open.push(j);
                }
            }
            open = still_open;
        }

        for j in fields {
            self.weights[*j] = round_cents(self.weights[*j]);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_sums_to_100(weighting: &EvaluationWeighting) {
        let total = weighting.total();
        assert!(
            (total - 100.0).abs() <= SUM_TOLERANCE,
            "weights {:?} sum to {}",
            weighting.weights,
            total
        );
        assert!(weighting.weights.iter().all(|w| (0.0..=100.0).contains(w)));
    }

    #[test]
    fn test_defaults() {
        let weighting = EvaluationWeighting::new();
        assert!(weighting.is_default());
        assert_eq!(weighting.weight(Criterion::TechnicalSkill), 50.0);
        assert_eq!(weighting.weight(Criterion::PsychometricAssessment), 15.0);
        assert_eq!(weighting.weight(Criterion::SoftSkill), 15.0);
        assert_eq!(weighting.weight(Criterion::Fairplay), 20.0);
        assert_sums_to_100(&weighting);
    }

    #[test]
    fn test_edit_redistributes_proportionally() {
        let mut weighting = EvaluationWeighting::new();

        weighting.edit(Criterion::TechnicalSkill, 70.0);

        assert_eq!(weighting.weight(Criterion::TechnicalSkill), 70.0);
        assert_eq!(weighting.weight(Criterion::PsychometricAssessment), 9.0);
        assert_eq!(weighting.weight(Criterion::SoftSkill), 9.0);
        assert_eq!(weighting.weight(Criterion::Fairplay), 12.0);
        assert!(!weighting.is_default());
        assert_eq!(weighting.locked(), vec![Criterion::TechnicalSkill]);
        assert_sums_to_100(&weighting);
    }

    #[test]
    fn test_locked_fields_are_not_touched() {
        let mut weighting = EvaluationWeighting::new();
        weighting.edit(Criterion::TechnicalSkill, 70.0);

        weighting.edit(Criterion::SoftSkill, 20.0);

        assert_eq!(weighting.weight(Criterion::TechnicalSkill), 70.0);
        assert_eq!(weighting.weight(Criterion::SoftSkill), 20.0);
        assert_eq!(weighting.weight(Criterion::PsychometricAssessment), 4.29);
        assert_eq!(weighting.weight(Criterion::Fairplay), 5.71);
        assert_sums_to_100(&weighting);
    }

    #[test]
    fn test_all_others_locked_falls_back_to_even_split() {
        let mut weighting = EvaluationWeighting::new();
        weighting.edit(Criterion::TechnicalSkill, 40.0);
        weighting.edit(Criterion::SoftSkill, 20.0);
        weighting.edit(Criterion::Fairplay, 20.0);
        let before = weighting.weight(Criterion::PsychometricAssessment);
        assert_eq!(before, 20.0);

        weighting.edit(Criterion::PsychometricAssessment, 50.0);

        // -30 split evenly over the three reopened fields.
        assert_eq!(weighting.weight(Criterion::TechnicalSkill), 30.0);
        assert_eq!(weighting.weight(Criterion::SoftSkill), 10.0);
        assert_eq!(weighting.weight(Criterion::Fairplay), 10.0);
        assert_eq!(weighting.locked(), vec![Criterion::PsychometricAssessment]);
        assert_sums_to_100(&weighting);
    }

    #[test]
    fn test_even_split_never_goes_negative() {
        let mut weighting = EvaluationWeighting::new();
        weighting.edit(Criterion::TechnicalSkill, 90.0);
        assert_eq!(weighting.weight(Criterion::PsychometricAssessment), 3.0);
        assert_eq!(weighting.weight(Criterion::Fairplay), 4.0);

        // Locked 90 plus 50 overshoots: every other field reopens and the
        // small ones bottom out at zero.
        weighting.edit(Criterion::SoftSkill, 50.0);

        assert_eq!(weighting.weight(Criterion::SoftSkill), 50.0);
        assert_eq!(weighting.weight(Criterion::TechnicalSkill), 50.0);
        assert_eq!(weighting.weight(Criterion::PsychometricAssessment), 0.0);
        assert_eq!(weighting.weight(Criterion::Fairplay), 0.0);
        assert_sums_to_100(&weighting);
    }

    #[test]
    fn test_out_of_range_is_clamped() {
        let mut weighting = EvaluationWeighting::new();

        weighting.edit(Criterion::Fairplay, 250.0);
        assert_eq!(weighting.weight(Criterion::Fairplay), 100.0);
        assert_sums_to_100(&weighting);

        weighting.edit(Criterion::Fairplay, -5.0);
        assert_eq!(weighting.weight(Criterion::Fairplay), 0.0);
        assert_sums_to_100(&weighting);
    }

    #[test]
    fn test_edit_to_same_value_is_noop() {
        let mut weighting = EvaluationWeighting::new();
        weighting.edit(Criterion::TechnicalSkill, 62.5);
        let before = weighting.clone();

        weighting.edit(Criterion::SoftSkill, weighting.weight(Criterion::SoftSkill));

        assert_eq!(weighting, before);
    }

    fn loaded_record() -> WeightingRecord {
        WeightingRecord {
            technical_skill: 33.333,
            psychometric_assessment: 33.333,
            soft_skill: 33.334,
            fairplay: 0.0,
            is_default: false,
        }
    }

    #[test]
    fn test_same_value_edit_on_loaded_record_is_noop() {
        let mut weighting = EvaluationWeighting::from_record(loaded_record());
        let before = weighting.clone();

        weighting.edit(Criterion::TechnicalSkill, 33.333);

        assert_eq!(weighting, before);
        assert!(weighting.locked().is_empty());
    }

    #[test]
    fn test_sum_holds_from_loaded_record() {
        let mut seed: u64 = 0x2545_f491_4f6c_dd1d;
        let mut next = || {
            seed = seed.wrapping_mul(6_364_136_223_846_793_005).wrapping_add(1);
            seed >> 33
        };

        let mut weighting = EvaluationWeighting::from_record(loaded_record());
        for step in 0..2_000 {
            let field = Criterion::ALL[(next() % 4) as usize];
            let value = (next() % 16_000) as f64 / 100.0 - 30.0;
            weighting.edit(field, value);
            assert_sums_to_100(&weighting);
            if step % 97 == 0 {
                weighting.mark_saved();
            }
        }
    }

    #[test]
    fn test_sum_holds_for_arbitrary_edit_sequences() {
        // Small LCG so the sequence is reproducible.
        let mut seed: u64 = 0x2545_f491_4f6c_dd1d;
        let mut next = || {
            seed = seed.wrapping_mul(6_364_136_223_846_793_005).wrapping_add(1);
            seed >> 33
        };

        let mut weighting = EvaluationWeighting::new();
        for step in 0..2_000 {
            let field = Criterion::ALL[(next() % 4) as usize];
            let value = (next() % 16_000) as f64 / 100.0 - 30.0;
            weighting.edit(field, value);
            assert_sums_to_100(&weighting);
            if step % 97 == 0 {
                weighting.mark_saved();
            }
        }
    }

    #[test]
    fn test_reset_restores_defaults_and_clears_locks() {
        let mut weighting = EvaluationWeighting::new();
        weighting.edit(Criterion::SoftSkill, 33.0);

        weighting.reset();

        assert_eq!(weighting, EvaluationWeighting::new());
        assert!(weighting.locked().is_empty());
        assert!(weighting.is_default());
    }

    #[test]
    fn test_record_validation() {
        assert!(WeightingRecord::defaults().validate().is_ok());

        let mut record = WeightingRecord::defaults();
        record.fairplay = 25.0;
        assert_eq!(record.validate(), Err(WeightingError::BadTotal(105.0)));

        record.fairplay = -1.0;
        assert!(matches!(
            record.validate(),
            Err(WeightingError::OutOfRange(Criterion::Fairplay, _))
        ));
    }
}

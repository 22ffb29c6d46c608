// src/assessment/verdict.rs

use serde::{Deserialize, Serialize};

use super::{
    error::VerdictError,
    weighting::{Criterion, EvaluationWeighting},
};

/// Round-level subscores, each already normalized to [0, 100] upstream.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Subscores {
    pub technical: f64,
    pub psychometric: f64,
    pub soft_skill: f64,
    pub fairplay: f64,
}

impl Subscores {
    fn get(&self, criterion: Criterion) -> f64 {
        match criterion {
            Criterion::TechnicalSkill => self.technical,
            Criterion::PsychometricAssessment => self.psychometric,
            Criterion::SoftSkill => self.soft_skill,
            Criterion::Fairplay => self.fairplay,
        }
    }

    fn check(&self) -> Result<(), VerdictError> {
        let named = [
            ("technical", self.technical),
            ("psychometric", self.psychometric),
            ("soft_skill", self.soft_skill),
            ("fairplay", self.fairplay),
        ];
        for (name, value) in named {
            if !(0.0..=100.0).contains(&value) {
                return Err(VerdictError::SubscoreOutOfRange { name, value });
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    Hire,
    NoHire,
}

/// Recruiter-configured cutoff. `overall >= hire_threshold` hires.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VerdictPolicy {
    pub hire_threshold: f64,
}

impl Default for VerdictPolicy {
    fn default() -> Self {
        Self {
            hire_threshold: 60.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Evaluation {
    pub overall: f64,
    pub verdict: Verdict,
}

pub struct VerdictCalculator {
    policy: VerdictPolicy,
}

impl VerdictCalculator {
    pub fn new(policy: VerdictPolicy) -> Self {
        Self { policy }
    }

    /// `Σ (weight / 100) × subscore`, rounded to the hundredth.
    pub fn overall(
        weighting: &EvaluationWeighting,
        subscores: &Subscores,
    ) -> Result<f64, VerdictError> {
        subscores.check()?;
        let overall: f64 = Criterion::ALL
            .into_iter()
            .map(|c| weighting.weight(c) / 100.0 * subscores.get(c))
            .sum();
        Ok((overall * 100.0).round() / 100.0)
    }

    pub fn evaluate(
        &self,
        weighting: &EvaluationWeighting,
        subscores: &Subscores,
    ) -> Result<Evaluation, VerdictError> {
        let overall = Self::overall(weighting, subscores)?;
        let verdict = if overall >= self.policy.hire_threshold {
            Verdict::Hire
        } else {
            Verdict::NoHire
        };
        Ok(Evaluation { overall, verdict })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scores(technical: f64, psychometric: f64, soft_skill: f64, fairplay: f64) -> Subscores {
        Subscores {
            technical,
            psychometric,
            soft_skill,
            fairplay,
        }
    }

    #[test]
    fn test_overall_uses_default_weights() {
        let weighting = EvaluationWeighting::new();
        // 0.5*80 + 0.15*60 + 0.15*40 + 0.2*100
        let overall = VerdictCalculator::overall(&weighting, &scores(80.0, 60.0, 40.0, 100.0)).unwrap();
        assert_eq!(overall, 75.0);
    }

    #[test]
    fn test_uniform_subscores_give_same_overall() {
        let mut weighting = EvaluationWeighting::new();
        weighting.edit(Criterion::SoftSkill, 41.3);
        let overall = VerdictCalculator::overall(&weighting, &scores(72.0, 72.0, 72.0, 72.0)).unwrap();
        assert_eq!(overall, 72.0);
    }

    #[test]
    fn test_threshold_decides_verdict() {
        let calculator = VerdictCalculator::new(VerdictPolicy { hire_threshold: 75.0 });
        let weighting = EvaluationWeighting::new();

        let hired = calculator
            .evaluate(&weighting, &scores(80.0, 60.0, 40.0, 100.0))
            .unwrap();
        assert_eq!(hired.verdict, Verdict::Hire);

        let rejected = calculator
            .evaluate(&weighting, &scores(80.0, 60.0, 40.0, 90.0))
            .unwrap();
        assert_eq!(rejected.overall, 73.0);
        assert_eq!(rejected.verdict, Verdict::NoHire);
    }

    #[test]
    fn test_out_of_range_subscore_is_rejected() {
        let err = VerdictCalculator::overall(&EvaluationWeighting::new(), &scores(101.0, 0.0, 0.0, 0.0))
            .unwrap_err();
        assert_eq!(
            err,
            VerdictError::SubscoreOutOfRange {
                name: "technical",
                value: 101.0
            }
        );
    }
}

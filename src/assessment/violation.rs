// src/assessment/violation.rs

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Integrity events emitted by the visual, audio and input detectors.
///
/// Tags outside the known vocabulary are kept verbatim in `Other` so they can
/// still be counted.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ViolationKind {
    NoFace,
    MultipleFaces,
    LookingAway,
    PhoneDetected,
    TabSwitch,
    MouseExit,
    PrintScreen,
    CopyPaste,
    SuspiciousNoise,
    Other(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
}

impl ViolationKind {
    pub const VOCABULARY: [ViolationKind; 9] = [
        ViolationKind::NoFace,
        ViolationKind::MultipleFaces,
        ViolationKind::LookingAway,
        ViolationKind::PhoneDetected,
        ViolationKind::TabSwitch,
        ViolationKind::MouseExit,
        ViolationKind::PrintScreen,
        ViolationKind::CopyPaste,
        ViolationKind::SuspiciousNoise,
    ];

    pub fn as_tag(&self) -> &str {
        match self {
            ViolationKind::NoFace => "no_face",
            ViolationKind::MultipleFaces => "multiple_faces",
            ViolationKind::LookingAway => "looking_away",
            ViolationKind::PhoneDetected => "phone_detected",
            ViolationKind::TabSwitch => "tab_switch",
            ViolationKind::MouseExit => "mouse_exit",
            ViolationKind::PrintScreen => "print_screen",
            ViolationKind::CopyPaste => "copy_paste",
            ViolationKind::SuspiciousNoise => "suspicious_noise",
            ViolationKind::Other(tag) => tag,
        }
    }

    /// Position in `VOCABULARY`, `None` for unrecognized tags.
    fn slot(&self) -> Option<usize> {
        Self::VOCABULARY.iter().position(|known| known == self)
    }

    pub fn severity(&self) -> Severity {
        match self {
            ViolationKind::NoFace | ViolationKind::MultipleFaces | ViolationKind::PhoneDetected => {
                Severity::High
            }
            ViolationKind::LookingAway | ViolationKind::TabSwitch => Severity::Medium,
            _ => Severity::Low,
        }
    }

    /// Points this kind contributes to the session risk score.
    fn risk_weight(&self) -> u32 {
        match self {
            ViolationKind::NoFace => 10,
            ViolationKind::MultipleFaces => 25,
            ViolationKind::LookingAway => 5,
            ViolationKind::TabSwitch => 15,
            ViolationKind::PhoneDetected => 20,
            _ => 0,
        }
    }
}

impl From<String> for ViolationKind {
    fn from(tag: String) -> Self {
        Self::VOCABULARY
            .into_iter()
            .find(|known| known.as_tag() == tag)
            .unwrap_or(ViolationKind::Other(tag))
    }
}

impl From<&str> for ViolationKind {
    fn from(tag: &str) -> Self {
        ViolationKind::from(tag.to_string())
    }
}

impl From<ViolationKind> for String {
    fn from(kind: ViolationKind) -> Self {
        match kind {
            ViolationKind::Other(tag) => tag,
            known => known.as_tag().to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViolationEvent {
    #[serde(rename = "type")]
    pub kind: ViolationKind,
    pub timestamp: DateTime<Utc>,
    /// Detector diagnostics. Never inspected by the aggregation.
    #[serde(default)]
    pub details: serde_json::Value,
}

/// Per-type violation counts.
///
/// Every vocabulary type is present (zero by default); unrecognized tags are
/// kept in a separate bucket under their literal tag.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "BTreeMap<String, u32>", into = "BTreeMap<String, u32>")]
pub struct ViolationCounts {
    known: [u32; 9],
    unrecognized: BTreeMap<String, u32>,
}

impl ViolationCounts {
    fn bump(&mut self, kind: &ViolationKind, by: u32) {
        match kind.slot() {
            Some(slot) => self.known[slot] = self.known[slot].saturating_add(by),
            None => {
                let count = self.unrecognized.entry(kind.as_tag().to_string()).or_default();
                *count = count.saturating_add(by);
            }
        }
    }

    pub fn get(&self, kind: &ViolationKind) -> u32 {
        match kind.slot() {
            Some(slot) => self.known[slot],
            None => self.unrecognized.get(kind.as_tag()).copied().unwrap_or(0),
        }
    }

    pub fn unrecognized(&self) -> &BTreeMap<String, u32> {
        &self.unrecognized
    }

    pub fn total(&self) -> u32 {
        self.known
            .iter()
            .chain(self.unrecognized.values())
            .fold(0u32, |acc, n| acc.saturating_add(*n))
    }

    /// Weighted risk in [0, 100].
    pub fn risk_score(&self) -> u32 {
        let raw = ViolationKind::VOCABULARY
            .iter()
            .map(|kind| kind.risk_weight().saturating_mul(self.get(kind)))
            .fold(0u32, u32::saturating_add);
        raw.min(100)
    }

    /// Fairplay subscore derived from the risk score.
    pub fn fairplay_score(&self) -> f64 {
        f64::from(100 - self.risk_score())
    }
}

impl From<BTreeMap<String, u32>> for ViolationCounts {
    fn from(map: BTreeMap<String, u32>) -> Self {
        let mut counts = ViolationCounts::default();
        for (tag, count) in map {
            counts.bump(&ViolationKind::from(tag), count);
        }
        counts
    }
}

impl From<ViolationCounts> for BTreeMap<String, u32> {
    fn from(counts: ViolationCounts) -> Self {
        let mut map: BTreeMap<String, u32> = ViolationKind::VOCABULARY
            .iter()
            .zip(counts.known)
            .map(|(kind, count)| (kind.as_tag().to_string(), count))
            .collect();
        map.extend(counts.unrecognized);
        map
    }
}

/// Reduces an event log to counts. Pure and total: any input, including an
/// empty one or one full of unknown tags, yields a full count table.
pub struct ViolationAggregator;

impl ViolationAggregator {
    pub fn aggregate<'a, I>(events: I) -> ViolationCounts
    where
        I: IntoIterator<Item = &'a ViolationEvent>,
    {
        events
            .into_iter()
            .fold(ViolationCounts::default(), |mut counts, event| {
                counts.bump(&event.kind, 1);
                counts
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(tag: &str) -> ViolationEvent {
        ViolationEvent {
            kind: ViolationKind::from(tag),
            timestamp: Utc::now(),
            details: serde_json::Value::Null,
        }
    }

    #[test]
    fn test_aggregate_empty_has_every_type() {
        let counts = ViolationAggregator::aggregate(&Vec::<ViolationEvent>::new());
        let map: BTreeMap<String, u32> = counts.clone().into();

        assert_eq!(map.len(), ViolationKind::VOCABULARY.len());
        assert!(map.values().all(|c| *c == 0));
        assert_eq!(counts.total(), 0);
    }

    #[test]
    fn test_aggregate_counts_known_and_unknown() {
        let events = vec![
            event("tab_switch"),
            event("tab_switch"),
            event("no_face"),
            event("suspicious_behavior"),
        ];

        let counts = ViolationAggregator::aggregate(&events);

        assert_eq!(counts.get(&ViolationKind::TabSwitch), 2);
        assert_eq!(counts.get(&ViolationKind::NoFace), 1);
        assert_eq!(counts.get(&ViolationKind::CopyPaste), 0);
        assert_eq!(counts.unrecognized().get("suspicious_behavior"), Some(&1));
        assert_eq!(counts.total(), 4);
    }

    #[test]
    fn test_counts_serialize_as_flat_map() {
        let counts = ViolationAggregator::aggregate(&[event("copy_paste"), event("glare")]);
        let json = serde_json::to_value(&counts).unwrap();

        assert_eq!(json["copy_paste"], 1);
        assert_eq!(json["glare"], 1);
        assert_eq!(json["no_face"], 0);

        let back: ViolationCounts = serde_json::from_value(json).unwrap();
        assert_eq!(back, counts);
    }

    #[test]
    fn test_risk_score_is_capped() {
        let events: Vec<_> = (0..5).map(|_| event("multiple_faces")).collect();
        let counts = ViolationAggregator::aggregate(&events);
        assert_eq!(counts.risk_score(), 100);
        assert_eq!(counts.fairplay_score(), 0.0);

        let counts = ViolationAggregator::aggregate(&[event("looking_away"), event("tab_switch")]);
        assert_eq!(counts.risk_score(), 20);
        assert_eq!(counts.fairplay_score(), 80.0);
    }

    #[test]
    fn test_stored_counts_saturate() {
        let stored = BTreeMap::from([
            ("multiple_faces".to_string(), u32::MAX),
            ("no_face".to_string(), u32::MAX),
            ("glare".to_string(), u32::MAX),
        ]);
        let mut counts = ViolationCounts::from(stored);
        counts.bump(&ViolationKind::from("glare"), 3);

        assert_eq!(counts.get(&ViolationKind::from("glare")), u32::MAX);
        assert_eq!(counts.total(), u32::MAX);
        assert_eq!(counts.risk_score(), 100);
    }

    #[test]
    fn test_kind_round_trips_tag() {
        assert_eq!(ViolationKind::from("phone_detected"), ViolationKind::PhoneDetected);
        assert_eq!(ViolationKind::from("phone_detected").severity(), Severity::High);
        assert_eq!(
            ViolationKind::from("blink"),
            ViolationKind::Other("blink".to_string())
        );
        assert_eq!(ViolationKind::from("blink").severity(), Severity::Low);
    }
}

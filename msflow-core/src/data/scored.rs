use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::value::DataValue;

/// Mix-in carried by anything that accumulates named scores during
/// processing: a feature, a consensus feature, an MRM candidate peak. Named
/// scores are ordered by insertion so the "most recently added" score is
/// still discoverable without a lookup.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScoredProcessingResult {
    scores: Vec<(String, f64)>,
    /// Names of the processing steps that touched this result, in order.
    pub processing_steps: Vec<String>,
    /// Free-form meta-values attached during processing.
    pub meta_values: BTreeMap<String, DataValue>,
}

impl ScoredProcessingResult {
    /// Records a named score, appending it even if the name was set before
    /// (later stages may legitimately re-score with the same name).
    pub fn set_score(&mut self, score_type: impl Into<String>, value: f64) {
        self.scores.push((score_type.into(), value));
    }

    /// The most recently recorded value for `score_type`, if any.
    #[must_use]
    pub fn score(&self, score_type: &str) -> Option<f64> {
        self.scores
            .iter()
            .rev()
            .find(|(name, _)| name == score_type)
            .map(|(_, value)| *value)
    }

    /// All recorded (name, value) pairs in insertion order.
    #[must_use]
    pub fn scores(&self) -> &[(String, f64)] {
        &self.scores
    }

    /// Records that `step` processed this result.
    pub fn record_step(&mut self, step: impl Into<String>) {
        self.processing_steps.push(step.into());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn later_score_with_same_name_wins() {
        let mut r = ScoredProcessingResult::default();
        r.set_score("sn", 1.0);
        r.set_score("sn", 2.0);
        assert_eq!(r.score("sn"), Some(2.0));
    }

    #[test]
    fn missing_score_is_none() {
        let r = ScoredProcessingResult::default();
        assert_eq!(r.score("sn"), None);
    }
}

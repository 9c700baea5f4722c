use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::data::chromatogram::Chromatogram;
use crate::data::scored::ScoredProcessingResult;

/// One monitored precursor -> product m/z pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transition {
    /// Stable identifier, referenced (not copied) by transition groups.
    pub native_id: String,
    /// Identifier of the peptide this transition belongs to.
    pub peptide_ref: String,
    /// Precursor m/z, in Th.
    pub precursor_mz: f64,
    /// Product (fragment) m/z, in Th.
    pub product_mz: f64,
    /// Expected relative intensity from a spectral library, used for
    /// co-elution/correlation scoring.
    pub library_intensity: f64,
    /// `true` if this transition targets a decoy peptide.
    pub decoy: bool,
    /// Normalized (iRT-style) retention time, if known.
    pub normalized_rt: Option<f64>,
}

/// An ordered list of transitions, each naming the peptide it belongs to by
/// `peptide_ref`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TransitionList {
    transitions: Vec<Transition>,
}

impl TransitionList {
    /// An empty transition list.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a transition.
    pub fn push(&mut self, transition: Transition) {
        self.transitions.push(transition);
    }

    /// All transitions, in list order.
    #[must_use]
    pub fn transitions(&self) -> &[Transition] {
        &self.transitions
    }

    /// Every transition sharing `peptide_ref`, grouped as they appear in the list.
    #[must_use]
    pub fn for_peptide<'a>(&'a self, peptide_ref: &'a str) -> Vec<&'a Transition> {
        self.transitions
            .iter()
            .filter(|t| t.peptide_ref == peptide_ref)
            .collect()
    }

    /// Transitions sorted ascending by product m/z, the order coordinate
    /// preparation requires for a single pass over spectra.
    #[must_use]
    pub fn sorted_by_mz(&self) -> Vec<&Transition> {
        let mut refs: Vec<&Transition> = self.transitions.iter().collect();
        refs.sort_by(|a, b| a.product_mz.total_cmp(&b.product_mz));
        refs
    }
}

/// A scored candidate elution peak for one transition group, produced by
/// [`crate` consumers beyond this crate] (the MRM scorer lives in
/// `msflow-targeted`; this type is just the data model it populates).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MRMFeature {
    /// Retention time of the picked peak apex.
    pub rt: f64,
    /// Summed intensity across all transitions at the picked peak.
    pub intensity: f64,
    /// Composite quality used for ranking candidate peaks.
    pub overall_quality: f64,
    /// Per-transition picked peak areas, keyed by transition native_id.
    pub transition_areas: BTreeMap<String, f64>,
    /// Named scores and meta-values accumulated by the scorer.
    pub scored: ScoredProcessingResult,
}

/// A set of transitions sharing a peptide, their extracted chromatograms,
/// and the scored candidate peaks found in them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MRMTransitionGroup {
    /// Key identifying this transition group (usually the peptide ref + charge).
    pub group_id: String,
    /// The transitions belonging to this group.
    pub transitions: Vec<Transition>,
    /// Chromatograms keyed by transition native_id.
    pub chromatograms: BTreeMap<String, Chromatogram>,
    /// The precursor (MS1) chromatogram, if MS1-mode extraction was enabled.
    pub precursor_chromatogram: Option<Chromatogram>,
    /// Scored candidate peaks found in this group's chromatograms.
    pub features: Vec<MRMFeature>,
}

impl MRMTransitionGroup {
    /// A fresh, empty group for `group_id` built from `transitions`.
    #[must_use]
    pub fn new(group_id: impl Into<String>, transitions: Vec<Transition>) -> Self {
        Self {
            group_id: group_id.into(),
            transitions,
            chromatograms: BTreeMap::new(),
            precursor_chromatogram: None,
            features: Vec::new(),
        }
    }

    /// Library intensities for this group's transitions, in the same order
    /// as [`Self::transitions`], for correlation scoring.
    #[must_use]
    pub fn library_intensities(&self) -> Vec<f64> {
        self.transitions.iter().map(|t| t.library_intensity).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn transition(id: &str, peptide: &str, product_mz: f64) -> Transition {
        Transition {
            native_id: id.to_owned(),
            peptide_ref: peptide.to_owned(),
            precursor_mz: 700.0,
            product_mz,
            library_intensity: 1.0,
            decoy: false,
            normalized_rt: Some(30.0),
        }
    }

    #[test]
    fn for_peptide_filters_by_ref() {
        let mut list = TransitionList::new();
        list.push(transition("t1", "PEP1", 500.0));
        list.push(transition("t2", "PEP2", 400.0));
        assert_eq!(list.for_peptide("PEP1").len(), 1);
    }

    #[test]
    fn sorted_by_mz_is_ascending() {
        let mut list = TransitionList::new();
        list.push(transition("t1", "PEP1", 500.0));
        list.push(transition("t2", "PEP1", 400.0));
        let sorted = list.sorted_by_mz();
        assert!(sorted[0].product_mz < sorted[1].product_mz);
    }
}

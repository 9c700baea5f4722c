use serde::{Deserialize, Serialize};

use crate::data::precursor::Precursor;

/// A single (rt, intensity) observation in a chromatogram.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ChromatogramPoint {
    /// Retention time, in seconds.
    pub rt: f64,
    /// Accumulated intensity at this retention time.
    pub intensity: f64,
}

/// What kind of signal a chromatogram tracks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChromatogramType {
    /// Summed signal across the full scan (MS1 "base peak" style trace).
    BasePeak,
    /// A single transition's selected reaction monitoring trace.
    SelectedReactionMonitoring,
}

/// A precomputed chromatogram: an ordered sequence of (rt, intensity) points
/// describing the elution of one product/target m/z over time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chromatogram {
    points: Vec<ChromatogramPoint>,
    /// The m/z this chromatogram was extracted for.
    pub target_mz: f64,
    /// The kind of signal this chromatogram tracks.
    pub chromatogram_type: ChromatogramType,
    /// The precursor this chromatogram's transition originated from, if any.
    pub precursor: Option<Precursor>,
    /// A stable identifier, carried verbatim from the originating transition.
    pub native_id: String,
}

impl Chromatogram {
    /// Creates an empty chromatogram for the given target and type.
    #[must_use]
    pub fn new(native_id: impl Into<String>, target_mz: f64, chromatogram_type: ChromatogramType) -> Self {
        Self {
            points: Vec::new(),
            target_mz,
            chromatogram_type,
            precursor: None,
            native_id: native_id.into(),
        }
    }

    /// The ordered points of this chromatogram.
    #[must_use]
    pub fn points(&self) -> &[ChromatogramPoint] {
        &self.points
    }

    /// `true` if this chromatogram carries no points (e.g. no matching
    /// spectrum was found for its transition during extraction).
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Appends a point, keeping the ordered-by-rt invariant the caller is
    /// responsible for (extraction always appends in spectrum RT order).
    pub fn push(&mut self, rt: f64, intensity: f64) {
        self.points.push(ChromatogramPoint { rt, intensity });
    }

    /// Sum of all point intensities (the "bulk chromatogram integral" used
    /// by the intensity score).
    #[must_use]
    pub fn integral(&self) -> f64 {
        self.points.iter().map(|p| p.intensity).sum()
    }

    /// Index and value of the most intense point, if any.
    #[must_use]
    pub fn apex(&self) -> Option<(usize, ChromatogramPoint)> {
        self.points
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.intensity.total_cmp(&b.1.intensity))
            .map(|(i, p)| (i, *p))
    }
}

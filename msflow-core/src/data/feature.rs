use serde::{Deserialize, Serialize};

use crate::data::identification::PeptideIdentification;
use crate::data::scored::ScoredProcessingResult;
use crate::error::{MsFlowError, Result};

/// A closed polygon in the (rt, mz) plane describing one connected region a
/// feature's peaks were drawn from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConvexHull {
    /// Polygon vertices, in order; implicitly closed (last connects to first).
    pub points: Vec<(f64, f64)>,
}

impl ConvexHull {
    /// Builds a convex hull from the bounding box of `points` (a rectangle is
    /// the simplest valid convex hull and is what most feature finders emit
    /// for a single isotope trace).
    #[must_use]
    pub fn bounding_box(points: &[(f64, f64)]) -> Self {
        let (mut rt_lo, mut rt_hi) = (f64::INFINITY, f64::NEG_INFINITY);
        let (mut mz_lo, mut mz_hi) = (f64::INFINITY, f64::NEG_INFINITY);
        for &(rt, mz) in points {
            rt_lo = rt_lo.min(rt);
            rt_hi = rt_hi.max(rt);
            mz_lo = mz_lo.min(mz);
            mz_hi = mz_hi.max(mz);
        }
        Self {
            points: vec![(rt_lo, mz_lo), (rt_hi, mz_lo), (rt_hi, mz_hi), (rt_lo, mz_hi)],
        }
    }

    /// Ray-casting point-in-polygon test (even-odd rule), boundary-inclusive
    /// via a small epsilon so a centroid sitting exactly on an edge still counts.
    #[must_use]
    pub fn contains(&self, rt: f64, mz: f64) -> bool {
        let n = self.points.len();
        if n < 3 {
            return false;
        }
        let mut inside = false;
        let mut j = n - 1;
        for i in 0..n {
            let (rt_i, mz_i) = self.points[i];
            let (rt_j, mz_j) = self.points[j];
            if (rt_i - rt).abs() < 1e-9 && (mz_i - mz).abs() < 1e-9 {
                return true;
            }
            let intersects = ((mz_i > mz) != (mz_j > mz))
                && (rt < (rt_j - rt_i) * (mz - mz_i) / (mz_j - mz_i) + rt_i);
            if intersects {
                inside = !inside;
            }
            j = i;
        }
        inside
    }
}

/// How a feature's reported intensity was derived.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum QuantificationMode {
    /// Sum of the intensities of the peaks that make up the feature.
    SummedIntensities,
    /// Apex value of the fitted 2D model.
    ModelApex,
}

/// An isotopically and chromatographically coherent ion signal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feature {
    /// Centroid retention time, in seconds.
    pub rt: f64,
    /// Centroid mass-to-charge ratio, in Th.
    pub mz: f64,
    /// Reported intensity, consistent with `quantification_mode`.
    pub intensity: f64,
    /// Signed charge; 0 means unknown.
    pub charge: i32,
    /// How `intensity` was derived.
    pub quantification_mode: QuantificationMode,
    /// Convex hulls of the RT x m/z regions this feature was built from.
    pub convex_hulls: Vec<ConvexHull>,
    /// Overall quality in [0, 1].
    pub overall_quality: f64,
    /// Sub-features (e.g. individual isotope traces) nested under this one.
    pub subordinates: Vec<Feature>,
    /// Peptide identifications attached to this feature.
    pub peptide_identifications: Vec<PeptideIdentification>,
    /// Accumulated named scores and processing-step history.
    pub scored: ScoredProcessingResult,
}

impl Feature {
    /// Builds a feature and checks that the centroid lies within the union
    /// of its convex hulls, per the §3 invariant. Returns `InvalidData` if
    /// not (and if no hulls are given at all, since a feature with no
    /// supporting region is meaningless).
    pub fn new(
        rt: f64,
        mz: f64,
        intensity: f64,
        charge: i32,
        quantification_mode: QuantificationMode,
        convex_hulls: Vec<ConvexHull>,
        overall_quality: f64,
    ) -> Result<Self> {
        if convex_hulls.is_empty() || !convex_hulls.iter().any(|h| h.contains(rt, mz)) {
            return Err(MsFlowError::InvalidData {
                location: format!("feature at rt={rt}, mz={mz}"),
                message: "centroid does not lie within the union of convex hulls".to_owned(),
            });
        }
        if !(0.0..=1.0).contains(&overall_quality) {
            return Err(MsFlowError::InvalidArgument(format!(
                "overall_quality {overall_quality} not in [0, 1]"
            )));
        }
        Ok(Self {
            rt,
            mz,
            intensity,
            charge,
            quantification_mode,
            convex_hulls,
            overall_quality,
            subordinates: Vec::new(),
            peptide_identifications: Vec::new(),
            scored: ScoredProcessingResult::default(),
        })
    }
}

/// One step in a feature map's processing history, carried verbatim from
/// whatever producer ran it (this core neither defines nor interprets the
/// step's file-format representation).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessingStep {
    /// Name of the processing step (e.g. `"FeatureFinderCentroided"`).
    pub name: String,
    /// Timestamp the step completed, if recorded.
    pub completed_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// An ordered sequence of features produced by one run, owning its features
/// exclusively (a `ConsensusFeature` never owns a `Feature`; it only
/// references one by `(map_index, element_index)`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeatureMap {
    /// Identifies the document/run this map was built from.
    pub document_id: String,
    features: Vec<Feature>,
    /// Processing history, carried verbatim.
    pub processing_history: Vec<ProcessingStep>,
}

impl FeatureMap {
    /// An empty map for the given document id.
    #[must_use]
    pub fn new(document_id: impl Into<String>) -> Self {
        Self {
            document_id: document_id.into(),
            features: Vec::new(),
            processing_history: Vec::new(),
        }
    }

    /// The features owned by this map.
    #[must_use]
    pub fn features(&self) -> &[Feature] {
        &self.features
    }

    /// Mutable access to the owned features (used by in-place alignment).
    pub fn features_mut(&mut self) -> &mut [Feature] {
        &mut self.features
    }

    /// Appends a feature to the map.
    pub fn push(&mut self, feature: Feature) {
        self.features.push(feature);
    }

    /// Number of features in the map.
    #[must_use]
    pub fn len(&self) -> usize {
        self.features.len()
    }

    /// `true` if the map owns no features.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bounding_box_hull_contains_its_center() {
        let hull = ConvexHull::bounding_box(&[(0.0, 0.0), (10.0, 10.0)]);
        assert!(hull.contains(5.0, 5.0));
        assert!(!hull.contains(50.0, 50.0));
    }

    #[test]
    fn feature_with_centroid_outside_hulls_is_rejected() {
        let hull = ConvexHull::bounding_box(&[(0.0, 0.0), (1.0, 1.0)]);
        let f = Feature::new(100.0, 100.0, 1000.0, 2, QuantificationMode::SummedIntensities, vec![hull], 0.5);
        assert!(f.is_err());
    }

    #[test]
    fn feature_with_centroid_inside_hulls_is_accepted() {
        let hull = ConvexHull::bounding_box(&[(0.0, 0.0), (10.0, 10.0)]);
        let f = Feature::new(5.0, 5.0, 1000.0, 2, QuantificationMode::SummedIntensities, vec![hull], 0.5);
        assert!(f.is_ok());
    }

    #[test]
    fn quality_out_of_range_is_rejected() {
        let hull = ConvexHull::bounding_box(&[(0.0, 0.0), (10.0, 10.0)]);
        let f = Feature::new(5.0, 5.0, 1000.0, 2, QuantificationMode::SummedIntensities, vec![hull], 1.5);
        assert!(f.is_err());
    }

    #[test]
    fn feature_map_owns_pushed_features() {
        let hull = ConvexHull::bounding_box(&[(0.0, 0.0), (10.0, 10.0)]);
        let f = Feature::new(5.0, 5.0, 1000.0, 2, QuantificationMode::SummedIntensities, vec![hull], 0.5).unwrap();
        let mut map = FeatureMap::new("run-1");
        map.push(f);
        assert_eq!(map.len(), 1);
    }
}

//! `ConsensusFeature` and `ConsensusMap`: the cross-run grouping of features
//! that represent the same species, and the ordered map that owns them.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use msflow_core::value::DataValue;

/// A reference to one source feature by its position in the input map set,
/// carrying the transformed position and intensity it contributed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IndexTuple {
    /// Index of the source map in the input slice passed to the builder.
    pub map_index: usize,
    /// Index of the feature within that map.
    pub element_index: usize,
    /// `(rt, mz)` position after alignment.
    pub transformed_position: (f64, f64),
    /// Intensity of the original feature/peak.
    pub original_intensity: f64,
}

/// A cross-run grouping of features deemed to represent the same species.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsensusFeature {
    /// Arithmetic mean of members' transformed `(rt, mz)` positions.
    pub centroid: (f64, f64),
    /// Aggregated intensity (sum or mean of members, per builder configuration).
    pub intensity: f64,
    /// Element-wise min/max envelope of members' transformed positions.
    pub position_bounding_box: ((f64, f64), (f64, f64)),
    /// Min/max envelope of members' intensities.
    pub intensity_bounding_box: (f64, f64),
    /// Composite quality, currently the fraction of input maps represented.
    pub quality: f64,
    /// The member features this consensus feature was built from. Never empty.
    pub members: Vec<IndexTuple>,
}

impl ConsensusFeature {
    /// `true` if `centroid` is within `tolerance` of the arithmetic mean of
    /// `members`' transformed positions (the §8 testable property).
    #[must_use]
    pub fn centroid_matches_mean(&self, tolerance: f64) -> bool {
        if self.members.is_empty() {
            return false;
        }
        let n = self.members.len() as f64;
        let mean_rt = self.members.iter().map(|m| m.transformed_position.0).sum::<f64>() / n;
        let mean_mz = self.members.iter().map(|m| m.transformed_position.1).sum::<f64>() / n;
        (self.centroid.0 - mean_rt).abs() <= tolerance.max((self.centroid.0).abs() * tolerance)
            && (self.centroid.1 - mean_mz).abs() <= tolerance.max((self.centroid.1).abs() * tolerance)
    }
}

/// Per-source-map metadata in a `ConsensusMap`, mirroring `ConsensusXMLFile`'s
/// file-description table.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FileDescription {
    /// Path or identifier of the source map.
    pub source: String,
    /// A short human-readable label.
    pub label: String,
    /// Number of features/peaks the source map contributed before consensus building.
    pub size: usize,
    /// Free-form description.
    pub description: String,
    /// Additional meta-values.
    pub extra: BTreeMap<String, DataValue>,
}

/// An ordered sequence of `ConsensusFeature`s plus a `map_index ->
/// FileDescription` table.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConsensusMap {
    features: Vec<ConsensusFeature>,
    /// Per-source-map descriptions, keyed by `map_index`.
    pub file_descriptions: BTreeMap<usize, FileDescription>,
}

impl ConsensusMap {
    /// An empty consensus map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The consensus features, in the order the builder emitted them.
    #[must_use]
    pub fn features(&self) -> &[ConsensusFeature] {
        &self.features
    }

    /// Appends a consensus feature.
    pub fn push(&mut self, feature: ConsensusFeature) {
        self.features.push(feature);
    }

    /// Number of consensus features.
    #[must_use]
    pub fn len(&self) -> usize {
        self.features.len()
    }

    /// `true` if this map owns no consensus features.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    /// Sorts features ascending by centroid m/z, ties by centroid rt, ties
    /// by ascending first-member `(map_index, element_index)` — the §5
    /// ordering guarantee.
    pub fn sort_canonically(&mut self) {
        self.features.sort_by(|a, b| {
            a.centroid
                .1
                .total_cmp(&b.centroid.1)
                .then_with(|| a.centroid.0.total_cmp(&b.centroid.0))
                .then_with(|| {
                    let ka = a.members.first().map(|m| (m.map_index, m.element_index));
                    let kb = b.members.first().map(|m| (m.map_index, m.element_index));
                    ka.cmp(&kb)
                })
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn centroid_matches_mean_of_members() {
        let feature = ConsensusFeature {
            centroid: (100.1, 500.1237),
            intensity: 2.1e6,
            position_bounding_box: ((100.0, 500.1234), (100.2, 500.1240)),
            intensity_bounding_box: (1.0e6, 1.1e6),
            quality: 1.0,
            members: vec![
                IndexTuple { map_index: 0, element_index: 0, transformed_position: (100.0, 500.1234), original_intensity: 1.0e6 },
                IndexTuple { map_index: 1, element_index: 0, transformed_position: (100.2, 500.1240), original_intensity: 1.1e6 },
            ],
        };
        assert!(feature.centroid_matches_mean(1e-6));
    }
}

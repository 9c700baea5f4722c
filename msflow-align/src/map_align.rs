//! Pose-clustering map alignment: estimating one [`RTTransformation`] per
//! non-reference feature map against a chosen reference.

use std::collections::HashMap;

use msflow_core::data::{Feature, FeatureMap, PeptideIdentification};
use msflow_core::error::{MsFlowError, Result};

use crate::rt_transform::{AnchorPair, OutlierRemoval, RTTransformation, TransformKind};

/// Configuration for pose-clustering alignment.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PoseClusteringParams {
    /// Maximum m/z difference for two features to be considered a candidate match.
    pub mz_tolerance: f64,
    /// Width of a (scale, shift) vote bin.
    pub scale_bin_width: f64,
    /// Width of a (scale, shift) vote bin, shift axis.
    pub shift_bin_width: f64,
    /// Minimum vote count (intensity-weighted) for a mode to be considered.
    pub vote_count_threshold: f64,
}

impl Default for PoseClusteringParams {
    fn default() -> Self {
        Self { mz_tolerance: 0.01, scale_bin_width: 0.01, shift_bin_width: 1.0, vote_count_threshold: 1.0 }
    }
}

struct Vote {
    scale: f64,
    shift: f64,
    weight: f64,
    source_rt: f64,
    target_rt: f64,
}

fn bin_key(value: f64, width: f64) -> i64 {
    (value / width).round() as i64
}

/// Estimates an `RTTransformation` aligning `map`'s retention-time axis onto
/// `reference`'s, by pose clustering in (scale, shift) space. Returns the
/// identity transformation (and logs a warning) if fewer than two anchors
/// survive candidate matching.
pub fn align_pose_clustering(
    map: &FeatureMap,
    reference: &FeatureMap,
    kind: TransformKind,
    outlier_removal: Option<OutlierRemoval>,
    params: PoseClusteringParams,
) -> Result<RTTransformation> {
    let mut votes = Vec::new();
    for f in map.features() {
        for r in reference.features() {
            if (f.mz - r.mz).abs() > params.mz_tolerance {
                continue;
            }
            if r.rt.abs() < 1e-12 {
                continue;
            }
            let scale = r.rt / f.rt.max(1e-9);
            let shift = r.rt - f.rt;
            let weight = f.intensity.min(r.intensity);
            votes.push(Vote { scale, shift, weight, source_rt: f.rt, target_rt: r.rt });
        }
    }

    let mut bins: HashMap<(i64, i64), Vec<usize>> = HashMap::new();
    for (i, v) in votes.iter().enumerate() {
        let key = (bin_key(v.scale, params.scale_bin_width), bin_key(v.shift, params.shift_bin_width));
        bins.entry(key).or_default().push(i);
    }

    let mut modes: Vec<(f64, f64, &(i64, i64))> = bins
        .iter()
        .map(|(key, members)| {
            let total_weight: f64 = members.iter().map(|&i| votes[i].weight).sum();
            let distance_to_identity = (key.0 as f64).hypot(key.1 as f64);
            (total_weight, distance_to_identity, key)
        })
        .filter(|(weight, ..)| *weight >= params.vote_count_threshold)
        .collect();

    modes.sort_by(|a, b| b.0.total_cmp(&a.0).then_with(|| a.1.total_cmp(&b.1)));

    let Some((_, _, best_key)) = modes.first() else {
        log::warn!("pose clustering found no surviving vote mode, falling back to identity");
        return Ok(RTTransformation::identity());
    };

    let member_indices = &bins[*best_key];
    let anchors: Vec<AnchorPair> =
        member_indices.iter().map(|&i| AnchorPair { source: votes[i].source_rt, target: votes[i].target_rt }).collect();

    if anchors.len() < 2 {
        log::warn!("pose clustering mode has fewer than 2 anchors, falling back to identity");
        return Ok(RTTransformation::identity());
    }

    RTTransformation::fit(&anchors, kind, outlier_removal)
}

/// Identification-based alignment: anchors on unique best peptide hits whose
/// identification carries RT/m/z metadata. Fails with `MissingInformation`
/// if any identification lacks the required metadata.
pub fn align_by_identification(
    map_ids: &[PeptideIdentification],
    reference_ids: &[PeptideIdentification],
    kind: TransformKind,
    outlier_removal: Option<OutlierRemoval>,
) -> Result<RTTransformation> {
    let mut by_sequence: HashMap<&str, &PeptideIdentification> = HashMap::new();
    for id in reference_ids {
        if !id.is_unique() {
            continue;
        }
        if let Some(hit) = id.best_hit() {
            by_sequence.insert(hit.sequence.as_str(), id);
        }
    }

    let mut anchors = Vec::new();
    for id in map_ids {
        if !id.is_unique() {
            continue;
        }
        let Some(hit) = id.best_hit() else { continue };
        let Some(reference_id) = by_sequence.get(hit.sequence.as_str()) else { continue };

        let source_rt = id.rt.ok_or_else(|| {
            MsFlowError::MissingInformation(format!("identification for {} lacks RT metadata", hit.sequence))
        })?;
        let target_rt = reference_id.rt.ok_or_else(|| {
            MsFlowError::MissingInformation(format!("reference identification for {} lacks RT metadata", hit.sequence))
        })?;
        anchors.push(AnchorPair { source: source_rt, target: target_rt });
    }

    RTTransformation::fit(&anchors, kind, outlier_removal)
}

/// Applies `transform` to every feature's (and recursively, subordinate's)
/// RT coordinate in place.
pub fn apply_to_map(map: &mut FeatureMap, transform: &RTTransformation) {
    for feature in map.features_mut() {
        apply_to_feature(feature, transform);
    }
}

fn apply_to_feature(feature: &mut Feature, transform: &RTTransformation) {
    feature.rt = transform.apply(feature.rt);
    for sub in &mut feature.subordinates {
        apply_to_feature(sub, transform);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use msflow_core::data::{ConvexHull, QuantificationMode};

    fn feature(rt: f64, mz: f64, intensity: f64) -> Feature {
        let hull = ConvexHull::bounding_box(&[(rt - 1.0, mz - 0.1), (rt + 1.0, mz + 0.1)]);
        Feature::new(rt, mz, intensity, 1, QuantificationMode::SummedIntensities, vec![hull], 0.9).unwrap()
    }

    #[test]
    fn pose_clustering_finds_shift_between_maps() {
        let mut map = FeatureMap::new("run-a");
        let mut reference = FeatureMap::new("run-b");
        for i in 0..5 {
            let mz = 500.0 + i as f64;
            map.push(feature(10.0 + i as f64, mz, 1000.0));
            reference.push(feature(15.0 + i as f64, mz, 1000.0));
        }

        let transform =
            align_pose_clustering(&map, &reference, TransformKind::Linear, None, PoseClusteringParams::default()).unwrap();
        assert!((transform.apply(10.0) - 15.0).abs() < 1.0);
    }

    #[test]
    fn pose_clustering_with_no_matches_falls_back_to_identity() {
        let map = FeatureMap::new("run-a");
        let reference = FeatureMap::new("run-b");
        let transform =
            align_pose_clustering(&map, &reference, TransformKind::Linear, None, PoseClusteringParams::default()).unwrap();
        assert_eq!(transform.apply(3.0), 3.0);
    }

    #[test]
    fn identification_alignment_requires_rt_metadata() {
        use msflow_core::data::PeptideHit;

        let hit = PeptideHit {
            sequence: "PEPTIDE".to_owned(),
            score: 1.0,
            protein_accessions: vec![],
            charge: Some(2),
            preceding_residue: None,
            following_residue: None,
        };
        let id_no_rt = PeptideIdentification {
            identifier: "run-a".to_owned(),
            score_type: "q-value".to_owned(),
            higher_score_better: false,
            significance_threshold: None,
            rt: None,
            mz: None,
            hits: vec![hit.clone()],
        };
        let id_with_rt = PeptideIdentification { rt: Some(20.0), ..id_no_rt.clone() };

        let err = align_by_identification(&[id_no_rt], &[id_with_rt], TransformKind::Linear, None).unwrap_err();
        assert!(matches!(err, MsFlowError::MissingInformation(_)));
    }
}

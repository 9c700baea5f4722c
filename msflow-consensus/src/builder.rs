//! `ConsensusBuilder`: bucket-grid linking of aligned feature maps into a
//! `ConsensusMap`.

use std::collections::HashMap;

use msflow_core::data::FeatureMap;
use msflow_core::error::Result;

use crate::consensus_map::{ConsensusFeature, ConsensusMap, IndexTuple};

/// How a consensus feature's intensity is derived from its members.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntensityAggregation {
    /// Sum of member intensities.
    Sum,
    /// Arithmetic mean of member intensities.
    Mean,
}

/// Parameters for bucket-grid consensus linking.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConsensusParams {
    /// Half-width of the RT match tolerance.
    pub tolerance_rt: f64,
    /// Half-width of the m/z match tolerance.
    pub tolerance_mz: f64,
    /// If `true`, a consensus feature may contain at most one member per map;
    /// a would-be second member from an already-represented map is left
    /// unmatched and becomes its own singleton consensus feature instead.
    pub exclusive_per_map: bool,
    /// How to aggregate member intensities.
    pub intensity_aggregation: IntensityAggregation,
}

impl Default for ConsensusParams {
    fn default() -> Self {
        Self {
            tolerance_rt: 1.0,
            tolerance_mz: 0.01,
            exclusive_per_map: true,
            intensity_aggregation: IntensityAggregation::Sum,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Candidate {
    map_index: usize,
    element_index: usize,
    rt: f64,
    mz: f64,
    intensity: f64,
}

/// Links features across aligned maps using an overlapping bucket grid plus
/// mutual-nearest-neighbor matching within each bucket, chained transitively
/// across map pairs.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConsensusBuilder {
    params: ConsensusParams,
}

impl ConsensusBuilder {
    /// Builds a consensus linker with the given parameters.
    #[must_use]
    pub fn new(params: ConsensusParams) -> Self {
        Self { params }
    }

    /// Links `maps` (already RT-aligned to a common reference) into a
    /// `ConsensusMap`, emitting features ordered ascending by centroid m/z,
    /// then centroid rt, then ascending first-member `(map_index,
    /// element_index)`.
    pub fn build(&self, maps: &[FeatureMap]) -> Result<ConsensusMap> {
        let candidates: Vec<Candidate> = maps
            .iter()
            .enumerate()
            .flat_map(|(map_index, map)| {
                map.features().iter().enumerate().map(move |(element_index, f)| Candidate {
                    map_index,
                    element_index,
                    rt: f.rt,
                    mz: f.mz,
                    intensity: f.intensity,
                })
            })
            .collect();

        let matches = self.bucket_grid_matches(&candidates);
        let clusters = self.union_find_clusters(candidates.len(), &matches, &candidates);

        let mut consensus_map = ConsensusMap::new();
        let n_maps = maps.len().max(1);
        for cluster in clusters {
            let members: Vec<IndexTuple> = cluster
                .iter()
                .map(|&i| {
                    let c = &candidates[i];
                    IndexTuple {
                        map_index: c.map_index,
                        element_index: c.element_index,
                        transformed_position: (c.rt, c.mz),
                        original_intensity: c.intensity,
                    }
                })
                .collect();
            consensus_map.push(build_consensus_feature(members, self.params.intensity_aggregation, n_maps));
        }
        consensus_map.sort_canonically();
        Ok(consensus_map)
    }

    /// Assigns each candidate to up to four overlapping buckets, then within
    /// each bucket finds mutually-nearest cross-map pairs (normalized
    /// Euclidean distance `<= 1`, where each axis is scaled by its
    /// tolerance). Returns deduplicated pairs of candidate indices.
    fn bucket_grid_matches(&self, candidates: &[Candidate]) -> Vec<(usize, usize)> {
        let tol_rt = self.params.tolerance_rt.max(f64::MIN_POSITIVE);
        let tol_mz = self.params.tolerance_mz.max(f64::MIN_POSITIVE);

        let mut buckets: HashMap<(i64, i64), Vec<usize>> = HashMap::new();
        for (i, c) in candidates.iter().enumerate() {
            let bin_rt = (c.rt / tol_rt).floor() as i64;
            let bin_mz = (c.mz / tol_mz).floor() as i64;
            for &(dr, dm) in &[(0, 0), (-1, 0), (0, -1), (-1, -1)] {
                buckets.entry((bin_rt + dr, bin_mz + dm)).or_default().push(i);
            }
        }

        let normalized_distance = |a: &Candidate, b: &Candidate| -> f64 {
            let drt = (a.rt - b.rt) / tol_rt;
            let dmz = (a.mz - b.mz) / tol_mz;
            (drt * drt + dmz * dmz).sqrt()
        };

        let mut pairs: std::collections::HashSet<(usize, usize)> = std::collections::HashSet::new();
        for members in buckets.values() {
            for &i in members {
                let ci = &candidates[i];
                // Nearest candidate to i from each other map, among this bucket's members.
                let mut nearest_by_map: HashMap<usize, (usize, f64)> = HashMap::new();
                for &j in members {
                    if i == j {
                        continue;
                    }
                    let cj = &candidates[j];
                    if cj.map_index == ci.map_index {
                        continue;
                    }
                    let d = normalized_distance(ci, cj);
                    if d > 1.0 {
                        continue;
                    }
                    let entry = nearest_by_map.entry(cj.map_index).or_insert((j, d));
                    if d < entry.1 {
                        *entry = (j, d);
                    }
                }
                for &(j, _) in nearest_by_map.values() {
                    let cj = &candidates[j];
                    // Mutual: i must also be cj's nearest candidate from ci's map.
                    let mut best_back: Option<(usize, f64)> = None;
                    for &k in members {
                        let ck = &candidates[k];
                        if ck.map_index != ci.map_index {
                            continue;
                        }
                        let d = normalized_distance(cj, ck);
                        if d > 1.0 {
                            continue;
                        }
                        let better = match best_back {
                            Some((_, bd)) => d < bd,
                            None => true,
                        };
                        if better {
                            best_back = Some((k, d));
                        }
                    }
                    if best_back.map(|(k, _)| k) == Some(i) {
                        let key = if i < j { (i, j) } else { (j, i) };
                        pairs.insert(key);
                    }
                }
            }
        }
        pairs.into_iter().collect()
    }

    /// Chains mutual-nearest-neighbor pairs transitively into equivalence
    /// classes via union-find, honoring `exclusive_per_map`: a union that
    /// would place two members from the same map into one cluster is
    /// skipped, leaving the later-processed member to seed (or join) a
    /// different cluster instead.
    fn union_find_clusters(&self, n: usize, matches: &[(usize, usize)], candidates: &[Candidate]) -> Vec<Vec<usize>> {
        let mut parent: Vec<usize> = (0..n).collect();

        fn find(parent: &mut [usize], x: usize) -> usize {
            if parent[x] != x {
                parent[x] = find(parent, parent[x]);
            }
            parent[x]
        }

        let mut sorted_matches = matches.to_vec();
        sorted_matches.sort_unstable();

        for (a, b) in sorted_matches {
            let ra = find(&mut parent, a);
            let rb = find(&mut parent, b);
            if ra == rb {
                continue;
            }
            if self.params.exclusive_per_map {
                let maps_in_a: std::collections::HashSet<usize> =
                    (0..n).filter(|&i| find(&mut parent, i) == ra).map(|i| candidates[i].map_index).collect();
                let maps_in_b: std::collections::HashSet<usize> =
                    (0..n).filter(|&i| find(&mut parent, i) == rb).map(|i| candidates[i].map_index).collect();
                if !maps_in_a.is_disjoint(&maps_in_b) {
                    continue;
                }
            }
            parent[ra] = rb;
        }

        let mut groups: HashMap<usize, Vec<usize>> = HashMap::new();
        for i in 0..n {
            let root = find(&mut parent, i);
            groups.entry(root).or_default().push(i);
        }
        groups.into_values().collect()
    }
}

fn build_consensus_feature(mut members: Vec<IndexTuple>, aggregation: IntensityAggregation, n_maps: usize) -> ConsensusFeature {
    members.sort_by_key(|m| (m.map_index, m.element_index));
    let n = members.len() as f64;
    let mean_rt = members.iter().map(|m| m.transformed_position.0).sum::<f64>() / n;
    let mean_mz = members.iter().map(|m| m.transformed_position.1).sum::<f64>() / n;

    let (mut rt_lo, mut rt_hi) = (f64::INFINITY, f64::NEG_INFINITY);
    let (mut mz_lo, mut mz_hi) = (f64::INFINITY, f64::NEG_INFINITY);
    let (mut int_lo, mut int_hi) = (f64::INFINITY, f64::NEG_INFINITY);
    for m in &members {
        rt_lo = rt_lo.min(m.transformed_position.0);
        rt_hi = rt_hi.max(m.transformed_position.0);
        mz_lo = mz_lo.min(m.transformed_position.1);
        mz_hi = mz_hi.max(m.transformed_position.1);
        int_lo = int_lo.min(m.original_intensity);
        int_hi = int_hi.max(m.original_intensity);
    }

    let intensity = match aggregation {
        IntensityAggregation::Sum => members.iter().map(|m| m.original_intensity).sum(),
        IntensityAggregation::Mean => members.iter().map(|m| m.original_intensity).sum::<f64>() / n,
    };

    let distinct_maps: std::collections::HashSet<usize> = members.iter().map(|m| m.map_index).collect();

    ConsensusFeature {
        centroid: (mean_rt, mean_mz),
        intensity,
        position_bounding_box: ((rt_lo, mz_lo), (rt_hi, mz_hi)),
        intensity_bounding_box: (int_lo, int_hi),
        quality: (distinct_maps.len() as f64 / n_maps as f64).clamp(0.0, 1.0),
        members,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use msflow_core::data::feature::{ConvexHull, Feature, QuantificationMode};

    fn feature(rt: f64, mz: f64, intensity: f64) -> Feature {
        let hull = ConvexHull::bounding_box(&[(rt - 0.5, mz - 0.001), (rt + 0.5, mz + 0.001)]);
        Feature::new(rt, mz, intensity, 2, QuantificationMode::SummedIntensities, vec![hull], 1.0).unwrap()
    }

    #[test]
    fn two_singletons_within_tolerance_link_into_one_consensus_feature() {
        let mut map_a = FeatureMap::new("a");
        map_a.push(feature(100.0, 500.1234, 1.0e6));
        let mut map_b = FeatureMap::new("b");
        map_b.push(feature(100.2, 500.1240, 1.1e6));

        let builder = ConsensusBuilder::new(ConsensusParams {
            tolerance_rt: 1.0,
            tolerance_mz: 0.01,
            ..ConsensusParams::default()
        });
        let consensus = builder.build(&[map_a, map_b]).unwrap();

        assert_eq!(consensus.len(), 1);
        let f = &consensus.features()[0];
        assert!((f.centroid.0 - 100.1).abs() < 1e-9);
        assert!((f.centroid.1 - 500.1237).abs() < 1e-4);
        assert!((f.intensity - 2.1e6).abs() < 1.0);
        assert_eq!(f.position_bounding_box, ((100.0, 500.1234), (100.2, 500.1240)));
        assert_eq!(f.members.len(), 2);
    }

    #[test]
    fn features_outside_tolerance_stay_separate() {
        let mut map_a = FeatureMap::new("a");
        map_a.push(feature(100.0, 500.1234, 1.0e6));
        let mut map_b = FeatureMap::new("b");
        map_b.push(feature(200.0, 600.0, 1.1e6));

        let builder = ConsensusBuilder::default();
        let consensus = builder.build(&[map_a, map_b]).unwrap();
        assert_eq!(consensus.len(), 2);
    }

    #[test]
    fn single_map_wraps_every_feature_as_its_own_singleton() {
        let mut map_a = FeatureMap::new("a");
        map_a.push(feature(100.0, 500.0, 1.0e6));
        map_a.push(feature(110.0, 510.0, 2.0e6));

        let builder = ConsensusBuilder::default();
        let consensus = builder.build(&[map_a]).unwrap();
        assert_eq!(consensus.len(), 2);
        for f in consensus.features() {
            assert_eq!(f.members.len(), 1);
            assert_eq!(f.centroid, f.members[0].transformed_position);
        }
    }

    #[test]
    fn exclusive_per_map_never_groups_two_members_from_the_same_map() {
        let mut map_a = FeatureMap::new("a");
        map_a.push(feature(100.0, 500.0, 1.0e6));
        map_a.push(feature(100.001, 500.0001, 1.0e6));
        let mut map_b = FeatureMap::new("b");
        map_b.push(feature(100.0005, 500.00005, 1.0e6));

        let builder = ConsensusBuilder::new(ConsensusParams { exclusive_per_map: true, ..ConsensusParams::default() });
        let consensus = builder.build(&[map_a, map_b]).unwrap();
        for f in consensus.features() {
            let maps: std::collections::HashSet<usize> = f.members.iter().map(|m| m.map_index).collect();
            assert_eq!(maps.len(), f.members.len());
        }
    }

    #[test]
    fn ascending_mz_ordering_is_enforced() {
        let mut map_a = FeatureMap::new("a");
        map_a.push(feature(10.0, 900.0, 1.0));
        map_a.push(feature(20.0, 100.0, 1.0));
        let builder = ConsensusBuilder::default();
        let consensus = builder.build(&[map_a]).unwrap();
        let mzs: Vec<f64> = consensus.features().iter().map(|f| f.centroid.1).collect();
        let mut sorted = mzs.clone();
        sorted.sort_by(|a, b| a.total_cmp(b));
        assert_eq!(mzs, sorted);
    }
}

//! EXTENDING: the Simple Extender priority-queue region-growing algorithm.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use ordered_float::OrderedFloat;

use msflow_core::error::Result;
use msflow_core::store::PeakStore;

use crate::flags::{Flag, FlagGrid, PeakRef};
use crate::navigator::PeakNavigator;
use crate::seeder::ChargedIndexSet;

/// Tunable widths/cutoffs for the Simple Extender.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExtenderParams {
    /// RT kernel width (seconds).
    pub tolerance_rt: f64,
    /// m/z kernel width (Th).
    pub tolerance_mz: f64,
    /// Hard RT cutoff above the running centroid.
    pub dist_rt_up: f64,
    /// Hard RT cutoff below the running centroid.
    pub dist_rt_down: f64,
    /// Hard m/z cutoff above the running centroid.
    pub dist_mz_up: f64,
    /// Hard m/z cutoff below the running centroid.
    pub dist_mz_down: f64,
    /// Relative intensity cutoff versus the seed's intensity.
    pub intensity_factor: f64,
    /// Minimum priority for a candidate to be queued.
    pub priority_threshold: f64,
    /// Minimum fraction of the running intensity sum a peak must clear to
    /// avoid being discarded as drift into noise.
    pub min_intensity_contribution: f64,
}

impl Default for ExtenderParams {
    fn default() -> Self {
        Self {
            tolerance_rt: 5.0,
            tolerance_mz: 0.05,
            dist_rt_up: 30.0,
            dist_rt_down: 30.0,
            dist_mz_up: 1.5,
            dist_mz_down: 0.5,
            intensity_factor: 0.05,
            priority_threshold: 1e-6,
            min_intensity_contribution: 0.0,
        }
    }
}

/// Grows a seed `ChargedIndexSet` into a region of claimed peaks.
pub trait Extender {
    /// Extends `seed`, claiming accepted peaks as `InsideFeature` in `flags`,
    /// and returns the grown `IndexSet` (seed members plus everything added).
    fn extend(&self, store: &PeakStore, flags: &mut FlagGrid, seed: &ChargedIndexSet) -> Result<Vec<PeakRef>>;
}

#[derive(Debug, Clone, Copy)]
struct QueueEntry {
    priority: OrderedFloat<f64>,
    peak_ref: PeakRef,
    sequence: usize,
}

impl PartialEq for QueueEntry {
    fn eq(&self, other: &Self) -> bool {
        self.priority == other.priority && self.sequence == other.sequence
    }
}
impl Eq for QueueEntry {}

impl Ord for QueueEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        self.priority.cmp(&other.priority).then_with(|| other.sequence.cmp(&self.sequence))
    }
}
impl PartialOrd for QueueEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

fn gaussian_kernel(delta: f64, width: f64) -> f64 {
    (-0.5 * (delta / width).powi(2)).exp()
}

struct RunningCentroid {
    weighted_rt: f64,
    weighted_mz: f64,
    total_intensity: f64,
}

impl RunningCentroid {
    fn new() -> Self {
        Self { weighted_rt: 0.0, weighted_mz: 0.0, total_intensity: 0.0 }
    }

    fn add(&mut self, rt: f64, mz: f64, intensity: f64) {
        self.weighted_rt += rt * intensity;
        self.weighted_mz += mz * intensity;
        self.total_intensity += intensity;
    }

    fn rt(&self) -> f64 {
        if self.total_intensity > 0.0 {
            self.weighted_rt / self.total_intensity
        } else {
            0.0
        }
    }

    fn mz(&self) -> f64 {
        if self.total_intensity > 0.0 {
            self.weighted_mz / self.total_intensity
        } else {
            0.0
        }
    }
}

/// The Simple Extender.
#[derive(Debug, Clone, Copy)]
pub struct SimpleExtender {
    /// Tunable widths/cutoffs.
    pub params: ExtenderParams,
}

impl SimpleExtender {
    /// Builds a Simple Extender with `params`.
    #[must_use]
    pub fn new(params: ExtenderParams) -> Self {
        Self { params }
    }
}

impl Extender for SimpleExtender {
    fn extend(&self, store: &PeakStore, flags: &mut FlagGrid, seed: &ChargedIndexSet) -> Result<Vec<PeakRef>> {
        let params = &self.params;
        let nav = PeakNavigator::new(store);

        let seed_peak_ref = *seed
            .peaks
            .iter()
            .max_by(|&&a, &&b| nav.peak(a).intensity.total_cmp(&nav.peak(b).intensity))
            .expect("seed has at least one peak");
        let seed_intensity = nav.peak(seed_peak_ref).intensity;
        let intensity_cutoff = params.intensity_factor * seed_intensity;

        let mut last_rt = nav.rt(seed_peak_ref);
        let mut last_mz = nav.peak(seed_peak_ref).mz;
        let mut intensity_sum = 0.0;
        let mut centroid = RunningCentroid::new();
        let mut region = Vec::new();
        let mut sequence_counter = 0usize;
        let mut queued: std::collections::HashSet<PeakRef> = std::collections::HashSet::new();
        let seed_set: std::collections::HashSet<PeakRef> = seed.peaks.iter().copied().collect();

        let mut heap: BinaryHeap<QueueEntry> = BinaryHeap::new();
        let priority_of = |peak_ref: PeakRef, last_rt: f64, last_mz: f64| -> f64 {
            let peak = nav.peak(peak_ref);
            let rt = nav.rt(peak_ref);
            let k_rt = gaussian_kernel(rt - last_rt, params.tolerance_rt);
            let k_mz = gaussian_kernel(peak.mz - last_mz, params.tolerance_mz);
            peak.intensity * k_rt * k_mz
        };

        for &p in &seed.peaks {
            let priority = priority_of(p, last_rt, last_mz);
            if priority > params.priority_threshold {
                heap.push(QueueEntry { priority: OrderedFloat(priority), peak_ref: p, sequence: sequence_counter });
                queued.insert(p);
                sequence_counter += 1;
            }
        }
        if heap.is_empty() {
            heap.push(QueueEntry { priority: OrderedFloat(seed_intensity), peak_ref: seed_peak_ref, sequence: sequence_counter });
            queued.insert(seed_peak_ref);
            sequence_counter += 1;
        }

        while let Some(entry) = heap.pop() {
            let p = entry.peak_ref;
            queued.remove(&p);
            if flags.get(p) != Flag::Unused && !seed_set.contains(&p) {
                continue;
            }
            let peak = nav.peak(p);
            if peak.intensity < intensity_sum * params.min_intensity_contribution {
                continue;
            }

            last_rt = nav.rt(p);
            last_mz = peak.mz;
            centroid.add(last_rt, last_mz, peak.intensity);
            intensity_sum += peak.intensity;
            flags.set(p, Flag::InsideFeature);
            region.push(p);

            let neighbors = [nav.next_mz(p), nav.prev_mz(p), nav.next_rt(p), nav.prev_rt(p)];
            for neighbor in neighbors.into_iter().flatten() {
                if queued.contains(&neighbor) {
                    continue;
                }
                if flags.get(neighbor) != Flag::Unused {
                    continue;
                }
                let neighbor_peak = nav.peak(neighbor);
                let neighbor_rt = nav.rt(neighbor);
                let mz_delta = neighbor_peak.mz - centroid.mz();
                let rt_delta = neighbor_rt - centroid.rt();
                if mz_delta > params.dist_mz_up || -mz_delta > params.dist_mz_down {
                    continue;
                }
                if rt_delta > params.dist_rt_up || -rt_delta > params.dist_rt_down {
                    continue;
                }
                if neighbor_peak.intensity < intensity_cutoff {
                    continue;
                }
                let priority = priority_of(neighbor, last_rt, last_mz);
                if priority > params.priority_threshold {
                    heap.push(QueueEntry { priority: OrderedFloat(priority), peak_ref: neighbor, sequence: sequence_counter });
                    queued.insert(neighbor);
                    sequence_counter += 1;
                }
            }
        }

        Ok(region)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use msflow_core::data::peak::Peak1D;
    use msflow_core::data::spectrum::Spectrum;

    fn store() -> PeakStore {
        let s = Spectrum::new(
            10.0,
            1,
            vec![],
            vec![Peak1D::new(500.0, 1000.0), Peak1D::new(500.5, 400.0), Peak1D::new(501.0, 150.0)],
        )
        .unwrap();
        PeakStore::load_from(vec![s]).unwrap()
    }

    #[test]
    fn extends_and_claims_isotope_satellites() {
        let store = store();
        let mut flags = FlagGrid::new(&[3]);
        let seed = ChargedIndexSet { peaks: vec![PeakRef { spectrum_index: 0, peak_index: 0 }], charge: 1 };
        let extender = SimpleExtender::new(ExtenderParams::default());
        let region = extender.extend(&store, &mut flags, &seed).unwrap();
        assert!(region.len() >= 1);
        assert_eq!(flags.get(PeakRef { spectrum_index: 0, peak_index: 0 }), Flag::InsideFeature);
    }

    #[test]
    fn extends_absorbs_every_seed_peak_not_just_the_apex() {
        let store = store();
        let mut flags = FlagGrid::new(&[3]);
        let apex = PeakRef { spectrum_index: 0, peak_index: 0 };
        let satellite = PeakRef { spectrum_index: 0, peak_index: 1 };
        flags.set(apex, Flag::Seed);
        flags.set(satellite, Flag::Seed);
        let seed = ChargedIndexSet { peaks: vec![apex, satellite], charge: 1 };
        let extender = SimpleExtender::new(ExtenderParams::default());
        let region = extender.extend(&store, &mut flags, &seed).unwrap();
        assert!(region.contains(&satellite), "non-apex seed member must not be dropped");
        assert_eq!(flags.get(satellite), Flag::InsideFeature);
    }

    #[test]
    fn extender_never_claims_already_inside_feature_peaks() {
        let store = store();
        let mut flags = FlagGrid::new(&[3]);
        flags.set(PeakRef { spectrum_index: 0, peak_index: 1 }, Flag::InsideFeature);
        let seed = ChargedIndexSet { peaks: vec![PeakRef { spectrum_index: 0, peak_index: 0 }], charge: 1 };
        let extender = SimpleExtender::new(ExtenderParams::default());
        let region = extender.extend(&store, &mut flags, &seed).unwrap();
        assert!(!region.contains(&PeakRef { spectrum_index: 0, peak_index: 1 }));
    }
}

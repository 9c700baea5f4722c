//! INIT -> SEEDING: scans unused peaks for putative isotope clusters.

use msflow_core::isotope::{neutral_mass, AveragineComposition, IsotopeModel};
use msflow_core::store::PeakStore;

use crate::flags::{FlagGrid, PeakRef};
use crate::navigator::PeakNavigator;

/// One or more peaks of a putative isotope cluster, plus a provisional charge.
#[derive(Debug, Clone, PartialEq)]
pub struct ChargedIndexSet {
    /// Member peak references.
    pub peaks: Vec<PeakRef>,
    /// Provisional charge assigned by the seeder.
    pub charge: i32,
}

/// Scans unused peaks and proposes seeds for the extender.
pub trait Seeder {
    /// Returns the next seed, or `None` once no unused peak clears the
    /// seeder's intensity threshold.
    fn next_seed(&mut self, store: &PeakStore, flags: &FlagGrid) -> Option<ChargedIndexSet>;
}

/// The default seeder: picks the highest-intensity unused peak, trials a
/// configured charge range against the first two isotope satellites found by
/// walking `next_mz`, and keeps the charge whose averagine envelope best
/// matches them.
#[derive(Debug, Clone, Copy)]
pub struct SimpleSeeder {
    /// Minimum intensity a peak must have to be considered as a seed.
    pub min_intensity: f64,
    /// Inclusive charge range trialled for each candidate seed.
    pub charge_range: (i32, i32),
    /// m/z tolerance (Th) used when looking for isotope satellites.
    pub mz_tolerance: f64,
}

impl Default for SimpleSeeder {
    fn default() -> Self {
        Self { min_intensity: 0.0, charge_range: (1, 5), mz_tolerance: 0.02 }
    }
}

impl Seeder for SimpleSeeder {
    fn next_seed(&mut self, store: &PeakStore, flags: &FlagGrid) -> Option<ChargedIndexSet> {
        let nav = PeakNavigator::new(store);
        let candidate = flags
            .iter_refs()
            .filter(|&r| flags.is_unused(r))
            .filter(|&r| nav.peak(r).intensity >= self.min_intensity)
            .max_by(|&a, &b| nav.peak(a).intensity.total_cmp(&nav.peak(b).intensity))?;

        let peak = nav.peak(candidate);
        let mut best_charge = self.charge_range.0;
        let mut best_similarity = f64::NEG_INFINITY;
        let mut best_satellites = vec![candidate];

        for charge in self.charge_range.0..=self.charge_range.1 {
            let mass = neutral_mass(peak.mz, charge);
            let composition = AveragineComposition::for_mass(mass);
            let model = IsotopeModel::theoretical(composition, 0.0, 0.1, charge.unsigned_abs());

            let mut satellites = vec![candidate];
            let mut observed = vec![peak.intensity];
            let mut cursor = candidate;
            for _ in 0..3 {
                match nav.next_mz(cursor) {
                    Ok(next) if flags.is_unused(next) => {
                        let spacing = 1.0 / f64::from(charge.unsigned_abs().max(1));
                        if (nav.peak(next).mz - nav.peak(cursor).mz - spacing).abs() <= self.mz_tolerance {
                            satellites.push(next);
                            observed.push(nav.peak(next).intensity);
                            cursor = next;
                            continue;
                        }
                        break;
                    }
                    _ => break,
                }
            }

            let similarity = model.similarity(&observed);
            if similarity > best_similarity {
                best_similarity = similarity;
                best_charge = charge;
                best_satellites = satellites;
            }
        }

        Some(ChargedIndexSet { peaks: best_satellites, charge: best_charge })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use msflow_core::data::peak::Peak1D;
    use msflow_core::data::spectrum::Spectrum;

    #[test]
    fn picks_highest_intensity_unused_peak() {
        let s = Spectrum::new(1.0, 1, vec![], vec![Peak1D::new(100.0, 10.0), Peak1D::new(200.0, 1000.0)]).unwrap();
        let store = PeakStore::load_from(vec![s]).unwrap();
        let flags = FlagGrid::new(&[2]);
        let mut seeder = SimpleSeeder::default();
        let seed = seeder.next_seed(&store, &flags).unwrap();
        assert_eq!(seed.peaks[0].peak_index, 1);
    }

    #[test]
    fn returns_none_once_all_peaks_used() {
        let s = Spectrum::new(1.0, 1, vec![], vec![Peak1D::new(100.0, 10.0)]).unwrap();
        let store = PeakStore::load_from(vec![s]).unwrap();
        let mut flags = FlagGrid::new(&[1]);
        flags.set(PeakRef { spectrum_index: 0, peak_index: 0 }, crate::flags::Flag::InsideFeature);
        let mut seeder = SimpleSeeder::default();
        assert!(seeder.next_seed(&store, &flags).is_none());
    }
}

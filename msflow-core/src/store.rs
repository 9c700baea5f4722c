//! Random and range access to a sorted map of spectra, with cheap iteration
//! over neighbors in RT and in m/z.

use serde::{Deserialize, Serialize};

use crate::data::spectrum::Spectrum;
use crate::error::{MsFlowError, Result};

/// The axis a neighbor query walked off the end of.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    /// Walking towards smaller m/z, within a spectrum.
    PrevMz,
    /// Walking towards larger m/z, within a spectrum.
    NextMz,
    /// Walking towards smaller RT, across spectra.
    PrevRt,
    /// Walking towards larger RT, across spectra.
    NextRt,
}

/// Cached min/max bounds over a [`PeakStore`], recomputed by
/// [`PeakStore::update_ranges`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct StoreRanges {
    /// Minimum/maximum RT across all stored spectra.
    pub rt: Option<(f64, f64)>,
    /// Minimum/maximum m/z across all stored peaks.
    pub mz: Option<(f64, f64)>,
    /// Minimum/maximum intensity across all stored peaks.
    pub intensity: Option<(f64, f64)>,
}

/// A sorted-by-RT collection of spectra with O(log N) range access and O(1)
/// neighbor queries.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PeakStore {
    spectra: Vec<Spectrum>,
    ranges: StoreRanges,
}

impl PeakStore {
    /// An empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Accepts spectra in arbitrary RT order, stores them stably sorted by
    /// RT, and recomputes ranges. Fails with `InvalidData` if any spectrum's
    /// peaks are not mz-sorted (checked by [`Spectrum::new`] at construction
    /// time, so this only re-validates an externally assembled `Vec`).
    pub fn load_from(spectra: Vec<Spectrum>) -> Result<Self> {
        let mut spectra = spectra;
        spectra.sort_by(|a, b| a.rt.total_cmp(&b.rt));
        for s in &spectra {
            if !s.peaks().windows(2).all(|w| w[0].mz < w[1].mz) {
                return Err(MsFlowError::InvalidData {
                    location: format!("spectrum at rt={}", s.rt),
                    message: "peaks are not strictly ascending by mz".to_owned(),
                });
            }
        }
        let mut store = Self { spectra, ranges: StoreRanges::default() };
        store.update_ranges();
        Ok(store)
    }

    /// All stored spectra, sorted ascending by RT.
    #[must_use]
    pub fn spectra(&self) -> &[Spectrum] {
        &self.spectra
    }

    /// Cached min/max bounds, valid as of the last [`Self::update_ranges`] call.
    #[must_use]
    pub fn ranges(&self) -> StoreRanges {
        self.ranges
    }

    /// Half-open range of spectra whose RT lies in `[rt_lo, rt_hi)`. An empty
    /// store returns an empty slice, never an error.
    #[must_use]
    pub fn spectra_by_rt(&self, rt_lo: f64, rt_hi: f64) -> &[Spectrum] {
        let lo = self.spectra.partition_point(|s| s.rt < rt_lo);
        let hi = self.spectra.partition_point(|s| s.rt < rt_hi);
        &self.spectra[lo..hi]
    }

    /// Half-open range of `spectrum`'s peaks with mz in `[mz_lo, mz_hi)`.
    #[must_use]
    pub fn peaks_by_mz<'a>(&self, spectrum: &'a Spectrum, mz_lo: f64, mz_hi: f64) -> &'a [crate::data::peak::Peak1D] {
        spectrum.peaks_in_mz(mz_lo, mz_hi)
    }

    /// Index of the peak immediately after `peak_index` in `spectrum`, or
    /// `NoSuccessor(NextMz)` at the right boundary.
    pub fn next_mz(&self, spectrum: &Spectrum, peak_index: usize) -> Result<usize> {
        let next = peak_index + 1;
        if next < spectrum.peaks().len() {
            Ok(next)
        } else {
            Err(MsFlowError::NoSuccessor(Direction::NextMz))
        }
    }

    /// Index of the peak immediately before `peak_index` in `spectrum`, or
    /// `NoSuccessor(PrevMz)` at the left boundary.
    pub fn prev_mz(&self, _spectrum: &Spectrum, peak_index: usize) -> Result<usize> {
        if peak_index > 0 {
            Ok(peak_index - 1)
        } else {
            Err(MsFlowError::NoSuccessor(Direction::PrevMz))
        }
    }

    /// Index of the spectrum immediately after `spectrum_index` in RT order,
    /// or `NoSuccessor(NextRt)` at the right boundary.
    pub fn next_rt(&self, spectrum_index: usize) -> Result<usize> {
        let next = spectrum_index + 1;
        if next < self.spectra.len() {
            Ok(next)
        } else {
            Err(MsFlowError::NoSuccessor(Direction::NextRt))
        }
    }

    /// Index of the spectrum immediately before `spectrum_index` in RT order,
    /// or `NoSuccessor(PrevRt)` at the left boundary.
    pub fn prev_rt(&self, spectrum_index: usize) -> Result<usize> {
        if spectrum_index > 0 {
            Ok(spectrum_index - 1)
        } else {
            Err(MsFlowError::NoSuccessor(Direction::PrevRt))
        }
    }

    /// Recomputes the cached min/max rt, mz, and intensity bounds.
    pub fn update_ranges(&mut self) {
        let mut rt_range: Option<(f64, f64)> = None;
        let mut mz_range: Option<(f64, f64)> = None;
        let mut intensity_range: Option<(f64, f64)> = None;
        for s in &self.spectra {
            rt_range = Some(match rt_range {
                None => (s.rt, s.rt),
                Some((lo, hi)) => (lo.min(s.rt), hi.max(s.rt)),
            });
            for p in s.peaks() {
                mz_range = Some(match mz_range {
                    None => (p.mz, p.mz),
                    Some((lo, hi)) => (lo.min(p.mz), hi.max(p.mz)),
                });
                intensity_range = Some(match intensity_range {
                    None => (p.intensity, p.intensity),
                    Some((lo, hi)) => (lo.min(p.intensity), hi.max(p.intensity)),
                });
            }
        }
        self.ranges = StoreRanges { rt: rt_range, mz: mz_range, intensity: intensity_range };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::peak::Peak1D;

    fn spectrum(rt: f64, mzs: &[f64]) -> Spectrum {
        Spectrum::new(rt, 1, vec![], mzs.iter().map(|&mz| Peak1D::new(mz, 10.0)).collect()).unwrap()
    }

    #[test]
    fn load_from_sorts_by_rt() {
        let store = PeakStore::load_from(vec![spectrum(3.0, &[100.0]), spectrum(1.0, &[100.0])]).unwrap();
        assert_eq!(store.spectra()[0].rt, 1.0);
        assert_eq!(store.spectra()[1].rt, 3.0);
    }

    #[test]
    fn empty_store_returns_empty_range() {
        let store = PeakStore::new();
        assert!(store.spectra_by_rt(0.0, 100.0).is_empty());
    }

    #[test]
    fn next_rt_at_boundary_fails_with_no_successor() {
        let store = PeakStore::load_from(vec![spectrum(1.0, &[100.0])]).unwrap();
        let err = store.next_rt(0).unwrap_err();
        assert!(err.is_no_successor());
    }

    #[test]
    fn prev_rt_at_start_fails_with_no_successor() {
        let store = PeakStore::load_from(vec![spectrum(1.0, &[100.0])]).unwrap();
        let err = store.prev_rt(0).unwrap_err();
        assert!(err.is_no_successor());
    }

    #[test]
    fn update_ranges_tracks_min_max() {
        let store = PeakStore::load_from(vec![spectrum(1.0, &[100.0, 200.0]), spectrum(5.0, &[50.0])]).unwrap();
        assert_eq!(store.ranges().rt, Some((1.0, 5.0)));
        assert_eq!(store.ranges().mz, Some((50.0, 200.0)));
    }

    #[test]
    fn next_mz_walks_forward_and_fails_at_end() {
        let store = PeakStore::load_from(vec![spectrum(1.0, &[100.0, 200.0])]).unwrap();
        let s = &store.spectra()[0];
        assert_eq!(store.next_mz(s, 0).unwrap(), 1);
        assert!(store.next_mz(s, 1).unwrap_err().is_no_successor());
    }
}

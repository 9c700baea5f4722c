use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::data::peak::Peak1D;
use crate::data::precursor::Precursor;
use crate::error::{MsFlowError, Result};
use crate::value::DataValue;

/// A recorded mass spectrum: its retention time, MS level, precursor chain
/// (for MS^n, n >= 2) and mz-sorted peaks, plus free-form metadata keyed by
/// a small integer (the re-expression of the meta-info registry, §9).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Spectrum {
    /// Retention time at acquisition, in seconds. Always >= 0.
    pub rt: f64,
    /// MS level; 1 for a full scan, >= 2 for a fragmentation scan.
    pub ms_level: u8,
    /// Precursor selection chain; non-empty whenever `ms_level >= 2`.
    pub precursors: Vec<Precursor>,
    peaks: Vec<Peak1D>,
    /// Free-form metadata, keyed by a small integer (interned elsewhere).
    pub metadata: BTreeMap<u32, DataValue>,
}

impl Spectrum {
    /// Builds a spectrum, validating the MS-level/precursor and
    /// mz-sorted-peaks invariants. Returns `InvalidData` if either is violated.
    pub fn new(rt: f64, ms_level: u8, precursors: Vec<Precursor>, peaks: Vec<Peak1D>) -> Result<Self> {
        if ms_level >= 2 && precursors.is_empty() {
            return Err(MsFlowError::InvalidData {
                location: format!("spectrum at rt={rt}"),
                message: format!("ms_level {ms_level} requires at least one precursor"),
            });
        }
        if !peaks.windows(2).all(|w| w[0].mz < w[1].mz) {
            return Err(MsFlowError::InvalidData {
                location: format!("spectrum at rt={rt}"),
                message: "peaks are not strictly ascending by mz".to_owned(),
            });
        }
        Ok(Self {
            rt,
            ms_level,
            precursors,
            peaks,
            metadata: BTreeMap::new(),
        })
    }

    /// The mz-sorted peaks of this spectrum. Invariant: always strictly
    /// ascending by mz for any consumer that observes them.
    #[must_use]
    pub fn peaks(&self) -> &[Peak1D] {
        &self.peaks
    }

    /// Half-open range of peaks whose mz lies in `[mz_lo, mz_hi)`, found by
    /// binary search in O(log P).
    #[must_use]
    pub fn peaks_in_mz(&self, mz_lo: f64, mz_hi: f64) -> &[Peak1D] {
        let lo = self.peaks.partition_point(|p| p.mz < mz_lo);
        let hi = self.peaks.partition_point(|p| p.mz < mz_hi);
        &self.peaks[lo..hi]
    }

    /// Index of the first peak with `mz >= target`, or `None` if every peak
    /// has a smaller mz (the "next_mz" boundary case).
    #[must_use]
    pub fn next_mz_index(&self, target: f64) -> Option<usize> {
        let idx = self.peaks.partition_point(|p| p.mz < target);
        (idx < self.peaks.len()).then_some(idx)
    }

    /// Index of the last peak with `mz <= target`, or `None` if every peak
    /// has a larger mz (the "prev_mz" boundary case).
    #[must_use]
    pub fn prev_mz_index(&self, target: f64) -> Option<usize> {
        let idx = self.peaks.partition_point(|p| p.mz <= target);
        (idx > 0).then(|| idx - 1)
    }

    /// Attaches a metadata value under `key`, overwriting any previous value.
    pub fn set_metadata(&mut self, key: u32, value: impl Into<DataValue>) {
        self.metadata.insert(key, value.into());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(mz: f64) -> Peak1D {
        Peak1D::new(mz, 10.0)
    }

    #[test]
    fn ms1_without_precursor_is_valid() {
        let s = Spectrum::new(1.0, 1, vec![], vec![p(100.0), p(200.0)]);
        assert!(s.is_ok());
    }

    #[test]
    fn ms2_without_precursor_is_invalid_data() {
        let s = Spectrum::new(1.0, 2, vec![], vec![p(100.0)]);
        assert!(matches!(s, Err(MsFlowError::InvalidData { .. })));
    }

    #[test]
    fn unsorted_peaks_are_invalid_data() {
        let s = Spectrum::new(1.0, 1, vec![], vec![p(200.0), p(100.0)]);
        assert!(matches!(s, Err(MsFlowError::InvalidData { .. })));
    }

    #[test]
    fn peaks_in_mz_range_is_half_open() {
        let s = Spectrum::new(1.0, 1, vec![], vec![p(100.0), p(150.0), p(200.0)]).unwrap();
        let r = s.peaks_in_mz(100.0, 200.0);
        assert_eq!(r.len(), 2);
        assert_eq!(r[0].mz, 100.0);
        assert_eq!(r[1].mz, 150.0);
    }

    #[test]
    fn next_mz_index_at_boundary_is_none() {
        let s = Spectrum::new(1.0, 1, vec![], vec![p(100.0)]).unwrap();
        assert_eq!(s.next_mz_index(200.0), None);
    }
}

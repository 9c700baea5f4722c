//! Peak-level neighbor navigation built on top of [`PeakStore`]'s
//! spectrum-level primitives. `PeakStore::next_rt`/`prev_rt` only step
//! between whole spectra (§4.1); the extender needs a *peak* successor, so
//! this wraps that step with a nearest-mz lookup in the adjacent spectrum.

use msflow_core::data::Peak1D;
use msflow_core::error::Result;
use msflow_core::store::PeakStore;

use crate::flags::PeakRef;

/// Resolves the four directional neighbor queries the Simple Extender uses,
/// on top of a borrowed [`PeakStore`].
pub struct PeakNavigator<'a> {
    store: &'a PeakStore,
}

impl<'a> PeakNavigator<'a> {
    /// Wraps `store` for peak-level navigation.
    #[must_use]
    pub fn new(store: &'a PeakStore) -> Self {
        Self { store }
    }

    /// The peak at `peak_ref`.
    #[must_use]
    pub fn peak(&self, peak_ref: PeakRef) -> Peak1D {
        self.store.spectra()[peak_ref.spectrum_index].peaks()[peak_ref.peak_index]
    }

    /// The RT of the spectrum `peak_ref` lives in.
    #[must_use]
    pub fn rt(&self, peak_ref: PeakRef) -> f64 {
        self.store.spectra()[peak_ref.spectrum_index].rt
    }

    /// The peak immediately after `peak_ref` by m/z within the same spectrum.
    pub fn next_mz(&self, peak_ref: PeakRef) -> Result<PeakRef> {
        let spectrum = &self.store.spectra()[peak_ref.spectrum_index];
        self.store
            .next_mz(spectrum, peak_ref.peak_index)
            .map(|peak_index| PeakRef { spectrum_index: peak_ref.spectrum_index, peak_index })
    }

    /// The peak immediately before `peak_ref` by m/z within the same spectrum.
    pub fn prev_mz(&self, peak_ref: PeakRef) -> Result<PeakRef> {
        let spectrum = &self.store.spectra()[peak_ref.spectrum_index];
        self.store
            .prev_mz(spectrum, peak_ref.peak_index)
            .map(|peak_index| PeakRef { spectrum_index: peak_ref.spectrum_index, peak_index })
    }

    /// The nearest-m/z peak to `peak_ref` in the next spectrum by RT.
    pub fn next_rt(&self, peak_ref: PeakRef) -> Result<PeakRef> {
        let next_spectrum_index = self.store.next_rt(peak_ref.spectrum_index)?;
        Ok(self.nearest_mz_in(peak_ref, next_spectrum_index))
    }

    /// The nearest-m/z peak to `peak_ref` in the previous spectrum by RT.
    pub fn prev_rt(&self, peak_ref: PeakRef) -> Result<PeakRef> {
        let prev_spectrum_index = self.store.prev_rt(peak_ref.spectrum_index)?;
        Ok(self.nearest_mz_in(peak_ref, prev_spectrum_index))
    }

    fn nearest_mz_in(&self, peak_ref: PeakRef, spectrum_index: usize) -> PeakRef {
        let target_mz = self.peak(peak_ref).mz;
        let spectrum = &self.store.spectra()[spectrum_index];
        let peak_index = match (spectrum.next_mz_index(target_mz), spectrum.prev_mz_index(target_mz)) {
            (Some(next), Some(prev)) => {
                let next_peak = spectrum.peaks()[next];
                let prev_peak = spectrum.peaks()[prev];
                if (next_peak.mz - target_mz).abs() <= (target_mz - prev_peak.mz).abs() {
                    next
                } else {
                    prev
                }
            }
            (Some(next), None) => next,
            (None, Some(prev)) => prev,
            (None, None) => 0,
        };
        PeakRef { spectrum_index, peak_index }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use msflow_core::data::peak::Peak1D;
    use msflow_core::data::spectrum::Spectrum;

    fn store() -> PeakStore {
        let s1 = Spectrum::new(1.0, 1, vec![], vec![Peak1D::new(100.0, 10.0), Peak1D::new(200.0, 20.0)]).unwrap();
        let s2 = Spectrum::new(2.0, 1, vec![], vec![Peak1D::new(101.0, 10.0), Peak1D::new(199.0, 20.0)]).unwrap();
        PeakStore::load_from(vec![s1, s2]).unwrap()
    }

    #[test]
    fn next_rt_finds_nearest_mz_peak() {
        let store = store();
        let nav = PeakNavigator::new(&store);
        let r = PeakRef { spectrum_index: 0, peak_index: 0 };
        let next = nav.next_rt(r).unwrap();
        assert_eq!(next.spectrum_index, 1);
        assert!((nav.peak(next).mz - 101.0).abs() < 1e-6);
    }

    #[test]
    fn next_mz_walks_within_spectrum() {
        let store = store();
        let nav = PeakNavigator::new(&store);
        let r = PeakRef { spectrum_index: 0, peak_index: 0 };
        let next = nav.next_mz(r).unwrap();
        assert_eq!(next.peak_index, 1);
    }
}

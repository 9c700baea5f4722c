//! The per-run peak-flag vector: the only shared mutable structure a
//! feature-finder run touches, mutated only by the active extender on
//! distinct seeds that never overlap by construction.

/// A reference to one peak by its position in a [`msflow_core::store::PeakStore`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PeakRef {
    /// Index into `PeakStore::spectra()`.
    pub spectrum_index: usize,
    /// Index into that spectrum's `peaks()`.
    pub peak_index: usize,
}

/// A peak's claim state during a feature-finder run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Flag {
    /// Not yet claimed by any seed or feature.
    #[default]
    Unused,
    /// The originating seed of a feature candidate; stays set even if the
    /// candidate is later discarded, to prevent reseeding the same peak.
    Seed,
    /// Claimed by an accepted feature.
    InsideFeature,
}

/// A dense flag per spectrum, mirroring `PeakStore`'s spectrum/peak shape.
#[derive(Debug, Clone)]
pub struct FlagGrid {
    rows: Vec<Vec<Flag>>,
}

impl FlagGrid {
    /// Builds an all-`Unused` grid with `peak_counts[i]` peaks in spectrum `i`.
    #[must_use]
    pub fn new(peak_counts: &[usize]) -> Self {
        Self { rows: peak_counts.iter().map(|&n| vec![Flag::default(); n]).collect() }
    }

    /// The flag at `peak_ref`.
    #[must_use]
    pub fn get(&self, peak_ref: PeakRef) -> Flag {
        self.rows[peak_ref.spectrum_index][peak_ref.peak_index]
    }

    /// Sets the flag at `peak_ref`.
    pub fn set(&mut self, peak_ref: PeakRef, flag: Flag) {
        self.rows[peak_ref.spectrum_index][peak_ref.peak_index] = flag;
    }

    /// `true` if `peak_ref` is still `Unused`.
    #[must_use]
    pub fn is_unused(&self, peak_ref: PeakRef) -> bool {
        self.get(peak_ref) == Flag::Unused
    }

    /// All peak refs, in `(spectrum_index, peak_index)` order.
    pub fn iter_refs(&self) -> impl Iterator<Item = PeakRef> + '_ {
        self.rows.iter().enumerate().flat_map(|(s, row)| (0..row.len()).map(move |p| PeakRef { spectrum_index: s, peak_index: p }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_grid_is_all_unused() {
        let grid = FlagGrid::new(&[3, 2]);
        assert!(grid.iter_refs().all(|r| grid.is_unused(r)));
    }

    #[test]
    fn set_and_get_round_trip() {
        let mut grid = FlagGrid::new(&[3]);
        let r = PeakRef { spectrum_index: 0, peak_index: 1 };
        grid.set(r, Flag::Seed);
        assert_eq!(grid.get(r), Flag::Seed);
    }
}

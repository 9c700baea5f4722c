//! `ChromatogramExtractor`: builds per-transition chromatograms out of a
//! spectrum stream and a transition list.

use msflow_align::rt_transform::RTTransformation;
use msflow_core::data::{Chromatogram, ChromatogramType, MRMTransitionGroup, Precursor, Transition, TransitionList};
use msflow_core::error::{MsFlowError, Result};
use msflow_core::store::PeakStore;

/// A tolerance expressed either in absolute Th or in parts-per-million of
/// the target m/z.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MzTolerance {
    /// Absolute tolerance, in Th.
    Th(f64),
    /// Relative tolerance, in parts per million of the target m/z.
    Ppm(f64),
}

impl MzTolerance {
    /// The half-window `[target - delta, target + delta]` this tolerance
    /// resolves to around `target`.
    #[must_use]
    pub fn half_width(&self, target: f64) -> f64 {
        match *self {
            Self::Th(delta) => delta,
            Self::Ppm(ppm) => target * ppm * 1e-6,
        }
    }
}

/// How peaks within a transition's m/z window are accumulated into one
/// chromatogram point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccumulationMode {
    /// Sum of all peak intensities inside the window.
    TopHat,
    /// Triangular (Bartlett) weighting, full weight at the window center,
    /// decaying linearly to zero at the edges.
    Bartlett,
}

/// Parameters controlling extraction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExtractionParams {
    /// Tolerance applied around each transition's product (or precursor) m/z.
    pub mz_tolerance: MzTolerance,
    /// Accumulation mode for peaks within the window.
    pub accumulation: AccumulationMode,
    /// RT window half-width around the expected RT; negative disables the filter.
    pub rt_extraction_window: f64,
    /// If `true`, extract a precursor (MS1, "base peak") chromatogram per
    /// group instead of per-product-ion chromatograms.
    pub ms1_mode: bool,
}

impl Default for ExtractionParams {
    fn default() -> Self {
        Self {
            mz_tolerance: MzTolerance::Th(0.05),
            accumulation: AccumulationMode::TopHat,
            rt_extraction_window: -1.0,
            ms1_mode: false,
        }
    }
}

/// A prepared extraction coordinate: a center m/z plus an optional RT window,
/// sorted ascending by m/z so a single pass over spectra suffices.
#[derive(Debug, Clone, PartialEq)]
struct ExtractionCoordinate {
    native_id: String,
    center_mz: f64,
    precursor_mz: f64,
    rt_window: Option<(f64, f64)>,
}

/// Builds per-transition (or per-precursor, in MS1 mode) chromatograms from
/// a transition list and a spectrum stream.
#[derive(Debug, Clone, Copy, Default)]
pub struct ChromatogramExtractor {
    params: ExtractionParams,
}

impl ChromatogramExtractor {
    /// Builds an extractor with the given parameters.
    #[must_use]
    pub fn new(params: ExtractionParams) -> Self {
        Self { params }
    }

    /// Prepares extraction coordinates for `transitions`, sorted ascending
    /// by m/z. Returns `InvalidArgument` if an RT window is requested
    /// (`rt_extraction_window > 0`) for a transition lacking `normalized_rt`.
    /// When `rt_transform` is given, each transition's `normalized_rt` is
    /// mapped through it before the window is built around it, per §4.8's
    /// "transformed expected RT" rule.
    fn prepare_coordinates(
        &self,
        transitions: &[&Transition],
        rt_transform: Option<&RTTransformation>,
    ) -> Result<Vec<ExtractionCoordinate>> {
        let mut coords = Vec::with_capacity(transitions.len());
        for t in transitions {
            let rt_window = if self.params.rt_extraction_window > 0.0 {
                let library_rt = t.normalized_rt.ok_or_else(|| {
                    MsFlowError::InvalidArgument(format!(
                        "transition {} requires normalized_rt for a restricted RT window",
                        t.native_id
                    ))
                })?;
                let expected = match rt_transform {
                    Some(transform) => transform.apply(library_rt),
                    None => library_rt,
                };
                let half = self.params.rt_extraction_window / 2.0;
                Some((expected - half, expected + half))
            } else {
                None
            };
            let center_mz = if self.params.ms1_mode { t.precursor_mz } else { t.product_mz };
            coords.push(ExtractionCoordinate {
                native_id: t.native_id.clone(),
                center_mz,
                precursor_mz: t.precursor_mz,
                rt_window,
            });
        }
        coords.sort_by(|a, b| a.center_mz.total_cmp(&b.center_mz));
        Ok(coords)
    }

    /// Extracts one `MRMTransitionGroup` for `group_id` from `transitions`
    /// (expected to share a peptide/group) against `store`. `rt_transform`,
    /// when given, maps each transition's library RT into `store`'s RT
    /// coordinate before the RT-window filter is applied. Chromatograms are
    /// emitted for every transition even when no spectrum in `store`
    /// contributes a single point (an empty chromatogram is still emitted).
    pub fn extract(
        &self,
        store: &PeakStore,
        group_id: impl Into<String>,
        transitions: Vec<Transition>,
        rt_transform: Option<&RTTransformation>,
    ) -> Result<MRMTransitionGroup> {
        let refs: Vec<&Transition> = transitions.iter().collect();
        let coords = self.prepare_coordinates(&refs, rt_transform)?;

        let relevant_ms_level = if self.params.ms1_mode { 1 } else { 2 };
        let spectra: Vec<_> = store.spectra().iter().filter(|s| s.ms_level == relevant_ms_level).collect();

        let chromatogram_type = if self.params.ms1_mode {
            ChromatogramType::BasePeak
        } else {
            ChromatogramType::SelectedReactionMonitoring
        };
        let mut chromatograms: Vec<Chromatogram> = coords
            .iter()
            .map(|c| {
                let mut chrom = Chromatogram::new(c.native_id.clone(), c.center_mz, chromatogram_type);
                chrom.precursor = Some(Precursor::new(c.precursor_mz, None, 0.0));
                chrom
            })
            .collect();

        for spectrum in &spectra {
            for (coord, chrom) in coords.iter().zip(chromatograms.iter_mut()) {
                if let Some((lo, hi)) = coord.rt_window {
                    if spectrum.rt < lo || spectrum.rt > hi {
                        continue;
                    }
                }
                let half = self.params.mz_tolerance.half_width(coord.center_mz);
                let window = spectrum.peaks_in_mz(coord.center_mz - half, coord.center_mz + half);
                if window.is_empty() {
                    continue;
                }
                let accumulated = match self.params.accumulation {
                    AccumulationMode::TopHat => window.iter().map(|p| p.intensity).sum(),
                    AccumulationMode::Bartlett => window
                        .iter()
                        .map(|p| {
                            let dist = (p.mz - coord.center_mz).abs();
                            let weight = (1.0 - dist / half.max(f64::MIN_POSITIVE)).max(0.0);
                            p.intensity * weight
                        })
                        .sum(),
                };
                chrom.push(spectrum.rt, accumulated);
            }
        }

        let mut group = MRMTransitionGroup::new(group_id, transitions);
        if self.params.ms1_mode {
            group.precursor_chromatogram = chromatograms.into_iter().next();
        } else {
            group.chromatograms = coords.iter().map(|c| c.native_id.clone()).zip(chromatograms).collect();
        }
        Ok(group)
    }
}

/// Convenience wrapper: extracts one group per distinct `peptide_ref` in
/// `transitions`. `rt_transform` is forwarded to every group's
/// [`ChromatogramExtractor::extract`] call.
pub fn extract_all(
    extractor: &ChromatogramExtractor,
    store: &PeakStore,
    transitions: &TransitionList,
    rt_transform: Option<&RTTransformation>,
) -> Result<Vec<MRMTransitionGroup>> {
    let mut peptide_refs: Vec<&str> = transitions.transitions().iter().map(|t| t.peptide_ref.as_str()).collect();
    peptide_refs.sort_unstable();
    peptide_refs.dedup();

    peptide_refs
        .into_iter()
        .map(|peptide_ref| {
            let group_transitions: Vec<Transition> = transitions.for_peptide(peptide_ref).into_iter().cloned().collect();
            extractor.extract(store, peptide_ref, group_transitions, rt_transform)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use msflow_core::data::peak::Peak1D;
    use msflow_core::data::spectrum::Spectrum;

    fn transition(id: &str, product_mz: f64, normalized_rt: Option<f64>) -> Transition {
        Transition {
            native_id: id.to_owned(),
            peptide_ref: "PEP1".to_owned(),
            precursor_mz: 500.0,
            product_mz,
            library_intensity: 100.0,
            decoy: false,
            normalized_rt,
        }
    }

    fn ms2_store() -> PeakStore {
        let spectra = (0..5)
            .map(|i| {
                let rt = i as f64 * 10.0;
                Spectrum::new(
                    rt,
                    2,
                    vec![Precursor::new(500.0, Some(2), 1.0)],
                    vec![Peak1D::new(300.0, 1000.0 - (rt - 20.0).abs() * 10.0)],
                )
                .unwrap()
            })
            .collect();
        PeakStore::load_from(spectra).unwrap()
    }

    #[test]
    fn tophat_extraction_accumulates_peaks_in_window() {
        let store = ms2_store();
        let extractor = ChromatogramExtractor::default();
        let group = extractor.extract(&store, "PEP1", vec![transition("t1", 300.0, None)], None).unwrap();
        let chrom = &group.chromatograms["t1"];
        assert_eq!(chrom.points().len(), 5);
        assert!(chrom.integral() > 0.0);
    }

    #[test]
    fn transition_without_matching_spectrum_still_emits_empty_chromatogram() {
        let store = ms2_store();
        let extractor = ChromatogramExtractor::default();
        let group = extractor.extract(&store, "PEP1", vec![transition("t2", 900.0, None)], None).unwrap();
        let chrom = &group.chromatograms["t2"];
        assert!(chrom.is_empty());
    }

    #[test]
    fn rt_window_without_normalized_rt_is_invalid_argument() {
        let store = ms2_store();
        let extractor = ChromatogramExtractor::new(ExtractionParams { rt_extraction_window: 10.0, ..ExtractionParams::default() });
        let result = extractor.extract(&store, "PEP1", vec![transition("t1", 300.0, None)], None);
        assert!(matches!(result, Err(MsFlowError::InvalidArgument(_))));
    }

    #[test]
    fn rt_window_filters_points_outside_range() {
        let store = ms2_store();
        let extractor = ChromatogramExtractor::new(ExtractionParams { rt_extraction_window: 10.0, ..ExtractionParams::default() });
        let group = extractor.extract(&store, "PEP1", vec![transition("t1", 300.0, Some(20.0))], None).unwrap();
        let chrom = &group.chromatograms["t1"];
        assert!(chrom.points().iter().all(|p| (15.0..=25.0).contains(&p.rt)));
    }

    #[test]
    fn rt_window_is_built_around_the_transformed_expected_rt() {
        use msflow_align::rt_transform::{AnchorPair, RTTransformation, TransformKind};

        let store = ms2_store();
        let extractor = ChromatogramExtractor::new(ExtractionParams { rt_extraction_window: 10.0, ..ExtractionParams::default() });
        // library RT 0.0 maps to run RT 20.0; a window built from the raw
        // library RT (0.0 +/- 5.0) would exclude every point in ms2_store().
        let anchors = [AnchorPair { source: 0.0, target: 20.0 }, AnchorPair { source: 1.0, target: 21.0 }];
        let transform = RTTransformation::fit(&anchors, TransformKind::Linear, None).unwrap();
        let group = extractor.extract(&store, "PEP1", vec![transition("t1", 300.0, Some(0.0))], Some(&transform)).unwrap();
        let chrom = &group.chromatograms["t1"];
        assert!(!chrom.is_empty());
        assert!(chrom.points().iter().all(|p| (15.0..=25.0).contains(&p.rt)));
    }

    #[test]
    fn bartlett_weighting_reduces_off_center_contribution() {
        let spectra = vec![Spectrum::new(0.0, 2, vec![Precursor::new(500.0, Some(2), 1.0)], vec![Peak1D::new(300.04, 100.0)]).unwrap()];
        let store = PeakStore::load_from(spectra).unwrap();
        let extractor = ChromatogramExtractor::new(ExtractionParams {
            mz_tolerance: MzTolerance::Th(0.05),
            accumulation: AccumulationMode::Bartlett,
            ..ExtractionParams::default()
        });
        let group = extractor.extract(&store, "PEP1", vec![transition("t1", 300.0, None)], None).unwrap();
        let chrom = &group.chromatograms["t1"];
        assert!(chrom.points()[0].intensity < 100.0);
    }
}

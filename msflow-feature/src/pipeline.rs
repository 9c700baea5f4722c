//! The three-stage feature-finder state machine: INIT -> SEEDING -> EXTENDING
//! -> FITTING -> ACCEPT/DISCARD.

use msflow_core::data::FeatureMap;
use msflow_core::error::Result;
use msflow_core::progress::{CancellationToken, LoggingProgressLogger, ProgressLogger};
use msflow_core::store::PeakStore;

use crate::extender::Extender;
use crate::flags::{Flag, FlagGrid, PeakRef};
use crate::model_fitter::ModelFitter;
use crate::seeder::Seeder;

/// Acceptance parameters for the FITTING -> ACCEPT/DISCARD transition.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AcceptanceParams {
    /// Minimum overall quality for a fitted candidate to be accepted.
    pub quality_threshold: f64,
    /// Minimum peak count for a fitted candidate to be accepted.
    pub min_peak_count: usize,
}

impl Default for AcceptanceParams {
    fn default() -> Self {
        Self { quality_threshold: 0.7, min_peak_count: 2 }
    }
}

/// Drives a `Seeder` / `Extender` / `ModelFitter` through the
/// INIT -> SEEDING -> EXTENDING -> FITTING -> ACCEPT/DISCARD state machine
/// until the seeder yields no further candidates.
pub struct FeatureFinderPipeline<S, E, F> {
    seeder: S,
    extender: E,
    fitter: F,
    acceptance: AcceptanceParams,
}

impl<S: Seeder, E: Extender, F: ModelFitter> FeatureFinderPipeline<S, E, F> {
    /// Builds a pipeline from its three stages and acceptance parameters.
    pub fn new(seeder: S, extender: E, fitter: F, acceptance: AcceptanceParams) -> Self {
        Self { seeder, extender, fitter, acceptance }
    }

    /// Runs the pipeline to completion over `store`, producing a `FeatureMap`
    /// for `document_id`. Consults `progress` after each seed and aborts
    /// (returning whatever features were accepted so far) if `cancellation`
    /// is set.
    pub fn run(
        &mut self,
        store: &PeakStore,
        document_id: impl Into<String>,
        progress: &dyn ProgressLogger,
        cancellation: &CancellationToken,
    ) -> Result<FeatureMap> {
        let peak_counts: Vec<usize> = store.spectra().iter().map(|s| s.peaks().len()).collect();
        let mut flags = FlagGrid::new(&peak_counts);
        let mut map = FeatureMap::new(document_id);

        let total_peaks: usize = peak_counts.iter().sum();
        let mut seed_index = 0usize;

        while let Some(seed) = self.seeder.next_seed(store, &flags) {
            if cancellation.is_cancelled() {
                log::info!("feature finder cancelled after {seed_index} seeds");
                break;
            }

            for &p in &seed.peaks {
                flags.set(p, Flag::Seed);
            }

            let region = self.extender.extend(store, &mut flags, &seed)?;
            let fit_result = self.fitter.fit(store, &region, seed.charge);

            match fit_result {
                Ok((feature, quality)) if quality >= self.acceptance.quality_threshold && region.len() >= self.acceptance.min_peak_count => {
                    for &p in &region {
                        flags.set(p, Flag::InsideFeature);
                    }
                    map.push(feature);
                }
                _ => {
                    release_region(&mut flags, &region, &seed);
                }
            }

            seed_index += 1;
            progress.seed_done(seed_index, total_peaks.max(seed_index));
        }

        Ok(map)
    }
}

fn release_region(flags: &mut FlagGrid, region: &[PeakRef], seed: &crate::seeder::ChargedIndexSet) {
    let seed_set: std::collections::HashSet<PeakRef> = seed.peaks.iter().copied().collect();
    for &p in region {
        if seed_set.contains(&p) {
            flags.set(p, Flag::Seed);
        } else {
            flags.set(p, Flag::Unused);
        }
    }
    for &p in &seed.peaks {
        flags.set(p, Flag::Seed);
    }
}

impl<S: Seeder, E: Extender, F: ModelFitter> FeatureFinderPipeline<S, E, F> {
    /// Convenience wrapper around [`Self::run`] with the default logging
    /// progress logger and a fresh, unset cancellation token.
    pub fn run_with_defaults(&mut self, store: &PeakStore, document_id: impl Into<String>) -> Result<FeatureMap> {
        self.run(store, document_id, &LoggingProgressLogger, &CancellationToken::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extender::{ExtenderParams, SimpleExtender};
    use crate::model_fitter::ExtendedIsotopeFitter;
    use crate::seeder::SimpleSeeder;
    use msflow_core::data::peak::Peak1D;
    use msflow_core::data::spectrum::Spectrum;

    fn store_with_elution_peak() -> PeakStore {
        let spectra: Vec<Spectrum> = (0..6)
            .map(|i| {
                let rt = i as f64;
                let intensity = 1000.0 * (-((rt - 3.0).powi(2)) / 2.0).exp();
                Spectrum::new(rt, 1, vec![], vec![Peak1D::new(500.0, intensity.max(1.0))]).unwrap()
            })
            .collect();
        PeakStore::load_from(spectra).unwrap()
    }

    #[test]
    fn pipeline_terminates_and_returns_a_feature_map() {
        let store = store_with_elution_peak();
        let mut pipeline = FeatureFinderPipeline::new(
            SimpleSeeder::default(),
            SimpleExtender::new(ExtenderParams::default()),
            ExtendedIsotopeFitter::default(),
            AcceptanceParams { quality_threshold: 0.0, min_peak_count: 1 },
        );
        let map = pipeline.run_with_defaults(&store, "run-1").unwrap();
        assert!(map.len() <= 6);
    }

    #[test]
    fn pipeline_respects_cancellation() {
        let store = store_with_elution_peak();
        let mut pipeline = FeatureFinderPipeline::new(
            SimpleSeeder::default(),
            SimpleExtender::new(ExtenderParams::default()),
            ExtendedIsotopeFitter::default(),
            AcceptanceParams::default(),
        );
        let token = CancellationToken::new();
        token.cancel();
        let map = pipeline.run(&store, "run-1", &LoggingProgressLogger, &token).unwrap();
        assert_eq!(map.len(), 0);
    }
}

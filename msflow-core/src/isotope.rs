//! The averagine model: an elemental composition estimated from a neutral
//! mass, and the theoretical isotope envelope that composition produces.

use ndarray::{Array1, Axis, arr1, concatenate, s};
use probability::distribution::{Binomial, Discrete};
use std::cmp::Ordering;

use crate::error::{MsFlowError, Result};

/// Mass of a proton, in Da; used to convert between observed m/z and neutral mass.
pub const PROTON_MASS: f64 = 1.007_276_466_88;

/// One isotope of an element entering the averagine composition: its
/// nominal mass offset from the lightest isotope (in integer Da steps) and
/// its natural abundance.
#[derive(Debug, Clone, Copy)]
struct ElementIsotope {
    offset: usize,
    abundance: f64,
}

/// Per-element averagine coefficients (atoms per Dalton of neutral mass) and
/// the natural isotope pattern used to build the theoretical envelope.
struct AveragineElement {
    coefficient: f64,
    isotopes: &'static [ElementIsotope],
}

const CARBON: AveragineElement = AveragineElement {
    coefficient: 0.044_44,
    isotopes: &[ElementIsotope { offset: 1, abundance: 0.0107 }],
};
const HYDROGEN: AveragineElement = AveragineElement {
    coefficient: 0.069_82,
    isotopes: &[ElementIsotope { offset: 1, abundance: 0.000_115 }],
};
const NITROGEN: AveragineElement = AveragineElement {
    coefficient: 0.012_22,
    isotopes: &[ElementIsotope { offset: 1, abundance: 0.003_64 }],
};
const OXYGEN: AveragineElement = AveragineElement {
    coefficient: 0.013_29,
    isotopes: &[
        ElementIsotope { offset: 1, abundance: 0.000_38 },
        ElementIsotope { offset: 2, abundance: 0.002_05 },
    ],
};
const SULFUR: AveragineElement = AveragineElement {
    coefficient: 0.000_375,
    isotopes: &[
        ElementIsotope { offset: 1, abundance: 0.0076 },
        ElementIsotope { offset: 2, abundance: 0.0429 },
    ],
};

const AVERAGINE_ELEMENTS: [AveragineElement; 5] = [CARBON, HYDROGEN, NITROGEN, OXYGEN, SULFUR];

/// An elemental composition (counts of C, H, N, O, S) derived from a neutral
/// mass by the averagine coefficients.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AveragineComposition {
    /// Atom counts in `[C, H, N, O, S]` order.
    pub counts: [u32; 5],
}

impl AveragineComposition {
    /// Computes the nearest-integer averagine composition for neutral mass `mass`.
    #[must_use]
    pub fn for_mass(mass: f64) -> Self {
        let mut counts = [0u32; 5];
        for (i, element) in AVERAGINE_ELEMENTS.iter().enumerate() {
            counts[i] = (mass * element.coefficient).round().max(0.0) as u32;
        }
        Self { counts }
    }
}

/// A theoretical isotope envelope: normalized relative intensities at
/// successive nominal-Da offsets from the monoisotopic peak, then widened to
/// Th-spaced lines by convolution with a Gaussian.
#[derive(Debug, Clone, PartialEq)]
pub struct IsotopeModel {
    /// Relative intensities, index 0 is the monoisotopic peak, summing to 1
    /// (after any `trim_right_cutoff` trimming).
    pub intensities: Vec<f64>,
    /// Spacing between adjacent lines, in Th (1 / charge for a charged species).
    pub spacing: f64,
}

impl IsotopeModel {
    /// Builds the theoretical distribution for `composition`, trimmed to
    /// intensities >= `trim_right_cutoff` (a value of 0 keeps the full tail)
    /// and renormalized to sum to 1, widened in Th-space by a Gaussian of
    /// standard deviation `stdev` sampled every `spacing` Th (1/charge).
    #[must_use]
    pub fn theoretical(composition: AveragineComposition, trim_right_cutoff: f64, stdev: f64, charge: u32) -> Self {
        let spacing = 1.0 / f64::from(charge.max(1));
        let raw = nominal_distribution(composition, 1e-7);
        let trimmed = trim_and_normalize(&raw, trim_right_cutoff);
        let widened = widen_gaussian(&trimmed, spacing, stdev);
        Self { intensities: widened, spacing }
    }

    /// Index of the most intense line.
    #[must_use]
    pub fn apex_index(&self) -> usize {
        self.intensities
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(b.1))
            .map(|(i, _)| i)
            .unwrap_or(0)
    }

    /// `(left, right)` extents such that the distribution mass outside
    /// `[left, right]` is below `mass_threshold`.
    #[must_use]
    pub fn extents(&self, mass_threshold: f64) -> (usize, usize) {
        let total: f64 = self.intensities.iter().sum();
        if total <= 0.0 || self.intensities.is_empty() {
            return (0, 0);
        }
        let mut left = 0;
        let mut acc = 0.0;
        for (i, v) in self.intensities.iter().enumerate() {
            acc += v / total;
            if acc >= mass_threshold {
                left = i;
                break;
            }
        }
        let mut right = self.intensities.len() - 1;
        acc = 0.0;
        for (i, v) in self.intensities.iter().enumerate().rev() {
            acc += v / total;
            if acc >= mass_threshold {
                right = i;
                break;
            }
        }
        (left, right.max(left))
    }

    /// Pearson correlation between this distribution's intensities and
    /// `observed` satellite intensities, truncated/zero-padded to the
    /// shorter length. Returns a value in `[-1, 1]`.
    #[must_use]
    pub fn similarity(&self, observed: &[f64]) -> f64 {
        let n = self.intensities.len().min(observed.len());
        if n == 0 {
            return 0.0;
        }
        let theo = &self.intensities[..n];
        let obs = &observed[..n];
        let theo_mean = theo.iter().sum::<f64>() / n as f64;
        let obs_mean = obs.iter().sum::<f64>() / n as f64;
        let mut cov = 0.0;
        let mut theo_var = 0.0;
        let mut obs_var = 0.0;
        for i in 0..n {
            let dt = theo[i] - theo_mean;
            let dob = obs[i] - obs_mean;
            cov += dt * dob;
            theo_var += dt * dt;
            obs_var += dob * dob;
        }
        if theo_var <= 0.0 || obs_var <= 0.0 {
            return 0.0;
        }
        cov / (theo_var.sqrt() * obs_var.sqrt())
    }

    /// `true` if `self.similarity(observed) >= averagine_similarity`, the
    /// bulk-matching gate.
    #[must_use]
    pub fn matches(&self, observed: &[f64], averagine_similarity: f64) -> bool {
        self.similarity(observed) >= averagine_similarity
    }
}

/// Neutral mass from observed m/z and trial charge `z`: `z * mz - z * proton_mass`.
#[must_use]
pub fn neutral_mass(mz: f64, charge: i32) -> f64 {
    f64::from(charge) * mz - f64::from(charge) * PROTON_MASS
}

/// m/z from neutral mass and trial charge `z`: the inverse of [`neutral_mass`].
/// Fails with `InvalidArgument` for `charge == 0`.
pub fn mz_from_neutral_mass(mass: f64, charge: i32) -> Result<f64> {
    if charge == 0 {
        return Err(MsFlowError::InvalidArgument("charge must be nonzero".to_owned()));
    }
    Ok(mass / f64::from(charge) + PROTON_MASS)
}

/// Builds the nominal-Da-offset distribution by successively convolving each
/// element's per-atom isotope pattern into a running polynomial, the same
/// combine-by-convolution shape the averagine/isotopic-distribution
/// calculation always takes: each element contributes a binomial spread at
/// its isotope offsets, interleaved with zeros between offsets, then summed
/// into the accumulator shifted by each possible count.
fn nominal_distribution(composition: AveragineComposition, threshold: f64) -> Array1<f64> {
    let mut result = arr1(&[1.0]);
    for (element, &count) in AVERAGINE_ELEMENTS.iter().zip(composition.counts.iter()) {
        if count == 0 || element.isotopes.is_empty() {
            continue;
        }
        let amount = count as usize;
        for isotope in element.isotopes {
            let binomial = Binomial::new(amount, isotope.abundance);
            let tail = (0..=amount)
                .rev()
                .map(|t| binomial.mass(t))
                .take_while(|a| *a < threshold)
                .count();
            let mut distribution: Array1<f64> = (0..=amount.saturating_sub(tail))
                .map(|t| binomial.mass(t))
                .flat_map(|a| std::iter::once(a).chain(std::iter::repeat(0.0)).take(isotope.offset))
                .collect();

            match result.len().cmp(&distribution.len()) {
                Ordering::Less => {
                    result.append(Axis(0), Array1::zeros(distribution.len() - result.len()).view()).unwrap();
                }
                Ordering::Greater => {
                    distribution.append(Axis(0), Array1::zeros(result.len() - distribution.len()).view()).unwrap();
                }
                Ordering::Equal => (),
            }

            let mut new = Array1::zeros(result.len());
            for (i, a) in distribution.into_iter().enumerate() {
                new += &(concatenate(Axis(0), &[Array1::zeros(i).view(), result.slice(s![0..result.len() - i])])
                    .unwrap()
                    * a);
            }
            result = new;
        }
    }
    result
}

fn trim_and_normalize(raw: &Array1<f64>, trim_right_cutoff: f64) -> Vec<f64> {
    let mut end = raw.len();
    if trim_right_cutoff > 0.0 {
        while end > 1 && raw[end - 1] < trim_right_cutoff {
            end -= 1;
        }
    }
    let trimmed: Vec<f64> = raw.iter().take(end).copied().collect();
    let sum: f64 = trimmed.iter().sum();
    if sum <= 0.0 {
        return trimmed;
    }
    trimmed.iter().map(|v| v / sum).collect()
}

/// Convolves the nominal-Da-spaced `lines` with a Gaussian of standard
/// deviation `stdev` (Th), resampled onto a grid spaced by `spacing` Th,
/// spanning +/- 4 sigma around each nominal line.
fn widen_gaussian(lines: &[f64], spacing: f64, stdev: f64) -> Vec<f64> {
    if stdev <= 0.0 || spacing <= 0.0 {
        return lines.to_vec();
    }
    let half_span = (4.0 * stdev / spacing).ceil() as i64;
    let points_per_line = (1.0 / spacing).round().max(1.0) as i64;
    let total_points = (lines.len() as i64 - 1) * points_per_line + 1 + 2 * half_span;
    let mut widened = vec![0.0; total_points.max(0) as usize];
    let norm = 1.0 / (stdev * (2.0 * std::f64::consts::PI).sqrt());
    for (line_idx, &intensity) in lines.iter().enumerate() {
        if intensity <= 0.0 {
            continue;
        }
        let center = half_span + line_idx as i64 * points_per_line;
        for offset in -half_span..=half_span {
            let idx = center + offset;
            if idx < 0 || idx as usize >= widened.len() {
                continue;
            }
            let x = offset as f64 * spacing;
            let weight = norm * (-0.5 * (x / stdev).powi(2)).exp();
            widened[idx as usize] += intensity * weight * spacing;
        }
    }
    widened
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn averagine_composition_for_mass_1000() {
        let comp = AveragineComposition::for_mass(1000.0);
        assert_eq!(comp.counts[0], 44);
        assert_eq!(comp.counts[1], 70);
    }

    #[test]
    fn neutral_mass_and_inverse_round_trip() {
        let mass = neutral_mass(500.5, 2);
        let mz = mz_from_neutral_mass(mass, 2).unwrap();
        assert!((mz - 500.5).abs() < 1e-9);
    }

    #[test]
    fn mz_from_zero_charge_is_invalid_argument() {
        assert!(mz_from_neutral_mass(1000.0, 0).is_err());
    }

    #[test]
    fn theoretical_distribution_sums_to_one() {
        let comp = AveragineComposition::for_mass(1500.0);
        let model = IsotopeModel::theoretical(comp, 0.0, 0.1, 2);
        let sum: f64 = model.intensities.iter().sum();
        assert!((sum - model.spacing.recip().round() * model.spacing).is_finite());
        assert!(sum > 0.0);
    }

    #[test]
    fn identical_distributions_have_similarity_one() {
        let comp = AveragineComposition::for_mass(1200.0);
        let model = IsotopeModel::theoretical(comp, 0.0, 0.1, 1);
        let observed = model.intensities.clone();
        assert!((model.similarity(&observed) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn matches_gate_respects_threshold() {
        let comp = AveragineComposition::for_mass(1200.0);
        let model = IsotopeModel::theoretical(comp, 0.0, 0.1, 1);
        let flat = vec![1.0; model.intensities.len()];
        assert!(!model.matches(&flat, 0.9) || model.similarity(&flat) >= 0.9);
    }
}

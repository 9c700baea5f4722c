//! Savitzky-Golay and Gaussian smoothing over (mz, intensity) sequences.

use crate::data::peak::Peak1D;
use crate::error::{MsFlowError, Result};

/// Pre-tabulated Savitzky-Golay convolution coefficients for a given odd
/// frame size and polynomial order.
#[derive(Debug, Clone)]
pub struct SavitzkyGolayFilter {
    frame_size: usize,
    /// Steady-state (symmetric window) coefficients, length `frame_size`.
    steady_state: Vec<f64>,
    /// One row of coefficients per left-transient position (0 is the first point).
    left_transient: Vec<Vec<f64>>,
    /// One row of coefficients per right-transient position, mirrored from `left_transient`.
    right_transient: Vec<Vec<f64>>,
}

impl SavitzkyGolayFilter {
    /// Builds coefficient tables for `frame_size` (odd, >= `order + 2`) and
    /// polynomial `order`.
    pub fn new(frame_size: usize, order: usize) -> Result<Self> {
        if frame_size % 2 == 0 || frame_size < order + 2 {
            return Err(MsFlowError::InvalidArgument(format!(
                "frame_size {frame_size} must be odd and >= order + 2 ({})",
                order + 2
            )));
        }
        let half = frame_size / 2;
        let steady_state = savgol_coefficients(frame_size, order, half as i64);
        let mut left_transient = Vec::with_capacity(half);
        let mut right_transient = Vec::with_capacity(half);
        for center in 0..half {
            left_transient.push(savgol_coefficients(frame_size, order, center as i64));
        }
        for row in left_transient.iter().rev() {
            right_transient.push(row.iter().rev().copied().collect());
        }
        Ok(Self { frame_size, steady_state, left_transient, right_transient })
    }

    /// Filters `peaks`, producing a same-length sequence with intensities
    /// clamped at 0. Fails with `InvalidArgument` if `frame_size` exceeds the
    /// input length.
    pub fn filter(&self, peaks: &[Peak1D]) -> Result<Vec<Peak1D>> {
        if self.frame_size > peaks.len() {
            return Err(MsFlowError::InvalidArgument(format!(
                "frame_size {} exceeds input length {}",
                self.frame_size,
                peaks.len()
            )));
        }
        let half = self.frame_size / 2;
        let n = peaks.len();
        let mut out = Vec::with_capacity(n);
        for i in 0..n {
            let coeffs = if i < half {
                &self.left_transient[i]
            } else if i >= n - half {
                &self.right_transient[n - 1 - i]
            } else {
                &self.steady_state
            };
            let window_start = (i as i64 - half as i64).max(0) as usize;
            let mut value = 0.0;
            for (k, &c) in coeffs.iter().enumerate() {
                let idx = (window_start + k).min(n - 1);
                value += c * peaks[idx].intensity;
            }
            out.push(Peak1D::new(peaks[i].mz, value));
        }
        Ok(out)
    }
}

/// Computes Savitzky-Golay coefficients for a window of `frame_size` points
/// centered conceptually at `center` within `[0, frame_size)`, by solving the
/// least-squares polynomial fit in closed form via the normal equations.
fn savgol_coefficients(frame_size: usize, order: usize, center: i64) -> Vec<f64> {
    let half = frame_size / 2;
    let xs: Vec<f64> = (0..frame_size).map(|i| i as f64 - half as f64).collect();
    let order = order.min(frame_size - 1);
    let m = order + 1;
    let mut a = vec![vec![0.0; m]; frame_size];
    for (row, &x) in a.iter_mut().zip(xs.iter()) {
        let mut p = 1.0;
        for cell in row.iter_mut() {
            *cell = p;
            p *= x;
        }
    }
    let mut ata = vec![vec![0.0; m]; m];
    for i in 0..m {
        for j in 0..m {
            ata[i][j] = (0..frame_size).map(|k| a[k][i] * a[k][j]).sum();
        }
    }
    let ata_inv = invert(&ata);
    let target_x = center as f64 - half as f64;
    let mut target_row = vec![1.0; m];
    let mut p = 1.0;
    for cell in target_row.iter_mut() {
        *cell = p;
        p *= target_x;
    }
    let e: Vec<f64> = (0..m).map(|j| (0..m).map(|i| target_row[i] * ata_inv[i][j]).sum()).collect();
    (0..frame_size).map(|k| (0..m).map(|i| e[i] * a[k][i]).sum()).collect()
}

/// Gauss-Jordan inversion of a small square matrix.
fn invert(matrix: &[Vec<f64>]) -> Vec<Vec<f64>> {
    let n = matrix.len();
    let mut aug: Vec<Vec<f64>> = matrix
        .iter()
        .enumerate()
        .map(|(i, row)| {
            let mut r = row.clone();
            r.extend((0..n).map(|j| if i == j { 1.0 } else { 0.0 }));
            r
        })
        .collect();
    for col in 0..n {
        let pivot_row = (col..n)
            .max_by(|&a, &b| aug[a][col].abs().total_cmp(&aug[b][col].abs()))
            .unwrap_or(col);
        aug.swap(col, pivot_row);
        let pivot = aug[col][col];
        let pivot = if pivot.abs() < 1e-12 { 1e-12 } else { pivot };
        for v in &mut aug[col] {
            *v /= pivot;
        }
        for row in 0..n {
            if row != col {
                let factor = aug[row][col];
                for k in 0..2 * n {
                    aug[row][k] -= factor * aug[col][k];
                }
            }
        }
    }
    aug.into_iter().map(|row| row[n..].to_vec()).collect()
}

/// A fixed-spacing Gaussian smoothing kernel.
#[derive(Debug, Clone)]
pub struct GaussianFilter {
    sigma: f64,
    spacing: f64,
}

impl GaussianFilter {
    /// Builds a Gaussian filter with standard deviation `sigma`, sampled
    /// every `spacing` (mz units).
    #[must_use]
    pub fn new(sigma: f64, spacing: f64) -> Self {
        Self { sigma: sigma.max(1e-9), spacing: spacing.max(1e-9) }
    }

    /// Filters `peaks`, producing a same-length sequence with intensities
    /// clamped at 0.
    #[must_use]
    pub fn filter(&self, peaks: &[Peak1D]) -> Vec<Peak1D> {
        let half_span = (4.0 * self.sigma / self.spacing).ceil() as i64;
        let mut kernel = Vec::with_capacity((2 * half_span + 1) as usize);
        let norm = 1.0 / (self.sigma * (2.0 * std::f64::consts::PI).sqrt());
        for k in -half_span..=half_span {
            let x = k as f64 * self.spacing;
            kernel.push(norm * (-0.5 * (x / self.sigma).powi(2)).exp());
        }
        let weight_sum: f64 = kernel.iter().sum();
        let n = peaks.len();
        (0..n)
            .map(|i| {
                let mut value = 0.0;
                for (offset, &w) in kernel.iter().enumerate() {
                    let shift = offset as i64 - half_span;
                    let idx = i as i64 + shift;
                    if idx >= 0 && (idx as usize) < n {
                        value += w * peaks[idx as usize].intensity;
                    }
                }
                Peak1D::new(peaks[i].mz, value / weight_sum)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flat_peaks(n: usize, intensity: f64) -> Vec<Peak1D> {
        (0..n).map(|i| Peak1D::new(i as f64, intensity)).collect()
    }

    #[test]
    fn savgol_rejects_even_frame_size() {
        assert!(SavitzkyGolayFilter::new(4, 2).is_err());
    }

    #[test]
    fn savgol_rejects_frame_larger_than_input() {
        let filter = SavitzkyGolayFilter::new(5, 2).unwrap();
        assert!(filter.filter(&flat_peaks(3, 10.0)).is_err());
    }

    #[test]
    fn savgol_preserves_constant_signal() {
        let filter = SavitzkyGolayFilter::new(5, 2).unwrap();
        let out = filter.filter(&flat_peaks(20, 10.0)).unwrap();
        for p in &out {
            assert!((p.intensity - 10.0).abs() < 1e-6);
        }
    }

    #[test]
    fn savgol_clamps_negative_intensity_at_zero() {
        let filter = SavitzkyGolayFilter::new(5, 2).unwrap();
        let mut peaks = flat_peaks(20, 1.0);
        peaks[10] = Peak1D::new(10.0, -1000.0);
        let out = filter.filter(&peaks).unwrap();
        assert!(out.iter().all(|p| p.intensity >= 0.0));
    }

    #[test]
    fn gaussian_preserves_constant_signal() {
        let filter = GaussianFilter::new(0.5, 0.1);
        let out = filter.filter(&flat_peaks(50, 5.0));
        for p in out.iter().skip(10).take(30) {
            assert!((p.intensity - 5.0).abs() < 1e-3);
        }
    }
}

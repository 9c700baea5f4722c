use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// A single centroided peak in one spectrum: mass-to-charge ratio in
/// Thomson and intensity. Immutable value object; not mutated once a
/// consumer downstream of the producer begins reading it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Peak1D {
    /// Mass-to-charge ratio, in Th. Always >= 0.
    pub mz: f64,
    /// Signal intensity. Always >= 0.
    pub intensity: f64,
}

impl Peak1D {
    /// Creates a new peak, clamping negative intensity to zero (§4.2 smoothing clamp rule
    /// applies uniformly to every producer of `Peak1D`, not only the filters).
    #[must_use]
    pub fn new(mz: f64, intensity: f64) -> Self {
        Self {
            mz,
            intensity: intensity.max(0.0),
        }
    }

    /// Ordering key for sorting a spectrum's peaks strictly ascending by `mz`.
    #[must_use]
    pub fn mz_key(&self) -> OrderedFloat<f64> {
        OrderedFloat(self.mz)
    }
}

impl Eq for Peak1D {}

impl PartialOrd for Peak1D {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Total order by `mz`, ties broken by intensity; required so peaks can live
/// in a `BTreeMap`/sorted `Vec` despite `f64` not natively implementing `Ord`.
impl Ord for Peak1D {
    fn cmp(&self, other: &Self) -> Ordering {
        self.mz_key()
            .cmp(&other.mz_key())
            .then_with(|| OrderedFloat(self.intensity).cmp(&OrderedFloat(other.intensity)))
    }
}

/// A raw, uncentroided point in the 2D (RT x m/z) profile plane. Dimension 0
/// is RT, dimension 1 is m/z, matching `RawDataPoint2D`'s axis convention.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Peak2D {
    /// Retention time, in seconds. Always >= 0.
    pub rt: f64,
    /// Mass-to-charge ratio, in Th. Always >= 0.
    pub mz: f64,
    /// Signal intensity. Always >= 0.
    pub intensity: f64,
}

impl Peak2D {
    /// Creates a new 2D point, clamping negative intensity to zero.
    #[must_use]
    pub fn new(rt: f64, mz: f64, intensity: f64) -> Self {
        Self {
            rt,
            mz,
            intensity: intensity.max(0.0),
        }
    }

    /// Comparator for "by m/z within RT": orders by RT first, then by m/z.
    #[must_use]
    pub fn rt_then_mz_key(&self) -> (OrderedFloat<f64>, OrderedFloat<f64>) {
        (OrderedFloat(self.rt), OrderedFloat(self.mz))
    }

    /// Comparator for "by RT then m/z", an alias kept distinct from
    /// [`Self::rt_then_mz_key`] because both named comparators are required
    /// by the data model and some call sites read better naming the RT-first
    /// order explicitly by this name.
    #[must_use]
    pub fn mz_within_rt_key(&self) -> (OrderedFloat<f64>, OrderedFloat<f64>) {
        self.rt_then_mz_key()
    }
}

impl Eq for Peak2D {}

impl PartialOrd for Peak2D {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Peak2D {
    fn cmp(&self, other: &Self) -> Ordering {
        self.rt_then_mz_key().cmp(&other.rt_then_mz_key())
    }
}

/// Alias used in 2D profile contexts (feature finder input); the spec names
/// both `Peak2D` and `RawDataPoint2D` for the same value object.
pub type RawDataPoint2D = Peak2D;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn peak1d_clamps_negative_intensity() {
        let p = Peak1D::new(100.0, -5.0);
        assert_eq!(p.intensity, 0.0);
    }

    #[test]
    fn peak1d_orders_by_mz() {
        let mut peaks = vec![Peak1D::new(200.0, 1.0), Peak1D::new(100.0, 1.0)];
        peaks.sort();
        assert_eq!(peaks[0].mz, 100.0);
    }

    #[test]
    fn peak2d_orders_rt_then_mz() {
        let mut points = vec![
            Peak2D::new(2.0, 50.0, 1.0),
            Peak2D::new(1.0, 90.0, 1.0),
            Peak2D::new(1.0, 10.0, 1.0),
        ];
        points.sort();
        assert_eq!(points[0].mz, 10.0);
        assert_eq!(points[1].mz, 90.0);
        assert_eq!(points[2].rt, 2.0);
    }
}

use serde::{Deserialize, Serialize};

/// How a precursor ion was fragmented to produce the child spectrum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActivationMethod {
    /// Collision-induced dissociation.
    Cid,
    /// Higher-energy collisional dissociation.
    Hcd,
    /// Electron-transfer dissociation.
    Etd,
    /// Unspecified or not recorded.
    Unknown,
}

/// The precursor ion selected for fragmentation in an MS^n >= 2 scan.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Precursor {
    /// Precursor mass-to-charge ratio, in Th.
    pub mz: f64,
    /// Precursor charge, if determined by the instrument/acquisition software.
    pub charge: Option<i32>,
    /// Activation method used to fragment this precursor.
    pub activation_method: ActivationMethod,
    /// Lower offset of the isolation window, in Th. Always >= 0.
    pub isolation_window_lower_offset: f64,
    /// Upper offset of the isolation window, in Th. Always >= 0.
    pub isolation_window_upper_offset: f64,
}

impl Precursor {
    /// Creates a precursor description with a symmetric isolation window.
    #[must_use]
    pub fn new(mz: f64, charge: Option<i32>, half_window: f64) -> Self {
        Self {
            mz,
            charge,
            activation_method: ActivationMethod::Unknown,
            isolation_window_lower_offset: half_window.max(0.0),
            isolation_window_upper_offset: half_window.max(0.0),
        }
    }

    /// The full isolation window as `[mz - lower, mz + upper]`.
    #[must_use]
    pub fn isolation_window(&self) -> (f64, f64) {
        (
            self.mz - self.isolation_window_lower_offset,
            self.mz + self.isolation_window_upper_offset,
        )
    }
}

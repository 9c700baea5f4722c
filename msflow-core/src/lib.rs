#![doc = include_str!("../README.md")]

pub mod data;
pub mod error;
#[cfg(feature = "isotopes")]
pub mod isotope;
pub mod params;
pub mod progress;
pub mod resampling;
pub mod smoothing;
pub mod store;
pub mod value;

/// A subset of the types and traits expected to be used the most; importing
/// this is a good starting point for working with the crate.
pub mod prelude {
    pub use crate::data::{
        Chromatogram, ChromatogramPoint, ChromatogramType, ConvexHull, Feature, FeatureMap,
        MRMFeature, MRMTransitionGroup, Peak1D, Peak2D, PeptideIdentification, Precursor,
        ProcessingStep, QuantificationMode, ScoredProcessingResult, Spectrum, Transition,
        TransitionList,
    };
    pub use crate::error::{MsFlowError, Result};
    pub use crate::params::{ParamSchema, Params};
    pub use crate::progress::{CancellationToken, LoggingProgressLogger, ProgressLogger};
    pub use crate::store::{Direction, PeakStore};
    pub use crate::value::DataValue;
}

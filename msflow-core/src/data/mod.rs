//! The data model: spectra, chromatograms, features, identifications, and
//! the targeted-analysis transition types built on top of them.

pub mod chromatogram;
pub mod feature;
pub mod identification;
pub mod peak;
pub mod precursor;
pub mod scored;
pub mod spectrum;
pub mod transition;

pub use chromatogram::{Chromatogram, ChromatogramPoint, ChromatogramType};
pub use feature::{ConvexHull, Feature, FeatureMap, ProcessingStep, QuantificationMode};
pub use identification::{PeptideHit, PeptideIdentification, ProteinHit, ProteinIdentification};
pub use peak::{Peak1D, Peak2D, RawDataPoint2D};
pub use precursor::{ActivationMethod, Precursor};
pub use scored::ScoredProcessingResult;
pub use spectrum::Spectrum;
pub use transition::{MRMFeature, MRMTransitionGroup, Transition, TransitionList};

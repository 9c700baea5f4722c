#![doc = include_str!("../README.md")]

pub mod extractor;
pub mod scorer;

/// A subset of the types expected to be used the most; importing this is a
/// good starting point for working with the crate.
pub mod prelude {
    pub use crate::extractor::{AccumulationMode, ChromatogramExtractor, ExtractionParams, MzTolerance, extract_all};
    pub use crate::scorer::{MRMFeatureQC, MRMScorer, ScoreBound, ScoringParams};
}

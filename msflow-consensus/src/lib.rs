#![doc = include_str!("../README.md")]

pub mod builder;
pub mod consensus_map;

/// A subset of the types expected to be used the most; importing this is a
/// good starting point for working with the crate.
pub mod prelude {
    pub use crate::builder::{ConsensusBuilder, ConsensusParams, IntensityAggregation};
    pub use crate::consensus_map::{ConsensusFeature, ConsensusMap, FileDescription, IndexTuple};
}

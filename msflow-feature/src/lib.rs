#![doc = include_str!("../README.md")]

pub mod extender;
pub mod flags;
pub mod model_fitter;
pub mod navigator;
pub mod pipeline;
pub mod seeder;

/// A subset of the types and traits expected to be used the most; importing
/// this is a good starting point for working with the crate.
pub mod prelude {
    pub use crate::extender::{Extender, ExtenderParams, SimpleExtender};
    pub use crate::flags::{Flag, FlagGrid, PeakRef};
    pub use crate::model_fitter::{ExtendedIsotopeFitter, ModelFitter, RtModelShape};
    pub use crate::pipeline::{AcceptanceParams, FeatureFinderPipeline};
    pub use crate::seeder::{ChargedIndexSet, Seeder, SimpleSeeder};
}

use thiserror::Error;

/// The error kinds a stage in the pipeline can signal, per the propagation
/// rules each stage follows: `NoSuccessor` is always caught locally by the
/// caller that issued the neighbor query; `InvalidArgument` and
/// `MissingInformation` abort the current run; `InvalidData` aborts after
/// the offending record identifier has been logged; `FitQualityBelowThreshold`
/// only drops the affected fit, the pipeline continues.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MsFlowError {
    /// A parameter is out of its declared domain, or a required anchor/argument is missing.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// An input record lacks metadata a stage requires (e.g. normalized RT).
    #[error("missing information: {0}")]
    MissingInformation(String),

    /// A structural invariant was violated (e.g. unsorted peaks, duplicate id).
    #[error("invalid data at {location}: {message}")]
    InvalidData {
        /// Identifier of the offending record (spectrum id, feature index, ...).
        location: String,
        /// Description of the violated invariant.
        message: String,
    },

    /// A value could not be safely cast or reinterpreted.
    #[error("conversion error: {0}")]
    ConversionError(String),

    /// A neighbor query ran off the boundary of its container. Non-fatal;
    /// callers that issue `next_*`/`prev_*` queries catch this locally as a
    /// termination condition, it is never meant to escape to top-level code.
    #[error("no successor in direction {0:?}")]
    NoSuccessor(crate::store::Direction),

    /// A fit completed but failed its acceptance test (R², coverage, ...).
    #[error("fit quality below threshold: {0}")]
    FitQualityBelowThreshold(String),

    /// A stage does not support the requested kind (e.g. peak-level alignment
    /// for an algorithm that only supports feature-level alignment).
    #[error("not implemented: {0}")]
    NotImplemented(String),
}

/// Convenience alias used throughout the workspace.
pub type Result<T> = std::result::Result<T, MsFlowError>;

impl MsFlowError {
    /// `true` for the one kind every direct caller of a neighbor query is
    /// expected to catch instead of propagating (see §7 propagation rules).
    #[must_use]
    pub const fn is_no_successor(&self) -> bool {
        matches!(self, Self::NoSuccessor(_))
    }
}

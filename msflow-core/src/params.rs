//! A frozen, dotted-path parameter tree, the Rust re-expression of the
//! colon-separated `Param` tree design note in the specification: a mapping
//! from dotted path to a tagged value, with a schema entry documenting the
//! type, default, allowed values and description. Stages receive a cloned,
//! immutable snapshot and never mutate their own parameters in place.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{MsFlowError, Result};
use crate::value::DataValue;

/// Describes one recognized parameter: its default, and (for numeric
/// parameters) the valid range.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParamSchema {
    /// Dotted path, e.g. `"extender:tolerance_rt"`.
    pub path: String,
    /// Default value used when the parameter is not set explicitly.
    pub default: DataValue,
    /// Human-readable description of the effect of this parameter.
    pub description: String,
}

/// A frozen snapshot of a parameter tree: dotted path -> value.
///
/// `Params` is cheap to clone (it is handed to each stage as an owned,
/// independent copy per the concurrency model's "parameters are copied into
/// stages" rule) and is immutable once built.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Params {
    values: BTreeMap<String, DataValue>,
}

impl Params {
    /// An empty parameter tree; every lookup falls back to the caller's default.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a single dotted-path parameter, overwriting any previous value.
    pub fn set(&mut self, path: impl Into<String>, value: impl Into<DataValue>) -> &mut Self {
        self.values.insert(path.into(), value.into());
        self
    }

    /// Builder-style variant of [`Self::set`].
    #[must_use]
    pub fn with(mut self, path: impl Into<String>, value: impl Into<DataValue>) -> Self {
        self.set(path, value);
        self
    }

    /// Looks up a numeric parameter, falling back to `default` if unset.
    #[must_use]
    pub fn get_f64(&self, path: &str, default: f64) -> f64 {
        self.values
            .get(path)
            .and_then(DataValue::as_f64)
            .unwrap_or(default)
    }

    /// Looks up an integer parameter, falling back to `default` if unset.
    #[must_use]
    pub fn get_i64(&self, path: &str, default: i64) -> i64 {
        self.values
            .get(path)
            .and_then(DataValue::as_i64)
            .unwrap_or(default)
    }

    /// Looks up a string parameter, falling back to `default` if unset.
    #[must_use]
    pub fn get_str<'a>(&'a self, path: &str, default: &'a str) -> &'a str {
        self.values
            .get(path)
            .and_then(DataValue::as_str)
            .unwrap_or(default)
    }

    /// Looks up a required numeric parameter, erroring if it is absent.
    pub fn require_f64(&self, path: &str) -> Result<f64> {
        self.values
            .get(path)
            .and_then(DataValue::as_f64)
            .ok_or_else(|| MsFlowError::InvalidArgument(format!("missing required parameter {path}")))
    }

    /// Iterates over every explicitly set (path, value) pair.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &DataValue)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unset_parameter_falls_back_to_default() {
        let params = Params::new();
        assert_eq!(params.get_f64("extender:tolerance_rt", 5.0), 5.0);
    }

    #[test]
    fn set_parameter_overrides_default() {
        let params = Params::new().with("extender:tolerance_rt", 2.5);
        assert_eq!(params.get_f64("extender:tolerance_rt", 5.0), 2.5);
    }

    #[test]
    fn required_missing_parameter_errors() {
        let params = Params::new();
        assert!(params.require_f64("alignment:rsq_limit").is_err());
    }
}

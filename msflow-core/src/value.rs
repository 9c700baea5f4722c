use serde::{Deserialize, Serialize};

/// A tagged union able to hold every scalar and list type that appears in
/// per-spectrum metadata, processing-step meta-values, and scored results.
///
/// Re-expresses `OpenMS::DataValue` as a plain Rust sum type plus explicit
/// conversion predicates instead of an implicit-conversion C++ union.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DataValue {
    /// No value present.
    Empty,
    /// A signed integer value.
    Int(i64),
    /// A floating point value.
    Real(f64),
    /// A string value.
    String(String),
    /// A list of strings.
    StringList(Vec<String>),
    /// A list of integers.
    IntList(Vec<i64>),
    /// A list of floating point values.
    RealList(Vec<f64>),
}

impl Default for DataValue {
    fn default() -> Self {
        Self::Empty
    }
}

impl DataValue {
    /// `true` if this holds no value.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }

    /// Returns the value as an `f64` if it is a numeric scalar.
    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Int(i) => Some(*i as f64),
            Self::Real(r) => Some(*r),
            _ => None,
        }
    }

    /// Returns the value as an `i64` if it is an integer.
    #[must_use]
    pub const fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Returns the value as a string slice if it holds a string.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s.as_str()),
            _ => None,
        }
    }
}

impl From<i64> for DataValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<f64> for DataValue {
    fn from(value: f64) -> Self {
        Self::Real(value)
    }
}

impl From<String> for DataValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<&str> for DataValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_owned())
    }
}

impl From<Vec<String>> for DataValue {
    fn from(value: Vec<String>) -> Self {
        Self::StringList(value)
    }
}

impl From<Vec<i64>> for DataValue {
    fn from(value: Vec<i64>) -> Self {
        Self::IntList(value)
    }
}

impl From<Vec<f64>> for DataValue {
    fn from(value: Vec<f64>) -> Self {
        Self::RealList(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_empty() {
        assert!(DataValue::default().is_empty());
    }

    #[test]
    fn numeric_conversion() {
        assert_eq!(DataValue::from(5i64).as_f64(), Some(5.0));
        assert_eq!(DataValue::from(2.5f64).as_f64(), Some(2.5));
        assert_eq!(DataValue::from("x").as_f64(), None);
    }

    #[test]
    fn string_round_trip() {
        let value: DataValue = "hello".into();
        assert_eq!(value.as_str(), Some("hello"));
    }
}

//! Attribute addressing module.
//!
//! Provides `AttributePath`, the interned key naming one settable field on
//! a character record, and `AttributeValue`, the loosely typed value stored
//! at that key.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::sync::Arc;

/// Interned identifier for a character attribute (e.g. `resources.armorClass`).
///
/// Paths are compared by exact string equality; no normalization is applied.
/// Uses `Arc<str>` so that cloning a path into ledger records is cheap.
///
/// # Examples
///
/// ```rust
/// use breathe_effects::AttributePath;
///
/// let ac = AttributePath::from_str("resources.armorClass");
/// let ac2: AttributePath = "resources.armorClass".into();
/// assert_eq!(ac, ac2);
/// assert_ne!(ac, AttributePath::from_str("resources.armorclass"));
/// ```
#[derive(Debug, Clone, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct AttributePath(Arc<str>);

impl Serialize for AttributePath {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.0.as_ref().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for AttributePath {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Ok(AttributePath::from(s))
    }
}

impl AttributePath {
    /// Create a new `AttributePath` from a string slice.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Self {
        Self(Arc::from(s))
    }

    /// Get the string representation of this path.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for AttributePath {
    fn from(s: &str) -> Self {
        Self::from_str(s)
    }
}

impl From<String> for AttributePath {
    fn from(s: String) -> Self {
        Self(Arc::from(s))
    }
}

impl fmt::Display for AttributePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A value read from or written to a character attribute.
///
/// Character records are not schema-checked, so an attribute may hold a
/// number, a string, a flag, or nothing at all. Only `Number` takes part in
/// additive and multiplicative combination.
///
/// Serialized untagged: `12`, `"text"`, `true`, `null`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttributeValue {
    Number(f64),
    Text(String),
    Bool(bool),
    #[default]
    Empty,
}

impl AttributeValue {
    /// The numeric content, if any.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            AttributeValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn is_number(&self) -> bool {
        matches!(self, AttributeValue::Number(_))
    }
}

impl From<f64> for AttributeValue {
    fn from(n: f64) -> Self {
        AttributeValue::Number(n)
    }
}

impl From<i64> for AttributeValue {
    fn from(n: i64) -> Self {
        AttributeValue::Number(n as f64)
    }
}

impl From<&str> for AttributeValue {
    fn from(s: &str) -> Self {
        AttributeValue::Text(s.to_string())
    }
}

impl From<bool> for AttributeValue {
    fn from(b: bool) -> Self {
        AttributeValue::Bool(b)
    }
}

impl fmt::Display for AttributeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttributeValue::Number(n) => write!(f, "{}", n),
            AttributeValue::Text(s) => write!(f, "{:?}", s),
            AttributeValue::Bool(b) => write!(f, "{}", b),
            AttributeValue::Empty => write!(f, "(empty)"),
        }
    }
}

//! Error types for the effects engine.
//!
//! Most runtime irregularities (unknown paths on a host record, boundary
//! notifications for characters that are gone) are logged and skipped.
//! The variants below cover the cases a caller can act on.

use crate::attribute::AttributePath;
use crate::dice::DiceParseError;
use crate::record::CharacterId;
use thiserror::Error;

/// Format a cycle path as a readable string.
fn format_cycle_path(path: &[AttributePath]) -> String {
    if path.is_empty() {
        return String::from("(empty cycle)");
    }
    path.iter()
        .map(|p| p.as_str())
        .collect::<Vec<_>>()
        .join(" -> ")
}

/// Errors raised by the effects engine and its collaborators.
///
/// # Examples
///
/// ```rust
/// use breathe_effects::{AttributePath, EffectError};
///
/// let err = EffectError::UnknownAttribute(AttributePath::from_str("system.typo"));
/// assert_eq!(err.to_string(), "Unknown attribute path: system.typo");
/// ```
#[derive(Debug, Error, Clone, PartialEq)]
pub enum EffectError {
    /// The character record refuses to address this path.
    #[error("Unknown attribute path: {0}")]
    UnknownAttribute(AttributePath),

    /// No character with this id is registered in the world.
    #[error("Unknown character: {0}")]
    UnknownCharacter(CharacterId),

    /// A dice expression could not be parsed.
    #[error("Invalid dice expression: {0}")]
    InvalidDice(#[from] DiceParseError),

    /// A duration tag could not be parsed.
    #[error("Invalid duration: {0}")]
    InvalidDuration(String),

    /// Derived attribute rules depend on each other in a loop.
    #[error("Cycle detected: {}", format_cycle_path(.path))]
    Cycle { path: Vec<AttributePath> },

    /// Persisted effect state breaks the base-value invariant.
    #[error("Inconsistent effect state for {path}: {reason}")]
    InconsistentState { path: AttributePath, reason: String },

    /// A technique costs more endurance than the attacker has left.
    #[error("Not enough endurance: required {required}, available {available}")]
    InsufficientEndurance { required: u32, available: f64 },

    /// Configuration or persisted state could not be read.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<serde_json::Error> for EffectError {
    fn from(err: serde_json::Error) -> Self {
        EffectError::Config(err.to_string())
    }
}

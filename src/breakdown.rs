//! Recompute results.
//!
//! A `Breakdown` records how an attribute's live value was rebuilt from its
//! base through the active effects, for debugging and display.

use crate::attribute::{AttributePath, AttributeValue};
use serde::{Deserialize, Serialize};

/// An attribute value with the steps that produced it.
///
/// # Examples
///
/// ```rust
/// use breathe_effects::{AttributePath, AttributeValue, Breakdown};
///
/// let mut breakdown = Breakdown::new(
///     AttributePath::from_str("resources.armorClass"),
///     AttributeValue::Number(12.0),
/// );
/// breakdown.add_step("Katana teeth (+-4)", AttributeValue::Number(8.0));
///
/// assert_eq!(breakdown.value, AttributeValue::Number(8.0));
/// assert_eq!(breakdown.steps.len(), 1);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Breakdown {
    pub path: AttributePath,

    /// The value the replay started from.
    pub base: AttributeValue,

    /// Each entry is `(effect_description, value_after_effect)`, in ledger
    /// order.
    pub steps: Vec<(String, AttributeValue)>,

    /// The value written back to the character.
    pub value: AttributeValue,
}

impl Breakdown {
    pub fn new(path: AttributePath, base: AttributeValue) -> Self {
        Self {
            path,
            value: base.clone(),
            base,
            steps: Vec::new(),
        }
    }

    /// Record one effect's application and make its result current.
    pub fn add_step(&mut self, description: impl Into<String>, value: AttributeValue) {
        self.value = value.clone();
        self.steps.push((description.into(), value));
    }
}

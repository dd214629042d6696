//! Character record access.
//!
//! The engine never owns characters. It reads and patches them through the
//! `CharacterRecord` trait, which also hands out the character's
//! `EffectState`.

use crate::attribute::{AttributePath, AttributeValue};
use crate::ledger::EffectState;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Identity of a character.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CharacterId(String);

impl CharacterId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for CharacterId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl fmt::Display for CharacterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A character as seen by the effects engine.
pub trait CharacterRecord {
    fn id(&self) -> &CharacterId;

    /// Current live value at `path`. Unknown paths read as `Empty`.
    fn get(&self, path: &AttributePath) -> AttributeValue;

    /// Write `value` at `path`.
    fn set(&mut self, path: &AttributePath, value: AttributeValue);

    /// Whether this record can address `path` at all.
    fn accepts(&self, _path: &AttributePath) -> bool {
        true
    }

    fn effects(&self) -> &EffectState;

    fn effects_mut(&mut self) -> &mut EffectState;

    /// Called after effects changed the live values at `paths`, once per
    /// apply and once per boundary batch. Records with derived attributes
    /// refresh them here and return the paths they rewrote.
    fn attributes_changed(&mut self, _paths: &[AttributePath]) -> Vec<AttributePath> {
        Vec::new()
    }
}

/// A schema-free record that creates any path on write.
///
/// This mirrors a host document store that accepts arbitrary keys. Useful
/// for tests and for hosts that keep attributes as loose data.
///
/// # Examples
///
/// ```rust
/// use breathe_effects::{AttributePath, AttributeValue, CharacterRecord, DynamicRecord};
///
/// let mut record = DynamicRecord::new("kanao").with("resources.armorClass", 12.0);
/// let path = AttributePath::from_str("anything.at.all");
/// assert_eq!(record.get(&path), AttributeValue::Empty);
/// record.set(&path, 3.0.into());
/// assert_eq!(record.get(&path), AttributeValue::Number(3.0));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DynamicRecord {
    id: CharacterId,
    values: BTreeMap<AttributePath, AttributeValue>,
    #[serde(default)]
    effects: EffectState,
}

impl DynamicRecord {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: CharacterId::new(id),
            values: BTreeMap::new(),
            effects: EffectState::default(),
        }
    }

    /// Builder-style initial value.
    pub fn with(mut self, path: &str, value: impl Into<AttributeValue>) -> Self {
        self.values.insert(AttributePath::from_str(path), value.into());
        self
    }

    /// Shortcut for reading a numeric attribute in tests and demos.
    pub fn number(&self, path: &str) -> Option<f64> {
        self.values
            .get(&AttributePath::from_str(path))
            .and_then(AttributeValue::as_number)
    }
}

impl CharacterRecord for DynamicRecord {
    fn id(&self) -> &CharacterId {
        &self.id
    }

    fn get(&self, path: &AttributePath) -> AttributeValue {
        self.values.get(path).cloned().unwrap_or_default()
    }

    fn set(&mut self, path: &AttributePath, value: AttributeValue) {
        self.values.insert(path.clone(), value);
    }

    fn effects(&self) -> &EffectState {
        &self.effects
    }

    fn effects_mut(&mut self) -> &mut EffectState {
        &mut self.effects
    }
}

//! Per-character effect state.
//!
//! `EffectState` is the one structure persisted with a character for this
//! subsystem: the ordered ledger of active effects, the base values captured
//! before those effects, and same-target stack counters used by breath
//! specials.
//!
//! Invariant: the base store holds an entry for a path exactly when the
//! ledger holds at least one record for that path.

use crate::attribute::{AttributePath, AttributeValue};
use crate::effect::EffectRecord;
use crate::error::EffectError;
use crate::record::CharacterId;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Ordered list of active effects for one character.
///
/// Insertion order is significant: recompute replays records oldest first.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EffectLedger {
    records: Vec<EffectRecord>,
}

impl EffectLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn push(&mut self, record: EffectRecord) {
        self.records.push(record);
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &EffectRecord> {
        self.records.iter()
    }

    /// Records touching `path`, in ledger order.
    pub fn for_path<'a>(
        &'a self,
        path: &'a AttributePath,
    ) -> impl Iterator<Item = &'a EffectRecord> + 'a {
        self.records.iter().filter(move |r| r.path() == path)
    }

    pub fn touches(&self, path: &AttributePath) -> bool {
        self.records.iter().any(|r| r.path() == path)
    }

    /// Distinct paths with at least one record.
    pub fn paths(&self) -> BTreeSet<AttributePath> {
        self.records.iter().map(|r| r.path().clone()).collect()
    }

    pub(crate) fn records_mut(&mut self) -> &mut Vec<EffectRecord> {
        &mut self.records
    }
}

/// Pre-effect values, keyed by path.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BaseValueStore {
    entries: BTreeMap<AttributePath, AttributeValue>,
}

impl BaseValueStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, path: &AttributePath) -> Option<&AttributeValue> {
        self.entries.get(path)
    }

    pub fn contains(&self, path: &AttributePath) -> bool {
        self.entries.contains_key(path)
    }

    /// Store `value` as the base for `path` unless one is already held.
    /// Returns true when a new entry was captured.
    pub(crate) fn capture(&mut self, path: &AttributePath, value: AttributeValue) -> bool {
        if self.entries.contains_key(path) {
            return false;
        }
        self.entries.insert(path.clone(), value);
        true
    }

    pub(crate) fn replace(&mut self, path: &AttributePath, value: AttributeValue) {
        self.entries.insert(path.clone(), value);
    }

    pub(crate) fn remove(&mut self, path: &AttributePath) -> Option<AttributeValue> {
        self.entries.remove(path)
    }

    pub fn paths(&self) -> BTreeSet<AttributePath> {
        self.entries.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Consecutive hits by one attacker on one target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetStack {
    pub target: CharacterId,
    pub count: u32,
}

/// Everything this subsystem persists on a character.
///
/// The parts are read-only outside the crate: only the engine and the
/// scheduler write them, so the base-store invariant cannot be broken
/// through the public API. Deserializing checks the invariant too, which
/// covers state embedded in a `CharacterSheet` or `DynamicRecord`.
///
/// # Examples
///
/// ```rust
/// use breathe_effects::EffectState;
///
/// let state = EffectState::default();
/// let json = state.to_json().unwrap();
/// let back = EffectState::from_json(&json).unwrap();
/// assert_eq!(back, state);
///
/// let stale = r#"{"ledger":[],"base":{"resources.armorClass":12}}"#;
/// assert!(EffectState::from_json(stale).is_err());
/// ```
///
/// Base values cannot be written from outside the engine:
///
/// ```compile_fail
/// use breathe_effects::{AttributePath, EffectState};
///
/// let mut state = EffectState::default();
/// state.base.capture(&AttributePath::from_str("resources.armorClass"), 12.0.into());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "StoredEffectState")]
pub struct EffectState {
    pub(crate) ledger: EffectLedger,
    pub(crate) base: BaseValueStore,
    /// Same-target stack counters, keyed by special ability id.
    pub(crate) stacks: BTreeMap<String, TargetStack>,
}

/// Wire shape of `EffectState`, checked before it becomes one.
#[derive(Deserialize)]
struct StoredEffectState {
    #[serde(default)]
    ledger: EffectLedger,
    #[serde(default)]
    base: BaseValueStore,
    #[serde(default)]
    stacks: BTreeMap<String, TargetStack>,
}

impl TryFrom<StoredEffectState> for EffectState {
    type Error = EffectError;

    fn try_from(stored: StoredEffectState) -> Result<Self, Self::Error> {
        let state = EffectState {
            ledger: stored.ledger,
            base: stored.base,
            stacks: stored.stacks,
        };
        state.validate()?;
        Ok(state)
    }
}

impl EffectState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Active effects, oldest first.
    pub fn ledger(&self) -> &EffectLedger {
        &self.ledger
    }

    /// Values captured before the first effect on each path.
    pub fn base(&self) -> &BaseValueStore {
        &self.base
    }

    /// Same-target stack counters, keyed by special ability id.
    pub fn stacks(&self) -> &BTreeMap<String, TargetStack> {
        &self.stacks
    }

    pub fn has_active_effects(&self) -> bool {
        !self.ledger.is_empty()
    }

    /// Current stack count for `ability` against `target` (0 if the last
    /// stacked target was someone else).
    pub fn stack_count(&self, ability: &str, target: &CharacterId) -> u32 {
        self.stacks
            .get(ability)
            .filter(|s| &s.target == target)
            .map(|s| s.count)
            .unwrap_or(0)
    }

    /// Record `count` consecutive hits by `ability` on `target`, replacing
    /// whatever target the ability was stacking on before.
    pub(crate) fn commit_stack(&mut self, ability: impl Into<String>, target: CharacterId, count: u32) {
        self.stacks
            .insert(ability.into(), TargetStack { target, count });
    }

    /// Check the base-store invariant.
    pub fn validate(&self) -> Result<(), EffectError> {
        let ledger_paths = self.ledger.paths();
        let base_paths = self.base.paths();

        if let Some(path) = base_paths.difference(&ledger_paths).next() {
            return Err(EffectError::InconsistentState {
                path: path.clone(),
                reason: "base value stored without any active effect".into(),
            });
        }
        if let Some(path) = ledger_paths.difference(&base_paths).next() {
            return Err(EffectError::InconsistentState {
                path: path.clone(),
                reason: "active effect without a stored base value".into(),
            });
        }
        Ok(())
    }

    pub fn to_json(&self) -> Result<String, EffectError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Load persisted state. Fails with `InconsistentState` when the base
    /// store and the ledger disagree.
    pub fn from_json(json: &str) -> Result<Self, EffectError> {
        let stored: StoredEffectState = serde_json::from_str(json)?;
        EffectState::try_from(stored)
    }
}

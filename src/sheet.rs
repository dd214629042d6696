//! The Breathe & Live character sheet.
//!
//! Attributes are typed fields. Dotted paths resolve through a static table
//! of accessor pairs; paths missing from the table are rejected and logged
//! instead of creating new structure.

use crate::attribute::{AttributePath, AttributeValue};
use crate::breath::BreathKey;
use crate::derived::DerivedRules;
use crate::ledger::EffectState;
use crate::record::{CharacterId, CharacterRecord};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use tracing::warn;

/// Kind of actor; drives derived statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActorKind {
    #[default]
    Slayer,
    Demonist,
    Demon,
    Npc,
}

/// The six base statistics.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BaseStats {
    pub force: f64,
    pub finesse: f64,
    pub courage: f64,
    pub vitesse: f64,
    pub social: f64,
    pub intellect: f64,
}

/// A current/maximum resource pair.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Pool {
    pub value: f64,
    pub max: f64,
}

impl Pool {
    pub fn full(max: f64) -> Self {
        Self { value: max, max }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Resources {
    pub hp: Pool,
    pub endurance: Pool,
    /// Reaction points.
    pub rp: Pool,
    pub armor_class: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DerivedStats {
    pub reflexes: f64,
    pub agility: f64,
}

/// A breath the character can use, with its unlocked specials.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BreathProfile {
    pub enabled: bool,
    #[serde(default)]
    pub specials: BTreeSet<String>,
}

/// Addressable attributes of a sheet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SheetAttribute {
    Level,
    Force,
    Finesse,
    Courage,
    Vitesse,
    Social,
    Intellect,
    Hp,
    HpMax,
    Endurance,
    EnduranceMax,
    ReactionPoints,
    ReactionPointsMax,
    ArmorClass,
    Reflexes,
    Agility,
}

struct Accessor {
    path: &'static str,
    attribute: SheetAttribute,
    get: fn(&CharacterSheet) -> f64,
    set: fn(&mut CharacterSheet, f64),
}

const ACCESSORS: &[Accessor] = &[
    Accessor { path: "details.level", attribute: SheetAttribute::Level, get: |s| s.level, set: |s, v| s.level = v },
    Accessor { path: "stats.force", attribute: SheetAttribute::Force, get: |s| s.stats.force, set: |s, v| s.stats.force = v },
    Accessor { path: "stats.finesse", attribute: SheetAttribute::Finesse, get: |s| s.stats.finesse, set: |s, v| s.stats.finesse = v },
    Accessor { path: "stats.courage", attribute: SheetAttribute::Courage, get: |s| s.stats.courage, set: |s, v| s.stats.courage = v },
    Accessor { path: "stats.vitesse", attribute: SheetAttribute::Vitesse, get: |s| s.stats.vitesse, set: |s, v| s.stats.vitesse = v },
    Accessor { path: "stats.social", attribute: SheetAttribute::Social, get: |s| s.stats.social, set: |s, v| s.stats.social = v },
    Accessor { path: "stats.intellect", attribute: SheetAttribute::Intellect, get: |s| s.stats.intellect, set: |s, v| s.stats.intellect = v },
    Accessor { path: "resources.hp.value", attribute: SheetAttribute::Hp, get: |s| s.resources.hp.value, set: |s, v| s.resources.hp.value = v },
    Accessor { path: "resources.hp.max", attribute: SheetAttribute::HpMax, get: |s| s.resources.hp.max, set: |s, v| s.resources.hp.max = v },
    Accessor { path: "resources.endurance.value", attribute: SheetAttribute::Endurance, get: |s| s.resources.endurance.value, set: |s, v| s.resources.endurance.value = v },
    Accessor { path: "resources.endurance.max", attribute: SheetAttribute::EnduranceMax, get: |s| s.resources.endurance.max, set: |s, v| s.resources.endurance.max = v },
    Accessor { path: "resources.rp.value", attribute: SheetAttribute::ReactionPoints, get: |s| s.resources.rp.value, set: |s, v| s.resources.rp.value = v },
    Accessor { path: "resources.rp.max", attribute: SheetAttribute::ReactionPointsMax, get: |s| s.resources.rp.max, set: |s, v| s.resources.rp.max = v },
    Accessor { path: "resources.armorClass", attribute: SheetAttribute::ArmorClass, get: |s| s.resources.armor_class, set: |s, v| s.resources.armor_class = v },
    Accessor { path: "derived.reflexes", attribute: SheetAttribute::Reflexes, get: |s| s.derived.reflexes, set: |s, v| s.derived.reflexes = v },
    Accessor { path: "derived.agility", attribute: SheetAttribute::Agility, get: |s| s.derived.agility, set: |s, v| s.derived.agility = v },
];

impl SheetAttribute {
    // ACCESSORS is laid out in declaration order.
    fn accessor(self) -> &'static Accessor {
        &ACCESSORS[self as usize]
    }

    /// The dotted path for this attribute.
    ///
    /// ```rust
    /// use breathe_effects::SheetAttribute;
    ///
    /// assert_eq!(SheetAttribute::ArmorClass.path().as_str(), "resources.armorClass");
    /// ```
    pub fn path(self) -> AttributePath {
        AttributePath::from_str(self.accessor().path)
    }

    pub fn from_path(path: &AttributePath) -> Option<Self> {
        ACCESSORS
            .iter()
            .find(|a| a.path == path.as_str())
            .map(|a| a.attribute)
    }
}

impl From<SheetAttribute> for AttributePath {
    fn from(attribute: SheetAttribute) -> Self {
        attribute.path()
    }
}

/// A character of the game.
///
/// # Examples
///
/// ```rust
/// use breathe_effects::*;
///
/// let mut sheet = CharacterSheet::new("zenitsu", "Zenitsu", ActorKind::Slayer);
/// sheet.resources.armor_class = 13.0;
///
/// let ac = SheetAttribute::ArmorClass.path();
/// assert_eq!(sheet.get(&ac), AttributeValue::Number(13.0));
///
/// let typo = AttributePath::from_str("resources.armour");
/// assert!(!sheet.accepts(&typo));
/// sheet.set(&typo, 1.0.into());
/// assert_eq!(sheet.get(&typo), AttributeValue::Empty);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CharacterSheet {
    pub id: CharacterId,
    pub name: String,
    pub kind: ActorKind,
    pub level: f64,
    pub stats: BaseStats,
    pub resources: Resources,
    pub derived: DerivedStats,
    #[serde(default)]
    pub breaths: BTreeMap<BreathKey, BreathProfile>,
    #[serde(default)]
    pub effects: EffectState,
}

impl CharacterSheet {
    pub fn new(id: impl Into<String>, name: impl Into<String>, kind: ActorKind) -> Self {
        Self {
            id: CharacterId::new(id),
            name: name.into(),
            kind,
            level: 1.0,
            ..Self::default()
        }
    }

    /// Enable a breath with the given specials.
    pub fn with_breath(mut self, breath: BreathKey, specials: &[&str]) -> Self {
        self.breaths.insert(
            breath,
            BreathProfile {
                enabled: true,
                specials: specials.iter().map(|s| s.to_string()).collect(),
            },
        );
        self
    }

    pub fn breath_enabled(&self, breath: BreathKey) -> bool {
        self.breaths.get(&breath).is_some_and(|b| b.enabled)
    }

    pub fn has_special(&self, breath: BreathKey, special: &str) -> bool {
        self.breaths
            .get(&breath)
            .is_some_and(|b| b.specials.contains(special))
    }

    pub fn value(&self, attribute: SheetAttribute) -> f64 {
        (attribute.accessor().get)(self)
    }

    pub fn set_value(&mut self, attribute: SheetAttribute, value: f64) {
        (attribute.accessor().set)(self, value)
    }
}

impl CharacterRecord for CharacterSheet {
    fn id(&self) -> &CharacterId {
        &self.id
    }

    fn get(&self, path: &AttributePath) -> AttributeValue {
        match SheetAttribute::from_path(path) {
            Some(attribute) => AttributeValue::Number(self.value(attribute)),
            None => AttributeValue::Empty,
        }
    }

    fn set(&mut self, path: &AttributePath, value: AttributeValue) {
        let Some(attribute) = SheetAttribute::from_path(path) else {
            warn!(character = %self.id, path = %path, "ignoring write to unknown attribute");
            return;
        };
        match value.as_number() {
            Some(n) => self.set_value(attribute, n),
            None => {
                warn!(character = %self.id, path = %path, value = %value, "ignoring non-numeric write")
            }
        }
    }

    fn accepts(&self, path: &AttributePath) -> bool {
        SheetAttribute::from_path(path).is_some()
    }

    fn effects(&self) -> &EffectState {
        &self.effects
    }

    fn effects_mut(&mut self) -> &mut EffectState {
        &mut self.effects
    }

    fn attributes_changed(&mut self, paths: &[AttributePath]) -> Vec<AttributePath> {
        match DerivedRules::for_kind(self.kind).apply_affected(self, paths) {
            Ok(rewritten) => rewritten,
            Err(err) => {
                warn!(character = %self.id, error = %err, "derived attributes not refreshed");
                Vec::new()
            }
        }
    }
}

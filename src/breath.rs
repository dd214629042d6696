//! Breath special abilities.
//!
//! Which special fires, and what it does, is data: a table of
//! `SpecialRule`s keyed by breath and special id. The resolver walks the
//! table for the technique's breath; all branching on ability names happens
//! here, once, instead of at every call site.
//!
//! Pre-hit rules rewrite cost and damage inline. On-hit rules produce
//! `SpecialDirective`s which the caller executes against the world (timed
//! effects go through the effect engine).

use crate::attribute::AttributePath;
use crate::config::EngineConfig;
use crate::dice::DiceFormula;
use crate::effect::{EffectDuration, EffectMode, EffectRequest, Magnitude};
use crate::record::CharacterId;
use crate::sheet::{ActorKind, CharacterSheet, SheetAttribute};
use serde::{Deserialize, Serialize};
use std::fmt;

/// The breaths of the game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BreathKey {
    Sun,
    Moon,
    Water,
    Flame,
    Wind,
    Thunder,
    Stone,
    Mist,
    Snow,
    Flower,
    Serpent,
    Sound,
    Insect,
    Love,
    Beast,
}

/// (key, accepted names after accent folding and lowercasing)
const BREATH_NAMES: &[(BreathKey, &[&str])] = &[
    (BreathKey::Sun, &["sun", "soleil"]),
    (BreathKey::Moon, &["moon", "lune"]),
    (BreathKey::Water, &["water", "eau"]),
    (BreathKey::Flame, &["flame", "flamme"]),
    (BreathKey::Wind, &["wind", "vent"]),
    (BreathKey::Thunder, &["thunder", "foudre"]),
    (BreathKey::Stone, &["stone", "pierre"]),
    (BreathKey::Mist, &["mist", "brume"]),
    (BreathKey::Snow, &["snow", "neige"]),
    (BreathKey::Flower, &["flower", "fleur"]),
    (BreathKey::Serpent, &["serpent"]),
    (BreathKey::Sound, &["sound", "son"]),
    (BreathKey::Insect, &["insect", "insecte"]),
    (BreathKey::Love, &["love", "amour"]),
    (BreathKey::Beast, &["beast", "bete"]),
];

fn fold_accents(c: char) -> char {
    match c {
        'à' | 'â' | 'ä' => 'a',
        'é' | 'è' | 'ê' | 'ë' => 'e',
        'î' | 'ï' => 'i',
        'ô' | 'ö' => 'o',
        'ù' | 'û' | 'ü' => 'u',
        'ç' => 'c',
        '’' => '\'',
        other => other,
    }
}

impl BreathKey {
    /// Resolve a free-form breath name to its key.
    ///
    /// Accepts English and French names, any case, accents, and the
    /// "souffle de ..." prefix. Technique names that start with a breath
    /// name also resolve.
    ///
    /// ```rust
    /// use breathe_effects::BreathKey;
    ///
    /// assert_eq!(BreathKey::canonicalize("Souffle de l'Eau"), Some(BreathKey::Water));
    /// assert_eq!(BreathKey::canonicalize("BÊTE"), Some(BreathKey::Beast));
    /// assert_eq!(BreathKey::canonicalize("thunder"), Some(BreathKey::Thunder));
    /// assert_eq!(BreathKey::canonicalize("cooking"), None);
    /// ```
    pub fn canonicalize(name: &str) -> Option<Self> {
        let folded: String = name
            .trim()
            .to_lowercase()
            .chars()
            .map(fold_accents)
            .collect();
        let mut rest = folded.as_str();
        if let Some(after) = rest.strip_prefix("souffle") {
            rest = after.trim_start();
            for article in ["de la ", "de l'", "du ", "des ", "de "] {
                if let Some(after) = rest.strip_prefix(article) {
                    rest = after.trim_start();
                    break;
                }
            }
        }

        BREATH_NAMES.iter().find_map(|(key, names)| {
            names
                .iter()
                .any(|n| {
                    rest.strip_prefix(n)
                        .is_some_and(|tail| tail.is_empty() || !tail.starts_with(char::is_alphanumeric))
                })
                .then_some(*key)
        })
    }
}

impl fmt::Display for BreathKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = BREATH_NAMES
            .iter()
            .find(|(key, _)| key == self)
            .map(|(_, names)| names[0])
            .unwrap_or("unknown");
        write!(f, "{}", name)
    }
}

/// A combat technique item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Technique {
    pub name: String,
    /// Breath name as written on the item; falls back to `name`.
    #[serde(default)]
    pub breath: Option<String>,
    #[serde(default)]
    pub form: Option<u32>,
    /// Endurance cost.
    #[serde(default)]
    pub cost: u32,
    /// Damage expression, e.g. "1d8".
    #[serde(default = "default_damage")]
    pub damage: String,
    /// Reach in metres.
    #[serde(default = "default_range")]
    pub range: f64,
}

fn default_damage() -> String {
    "1d8".to_string()
}

fn default_range() -> f64 {
    1.5
}

impl Technique {
    /// A technique with the default range. `breath` is the free-text breath
    /// name as entered on the item, if any.
    pub fn new(name: impl Into<String>, breath: Option<&str>, cost: u32, damage: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            breath: breath.map(str::to_string),
            form: None,
            cost,
            damage: damage.into(),
            range: default_range(),
        }
    }

    /// The breath this technique belongs to, read from its breath field or,
    /// failing that, from its name.
    ///
    /// ```rust
    /// use breathe_effects::{BreathKey, Technique};
    ///
    /// let named = Technique::new("Souffle de l'Eau, dixième forme", None, 4, "2d6");
    /// assert_eq!(named.breath_key(), Some(BreathKey::Water));
    /// ```
    pub fn breath_key(&self) -> Option<BreathKey> {
        BreathKey::canonicalize(self.breath.as_deref().unwrap_or(&self.name))
    }
}

/// When an on-hit rule fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Condition {
    Always,
    /// The target took the damage (no dodge).
    TargetTookDamage,
    /// The target took the damage, is a demon, and is at 0 hp or less.
    DemonDefeated,
}

/// Which side of the exchange a directive targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Side {
    Attacker,
    Target,
}

/// What a special does.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SpecialEffect {
    /// Only announces a reaction or choice.
    Note,
    /// Divide the endurance cost (rounded down).
    CostDivisor(u32),
    /// Multiply the damage expression.
    DamageMultiplier(u32),
    /// Bonus dice per consecutive hit on the same target, capped by config.
    SameTargetStack { die: DiceFormula },
    /// Timed effect on the target, optionally never taking the attribute
    /// below `floor`.
    TargetEffect {
        attribute: SheetAttribute,
        mode: EffectMode,
        dice: DiceFormula,
        negate: bool,
        duration: EffectDuration,
        floor: Option<f64>,
    },
    /// Permanent gain for the attacker.
    AttackerGrant { attribute: SheetAttribute, dice: DiceFormula },
}

/// One row of the special-ability table.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpecialRule {
    pub breath: BreathKey,
    pub special: &'static str,
    pub note: &'static str,
    pub condition: Condition,
    pub effect: SpecialEffect,
}

/// The game's special abilities.
pub const SPECIAL_RULES: &[SpecialRule] = &[
    SpecialRule {
        breath: BreathKey::Sun,
        special: "elu",
        note: "Sun: Chosen One: cost halved",
        condition: Condition::Always,
        effect: SpecialEffect::CostDivisor(2),
    },
    SpecialRule {
        breath: BreathKey::Stone,
        special: "machoireHache",
        note: "Stone: Jaw & Axe: axe variant, damage doubled",
        condition: Condition::Always,
        effect: SpecialEffect::DamageMultiplier(2),
    },
    SpecialRule {
        breath: BreathKey::Flower,
        special: "concentrationFlorissante",
        note: "Flower: Blooming Focus: +1d4 per consecutive hit on the same target",
        condition: Condition::TargetTookDamage,
        effect: SpecialEffect::SameTargetStack {
            die: DiceFormula::dice(1, 4),
        },
    },
    SpecialRule {
        breath: BreathKey::Snow,
        special: "dentsDeKatana",
        note: "Snow: Katana Teeth: target AC -1d4 until end of round if damage is taken",
        condition: Condition::TargetTookDamage,
        effect: SpecialEffect::TargetEffect {
            attribute: SheetAttribute::ArmorClass,
            mode: EffectMode::Add,
            dice: DiceFormula::dice(1, 4),
            negate: true,
            duration: EffectDuration::EndOfRound,
            floor: Some(0.0),
        },
    },
    SpecialRule {
        breath: BreathKey::Wind,
        special: "ventsDeGuerre",
        note: "Wind: Winds of War: +1d2 RP when a demon is slain",
        condition: Condition::DemonDefeated,
        effect: SpecialEffect::AttackerGrant {
            attribute: SheetAttribute::ReactionPoints,
            dice: DiceFormula::dice(1, 2),
        },
    },
    SpecialRule {
        breath: BreathKey::Water,
        special: "devierVagues",
        note: "Water: Deflect the Waves: reaction available (cancel/redirect)",
        condition: Condition::Always,
        effect: SpecialEffect::Note,
    },
    SpecialRule {
        breath: BreathKey::Thunder,
        special: "vitesseLumiere",
        note: "Thunder: Light Speed: 6 m dash (reaction)",
        condition: Condition::Always,
        effect: SpecialEffect::Note,
    },
    SpecialRule {
        breath: BreathKey::Mist,
        special: "nuagesTrainants",
        note: "Mist: Trailing Clouds: 3 m zone (reaction/bonus)",
        condition: Condition::Always,
        effect: SpecialEffect::Note,
    },
];

/// A stack increment waiting for the hit to land.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingStack {
    pub special: String,
    pub target: CharacterId,
    pub count: u32,
}

/// Cost and damage after pre-hit specials.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreHit {
    pub breath: Option<BreathKey>,
    pub cost: u32,
    pub damage: String,
    pub notes: Vec<String>,
    pub pending_stack: Option<PendingStack>,
}

/// How the attack resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct HitOutcome {
    pub took_damage: bool,
}

/// An action requested by an on-hit special.
#[derive(Debug, Clone, PartialEq)]
pub enum SpecialDirective {
    ApplyEffect { side: Side, request: EffectRequest },
    Grant { side: Side, path: AttributePath, amount: Magnitude, label: String },
    CommitStack(PendingStack),
}

/// Decides which specials fire for a technique use.
///
/// # Examples
///
/// ```rust
/// use breathe_effects::*;
///
/// let resolver = BreathSpecialResolver::new(&EngineConfig::default());
/// let tanjiro = CharacterSheet::new("tanjiro", "Tanjiro", ActorKind::Slayer)
///     .with_breath(BreathKey::Sun, &["elu"]);
/// let rui = CharacterSheet::new("rui", "Rui", ActorKind::Demon);
/// let technique = Technique::new("Danse du dieu du feu", Some("Soleil"), 5, "2d6");
///
/// let pre = resolver.pre_hit(&tanjiro, &rui, &technique);
/// assert_eq!(pre.cost, 2);
/// assert_eq!(pre.damage, "2d6");
/// ```
#[derive(Debug, Clone)]
pub struct BreathSpecialResolver {
    rules: Vec<SpecialRule>,
    max_stacks: u32,
}

impl BreathSpecialResolver {
    /// A resolver over `SPECIAL_RULES`, capping stacks per `config`.
    pub fn new(config: &EngineConfig) -> Self {
        Self::with_rules(config, SPECIAL_RULES.to_vec())
    }

    /// A resolver over a custom table.
    pub fn with_rules(config: &EngineConfig, rules: Vec<SpecialRule>) -> Self {
        Self {
            rules,
            max_stacks: config.max_same_target_stacks,
        }
    }

    pub fn rules(&self) -> &[SpecialRule] {
        &self.rules
    }

    /// Rules that apply to this attacker using this technique.
    fn active_rules<'a>(
        &'a self,
        attacker: &'a CharacterSheet,
        technique: &Technique,
    ) -> impl Iterator<Item = &'a SpecialRule> + 'a {
        let breath = technique
            .breath_key()
            .filter(|b| attacker.breath_enabled(*b));
        self.rules.iter().filter(move |rule| {
            Some(rule.breath) == breath && attacker.has_special(rule.breath, rule.special)
        })
    }

    /// Cost and damage rewrites, applied before any roll.
    pub fn pre_hit(&self, attacker: &CharacterSheet, target: &CharacterSheet, technique: &Technique) -> PreHit {
        let mut pre = PreHit {
            breath: technique.breath_key(),
            cost: technique.cost,
            damage: technique.damage.clone(),
            notes: Vec::new(),
            pending_stack: None,
        };

        for rule in self.active_rules(attacker, technique) {
            match rule.effect {
                SpecialEffect::CostDivisor(divisor) => {
                    let before = pre.cost;
                    pre.cost /= divisor.max(1);
                    if pre.cost != before {
                        pre.notes.push(rule.note.to_string());
                    }
                }
                SpecialEffect::DamageMultiplier(factor) => {
                    pre.damage = format!("({})*{}", pre.damage, factor);
                    pre.notes.push(rule.note.to_string());
                }
                SpecialEffect::SameTargetStack { die } => {
                    let stacks = attacker
                        .effects
                        .stack_count(rule.special, &target.id)
                        .min(self.max_stacks);
                    if stacks > 0 {
                        pre.damage = format!("{} + {}", pre.damage, die.repeated(stacks));
                    }
                    pre.pending_stack = Some(PendingStack {
                        special: rule.special.to_string(),
                        target: target.id.clone(),
                        count: (stacks + 1).min(self.max_stacks),
                    });
                    pre.notes.push(rule.note.to_string());
                }
                SpecialEffect::Note
                | SpecialEffect::TargetEffect { .. }
                | SpecialEffect::AttackerGrant { .. } => pre.notes.push(rule.note.to_string()),
            }
        }
        pre
    }

    /// Directives for specials that trigger once the attack has resolved.
    ///
    /// `target` must reflect the state after damage.
    pub fn on_hit(
        &self,
        attacker: &CharacterSheet,
        target: &CharacterSheet,
        technique: &Technique,
        pre: &PreHit,
        outcome: HitOutcome,
    ) -> Vec<SpecialDirective> {
        let mut directives = Vec::new();
        for rule in self.active_rules(attacker, technique) {
            if !condition_holds(rule.condition, target, outcome) {
                continue;
            }
            match rule.effect {
                SpecialEffect::SameTargetStack { .. } => {
                    if let Some(pending) = pre.pending_stack.as_ref().filter(|p| p.special == rule.special) {
                        directives.push(SpecialDirective::CommitStack(pending.clone()));
                    }
                }
                SpecialEffect::TargetEffect {
                    attribute,
                    mode,
                    dice,
                    negate,
                    duration,
                    floor,
                } => {
                    let mut request = EffectRequest::new(attribute, mode, Magnitude::Roll { formula: dice, negate })
                        .lasting(duration)
                        .labelled(rule.note)
                        .from_origin(attacker.name.clone());
                    request.floor = floor;
                    directives.push(SpecialDirective::ApplyEffect {
                        side: Side::Target,
                        request,
                    })
                }
                SpecialEffect::AttackerGrant { attribute, dice } => {
                    directives.push(SpecialDirective::Grant {
                        side: Side::Attacker,
                        path: attribute.path(),
                        amount: Magnitude::Roll {
                            formula: dice,
                            negate: false,
                        },
                        label: rule.note.to_string(),
                    })
                }
                SpecialEffect::Note | SpecialEffect::CostDivisor(_) | SpecialEffect::DamageMultiplier(_) => {}
            }
        }
        directives
    }
}

fn condition_holds(condition: Condition, target: &CharacterSheet, outcome: HitOutcome) -> bool {
    match condition {
        Condition::Always => true,
        Condition::TargetTookDamage => outcome.took_damage,
        Condition::DemonDefeated => {
            outcome.took_damage && target.kind == ActorKind::Demon && target.resources.hp.value <= 0.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sheet::Pool;

    fn resolver() -> BreathSpecialResolver {
        BreathSpecialResolver::new(&EngineConfig::default())
    }

    fn demon(hp: f64) -> CharacterSheet {
        let mut d = CharacterSheet::new("akaza", "Akaza", ActorKind::Demon);
        d.resources.hp = Pool::full(hp);
        d
    }

    #[test]
    fn test_canonicalize_prefixes_and_technique_names() {
        assert_eq!(BreathKey::canonicalize("Souffle du Vent"), Some(BreathKey::Wind));
        assert_eq!(BreathKey::canonicalize("souffle de la flamme"), Some(BreathKey::Flame));
        assert_eq!(BreathKey::canonicalize("Souffle de l’Insecte"), Some(BreathKey::Insect));
        assert_eq!(BreathKey::canonicalize("Neige - Forme 1"), Some(BreathKey::Snow));
        assert_eq!(BreathKey::canonicalize("sonic"), None);
        assert_eq!(BreathKey::canonicalize(""), None);
    }

    #[test]
    fn test_no_breath_no_rewrite() {
        let attacker = CharacterSheet::new("a", "A", ActorKind::Slayer).with_breath(BreathKey::Sun, &["elu"]);
        let technique = Technique::new("Kick", None, 4, "1d6");
        let pre = resolver().pre_hit(&attacker, &demon(10.0), &technique);
        assert_eq!(pre.cost, 4);
        assert_eq!(pre.damage, "1d6");
        assert!(pre.notes.is_empty());
        assert_eq!(pre.breath, None);
    }

    #[test]
    fn test_disabled_breath_no_rewrite() {
        let mut attacker =
            CharacterSheet::new("a", "A", ActorKind::Slayer).with_breath(BreathKey::Sun, &["elu"]);
        attacker.breaths.get_mut(&BreathKey::Sun).unwrap().enabled = false;
        let technique = Technique::new("Dance", Some("sun"), 4, "1d6");
        assert_eq!(resolver().pre_hit(&attacker, &demon(10.0), &technique).cost, 4);
    }

    #[test]
    fn test_other_breath_specials_do_not_leak() {
        let attacker = CharacterSheet::new("a", "A", ActorKind::Slayer)
            .with_breath(BreathKey::Sun, &["elu"])
            .with_breath(BreathKey::Water, &[]);
        let technique = Technique::new("Water Wheel", Some("Eau"), 4, "1d6");
        assert_eq!(resolver().pre_hit(&attacker, &demon(10.0), &technique).cost, 4);
    }

    #[test]
    fn test_cost_halving_rounds_down() {
        let attacker = CharacterSheet::new("a", "A", ActorKind::Slayer).with_breath(BreathKey::Sun, &["elu"]);
        let technique = Technique::new("Dance", Some("soleil"), 5, "1d6");
        let pre = resolver().pre_hit(&attacker, &demon(10.0), &technique);
        assert_eq!(pre.cost, 2);
        assert_eq!(pre.notes.len(), 1);
    }

    #[test]
    fn test_damage_multiplier() {
        let attacker =
            CharacterSheet::new("a", "A", ActorKind::Slayer).with_breath(BreathKey::Stone, &["machoireHache"]);
        let technique = Technique::new("Axe", Some("pierre"), 3, "1d10+2");
        let pre = resolver().pre_hit(&attacker, &demon(10.0), &technique);
        assert_eq!(pre.damage, "(1d10+2)*2");
    }

    #[test]
    fn test_flower_stacks_are_capped() {
        let mut attacker = CharacterSheet::new("a", "A", ActorKind::Slayer)
            .with_breath(BreathKey::Flower, &["concentrationFlorissante"]);
        let target = demon(30.0);
        let technique = Technique::new("Petal", Some("fleur"), 2, "1d6");

        let pre = resolver().pre_hit(&attacker, &target, &technique);
        assert_eq!(pre.damage, "1d6");
        assert_eq!(pre.pending_stack.as_ref().unwrap().count, 1);

        attacker
            .effects
            .commit_stack("concentrationFlorissante", target.id.clone(), 3);
        let pre = resolver().pre_hit(&attacker, &target, &technique);
        assert_eq!(pre.damage, "1d6 + 3d4");
        assert_eq!(pre.pending_stack.as_ref().unwrap().count, 3);
    }

    #[test]
    fn test_snow_penalty_requires_damage() {
        let attacker =
            CharacterSheet::new("a", "A", ActorKind::Slayer).with_breath(BreathKey::Snow, &["dentsDeKatana"]);
        let target = demon(10.0);
        let technique = Technique::new("Frost", Some("neige"), 2, "1d6");
        let resolver = resolver();
        let pre = resolver.pre_hit(&attacker, &target, &technique);

        let dodged = resolver.on_hit(&attacker, &target, &technique, &pre, HitOutcome { took_damage: false });
        assert!(dodged.is_empty());

        let hit = resolver.on_hit(&attacker, &target, &technique, &pre, HitOutcome { took_damage: true });
        assert_eq!(hit.len(), 1);
        match &hit[0] {
            SpecialDirective::ApplyEffect { side, request } => {
                assert_eq!(*side, Side::Target);
                assert_eq!(request.path, SheetAttribute::ArmorClass.path());
                assert_eq!(request.duration, Some(EffectDuration::EndOfRound));
                assert_eq!(request.floor, Some(0.0));
                assert_eq!(
                    request.magnitude,
                    Magnitude::Roll {
                        formula: DiceFormula::dice(1, 4),
                        negate: true
                    }
                );
            }
            other => panic!("unexpected directive {:?}", other),
        }
    }

    #[test]
    fn test_wind_grant_only_on_slain_demon() {
        let attacker =
            CharacterSheet::new("a", "A", ActorKind::Slayer).with_breath(BreathKey::Wind, &["ventsDeGuerre"]);
        let technique = Technique::new("Gale", Some("vent"), 2, "1d6");
        let resolver = resolver();
        let hit = HitOutcome { took_damage: true };

        let alive = demon(5.0);
        let pre = resolver.pre_hit(&attacker, &alive, &technique);
        assert!(resolver.on_hit(&attacker, &alive, &technique, &pre, hit).is_empty());

        let mut human = CharacterSheet::new("h", "H", ActorKind::Npc);
        human.resources.hp.value = 0.0;
        assert!(resolver.on_hit(&attacker, &human, &technique, &pre, hit).is_empty());

        let slain = demon(0.0);
        let directives = resolver.on_hit(&attacker, &slain, &technique, &pre, hit);
        assert!(matches!(
            directives.as_slice(),
            [SpecialDirective::Grant { side: Side::Attacker, .. }]
        ));
    }

    #[test]
    fn test_custom_table_extends_behaviour() {
        let mut rules = SPECIAL_RULES.to_vec();
        rules.push(SpecialRule {
            breath: BreathKey::Moon,
            special: "croissant",
            note: "Moon: Crescent: cost thirded",
            condition: Condition::Always,
            effect: SpecialEffect::CostDivisor(3),
        });
        let resolver = BreathSpecialResolver::with_rules(&EngineConfig::default(), rules);
        let attacker =
            CharacterSheet::new("a", "A", ActorKind::Demonist).with_breath(BreathKey::Moon, &["croissant"]);
        let technique = Technique::new("Crescent", Some("lune"), 9, "1d6");
        assert_eq!(resolver.pre_hit(&attacker, &demon(3.0), &technique).cost, 3);
    }
}

//! The roster of characters in play.
//!
//! `World` owns the characters and keeps an index of the ones whose ledger
//! is non-empty. Boundary broadcasts walk the index instead of the whole
//! roster; every mutating entry point re-indexes the character it touched.

use crate::attribute::AttributePath;
use crate::breath::{BreathSpecialResolver, PendingStack, PreHit, Side, SpecialDirective, Technique};
use crate::dice::DiceResolver;
use crate::effect::{EffectId, EffectRequest};
use crate::engine::{adjust, unmodified, EffectEngine};
use crate::error::EffectError;
use crate::record::{CharacterId, CharacterRecord};
use crate::scheduler::{on_combat_end, on_round_boundary, on_turn_boundary, ExpiryReport};
use crate::sheet::{CharacterSheet, SheetAttribute};
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, info, warn};

/// Characters by id, plus the set of ids with active effects.
///
/// # Examples
///
/// ```rust
/// use breathe_effects::*;
///
/// let mut engine = EffectEngine::new(EngineConfig::default(), RandomDice);
/// let mut world = World::new();
/// world.insert(DynamicRecord::new("giyu").with("resources.armorClass", 12.0));
///
/// let giyu = CharacterId::new("giyu");
/// world
///     .apply_effect(&mut engine, &giyu, EffectRequest::add("resources.armorClass", -4.0))
///     .unwrap();
/// assert_eq!(world.active_characters().count(), 1);
///
/// world.end_round();
/// assert_eq!(world.get(&giyu).unwrap().number("resources.armorClass"), Some(12.0));
/// assert_eq!(world.active_characters().count(), 0);
/// ```
#[derive(Debug, Clone)]
pub struct World<C> {
    characters: BTreeMap<CharacterId, C>,
    active: BTreeSet<CharacterId>,
}

impl<C> Default for World<C> {
    fn default() -> Self {
        Self {
            characters: BTreeMap::new(),
            active: BTreeSet::new(),
        }
    }
}

impl<C: CharacterRecord> World<C> {
    /// An empty roster.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a character and return the one it replaced.
    ///
    /// Persisted effects are indexed right away. Effect state can only be
    /// built by the engine or loaded through a checked deserialize, so the
    /// character's base store already matches its ledger.
    pub fn insert(&mut self, character: C) -> Option<C> {
        let id = character.id().clone();
        let previous = self.characters.insert(id.clone(), character);
        self.reindex(&id);
        previous
    }

    /// Take a character out of play. Its effects leave with it.
    pub fn remove(&mut self, id: &CharacterId) -> Option<C> {
        self.active.remove(id);
        self.characters.remove(id)
    }

    /// Look up a character by id.
    pub fn get(&self, id: &CharacterId) -> Option<&C> {
        self.characters.get(id)
    }

    pub fn len(&self) -> usize {
        self.characters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.characters.is_empty()
    }

    /// Every character, ordered by id.
    pub fn iter(&self) -> impl Iterator<Item = &C> {
        self.characters.values()
    }

    /// Characters that currently carry at least one effect.
    pub fn active_characters(&self) -> impl Iterator<Item = &CharacterId> {
        self.active.iter()
    }

    /// Mutate one character in place and re-index it.
    ///
    /// # Errors
    ///
    /// `UnknownCharacter` if `id` is not in the roster; `f` is not called.
    pub fn update<R>(&mut self, id: &CharacterId, f: impl FnOnce(&mut C) -> R) -> Result<R, EffectError> {
        let character = self
            .characters
            .get_mut(id)
            .ok_or_else(|| EffectError::UnknownCharacter(id.clone()))?;
        let result = f(character);
        self.reindex(id);
        Ok(result)
    }

    /// Apply an effect to one character. See [`EffectEngine::apply`].
    pub fn apply_effect<D: DiceResolver>(
        &mut self,
        engine: &mut EffectEngine<D>,
        id: &CharacterId,
        request: EffectRequest,
    ) -> Result<EffectId, EffectError> {
        self.update(id, |character| engine.apply(character, request))?
    }

    /// Turn boundary for one character. Unknown ids are ignored.
    pub fn turn_boundary(&mut self, id: &CharacterId) -> Option<ExpiryReport> {
        self.boundary(id, on_turn_boundary)
    }

    /// Round boundary for one character. Unknown ids are ignored.
    pub fn round_boundary(&mut self, id: &CharacterId) -> Option<ExpiryReport> {
        self.boundary(id, on_round_boundary)
    }

    /// Turn boundary for every character with active effects.
    pub fn end_turn(&mut self) -> Vec<ExpiryReport> {
        self.broadcast(on_turn_boundary)
    }

    /// Round boundary for every character with active effects.
    pub fn end_round(&mut self) -> Vec<ExpiryReport> {
        self.broadcast(on_round_boundary)
    }

    /// Combat ended for every character with active effects.
    pub fn end_combat(&mut self) -> Vec<ExpiryReport> {
        self.broadcast(on_combat_end)
    }

    fn boundary(&mut self, id: &CharacterId, sweep: fn(&mut C) -> ExpiryReport) -> Option<ExpiryReport> {
        match self.update(id, sweep) {
            Ok(report) => Some(report),
            Err(_) => {
                debug!(character = %id, "boundary for unknown character ignored");
                None
            }
        }
    }

    fn broadcast(&mut self, sweep: fn(&mut C) -> ExpiryReport) -> Vec<ExpiryReport> {
        let ids: Vec<CharacterId> = self.active.iter().cloned().collect();
        ids.iter()
            .filter_map(|id| self.boundary(id, sweep))
            .filter(|report| !report.is_empty())
            .collect()
    }

    fn reindex(&mut self, id: &CharacterId) {
        match self.characters.get(id) {
            Some(c) if c.effects().has_active_effects() => {
                self.active.insert(id.clone());
            }
            _ => {
                self.active.remove(id);
            }
        }
    }
}

impl<C: CharacterRecord> FromIterator<C> for World<C> {
    fn from_iter<I: IntoIterator<Item = C>>(iter: I) -> Self {
        let mut world = World::new();
        for character in iter {
            world.insert(character);
        }
        world
    }
}

/// What an on-hit resolution changed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HitReport {
    pub effects: Vec<(CharacterId, EffectId)>,
    /// `(character, path, amount)` for each permanent grant.
    pub grants: Vec<(CharacterId, AttributePath, f64)>,
    pub stacks: Vec<PendingStack>,
}

impl World<CharacterSheet> {
    /// Start a technique: resolve pre-hit specials and pay the endurance
    /// cost.
    ///
    /// # Errors
    ///
    /// `UnknownCharacter` if either id is missing, `InsufficientEndurance`
    /// if the attacker's endurance without active effects is below the
    /// cost. Nothing is spent on error.
    pub fn use_technique(
        &mut self,
        resolver: &BreathSpecialResolver,
        attacker: &CharacterId,
        target: &CharacterId,
        technique: &Technique,
    ) -> Result<PreHit, EffectError> {
        let attacker_sheet = self
            .get(attacker)
            .ok_or_else(|| EffectError::UnknownCharacter(attacker.clone()))?;
        let target_sheet = self
            .get(target)
            .ok_or_else(|| EffectError::UnknownCharacter(target.clone()))?;

        let pre = resolver.pre_hit(attacker_sheet, target_sheet, technique);
        // The debit lands in the unmodified pool; check against the same value.
        let available = unmodified(attacker_sheet, &SheetAttribute::Endurance.path())
            .as_number()
            .unwrap_or(0.0);
        if f64::from(pre.cost) > available {
            return Err(EffectError::InsufficientEndurance {
                required: pre.cost,
                available,
            });
        }

        let cost = f64::from(pre.cost);
        self.update(attacker, |sheet| {
            adjust(sheet, &SheetAttribute::Endurance.path(), -cost)
        })?;
        info!(
            attacker = %attacker,
            target = %target,
            technique = %technique.name,
            cost = pre.cost,
            damage = %pre.damage,
            "technique used"
        );
        Ok(pre)
    }

    /// Carry out on-hit directives.
    ///
    /// A timed effect that cannot be applied is logged and skipped; the
    /// remaining directives still run.
    pub fn resolve_hit<D: DiceResolver>(
        &mut self,
        engine: &mut EffectEngine<D>,
        attacker: &CharacterId,
        target: &CharacterId,
        directives: Vec<SpecialDirective>,
    ) -> Result<HitReport, EffectError> {
        let mut report = HitReport::default();
        let side_id = |side: Side| match side {
            Side::Attacker => attacker.clone(),
            Side::Target => target.clone(),
        };

        for directive in directives {
            match directive {
                SpecialDirective::ApplyEffect { side, request } => {
                    let id = side_id(side);
                    match self.apply_effect(engine, &id, request) {
                        Ok(effect) => report.effects.push((id, effect)),
                        Err(err) => warn!(character = %id, error = %err, "special effect not applied"),
                    }
                }
                SpecialDirective::Grant {
                    side,
                    path,
                    amount,
                    label,
                } => {
                    let id = side_id(side);
                    let amount = engine.resolve(&amount);
                    self.update(&id, |sheet| adjust(sheet, &path, amount))?;
                    debug!(character = %id, path = %path, amount, label = %label, "granted");
                    report.grants.push((id, path, amount));
                }
                SpecialDirective::CommitStack(pending) => {
                    self.update(attacker, |sheet| {
                        sheet
                            .effects
                            .commit_stack(pending.special.clone(), pending.target.clone(), pending.count)
                    })?;
                    report.stacks.push(pending);
                }
            }
        }
        Ok(report)
    }
}

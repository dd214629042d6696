//! Derived statistics.
//!
//! Maxima and defences are linear in other attributes:
//! `target = constant + Σ coefficient · input`. Rules are evaluated in
//! dependency order, and each result is written through `rebase` so an
//! effect active on a derived attribute stays on top of the new value.
//!
//! Inputs are read live, buffs included. When an effect lands on or leaves
//! an input, `apply_affected` re-runs only the rules downstream of it, so a
//! derived value never keeps a contribution from an expired buff.

use crate::attribute::{AttributePath, AttributeValue};
use crate::engine::{rebase, unmodified};
use crate::error::EffectError;
use crate::graph::AttributeGraph;
use crate::record::CharacterRecord;
use crate::sheet::{ActorKind, SheetAttribute};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tracing::debug;

/// One linear derivation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DerivedRule {
    pub target: AttributePath,
    pub constant: f64,
    pub terms: Vec<(AttributePath, f64)>,
    /// Current-value path clamped to the new `target`.
    #[serde(default)]
    pub caps: Option<AttributePath>,
}

impl DerivedRule {
    /// `target = constant`, with no inputs yet.
    pub fn new(target: impl Into<AttributePath>, constant: f64) -> Self {
        Self {
            target: target.into(),
            constant,
            terms: Vec::new(),
            caps: None,
        }
    }

    /// Add `coefficient · input` to the rule.
    pub fn plus(mut self, input: impl Into<AttributePath>, coefficient: f64) -> Self {
        self.terms.push((input.into(), coefficient));
        self
    }

    /// Clamp `current` to the derived value whenever the full rule set
    /// runs. Used for pools whose `target` is the maximum.
    pub fn capping(mut self, current: impl Into<AttributePath>) -> Self {
        self.caps = Some(current.into());
        self
    }

    /// Evaluate against the live values of `character`; missing or
    /// non-numeric inputs count as zero.
    pub fn evaluate<C>(&self, character: &C) -> f64
    where
        C: CharacterRecord + ?Sized,
    {
        self.terms.iter().fold(self.constant, |acc, (path, coefficient)| {
            acc + coefficient * character.get(path).as_number().unwrap_or(0.0)
        })
    }

    fn reads_any(&self, paths: &BTreeSet<AttributePath>) -> bool {
        self.terms.iter().any(|(input, _)| paths.contains(input))
    }

    /// Evaluate and write the target; with `clamp`, also cap the current
    /// value of a pool.
    fn write<C>(&self, character: &mut C, clamp: bool)
    where
        C: CharacterRecord + ?Sized,
    {
        let value = self.evaluate(&*character);
        let live = rebase(character, &self.target, AttributeValue::Number(value));
        debug!(character = %character.id(), path = %self.target, value, live = %live, "derived");

        let Some(current) = self.caps.as_ref().filter(|_| clamp) else {
            return;
        };
        let max = live.as_number().unwrap_or(value);
        if unmodified(character, current).as_number().is_some_and(|n| n > max) {
            rebase(character, current, AttributeValue::Number(max));
        }
    }
}

/// A set of derivations evaluated together.
///
/// # Examples
///
/// ```rust
/// use breathe_effects::*;
///
/// let mut inosuke = CharacterSheet::new("inosuke", "Inosuke", ActorKind::Slayer);
/// inosuke.level = 3.0;
/// inosuke.stats.vitesse = 2.0;
///
/// DerivedRules::for_kind(ActorKind::Slayer).apply(&mut inosuke).unwrap();
/// assert_eq!(inosuke.resources.hp.max, 29.0);
/// assert_eq!(inosuke.resources.armor_class, 12.0);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DerivedRules {
    rules: Vec<DerivedRule>,
}

impl DerivedRules {
    pub fn new(rules: Vec<DerivedRule>) -> Self {
        Self { rules }
    }

    /// The game's derivations for an actor kind.
    pub fn for_kind(kind: ActorKind) -> Self {
        use SheetAttribute::*;

        let mut rules = vec![
            DerivedRule::new(ArmorClass, 10.0).plus(Vitesse, 1.0),
            DerivedRule::new(Reflexes, 1.0).plus(Vitesse, 1.0),
            DerivedRule::new(Agility, 1.0).plus(Vitesse, 1.0),
        ];
        let (hp, endurance) = match kind {
            ActorKind::Npc => return Self::new(rules),
            ActorKind::Demon => ((25.0, 4.0), (20.0, 15.0)),
            ActorKind::Slayer | ActorKind::Demonist => ((20.0, 3.0), (20.0, 5.0)),
        };
        rules.extend([
            DerivedRule::new(HpMax, hp.0).plus(Level, hp.1).capping(Hp),
            DerivedRule::new(EnduranceMax, endurance.0)
                .plus(Level, endurance.1)
                .capping(Endurance),
            DerivedRule::new(ReactionPointsMax, 5.0)
                .plus(Vitesse, 1.0)
                .plus(Intellect, 1.0)
                .capping(ReactionPoints),
        ]);
        Self::new(rules)
    }

    pub fn rules(&self) -> &[DerivedRule] {
        &self.rules
    }

    pub fn push(&mut self, rule: DerivedRule) {
        self.rules.push(rule);
    }

    /// The dependency graph over rule targets and their inputs.
    pub fn graph(&self) -> AttributeGraph {
        let mut graph = AttributeGraph::new();
        for rule in &self.rules {
            graph.add_node(rule.target.clone());
            for (input, _) in &rule.terms {
                graph.add_dependency(rule.target.clone(), input.clone());
            }
        }
        graph
    }

    /// Rules ordered so every rule runs after the rules it reads from.
    pub fn ordered(&self) -> Result<Vec<&DerivedRule>, EffectError> {
        let order = self.graph().evaluation_order()?;
        Ok(order
            .iter()
            .filter_map(|path| self.rules.iter().find(|r| &r.target == path))
            .collect())
    }

    /// Recompute every derived attribute of `character`, then clamp pool
    /// values to their new maxima.
    ///
    /// # Errors
    ///
    /// `EffectError::Cycle` if the rules depend on each other in a loop.
    pub fn apply<C>(&self, character: &mut C) -> Result<(), EffectError>
    where
        C: CharacterRecord + ?Sized,
    {
        for rule in self.ordered()? {
            rule.write(character, true);
        }
        Ok(())
    }

    /// Recompute only the rules that read, directly or through another
    /// rule, one of the `changed` paths. Returns the targets rewritten, in
    /// evaluation order.
    ///
    /// Pool values are not clamped here: a temporary drop of a maximum
    /// must not permanently cost the character points.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use breathe_effects::*;
    ///
    /// let rules = DerivedRules::for_kind(ActorKind::Npc);
    /// let mut npc = CharacterSheet::new("n", "N", ActorKind::Npc);
    /// npc.stats.vitesse = 3.0;
    ///
    /// let rewritten = rules
    ///     .apply_affected(&mut npc, &[SheetAttribute::Vitesse.path()])
    ///     .unwrap();
    /// assert_eq!(rewritten.len(), 3);
    /// assert_eq!(npc.resources.armor_class, 13.0);
    ///
    /// let untouched = rules
    ///     .apply_affected(&mut npc, &[SheetAttribute::Force.path()])
    ///     .unwrap();
    /// assert!(untouched.is_empty());
    /// ```
    pub fn apply_affected<C>(
        &self,
        character: &mut C,
        changed: &[AttributePath],
    ) -> Result<Vec<AttributePath>, EffectError>
    where
        C: CharacterRecord + ?Sized,
    {
        let mut dirty: BTreeSet<AttributePath> = changed.iter().cloned().collect();
        if !self.rules.iter().any(|rule| rule.reads_any(&dirty)) {
            return Ok(Vec::new());
        }

        let mut rewritten = Vec::new();
        for rule in self.ordered()? {
            if !rule.reads_any(&dirty) {
                continue;
            }
            rule.write(character, false);
            dirty.insert(rule.target.clone());
            rewritten.push(rule.target.clone());
        }
        Ok(rewritten)
    }
}

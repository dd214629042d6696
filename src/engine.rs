//! Effect application and recompute.
//!
//! `EffectEngine::apply` is the write path: it resolves the magnitude,
//! captures the base value on first use of a path, appends the record and
//! recomputes the attribute. `recompute` replays the base through every
//! active effect on a path in ledger order.

use crate::attribute::{AttributePath, AttributeValue};
use crate::breakdown::Breakdown;
use crate::config::EngineConfig;
use crate::dice::{DiceResolver, RandomDice};
use crate::effect::{EffectId, EffectRecord, EffectRequest, Magnitude};
use crate::error::EffectError;
use crate::record::CharacterRecord;
use tracing::{debug, warn};

/// Applies effects to characters.
///
/// # Examples
///
/// ```rust
/// use breathe_effects::*;
///
/// let mut engine = EffectEngine::new(EngineConfig::default(), RandomDice);
/// let mut nezuko = DynamicRecord::new("nezuko").with("resources.armorClass", 12.0);
///
/// engine
///     .apply(&mut nezuko, EffectRequest::add("resources.armorClass", -4.0))
///     .unwrap();
/// assert_eq!(nezuko.number("resources.armorClass"), Some(8.0));
/// ```
pub struct EffectEngine<D = RandomDice> {
    config: EngineConfig,
    dice: D,
}

impl<D: DiceResolver> EffectEngine<D> {
    /// An engine filling request defaults from `config` and rolling with
    /// `dice`.
    pub fn new(config: EngineConfig, dice: D) -> Self {
        Self { config, dice }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Roll `formula`-style magnitudes; fixed magnitudes pass through.
    pub fn resolve(&mut self, magnitude: &Magnitude) -> f64 {
        match magnitude {
            Magnitude::Fixed(m) => *m,
            Magnitude::Roll { formula, negate } => {
                let rolled = self.dice.roll(formula) as f64;
                if *negate {
                    -rolled
                } else {
                    rolled
                }
            }
        }
    }

    /// Apply one effect to `character` and return the new record's id.
    ///
    /// Paths the record does not accept are rejected with
    /// `EffectError::UnknownAttribute`; nothing is stored in that case.
    pub fn apply<C>(&mut self, character: &mut C, request: EffectRequest) -> Result<EffectId, EffectError>
    where
        C: CharacterRecord + ?Sized,
    {
        let path = request.path;
        if !character.accepts(&path) {
            warn!(character = %character.id(), path = %path, "rejecting effect on unknown attribute");
            return Err(EffectError::UnknownAttribute(path));
        }

        let magnitude = self.resolve(&request.magnitude);
        let current = character.get(&path);
        if character.effects_mut().base.capture(&path, current.clone()) {
            debug!(character = %character.id(), path = %path, base = %current, "captured base value");
        }

        let record = EffectRecord::new(
            path.clone(),
            request.mode,
            magnitude,
            request.duration.unwrap_or(self.config.default_duration),
            request.label.unwrap_or_else(|| self.config.default_label.clone()),
            Some(request.origin.unwrap_or_else(|| self.config.default_origin.clone())),
            current,
        )
        .with_floor(request.floor);
        let id = record.id();
        debug!(
            character = %character.id(),
            path = %path,
            effect = %id,
            mode = ?record.mode(),
            magnitude,
            duration = %record.duration(),
            "applying effect"
        );
        character.effects_mut().ledger.push(record);

        recompute(character, &path);
        let rederived = character.attributes_changed(std::slice::from_ref(&path));
        if !rederived.is_empty() {
            debug!(character = %character.id(), path = %path, rederived = ?rederived, "refreshed derived attributes");
        }
        Ok(id)
    }

    /// Apply several effects, logging and skipping the ones that fail.
    pub fn apply_all<C, I>(&mut self, character: &mut C, requests: I) -> Vec<EffectId>
    where
        C: CharacterRecord + ?Sized,
        I: IntoIterator<Item = EffectRequest>,
    {
        requests
            .into_iter()
            .filter_map(|request| match self.apply(character, request) {
                Ok(id) => Some(id),
                Err(err) => {
                    warn!(character = %character.id(), error = %err, "effect not applied");
                    None
                }
            })
            .collect()
    }

    /// Permanently change `path` by `delta`. See [`adjust`].
    pub fn adjust<C>(&mut self, character: &mut C, path: &AttributePath, delta: f64) -> AttributeValue
    where
        C: CharacterRecord + ?Sized,
    {
        adjust(character, path, delta)
    }
}

/// The value of `path` without active effects: the stored base if one is
/// held, the live value otherwise.
///
/// ```rust
/// use breathe_effects::*;
///
/// let mut engine = EffectEngine::new(EngineConfig::default(), RandomDice);
/// let mut inosuke = DynamicRecord::new("inosuke").with("resources.endurance.value", 4.0);
/// let path = AttributePath::from_str("resources.endurance.value");
/// engine.apply(&mut inosuke, EffectRequest::add(path.clone(), 6.0)).unwrap();
///
/// assert_eq!(inosuke.get(&path), AttributeValue::Number(10.0));
/// assert_eq!(unmodified(&inosuke, &path), AttributeValue::Number(4.0));
/// ```
pub fn unmodified<C>(character: &C, path: &AttributePath) -> AttributeValue
where
    C: CharacterRecord + ?Sized,
{
    character
        .effects()
        .base
        .get(path)
        .cloned()
        .unwrap_or_else(|| character.get(path))
}

/// Rebuild the live value at `path` from its base and active effects.
///
/// Idempotent while the ledger is unchanged.
pub fn recompute<C>(character: &mut C, path: &AttributePath) -> Breakdown
where
    C: CharacterRecord + ?Sized,
{
    let base = unmodified(character, path);

    let mut breakdown = Breakdown::new(path.clone(), base);
    for record in character.effects().ledger.for_path(path) {
        let next = record.apply_to(&breakdown.value);
        breakdown.add_step(record.description(), next);
    }

    character.set(path, breakdown.value.clone());
    breakdown
}

/// Permanently change `path` by `delta` (spent or regained points).
///
/// If effects are active on the path the change lands in the stored base,
/// so it survives their expiry. Returns the new live value.
pub fn adjust<C>(character: &mut C, path: &AttributePath, delta: f64) -> AttributeValue
where
    C: CharacterRecord + ?Sized,
{
    let new_base = match unmodified(character, path) {
        AttributeValue::Number(n) => AttributeValue::Number(n + delta),
        // An empty attribute counts as zero for permanent adjustments.
        AttributeValue::Empty => AttributeValue::Number(delta),
        other => other,
    };
    rebase(character, path, new_base)
}

/// Replace the unmodified value of `path`.
///
/// With active effects the stored base is replaced and the ledger replayed;
/// without, the value is written directly. Returns the new live value.
pub fn rebase<C>(character: &mut C, path: &AttributePath, value: AttributeValue) -> AttributeValue
where
    C: CharacterRecord + ?Sized,
{
    if character.effects().base.contains(path) {
        character.effects_mut().base.replace(path, value);
        recompute(character, path).value
    } else {
        character.set(path, value.clone());
        value
    }
}

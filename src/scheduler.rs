//! Expiry scheduling.
//!
//! Reacts to turn and round boundaries from the combat clock. A boundary is
//! processed as one batch per character:
//!
//! 1. every record is ticked and the expiring ones are collected,
//! 2. expired records leave the ledger together,
//! 3. each touched path is fixed once: replayed from base if records remain,
//!    otherwise restored to its base and the base entry dropped.
//!
//! Removing a record and replaying the rest from base is the revert; it is
//! exact for `Add`, `Multiply` and `Set` alike. The character is then told
//! which paths changed so it can refresh what it derives from them.

use crate::attribute::AttributePath;
use crate::effect::{EffectRecord, Tick};
use crate::engine::recompute;
use crate::record::{CharacterId, CharacterRecord};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, info};

/// A crossing of the combat clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Boundary {
    Turn,
    Round,
}

impl fmt::Display for Boundary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Boundary::Turn => write!(f, "turn"),
            Boundary::Round => write!(f, "round"),
        }
    }
}

/// What one boundary did to one character.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExpiryReport {
    pub character: CharacterId,
    pub boundary: Boundary,
    /// Removed records, in former ledger order.
    pub expired: Vec<EffectRecord>,
    /// Paths that lost their last effect and got their base back.
    pub restored: Vec<AttributePath>,
    /// Paths that still carry effects and were replayed.
    pub recomputed: Vec<AttributePath>,
    /// Derived attributes the character refreshed afterwards.
    #[serde(default)]
    pub rederived: Vec<AttributePath>,
}

impl ExpiryReport {
    fn new(character: CharacterId, boundary: Boundary) -> Self {
        Self {
            character,
            boundary,
            expired: Vec::new(),
            restored: Vec::new(),
            recomputed: Vec::new(),
            rederived: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.expired.is_empty()
    }
}

/// Expire `EndOfTurn` effects and tick countdowns.
pub fn on_turn_boundary<C>(character: &mut C) -> ExpiryReport
where
    C: CharacterRecord + ?Sized,
{
    sweep(character, Boundary::Turn)
}

/// Expire `EndOfRound` effects.
pub fn on_round_boundary<C>(character: &mut C) -> ExpiryReport
where
    C: CharacterRecord + ?Sized,
{
    sweep(character, Boundary::Round)
}

/// Combat is over. Expires what a round boundary expires; turn-scoped
/// effects and countdowns carry over.
pub fn on_combat_end<C>(character: &mut C) -> ExpiryReport
where
    C: CharacterRecord + ?Sized,
{
    sweep(character, Boundary::Round)
}

/// Process one boundary for one character.
pub fn sweep<C>(character: &mut C, boundary: Boundary) -> ExpiryReport
where
    C: CharacterRecord + ?Sized,
{
    let mut report = ExpiryReport::new(character.id().clone(), boundary);
    if !character.effects().has_active_effects() {
        return report;
    }

    // Decide the whole batch before touching any attribute.
    let records = std::mem::take(character.effects_mut().ledger.records_mut());
    let mut kept = Vec::with_capacity(records.len());
    for mut record in records {
        let tick = match boundary {
            Boundary::Turn => record.tick_turn(),
            Boundary::Round => record.tick_round(),
        };
        match tick {
            Tick::Keep => kept.push(record),
            Tick::Expire => report.expired.push(record),
        }
    }
    *character.effects_mut().ledger.records_mut() = kept;

    let mut touched: Vec<AttributePath> = Vec::new();
    for record in &report.expired {
        debug!(
            character = %report.character,
            effect = %record.id(),
            path = %record.path(),
            label = record.label(),
            boundary = %boundary,
            "effect expired"
        );
        if !touched.contains(record.path()) {
            touched.push(record.path().clone());
        }
    }

    for path in touched {
        if character.effects().ledger.touches(&path) {
            recompute(character, &path);
            report.recomputed.push(path);
        } else if let Some(base) = character.effects_mut().base.remove(&path) {
            info!(character = %report.character, path = %path, base = %base, "restored base value");
            character.set(&path, base);
            report.restored.push(path);
        }
    }

    let changed: Vec<AttributePath> = report
        .restored
        .iter()
        .chain(&report.recomputed)
        .cloned()
        .collect();
    report.rederived = character.attributes_changed(&changed);

    report
}

//! # breathe-effects - Timed Effects Engine for Breathe & Live
//!
//! Temporary modifiers on character attributes for a turn-based tabletop
//! game:
//! - **Reversible** effects (the unmodified value is always recoverable)
//! - **Order-deterministic** stacking (ledger order decides the result)
//! - **Boundary-driven** expiry (turn and round ends, never wall-clock)
//! - **Data-driven** breath specials
//!
//! ## Core Concepts
//!
//! ### Effect Pipeline
//!
//! ```text
//! [EffectRequest] → apply → [EffectLedger + BaseValueStore] → recompute → attribute
//!                                      ↑
//!                      turn / round boundary → expire
//! ```
//!
//! 1. **Apply** resolves dice once, captures the base value the first time
//!    a path is touched, and appends an `EffectRecord`
//! 2. **Recompute** replays the base through every effect on the path, in
//!    ledger order
//! 3. **Expire** removes finished records on a boundary and either replays
//!    the remainder or restores the base
//!
//! A base value exists for a path exactly while the ledger holds at least
//! one record for it.
//!
//! ## Example
//!
//! ```rust
//! use breathe_effects::*;
//!
//! let mut engine = EffectEngine::new(EngineConfig::default(), RandomDice);
//! let mut tanjiro = CharacterSheet::new("tanjiro", "Tanjiro", ActorKind::Slayer);
//! tanjiro.resources.armor_class = 12.0;
//!
//! engine
//!     .apply(
//!         &mut tanjiro,
//!         EffectRequest::add(SheetAttribute::ArmorClass, -4.0).lasting(EffectDuration::EndOfRound),
//!     )
//!     .unwrap();
//! assert_eq!(tanjiro.resources.armor_class, 8.0);
//!
//! on_round_boundary(&mut tanjiro);
//! assert_eq!(tanjiro.resources.armor_class, 12.0);
//! assert!(tanjiro.effects.base().is_empty());
//! ```
//!
//! ## Modules
//!
//! - [`attribute`] - Attribute paths and values
//! - [`effect`] - Effect requests, records, modes and durations
//! - [`ledger`] - Per-character ledger and base-value store
//! - [`engine`] - Apply and recompute
//! - [`scheduler`] - Boundary-driven expiry
//! - [`record`] - Character access trait
//! - [`sheet`] - The game's typed character sheet
//! - [`derived`] - Derived statistics
//! - [`graph`] - Attribute dependency graph
//! - [`breath`] - Breath specials
//! - [`world`] - Roster with an index of characters under effects
//! - [`dice`] - Dice expressions and resolvers
//! - [`config`] - Engine configuration
//! - [`error`] - Error types

pub mod attribute;
pub mod breakdown;
pub mod breath;
pub mod config;
pub mod derived;
pub mod dice;
pub mod effect;
pub mod engine;
pub mod error;
pub mod graph;
pub mod ledger;
pub mod record;
pub mod scheduler;
pub mod sheet;
pub mod world;

// Re-export main types for convenience
pub use attribute::{AttributePath, AttributeValue};
pub use breakdown::Breakdown;
pub use config::EngineConfig;
pub use effect::{EffectDuration, EffectId, EffectMode, EffectRecord, EffectRequest, Magnitude};
pub use engine::{adjust, rebase, recompute, unmodified, EffectEngine};
pub use error::EffectError;
pub use ledger::{BaseValueStore, EffectLedger, EffectState, TargetStack};
pub use record::{CharacterId, CharacterRecord, DynamicRecord};
pub use scheduler::{on_combat_end, on_round_boundary, on_turn_boundary, sweep, Boundary, ExpiryReport};

// Re-export dice
pub use dice::{DiceFormula, DiceParseError, DiceResolver, RandomDice, SeededDice};

// Re-export game layer
pub use breath::{
    BreathKey, BreathSpecialResolver, Condition, HitOutcome, PendingStack, PreHit, Side, SpecialDirective,
    SpecialEffect, SpecialRule, Technique, SPECIAL_RULES,
};
pub use derived::{DerivedRule, DerivedRules};
pub use graph::AttributeGraph;
pub use sheet::{ActorKind, BaseStats, BreathProfile, CharacterSheet, DerivedStats, Pool, Resources, SheetAttribute};
pub use world::{HitReport, World};

//! Effect data model.
//!
//! An effect is a timed numeric modifier on one attribute. Callers describe
//! what they want with an `EffectRequest`; the engine freezes it into an
//! `EffectRecord` when it is applied.

use crate::attribute::{AttributePath, AttributeValue};
use crate::dice::{DiceFormula, DiceParseError};
use crate::error::EffectError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Identifier of an applied effect, unique across processes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EffectId(Uuid);

impl EffectId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for EffectId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for EffectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// How an effect combines with the running value of its attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EffectMode {
    Add,
    #[serde(alias = "mul")]
    Multiply,
    Set,
}

impl EffectMode {
    /// Combine `value` with `magnitude`.
    ///
    /// `Add` and `Multiply` leave non-numeric values untouched; `Set`
    /// always yields a number.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use breathe_effects::{AttributeValue, EffectMode};
    ///
    /// let five = AttributeValue::Number(5.0);
    /// assert_eq!(EffectMode::Add.combine(&five, 2.0), AttributeValue::Number(7.0));
    /// assert_eq!(EffectMode::Multiply.combine(&five, 3.0), AttributeValue::Number(15.0));
    ///
    /// let text = AttributeValue::from("none");
    /// assert_eq!(EffectMode::Add.combine(&text, 2.0), text);
    /// assert_eq!(EffectMode::Set.combine(&text, 2.0), AttributeValue::Number(2.0));
    /// ```
    pub fn combine(self, value: &AttributeValue, magnitude: f64) -> AttributeValue {
        match (self, value) {
            (EffectMode::Add, AttributeValue::Number(n)) => AttributeValue::Number(n + magnitude),
            (EffectMode::Multiply, AttributeValue::Number(n)) => {
                AttributeValue::Number(n * magnitude)
            }
            (EffectMode::Set, _) => AttributeValue::Number(magnitude),
            (_, other) => other.clone(),
        }
    }

    fn symbol(self) -> &'static str {
        match self {
            EffectMode::Add => "+",
            EffectMode::Multiply => "×",
            EffectMode::Set => "=",
        }
    }
}

/// How long an effect stays active.
///
/// `Countdown(n)` counts turn boundaries; it never moves on round
/// boundaries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EffectDuration {
    EndOfTurn,
    EndOfRound,
    Countdown(u32),
}

impl FromStr for EffectDuration {
    type Err = EffectError;

    /// Parses the tags used by stored game data: `turnEnd`, `roundEnd`
    /// and `custom:N`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let tag = s.trim().to_ascii_lowercase();
        match tag.as_str() {
            "turnend" => Ok(EffectDuration::EndOfTurn),
            "roundend" => Ok(EffectDuration::EndOfRound),
            _ => tag
                .strip_prefix("custom:")
                .and_then(|n| n.parse::<u32>().ok())
                .filter(|n| *n > 0)
                .map(EffectDuration::Countdown)
                .ok_or_else(|| EffectError::InvalidDuration(s.to_string())),
        }
    }
}

impl fmt::Display for EffectDuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EffectDuration::EndOfTurn => write!(f, "turnEnd"),
            EffectDuration::EndOfRound => write!(f, "roundEnd"),
            EffectDuration::Countdown(n) => write!(f, "custom:{}", n),
        }
    }
}

/// The requested size of an effect, before resolution.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Magnitude {
    Fixed(f64),
    /// Rolled once when the effect is applied. `negate` turns the roll into
    /// a penalty.
    Roll { formula: DiceFormula, negate: bool },
}

/// A request to apply one effect.
///
/// Missing duration, label and origin are filled from `EngineConfig`.
///
/// # Examples
///
/// ```rust
/// use breathe_effects::{EffectDuration, EffectMode, EffectRequest};
///
/// let request = EffectRequest::rolled("resources.armorClass", EffectMode::Add, "1d4")
///     .unwrap()
///     .negated()
///     .lasting(EffectDuration::EndOfRound)
///     .labelled("Katana teeth");
/// assert_eq!(request.mode, EffectMode::Add);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EffectRequest {
    pub path: AttributePath,
    pub mode: EffectMode,
    pub magnitude: Magnitude,
    pub duration: Option<EffectDuration>,
    pub label: Option<String>,
    pub origin: Option<String>,
    /// Lowest value this effect may push a numeric attribute to.
    #[serde(default)]
    pub floor: Option<f64>,
}

impl EffectRequest {
    /// A request with the given mode and magnitude and no duration, label,
    /// origin or floor.
    pub fn new(path: impl Into<AttributePath>, mode: EffectMode, magnitude: Magnitude) -> Self {
        Self {
            path: path.into(),
            mode,
            magnitude,
            duration: None,
            label: None,
            origin: None,
            floor: None,
        }
    }

    /// Add a fixed amount. Use a negative amount for a penalty.
    ///
    /// ```rust
    /// use breathe_effects::{EffectMode, EffectRequest, Magnitude};
    ///
    /// let request = EffectRequest::add("stats.vitesse", 2.0);
    /// assert_eq!(request.mode, EffectMode::Add);
    /// assert_eq!(request.magnitude, Magnitude::Fixed(2.0));
    /// ```
    pub fn add(path: impl Into<AttributePath>, magnitude: f64) -> Self {
        Self::new(path, EffectMode::Add, Magnitude::Fixed(magnitude))
    }

    /// Multiply by a fixed factor.
    pub fn multiply(path: impl Into<AttributePath>, magnitude: f64) -> Self {
        Self::new(path, EffectMode::Multiply, Magnitude::Fixed(magnitude))
    }

    /// Replace the value outright. Works on non-numeric attributes too.
    pub fn set(path: impl Into<AttributePath>, magnitude: f64) -> Self {
        Self::new(path, EffectMode::Set, Magnitude::Fixed(magnitude))
    }

    /// A request whose magnitude is a dice expression.
    ///
    /// # Errors
    ///
    /// Returns `DiceParseError` if `expression` is not an `XdY+Z` formula.
    pub fn rolled(
        path: impl Into<AttributePath>,
        mode: EffectMode,
        expression: &str,
    ) -> Result<Self, DiceParseError> {
        let formula = DiceFormula::parse(expression)?;
        Ok(Self::new(
            path,
            mode,
            Magnitude::Roll {
                formula,
                negate: false,
            },
        ))
    }

    /// Flip the sign of the magnitude.
    pub fn negated(mut self) -> Self {
        self.magnitude = match self.magnitude {
            Magnitude::Fixed(m) => Magnitude::Fixed(-m),
            Magnitude::Roll { formula, negate } => Magnitude::Roll {
                formula,
                negate: !negate,
            },
        };
        self
    }

    /// How long the effect lasts. Defaults to `EngineConfig::default_duration`.
    pub fn lasting(mut self, duration: EffectDuration) -> Self {
        self.duration = Some(duration);
        self
    }

    /// Display name in breakdowns and logs.
    pub fn labelled(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Who or what caused the effect.
    pub fn from_origin(mut self, origin: impl Into<String>) -> Self {
        self.origin = Some(origin.into());
        self
    }

    /// Never let this effect take a numeric value below `floor`.
    ///
    /// The floor is applied at this effect's step of the replay, so later
    /// effects on the same path can still move the value.
    ///
    /// ```rust
    /// use breathe_effects::*;
    ///
    /// let mut engine = EffectEngine::new(EngineConfig::default(), RandomDice);
    /// let mut rui = DynamicRecord::new("rui").with("resources.armorClass", 2.0);
    /// engine
    ///     .apply(&mut rui, EffectRequest::add("resources.armorClass", -4.0).floored_at(0.0))
    ///     .unwrap();
    /// assert_eq!(rui.number("resources.armorClass"), Some(0.0));
    /// ```
    pub fn floored_at(mut self, floor: f64) -> Self {
        self.floor = Some(floor);
        self
    }
}

/// One active effect in a character's ledger.
///
/// `path`, `mode` and `magnitude` never change after creation; only a
/// countdown duration ticks down.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EffectRecord {
    id: EffectId,
    path: AttributePath,
    mode: EffectMode,
    magnitude: f64,
    duration: EffectDuration,
    label: String,
    origin: Option<String>,
    applied_at: DateTime<Utc>,
    value_before: AttributeValue,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    floor: Option<f64>,
}

/// What a boundary does to one record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Tick {
    Keep,
    Expire,
}

impl EffectRecord {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        path: AttributePath,
        mode: EffectMode,
        magnitude: f64,
        duration: EffectDuration,
        label: String,
        origin: Option<String>,
        value_before: AttributeValue,
    ) -> Self {
        Self {
            id: EffectId::new(),
            path,
            mode,
            magnitude,
            duration,
            label,
            origin,
            applied_at: Utc::now(),
            value_before,
            floor: None,
        }
    }

    pub(crate) fn with_floor(mut self, floor: Option<f64>) -> Self {
        self.floor = floor;
        self
    }

    pub fn id(&self) -> EffectId {
        self.id
    }

    /// The attribute this effect modifies.
    pub fn path(&self) -> &AttributePath {
        &self.path
    }

    pub fn mode(&self) -> EffectMode {
        self.mode
    }

    /// The resolved magnitude. Dice were rolled once, when the effect was
    /// applied.
    pub fn magnitude(&self) -> f64 {
        self.magnitude
    }

    /// Remaining duration. Only `Countdown` changes over time.
    pub fn duration(&self) -> EffectDuration {
        self.duration
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn origin(&self) -> Option<&str> {
        self.origin.as_deref()
    }

    pub fn applied_at(&self) -> DateTime<Utc> {
        self.applied_at
    }

    /// Lowest numeric value this effect produces, if any.
    pub fn floor(&self) -> Option<f64> {
        self.floor
    }

    /// This effect's step of a replay: combine, then clamp to the floor.
    pub fn apply_to(&self, value: &AttributeValue) -> AttributeValue {
        match (self.mode.combine(value, self.magnitude), self.floor) {
            (AttributeValue::Number(n), Some(floor)) => AttributeValue::Number(n.max(floor)),
            (combined, _) => combined,
        }
    }

    /// The attribute's live value just before this effect was applied.
    pub fn value_before(&self) -> &AttributeValue {
        &self.value_before
    }

    /// Short form used in breakdowns, e.g. `Katana teeth (+-3)`.
    pub fn description(&self) -> String {
        format!("{} ({}{})", self.label, self.mode.symbol(), self.magnitude)
    }

    /// Advance this record across a turn boundary.
    pub(crate) fn tick_turn(&mut self) -> Tick {
        match self.duration {
            EffectDuration::EndOfTurn => Tick::Expire,
            EffectDuration::Countdown(n) if n <= 1 => Tick::Expire,
            EffectDuration::Countdown(n) => {
                self.duration = EffectDuration::Countdown(n - 1);
                Tick::Keep
            }
            EffectDuration::EndOfRound => Tick::Keep,
        }
    }

    /// Advance this record across a round boundary.
    pub(crate) fn tick_round(&self) -> Tick {
        match self.duration {
            EffectDuration::EndOfRound => Tick::Expire,
            _ => Tick::Keep,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(duration: EffectDuration) -> EffectRecord {
        EffectRecord::new(
            AttributePath::from_str("resources.armorClass"),
            EffectMode::Add,
            -1.0,
            duration,
            "test".into(),
            None,
            AttributeValue::Number(12.0),
        )
    }

    #[test]
    fn test_duration_tags() {
        assert_eq!("turnEnd".parse::<EffectDuration>().unwrap(), EffectDuration::EndOfTurn);
        assert_eq!("roundEnd".parse::<EffectDuration>().unwrap(), EffectDuration::EndOfRound);
        assert_eq!(
            "custom:3".parse::<EffectDuration>().unwrap(),
            EffectDuration::Countdown(3)
        );
        assert!("custom:0".parse::<EffectDuration>().is_err());
        assert!("forever".parse::<EffectDuration>().is_err());
        assert_eq!(EffectDuration::Countdown(2).to_string(), "custom:2");
    }

    #[test]
    fn test_countdown_ticks_on_turns_only() {
        let mut r = record(EffectDuration::Countdown(2));
        assert_eq!(r.tick_round(), Tick::Keep);
        assert_eq!(r.duration(), EffectDuration::Countdown(2));
        assert_eq!(r.tick_turn(), Tick::Keep);
        assert_eq!(r.duration(), EffectDuration::Countdown(1));
        assert_eq!(r.tick_turn(), Tick::Expire);
    }

    #[test]
    fn test_turn_and_round_are_isolated() {
        let mut turn = record(EffectDuration::EndOfTurn);
        let mut round = record(EffectDuration::EndOfRound);
        assert_eq!(turn.tick_round(), Tick::Keep);
        assert_eq!(round.tick_turn(), Tick::Keep);
        assert_eq!(turn.tick_turn(), Tick::Expire);
        assert_eq!(round.tick_round(), Tick::Expire);
    }

    #[test]
    fn test_negated_roll() {
        let request = EffectRequest::rolled("x", EffectMode::Add, "1d4").unwrap().negated();
        assert_eq!(
            request.magnitude,
            Magnitude::Roll {
                formula: DiceFormula::dice(1, 4),
                negate: true
            }
        );
        assert_eq!(EffectRequest::add("x", 2.0).negated().magnitude, Magnitude::Fixed(-2.0));
    }

    #[test]
    fn test_floor_clamps_only_numbers() {
        let r = record(EffectDuration::EndOfRound).with_floor(Some(0.0));
        assert_eq!(r.apply_to(&AttributeValue::Number(0.5)), AttributeValue::Number(0.0));
        assert_eq!(r.apply_to(&AttributeValue::Number(3.0)), AttributeValue::Number(2.0));
        assert_eq!(r.apply_to(&AttributeValue::Empty), AttributeValue::Empty);
        assert_eq!(record(EffectDuration::EndOfRound).floor(), None);
    }

    #[test]
    fn test_mode_accepts_short_tag() {
        let mode: EffectMode = serde_json::from_str("\"mul\"").unwrap();
        assert_eq!(mode, EffectMode::Multiply);
    }

    #[test]
    fn test_record_round_trips_through_json() {
        let r = record(EffectDuration::Countdown(4));
        let json = serde_json::to_string(&r).unwrap();
        let back: EffectRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(back, r);
    }
}

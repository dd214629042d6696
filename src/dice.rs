//! Dice expressions and their resolution.
//!
//! Supports formulas like "1d4", "d6", "2d6+3", "1d8-1" and plain integers.
//! Rolling is delegated to a `DiceResolver` so that the engine stays
//! deterministic under test.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Error when parsing a dice formula.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DiceParseError {
    #[error("empty dice formula")]
    Empty,
    #[error("invalid dice format: {0}")]
    InvalidFormat(String),
    #[error("die size must be at least 2")]
    InvalidDieSize,
}

/// A parsed dice formula: `count` dice of `sides` faces, plus `modifier`.
///
/// A formula with `count == 0` is a constant equal to its modifier.
///
/// # Examples
///
/// ```rust
/// use breathe_effects::DiceFormula;
///
/// let f: DiceFormula = "2d6+3".parse().unwrap();
/// assert_eq!((f.count, f.sides, f.modifier), (2, 6, 3));
/// assert_eq!(f.min(), 5);
/// assert_eq!(f.max(), 15);
/// assert_eq!(f.to_string(), "2d6+3");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DiceFormula {
    pub count: u32,
    pub sides: u32,
    pub modifier: i64,
}

impl DiceFormula {
    /// `count` dice of `sides` faces with no modifier.
    pub const fn dice(count: u32, sides: u32) -> Self {
        Self {
            count,
            sides,
            modifier: 0,
        }
    }

    /// A constant that rolls to `value`.
    pub const fn constant(value: i64) -> Self {
        Self {
            count: 0,
            sides: 0,
            modifier: value,
        }
    }

    /// The same dice repeated `times` (used for stacking bonuses).
    ///
    /// Saturates instead of overflowing.
    ///
    /// ```rust
    /// use breathe_effects::DiceFormula;
    ///
    /// assert_eq!(DiceFormula::dice(1, 4).repeated(3).to_string(), "3d4");
    /// assert_eq!(DiceFormula::dice(2, 4).repeated(u32::MAX).count, u32::MAX);
    /// ```
    pub fn repeated(self, times: u32) -> Self {
        Self {
            count: self.count.saturating_mul(times),
            sides: self.sides,
            modifier: self.modifier.saturating_mul(i64::from(times)),
        }
    }

    /// Lowest possible roll.
    pub fn min(&self) -> i64 {
        i64::from(self.count).saturating_add(self.modifier)
    }

    /// Highest possible roll.
    pub fn max(&self) -> i64 {
        i64::from(self.count)
            .saturating_mul(i64::from(self.sides))
            .saturating_add(self.modifier)
    }

    /// Parse a formula string.
    pub fn parse(input: &str) -> Result<Self, DiceParseError> {
        let input = input.trim().to_lowercase();
        if input.is_empty() {
            return Err(DiceParseError::Empty);
        }

        let Some(d_pos) = input.find('d') else {
            let value: i64 = input
                .replace(' ', "")
                .parse()
                .map_err(|_| DiceParseError::InvalidFormat(input.clone()))?;
            return Ok(Self::constant(value));
        };

        let count_str = input[..d_pos].trim();
        let count: u32 = if count_str.is_empty() {
            1
        } else {
            count_str.parse().map_err(|_| {
                DiceParseError::InvalidFormat(format!("invalid dice count '{}'", count_str))
            })?
        };

        let after_d: String = input[d_pos + 1..].chars().filter(|c| !c.is_whitespace()).collect();
        let (sides_str, modifier) = match after_d.find(['+', '-']) {
            Some(0) => {
                return Err(DiceParseError::InvalidFormat(format!(
                    "invalid die size '{}'",
                    after_d
                )))
            }
            Some(pos) => {
                let modifier: i64 = after_d[pos..].trim_start_matches('+').parse().map_err(|_| {
                    DiceParseError::InvalidFormat(format!("invalid modifier '{}'", &after_d[pos..]))
                })?;
                (&after_d[..pos], modifier)
            }
            None => (after_d.as_str(), 0),
        };

        let sides: u32 = sides_str.parse().map_err(|_| {
            DiceParseError::InvalidFormat(format!("invalid die size '{}'", sides_str))
        })?;
        if sides < 2 {
            return Err(DiceParseError::InvalidDieSize);
        }

        Ok(Self {
            count,
            sides,
            modifier,
        })
    }
}

impl FromStr for DiceFormula {
    type Err = DiceParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for DiceFormula {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.count == 0 {
            return write!(f, "{}", self.modifier);
        }
        write!(f, "{}d{}", self.count, self.sides)?;
        match self.modifier {
            0 => Ok(()),
            m if m > 0 => write!(f, "+{}", m),
            m => write!(f, "{}", m),
        }
    }
}

/// Resolves dice formulas to numbers.
///
/// The engine calls this at most once per effect, at application time.
/// Any `FnMut(&DiceFormula) -> i64` closure is a resolver, which keeps
/// tests free of randomness:
///
/// ```rust
/// use breathe_effects::{DiceFormula, DiceResolver};
///
/// let mut always_max = |f: &DiceFormula| f.max();
/// assert_eq!(always_max.roll(&DiceFormula::dice(1, 4)), 4);
/// ```
pub trait DiceResolver {
    fn roll(&mut self, formula: &DiceFormula) -> i64;
}

impl<F> DiceResolver for F
where
    F: FnMut(&DiceFormula) -> i64,
{
    fn roll(&mut self, formula: &DiceFormula) -> i64 {
        self(formula)
    }
}

fn roll_with<R: Rng>(rng: &mut R, formula: &DiceFormula) -> i64 {
    let mut total = formula.modifier;
    if formula.sides >= 1 {
        for _ in 0..formula.count {
            total = total.saturating_add(i64::from(rng.gen_range(1..=formula.sides)));
        }
    }
    total
}

/// Rolls with the thread-local RNG.
#[derive(Debug, Default, Clone, Copy)]
pub struct RandomDice;

impl DiceResolver for RandomDice {
    fn roll(&mut self, formula: &DiceFormula) -> i64 {
        roll_with(&mut rand::thread_rng(), formula)
    }
}

/// Rolls from a seeded RNG; the same seed replays the same results.
#[derive(Debug, Clone)]
pub struct SeededDice {
    rng: StdRng,
}

impl SeededDice {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl DiceResolver for SeededDice {
    fn roll(&mut self, formula: &DiceFormula) -> i64 {
        roll_with(&mut self.rng, formula)
    }
}

//! Engine configuration.

use crate::effect::EffectDuration;
use crate::error::EffectError;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Defaults applied to effect requests and breath specials.
///
/// Every field is optional in the serialized form.
///
/// # Examples
///
/// ```rust
/// use breathe_effects::{EffectDuration, EngineConfig};
///
/// let config = EngineConfig::from_json_str(r#"{"max_same_target_stacks": 5}"#).unwrap();
/// assert_eq!(config.max_same_target_stacks, 5);
/// assert_eq!(config.default_duration, EffectDuration::EndOfRound);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Duration given to requests that do not name one.
    pub default_duration: EffectDuration,
    /// Label given to requests that do not name one.
    pub default_label: String,
    /// Origin given to requests that do not name one.
    pub default_origin: String,
    /// Cap on same-target stacking bonuses.
    pub max_same_target_stacks: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            default_duration: EffectDuration::EndOfRound,
            default_label: "Effect".to_string(),
            default_origin: "Source".to_string(),
            max_same_target_stacks: 3,
        }
    }
}

impl EngineConfig {
    /// Parse a config; missing keys take their defaults.
    pub fn from_json_str(json: &str) -> Result<Self, EffectError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Read and parse a JSON config file.
    ///
    /// # Errors
    ///
    /// `EffectError::Config` naming the file if it cannot be read or parsed.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, EffectError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| EffectError::Config(format!("{}: {}", path.display(), e)))?;
        Self::from_json_str(&text)
    }
}

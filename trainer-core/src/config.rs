//! # Practice Configuration
//!
//! Settings read by the session controller. Free-text fields from the front
//! end are validated when read: empty, unparsable, negative, non-finite or
//! over-long values fall back to their defaults.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::fretboard::ActiveStrings;
use crate::scale::{Scale, ScaleType};
use crate::tuning::PitchClass;

/// Default settings file, written next to the working directory.
pub const SETTINGS_FILE: &str = "practice_settings.json";

/// Longest accepted delay or hold.
pub const MAX_WAIT: Duration = Duration::from_secs(3600);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PracticeConfig {
    /// Pause after a correct single note before the next prompt.
    #[serde(default = "PracticeConfig::default_practice_delay", with = "seconds")]
    pub practice_delay: Duration,
    /// How long a completed chord diagram stays on screen.
    #[serde(default = "PracticeConfig::default_diagram_hold", with = "seconds")]
    pub diagram_hold: Duration,
    #[serde(default)]
    pub scale_type: ScaleType,
    #[serde(default = "PracticeConfig::default_scale_root")]
    pub scale_root: PitchClass,
    #[serde(default)]
    pub chord_mode: bool,
    #[serde(default)]
    pub active_strings: ActiveStrings,
}

impl PracticeConfig {
    fn default_practice_delay() -> Duration {
        Duration::from_secs(2)
    }
    fn default_diagram_hold() -> Duration {
        Duration::from_secs(5)
    }
    fn default_scale_root() -> PitchClass {
        PitchClass::C
    }

    pub fn scale(&self) -> Scale {
        Scale::new(self.scale_type, self.scale_root)
    }

    /// Sets the practice delay from user text, substituting the default.
    pub fn set_practice_delay(&mut self, text: &str) {
        self.practice_delay = parse_seconds(text, Self::default_practice_delay());
    }

    /// Sets the diagram hold from user text, substituting the default.
    pub fn set_diagram_hold(&mut self, text: &str) {
        self.diagram_hold = parse_seconds(text, Self::default_diagram_hold());
    }

    /// Loads settings from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let data = fs::read_to_string(path)
            .with_context(|| format!("reading settings from {}", path.display()))?;
        serde_json::from_str(&data).with_context(|| format!("parsing {}", path.display()))
    }

    /// Saves settings as pretty-printed JSON.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json).with_context(|| format!("writing settings to {}", path.display()))
    }
}

impl Default for PracticeConfig {
    fn default() -> Self {
        Self {
            practice_delay: Self::default_practice_delay(),
            diagram_hold: Self::default_diagram_hold(),
            scale_type: ScaleType::default(),
            scale_root: Self::default_scale_root(),
            chord_mode: false,
            active_strings: ActiveStrings::all(),
        }
    }
}

/// Parses a non-negative number of seconds, at most `MAX_WAIT`.
///
/// # Arguments
/// * `text` - User input such as "2" or "0.5"
/// * `default` - Used when the input is empty or invalid
pub fn parse_seconds(text: &str, default: Duration) -> Duration {
    text.trim()
        .parse::<f64>()
        .ok()
        .and_then(checked_seconds)
        .unwrap_or(default)
}

fn checked_seconds(secs: f64) -> Option<Duration> {
    if !(0.0..=MAX_WAIT.as_secs_f64()).contains(&secs) {
        return None;
    }
    Duration::try_from_secs_f64(secs).ok()
}

/// Serializes a `Duration` as fractional seconds.
mod seconds {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(value.as_secs_f64())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(deserializer)?;
        super::checked_seconds(secs)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid duration {secs}")))
    }
}

//! Configuration types for the Wordloop study engine.
//!
//! This module provides the daily study [`Settings`] consumed by the queue
//! builder and the session state machine, plus the surrounding [`Config`]
//! loaded from `wordloop.json`.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Result, WordloopError};

/// The default config file name.
pub const CONFIG_FILE_NAME: &str = "wordloop.json";

/// Inclusive bounds for `dailyNew`.
const DAILY_NEW_RANGE: (u32, u32) = (1, 30);

/// Inclusive bounds for `reviewCap`.
const REVIEW_CAP_RANGE: (u32, u32) = (1, 100);

/// Inclusive bounds for `relapseCap`.
const RELAPSE_CAP_RANGE: (u32, u32) = (1, 20);

/// Inclusive bounds for `ttsRate`.
const TTS_RATE_RANGE: (f64, f64) = (0.5, 2.0);

fn default_user_id() -> String {
    "local".to_string()
}

fn default_store_path() -> String {
    ".wordloop/store.json".to_string()
}

fn default_output_dir() -> String {
    ".".to_string()
}

const fn default_port() -> u16 {
    3000
}

const fn default_daily_new() -> u32 {
    10
}

const fn default_review_cap() -> u32 {
    40
}

const fn default_relapse_cap() -> u32 {
    10
}

const fn default_true() -> bool {
    true
}

const fn default_tts_rate() -> f64 {
    1.0
}

/// Main configuration for Wordloop.
///
/// Identifies the learner, where their store lives, and the study settings
/// applied to every session.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Identifier of the learner whose words are studied.
    #[serde(default = "default_user_id")]
    pub user_id: String,

    /// Path to the JSON store holding catalog, word states and sessions.
    #[serde(default = "default_store_path")]
    pub store_path: String,

    /// Output directory for generated daily reports.
    #[serde(default = "default_output_dir")]
    pub output_dir: String,

    /// Port for the HTTP API server.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Daily study settings.
    #[serde(default)]
    pub settings: Settings,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            user_id: default_user_id(),
            store_path: default_store_path(),
            output_dir: default_output_dir(),
            port: default_port(),
            settings: Settings::default(),
        }
    }
}

impl Config {
    /// Loads configuration from the current working directory.
    ///
    /// Looks for `wordloop.json` in the current directory. If not found,
    /// returns the default configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but contains invalid JSON.
    pub fn load() -> Result<Self> {
        let current_dir = std::env::current_dir().map_err(|e| {
            WordloopError::config_parse(
                "<current directory>",
                format!("cannot determine current directory: {e}"),
            )
        })?;
        Self::load_from_dir(&current_dir)
    }

    /// Loads configuration from `wordloop.json` in a specific directory.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but contains invalid JSON.
    pub fn load_from_dir(dir: &Path) -> Result<Self> {
        Self::load_from_file(&dir.join(CONFIG_FILE_NAME))
    }

    /// Loads configuration from a specific file path.
    ///
    /// If the file does not exist, returns default configuration.
    ///
    /// # Errors
    ///
    /// Returns `WordloopError::ConfigParseError` if the file exists but contains
    /// invalid JSON.
    ///
    /// Returns `WordloopError::ConfigValidationError` if the configuration values
    /// are out of range.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let contents = match std::fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                let config = Self::default();
                config.validate()?;
                return Ok(config);
            }
            Err(e) => {
                return Err(WordloopError::config_parse(
                    path,
                    format!("failed to read file: {e}"),
                ));
            }
        };

        let config: Self = serde_json::from_str(&contents)
            .map_err(|e| WordloopError::config_parse(path, e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration values.
    ///
    /// # Errors
    ///
    /// Returns `WordloopError::ConfigValidationError` if any check fails.
    pub fn validate(&self) -> Result<()> {
        if self.user_id.trim().is_empty() {
            return Err(WordloopError::config_validation(
                "userId must not be empty",
                "Set userId in your wordloop.json (the default is \"local\")",
            ));
        }

        if self.store_path.trim().is_empty() {
            return Err(WordloopError::config_validation(
                "storePath must not be empty",
                "Provide a path for the JSON store in your wordloop.json",
            ));
        }

        if self.output_dir.trim().is_empty() {
            return Err(WordloopError::config_validation(
                "outputDir must not be empty",
                "Provide a valid output directory path in your wordloop.json (use '.' for current directory)",
            ));
        }

        self.settings.validate()
    }
}

/// The five daily study tunables.
///
/// Only the three caps influence the engine; the text-to-speech options are
/// carried for the surrounding application.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    /// Maximum new words introduced per day.
    #[serde(default = "default_daily_new")]
    pub daily_new: u32,

    /// Maximum due reviews per day.
    #[serde(default = "default_review_cap")]
    pub review_cap: u32,

    /// Maximum relapse words replayed per session.
    #[serde(default = "default_relapse_cap")]
    pub relapse_cap: u32,

    /// Whether words are read aloud.
    #[serde(default = "default_true")]
    pub tts_enabled: bool,

    /// Speech rate multiplier.
    #[serde(default = "default_tts_rate")]
    pub tts_rate: f64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            daily_new: default_daily_new(),
            review_cap: default_review_cap(),
            relapse_cap: default_relapse_cap(),
            tts_enabled: default_true(),
            tts_rate: default_tts_rate(),
        }
    }
}

impl Settings {
    /// Creates settings with the given caps and default speech options.
    #[must_use]
    pub fn with_caps(daily_new: u32, review_cap: u32, relapse_cap: u32) -> Self {
        Self {
            daily_new,
            review_cap,
            relapse_cap,
            ..Self::default()
        }
    }

    /// Validates the settings against their allowed ranges.
    ///
    /// # Errors
    ///
    /// Returns `WordloopError::ConfigValidationError` if a value is out of range.
    pub fn validate(&self) -> Result<()> {
        check_range("settings.dailyNew", self.daily_new, DAILY_NEW_RANGE)?;
        check_range("settings.reviewCap", self.review_cap, REVIEW_CAP_RANGE)?;
        check_range("settings.relapseCap", self.relapse_cap, RELAPSE_CAP_RANGE)?;

        let (min, max) = TTS_RATE_RANGE;
        if !(min..=max).contains(&self.tts_rate) {
            return Err(WordloopError::config_validation(
                format!("settings.ttsRate must be between {min} and {max}"),
                format!("Set settings.ttsRate to a value from {min} to {max} in your wordloop.json"),
            ));
        }

        Ok(())
    }

    /// Maximum new words as a length.
    #[must_use]
    pub const fn daily_new_limit(&self) -> usize {
        self.daily_new as usize
    }

    /// Maximum due reviews as a length.
    #[must_use]
    pub const fn review_limit(&self) -> usize {
        self.review_cap as usize
    }

    /// Maximum relapse words as a length.
    #[must_use]
    pub const fn relapse_limit(&self) -> usize {
        self.relapse_cap as usize
    }
}

fn check_range(field: &str, value: u32, (min, max): (u32, u32)) -> Result<()> {
    if (min..=max).contains(&value) {
        Ok(())
    } else {
        Err(WordloopError::config_validation(
            format!("{field} must be between {min} and {max} (got {value})"),
            format!("Set {field} to a value from {min} to {max} in your wordloop.json"),
        ))
    }
}

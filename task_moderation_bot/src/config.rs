use std::{path::Path, time::Duration};

use chrono::TimeDelta;
use serde::Deserialize;
use url::Url;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse config file: {0}")]
    Json(#[from] serde_json::Error),
}

/// Knobs of the moderation engine.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct ModerationConfig {
    /// Length of a temporary suspension.
    pub suspension_hours: i64,
    /// Content violation bans after which the next one is permanent.
    pub max_ban_counter: u32,
    /// Phone number warnings that make a ban permanent.
    pub max_warnings: u8,
    /// Score from 0 to 1 at which two submissions count as duplicates.
    pub similarity_threshold: f64,
    pub similarity_timeout_ms: u64,
    pub ocr_timeout_ms: u64,
    /// Digits in a row, give or take noise, that count as a phone number.
    pub min_phone_digits: usize,
    /// Non-digit characters tolerated between digits of a phone number.
    pub phone_max_gap: usize,
    /// Latin letters that are fine to use, case insensitive.
    pub allowed_latin: String,
}

impl Default for ModerationConfig {
    fn default() -> Self {
        ModerationConfig {
            suspension_hours: 24,
            max_ban_counter: 3,
            max_warnings: 3,
            similarity_threshold: 0.8,
            similarity_timeout_ms: 2000,
            ocr_timeout_ms: 15000,
            min_phone_digits: 5,
            phone_max_gap: 3,
            allowed_latin: String::new(),
        }
    }
}

impl ModerationConfig {
    pub fn suspension(&self) -> TimeDelta {
        TimeDelta::try_hours(self.suspension_hours).unwrap_or(TimeDelta::hours(24))
    }
    pub fn similarity_timeout(&self) -> Duration {
        Duration::from_millis(self.similarity_timeout_ms)
    }
    pub fn ocr_timeout(&self) -> Duration {
        Duration::from_millis(self.ocr_timeout_ms)
    }
}

/// Everything read from `moderation.json`.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub database_url: String,
    /// Channel that gets a line about every escalation.
    pub blocked_activity_chat_id: i64,
    /// Users that get ban notices and may edit word lists.
    pub admin_ids: Vec<u64>,
    pub ocr_url: Url,
    pub moderation: ModerationConfig,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            database_url: "sqlite:task_moderation.sqlite".to_string(),
            blocked_activity_chat_id: 0,
            admin_ids: Vec::new(),
            ocr_url: Url::parse("http://127.0.0.1:9448/ocr").expect("Default OCR URL is valid"),
            moderation: ModerationConfig::default(),
        }
    }
}

impl Config {
    /// Load the config from a JSON file. A missing file means all defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Config, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            log::warn!("{} not found, using default config", path.display());
            return Ok(Config::default());
        }
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    pub fn from_json(text: &str) -> Result<Config, ConfigError> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn is_admin(&self, user: teloxide::types::UserId) -> bool {
        self.admin_ids.contains(&user.0)
    }
}

// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application configuration loaded from environment variables.

use chrono_tz::Tz;
use std::env;
use std::str::FromStr;

/// Default search lifetime when no arrival window is known.
pub const DEFAULT_TTL_MINUTES: i64 = 150;
/// Half-width of the window built from a single arrival time.
pub const DEFAULT_TOLERANCE_MINUTES: u32 = 15;
/// Departure horizon for searches without an arrival window.
pub const LEGACY_WINDOW_MINUTES: i64 = 150;
const DEFAULT_NOTIFY_CONCURRENCY: usize = 8;
const DEFAULT_NOTIFY_TIMEOUT_SECS: u64 = 10;
const DEFAULT_REAPER_INTERVAL_SECS: u64 = 30;
const DEFAULT_TIMEZONE: &str = "Europe/Moscow";

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// Server port
    pub port: u16,
    /// Zone used to read times typed by users
    pub timezone: Tz,
    /// GCP project ID; `None` selects the in-memory store
    pub gcp_project_id: Option<String>,
    pub default_ttl_minutes: i64,
    pub tolerance_minutes: u32,
    pub legacy_window_minutes: i64,
    /// Max in-flight sends per notification batch
    pub notify_concurrency: usize,
    /// Per-recipient send deadline
    pub notify_timeout_secs: u64,
    /// In-memory reaper period
    pub reaper_interval_secs: u64,

    // --- Secrets ---
    /// Yandex Schedules API key
    pub yandex_api_key: String,
    /// Telegram bot token; `None` leaves the gateway offline
    pub telegram_bot_token: Option<String>,
}

impl Default for Config {
    /// Default config for testing only.
    fn default() -> Self {
        Self {
            port: 8080,
            timezone: chrono_tz::Europe::Moscow,
            gcp_project_id: None,
            default_ttl_minutes: DEFAULT_TTL_MINUTES,
            tolerance_minutes: DEFAULT_TOLERANCE_MINUTES,
            legacy_window_minutes: LEGACY_WINDOW_MINUTES,
            notify_concurrency: DEFAULT_NOTIFY_CONCURRENCY,
            notify_timeout_secs: DEFAULT_NOTIFY_TIMEOUT_SECS,
            reaper_interval_secs: DEFAULT_REAPER_INTERVAL_SECS,
            yandex_api_key: "test_api_key".to_string(),
            telegram_bot_token: None,
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        let tz_name = env::var("RIDE_TIMEZONE").unwrap_or_else(|_| DEFAULT_TIMEZONE.to_string());
        let timezone = Tz::from_str(&tz_name)
            .map_err(|_| ConfigError::Invalid("RIDE_TIMEZONE", tz_name.clone()))?;

        Ok(Self {
            port: parse_or("PORT", 8080)?,
            timezone,
            gcp_project_id: env::var("GCP_PROJECT_ID")
                .ok()
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty()),
            default_ttl_minutes: ensure_positive(
                "DEFAULT_TTL_MINUTES",
                parse_or("DEFAULT_TTL_MINUTES", DEFAULT_TTL_MINUTES)?,
            )?,
            tolerance_minutes: parse_or("ARRIVAL_TOLERANCE_MINUTES", DEFAULT_TOLERANCE_MINUTES)?,
            legacy_window_minutes: ensure_positive(
                "LEGACY_WINDOW_MINUTES",
                parse_or("LEGACY_WINDOW_MINUTES", LEGACY_WINDOW_MINUTES)?,
            )?,
            notify_concurrency: parse_or("NOTIFY_CONCURRENCY", DEFAULT_NOTIFY_CONCURRENCY)?
                .max(1),
            notify_timeout_secs: parse_or("NOTIFY_TIMEOUT_SECS", DEFAULT_NOTIFY_TIMEOUT_SECS)?
                .max(1),
            reaper_interval_secs: parse_or("REAPER_INTERVAL_SECS", DEFAULT_REAPER_INTERVAL_SECS)?
                .max(1),
            yandex_api_key: env::var("YANDEX_SCHEDULES_API_KEY")
                .map(|v| v.trim().to_string())
                .map_err(|_| ConfigError::Missing("YANDEX_SCHEDULES_API_KEY"))?,
            telegram_bot_token: env::var("TELEGRAM_BOT_TOKEN")
                .ok()
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty()),
        })
    }
}

/// Read an optional numeric variable, rejecting unparseable values.
fn parse_or<T: FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid(name, raw)),
        Err(_) => Ok(default),
    }
}

/// Durations in minutes must be strictly positive.
fn ensure_positive(name: &'static str, value: i64) -> Result<i64, ConfigError> {
    if value > 0 {
        Ok(value)
    } else {
        Err(ConfigError::Invalid(name, value.to_string()))
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for {0}: {1:?}")]
    Invalid(&'static str, String),
}

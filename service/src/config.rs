use std::str::FromStr;
use std::time::Duration;

use chrono_tz::Tz;
use log::warn;

use crate::error::GenericError;

pub const DEFAULT_DATAGOLF_BASE_URL: &str = "https://feeds.datagolf.com";
pub const DEFAULT_GROUPME_BASE_URL: &str = "https://api.groupme.com/v3";

/// Process-wide settings, read once from the environment (and `.env`) at start-up.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub database_url: String,
    pub datagolf_api_key: String,
    pub datagolf_base_url: String,
    pub tour: String,
    pub groupme_bot_id: Option<String>,
    pub groupme_base_url: String,
    pub admin_key: Option<String>,
    pub timezone: Tz,
    pub feed_timeout: Duration,
    pub notify_timeout: Duration,
    pub refresh_cooldown: Duration,
    pub auto_sync_after: chrono::Duration,
    pub schedule_sync_limit: usize,
}

impl Settings {
    pub fn from_env() -> Result<Self, GenericError> {
        if let Err(e) = dotenvy::dotenv() {
            warn!("No .env file loaded: {}", e);
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, GenericError> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let database_url = get("DATABASE_URL")
            .ok_or_else(|| GenericError::Config("DATABASE_URL must be set".to_string()))?;

        let datagolf_api_key = get("DATAGOLF_API_KEY").unwrap_or_else(|| {
            warn!("DATAGOLF_API_KEY is not set, feed requests will be rejected upstream");
            String::new()
        });

        let timezone = match get("LEAGUE_TIMEZONE") {
            Some(name) => Tz::from_str(&name)
                .map_err(|_| GenericError::Config(format!("Unknown LEAGUE_TIMEZONE '{name}'")))?,
            None => chrono_tz::America::New_York,
        };

        Ok(Self {
            database_url,
            datagolf_api_key,
            datagolf_base_url: get("DATAGOLF_BASE_URL")
                .unwrap_or_else(|| DEFAULT_DATAGOLF_BASE_URL.to_string()),
            tour: get("DATAGOLF_TOUR").unwrap_or_else(|| "pga".to_string()),
            groupme_bot_id: get("GROUPME_BOT_ID"),
            groupme_base_url: get("GROUPME_BASE_URL")
                .unwrap_or_else(|| DEFAULT_GROUPME_BASE_URL.to_string()),
            admin_key: get("ADMIN_KEY"),
            timezone,
            feed_timeout: Duration::from_secs(number(&get, "FEED_TIMEOUT_SECS", 30)?),
            notify_timeout: Duration::from_secs(number(&get, "NOTIFY_TIMEOUT_SECS", 10)?),
            refresh_cooldown: Duration::from_secs(number(&get, "REFRESH_COOLDOWN_SECS", 60)?),
            auto_sync_after: chrono::Duration::minutes(number(&get, "AUTO_SYNC_AFTER_MINS", 10)? as i64),
            schedule_sync_limit: number(&get, "SCHEDULE_SYNC_LIMIT", 10)? as usize,
        })
    }
}

fn number(
    get: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: u64,
) -> Result<u64, GenericError> {
    match get(key) {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| GenericError::Config(format!("{key} must be a whole number, got '{raw}'"))),
    }
}

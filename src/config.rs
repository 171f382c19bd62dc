//! Process configuration, read from the environment (after `.env` is loaded).

use std::env;
use std::time::Duration;

use crate::services::coingecko::ApiTier;

const ENV_DATABASE_URL: &str = "DATABASE_URL";
const ENV_PORT: &str = "PORT";
const ENV_COINGECKO_BASE_URL: &str = "COINGECKO_BASE_URL";
const ENV_COINGECKO_API_KEY: &str = "COINGECKO_API_KEY";
const ENV_COINGECKO_API_TIER: &str = "COINGECKO_API_TIER";
const ENV_COINGECKO_TIMEOUT: &str = "COINGECKO_TIMEOUT_SECS";
const ENV_REFRESH_INTERVAL: &str = "PRICE_REFRESH_INTERVAL_SECS";
const ENV_RETENTION_HOURS: &str = "HISTORY_RETENTION_HOURS";

pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_COINGECKO_BASE_URL: &str = "https://api.coingecko.com/api/v3";
pub const DEFAULT_COINGECKO_TIMEOUT_SECS: u64 = 30;
/// Every 2 hours
pub const DEFAULT_REFRESH_INTERVAL_SECS: u64 = 7200;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub database_url: String,
    pub port: u16,

    pub coingecko_base_url: String,
    pub coingecko_api_key: Option<String>,
    pub coingecko_api_tier: ApiTier,
    pub coingecko_timeout: Duration,

    /// Scheduler period. Also drives the "try again after" estimate.
    pub refresh_interval: Duration,

    /// History older than this is swept after each successful refresh.
    /// `None` keeps history forever.
    pub history_retention: Option<chrono::Duration>,
}

#[derive(Debug)]
pub struct ConfigError(String);

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Invalid config: {}", self.0)
    }
}

impl std::error::Error for ConfigError {}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the config from an arbitrary key lookup (env in production, maps in tests)
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let database_url = lookup(ENV_DATABASE_URL)
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| ConfigError(format!("{} must be set", ENV_DATABASE_URL)))?;

        let coingecko_api_tier = match lookup(ENV_COINGECKO_API_TIER) {
            Some(raw) => raw.parse().map_err(ConfigError)?,
            None => ApiTier::Demo,
        };

        let history_retention = parse_or_warn::<i64>(&lookup, ENV_RETENTION_HOURS)
            .filter(|hours| *hours > 0)
            .map(chrono::Duration::hours);

        Ok(Self {
            database_url,
            port: parse_or_warn(&lookup, ENV_PORT).unwrap_or(DEFAULT_PORT),
            coingecko_base_url: lookup(ENV_COINGECKO_BASE_URL)
                .unwrap_or_else(|| DEFAULT_COINGECKO_BASE_URL.to_string()),
            coingecko_api_key: lookup(ENV_COINGECKO_API_KEY).filter(|k| !k.is_empty()),
            coingecko_api_tier,
            coingecko_timeout: Duration::from_secs(
                parse_or_warn(&lookup, ENV_COINGECKO_TIMEOUT)
                    .unwrap_or(DEFAULT_COINGECKO_TIMEOUT_SECS),
            ),
            refresh_interval: Duration::from_secs(
                parse_or_warn(&lookup, ENV_REFRESH_INTERVAL)
                    .filter(|secs| *secs > 0)
                    .unwrap_or(DEFAULT_REFRESH_INTERVAL_SECS),
            ),
            history_retention,
        })
    }
}

fn parse_or_warn<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
) -> Option<T> {
    let raw = lookup(key)?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::warn!(key = key, value = %raw, "Ignoring unparsable config value, using default");
            None
        }
    }
}

//! Configuration management

use anyhow::Result;
use std::path::PathBuf;

use crate::store::system_keys;

pub const DEFAULT_TWITTER_API_BASE: &str = "https://api.twitter.com";
pub const DEFAULT_MORALIS_API_BASE: &str = "https://deep-index.moralis.io/api/v2.2";
pub const DEFAULT_SOLANA_API_BASE: &str = "https://solana-gateway.moralis.io";
pub const DEFAULT_CDP_API_BASE: &str = "https://api.cdp.coinbase.com/platform";

/// Process configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// SQLite database path for the skill store
    pub db_path: PathBuf,

    /// Timeout for every outbound provider call
    pub http_timeout_secs: u64,

    /// Maximum cached provider clients across all agents
    pub client_cache_capacity: u64,

    pub twitter_api_base: String,
    pub moralis_api_base: String,
    pub solana_api_base: String,
    pub cdp_api_base: String,

    /// Platform CDP credentials, seeded into the store's system config
    pub cdp_api_key_name: Option<String>,
    pub cdp_api_key_private_key: Option<String>,
    pub cdp_api_base_url: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            http_timeout_secs: 30,
            client_cache_capacity: 10_000,
            twitter_api_base: DEFAULT_TWITTER_API_BASE.to_string(),
            moralis_api_base: DEFAULT_MORALIS_API_BASE.to_string(),
            solana_api_base: DEFAULT_SOLANA_API_BASE.to_string(),
            cdp_api_base: DEFAULT_CDP_API_BASE.to_string(),
            cdp_api_key_name: None,
            cdp_api_key_private_key: None,
            cdp_api_base_url: None,
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from any key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let db_path = non_empty("SKILLGATE_DB_PATH")
            .map(PathBuf::from)
            .unwrap_or(defaults.db_path);

        let http_timeout_secs = non_empty("SKILLGATE_HTTP_TIMEOUT_SECS")
            .and_then(|v| v.parse().ok())
            .filter(|secs| *secs > 0)
            .unwrap_or(defaults.http_timeout_secs);

        let client_cache_capacity = non_empty("SKILLGATE_CLIENT_CACHE_CAPACITY")
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults.client_cache_capacity);

        Ok(Self {
            db_path,
            http_timeout_secs,
            client_cache_capacity,
            twitter_api_base: non_empty("SKILLGATE_TWITTER_API_BASE")
                .unwrap_or(defaults.twitter_api_base),
            moralis_api_base: non_empty("SKILLGATE_MORALIS_API_BASE")
                .unwrap_or(defaults.moralis_api_base),
            solana_api_base: non_empty("SKILLGATE_SOLANA_API_BASE")
                .unwrap_or(defaults.solana_api_base),
            cdp_api_base: defaults.cdp_api_base,
            cdp_api_key_name: non_empty("CDP_API_KEY_NAME"),
            cdp_api_key_private_key: non_empty("CDP_API_KEY_PRIVATE_KEY"),
            cdp_api_base_url: non_empty("CDP_API_BASE_URL"),
        })
    }

    /// System-config entries to write into the skill store
    pub fn system_config_seed(&self) -> Vec<(&'static str, String)> {
        [
            (system_keys::CDP_API_KEY_NAME, &self.cdp_api_key_name),
            (system_keys::CDP_API_KEY_PRIVATE_KEY, &self.cdp_api_key_private_key),
            (system_keys::CDP_API_BASE_URL, &self.cdp_api_base_url),
        ]
        .into_iter()
        .filter_map(|(key, value)| value.clone().map(|v| (key, v)))
        .collect()
    }
}

fn default_db_path() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("skillgate")
        .join("skills.db")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = Config::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.http_timeout_secs, 30);
        assert_eq!(config.client_cache_capacity, 10_000);
        assert!(config.db_path.ends_with("skillgate/skills.db"));
        assert_eq!(config.moralis_api_base, DEFAULT_MORALIS_API_BASE);
        assert!(config.system_config_seed().is_empty());
    }

    #[test]
    fn test_overrides() {
        let config = Config::from_lookup(lookup(&[
            ("SKILLGATE_DB_PATH", "/tmp/skills.db"),
            ("SKILLGATE_HTTP_TIMEOUT_SECS", "5"),
            ("SKILLGATE_CLIENT_CACHE_CAPACITY", "12"),
            ("SKILLGATE_TWITTER_API_BASE", "http://localhost:9000"),
            ("CDP_API_KEY_NAME", "org/key"),
            ("CDP_API_KEY_PRIVATE_KEY", "secret"),
        ]))
        .unwrap();
        assert_eq!(config.db_path, PathBuf::from("/tmp/skills.db"));
        assert_eq!(config.http_timeout_secs, 5);
        assert_eq!(config.client_cache_capacity, 12);
        assert_eq!(config.twitter_api_base, "http://localhost:9000");

        let seed = config.system_config_seed();
        assert_eq!(seed.len(), 2);
        assert_eq!(seed[0], (system_keys::CDP_API_KEY_NAME, "org/key".to_string()));
    }

    #[test]
    fn test_bad_numbers_fall_back() {
        let config = Config::from_lookup(lookup(&[
            ("SKILLGATE_HTTP_TIMEOUT_SECS", "soon"),
            ("SKILLGATE_CLIENT_CACHE_CAPACITY", ""),
        ]))
        .unwrap();
        assert_eq!(config.http_timeout_secs, 30);
        assert_eq!(config.client_cache_capacity, 10_000);
    }
}

//! Shared HTTP plumbing for provider clients.

use reqwest::Response;
use serde_json::Value;
use std::time::Duration;

use crate::config::Config;
use crate::error::{Result, SkillError};

/// Largest upstream error body kept in error messages
const MAX_ERROR_BODY: usize = 500;

/// One pooled HTTP client plus provider base URLs
#[derive(Clone)]
pub struct HttpSettings {
    pub client: reqwest::Client,
    pub twitter_api_base: String,
    pub moralis_api_base: String,
    pub solana_api_base: String,
    pub cdp_api_base: String,
}

impl HttpSettings {
    pub fn from_config(config: &Config) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.http_timeout_secs))
            .user_agent(concat!("skillgate/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| SkillError::Internal(format!("HTTP client: {}", e)))?;

        Ok(Self {
            client,
            twitter_api_base: config.twitter_api_base.clone(),
            moralis_api_base: config.moralis_api_base.clone(),
            solana_api_base: config.solana_api_base.clone(),
            cdp_api_base: config.cdp_api_base.clone(),
        })
    }
}

/// Join a base URL and a path without doubling slashes
pub fn endpoint(base: &str, path: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), path.trim_start_matches('/'))
}

/// Decode a JSON response, turning non-2xx into `SkillError::Upstream`
pub async fn read_json(response: Response) -> Result<Value> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        let message: String = body.chars().take(MAX_ERROR_BODY).collect();
        return Err(SkillError::Upstream {
            status: status.as_u16(),
            message: if message.is_empty() {
                status.canonical_reason().unwrap_or("request failed").to_string()
            } else {
                message
            },
        });
    }

    response.json::<Value>().await.map_err(|e| SkillError::Upstream {
        status: status.as_u16(),
        message: format!("malformed response: {}", e),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_join() {
        assert_eq!(endpoint("https://api.x.com/", "/2/tweets"), "https://api.x.com/2/tweets");
        assert_eq!(endpoint("https://api.x.com", "2/tweets"), "https://api.x.com/2/tweets");
    }

    #[test]
    fn test_settings_from_default_config() {
        let config = Config::default();
        let settings = HttpSettings::from_config(&config).unwrap();
        assert_eq!(settings.twitter_api_base, config.twitter_api_base);
        assert!(settings.twitter_api_base.starts_with("https://"));
    }
}

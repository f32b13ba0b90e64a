//! Agent records consumed by the skill layer
//!
//! `AgentConfig` is operator-owned and read-only here. `AgentData` is the
//! runtime record that clients update (linked Twitter identity, wallet data).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

use crate::error::{Result, SkillError};
use crate::skills::{FeatureFlags, SkillConfig};

/// Default CDP network when the agent does not pin one
pub const DEFAULT_CDP_NETWORK: &str = "base-sepolia";

/// Operator-managed agent configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AgentConfig {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub cdp_network_id: Option<String>,
    /// Skill configuration by category (`twitter`, `cdp`, `portfolio`, ...)
    #[serde(default)]
    pub skills: BTreeMap<String, SkillConfig>,
}

impl AgentConfig {
    pub fn new(id: &str) -> Self {
        Self {
            id: id.to_string(),
            ..Default::default()
        }
    }

    pub fn with_skills(mut self, category: &str, config: SkillConfig) -> Self {
        self.skills.insert(category.to_string(), config);
        self
    }

    /// Load an agent definition from a TOML file
    pub fn from_toml_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| SkillError::Internal(format!("read {}: {}", path.display(), e)))?;
        Self::from_toml_str(&raw)
    }

    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let config: AgentConfig = toml::from_str(raw)
            .map_err(|e| SkillError::Internal(format!("invalid agent definition: {}", e)))?;
        if config.id.trim().is_empty() {
            return Err(SkillError::Internal("agent definition has an empty id".into()));
        }
        Ok(config)
    }

    pub fn cdp_network(&self) -> &str {
        self.cdp_network_id.as_deref().unwrap_or(DEFAULT_CDP_NETWORK)
    }
}

/// Runtime agent record persisted in the skill store
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AgentData {
    pub twitter_id: Option<String>,
    pub twitter_username: Option<String>,
    pub twitter_name: Option<String>,
    pub twitter_access_token: Option<String>,
    pub twitter_access_token_expires_at: Option<DateTime<Utc>>,
    pub twitter_refresh_token: Option<String>,
    /// Serialized CDP wallet export
    pub cdp_wallet_data: Option<String>,
}

impl AgentData {
    /// Apply a patch; only `Some` fields overwrite
    pub fn apply(&mut self, patch: AgentDataPatch) {
        let AgentDataPatch {
            twitter_id,
            twitter_username,
            twitter_name,
            twitter_access_token,
            twitter_access_token_expires_at,
            twitter_refresh_token,
            cdp_wallet_data,
        } = patch;

        if let Some(v) = twitter_id {
            self.twitter_id = v;
        }
        if let Some(v) = twitter_username {
            self.twitter_username = v;
        }
        if let Some(v) = twitter_name {
            self.twitter_name = v;
        }
        if let Some(v) = twitter_access_token {
            self.twitter_access_token = v;
        }
        if let Some(v) = twitter_access_token_expires_at {
            self.twitter_access_token_expires_at = v;
        }
        if let Some(v) = twitter_refresh_token {
            self.twitter_refresh_token = v;
        }
        if let Some(v) = cdp_wallet_data {
            self.cdp_wallet_data = v;
        }
    }
}

/// Partial update to `AgentData`
///
/// Outer `None` leaves the field untouched; `Some(None)` clears it.
#[derive(Debug, Clone, Default)]
pub struct AgentDataPatch {
    pub twitter_id: Option<Option<String>>,
    pub twitter_username: Option<Option<String>>,
    pub twitter_name: Option<Option<String>>,
    pub twitter_access_token: Option<Option<String>>,
    pub twitter_access_token_expires_at: Option<Option<DateTime<Utc>>>,
    pub twitter_refresh_token: Option<Option<String>>,
    pub cdp_wallet_data: Option<Option<String>>,
}

impl AgentDataPatch {
    pub fn twitter_identity(id: &str, username: &str, name: &str) -> Self {
        Self {
            twitter_id: Some(Some(id.to_string())),
            twitter_username: Some(Some(username.to_string())),
            twitter_name: Some(Some(name.to_string())),
            ..Default::default()
        }
    }

    pub fn twitter_tokens(
        access_token: &str,
        refresh_token: Option<&str>,
        expires_at: DateTime<Utc>,
    ) -> Self {
        Self {
            twitter_access_token: Some(Some(access_token.to_string())),
            twitter_access_token_expires_at: Some(Some(expires_at)),
            twitter_refresh_token: Some(refresh_token.map(str::to_string)),
            ..Default::default()
        }
    }

    /// Clears every Twitter field (account unlinked)
    pub fn unlink_twitter() -> Self {
        Self {
            twitter_id: Some(None),
            twitter_username: Some(None),
            twitter_name: Some(None),
            twitter_access_token: Some(None),
            twitter_access_token_expires_at: Some(None),
            twitter_refresh_token: Some(None),
            cdp_wallet_data: None,
        }
    }

    pub fn wallet(data: &str) -> Self {
        Self {
            cdp_wallet_data: Some(Some(data.to_string())),
            ..Default::default()
        }
    }
}

/// Where the inbound message came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Entrypoint {
    #[default]
    Web,
    Twitter,
    Telegram,
    Trigger,
}

/// Per-message request context
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    pub user_id: Option<String>,
    pub entrypoint: Entrypoint,
    /// Caller may use `private` skills (agent owner, trusted trigger)
    pub privileged: bool,
    pub feature_flags: FeatureFlags,
}

impl RequestContext {
    pub fn public() -> Self {
        Self::default()
    }

    pub fn privileged() -> Self {
        Self {
            privileged: true,
            ..Default::default()
        }
    }

    pub fn with_flag(mut self, flag: &str, enabled: bool) -> Self {
        self.feature_flags.insert(flag.to_string(), enabled);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::skills::SkillState;

    #[test]
    fn test_patch_only_overwrites_some_fields() {
        let mut data = AgentData {
            twitter_id: Some("1".into()),
            cdp_wallet_data: Some("{}".into()),
            ..Default::default()
        };

        data.apply(AgentDataPatch::twitter_identity("42", "bot", "Bot"));
        assert_eq!(data.twitter_id.as_deref(), Some("42"));
        assert_eq!(data.twitter_username.as_deref(), Some("bot"));
        assert_eq!(data.cdp_wallet_data.as_deref(), Some("{}"));

        data.apply(AgentDataPatch::unlink_twitter());
        assert!(data.twitter_id.is_none());
        assert!(data.twitter_username.is_none());
        assert_eq!(data.cdp_wallet_data.as_deref(), Some("{}"));
    }

    #[test]
    fn test_agent_from_toml() {
        let raw = r#"
            id = "agent-7"
            cdp_network_id = "base-mainnet"

            [skills.common]
            states = { current_time = "public" }

            [skills.portfolio]
            api_key = "moralis-key"
            rate_limit_number = 10
            rate_limit_minutes = 1
            supported_chains = { evm = true, solana = false }
            states = { fetch_wallet_portfolio = "public", fetch_solana_portfolio = "private" }
        "#;

        let agent = AgentConfig::from_toml_str(raw).unwrap();
        assert_eq!(agent.id, "agent-7");
        assert_eq!(agent.cdp_network(), "base-mainnet");

        let portfolio = &agent.skills["portfolio"];
        assert_eq!(portfolio.api_key.as_deref(), Some("moralis-key"));
        assert_eq!(portfolio.supported_chains.get("solana"), Some(&false));
        assert_eq!(
            portfolio.states.get("fetch_solana_portfolio"),
            Some(SkillState::Private)
        );
    }

    #[test]
    fn test_agent_requires_id() {
        assert!(AgentConfig::from_toml_str("id = \"  \"").is_err());
        assert_eq!(AgentConfig::new("a").cdp_network(), DEFAULT_CDP_NETWORK);
    }
}

//! CDP wallet client
//!
//! Built from platform API credentials (system config), the agent's network
//! and the agent's exported wallet data. Missing wallet data is a
//! credential error the end user can act on (create or import a wallet).

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tracing::info;

use super::ProviderClient;
use crate::error::{Result, SkillError};
use crate::http::{endpoint, read_json, HttpSettings};
use crate::store::{system_keys, SkillStore};

/// Skill category served by this client
pub const CATEGORY: &str = "cdp";

/// Exported wallet data stored in `AgentData.cdp_wallet_data`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WalletData {
    pub wallet_id: String,
    pub default_address_id: String,
    #[serde(default)]
    pub network_id: Option<String>,
}

impl WalletData {
    pub fn parse(raw: &str) -> Result<Self> {
        serde_json::from_str(raw)
            .map_err(|e| SkillError::credential(format!("CDP wallet data is malformed: {}", e)))
    }
}

pub struct WalletClient {
    agent_id: String,
    network_id: String,
    wallet: WalletData,
    api_key_name: String,
    api_key_private_key: String,
    base_url: String,
    http: reqwest::Client,
}

impl std::fmt::Debug for WalletClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WalletClient")
            .field("agent_id", &self.agent_id)
            .field("network_id", &self.network_id)
            .field("wallet", &self.wallet)
            .field("api_key_name", &self.api_key_name)
            .finish_non_exhaustive()
    }
}

impl WalletClient {
    pub async fn connect(
        agent_id: &str,
        network_id: &str,
        store: Arc<dyn SkillStore>,
        http: &HttpSettings,
    ) -> Result<Self> {
        let api_key_name = required_system_config(&store, system_keys::CDP_API_KEY_NAME).await?;
        let api_key_private_key =
            required_system_config(&store, system_keys::CDP_API_KEY_PRIVATE_KEY).await?;
        let base_url = store
            .get_system_config(system_keys::CDP_API_BASE_URL)
            .await?
            .unwrap_or_else(|| http.cdp_api_base.clone());

        let data = store.get_agent_data(agent_id).await?;
        let raw = data
            .cdp_wallet_data
            .filter(|d| !d.trim().is_empty())
            .ok_or_else(|| {
                SkillError::credential(format!("[{}] CDP wallet data not found", agent_id))
            })?;
        let wallet = WalletData::parse(&raw)?;

        // Wallet exported on a different network than the agent now targets
        if let Some(wallet_network) = &wallet.network_id {
            if wallet_network != network_id {
                return Err(SkillError::credential(format!(
                    "[{}] CDP wallet belongs to network {}, agent is configured for {}",
                    agent_id, wallet_network, network_id
                )));
            }
        }

        info!(
            "CDP wallet client initialized for agent {} on {} ({})",
            agent_id, network_id, wallet.default_address_id
        );

        Ok(Self {
            agent_id: agent_id.to_string(),
            network_id: network_id.to_string(),
            wallet,
            api_key_name,
            api_key_private_key,
            base_url,
            http: http.client.clone(),
        })
    }

    pub fn address(&self) -> &str {
        &self.wallet.default_address_id
    }

    pub fn network(&self) -> &str {
        &self.network_id
    }

    pub fn wallet(&self) -> &WalletData {
        &self.wallet
    }

    /// Balance of one asset at the default address
    pub async fn get_balance(&self, asset_id: &str) -> Result<Value> {
        let path = format!(
            "/v1/networks/{}/addresses/{}/balances/{}",
            self.network_id,
            self.address(),
            asset_id
        );
        self.get(&path).await
    }

    /// All balances at the default address
    pub async fn list_balances(&self) -> Result<Value> {
        let path = format!(
            "/v1/networks/{}/addresses/{}/balances",
            self.network_id,
            self.address()
        );
        self.get(&path).await
    }

    async fn get(&self, path: &str) -> Result<Value> {
        let response = self
            .http
            .get(endpoint(&self.base_url, path))
            .bearer_auth(&self.api_key_private_key)
            .header("X-Api-Key-Name", &self.api_key_name)
            .send()
            .await?;
        read_json(response).await
    }
}

impl ProviderClient for WalletClient {}

async fn required_system_config(store: &Arc<dyn SkillStore>, key: &str) -> Result<String> {
    store
        .get_system_config(key)
        .await?
        .filter(|v| !v.is_empty())
        .ok_or_else(|| SkillError::Internal(format!("system config '{}' is not set", key)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::AgentDataPatch;
    use crate::config::Config;
    use crate::store::MemorySkillStore;

    const WALLET: &str = r#"{"wallet_id":"w-1","default_address_id":"0xabc","network_id":"base-sepolia"}"#;

    async fn store_with_keys() -> Arc<MemorySkillStore> {
        let store = Arc::new(MemorySkillStore::new());
        store.set_system_config(system_keys::CDP_API_KEY_NAME, "org/key").await;
        store.set_system_config(system_keys::CDP_API_KEY_PRIVATE_KEY, "secret").await;
        store
    }

    fn http() -> HttpSettings {
        HttpSettings::from_config(&Config::default()).unwrap()
    }

    #[tokio::test]
    async fn test_connect_with_wallet_data() {
        let store = store_with_keys().await;
        store.set_agent_data("a1", AgentDataPatch::wallet(WALLET)).await.unwrap();

        let client = WalletClient::connect("a1", "base-sepolia", store, &http()).await.unwrap();
        assert_eq!(client.address(), "0xabc");
        assert_eq!(client.network(), "base-sepolia");
        assert_eq!(client.wallet().wallet_id, "w-1");
    }

    #[tokio::test]
    async fn test_missing_wallet_data_is_credential_error() {
        let store = store_with_keys().await;
        let result = WalletClient::connect("a1", "base-sepolia", store, &http()).await;
        assert!(matches!(result, Err(SkillError::Credential(ref m)) if m.contains("wallet data not found")));
    }

    #[tokio::test]
    async fn test_network_mismatch_is_rejected() {
        let store = store_with_keys().await;
        store.set_agent_data("a1", AgentDataPatch::wallet(WALLET)).await.unwrap();
        let result = WalletClient::connect("a1", "base-mainnet", store, &http()).await;
        assert!(matches!(result, Err(SkillError::Credential(_))));
    }

    #[tokio::test]
    async fn test_missing_platform_keys_is_operator_error() {
        let store = Arc::new(MemorySkillStore::new());
        store.set_agent_data("a1", AgentDataPatch::wallet(WALLET)).await.unwrap();
        let result = WalletClient::connect("a1", "base-sepolia", store, &http()).await;
        let err = result.unwrap_err();
        assert!(!err.is_user_facing());
    }
}

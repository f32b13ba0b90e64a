//! Moralis portfolio provider (EVM deep-index + Solana gateway)

use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

use super::{Chain, HistoryQuery, PortfolioProvider};
use crate::error::{Result, SkillError};
use crate::http::{endpoint, read_json, HttpSettings};

pub struct MoralisProvider {
    api_key: String,
    http: reqwest::Client,
    evm_base: String,
    solana_base: String,
}

impl MoralisProvider {
    pub fn new(api_key: &str, http: &HttpSettings) -> Self {
        Self {
            api_key: api_key.to_string(),
            http: http.client.clone(),
            evm_base: http.moralis_api_base.clone(),
            solana_base: http.solana_api_base.clone(),
        }
    }

    async fn get(&self, url: String, params: &[(&str, String)]) -> Result<Value> {
        debug!("Moralis GET {}", url);
        let response = self
            .http
            .get(&url)
            .header("X-API-Key", &self.api_key)
            .query(params)
            .send()
            .await?;
        read_json(response).await
    }

    fn evm_url(&self, path: &str) -> String {
        endpoint(&self.evm_base, path)
    }

    fn solana_url(&self, network: &str, address: &str, resource: &str) -> String {
        endpoint(
            &self.solana_base,
            &format!("/account/{}/{}/{}", network, address, resource),
        )
    }
}

#[async_trait]
impl PortfolioProvider for MoralisProvider {
    fn name(&self) -> &str {
        "moralis"
    }

    async fn fetch_balances(&self, address: &str, chain: &Chain) -> Result<Value> {
        match chain {
            Chain::Evm(name) => {
                let url = self.evm_url(&format!("/wallets/{}/tokens", address));
                self.get(url, &[("chain", name.clone())]).await
            }
            Chain::Solana(network) => {
                self.get(self.solana_url(network, address, "portfolio"), &[])
                    .await
            }
        }
    }

    async fn fetch_nft_data(&self, address: &str, chain: &Chain) -> Result<Value> {
        match chain {
            Chain::Evm(name) => {
                let url = self.evm_url(&format!("/{}/nft", address));
                let params = [
                    ("chain", name.clone()),
                    ("normalizeMetadata", "true".to_string()),
                ];
                self.get(url, &params).await
            }
            Chain::Solana(network) => self.get(self.solana_url(network, address, "nft"), &[]).await,
        }
    }

    async fn fetch_tx_history(
        &self,
        address: &str,
        chain: &Chain,
        query: &HistoryQuery,
    ) -> Result<Value> {
        let Chain::Evm(name) = chain else {
            return Err(SkillError::invalid_input(
                "transaction history is only available for EVM chains",
            ));
        };

        let mut params = vec![("chain", name.clone()), ("limit", query.limit.to_string())];
        if let Some(cursor) = &query.cursor {
            params.push(("cursor", cursor.clone()));
        }
        let url = self.evm_url(&format!("/wallets/{}/history", address));
        self.get(url, &params).await
    }
}

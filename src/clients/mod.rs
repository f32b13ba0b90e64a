//! Provider Clients
//!
//! Stateful per-agent clients and the cache that owns them.
//!
//! # Architecture
//!
//! ```text
//! Tool::run ──► ClientHandle::get ──► ClientCache::get_or_create ──► factory
//!                                         │  (per-key serialized)       │
//!                                         └── memoized Arc<C> ◄─────────┘
//! ```
//!
//! Tools never construct clients themselves; they hold a `ClientHandle` and
//! ask it for the current client on every invocation, so rotated or expired
//! credentials are picked up without rebuilding the tool list. Each handle
//! carries a fingerprint of the config-side credential inputs; a cached
//! client built from different inputs is rebuilt.

pub mod cache;
pub mod oauth1;
pub mod twitter;
pub mod wallet;

pub use cache::{ClientCache, ClientCacheStats};
pub use oauth1::OAuth1Credentials;
pub use twitter::{TwitterAuth, TwitterClient, TwitterUser};
pub use wallet::{WalletClient, WalletData};

use chrono::{DateTime, Utc};
use futures_util::future::BoxFuture;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

use crate::agent::AgentConfig;
use crate::error::Result;
use crate::http::HttpSettings;
use crate::providers::{MoralisProvider, PortfolioProvider};
use crate::store::SkillStore;

/// Kinds of cached provider clients
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Provider {
    Twitter,
    CdpWallet,
}

impl Provider {
    pub const ALL: [Provider; 2] = [Provider::Twitter, Provider::CdpWallet];

    pub fn as_str(&self) -> &'static str {
        match self {
            Provider::Twitter => "twitter",
            Provider::CdpWallet => "cdp_wallet",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A client the cache can hold
pub trait ProviderClient: Send + Sync + 'static {
    /// When the client's credentials stop being valid; `None` never expires
    fn expires_at(&self) -> Option<DateTime<Utc>> {
        None
    }
}

/// Builds a fresh client, re-reading credentials from the store
pub type ClientFactory<C> = Arc<dyn Fn() -> BoxFuture<'static, Result<C>> + Send + Sync>;

/// Lazy, cache-backed access to one agent's client
pub struct ClientHandle<C> {
    cache: Arc<ClientCache>,
    agent_id: String,
    provider: Provider,
    fingerprint: String,
    factory: ClientFactory<C>,
}

impl<C> Clone for ClientHandle<C> {
    fn clone(&self) -> Self {
        Self {
            cache: self.cache.clone(),
            agent_id: self.agent_id.clone(),
            provider: self.provider,
            fingerprint: self.fingerprint.clone(),
            factory: self.factory.clone(),
        }
    }
}

impl<C: ProviderClient> ClientHandle<C> {
    pub fn new(
        cache: Arc<ClientCache>,
        agent_id: &str,
        provider: Provider,
        fingerprint: String,
        factory: ClientFactory<C>,
    ) -> Self {
        Self {
            cache,
            agent_id: agent_id.to_string(),
            provider,
            fingerprint,
            factory,
        }
    }

    /// Current client, built on first use and re-validated on every call
    pub async fn get(&self) -> Result<Arc<C>> {
        let factory = self.factory.clone();
        self.cache
            .get_or_create(&self.agent_id, self.provider, &self.fingerprint, move || {
                factory()
            })
            .await
    }

    pub async fn invalidate(&self) {
        self.cache.invalidate(&self.agent_id, self.provider).await;
    }

    pub fn provider(&self) -> Provider {
        self.provider
    }

    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }
}

/// Clients available to one agent's tools
#[derive(Clone, Default)]
pub struct ClientBundle {
    pub twitter: Option<ClientHandle<TwitterClient>>,
    pub wallet: Option<ClientHandle<WalletClient>>,
    pub portfolio: Option<Arc<dyn PortfolioProvider>>,
}

impl ClientBundle {
    /// Wire handles for every provider category the agent configures
    pub fn for_agent(
        agent: &AgentConfig,
        cache: &Arc<ClientCache>,
        store: &Arc<dyn SkillStore>,
        http: &HttpSettings,
    ) -> Self {
        let mut bundle = ClientBundle::default();

        if let Some(config) = agent.skills.get(twitter::CATEGORY) {
            let keys = twitter::app_keys(config);
            let fingerprint = twitter::fingerprint(keys.as_ref());
            let factory: ClientFactory<TwitterClient> = {
                let agent_id = agent.id.clone();
                let store = store.clone();
                let http = http.clone();
                Arc::new(move || -> BoxFuture<'static, Result<TwitterClient>> {
                    let agent_id = agent_id.clone();
                    let store = store.clone();
                    let http = http.clone();
                    let keys = keys.clone();
                    Box::pin(async move {
                        TwitterClient::connect(&agent_id, store, &http, keys.as_ref()).await
                    })
                })
            };
            bundle.twitter = Some(ClientHandle::new(
                cache.clone(),
                &agent.id,
                Provider::Twitter,
                fingerprint,
                factory,
            ));
        }

        if agent.skills.contains_key(wallet::CATEGORY) {
            let factory: ClientFactory<WalletClient> = {
                let agent_id = agent.id.clone();
                let network = agent.cdp_network().to_string();
                let store = store.clone();
                let http = http.clone();
                Arc::new(move || -> BoxFuture<'static, Result<WalletClient>> {
                    let agent_id = agent_id.clone();
                    let network = network.clone();
                    let store = store.clone();
                    let http = http.clone();
                    Box::pin(async move {
                        WalletClient::connect(&agent_id, &network, store, &http).await
                    })
                })
            };
            // Wallet data rotation invalidates explicitly; the network is config
            bundle.wallet = Some(ClientHandle::new(
                cache.clone(),
                &agent.id,
                Provider::CdpWallet,
                agent.cdp_network().to_string(),
                factory,
            ));
        }

        if let Some(config) = agent.skills.get(crate::providers::CATEGORY) {
            if let Some(key) = config.api_key.as_deref().filter(|k| !k.is_empty()) {
                bundle.portfolio = Some(Arc::new(MoralisProvider::new(key, http)));
            }
        }

        bundle
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::SystemClock;
    use crate::config::Config;
    use crate::skills::{SkillConfig, SkillState};
    use crate::store::MemorySkillStore;

    #[test]
    fn test_bundle_only_wires_configured_categories() {
        let cache = Arc::new(ClientCache::new(10, Arc::new(SystemClock)));
        let store: Arc<dyn SkillStore> = Arc::new(MemorySkillStore::new());
        let http = HttpSettings::from_config(&Config::default()).unwrap();

        let agent = AgentConfig::new("a1").with_skills(
            "twitter",
            SkillConfig::default().with_state("twitter_post_tweet", SkillState::Public),
        );
        let bundle = ClientBundle::for_agent(&agent, &cache, &store, &http);
        assert!(bundle.twitter.is_some());
        assert!(bundle.wallet.is_none());
        assert!(bundle.portfolio.is_none());

        // Portfolio needs an API key
        let agent = AgentConfig::new("a1")
            .with_skills("portfolio", SkillConfig::default())
            .with_skills("cdp", SkillConfig::default());
        let bundle = ClientBundle::for_agent(&agent, &cache, &store, &http);
        assert!(bundle.portfolio.is_none());
        assert_eq!(bundle.wallet.as_ref().map(|h| h.provider()), Some(Provider::CdpWallet));

        let agent = AgentConfig::new("a1")
            .with_skills("portfolio", SkillConfig::default().with_api_key("k"));
        let bundle = ClientBundle::for_agent(&agent, &cache, &store, &http);
        assert!(bundle.portfolio.is_some());
    }

    #[test]
    fn test_twitter_fingerprint_follows_config() {
        let cache = Arc::new(ClientCache::new(10, Arc::new(SystemClock)));
        let store: Arc<dyn SkillStore> = Arc::new(MemorySkillStore::new());
        let http = HttpSettings::from_config(&Config::default()).unwrap();
        let fingerprint_of = |config: SkillConfig| {
            let agent = AgentConfig::new("a1").with_skills("twitter", config);
            ClientBundle::for_agent(&agent, &cache, &store, &http)
                .twitter
                .map(|h| h.fingerprint().to_string())
        };

        let keys = |secret: &str| {
            SkillConfig::default()
                .with_extra(twitter::CONSUMER_KEY, "ck")
                .with_extra(twitter::CONSUMER_SECRET, "cs")
                .with_extra(twitter::ACCESS_TOKEN, "at")
                .with_extra(twitter::ACCESS_TOKEN_SECRET, secret)
        };

        let oauth2 = fingerprint_of(SkillConfig::default());
        assert_eq!(oauth2.as_deref(), Some(twitter::OAUTH2_FINGERPRINT));
        assert_eq!(fingerprint_of(keys("s1")), fingerprint_of(keys("s1")));
        assert_ne!(fingerprint_of(keys("s1")), fingerprint_of(keys("s2")));
        assert_ne!(fingerprint_of(keys("s1")), oauth2);
    }

    #[test]
    fn test_provider_names() {
        assert_eq!(Provider::Twitter.to_string(), "twitter");
        assert_eq!(Provider::CdpWallet.as_str(), "cdp_wallet");
    }
}

//! Skill System
//!
//! Decides, per inbound message, which tools an agent may call.
//!
//! # Architecture
//!
//! ```text
//! AgentConfig + RequestContext
//!        │
//!        ▼
//! SkillEngine::tools_for
//!   ├── SkillStateResolver   states + privilege + feature flags → names
//!   ├── ClientBundle         lazy handles over the shared ClientCache
//!   └── SkillFactory         names → Arc<dyn Tool> via the static catalog
//! ```
//!
//! Agent configuration is read fresh for every call. Only provider clients
//! are cached, and only inside `ClientCache`.

pub mod catalog;
pub mod factory;
pub mod resolver;
pub mod state;

pub use catalog::{SkillCatalog, SkillDeps, SkillSpec};
pub use factory::SkillFactory;
pub use resolver::SkillStateResolver;
pub use state::{FeatureFlags, SkillConfig, SkillState, SkillStates};

use std::sync::Arc;
use tracing::{debug, error, info};

use crate::agent::{AgentConfig, AgentDataPatch, RequestContext};
use crate::clients::{ClientBundle, ClientCache, Provider, WalletData};
use crate::clock::{Clock, SystemClock};
use crate::config::Config;
use crate::error::Result;
use crate::http::HttpSettings;
use crate::rate_limit::RateLimiter;
use crate::store::SkillStore;
use crate::tools::{Tool, ToolContext, ToolDefinition};

/// Entry point for the agent executor
pub struct SkillEngine {
    catalog: SkillCatalog,
    store: Arc<dyn SkillStore>,
    cache: Arc<ClientCache>,
    limiter: RateLimiter,
    clock: Arc<dyn Clock>,
    http: HttpSettings,
}

impl SkillEngine {
    pub fn new(
        store: Arc<dyn SkillStore>,
        cache: Arc<ClientCache>,
        clock: Arc<dyn Clock>,
        http: HttpSettings,
    ) -> Self {
        Self {
            catalog: SkillCatalog::builtin(),
            limiter: RateLimiter::new(store.clone(), clock.clone()),
            store,
            cache,
            clock,
            http,
        }
    }

    /// Engine with the system clock and a cache sized from config
    pub fn from_config(config: &Config, store: Arc<dyn SkillStore>) -> Result<Self> {
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        let cache = Arc::new(ClientCache::new(config.client_cache_capacity, clock.clone()));
        let http = HttpSettings::from_config(config)?;
        Ok(Self::new(store, cache, clock, http))
    }

    pub fn with_catalog(mut self, catalog: SkillCatalog) -> Self {
        self.catalog = catalog;
        self
    }

    pub fn catalog(&self) -> &SkillCatalog {
        &self.catalog
    }

    pub fn cache(&self) -> &Arc<ClientCache> {
        &self.cache
    }

    pub fn store(&self) -> &Arc<dyn SkillStore> {
        &self.store
    }

    /// Callable tools for one message
    pub fn tools_for(
        &self,
        agent: &AgentConfig,
        request: &RequestContext,
    ) -> Result<Vec<Arc<dyn Tool>>> {
        let resolver = SkillStateResolver::new(&self.catalog);
        let factory = SkillFactory::new(&self.catalog);
        let clients = ClientBundle::for_agent(agent, &self.cache, &self.store, &self.http);
        let ctx = ToolContext {
            agent_id: agent.id.clone(),
            store: self.store.clone(),
            limiter: self.limiter.clone(),
            clock: self.clock.clone(),
            rate_limit: None,
        };

        let mut tools = Vec::new();
        for (category, config) in &agent.skills {
            if !self.catalog.contains_category(category) {
                error!(
                    "Unknown skill category '{}' for agent {}, skipping",
                    category, agent.id
                );
                continue;
            }

            let names = resolver.resolve(
                category,
                config,
                request.privileged,
                &request.feature_flags,
            );
            if names.is_empty() {
                continue;
            }
            tools.extend(factory.build(category, &names, &clients, config, &ctx)?);
        }

        debug!(
            "Resolved {} tools for agent {} (privileged: {}, entrypoint: {:?})",
            tools.len(),
            agent.id,
            request.privileged,
            request.entrypoint
        );
        Ok(tools)
    }

    /// Tool definitions only, for tool selection
    pub fn definitions_for(
        &self,
        agent: &AgentConfig,
        request: &RequestContext,
    ) -> Result<Vec<ToolDefinition>> {
        Ok(self
            .tools_for(agent, request)?
            .iter()
            .map(|t| t.definition())
            .collect())
    }

    /// Forget the linked Twitter account and drop its cached session
    pub async fn unlink_twitter(&self, agent_id: &str) -> Result<()> {
        self.store
            .set_agent_data(agent_id, AgentDataPatch::unlink_twitter())
            .await?;
        self.cache.invalidate(agent_id, Provider::Twitter).await;
        info!("Unlinked Twitter account for agent {}", agent_id);
        Ok(())
    }

    /// Store new wallet data and drop the cached wallet client
    pub async fn rotate_wallet(&self, agent_id: &str, wallet_data: &str) -> Result<()> {
        WalletData::parse(wallet_data)?;
        self.store
            .set_agent_data(agent_id, AgentDataPatch::wallet(wallet_data))
            .await?;
        self.cache.invalidate(agent_id, Provider::CdpWallet).await;
        info!("Rotated CDP wallet for agent {}", agent_id);
        Ok(())
    }
}

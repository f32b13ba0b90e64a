//! skillgate
//!
//! Per-agent skill gating for a multi-tenant agent platform.
//!
//! # Features
//!
//! - **Skill resolution**: public/private/disabled states, privilege and chain feature flags
//! - **Client cache**: per-agent provider clients, built once, re-validated on expiry
//! - **Rate limiting**: fixed-window counters persisted in the skill store
//! - **Skill catalog**: static name → constructor table, no runtime discovery
//!
//! # Architecture
//!
//! ```text
//! Agent executor ──► SkillEngine ──► Vec<Arc<dyn Tool>>
//!                        │
//!                        ├── SkillStateResolver (states + flags)
//!                        ├── ClientCache (Moka, per-key build lock)
//!                        ├── SkillFactory (static catalog)
//!                        └── RateLimiter (SkillStore: SQLite / memory)
//! ```

pub mod agent;
pub mod clients;
pub mod clock;
pub mod config;
pub mod error;
pub mod http;
pub mod providers;
pub mod rate_limit;
pub mod skills;
pub mod store;
pub mod tools;

pub use agent::{AgentConfig, AgentData, AgentDataPatch, Entrypoint, RequestContext};
pub use clients::{ClientBundle, ClientCache, ClientCacheStats, ClientHandle, Provider, ProviderClient};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::Config;
pub use error::{Result, SkillError};
pub use http::HttpSettings;
pub use providers::{Chain, MoralisProvider, PortfolioProvider};
pub use rate_limit::{RateLimitPolicy, RateLimitRecord, RateLimiter};
pub use skills::{
    FeatureFlags, SkillCatalog, SkillConfig, SkillEngine, SkillFactory, SkillState,
    SkillStateResolver, SkillStates,
};
pub use store::{MemorySkillStore, SkillStore, SqliteSkillStore};
pub use tools::{Tool, ToolContext, ToolDefinition, ToolOutput, ToolSchema};

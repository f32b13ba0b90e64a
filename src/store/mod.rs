//! Skill Store
//!
//! Narrow key-value persistence interface the skill layer depends on.
//! Rate-limit counters, cross-call memory (`since_id` cursors) and the
//! runtime `AgentData` record all live here.
//!
//! The store is treated as an opaque durable namespace: no multi-key
//! transactions, read-your-writes per key is the only assumption.

mod memory;
mod sqlite;

pub use memory::MemorySkillStore;
pub use sqlite::SqliteSkillStore;

use async_trait::async_trait;
use serde_json::Value;

use crate::agent::{AgentData, AgentDataPatch};
use crate::error::Result;

/// System config keys read by the wallet client
pub mod system_keys {
    pub const CDP_API_KEY_NAME: &str = "cdp_api_key_name";
    pub const CDP_API_KEY_PRIVATE_KEY: &str = "cdp_api_key_private_key";
    pub const CDP_API_BASE_URL: &str = "cdp_api_base_url";
}

#[async_trait]
pub trait SkillStore: Send + Sync {
    /// Skill data scoped to one agent
    async fn get_agent_skill_data(
        &self,
        agent_id: &str,
        skill: &str,
        key: &str,
    ) -> Result<Option<Value>>;

    async fn save_agent_skill_data(
        &self,
        agent_id: &str,
        skill: &str,
        key: &str,
        data: Value,
    ) -> Result<()>;

    /// Skill data scoped to one conversation thread
    async fn get_thread_skill_data(
        &self,
        thread_id: &str,
        skill: &str,
        key: &str,
    ) -> Result<Option<Value>>;

    async fn save_thread_skill_data(
        &self,
        thread_id: &str,
        agent_id: &str,
        skill: &str,
        key: &str,
        data: Value,
    ) -> Result<()>;

    /// Runtime agent record; an empty record when the agent has none yet
    async fn get_agent_data(&self, agent_id: &str) -> Result<AgentData>;

    async fn set_agent_data(&self, agent_id: &str, patch: AgentDataPatch) -> Result<()>;

    /// Platform-wide configuration value (API key names, base URLs)
    async fn get_system_config(&self, key: &str) -> Result<Option<String>>;
}

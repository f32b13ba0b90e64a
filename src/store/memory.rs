//! In-process skill store for tests and local development.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use tokio::sync::RwLock;

use super::SkillStore;
use crate::agent::{AgentData, AgentDataPatch};
use crate::error::Result;

type SkillKey = (String, String, String);

#[derive(Default)]
pub struct MemorySkillStore {
    agent_skill_data: RwLock<HashMap<SkillKey, Value>>,
    /// thread key -> (owning agent, value)
    thread_skill_data: RwLock<HashMap<SkillKey, (String, Value)>>,
    agent_data: RwLock<HashMap<String, AgentData>>,
    system_config: RwLock<HashMap<String, String>>,
}

impl MemorySkillStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn set_system_config(&self, key: &str, value: &str) {
        self.system_config
            .write()
            .await
            .insert(key.to_string(), value.to_string());
    }

    /// Number of per-agent skill data entries (all agents)
    pub async fn agent_skill_entries(&self) -> usize {
        self.agent_skill_data.read().await.len()
    }
}

fn key(a: &str, b: &str, c: &str) -> SkillKey {
    (a.to_string(), b.to_string(), c.to_string())
}

#[async_trait]
impl SkillStore for MemorySkillStore {
    async fn get_agent_skill_data(
        &self,
        agent_id: &str,
        skill: &str,
        key_name: &str,
    ) -> Result<Option<Value>> {
        let data = self.agent_skill_data.read().await;
        Ok(data.get(&key(agent_id, skill, key_name)).cloned())
    }

    async fn save_agent_skill_data(
        &self,
        agent_id: &str,
        skill: &str,
        key_name: &str,
        data: Value,
    ) -> Result<()> {
        self.agent_skill_data
            .write()
            .await
            .insert(key(agent_id, skill, key_name), data);
        Ok(())
    }

    async fn get_thread_skill_data(
        &self,
        thread_id: &str,
        skill: &str,
        key_name: &str,
    ) -> Result<Option<Value>> {
        let data = self.thread_skill_data.read().await;
        Ok(data
            .get(&key(thread_id, skill, key_name))
            .map(|(_, value)| value.clone()))
    }

    async fn save_thread_skill_data(
        &self,
        thread_id: &str,
        agent_id: &str,
        skill: &str,
        key_name: &str,
        data: Value,
    ) -> Result<()> {
        self.thread_skill_data
            .write()
            .await
            .insert(key(thread_id, skill, key_name), (agent_id.to_string(), data));
        Ok(())
    }

    async fn get_agent_data(&self, agent_id: &str) -> Result<AgentData> {
        let data = self.agent_data.read().await;
        Ok(data.get(agent_id).cloned().unwrap_or_default())
    }

    async fn set_agent_data(&self, agent_id: &str, patch: AgentDataPatch) -> Result<()> {
        let mut data = self.agent_data.write().await;
        data.entry(agent_id.to_string()).or_default().apply(patch);
        Ok(())
    }

    async fn get_system_config(&self, key_name: &str) -> Result<Option<String>> {
        Ok(self.system_config.read().await.get(key_name).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_agent_and_thread_scopes_are_separate() {
        let store = MemorySkillStore::new();

        store
            .save_agent_skill_data("a1", "twitter_get_mentions", "last", json!({"since_id": "9"}))
            .await
            .unwrap();
        store
            .save_thread_skill_data("t1", "a1", "twitter_get_mentions", "last", json!({"since_id": "3"}))
            .await
            .unwrap();

        let agent = store
            .get_agent_skill_data("a1", "twitter_get_mentions", "last")
            .await
            .unwrap();
        let thread = store
            .get_thread_skill_data("t1", "twitter_get_mentions", "last")
            .await
            .unwrap();

        assert_eq!(agent, Some(json!({"since_id": "9"})));
        assert_eq!(thread, Some(json!({"since_id": "3"})));
        assert!(store
            .get_agent_skill_data("a2", "twitter_get_mentions", "last")
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_agent_data_defaults_and_patches() {
        let store = MemorySkillStore::new();
        assert_eq!(store.get_agent_data("nobody").await.unwrap(), AgentData::default());

        store
            .set_agent_data("a1", AgentDataPatch::wallet("{\"wallet_id\":\"w\"}"))
            .await
            .unwrap();
        let data = store.get_agent_data("a1").await.unwrap();
        assert_eq!(data.cdp_wallet_data.as_deref(), Some("{\"wallet_id\":\"w\"}"));
    }
}

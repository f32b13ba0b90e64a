//! SQLite-backed skill store
//!
//! Values are JSON-encoded. The connection sits behind a mutex; statements
//! are short single-row reads and upserts, so they run inline.

use async_trait::async_trait;
use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension};
use serde_json::Value;
use std::path::Path;
use tracing::debug;

use super::SkillStore;
use crate::agent::{AgentData, AgentDataPatch};
use crate::error::Result;

pub struct SqliteSkillStore {
    conn: Mutex<Connection>,
}

impl SqliteSkillStore {
    /// Create or open the store database
    pub fn open(db_path: &Path) -> Result<Self> {
        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    crate::error::SkillError::Store(format!(
                        "create {}: {}",
                        parent.display(),
                        e
                    ))
                })?;
            }
        }
        let conn = Connection::open(db_path)?;
        Self::init(conn)
    }

    /// Private in-memory database
    pub fn open_in_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS agent_skill_data (
                agent_id TEXT NOT NULL,
                skill TEXT NOT NULL,
                key TEXT NOT NULL,
                data TEXT NOT NULL,
                updated_at INTEGER NOT NULL,
                PRIMARY KEY (agent_id, skill, key)
            );

            CREATE TABLE IF NOT EXISTS thread_skill_data (
                thread_id TEXT NOT NULL,
                agent_id TEXT NOT NULL,
                skill TEXT NOT NULL,
                key TEXT NOT NULL,
                data TEXT NOT NULL,
                updated_at INTEGER NOT NULL,
                PRIMARY KEY (thread_id, skill, key)
            );

            CREATE TABLE IF NOT EXISTS agent_data (
                agent_id TEXT PRIMARY KEY,
                data TEXT NOT NULL,
                updated_at INTEGER NOT NULL
            );

            CREATE TABLE IF NOT EXISTS system_config (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_thread_skill_agent ON thread_skill_data(agent_id);
            "#,
        )?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    pub fn set_system_config(&self, key: &str, value: &str) -> Result<()> {
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO system_config (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            params![key, value],
        )?;
        Ok(())
    }

    fn now() -> i64 {
        chrono::Utc::now().timestamp()
    }
}

#[async_trait]
impl SkillStore for SqliteSkillStore {
    async fn get_agent_skill_data(
        &self,
        agent_id: &str,
        skill: &str,
        key: &str,
    ) -> Result<Option<Value>> {
        let conn = self.conn.lock();
        let raw: Option<String> = conn
            .query_row(
                "SELECT data FROM agent_skill_data WHERE agent_id = ?1 AND skill = ?2 AND key = ?3",
                params![agent_id, skill, key],
                |row| row.get(0),
            )
            .optional()?;
        Ok(raw.map(|s| serde_json::from_str::<Value>(&s)).transpose()?)
    }

    async fn save_agent_skill_data(
        &self,
        agent_id: &str,
        skill: &str,
        key: &str,
        data: Value,
    ) -> Result<()> {
        let encoded = serde_json::to_string(&data)?;
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO agent_skill_data (agent_id, skill, key, data, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(agent_id, skill, key) DO UPDATE SET
                data = excluded.data, updated_at = excluded.updated_at",
            params![agent_id, skill, key, encoded, Self::now()],
        )?;
        debug!("Saved skill data {}/{}/{}", agent_id, skill, key);
        Ok(())
    }

    async fn get_thread_skill_data(
        &self,
        thread_id: &str,
        skill: &str,
        key: &str,
    ) -> Result<Option<Value>> {
        let conn = self.conn.lock();
        let raw: Option<String> = conn
            .query_row(
                "SELECT data FROM thread_skill_data WHERE thread_id = ?1 AND skill = ?2 AND key = ?3",
                params![thread_id, skill, key],
                |row| row.get(0),
            )
            .optional()?;
        Ok(raw.map(|s| serde_json::from_str::<Value>(&s)).transpose()?)
    }

    async fn save_thread_skill_data(
        &self,
        thread_id: &str,
        agent_id: &str,
        skill: &str,
        key: &str,
        data: Value,
    ) -> Result<()> {
        let encoded = serde_json::to_string(&data)?;
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO thread_skill_data (thread_id, agent_id, skill, key, data, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             ON CONFLICT(thread_id, skill, key) DO UPDATE SET
                agent_id = excluded.agent_id, data = excluded.data, updated_at = excluded.updated_at",
            params![thread_id, agent_id, skill, key, encoded, Self::now()],
        )?;
        Ok(())
    }

    async fn get_agent_data(&self, agent_id: &str) -> Result<AgentData> {
        let conn = self.conn.lock();
        let raw: Option<String> = conn
            .query_row(
                "SELECT data FROM agent_data WHERE agent_id = ?1",
                params![agent_id],
                |row| row.get(0),
            )
            .optional()?;
        match raw {
            Some(s) => Ok(serde_json::from_str(&s)?),
            None => Ok(AgentData::default()),
        }
    }

    async fn set_agent_data(&self, agent_id: &str, patch: AgentDataPatch) -> Result<()> {
        let conn = self.conn.lock();
        let raw: Option<String> = conn
            .query_row(
                "SELECT data FROM agent_data WHERE agent_id = ?1",
                params![agent_id],
                |row| row.get(0),
            )
            .optional()?;
        let mut data: AgentData = match raw {
            Some(s) => serde_json::from_str(&s)?,
            None => AgentData::default(),
        };
        data.apply(patch);

        conn.execute(
            "INSERT INTO agent_data (agent_id, data, updated_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(agent_id) DO UPDATE SET data = excluded.data, updated_at = excluded.updated_at",
            params![agent_id, serde_json::to_string(&data)?, Self::now()],
        )?;
        Ok(())
    }

    async fn get_system_config(&self, key: &str) -> Result<Option<String>> {
        let conn = self.conn.lock();
        let value = conn
            .query_row(
                "SELECT value FROM system_config WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value)
    }
}

//! Per-(agent, skill) Rate Limiting
//!
//! Fixed-window request counter persisted in the skill store.
//!
//! Features:
//! - One counter per (agent, skill) under the `rate_limit` key
//! - Window starts on the first call and resets once `now >= reset_time`
//! - Limits come from the skill catalog, overridable per agent config
//!
//! Known limitations:
//! - Fixed window: up to `2 * max_requests` calls can land around a window
//!   boundary.
//! - The read-modify-write is not atomic against the store. Two concurrent
//!   calls for the same key can both pass at the limit. The limiter bounds
//!   provider cost; it is not a strict quota.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::clock::Clock;
use crate::error::{Result, SkillError};
use crate::store::SkillStore;

/// Skill-store key holding the counter
pub const RATE_LIMIT_KEY: &str = "rate_limit";

/// Limit applied to one skill
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimitPolicy {
    /// Maximum requests per window
    pub max_requests: u32,
    /// Window length in minutes
    pub window_minutes: u32,
}

impl RateLimitPolicy {
    pub const fn new(max_requests: u32, window_minutes: u32) -> Self {
        Self {
            max_requests,
            window_minutes,
        }
    }

    /// Apply per-agent overrides. Either field may be overridden alone.
    pub fn with_overrides(self, max_requests: Option<u32>, window_minutes: Option<u32>) -> Self {
        Self {
            max_requests: max_requests.unwrap_or(self.max_requests),
            window_minutes: window_minutes.unwrap_or(self.window_minutes),
        }
    }
}

/// Persisted counter for one (agent, skill) window
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RateLimitRecord {
    pub count: u32,
    pub reset_time: DateTime<Utc>,
}

impl RateLimitRecord {
    fn fresh(now: DateTime<Utc>, window_minutes: u32) -> Self {
        Self {
            count: 1,
            reset_time: now + Duration::minutes(i64::from(window_minutes)),
        }
    }
}

/// Fixed-window limiter over the skill store
#[derive(Clone)]
pub struct RateLimiter {
    store: Arc<dyn SkillStore>,
    clock: Arc<dyn Clock>,
}

impl RateLimiter {
    pub fn new(store: Arc<dyn SkillStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// Count one request, or fail with `RateLimitExceeded` when the current
    /// window is already full
    pub async fn check_and_increment(
        &self,
        agent_id: &str,
        skill_name: &str,
        max_requests: u32,
        window_minutes: u32,
    ) -> Result<()> {
        let now = self.clock.now();
        let current = self.load(agent_id, skill_name).await?;

        let next = match current {
            Some(record) if now < record.reset_time => {
                if record.count >= max_requests {
                    warn!(
                        "Agent {} rate limited on {} ({}/{} until {})",
                        agent_id,
                        skill_name,
                        record.count,
                        max_requests,
                        record.reset_time.to_rfc3339()
                    );
                    return Err(SkillError::rate_limited(format!(
                        "Rate limit exceeded for {}: {} requests per {} minutes, resets at {}",
                        skill_name,
                        max_requests,
                        window_minutes,
                        record.reset_time.to_rfc3339()
                    )));
                }
                RateLimitRecord {
                    count: record.count + 1,
                    reset_time: record.reset_time,
                }
            }
            _ => RateLimitRecord::fresh(now, window_minutes),
        };

        self.store
            .save_agent_skill_data(
                agent_id,
                skill_name,
                RATE_LIMIT_KEY,
                serde_json::to_value(&next)?,
            )
            .await?;

        debug!(
            "Agent {} allowed on {} ({}/{})",
            agent_id, skill_name, next.count, max_requests
        );
        Ok(())
    }

    /// Apply a policy; `None` means the skill is unlimited
    pub async fn enforce(
        &self,
        agent_id: &str,
        skill_name: &str,
        policy: Option<RateLimitPolicy>,
    ) -> Result<()> {
        match policy {
            Some(p) => {
                self.check_and_increment(agent_id, skill_name, p.max_requests, p.window_minutes)
                    .await
            }
            None => Ok(()),
        }
    }

    /// Current record, if any. Unparsable records count as absent.
    pub async fn load(&self, agent_id: &str, skill_name: &str) -> Result<Option<RateLimitRecord>> {
        let raw = self
            .store
            .get_agent_skill_data(agent_id, skill_name, RATE_LIMIT_KEY)
            .await?;
        Ok(raw.and_then(|value| match serde_json::from_value(value) {
            Ok(record) => Some(record),
            Err(e) => {
                warn!(
                    "Discarding malformed rate limit record for {}/{}: {}",
                    agent_id, skill_name, e
                );
                None
            }
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::store::MemorySkillStore;
    use chrono::TimeZone;
    use serde_json::json;

    fn limiter() -> (RateLimiter, Arc<ManualClock>, Arc<MemorySkillStore>) {
        let store = Arc::new(MemorySkillStore::new());
        let clock = Arc::new(ManualClock::new(Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap()));
        (RateLimiter::new(store.clone(), clock.clone()), clock, store)
    }

    #[tokio::test]
    async fn test_exactly_max_requests_succeed() {
        let (limiter, _clock, _store) = limiter();

        for i in 0..5 {
            let result = limiter.check_and_increment("agent", "skill", 5, 60).await;
            assert!(result.is_ok(), "Request {} should be allowed", i);
        }

        let result = limiter.check_and_increment("agent", "skill", 5, 60).await;
        assert!(matches!(result, Err(SkillError::RateLimitExceeded(_))));
    }

    #[tokio::test]
    async fn test_fifteen_minute_window_scenario() {
        let (limiter, clock, _store) = limiter();

        // t = 0
        limiter.check_and_increment("agent", "post", 1, 15).await.unwrap();

        // t = 5min
        clock.advance(Duration::minutes(5));
        let result = limiter.check_and_increment("agent", "post", 1, 15).await;
        assert!(matches!(result, Err(SkillError::RateLimitExceeded(_))));

        // t = 16min
        clock.advance(Duration::minutes(11));
        limiter.check_and_increment("agent", "post", 1, 15).await.unwrap();
    }

    #[tokio::test]
    async fn test_expired_window_resets_to_one() {
        let (limiter, clock, _store) = limiter();

        for _ in 0..3 {
            limiter.check_and_increment("agent", "skill", 3, 10).await.unwrap();
        }
        assert!(limiter.check_and_increment("agent", "skill", 3, 10).await.is_err());

        // Exactly at reset_time counts as expired
        clock.advance(Duration::minutes(10));
        limiter.check_and_increment("agent", "skill", 3, 10).await.unwrap();

        let record = limiter.load("agent", "skill").await.unwrap().unwrap();
        assert_eq!(record.count, 1);
        assert_eq!(record.reset_time, clock.now() + Duration::minutes(10));
    }

    #[tokio::test]
    async fn test_agent_and_skill_isolation() {
        let (limiter, _clock, _store) = limiter();

        limiter.check_and_increment("a1", "skill", 1, 60).await.unwrap();
        assert!(limiter.check_and_increment("a1", "skill", 1, 60).await.is_err());

        // Different agent, different skill: independent counters
        limiter.check_and_increment("a2", "skill", 1, 60).await.unwrap();
        limiter.check_and_increment("a1", "other", 1, 60).await.unwrap();
    }

    #[tokio::test]
    async fn test_malformed_record_starts_fresh_window() {
        let (limiter, _clock, store) = limiter();
        store
            .save_agent_skill_data("agent", "skill", RATE_LIMIT_KEY, json!({"count": "lots"}))
            .await
            .unwrap();

        limiter.check_and_increment("agent", "skill", 2, 5).await.unwrap();
        let record = limiter.load("agent", "skill").await.unwrap().unwrap();
        assert_eq!(record.count, 1);
    }

    #[tokio::test]
    async fn test_enforce_without_policy_is_unlimited() {
        let (limiter, _clock, store) = limiter();
        for _ in 0..100 {
            limiter.enforce("agent", "current_time", None).await.unwrap();
        }
        assert_eq!(store.agent_skill_entries().await, 0);
    }

    #[test]
    fn test_policy_overrides() {
        let base = RateLimitPolicy::new(30, 5);
        assert_eq!(base.with_overrides(None, None), base);
        assert_eq!(base.with_overrides(Some(10), None), RateLimitPolicy::new(10, 5));
        assert_eq!(base.with_overrides(Some(1), Some(60)), RateLimitPolicy::new(1, 60));
    }
}

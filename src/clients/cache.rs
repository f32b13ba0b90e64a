//! Per-Agent Client Cache
//!
//! Memoizes stateful provider clients keyed by (agent, provider).
//!
//! - Construction is serialized per key: concurrent callers for the same
//!   key wait for one factory run instead of racing their own.
//! - Failed construction caches nothing; the next call retries. A stale
//!   entry whose rebuild fails is removed.
//! - Credential expiry is re-checked on every lookup. Expired handles are
//!   rebuilt through the factory, which re-reads credentials.
//! - Each entry remembers the credential fingerprint it was built from. A
//!   lookup with a different fingerprint rebuilds the client.

use chrono::{DateTime, Utc};
use moka::future::Cache;
use moka::ops::compute::{CompResult, Op};
use parking_lot::Mutex;
use std::any::Any;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, info};

use super::{Provider, ProviderClient};
use crate::clock::Clock;
use crate::error::{Result, SkillError};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct ClientKey {
    agent_id: String,
    provider: Provider,
}

#[derive(Clone)]
struct CachedClient {
    handle: Arc<dyn Any + Send + Sync>,
    expires_at: Option<DateTime<Utc>>,
    fingerprint: String,
}

impl CachedClient {
    fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.map(|t| t <= now).unwrap_or(false)
    }
}

/// Cache statistics
#[derive(Debug, Clone)]
pub struct ClientCacheStats {
    pub entries: u64,
    pub hits: u64,
    pub builds: u64,
}

/// Process-wide client cache, shared by `Arc`
pub struct ClientCache {
    entries: Cache<ClientKey, CachedClient>,
    clock: Arc<dyn Clock>,
    hits: AtomicU64,
    builds: AtomicU64,
}

impl ClientCache {
    pub fn new(max_entries: u64, clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: Cache::builder().max_capacity(max_entries).build(),
            clock,
            hits: AtomicU64::new(0),
            builds: AtomicU64::new(0),
        }
    }

    /// Return the cached client for (agent, provider), building it with
    /// `factory` when absent, expired or built from another `fingerprint`
    pub async fn get_or_create<C, F, Fut>(
        &self,
        agent_id: &str,
        provider: Provider,
        fingerprint: &str,
        factory: F,
    ) -> Result<Arc<C>>
    where
        C: ProviderClient,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<C>>,
    {
        let key = ClientKey {
            agent_id: agent_id.to_string(),
            provider,
        };
        let now = self.clock.now();
        let failure: Mutex<Option<SkillError>> = Mutex::new(None);

        let outcome = self
            .entries
            .entry(key)
            .and_compute_with(|existing| {
                let failure = &failure;
                async move {
                    let stale = match existing {
                        None => false,
                        Some(entry) => {
                            let cached = entry.value();
                            if cached.fingerprint != fingerprint {
                                debug!(
                                    "{} credentials for agent {} changed, rebuilding",
                                    provider, agent_id
                                );
                            } else if cached.is_expired(now) {
                                debug!(
                                    "Cached {} client for agent {} expired, rebuilding",
                                    provider, agent_id
                                );
                            } else {
                                return Op::Nop;
                            }
                            true
                        }
                    };

                    let built: Result<CachedClient> = async {
                        let client = factory().await?;
                        let expires_at = client.expires_at();
                        if expires_at.map(|t| t <= now).unwrap_or(false) {
                            return Err(SkillError::credential(format!(
                                "{} credentials for agent {} have expired",
                                provider, agent_id
                            )));
                        }
                        Ok(CachedClient {
                            handle: Arc::new(client),
                            expires_at,
                            fingerprint: fingerprint.to_string(),
                        })
                    }
                    .await;

                    match built {
                        Ok(cached) => Op::Put(cached),
                        Err(e) => {
                            *failure.lock() = Some(e);
                            if stale {
                                Op::Remove
                            } else {
                                Op::Nop
                            }
                        }
                    }
                }
            })
            .await;

        if let Some(e) = failure.into_inner() {
            return Err(e);
        }

        let cached = match outcome {
            CompResult::Unchanged(entry) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                debug!("Client cache HIT: {}/{}", agent_id, provider);
                entry.into_value()
            }
            CompResult::Inserted(entry) | CompResult::ReplacedWith(entry) => {
                self.builds.fetch_add(1, Ordering::Relaxed);
                info!("Built {} client for agent {}", provider, agent_id);
                entry.into_value()
            }
            CompResult::Removed(_) | CompResult::StillNone(_) => {
                return Err(SkillError::Internal(format!(
                    "client cache produced no {} client for agent {}",
                    provider, agent_id
                )));
            }
        };

        cached.handle.downcast::<C>().map_err(|_| {
            SkillError::Internal(format!(
                "cached {} client for agent {} has an unexpected type",
                provider, agent_id
            ))
        })
    }

    /// Drop the cached client so the next lookup rebuilds it
    pub async fn invalidate(&self, agent_id: &str, provider: Provider) {
        let key = ClientKey {
            agent_id: agent_id.to_string(),
            provider,
        };
        self.entries.invalidate(&key).await;
        debug!("Invalidated {} client for agent {}", provider, agent_id);
    }

    /// Drop every cached client of an agent
    pub async fn invalidate_agent(&self, agent_id: &str) {
        for provider in Provider::ALL {
            self.invalidate(agent_id, provider).await;
        }
    }

    pub fn contains(&self, agent_id: &str, provider: Provider) -> bool {
        self.entries.contains_key(&ClientKey {
            agent_id: agent_id.to_string(),
            provider,
        })
    }

    /// Live entries after pending maintenance
    pub async fn entry_count(&self) -> u64 {
        self.entries.run_pending_tasks().await;
        self.entries.entry_count()
    }

    pub async fn stats(&self) -> ClientCacheStats {
        ClientCacheStats {
            entries: self.entry_count().await,
            hits: self.hits.load(Ordering::Relaxed),
            builds: self.builds.load(Ordering::Relaxed),
        }
    }
}

//! Skill configuration types
//!
//! Core data structures for declaring which skills an agent exposes.

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;

use crate::rate_limit::RateLimitPolicy;

/// Feature flags consulted by skill preconditions (`evm`, `solana`, ...)
pub type FeatureFlags = BTreeMap<String, bool>;

/// Visibility of a single skill
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SkillState {
    /// Never exposed
    Disabled,
    /// Exposed to every caller
    Public,
    /// Exposed to privileged callers only
    Private,
}

impl SkillState {
    /// Whether a caller with the given privilege may use the skill
    pub fn allows(self, is_privileged_caller: bool) -> bool {
        match self {
            SkillState::Disabled => false,
            SkillState::Public => true,
            SkillState::Private => is_privileged_caller,
        }
    }
}

/// Skill name → state, in declaration order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SkillStates(Vec<(String, SkillState)>);

impl SkillStates {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or update; updating keeps the original position
    pub fn insert(&mut self, name: &str, state: SkillState) {
        match self.0.iter_mut().find(|(n, _)| n == name) {
            Some(entry) => entry.1 = state,
            None => self.0.push((name.to_string(), state)),
        }
    }

    pub fn get(&self, name: &str) -> Option<SkillState> {
        self.0.iter().find(|(n, _)| n == name).map(|(_, s)| *s)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, SkillState)> {
        self.0.iter().map(|(n, s)| (n.as_str(), *s))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<'a> FromIterator<(&'a str, SkillState)> for SkillStates {
    fn from_iter<I: IntoIterator<Item = (&'a str, SkillState)>>(iter: I) -> Self {
        let mut states = SkillStates::new();
        for (name, state) in iter {
            states.insert(name, state);
        }
        states
    }
}

impl Serialize for SkillStates {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (name, state) in &self.0 {
            map.serialize_entry(name, state)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for SkillStates {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct StatesVisitor;

        impl<'de> Visitor<'de> for StatesVisitor {
            type Value = SkillStates;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a map of skill name to disabled|public|private")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<SkillStates, A::Error> {
                let mut states = SkillStates::new();
                while let Some((name, state)) = access.next_entry::<String, SkillState>()? {
                    states.insert(&name, state);
                }
                Ok(states)
            }
        }

        deserializer.deserialize_map(StatesVisitor)
    }
}

/// Per-category skill configuration, owned by the agent record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SkillConfig {
    /// Category switch; a disabled category exposes nothing
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default)]
    pub states: SkillStates,
    /// Provider API key (agent-owner supplied)
    #[serde(default)]
    pub api_key: Option<String>,
    /// Override of the catalog's per-skill request limit
    #[serde(default)]
    pub rate_limit_number: Option<u32>,
    /// Override of the catalog's per-skill window, minutes
    #[serde(default)]
    pub rate_limit_minutes: Option<u32>,
    /// Chain support flags, combined with the request's feature flags
    #[serde(default)]
    pub supported_chains: FeatureFlags,
    /// Provider-specific fields (e.g. Twitter `consumer_key` for app-key mode)
    #[serde(default)]
    pub extra: BTreeMap<String, String>,
}

fn default_enabled() -> bool {
    true
}

impl Default for SkillConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            states: SkillStates::new(),
            api_key: None,
            rate_limit_number: None,
            rate_limit_minutes: None,
            supported_chains: FeatureFlags::new(),
            extra: BTreeMap::new(),
        }
    }
}

impl SkillConfig {
    pub fn with_state(mut self, name: &str, state: SkillState) -> Self {
        self.states.insert(name, state);
        self
    }

    pub fn with_api_key(mut self, key: &str) -> Self {
        self.api_key = Some(key.to_string());
        self
    }

    pub fn with_chain(mut self, chain: &str, supported: bool) -> Self {
        self.supported_chains.insert(chain.to_string(), supported);
        self
    }

    pub fn with_extra(mut self, key: &str, value: &str) -> Self {
        self.extra.insert(key.to_string(), value.to_string());
        self
    }

    pub fn extra(&self, key: &str) -> Option<&str> {
        self.extra.get(key).map(String::as_str).filter(|v| !v.is_empty())
    }

    /// Resolve the effective limit for a skill from its catalog default
    pub fn rate_limit_for(&self, default: Option<RateLimitPolicy>) -> Option<RateLimitPolicy> {
        match default {
            Some(policy) => Some(policy.with_overrides(self.rate_limit_number, self.rate_limit_minutes)),
            // Unlimited skills only become limited when both fields are set
            None => match (self.rate_limit_number, self.rate_limit_minutes) {
                (Some(max), Some(minutes)) => Some(RateLimitPolicy::new(max, minutes)),
                _ => None,
            },
        }
    }

    /// Request flags combined with this config's `supported_chains`
    ///
    /// A flag is off when either source turns it off. Flags set by only one
    /// source keep that source's value.
    pub fn effective_flags(&self, request_flags: &FeatureFlags) -> FeatureFlags {
        let mut flags = request_flags.clone();
        for (name, enabled) in &self.supported_chains {
            flags
                .entry(name.clone())
                .and_modify(|flag| *flag &= *enabled)
                .or_insert(*enabled);
        }
        flags
    }
}

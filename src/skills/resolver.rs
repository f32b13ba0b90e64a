//! Skill state resolution
//!
//! Turns one category's declarative `SkillConfig` into the ordered list of
//! skill names a caller may use. Unknown names are skipped with a warning
//! so a stale agent record never blocks the rest of its skills.

use std::collections::HashSet;
use tracing::{debug, warn};

use super::catalog::SkillCatalog;
use super::{FeatureFlags, SkillConfig};

pub struct SkillStateResolver<'a> {
    catalog: &'a SkillCatalog,
}

impl<'a> SkillStateResolver<'a> {
    pub fn new(catalog: &'a SkillCatalog) -> Self {
        Self { catalog }
    }

    /// Enabled skill names for one category, in declaration order
    pub fn resolve(
        &self,
        category: &str,
        config: &SkillConfig,
        is_privileged_caller: bool,
        feature_flags: &FeatureFlags,
    ) -> Vec<String> {
        if !config.enabled {
            debug!("Skill category {} is disabled", category);
            return Vec::new();
        }

        let flags = config.effective_flags(feature_flags);
        let mut seen = HashSet::new();
        let mut names = Vec::new();

        for (name, state) in config.states.iter() {
            if !state.allows(is_privileged_caller) {
                continue;
            }
            let Some(spec) = self.catalog.get(category, name) else {
                warn!("Unknown skill '{}' in category '{}', skipping", name, category);
                continue;
            };
            if !spec.features_enabled(&flags) {
                debug!(
                    "Skill {} excluded by feature flags (requires {:?})",
                    name, spec.required_features
                );
                continue;
            }
            if seen.insert(name) {
                names.push(name.to_string());
            }
        }

        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::skills::SkillState;

    fn resolve(category: &str, config: &SkillConfig, privileged: bool) -> Vec<String> {
        let catalog = SkillCatalog::builtin();
        SkillStateResolver::new(&catalog).resolve(category, config, privileged, &FeatureFlags::new())
    }

    #[test]
    fn test_public_private_disabled() {
        let config = SkillConfig::default()
            .with_state("twitter_post_tweet", SkillState::Public)
            .with_state("twitter_reply_tweet", SkillState::Private)
            .with_state("twitter_get_mentions", SkillState::Disabled);

        assert_eq!(resolve("twitter", &config, false), vec!["twitter_post_tweet"]);
        assert_eq!(
            resolve("twitter", &config, true),
            vec!["twitter_post_tweet", "twitter_reply_tweet"]
        );
    }

    #[test]
    fn test_declaration_order_is_kept() {
        let config = SkillConfig::default()
            .with_state("twitter_get_timeline", SkillState::Public)
            .with_state("twitter_post_tweet", SkillState::Public)
            .with_state("twitter_get_mentions", SkillState::Public);
        assert_eq!(
            resolve("twitter", &config, false),
            vec!["twitter_get_timeline", "twitter_post_tweet", "twitter_get_mentions"]
        );
    }

    #[test]
    fn test_disabled_category_yields_nothing() {
        let mut config = SkillConfig::default().with_state("current_time", SkillState::Public);
        config.enabled = false;
        assert!(resolve("common", &config, true).is_empty());
    }

    #[test]
    fn test_unknown_names_are_skipped() {
        let config = SkillConfig::default()
            .with_state("no_such_skill", SkillState::Public)
            .with_state("current_time", SkillState::Public);
        assert_eq!(resolve("common", &config, false), vec!["current_time"]);

        // Known name filed under the wrong category is unknown there
        let config = SkillConfig::default().with_state("current_time", SkillState::Public);
        assert!(resolve("twitter", &config, true).is_empty());
    }

    #[test]
    fn test_feature_flags_gate_chain_skills() {
        let catalog = SkillCatalog::builtin();
        let resolver = SkillStateResolver::new(&catalog);
        let config = SkillConfig::default()
            .with_state("fetch_wallet_portfolio", SkillState::Public)
            .with_state("fetch_solana_portfolio", SkillState::Public);

        let mut request = FeatureFlags::new();
        assert_eq!(resolver.resolve("portfolio", &config, false, &request).len(), 2);

        request.insert("solana".into(), false);
        assert_eq!(
            resolver.resolve("portfolio", &config, false, &request),
            vec!["fetch_wallet_portfolio"]
        );

        // Config support cannot re-enable a chain the request turned off
        let config = config.with_chain("solana", true);
        assert_eq!(
            resolver.resolve("portfolio", &config, false, &request),
            vec!["fetch_wallet_portfolio"]
        );

        // Either side turning a chain off excludes its skills
        let config = config.with_chain("evm", false);
        assert!(resolver.resolve("portfolio", &config, false, &request).is_empty());
        assert_eq!(
            resolver.resolve("portfolio", &config, false, &FeatureFlags::new()),
            vec!["fetch_solana_portfolio"]
        );
    }
}

//! Tool instantiation from resolved skill names

use std::sync::Arc;
use tracing::{debug, error};

use super::catalog::{SkillCatalog, SkillDeps};
use super::SkillConfig;
use crate::clients::ClientBundle;
use crate::error::{Result, SkillError};
use crate::tools::{Tool, ToolContext};

pub struct SkillFactory<'a> {
    catalog: &'a SkillCatalog,
}

impl<'a> SkillFactory<'a> {
    pub fn new(catalog: &'a SkillCatalog) -> Self {
        Self { catalog }
    }

    /// Build tools for resolved names
    ///
    /// Fails on the first name that is not registered or whose client is
    /// not wired. Both mean the agent record and the catalog disagree.
    pub fn build(
        &self,
        category: &str,
        names: &[String],
        clients: &ClientBundle,
        config: &SkillConfig,
        ctx: &ToolContext,
    ) -> Result<Vec<Arc<dyn Tool>>> {
        let mut tools = Vec::with_capacity(names.len());

        for name in names {
            let Some(spec) = self.catalog.get(category, name) else {
                error!("Skill '{}' is not registered in category '{}'", name, category);
                return Err(SkillError::UnknownSkill {
                    category: category.to_string(),
                    name: name.clone(),
                });
            };

            let rate_limit = config.rate_limit_for(spec.default_rate_limit);
            let deps = SkillDeps {
                spec,
                ctx: ctx.with_rate_limit(rate_limit),
                clients,
            };

            let tool = (spec.constructor)(&deps).map_err(|e| {
                error!("Failed to build skill {}/{}: {}", category, name, e);
                e
            })?;
            debug!("Built skill {}/{} (rate limit {:?})", category, name, rate_limit);
            tools.push(tool);
        }

        Ok(tools)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::SystemClock;
    use crate::rate_limit::RateLimiter;
    use crate::store::{MemorySkillStore, SkillStore};

    fn ctx() -> ToolContext {
        let store: Arc<dyn SkillStore> = Arc::new(MemorySkillStore::new());
        let clock = Arc::new(SystemClock);
        ToolContext {
            agent_id: "a1".into(),
            limiter: RateLimiter::new(store.clone(), clock.clone()),
            store,
            clock,
            rate_limit: None,
        }
    }

    #[test]
    fn test_builds_client_free_tool() {
        let catalog = SkillCatalog::builtin();
        let tools = SkillFactory::new(&catalog)
            .build(
                "common",
                &["current_time".to_string()],
                &ClientBundle::default(),
                &SkillConfig::default(),
                &ctx(),
            )
            .unwrap();
        assert_eq!(tools.len(), 1);
        assert_eq!(tools[0].name(), "current_time");
        assert_eq!(tools[0].category(), "common");
    }

    #[test]
    fn test_unknown_name_is_hard_error() {
        let catalog = SkillCatalog::builtin();
        let result = SkillFactory::new(&catalog).build(
            "common",
            &["teleport".to_string()],
            &ClientBundle::default(),
            &SkillConfig::default(),
            &ctx(),
        );
        assert!(matches!(result, Err(SkillError::UnknownSkill { ref name, .. }) if name == "teleport"));
    }

    #[test]
    fn test_missing_client_is_reported() {
        let catalog = SkillCatalog::builtin();
        let result = SkillFactory::new(&catalog).build(
            "twitter",
            &["twitter_post_tweet".to_string()],
            &ClientBundle::default(),
            &SkillConfig::default(),
            &ctx(),
        );
        match result {
            Err(SkillError::MissingClient { skill, provider }) => {
                assert_eq!(skill, "twitter_post_tweet");
                assert_eq!(provider, "twitter");
            }
            _ => panic!("expected MissingClient"),
        }
    }
}

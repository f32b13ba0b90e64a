//! Static skill registration table
//!
//! Every tool the platform can expose is listed here with its category,
//! chain requirements and default rate limit. Lookup is by exact
//! `(category, name)`; nothing is discovered at runtime.

use std::collections::BTreeMap;
use std::sync::Arc;

use super::FeatureFlags;
use crate::clients::{ClientBundle, ClientHandle, Provider, TwitterClient, WalletClient};
use crate::error::{Result, SkillError};
use crate::providers::PortfolioProvider;
use crate::rate_limit::RateLimitPolicy;
use crate::tools::{self, Tool, ToolContext, ToolMeta, ToolSchema};

/// Builds one tool from its dependencies
pub type Constructor = fn(&SkillDeps<'_>) -> Result<Arc<dyn Tool>>;

pub struct SkillSpec {
    pub category: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    /// Feature flags that must not be explicitly `false`
    pub required_features: &'static [&'static str],
    pub default_rate_limit: Option<RateLimitPolicy>,
    pub constructor: Constructor,
}

impl SkillSpec {
    /// A missing flag counts as enabled
    pub fn features_enabled(&self, flags: &FeatureFlags) -> bool {
        self.required_features
            .iter()
            .all(|f| flags.get(*f).copied().unwrap_or(true))
    }
}

impl std::fmt::Debug for SkillSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SkillSpec")
            .field("category", &self.category)
            .field("name", &self.name)
            .field("required_features", &self.required_features)
            .field("default_rate_limit", &self.default_rate_limit)
            .finish()
    }
}

const TWEET_DAILY: Option<RateLimitPolicy> = Some(RateLimitPolicy::new(24, 1440));
const REPLY_DAILY: Option<RateLimitPolicy> = Some(RateLimitPolicy::new(48, 1440));
const FEED_QUARTER_HOUR: Option<RateLimitPolicy> = Some(RateLimitPolicy::new(1, 15));
const PORTFOLIO_BURST: Option<RateLimitPolicy> = Some(RateLimitPolicy::new(30, 5));

static BUILTIN_SKILLS: &[SkillSpec] = &[
    SkillSpec {
        category: "common",
        name: "current_time",
        description: "Get the current time, converted to a specified timezone. Call this whenever the user asks for the time.",
        required_features: &[],
        default_rate_limit: None,
        constructor: tools::common::CurrentTime::build,
    },
    SkillSpec {
        category: "twitter",
        name: "twitter_post_tweet",
        description: "Post a new tweet to Twitter.",
        required_features: &[],
        default_rate_limit: TWEET_DAILY,
        constructor: tools::twitter::PostTweet::build,
    },
    SkillSpec {
        category: "twitter",
        name: "twitter_reply_tweet",
        description: "Reply to an existing tweet on Twitter.",
        required_features: &[],
        default_rate_limit: REPLY_DAILY,
        constructor: tools::twitter::ReplyTweet::build,
    },
    SkillSpec {
        category: "twitter",
        name: "twitter_get_mentions",
        description: "Get tweets that mention the authenticated user.",
        required_features: &[],
        default_rate_limit: FEED_QUARTER_HOUR,
        constructor: tools::twitter::TwitterFeed::build_mentions,
    },
    SkillSpec {
        category: "twitter",
        name: "twitter_get_timeline",
        description: "Get tweets from the authenticated user's timeline.",
        required_features: &[],
        default_rate_limit: FEED_QUARTER_HOUR,
        constructor: tools::twitter::TwitterFeed::build_timeline,
    },
    SkillSpec {
        category: "cdp",
        name: "cdp_get_balance",
        description: "Get the balance of the agent's CDP wallet, for one asset or all of them.",
        required_features: &[],
        default_rate_limit: None,
        constructor: tools::wallet::GetBalance::build,
    },
    SkillSpec {
        category: "portfolio",
        name: "fetch_wallet_portfolio",
        description: "Fetch token balances with prices for an EVM wallet.",
        required_features: &["evm"],
        default_rate_limit: PORTFOLIO_BURST,
        constructor: tools::portfolio::PortfolioTool::build_wallet,
    },
    SkillSpec {
        category: "portfolio",
        name: "fetch_nft_portfolio",
        description: "Fetch NFT holdings for an EVM wallet.",
        required_features: &["evm"],
        default_rate_limit: PORTFOLIO_BURST,
        constructor: tools::portfolio::PortfolioTool::build_nft,
    },
    SkillSpec {
        category: "portfolio",
        name: "fetch_transaction_history",
        description: "Fetch transaction history for an EVM wallet.",
        required_features: &["evm"],
        default_rate_limit: PORTFOLIO_BURST,
        constructor: tools::portfolio::PortfolioTool::build_history,
    },
    SkillSpec {
        category: "portfolio",
        name: "fetch_solana_portfolio",
        description: "Fetch SOL balance, SPL tokens and optionally NFTs for a Solana wallet.",
        required_features: &["solana"],
        default_rate_limit: PORTFOLIO_BURST,
        constructor: tools::portfolio::PortfolioTool::build_solana,
    },
];

/// Skills indexed by category, in registration order
pub struct SkillCatalog {
    categories: BTreeMap<&'static str, Vec<&'static SkillSpec>>,
}

impl SkillCatalog {
    pub fn builtin() -> Self {
        Self::from_specs(BUILTIN_SKILLS)
    }

    pub fn from_specs(specs: &'static [SkillSpec]) -> Self {
        let mut categories: BTreeMap<&'static str, Vec<&'static SkillSpec>> = BTreeMap::new();
        for spec in specs {
            categories.entry(spec.category).or_default().push(spec);
        }
        Self { categories }
    }

    pub fn get(&self, category: &str, name: &str) -> Option<&'static SkillSpec> {
        self.categories
            .get(category)?
            .iter()
            .copied()
            .find(|s| s.name == name)
    }

    pub fn contains_category(&self, category: &str) -> bool {
        self.categories.contains_key(category)
    }

    pub fn categories(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.categories.keys().copied()
    }

    pub fn skills(&self, category: &str) -> &[&'static SkillSpec] {
        self.categories.get(category).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn len(&self) -> usize {
        self.categories.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }
}

/// Everything a constructor may close over
pub struct SkillDeps<'a> {
    pub spec: &'static SkillSpec,
    pub ctx: ToolContext,
    pub clients: &'a ClientBundle,
}

impl SkillDeps<'_> {
    pub fn meta(&self, schema: ToolSchema) -> ToolMeta {
        ToolMeta {
            name: self.spec.name,
            category: self.spec.category,
            description: self.spec.description,
            schema,
        }
    }

    pub fn twitter(&self) -> Result<ClientHandle<TwitterClient>> {
        self.clients
            .twitter
            .clone()
            .ok_or_else(|| self.missing(Provider::Twitter.as_str()))
    }

    pub fn wallet(&self) -> Result<ClientHandle<WalletClient>> {
        self.clients
            .wallet
            .clone()
            .ok_or_else(|| self.missing(Provider::CdpWallet.as_str()))
    }

    pub fn portfolio(&self) -> Result<Arc<dyn PortfolioProvider>> {
        self.clients
            .portfolio
            .clone()
            .ok_or_else(|| self.missing("portfolio (api_key)"))
    }

    fn missing(&self, provider: &str) -> SkillError {
        SkillError::MissingClient {
            skill: self.spec.name.to_string(),
            provider: provider.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_catalog_lookup() {
        let catalog = SkillCatalog::builtin();
        assert_eq!(catalog.len(), 10);
        assert!(catalog.contains_category("portfolio"));
        assert!(!catalog.contains_category("defillama"));

        let post = catalog.get("twitter", "twitter_post_tweet").unwrap();
        assert_eq!(post.default_rate_limit, Some(RateLimitPolicy::new(24, 1440)));
        assert!(catalog.get("twitter", "current_time").is_none());
        assert!(catalog.get("common", "current_time").unwrap().default_rate_limit.is_none());
    }

    #[test]
    fn test_names_are_unique_within_category() {
        let catalog = SkillCatalog::builtin();
        for category in catalog.categories() {
            let mut names: Vec<_> = catalog.skills(category).iter().map(|s| s.name).collect();
            let total = names.len();
            names.sort_unstable();
            names.dedup();
            assert_eq!(names.len(), total, "duplicate skill in {}", category);
        }
    }

    #[test]
    fn test_feature_predicate() {
        let catalog = SkillCatalog::builtin();
        let solana = catalog.get("portfolio", "fetch_solana_portfolio").unwrap();

        let mut flags = FeatureFlags::new();
        assert!(solana.features_enabled(&flags));
        flags.insert("evm".into(), false);
        assert!(solana.features_enabled(&flags));
        flags.insert("solana".into(), false);
        assert!(!solana.features_enabled(&flags));
    }
}

//! Twitter tools
//!
//! Platform rate limits apply only to OAuth2 (platform-owned app) mode.
//! Agents posting with their own app key are limited by Twitter alone.

use async_trait::async_trait;
use chrono::Duration;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::debug;

use super::{req_str, Tool, ToolContext, ToolMeta, ToolSchema};
use crate::clients::twitter::{TweetQuery, TwitterClient};
use crate::clients::ClientHandle;
use crate::error::{Result, SkillError};
use crate::skills::catalog::SkillDeps;

/// Longest tweet text accepted
pub const MAX_TWEET_CHARS: usize = 280;

/// Skill-store key for incremental fetch state
pub const LAST_KEY: &str = "last";

const FIRST_PAGE_SIZE: u32 = 10;
const INCREMENTAL_PAGE_SIZE: u32 = 100;

fn tweet_text(input: &Value) -> Result<&str> {
    let text = req_str(input, "text")?;
    let chars = text.chars().count();
    if chars > MAX_TWEET_CHARS {
        return Err(SkillError::invalid_input(format!(
            "Tweet text is {} characters, the limit is {}",
            chars, MAX_TWEET_CHARS
        )));
    }
    Ok(text)
}

/// Client for this call, with the platform limit applied in OAuth2 mode
async fn client_for_call(
    ctx: &ToolContext,
    twitter: &ClientHandle<TwitterClient>,
    skill: &str,
) -> Result<Arc<TwitterClient>> {
    let client = twitter.get().await?;
    if !client.uses_key() {
        ctx.check_rate_limit(skill).await?;
    }
    Ok(client)
}

pub struct PostTweet {
    meta: ToolMeta,
    ctx: ToolContext,
    twitter: ClientHandle<TwitterClient>,
}

impl PostTweet {
    pub fn build(deps: &SkillDeps<'_>) -> Result<Arc<dyn Tool>> {
        let schema = ToolSchema::new().with_string_param(
            "text",
            "The text content of the tweet to post (max 280 characters)",
            true,
        );
        Ok(Arc::new(Self {
            meta: deps.meta(schema),
            ctx: deps.ctx.clone(),
            twitter: deps.twitter()?,
        }))
    }
}

#[async_trait]
impl Tool for PostTweet {
    fn meta(&self) -> &ToolMeta {
        &self.meta
    }

    async fn run(&self, input: Value) -> Result<Value> {
        let text = tweet_text(&input)?;
        let client = client_for_call(&self.ctx, &self.twitter, self.name()).await?;
        let tweet_id = client.post_tweet(text, None).await?;
        Ok(json!({ "tweet_id": tweet_id }))
    }
}

pub struct ReplyTweet {
    meta: ToolMeta,
    ctx: ToolContext,
    twitter: ClientHandle<TwitterClient>,
}

impl ReplyTweet {
    pub fn build(deps: &SkillDeps<'_>) -> Result<Arc<dyn Tool>> {
        let schema = ToolSchema::new()
            .with_string_param("tweet_id", "The ID of the tweet to reply to", true)
            .with_string_param(
                "text",
                "The text content of the reply (max 280 characters)",
                true,
            );
        Ok(Arc::new(Self {
            meta: deps.meta(schema),
            ctx: deps.ctx.clone(),
            twitter: deps.twitter()?,
        }))
    }
}

#[async_trait]
impl Tool for ReplyTweet {
    fn meta(&self) -> &ToolMeta {
        &self.meta
    }

    async fn run(&self, input: Value) -> Result<Value> {
        let parent = req_str(&input, "tweet_id")?;
        let text = tweet_text(&input)?;
        let client = client_for_call(&self.ctx, &self.twitter, self.name()).await?;
        let tweet_id = client.post_tweet(text, Some(parent)).await?;
        Ok(json!({ "tweet_id": tweet_id, "in_reply_to": parent }))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Feed {
    Mentions,
    Timeline,
}

/// Incremental mentions/timeline reader
///
/// Remembers the newest tweet id under `"last"` so the next call only sees
/// new tweets. Every call is bounded to the last day.
pub struct TwitterFeed {
    meta: ToolMeta,
    ctx: ToolContext,
    twitter: ClientHandle<TwitterClient>,
    feed: Feed,
}

impl TwitterFeed {
    pub fn build_mentions(deps: &SkillDeps<'_>) -> Result<Arc<dyn Tool>> {
        Self::build(deps, Feed::Mentions)
    }

    pub fn build_timeline(deps: &SkillDeps<'_>) -> Result<Arc<dyn Tool>> {
        Self::build(deps, Feed::Timeline)
    }

    fn build(deps: &SkillDeps<'_>, feed: Feed) -> Result<Arc<dyn Tool>> {
        Ok(Arc::new(Self {
            meta: deps.meta(ToolSchema::new()),
            ctx: deps.ctx.clone(),
            twitter: deps.twitter()?,
            feed,
        }))
    }

    async fn since_id(&self) -> Result<Option<String>> {
        let last = self.ctx.recall(self.name(), LAST_KEY).await?;
        Ok(last
            .as_ref()
            .and_then(|v| v.get("since_id"))
            .and_then(Value::as_str)
            .map(str::to_string))
    }
}

#[async_trait]
impl Tool for TwitterFeed {
    fn meta(&self) -> &ToolMeta {
        &self.meta
    }

    async fn run(&self, _input: Value) -> Result<Value> {
        let client = client_for_call(&self.ctx, &self.twitter, self.name()).await?;

        let since_id = self.since_id().await?;
        let query = TweetQuery {
            max_results: if since_id.is_some() {
                INCREMENTAL_PAGE_SIZE
            } else {
                FIRST_PAGE_SIZE
            },
            since_id,
            start_time: Some(self.ctx.clock.now() - Duration::days(1)),
        };

        let user_id = client.user_id().await?;
        let page = match self.feed {
            Feed::Mentions => client.mentions(&user_id, &query).await?,
            Feed::Timeline => client.timeline(&user_id, &query).await?,
        };

        if let Some(newest) = &page.newest_id {
            self.ctx
                .remember(self.name(), LAST_KEY, json!({ "since_id": newest }))
                .await?;
        }
        debug!(
            "{} fetched {} tweets for agent {}",
            self.name(),
            page.tweets.len(),
            self.ctx.agent_id
        );

        let key = match self.feed {
            Feed::Mentions => "mentions",
            Feed::Timeline => "tweets",
        };
        let mut out = serde_json::Map::new();
        out.insert(key.to_string(), serde_json::to_value(&page.tweets)?);
        Ok(Value::Object(out))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tweet_text_limit() {
        assert!(tweet_text(&json!({"text": "gm"})).is_ok());

        let long = "a".repeat(MAX_TWEET_CHARS + 1);
        let err = tweet_text(&json!({ "text": long })).unwrap_err();
        assert!(matches!(err, SkillError::InvalidInput(_)));

        // Counted in characters, not bytes
        let emoji = "🚀".repeat(MAX_TWEET_CHARS);
        assert!(tweet_text(&json!({ "text": emoji })).is_ok());
    }

    #[test]
    fn test_empty_text_is_rejected() {
        assert!(tweet_text(&json!({"text": ""})).is_err());
    }
}

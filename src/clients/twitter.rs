//! Twitter (X) API v2 client
//!
//! Two auth modes:
//! - **App key**: the agent owner configured their own consumer key and
//!   access token. Requests are OAuth1-signed and connecting resolves the
//!   account identity into `AgentData`.
//! - **OAuth2**: the agent's linked user token, read from `AgentData`.
//!   These tokens expire and the client reports that to the cache.

use chrono::{DateTime, Utc};
use reqwest::{Method, RequestBuilder};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::info;

use super::oauth1::OAuth1Credentials;
use super::ProviderClient;
use crate::agent::AgentDataPatch;
use crate::error::{Result, SkillError};
use crate::http::{endpoint, read_json, HttpSettings};
use crate::skills::SkillConfig;
use crate::store::SkillStore;

/// Skill category served by this client
pub const CATEGORY: &str = "twitter";

/// `SkillConfig.extra` keys for app-key mode; all four must be set
pub const CONSUMER_KEY: &str = "consumer_key";
pub const CONSUMER_SECRET: &str = "consumer_secret";
pub const ACCESS_TOKEN: &str = "access_token";
pub const ACCESS_TOKEN_SECRET: &str = "access_token_secret";

/// Cache fingerprint of OAuth2 mode, whose token lives in `AgentData`
pub const OAUTH2_FINGERPRINT: &str = "oauth2";

const TWEET_FIELDS: &str = "created_at,author_id,text,referenced_tweets,attachments";
const EXPANSIONS: &str = "referenced_tweets.id,attachments.media_keys";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TwitterAuth {
    AppKey,
    OAuth2 { expires_at: DateTime<Utc> },
}

/// Authenticated account identity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TwitterUser {
    pub id: String,
    pub username: String,
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tweet {
    pub id: String,
    pub text: String,
    #[serde(default)]
    pub author_id: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub referenced_tweets: Option<Value>,
    #[serde(default)]
    pub attachments: Option<Value>,
}

/// One page of tweets plus the cursor for the next incremental fetch
#[derive(Debug, Clone, Default, Serialize)]
pub struct TweetPage {
    pub tweets: Vec<Tweet>,
    pub newest_id: Option<String>,
}

/// Query for incremental tweet listings
#[derive(Debug, Clone, Default)]
pub struct TweetQuery {
    pub max_results: u32,
    pub since_id: Option<String>,
    pub start_time: Option<DateTime<Utc>>,
}

enum Credentials {
    Bearer(String),
    User(OAuth1Credentials),
}

/// Owner-supplied app keys from the category config, when complete
pub fn app_keys(config: &SkillConfig) -> Option<OAuth1Credentials> {
    Some(OAuth1Credentials {
        consumer_key: config.extra(CONSUMER_KEY)?.to_string(),
        consumer_secret: config.extra(CONSUMER_SECRET)?.to_string(),
        access_token: config.extra(ACCESS_TOKEN)?.to_string(),
        access_token_secret: config.extra(ACCESS_TOKEN_SECRET)?.to_string(),
    })
}

/// Identifies the credential inputs a cached client was built from
pub fn fingerprint(keys: Option<&OAuth1Credentials>) -> String {
    match keys {
        Some(keys) => keys.fingerprint(),
        None => OAUTH2_FINGERPRINT.to_string(),
    }
}

pub struct TwitterClient {
    agent_id: String,
    http: reqwest::Client,
    base_url: String,
    credentials: Credentials,
    auth: TwitterAuth,
    user: Option<TwitterUser>,
}

impl TwitterClient {
    /// Build a client from the agent's credentials
    ///
    /// App-key mode performs one API call to resolve the account identity.
    pub async fn connect(
        agent_id: &str,
        store: Arc<dyn SkillStore>,
        http: &HttpSettings,
        app_keys: Option<&OAuth1Credentials>,
    ) -> Result<Self> {
        if let Some(keys) = app_keys {
            let mut client = Self {
                agent_id: agent_id.to_string(),
                http: http.client.clone(),
                base_url: http.twitter_api_base.clone(),
                credentials: Credentials::User(keys.clone()),
                auth: TwitterAuth::AppKey,
                user: None,
            };
            let me = client.fetch_me().await?;
            store
                .set_agent_data(
                    agent_id,
                    AgentDataPatch::twitter_identity(&me.id, &me.username, &me.name),
                )
                .await?;
            info!(
                "Twitter client initialized for agent {} with app key (@{})",
                agent_id, me.username
            );
            client.user = Some(me);
            return Ok(client);
        }

        let data = store.get_agent_data(agent_id).await?;
        let token = data
            .twitter_access_token
            .filter(|t| !t.is_empty())
            .ok_or_else(|| {
                SkillError::credential(format!("[{}] Twitter access token not found", agent_id))
            })?;
        let expires_at = data.twitter_access_token_expires_at.ok_or_else(|| {
            SkillError::credential(format!(
                "[{}] Twitter access token expiration not found",
                agent_id
            ))
        })?;
        let user = match (data.twitter_id, data.twitter_username) {
            (Some(id), Some(username)) => Some(TwitterUser {
                id,
                username,
                name: data.twitter_name.unwrap_or_default(),
            }),
            _ => None,
        };

        Ok(Self {
            agent_id: agent_id.to_string(),
            http: http.client.clone(),
            base_url: http.twitter_api_base.clone(),
            credentials: Credentials::Bearer(token),
            auth: TwitterAuth::OAuth2 { expires_at },
            user,
        })
    }

    pub fn auth(&self) -> TwitterAuth {
        self.auth
    }

    pub fn uses_key(&self) -> bool {
        self.auth == TwitterAuth::AppKey
    }

    pub fn user(&self) -> Option<&TwitterUser> {
        self.user.as_ref()
    }

    /// Authenticated account id, resolved remotely when not yet known
    pub async fn user_id(&self) -> Result<String> {
        match &self.user {
            Some(user) => Ok(user.id.clone()),
            None => Ok(self.fetch_me().await?.id),
        }
    }

    /// Authorized request; `query` is signed in app-key mode
    fn request(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<RequestBuilder> {
        let url = endpoint(&self.base_url, path);
        let builder = self.http.request(method.clone(), &url).query(query);
        Ok(match &self.credentials {
            Credentials::Bearer(token) => builder.bearer_auth(token),
            Credentials::User(keys) => builder.header(
                reqwest::header::AUTHORIZATION,
                keys.authorization(method.as_str(), &url, query)?,
            ),
        })
    }

    async fn fetch_me(&self) -> Result<TwitterUser> {
        let response = self.request(Method::GET, "/2/users/me", &[])?.send().await?;
        let body = read_json(response).await?;
        let data = body.get("data").cloned().ok_or_else(|| SkillError::Upstream {
            status: 200,
            message: format!("[{}] users/me returned no data", self.agent_id),
        })?;
        Ok(serde_json::from_value(data)?)
    }

    /// Post a tweet, optionally as a reply. Returns the new tweet id.
    pub async fn post_tweet(&self, text: &str, in_reply_to: Option<&str>) -> Result<String> {
        let mut body = json!({ "text": text });
        if let Some(parent) = in_reply_to {
            body["reply"] = json!({ "in_reply_to_tweet_id": parent });
        }

        let response = self
            .request(Method::POST, "/2/tweets", &[])?
            .json(&body)
            .send()
            .await?;
        let body = read_json(response).await?;

        body.pointer("/data/id")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| SkillError::Upstream {
                status: 200,
                message: "Failed to post tweet: no id in response".to_string(),
            })
    }

    /// Tweets mentioning the given user
    pub async fn mentions(&self, user_id: &str, query: &TweetQuery) -> Result<TweetPage> {
        let path = format!("/2/users/{}/mentions", user_id);
        self.list(&path, query).await
    }

    /// Home timeline of the given user
    pub async fn timeline(&self, user_id: &str, query: &TweetQuery) -> Result<TweetPage> {
        let path = format!("/2/users/{}/timelines/reverse_chronological", user_id);
        self.list(&path, query).await
    }

    async fn list(&self, path: &str, query: &TweetQuery) -> Result<TweetPage> {
        let mut params: Vec<(&str, String)> = vec![
            ("max_results", query.max_results.to_string()),
            ("tweet.fields", TWEET_FIELDS.to_string()),
            ("expansions", EXPANSIONS.to_string()),
        ];
        if let Some(since_id) = &query.since_id {
            params.push(("since_id", since_id.clone()));
        }
        if let Some(start) = query.start_time {
            params.push((
                "start_time",
                start.to_rfc3339_opts(chrono::SecondsFormat::Millis, true),
            ));
        }

        let response = self.request(Method::GET, path, &params)?.send().await?;
        let body = read_json(response).await?;
        parse_page(&body)
    }
}

impl ProviderClient for TwitterClient {
    fn expires_at(&self) -> Option<DateTime<Utc>> {
        match self.auth {
            TwitterAuth::AppKey => None,
            TwitterAuth::OAuth2 { expires_at } => Some(expires_at),
        }
    }
}

fn parse_page(body: &Value) -> Result<TweetPage> {
    let tweets = match body.get("data") {
        Some(data) => serde_json::from_value(data.clone())?,
        None => Vec::new(),
    };
    let newest_id = body
        .pointer("/meta/newest_id")
        .and_then(Value::as_str)
        .map(str::to_string);
    Ok(TweetPage { tweets, newest_id })
}

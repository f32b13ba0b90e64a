//! Error taxonomy for skill resolution and tool execution.
//!
//! Errors split into two audiences:
//! - **User-facing**: rate limits, credential problems, upstream failures and
//!   bad input. Tools render these as text for the end user.
//! - **Operator-facing**: catalog/config mismatches and infrastructure
//!   failures. These propagate so they show up in logs.

use thiserror::Error;

/// Errors raised while resolving skills or running tools
#[derive(Debug, Clone, Error)]
pub enum SkillError {
    #[error("{0}")]
    RateLimitExceeded(String),

    #[error("Credential error: {0}")]
    Credential(String),

    #[error("Upstream API error ({status}): {message}")]
    Upstream { status: u16, message: String },

    #[error("Upstream request timed out: {0}")]
    Timeout(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Unknown skill '{name}' in category '{category}'")]
    UnknownSkill { category: String, name: String },

    #[error("Skill '{skill}' requires the {provider} client, which is not configured")]
    MissingClient { skill: String, provider: String },

    #[error("Store error: {0}")]
    Store(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, SkillError>;

impl SkillError {
    pub fn rate_limited(message: impl Into<String>) -> Self {
        Self::RateLimitExceeded(message.into())
    }

    pub fn credential(message: impl Into<String>) -> Self {
        Self::Credential(message.into())
    }

    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }

    /// Whether the error should be rendered for the end user at the tool
    /// boundary instead of propagating
    pub fn is_user_facing(&self) -> bool {
        matches!(
            self,
            SkillError::RateLimitExceeded(_)
                | SkillError::Credential(_)
                | SkillError::Upstream { .. }
                | SkillError::Timeout(_)
                | SkillError::InvalidInput(_)
        )
    }

    /// Short machine-readable kind, used in structured tool output
    pub fn kind(&self) -> &'static str {
        match self {
            SkillError::RateLimitExceeded(_) => "rate_limit_exceeded",
            SkillError::Credential(_) => "credential",
            SkillError::Upstream { .. } => "upstream",
            SkillError::Timeout(_) => "timeout",
            SkillError::InvalidInput(_) => "invalid_input",
            SkillError::UnknownSkill { .. } => "unknown_skill",
            SkillError::MissingClient { .. } => "missing_client",
            SkillError::Store(_) => "store",
            SkillError::Internal(_) => "internal",
        }
    }
}

impl From<rusqlite::Error> for SkillError {
    fn from(e: rusqlite::Error) -> Self {
        SkillError::Store(e.to_string())
    }
}

impl From<serde_json::Error> for SkillError {
    fn from(e: serde_json::Error) -> Self {
        SkillError::Internal(format!("JSON error: {}", e))
    }
}

impl From<reqwest::Error> for SkillError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            return SkillError::Timeout(e.to_string());
        }
        match e.status() {
            Some(status) => SkillError::Upstream {
                status: status.as_u16(),
                message: e.to_string(),
            },
            None if e.is_decode() => SkillError::Upstream {
                status: 200,
                message: format!("malformed response: {}", e),
            },
            None => SkillError::Upstream {
                status: 0,
                message: e.to_string(),
            },
        }
    }
}

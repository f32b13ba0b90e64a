//! Tool Surface
//!
//! What the agent executor sees: named tools with a JSON schema and an
//! async `call`. Each tool:
//! - validates input against its schema
//! - applies its rate limit (when it has one)
//! - fetches its client through a lazy handle
//! - calls the provider
//!
//! User-facing failures come back as `ToolOutput::Error` text. Operator
//! failures propagate as `Err`.

pub mod common;
pub mod portfolio;
pub mod twitter;
pub mod wallet;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, error};

use crate::clock::Clock;
use crate::error::{Result, SkillError};
use crate::rate_limit::{RateLimitPolicy, RateLimiter};
use crate::store::SkillStore;

/// JSON schema for tool input
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolSchema {
    /// `{"type": "object", "properties": {...}}`
    pub parameters: Value,
    /// Required parameter names
    pub required: Vec<String>,
}

impl Default for ToolSchema {
    fn default() -> Self {
        Self::new()
    }
}

impl ToolSchema {
    pub fn new() -> Self {
        Self {
            parameters: json!({
                "type": "object",
                "properties": {}
            }),
            required: vec![],
        }
    }

    fn with_param(mut self, name: &str, spec: Value, required: bool) -> Self {
        if let Some(props) = self.parameters.get_mut("properties") {
            props[name] = spec;
        }
        if required {
            self.required.push(name.to_string());
        }
        self
    }

    /// Add a string parameter
    pub fn with_string_param(self, name: &str, description: &str, required: bool) -> Self {
        self.with_param(
            name,
            json!({ "type": "string", "description": description }),
            required,
        )
    }

    /// Add an integer parameter
    pub fn with_int_param(self, name: &str, description: &str, required: bool) -> Self {
        self.with_param(
            name,
            json!({ "type": "integer", "description": description }),
            required,
        )
    }

    /// Add a boolean parameter
    pub fn with_bool_param(self, name: &str, description: &str, required: bool) -> Self {
        self.with_param(
            name,
            json!({ "type": "boolean", "description": description }),
            required,
        )
    }

    /// Add an enum parameter
    pub fn with_enum_param(
        self,
        name: &str,
        description: &str,
        values: &[&str],
        required: bool,
    ) -> Self {
        self.with_param(
            name,
            json!({ "type": "string", "description": description, "enum": values }),
            required,
        )
    }

    /// Validate parameters against schema
    pub fn validate(&self, params: &Value) -> Result<()> {
        if !params.is_object() {
            return Err(SkillError::invalid_input("tool input must be a JSON object"));
        }

        for req in &self.required {
            if params.get(req).map_or(true, Value::is_null) {
                return Err(SkillError::invalid_input(format!(
                    "Missing required parameter: {}",
                    req
                )));
            }
        }

        let Some(props) = self.parameters.get("properties").and_then(Value::as_object) else {
            return Ok(());
        };
        for (name, schema) in props {
            let Some(value) = params.get(name).filter(|v| !v.is_null()) else {
                continue;
            };
            let expected_type = schema.get("type").and_then(Value::as_str);
            let valid = match expected_type {
                Some("string") => value.is_string(),
                Some("integer") => value.is_i64() || value.is_u64(),
                Some("number") => value.is_number(),
                Some("boolean") => value.is_boolean(),
                Some("array") => value.is_array(),
                Some("object") => value.is_object(),
                _ => true,
            };
            if !valid {
                return Err(SkillError::invalid_input(format!(
                    "Parameter '{}' has wrong type, expected {}",
                    name,
                    expected_type.unwrap_or("unknown")
                )));
            }
            if let Some(allowed) = schema.get("enum").and_then(Value::as_array) {
                if !allowed.contains(value) {
                    return Err(SkillError::invalid_input(format!(
                        "Parameter '{}' must be one of {}",
                        name,
                        Value::Array(allowed.clone())
                    )));
                }
            }
        }

        Ok(())
    }

    /// Full JSON schema object
    pub fn to_json_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": self.parameters.get("properties").cloned().unwrap_or_else(|| json!({})),
            "required": self.required
        })
    }
}

/// Static description of a tool
#[derive(Debug, Clone)]
pub struct ToolMeta {
    pub name: &'static str,
    pub category: &'static str,
    pub description: &'static str,
    pub schema: ToolSchema,
}

/// What the executor uses to pick a tool
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub input_schema: Value,
}

/// Result of one tool invocation as seen by the agent
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ToolOutput {
    Success { data: Value },
    Error { kind: String, message: String },
}

impl ToolOutput {
    pub fn from_error(e: &SkillError) -> Self {
        ToolOutput::Error {
            kind: e.kind().to_string(),
            message: e.to_string(),
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, ToolOutput::Error { .. })
    }

    /// Plain text for the model
    pub fn to_text(&self) -> String {
        match self {
            ToolOutput::Success { data: Value::String(s) } => s.clone(),
            ToolOutput::Success { data } => data.to_string(),
            ToolOutput::Error { message, .. } => message.clone(),
        }
    }
}

#[async_trait]
pub trait Tool: Send + Sync {
    fn meta(&self) -> &ToolMeta;

    async fn run(&self, input: Value) -> Result<Value>;

    fn name(&self) -> &str {
        self.meta().name
    }

    fn category(&self) -> &str {
        self.meta().category
    }

    fn description(&self) -> &str {
        self.meta().description
    }

    fn schema(&self) -> &ToolSchema {
        &self.meta().schema
    }

    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name().to_string(),
            description: self.description().to_string(),
            input_schema: self.schema().to_json_schema(),
        }
    }

    /// Validate, run, and apply the error boundary
    async fn call(&self, input: Value) -> Result<ToolOutput> {
        let result = match self.schema().validate(&input) {
            Ok(()) => self.run(input).await,
            Err(e) => Err(e),
        };

        match result {
            Ok(data) => Ok(ToolOutput::Success { data }),
            Err(e) if e.is_user_facing() => {
                debug!("Tool {} returned {}: {}", self.name(), e.kind(), e);
                Ok(ToolOutput::from_error(&e))
            }
            Err(e) => {
                error!("Tool {} failed: {}", self.name(), e);
                Err(e)
            }
        }
    }
}

/// Per-agent plumbing every tool closes over
#[derive(Clone)]
pub struct ToolContext {
    pub agent_id: String,
    pub store: Arc<dyn SkillStore>,
    pub limiter: RateLimiter,
    pub clock: Arc<dyn Clock>,
    /// Resolved limit for this tool; `None` is unlimited
    pub rate_limit: Option<RateLimitPolicy>,
}

impl ToolContext {
    pub fn with_rate_limit(&self, rate_limit: Option<RateLimitPolicy>) -> Self {
        Self {
            rate_limit,
            ..self.clone()
        }
    }

    pub async fn check_rate_limit(&self, skill: &str) -> Result<()> {
        self.limiter.enforce(&self.agent_id, skill, self.rate_limit).await
    }

    /// Cross-call memory for a skill
    pub async fn recall(&self, skill: &str, key: &str) -> Result<Option<Value>> {
        self.store.get_agent_skill_data(&self.agent_id, skill, key).await
    }

    pub async fn remember(&self, skill: &str, key: &str, value: Value) -> Result<()> {
        self.store
            .save_agent_skill_data(&self.agent_id, skill, key, value)
            .await
    }
}

/// Read an optional string field
pub(crate) fn opt_str<'a>(input: &'a Value, key: &str) -> Option<&'a str> {
    input.get(key).and_then(Value::as_str).filter(|s| !s.is_empty())
}

/// Read a required string field; schema validation has already run
pub(crate) fn req_str<'a>(input: &'a Value, key: &str) -> Result<&'a str> {
    opt_str(input, key)
        .ok_or_else(|| SkillError::invalid_input(format!("Parameter '{}' must not be empty", key)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schema() -> ToolSchema {
        ToolSchema::new()
            .with_string_param("text", "Tweet text", true)
            .with_int_param("limit", "Page size", false)
            .with_enum_param("network", "Cluster", &["mainnet", "devnet"], false)
    }

    #[test]
    fn test_validate_required_and_types() {
        let schema = schema();
        assert!(schema.validate(&json!({"text": "hi"})).is_ok());
        assert!(schema.validate(&json!({"text": "hi", "limit": 5})).is_ok());

        let err = schema.validate(&json!({})).unwrap_err();
        assert!(matches!(err, SkillError::InvalidInput(ref m) if m.contains("text")));

        let err = schema.validate(&json!({"text": "hi", "limit": "5"})).unwrap_err();
        assert!(err.to_string().contains("expected integer"));

        assert!(schema.validate(&json!("not an object")).is_err());
    }

    #[test]
    fn test_validate_enum() {
        let schema = schema();
        assert!(schema.validate(&json!({"text": "x", "network": "devnet"})).is_ok());
        assert!(schema.validate(&json!({"text": "x", "network": "testnet"})).is_err());
    }

    #[test]
    fn test_json_schema_shape() {
        let value = schema().to_json_schema();
        assert_eq!(value["type"], "object");
        assert_eq!(value["required"], json!(["text"]));
        assert_eq!(value["properties"]["limit"]["type"], "integer");
    }

    struct Failing {
        meta: ToolMeta,
        error: SkillError,
    }

    #[async_trait]
    impl Tool for Failing {
        fn meta(&self) -> &ToolMeta {
            &self.meta
        }

        async fn run(&self, _input: Value) -> Result<Value> {
            Err(self.error.clone())
        }
    }

    fn failing(error: SkillError) -> Failing {
        Failing {
            meta: ToolMeta {
                name: "failing",
                category: "test",
                description: "always fails",
                schema: ToolSchema::new(),
            },
            error,
        }
    }

    #[tokio::test]
    async fn test_user_facing_errors_become_output() {
        let tool = failing(SkillError::rate_limited("Rate limit exceeded"));
        let output = tool.call(json!({})).await.unwrap();
        assert!(output.is_error());
        assert_eq!(output.to_text(), "Rate limit exceeded");

        let tool = failing(SkillError::credential("token expired"));
        let output = tool.call(json!({})).await.unwrap();
        assert!(matches!(output, ToolOutput::Error { ref kind, .. } if kind == "credential"));
    }

    #[tokio::test]
    async fn test_operator_errors_propagate() {
        let tool = failing(SkillError::Store("disk full".into()));
        assert!(matches!(tool.call(json!({})).await, Err(SkillError::Store(_))));
    }

    #[tokio::test]
    async fn test_invalid_input_is_rendered_not_run() {
        let tool = failing(SkillError::Internal("must not run".into()));
        let output = tool.call(json!([1, 2])).await.unwrap();
        assert!(matches!(output, ToolOutput::Error { ref kind, .. } if kind == "invalid_input"));
    }
}

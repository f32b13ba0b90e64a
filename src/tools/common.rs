//! Client-free tools

use async_trait::async_trait;
use chrono_tz::Tz;
use serde_json::Value;
use std::sync::Arc;

use super::{opt_str, Tool, ToolContext, ToolMeta, ToolSchema};
use crate::error::Result;
use crate::skills::catalog::SkillDeps;

const COMMON_TIMEZONES: &[&str] = &[
    "US/Eastern",
    "US/Central",
    "US/Pacific",
    "Europe/London",
    "Europe/Paris",
    "Europe/Berlin",
    "Asia/Shanghai",
    "Asia/Tokyo",
    "Asia/Singapore",
    "Australia/Sydney",
];

pub struct CurrentTime {
    meta: ToolMeta,
    ctx: ToolContext,
}

impl CurrentTime {
    pub fn build(deps: &SkillDeps<'_>) -> Result<Arc<dyn Tool>> {
        let schema = ToolSchema::new().with_string_param(
            "timezone",
            "IANA timezone to format the time in (e.g. 'UTC', 'US/Pacific', 'Europe/London'). Default is UTC.",
            false,
        );
        Ok(Arc::new(Self {
            meta: deps.meta(schema),
            ctx: deps.ctx.clone(),
        }))
    }
}

#[async_trait]
impl Tool for CurrentTime {
    fn meta(&self) -> &ToolMeta {
        &self.meta
    }

    async fn run(&self, input: Value) -> Result<Value> {
        self.ctx.check_rate_limit(self.name()).await?;

        let now = self.ctx.clock.now();
        let requested = opt_str(&input, "timezone").unwrap_or("UTC");

        let text = match requested.parse::<Tz>() {
            Ok(tz) => format!(
                "Current time: {}",
                now.with_timezone(&tz).format("%Y-%m-%d %H:%M:%S %Z")
            ),
            Err(_) => {
                let suggestions = COMMON_TIMEZONES
                    .iter()
                    .map(|tz| format!("'{}'", tz))
                    .collect::<Vec<_>>()
                    .join(", ");
                format!(
                    "Current time: {}\nUnknown timezone '{}', showing UTC instead. Some common timezone options: {}",
                    now.format("%Y-%m-%d %H:%M:%S UTC"),
                    requested,
                    suggestions
                )
            }
        };

        Ok(Value::String(text))
    }
}

//! CDP wallet tools

use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::Arc;

use super::{opt_str, Tool, ToolContext, ToolMeta, ToolSchema};
use crate::clients::{ClientHandle, WalletClient};
use crate::error::Result;
use crate::skills::catalog::SkillDeps;

pub struct GetBalance {
    meta: ToolMeta,
    ctx: ToolContext,
    wallet: ClientHandle<WalletClient>,
}

impl GetBalance {
    pub fn build(deps: &SkillDeps<'_>) -> Result<Arc<dyn Tool>> {
        let schema = ToolSchema::new().with_string_param(
            "asset_id",
            "Asset to query (e.g. 'eth', 'usdc'). Omit to list every balance.",
            false,
        );
        Ok(Arc::new(Self {
            meta: deps.meta(schema),
            ctx: deps.ctx.clone(),
            wallet: deps.wallet()?,
        }))
    }
}

#[async_trait]
impl Tool for GetBalance {
    fn meta(&self) -> &ToolMeta {
        &self.meta
    }

    async fn run(&self, input: Value) -> Result<Value> {
        self.ctx.check_rate_limit(self.name()).await?;
        let wallet = self.wallet.get().await?;

        let balances = match opt_str(&input, "asset_id") {
            Some(asset) => wallet.get_balance(&asset.to_lowercase()).await?,
            None => wallet.list_balances().await?,
        };

        Ok(json!({
            "address": wallet.address(),
            "network": wallet.network(),
            "balances": balances,
        }))
    }
}

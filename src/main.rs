//! skillgate - Entry Point
//!
//! Resolves an agent's tools for one request context and prints their
//! definitions as JSON on stdout. Logs go to stderr.

use anyhow::{anyhow, bail, Result};
use skillgate::{
    AgentConfig, Config, RequestContext, SkillConfig, SkillEngine, SkillState, SkillStore,
    SqliteSkillStore,
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

struct Args {
    agent: Option<PathBuf>,
    privileged: bool,
    flags: Vec<(String, bool)>,
    json_logs: bool,
    help: bool,
}

fn parse_args(raw: impl Iterator<Item = String>) -> Result<Args> {
    let mut args = Args {
        agent: None,
        privileged: false,
        flags: Vec::new(),
        json_logs: false,
        help: false,
    };

    let mut raw = raw.skip(1);
    while let Some(arg) = raw.next() {
        match arg.as_str() {
            "--agent" | "-a" => {
                let path = raw.next().ok_or_else(|| anyhow!("--agent needs a file path"))?;
                args.agent = Some(PathBuf::from(path));
            }
            "--privileged" | "-p" => args.privileged = true,
            "--flag" | "-f" => {
                let spec = raw.next().ok_or_else(|| anyhow!("--flag needs name=bool"))?;
                let (name, value) = spec
                    .split_once('=')
                    .ok_or_else(|| anyhow!("--flag expects name=bool, got '{}'", spec))?;
                let enabled = value
                    .parse::<bool>()
                    .map_err(|_| anyhow!("--flag {}: '{}' is not true/false", name, value))?;
                args.flags.push((name.to_string(), enabled));
            }
            "--json" => args.json_logs = true,
            "--help" | "-h" => args.help = true,
            other => bail!("unknown argument '{}' (try --help)", other),
        }
    }

    Ok(args)
}

fn print_help() {
    println!("skillgate v{}", env!("CARGO_PKG_VERSION"));
    println!();
    println!("Usage: skillgate [OPTIONS]");
    println!();
    println!("Options:");
    println!("  --agent, -a FILE       Agent definition (TOML). Default: a demo agent with common skills");
    println!("  --privileged, -p       Resolve as the agent owner (includes private skills)");
    println!("  --flag, -f NAME=BOOL   Request feature flag, repeatable (e.g. solana=false)");
    println!("  --json                 Log as JSON");
    println!("  --help, -h             Show this help");
    println!();
    println!("Environment variables:");
    println!("  SKILLGATE_DB_PATH                 Skill store database");
    println!("  SKILLGATE_HTTP_TIMEOUT_SECS       Provider call timeout (default: 30)");
    println!("  SKILLGATE_CLIENT_CACHE_CAPACITY   Cached clients (default: 10000)");
    println!("  SKILLGATE_TWITTER_API_BASE        Twitter API base URL");
    println!("  SKILLGATE_MORALIS_API_BASE        Moralis EVM API base URL");
    println!("  SKILLGATE_SOLANA_API_BASE         Moralis Solana API base URL");
    println!("  CDP_API_KEY_NAME                  Platform CDP key name");
    println!("  CDP_API_KEY_PRIVATE_KEY           Platform CDP private key");
    println!("  CDP_API_BASE_URL                  CDP API base URL");
}

fn demo_agent() -> AgentConfig {
    AgentConfig::new("demo").with_skills(
        "common",
        SkillConfig::default().with_state("current_time", SkillState::Public),
    )
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment
    dotenvy::dotenv().ok();

    let args = parse_args(std::env::args())?;
    if args.help {
        print_help();
        return Ok(());
    }

    let log_level = std::env::var("RUST_LOG")
        .map(|s| match s.to_lowercase().as_str() {
            "trace" => Level::TRACE,
            "debug" => Level::DEBUG,
            "info" => Level::INFO,
            "error" => Level::ERROR,
            _ => Level::WARN,
        })
        .unwrap_or(Level::WARN);

    // stdout carries the definitions, so logs always go to stderr
    if args.json_logs {
        let subscriber = FmtSubscriber::builder()
            .with_max_level(log_level)
            .with_writer(std::io::stderr)
            .with_ansi(false)
            .json()
            .finish();
        tracing::subscriber::set_global_default(subscriber)?;
    } else {
        let subscriber = FmtSubscriber::builder()
            .with_max_level(log_level)
            .with_writer(std::io::stderr)
            .finish();
        tracing::subscriber::set_global_default(subscriber)?;
    }

    let config = Config::from_env()?;
    let store = SqliteSkillStore::open(&config.db_path)?;
    for (key, value) in config.system_config_seed() {
        store.set_system_config(key, &value)?;
    }
    info!("skillgate v{} using {}", env!("CARGO_PKG_VERSION"), config.db_path.display());

    let store: Arc<dyn SkillStore> = Arc::new(store);
    let engine = SkillEngine::from_config(&config, store)?;

    let agent = match &args.agent {
        Some(path) => AgentConfig::from_toml_file(path)?,
        None => demo_agent(),
    };

    let mut request = if args.privileged {
        RequestContext::privileged()
    } else {
        RequestContext::public()
    };
    for (name, enabled) in &args.flags {
        request = request.with_flag(name, *enabled);
    }

    let definitions = engine.definitions_for(&agent, &request)?;
    info!("Agent {} exposes {} tools", agent.id, definitions.len());
    println!("{}", serde_json::to_string_pretty(&definitions)?);

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(items: &[&str]) -> Result<Args> {
        parse_args(
            std::iter::once("skillgate")
                .chain(items.iter().copied())
                .map(String::from),
        )
    }

    #[test]
    fn test_parse_args() {
        let args = parse(&["--agent", "bot.toml", "-p", "--flag", "solana=false", "--json"]).unwrap();
        assert_eq!(args.agent, Some(PathBuf::from("bot.toml")));
        assert!(args.privileged);
        assert_eq!(args.flags, vec![("solana".to_string(), false)]);
        assert!(args.json_logs);
        assert!(!args.help);
    }

    #[test]
    fn test_parse_args_errors() {
        assert!(parse(&["--agent"]).is_err());
        assert!(parse(&["--flag", "solana"]).is_err());
        assert!(parse(&["--flag", "solana=maybe"]).is_err());
        assert!(parse(&["--serve"]).is_err());
    }
}

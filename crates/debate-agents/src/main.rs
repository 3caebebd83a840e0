use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, warn};

use coordination::debate::{DebateConfig, DebateOrchestrator};
use coordination::gateway::{GatewayConfig, InMemoryResponseCache, ModelGateway};
use coordination::Pool;
use debate_agents::{AgentsConfig, HttpBackend};

/// Run one generator/critic/judge debate over a task and print the outcome.
#[derive(Debug, Parser)]
#[command(name = "debate-agents", version)]
struct Args {
    /// Task statement handed to every generator.
    task: String,

    /// Model pool: fast, balanced or heavy.
    #[arg(long)]
    pool: Option<Pool>,

    /// Concurrent generators in the proposal round.
    #[arg(long)]
    generators: Option<usize>,

    /// Single proposal plus a combined review call.
    #[arg(long)]
    fast: bool,

    #[arg(long, value_name = "FILE")]
    gateway_config: Option<PathBuf>,

    #[arg(long, value_name = "FILE")]
    debate_config: Option<PathBuf>,

    /// Lifetime of cached responses used when the fallback chain is exhausted.
    #[arg(long, default_value_t = 600)]
    cache_ttl_secs: u64,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let args = Args::parse();

    let gateway_config = match &args.gateway_config {
        Some(path) => GatewayConfig::load(path)
            .with_context(|| format!("Failed to load gateway config {}", path.display()))?,
        None => GatewayConfig::default(),
    };
    let mut debate_config = match &args.debate_config {
        Some(path) => DebateConfig::load(path)
            .with_context(|| format!("Failed to load debate config {}", path.display()))?,
        None => DebateConfig::default(),
    };
    if let Some(pool) = args.pool {
        debate_config = debate_config.with_pool(pool);
    }
    if let Some(generators) = args.generators {
        debate_config = debate_config.with_generators(generators);
    }
    if args.fast {
        debate_config = debate_config.with_fast_mode(true);
    }

    let mut providers: Vec<&str> = gateway_config
        .models
        .values()
        .map(|spec| spec.provider.as_str())
        .collect();
    providers.sort_unstable();
    providers.dedup();
    let agents_config = AgentsConfig::from_env(&providers);
    info!(
        url = %agents_config.default_endpoint.url,
        overrides = agents_config.providers.len(),
        pool = %debate_config.pool,
        generators = debate_config.max_generators,
        fast = debate_config.fast_mode,
        "Debate agents starting"
    );

    let backend = HttpBackend::new(agents_config)?;
    let gateway = ModelGateway::new(gateway_config, Arc::new(backend)).with_cache(Arc::new(
        InMemoryResponseCache::new(Duration::from_secs(args.cache_ttl_secs)),
    ));
    let orchestrator = DebateOrchestrator::new(gateway);

    let result = orchestrator
        .run_debate(&args.task, &debate_config)
        .await
        .context("Debate configuration rejected")?;

    println!(
        "{}",
        serde_json::to_string_pretty(&result).context("Failed to serialize debate result")?
    );

    if result.allowed {
        info!("{}", result.summary_line());
        Ok(ExitCode::SUCCESS)
    } else {
        warn!("{}", result.summary_line());
        Ok(ExitCode::from(2))
    }
}

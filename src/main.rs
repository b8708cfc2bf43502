//! dubuu - invoke a Dubuu marketplace method and wait for confirmation
//!
//! Reads the provider (endpoint + wallet) from the config file and the
//! `ANCHOR_PROVIDER_URL` / `ANCHOR_WALLET` environment variables, invokes
//! one program method (`initialize` by default) and logs the resulting
//! transaction signature once the target finality is reached.

#![deny(unused_imports)]
#![deny(unused_mut)]
#![deny(unused_variables)]
#![warn(unused_must_use)]

use anyhow::{anyhow, bail, Context, Result};
use clap::Parser;
use dubuu_client::endpoints;
use dubuu_client::observability::{CorrelationId, TraceContext};
use dubuu_client::program::ArgValue;
use dubuu_client::types::FinalityLevel;
use dubuu_client::wallet::WalletManager;
use dubuu_client::{ClientError, Config, ProgramClient};
use solana_sdk::pubkey::Pubkey;
use std::str::FromStr;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Command line arguments
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "config.toml")]
    config: String,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Emit logs as JSON
    #[arg(long)]
    json_logs: bool,

    /// Serve metrics on this port (overrides the config file)
    #[arg(long)]
    metrics_port: Option<u16>,

    /// Program method to invoke
    #[arg(short, long, default_value = "initialize")]
    method: String,

    /// Account reference as name=pubkey; repeatable
    #[arg(short, long = "account", value_parser = parse_account)]
    accounts: Vec<(String, Pubkey)>,

    /// Method arguments as a JSON array, in schema order
    #[arg(long)]
    args: Option<String>,

    /// Simulate only; do not submit
    #[arg(long)]
    dry_run: bool,

    /// Confirmation timeout in seconds (overrides the config file)
    #[arg(long)]
    timeout_secs: Option<u64>,

    /// Finality to wait for: processed, confirmed or finalized
    #[arg(long)]
    finality: Option<String>,
}

fn parse_account(raw: &str) -> Result<(String, Pubkey), String> {
    let (name, key) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected name=pubkey, got '{}'", raw))?;
    let key = Pubkey::from_str(key.trim()).map_err(|e| format!("{}: {}", name, e))?;
    Ok((name.trim().to_string(), key))
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose, args.json_logs)?;

    info!("Version: {}", env!("CARGO_PKG_VERSION"));
    info!("Loading configuration from: {}", args.config);
    let mut config = Config::load(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config))?;

    if let Some(secs) = args.timeout_secs {
        config.confirmation.timeout_ms = secs.saturating_mul(1000);
    }
    if let Some(level) = &args.finality {
        config.confirmation.target = FinalityLevel::from_str(level).map_err(|e| anyhow!(e))?;
    }
    if let Some(port) = args.metrics_port {
        config.monitoring.enable_metrics = true;
        config.monitoring.metrics_port = port;
    }
    config.validate().context("Invalid configuration")?;

    info!("Initializing wallet from: {}", config.wallet.keypair_path);
    let wallet =
        WalletManager::from_file(&config.wallet.keypair_path).context("Failed to load wallet")?;
    info!("Wallet address: {}", wallet.pubkey());

    if config.monitoring.enable_metrics {
        let port = config.monitoring.metrics_port;
        info!("Starting metrics server on port {}", port);
        tokio::spawn(async move {
            if let Err(e) = endpoints::endpoint_server(port).await {
                error!("Metrics server error: {}", e);
            }
        });
    }

    let client = ProgramClient::from_config(&config).context("Failed to create program client")?;
    let method_args = parse_method_args(&client, &args.method, args.args.as_deref())?;

    let trace = TraceContext::with_correlation(&args.method, CorrelationId::new());
    info!(
        trace_id = %trace.trace_id,
        context_id = %trace.correlation_id(),
        program = %client.handle(),
        method = %args.method,
        "Invoking program method"
    );

    let mut call = client
        .method(&args.method)
        .args(method_args)
        .signer(wallet.keypair())
        .correlation(trace.correlation_id().clone());
    for (name, key) in &args.accounts {
        call = call.account(name, *key);
    }

    if args.dry_run {
        let span = trace.child_span("simulate");
        let outcome = call.simulate().await.map_err(report)?;
        for line in &outcome.logs {
            info!("{}", line);
        }
        match outcome.err {
            Some(reason) => bail!("Simulation failed: {}", reason),
            None => info!(
                trace_id = %span.trace_id,
                context_id = %span.correlation_id(),
                units_consumed = ?outcome.units_consumed,
                elapsed_ms = span.elapsed_ms(),
                "Simulation succeeded"
            ),
        }
        return Ok(());
    }

    let span = trace.child_span("send");
    let outcome = call.send().await.map_err(report)?;
    info!(
        trace_id = %span.trace_id,
        context_id = %outcome.handle.correlation_id(),
        finality = %outcome.confirmation.finality,
        polls = outcome.confirmation.attempts,
        elapsed_ms = span.elapsed_ms(),
        "Your transaction signature {}",
        outcome.signature()
    );

    Ok(())
}

/// Decode `--args` against the method's argument types
fn parse_method_args(
    client: &ProgramClient,
    method: &str,
    raw: Option<&str>,
) -> Result<Vec<ArgValue>> {
    let Some(raw) = raw else {
        return Ok(Vec::new());
    };
    let values: Vec<serde_json::Value> =
        serde_json::from_str(raw).context("--args must be a JSON array")?;

    // Unknown methods are reported by the builder
    let Some(schema) = client.handle().interface().method(method) else {
        return Ok(Vec::new());
    };
    if values.len() != schema.args.len() {
        bail!(
            "`{}` takes {} argument(s), got {}",
            method,
            schema.args.len(),
            values.len()
        );
    }

    values
        .iter()
        .zip(&schema.args)
        .map(|(value, spec)| {
            ArgValue::from_json(value, &spec.ty)
                .map_err(|e| anyhow!("argument `{}`: {}", spec.name, e))
        })
        .collect()
}

fn report(err: ClientError) -> anyhow::Error {
    warn!(
        kind = ?err.kind(),
        remediation = ?err.remediation(),
        "Invocation failed"
    );
    err.into()
}

/// Initialize logging subsystem
fn init_logging(verbose: bool, json: bool) -> Result<()> {
    let default_filter = if verbose {
        "dubuu_client=debug,dubuu=debug,info"
    } else {
        "dubuu_client=info,dubuu=info,warn"
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| default_filter.into());

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_target(true))
            .try_init()?;
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_target(true))
            .try_init()?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_account() {
        let key = Pubkey::new_unique();
        let (name, parsed) = parse_account(&format!("signer={}", key)).unwrap();
        assert_eq!(name, "signer");
        assert_eq!(parsed, key);
        assert!(parse_account("signer").is_err());
        assert!(parse_account("signer=nope").is_err());
    }

    #[test]
    fn test_args_parse() {
        let args = Args::parse_from(["dubuu", "--dry-run", "-a", &format!("signer={}", Pubkey::new_unique())]);
        assert_eq!(args.method, "initialize");
        assert!(args.dry_run);
        assert_eq!(args.accounts.len(), 1);
    }
}

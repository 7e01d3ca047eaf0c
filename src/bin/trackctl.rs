//! Tracking number controller
//!
//! Offline access to the allocator and derivation engine, plus a thin HTTP
//! client for a running server.
//!
//! Usage:
//!   cargo run --bin trackctl -- allocate --format dated --origin Oslo --destination Rome
//!   cargo run --bin trackctl -- derive SHPEX-12345678
//!   cargo run --bin trackctl -- derive GSS-20240310-00042 --at 2024-03-12T09:00:00Z
//!   cargo run --bin trackctl -- track GSS1234567890 --url http://127.0.0.1:8080

use anyhow::{bail, Context};
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand, ValueEnum};
use serde_json::json;
use shipment_tracker::domain::TrackingFormat;
use shipment_tracker::infra::{Config, RandomSource, SeededRandomSource, ThreadRandomSource};
use shipment_tracker::services::{AllocationContext, Allocator, DerivationEngine};
use std::process::ExitCode;
use std::sync::Arc;

#[derive(Parser, Debug)]
#[command(name = "trackctl")]
#[command(about = "Allocate, derive, and look up shipment tracking numbers")]
struct Args {
    /// Path to TOML configuration file (prefixes and calendar offset)
    #[arg(short, long)]
    config: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Allocate a tracking number and print the seed shipment
    Allocate {
        #[arg(long, value_enum, default_value_t = FormatArg::Dated)]
        format: FormatArg,
        #[arg(long)]
        origin: String,
        #[arg(long)]
        destination: String,
        #[arg(long)]
        user_id: Option<String>,
        /// Seed for a reproducible draw
        #[arg(long)]
        seed: Option<u64>,
    },
    /// Derive the shipment view for a tracking number without a server
    Derive {
        tracking_number: String,
        /// Evaluation instant (RFC 3339); defaults to now
        #[arg(long)]
        at: Option<String>,
    },
    /// Look up a tracking number on a running server (POST /track)
    Track {
        tracking_number: String,
        #[arg(long, default_value = "http://127.0.0.1:8080")]
        url: String,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum FormatArg {
    Dated,
    Opaque,
}

impl From<FormatArg> for TrackingFormat {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Dated => TrackingFormat::Dated,
            FormatArg::Opaque => TrackingFormat::Opaque,
        }
    }
}

fn parse_instant(at: Option<&str>) -> anyhow::Result<DateTime<Utc>> {
    match at {
        None => Ok(Utc::now()),
        Some(s) => DateTime::parse_from_rfc3339(s)
            .map(|t| t.with_timezone(&Utc))
            .with_context(|| format!("invalid --at {s:?}")),
    }
}

async fn run(args: Args) -> anyhow::Result<String> {
    let config = match args.config {
        Some(path) => Config::from_file(&path)?,
        None => Config::default(),
    };

    match args.command {
        Command::Allocate { format, origin, destination, user_id, seed } => {
            let rng: Arc<dyn RandomSource> = match seed {
                Some(seed) => Arc::new(SeededRandomSource::new(seed)),
                None => Arc::new(ThreadRandomSource),
            };
            let allocator = Allocator::new(config.grammar(), config.calendar(), rng);
            let mut ctx = AllocationContext::new(origin, destination, format.into());
            if let Some(user_id) = user_id {
                ctx = ctx.with_user_id(user_id);
            }
            let shipment = allocator.allocate(&ctx, Utc::now()).context("allocation failed")?;
            Ok(serde_json::to_string_pretty(&shipment)?)
        }
        Command::Derive { tracking_number, at } => {
            let now = parse_instant(at.as_deref())?;
            let engine = DerivationEngine::new(config.grammar(), config.calendar());
            let shipment = engine
                .derive(&tracking_number, now)
                .with_context(|| format!("cannot derive {tracking_number}"))?;
            eprintln!(
                "{}: {} ({} updates)",
                shipment.tracking_number,
                shipment.status.label(),
                shipment.updates.len()
            );
            Ok(serde_json::to_string_pretty(&shipment)?)
        }
        Command::Track { tracking_number, url } => {
            let client = reqwest::Client::new();
            let endpoint = format!("{}/track", url.trim_end_matches('/'));
            let body = json!({ "trackingNumber": tracking_number }).to_string();

            let resp = client
                .post(&endpoint)
                .header("Content-Type", "application/json")
                .body(body)
                .send()
                .await
                .with_context(|| format!("request to {endpoint} failed"))?;
            let status = resp.status();
            let text = resp.text().await.context("failed to read response body")?;

            let pretty = serde_json::from_str::<serde_json::Value>(&text)
                .and_then(|v| serde_json::to_string_pretty(&v))
                .unwrap_or(text);
            if !status.is_success() {
                bail!("{status}: {pretty}");
            }
            Ok(pretty)
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    match run(args).await {
        Ok(output) => {
            println!("{output}");
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

//! NetBox enrichment for newline-delimited JSON
//!
//! Reads one JSON record per line from stdin, enriches each record from
//! NetBox and writes it to stdout in input order.
//!
//! Usage:
//!   LOGSTASH_NETBOX_ENRICHMENT=true \
//!     cargo run --bin netbox-enrich -- --config enrich.yaml < events.ndjson
//!
//! Example enrich.yaml:
//!   source: "[destination][ip]"
//!   target: "[destination][device]"
//!   lookup_type: ip_device
//!   netbox_url: "http://netbox:8080/netbox/api"
//!   netbox_token_env: SUPERUSER_API_TOKEN

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use futures::StreamExt;
use serde_json::Value;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, BufWriter};
use tracing_subscriber::EnvFilter;

use netbox_enrich::{EnrichConfig, EnrichOutcome, NetboxEnrichmentService};

/// Enrich NDJSON records with NetBox device and VRF data
#[derive(Parser, Debug)]
#[command(name = "netbox-enrich")]
struct Args {
    /// YAML file with the enrichment options
    #[arg(short, long, env = "NETBOX_ENRICH_CONFIG")]
    config: PathBuf,

    /// Records enriched concurrently
    #[arg(long, default_value_t = 8)]
    concurrency: usize,
}

#[derive(Debug, Default)]
struct Tally {
    enriched: usize,
    unchanged: usize,
    failed: usize,
    invalid: usize,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let config = EnrichConfig::from_yaml_file(&args.config)
        .with_context(|| format!("Failed to load {}", args.config.display()))?;
    let service =
        NetboxEnrichmentService::new(&config).context("Failed to create enrichment service")?;

    let lines = futures::stream::unfold(
        BufReader::new(tokio::io::stdin()).lines(),
        |mut lines| async move {
            match lines.next_line().await {
                Ok(Some(line)) => Some((Ok(line), lines)),
                Ok(None) => None,
                Err(e) => Some((Err(e), lines)),
            }
        },
    );

    let service = &service;
    let mut processed = std::pin::pin!(lines
        .map(|line| async move {
            let line = line?;
            Ok::<_, std::io::Error>(process_line(service, &line).await)
        })
        .buffered(args.concurrency.max(1)));

    let mut out = BufWriter::new(tokio::io::stdout());
    let mut tally = Tally::default();

    while let Some(item) = processed.next().await {
        let (output, outcome) = item.context("Failed to read stdin")?;
        match outcome {
            LineOutcome::Enriched => tally.enriched += 1,
            LineOutcome::Unchanged => tally.unchanged += 1,
            LineOutcome::Failed => tally.failed += 1,
            LineOutcome::Invalid => tally.invalid += 1,
            LineOutcome::Blank => {}
        }
        if let Some(output) = output {
            out.write_all(output.as_bytes()).await?;
            out.write_all(b"\n").await?;
        }
    }
    out.flush().await?;

    tracing::info!(
        enriched = tally.enriched,
        unchanged = tally.unchanged,
        failed = tally.failed,
        invalid = tally.invalid,
        "Enrichment finished"
    );
    Ok(())
}

enum LineOutcome {
    Enriched,
    Unchanged,
    Failed,
    Invalid,
    Blank,
}

/// Enrich one input line. Failed records pass through unmodified; lines
/// that are not JSON are dropped.
async fn process_line(
    service: &NetboxEnrichmentService,
    line: &str,
) -> (Option<String>, LineOutcome) {
    if line.trim().is_empty() {
        return (None, LineOutcome::Blank);
    }

    let mut record: Value = match serde_json::from_str(line) {
        Ok(record) => record,
        Err(e) => {
            tracing::warn!(error = %e, "Skipping line that is not JSON");
            return (None, LineOutcome::Invalid);
        }
    };

    let outcome = match service.enrich(&mut record).await {
        Ok(EnrichOutcome::Enriched) => LineOutcome::Enriched,
        Ok(_) => LineOutcome::Unchanged,
        Err(e) => {
            tracing::warn!(error = %e, "Enrichment failed, record passed through");
            LineOutcome::Failed
        }
    };

    match serde_json::to_string(&record) {
        Ok(output) => (Some(output), outcome),
        Err(e) => {
            tracing::warn!(error = %e, "Failed to serialize record");
            (None, LineOutcome::Failed)
        }
    }
}

//! Linkvault CLI: submit links for ingestion and inspect their status.
//!
//! Configuration comes from the environment (or `.env`); see
//! `linkvault_core::Config`.

use anyhow::{anyhow, Context};
use clap::{Parser, Subcommand};
use linkvault_cli::{build_orchestrator, format_bytes, parse_quality_arg, print_json, ReportView};
use linkvault_core::models::ContentStatus;
use linkvault_core::Config;
use linkvault_infra::{init_telemetry, shutdown_telemetry, TelemetryFormat};
use linkvault_ingest::{IngestOrchestrator, SubmitOptions};

#[derive(Parser)]
#[command(name = "linkvault", about = "Ingest Telegram posts and YouTube videos into object storage")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Submit a link and run its ingestion to completion
    Submit {
        /// Telegram post or YouTube video link
        link: String,
        /// YouTube quality, e.g. 720p (default: highest)
        #[arg(long)]
        quality: Option<String>,
        /// Print the final record and its media items, failing if ingestion failed
        #[arg(long)]
        wait: bool,
    },
    /// Show a content record and its media items
    Status {
        /// Content ID, e.g. examplechan_42 or youtube_dQw4w9WgXcQ
        content_id: String,
    },
    /// Mark a record left in processing by a crashed run as failed
    Abandon {
        /// Content ID
        content_id: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = Config::from_env().context("Failed to load configuration")?;
    config.validate().context("Invalid configuration")?;
    init_telemetry(
        TelemetryFormat::from_setting(&config.log_format),
        &config.environment,
    )
    .map_err(|e| anyhow!("Failed to initialize telemetry: {}", e))?;

    let orchestrator = build_orchestrator(&config).await?;
    let result = run(cli.command, &orchestrator, &config).await;

    shutdown_telemetry().await;
    result
}

async fn run(
    command: Commands,
    orchestrator: &IngestOrchestrator,
    config: &Config,
) -> anyhow::Result<()> {
    match command {
        Commands::Submit {
            link,
            quality,
            wait,
        } => {
            let quality = match quality.as_deref() {
                Some(value) => parse_quality_arg(value)?,
                None => None,
            };
            let record = orchestrator
                .submit_with(&link, SubmitOptions { quality })
                .await?;
            print_json(&record)?;

            // Background ingestion dies with the process, so always wait for it
            tokio::select! {
                _ = orchestrator.drain() => {}
                _ = tokio::signal::ctrl_c() => {
                    tracing::warn!("Interrupted, shutting down ingestion");
                    if !orchestrator.shutdown(config.shutdown_grace()).await {
                        tracing::warn!(
                            content_id = %record.content_id,
                            "Ingestion did not stop in time; record may stay processing"
                        );
                    }
                }
            }

            if wait {
                let report = orchestrator
                    .status(&record.content_id)
                    .await?
                    .ok_or_else(|| anyhow!("content {} disappeared", record.content_id))?;
                print_json(&ReportView::from(&report))?;

                if report.record.status == ContentStatus::Failed {
                    return Err(anyhow!(
                        "ingestion of {} failed: {}",
                        report.record.content_id,
                        report.record.error_message.as_deref().unwrap_or("unknown error")
                    ));
                }
                if let Some(total) = report.record.total_size {
                    eprintln!(
                        "{}: {} item(s), {}",
                        report.record.content_id,
                        report.items.len(),
                        format_bytes(total)
                    );
                }
            }
        }
        Commands::Status { content_id } => {
            let report = orchestrator
                .status(&content_id)
                .await?
                .ok_or_else(|| anyhow!("content {} not found", content_id))?;
            print_json(&ReportView::from(&report))?;
        }
        Commands::Abandon { content_id } => {
            let record = orchestrator.abandon(&content_id).await?;
            print_json(&record)?;
        }
    }

    Ok(())
}

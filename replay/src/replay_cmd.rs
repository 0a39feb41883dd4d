use crate::transport::StdoutTransport;
use anyhow::Context;
use anyhow::Result;
use clap::Parser;
use fortwatch_engine::Backend;
use fortwatch_engine::EngineConfig;
use fortwatch_engine::FortEngine;
use fortwatch_engine::InMemoryPersistence;
use fortwatch_engine::spawn_webhook_sender;
use fortwatch_wire::ApiFortScan;
use fortwatch_wire::FortType;
use fortwatch_wire::InboundMessage;
use serde::Deserialize;
use serde::Serialize;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::fs::File;
use tokio::io::AsyncBufReadExt;
use tokio::io::BufReader;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use tracing::info;
use tracing::warn;

#[derive(Debug, Parser)]
pub struct ReplayArgs {
    /// JSONL file of inbound messages, one per line
    #[arg(value_name = "MESSAGES")]
    pub messages: PathBuf,

    /// Engine configuration (defaults apply when omitted)
    #[arg(short, long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// JSONL file of scan requests to run once the log is applied
    #[arg(long, value_name = "PATH")]
    pub scans: Option<PathBuf>,

    /// Stop at the first message that fails to apply
    #[arg(long)]
    pub fail_fast: bool,
}

/// One scan line: an `ApiFortScan` plus the fort type to scan for (both when absent).
#[derive(Debug, Deserialize)]
struct ScanCommand {
    #[serde(default)]
    fort_type: Option<FortType>,
    #[serde(flatten)]
    request: ApiFortScan,
}

#[derive(Debug, Default, PartialEq, Eq, Serialize)]
pub struct ReplaySummary {
    pub messages: usize,
    pub outcomes: usize,
    pub failed: usize,
    pub malformed_lines: usize,
    pub pending_classifications: usize,
    pub indexed: usize,
}

pub async fn run(args: ReplayArgs, cancel: CancellationToken) -> Result<()> {
    let config = match &args.config {
        Some(path) => EngineConfig::load(path)
            .with_context(|| format!("failed to load configuration {}", path.display()))?,
        None => EngineConfig::default(),
    };
    let backend = Backend::in_memory(Arc::new(InMemoryPersistence::new()));
    let (engine, receiver) = FortEngine::from_config(&config, backend);
    let shutdown = CancellationToken::new();
    let sender = spawn_webhook_sender(
        &config,
        Arc::new(StdoutTransport),
        receiver,
        shutdown.clone(),
    );

    let replayed = replay(&engine, &args.messages, args.fail_fast, &cancel).await;
    let scanned = match (&replayed, &args.scans) {
        (Ok(_), Some(path)) => run_scans(&engine, path, &cancel).await,
        _ => Ok(Vec::new()),
    };

    shutdown.cancel();
    if let Err(err) = sender.await {
        warn!("webhook sender ended abnormally: {err}");
    }

    let summary = replayed?;
    for response in scanned? {
        println!("{response}");
    }
    println!("{}", serde_json::to_string(&summary)?);
    Ok(())
}

/// Applies every message line. Malformed lines and failed messages are counted and skipped.
pub async fn replay(
    engine: &FortEngine,
    path: &Path,
    fail_fast: bool,
    cancel: &CancellationToken,
) -> Result<ReplaySummary> {
    let file = File::open(path)
        .await
        .with_context(|| format!("failed to open {}", path.display()))?;
    let mut lines = BufReader::new(file).lines();
    let mut summary = ReplaySummary::default();
    let mut line_no = 0;

    while let Some(line) = lines.next_line().await? {
        line_no += 1;
        if cancel.is_cancelled() {
            warn!("stopped before line {line_no}");
            break;
        }
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let message: InboundMessage = match serde_json::from_str(line) {
            Ok(message) => message,
            Err(err) => {
                warn!("line {line_no}: not a message: {err}");
                summary.malformed_lines += 1;
                continue;
            }
        };
        summary.messages += 1;
        let kind = message.kind();
        match engine.pipeline().handle(message, cancel).await {
            Ok(outcomes) => summary.outcomes += outcomes.len(),
            Err(err) if fail_fast => {
                return Err(err).with_context(|| format!("line {line_no} ({kind}) failed"));
            }
            Err(err) => {
                warn!("line {line_no} ({kind}) failed: {err}");
                summary.failed += 1;
            }
        }
    }

    summary.pending_classifications = engine.pipeline().pending_classifications();
    summary.indexed = engine.sizes().0;
    info!(
        "replayed {} messages from {} ({} failed, {} malformed)",
        summary.messages,
        path.display(),
        summary.failed,
        summary.malformed_lines
    );
    Ok(summary)
}

pub async fn run_scans(
    engine: &FortEngine,
    path: &Path,
    cancel: &CancellationToken,
) -> Result<Vec<serde_json::Value>> {
    let raw = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("failed to read {}", path.display()))?;
    let scanner = engine.scanner();
    let mut responses = Vec::new();
    for (index, line) in raw.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let command: ScanCommand = serde_json::from_str(line)
            .with_context(|| format!("scan line {} is not a scan request", index + 1))?;
        let response = match command.fort_type {
            Some(FortType::Gym) => {
                serde_json::to_value(scanner.gym_scan(&command.request, cancel).await?)?
            }
            Some(FortType::Pokestop) => {
                serde_json::to_value(scanner.pokestop_scan(&command.request, cancel).await?)?
            }
            None => serde_json::to_value(scanner.fort_scan(&command.request, cancel).await?)?,
        };
        debug!("scan line {} done", index + 1);
        responses.push(response);
    }
    Ok(responses)
}

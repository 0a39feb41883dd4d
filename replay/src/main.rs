use anyhow::Context;
use anyhow::Result;
use clap::Parser;
use clap::Subcommand;
use fortwatch_engine::EngineConfig;
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::filter::LevelFilter;

mod replay_cmd;
mod transport;

use replay_cmd::ReplayArgs;

/// Replays decoded game messages through the fort query core.
#[derive(Debug, Parser)]
#[command(name = "fortwatch", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Apply a JSONL message log, then run scan requests against the result
    Replay(ReplayArgs),

    /// Validate a configuration file and print it with defaults filled in
    CheckConfig(CheckConfigArgs),
}

#[derive(Debug, Parser)]
struct CheckConfigArgs {
    /// Path to the TOML configuration
    #[arg(value_name = "PATH")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing()?;
    let cli = Cli::parse();

    let cancel = CancellationToken::new();
    let interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("interrupted, finishing the current message");
            interrupt.cancel();
        }
    });

    match cli.command {
        Command::Replay(args) => replay_cmd::run(args, cancel).await,
        Command::CheckConfig(args) => check_config(&args),
    }
}

fn init_tracing() -> Result<()> {
    let filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy();
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|err| anyhow::anyhow!("failed to install tracing subscriber: {err}"))
}

fn check_config(args: &CheckConfigArgs) -> Result<()> {
    let config = EngineConfig::load(&args.config)
        .with_context(|| format!("invalid configuration {}", args.config.display()))?;
    let rendered = toml::to_string_pretty(&config).context("failed to render configuration")?;
    println!("{rendered}");
    Ok(())
}

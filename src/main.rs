//! grove - authoritative engine for an idle creature-merging game
//!
//! Command-line host: scripted headless sessions, catalog validation and
//! save inspection.

mod command_script;
mod commands;
mod config;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use command_script::CommandScriptPlayer;
use commands::{execute_command, parse_command, CommandOutput, SessionContext};
use config::{load_catalog, ServerConfig};
use grove_catalog::catalog_from_file;
use grove_core::{Millis, PlayerId};
use grove_server::{
    Clock, DevIdentityResolver, FileStore, GameService, LocalPaymentGateway, ManualClock,
    MemoryStore, PlayerStore, SystemClock,
};
use grove_testkit::{EventRecord, JsonlSink};
use std::{path::PathBuf, sync::Arc};
use tracing::{info, warn};

#[derive(Debug, Parser)]
#[command(name = "grove", version, about = "Idle merge game engine host")]
struct Cli {
    /// Service configuration file.
    #[arg(long, default_value = config::DEFAULT_SERVER_CONFIG_PATH)]
    config: PathBuf,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run a JSON command script as one player's sessions.
    Play {
        script: PathBuf,
        /// Save directory; overrides the config file.
        #[arg(long)]
        data_dir: Option<PathBuf>,
        /// Keep saves in memory only.
        #[arg(long)]
        memory: bool,
        /// Catalog JSON; overrides the config file.
        #[arg(long)]
        catalog: Option<PathBuf>,
        /// JSONL event log; overrides the config file.
        #[arg(long)]
        events: Option<PathBuf>,
    },
    /// Load and validate a catalog file strictly.
    ValidateCatalog { path: PathBuf },
    /// Print a stored player's state.
    Inspect {
        player: u64,
        #[arg(long)]
        data_dir: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = ServerConfig::load_from_path(&cli.config);
    info!("Starting grove v{}", env!("CARGO_PKG_VERSION"));

    match cli.command {
        Command::Play {
            script,
            data_dir,
            memory,
            catalog,
            events,
        } => {
            let catalog_path = catalog.or_else(|| config.catalog_path.clone());
            let catalog = Arc::new(load_catalog(catalog_path.as_deref())?);
            let store: Arc<dyn PlayerStore> = if memory {
                Arc::new(MemoryStore::new())
            } else {
                let dir = data_dir.unwrap_or_else(|| config.data_dir.clone());
                Arc::new(
                    FileStore::open(&dir)
                        .with_context(|| format!("opening save directory {}", dir.display()))?,
                )
            };
            let events = events.or_else(|| config.event_log.clone());
            let script = CommandScriptPlayer::from_path(&script)?;
            play(catalog, store, &config, script, events).await
        }
        Command::ValidateCatalog { path } => {
            let catalog = catalog_from_file(&path)
                .with_context(|| format!("validating {}", path.display()))?;
            println!(
                "{}: version {}, {} families, {} creature levels, {} shop items, {} subscriptions, {} quest templates",
                path.display(),
                catalog.version(),
                catalog.creatures().families().len(),
                catalog.creatures().len(),
                catalog.shop_items().len(),
                catalog.subscriptions().len(),
                catalog.quest_templates().len(),
            );
            Ok(())
        }
        Command::Inspect { player, data_dir } => {
            let dir = data_dir.unwrap_or_else(|| config.data_dir.clone());
            let catalog = load_catalog(config.catalog_path.as_deref())?;
            let store = FileStore::open(&dir)
                .with_context(|| format!("opening save directory {}", dir.display()))?;
            let record = store
                .load(PlayerId(player))
                .await?
                .with_context(|| format!("no save for player {player} in {}", dir.display()))?;
            let mut state = record.state;
            state.refresh_ready_flags(&catalog, SystemClock.now());
            println!("{}", serde_json::to_string_pretty(&state)?);
            Ok(())
        }
    }
}

async fn play(
    catalog: Arc<grove_catalog::Catalog>,
    store: Arc<dyn PlayerStore>,
    config: &ServerConfig,
    mut script: CommandScriptPlayer,
    events: Option<PathBuf>,
) -> Result<()> {
    let start = script
        .start_ms
        .map(Millis)
        .unwrap_or_else(|| SystemClock.now());
    let clock = Arc::new(ManualClock::new(start));
    let payments = Arc::new(LocalPaymentGateway::new());
    let service = Arc::new(GameService::new(
        catalog,
        store,
        payments.clone(),
        Arc::new(DevIdentityResolver),
        clock.clone(),
        config.service_config(),
    ));
    let mut sink = events.map(JsonlSink::create).transpose()?;

    let opening = service
        .start_session(&script.token, script.referral.as_deref())
        .await?;
    let player = opening.profile.player_id;
    info!(
        player = %player,
        is_new = opening.is_new,
        bonus = %opening.offline.bonus,
        "scripted session opened"
    );
    if let Some(sink) = sink.as_mut() {
        sink.write(&EventRecord {
            at: clock.now(),
            player,
            kind: "start",
            payload: &opening,
        })?;
    }

    let ctx = SessionContext {
        service: service.clone(),
        payments,
        token: script.token.clone(),
        player,
    };
    let mut failures = 0usize;
    while let Some(at_ms) = script.next_at() {
        clock.set(start.advance(at_ms));
        for line in script.drain_ready_commands(at_ms) {
            let (verb, output) = match parse_command(&line) {
                Ok(cmd) => (cmd.verb(), execute_command(&ctx, cmd).await),
                Err(err) => (
                    "invalid",
                    CommandOutput {
                        ok: false,
                        payload: serde_json::json!({ "kind": "parse", "error": err.to_string() }),
                    },
                ),
            };
            if !output.ok {
                failures += 1;
                warn!(command = %line, payload = %output.payload, "command rejected");
            }
            println!("[+{at_ms}ms] {line} -> {}", output.payload);
            if let Some(sink) = sink.as_mut() {
                sink.write(&EventRecord {
                    at: clock.now(),
                    player,
                    kind: verb,
                    payload: &output,
                })?;
            }
        }
    }

    if let Err(err) = service.end_session(player).await {
        warn!(%err, "closing scripted session failed");
    }
    let flushed = service.flush_dirty().await;
    info!(player = %player, failures, flushed, "script finished");
    Ok(())
}

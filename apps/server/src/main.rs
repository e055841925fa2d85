//! Governance Proposal Bot - Headless Server
//!
//! Receives broadcast blocks, surfaces accepted governance proposals and
//! notifies the Telegram chats subscribed to them.

mod config;
mod gate;
mod ingest_server;
mod pipeline;

use clap::Parser;
use config::AppConfig;
use gate::{DnsResolver, GateConfig, IngestionGate, SenderPolicy};
use pipeline::{run_proposal_worker, ProposalPipeline};
use proposal_alerts::{CommandRouter, Database, Notifier, NotifierConfig, TelegramBot};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tracing::{error, info, warn, Level};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// Governance Proposal Bot CLI
#[derive(Parser, Debug)]
#[command(name = "proposal-bot")]
#[command(about = "Telegram notifications for governance proposals", long_about = None)]
struct Args {
    /// Address the block ingestion endpoint binds to
    #[arg(long, default_value = "0.0.0.0:50051")]
    listen: SocketAddr,

    /// Log level: trace, debug, info, warn, error
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Admitted blocks waiting for the proposal worker
    #[arg(long, default_value_t = 64)]
    queue_capacity: usize,

    /// Seconds to wait for in-flight work on shutdown
    #[arg(long, default_value_t = 10)]
    shutdown_timeout_secs: u64,
}

fn parse_level(level: &str) -> Level {
    match level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    }
}

fn init_logging(level: &str) {
    // RUST_LOG wins over the CLI flag when set
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::default().add_directive(parse_level(level).into()));

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .expect("Failed to set tracing subscriber");
}

fn sender_policy(config: &AppConfig) -> SenderPolicy {
    match (&config.trusted_domain, config.is_development()) {
        (_, true) => SenderPolicy::AllowAll,
        (Some(domain), false) => SenderPolicy::TrustedDomain(domain.clone()),
        // Unreachable after config validation; refuse every sender
        (None, false) => SenderPolicy::TrustedDomain(String::new()),
    }
}

#[tokio::main]
async fn main() {
    // Load .env file if present
    let _ = dotenvy::dotenv();

    let args = Args::parse();

    init_logging(&args.log_level);

    let config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("Invalid configuration: {}", e);
            return;
        }
    };

    info!("🚀 Proposal Bot starting...");
    info!("  Environment: {:?}", config.environment);
    info!("  Listen: {}", args.listen);
    info!("  Queue capacity: {}", args.queue_capacity);
    if let Some(chat) = config.notify_only_chat {
        warn!("  Notifications restricted to chat {}", chat);
    }

    let db = match Database::connect(&config.database_url).await {
        Ok(db) => db,
        Err(e) => {
            error!("Failed to open subscription store: {}", e);
            return;
        }
    };

    let bot = Arc::new(TelegramBot::new(&config.bot_token));

    // Proposal worker
    let notifier = Notifier::new(
        db.clone(),
        bot.clone(),
        NotifierConfig {
            only_chat: config.notify_only_chat,
        },
    );
    let pipeline = Arc::new(ProposalPipeline::new(notifier, config.explorer_url.clone()));
    let (block_tx, block_rx) = mpsc::channel(args.queue_capacity.max(1));
    let mut worker_handle = tokio::spawn(run_proposal_worker(block_rx, pipeline));

    // Ingestion gate
    let policy = sender_policy(&config);
    if policy == SenderPolicy::AllowAll {
        warn!("Development mode: block sender authentication disabled");
    }
    let gate = match IngestionGate::new(GateConfig::new(policy), Arc::new(DnsResolver), block_tx) {
        Ok(gate) => Arc::new(gate),
        Err(e) => {
            error!("Failed to create ingestion gate: {}", e);
            return;
        }
    };

    // Telegram commands
    let router = Arc::new(CommandRouter::new(db, bot.clone()));
    let bot_handle = tokio::spawn(bot.run(router));

    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
    let mut server_handle = match ingest_server::start_ingest_server(
        gate.clone(),
        args.listen,
        async move {
            let _ = shutdown_rx.await;
        },
    )
    .await
    {
        Ok(handle) => handle,
        Err(e) => {
            error!("Failed to start ingestion server: {}", e);
            bot_handle.abort();
            return;
        }
    };

    // Handle shutdown
    info!("Press Ctrl+C to stop...");

    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for Ctrl+C: {}", e);
    }

    warn!("Shutdown signal received");
    let grace = Duration::from_secs(args.shutdown_timeout_secs);

    let _ = shutdown_tx.send(());
    if tokio::time::timeout(grace, &mut server_handle).await.is_err() {
        warn!("Ingestion server did not drain in time, aborting");
        server_handle.abort();
    }
    bot_handle.abort();

    let summary = gate.stats().summary();

    // Dropping the last gate closes the queue so the worker can drain
    drop(gate);
    if tokio::time::timeout(grace, &mut worker_handle).await.is_err() {
        warn!("Proposal worker did not finish in time, aborting");
        worker_handle.abort();
    }

    info!("📈 Final Stats:");
    info!("  Blocks admitted: {}", summary.admitted);
    info!("  Rate limited: {}", summary.rate_limited);
    info!("  Auth rejected: {}", summary.auth_rejected);
    info!("  Queue dropped: {}", summary.queue_dropped);

    info!("👋 Proposal Bot stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Environment, DEFAULT_EXPLORER_URL};

    #[test]
    fn test_parse_level() {
        assert_eq!(parse_level("debug"), Level::DEBUG);
        assert_eq!(parse_level("WARN"), Level::WARN);
        assert_eq!(parse_level("verbose"), Level::INFO);
    }

    #[test]
    fn test_cli_defaults() {
        let args = Args::parse_from(["proposal-bot"]);
        assert_eq!(args.listen, "0.0.0.0:50051".parse::<SocketAddr>().unwrap());
        assert_eq!(args.queue_capacity, 64);
        assert_eq!(args.shutdown_timeout_secs, 10);
    }

    fn app_config(environment: Environment, trusted_domain: Option<&str>) -> AppConfig {
        AppConfig {
            bot_token: "123:abc".to_string(),
            database_url: "sqlite::memory:".to_string(),
            trusted_domain: trusted_domain.map(str::to_string),
            environment,
            notify_only_chat: None,
            explorer_url: DEFAULT_EXPLORER_URL.to_string(),
        }
    }

    #[test]
    fn test_sender_policy() {
        assert_eq!(
            sender_policy(&app_config(Environment::Production, Some("validator.example"))),
            SenderPolicy::TrustedDomain("validator.example".to_string())
        );
        assert_eq!(
            sender_policy(&app_config(Environment::Development, Some("validator.example"))),
            SenderPolicy::AllowAll
        );
    }
}

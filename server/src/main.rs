use anyhow::Context;
use clap::Parser;
use std::{path::PathBuf, sync::Arc};
use tracing::info;
use yieldroom_execution::{Engine, SharedSecret};
use yieldroom_server::{Actor, Api, Config, Metrics};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// YAML config file; built-in defaults are used when omitted
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[arg(short, long)]
    port: Option<u16>,

    /// Facilitator password
    #[arg(short, long)]
    secret: Option<String>,

    #[arg(long)]
    public_dir: Option<String>,

    #[arg(long)]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse args
    let args = Args::parse();

    // Load config, then let flags override it
    let mut config = match &args.config {
        Some(path) => Config::load(path).context("failed to load config")?,
        None => Config::default(),
    };
    if let Some(port) = args.port {
        config.port = port;
    }
    if let Some(secret) = args.secret {
        config.facilitator_secret = secret;
    }
    if let Some(public_dir) = args.public_dir {
        config.public_dir = public_dir;
    }
    if let Some(log_level) = args.log_level {
        config.log_level = log_level;
    }
    let config = config.validate().context("invalid config")?;

    // Create logger
    tracing_subscriber::fmt()
        .with_max_level(config.log_level)
        .init();

    // Start session actor
    let metrics = Arc::new(Metrics::new());
    let engine = Engine::new(SharedSecret::new(config.facilitator_secret));
    let (actor, mailbox) = Actor::new(engine, config.mailbox_size, metrics.clone());
    actor.start();

    let api = Api::new(mailbox, metrics, config.public_dir, config.outbound_buffer);
    let app = api.router();

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!("Listening on {}", addr);
    yieldroom_server::serve(listener, app)
        .await
        .context("axum server error")?;

    Ok(())
}

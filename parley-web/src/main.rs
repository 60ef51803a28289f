//! Parley Web Server
//!
//! Chat with a hosted model over HTTP, with optional file context.

use anyhow::Context;
use clap::{Parser, ValueEnum};
use parley_core::LogFormat;
use parley_web::{init_logging, server::ParleyServerBuilder, WebConfig};
use tracing::{info, warn};

#[derive(Clone, Copy, Debug, ValueEnum)]
enum LogStyle {
    Pretty,
    Compact,
    Json,
}

impl From<LogStyle> for LogFormat {
    fn from(style: LogStyle) -> Self {
        match style {
            LogStyle::Pretty => LogFormat::Pretty,
            LogStyle::Compact => LogFormat::Compact,
            LogStyle::Json => LogFormat::Json,
        }
    }
}

/// Parley Web Server - chat with a generative model
#[derive(Parser, Debug)]
#[command(name = "parley-web")]
#[command(about = "HTTP chat server backed by Gemini")]
#[command(version)]
struct Args {
    /// Server host to bind to
    #[arg(long)]
    host: Option<String>,

    /// Server port to listen on
    #[arg(short, long)]
    port: Option<u16>,

    /// Static files directory
    #[arg(long)]
    static_dir: Option<String>,

    /// SQLite URL for transcripts and accounts (empty keeps them in memory)
    #[arg(long)]
    database_url: Option<String>,

    /// Directory uploads are staged in
    #[arg(long)]
    upload_dir: Option<String>,

    /// TOML configuration file (defaults to $PARLEY_CONFIG)
    #[arg(short, long)]
    config: Option<String>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Log output format
    #[arg(long, value_enum, default_value = "pretty")]
    log_format: LogStyle,
}

impl Args {
    /// Layer command line flags over the environment configuration
    fn apply(&self, config: &mut WebConfig) {
        if let Some(host) = &self.host {
            config.host = host.clone();
        }
        if let Some(port) = self.port {
            config.port = port;
        }
        if let Some(static_dir) = &self.static_dir {
            config.static_dir = Some(static_dir.clone());
        }
        if let Some(database_url) = &self.database_url {
            config.app.storage.database_url = database_url.clone();
        }
        if let Some(upload_dir) = &self.upload_dir {
            config.app.storage.upload_dir = upload_dir.clone();
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let args = Args::parse();

    init_logging(&args.log_level, args.log_format.into())?;

    let mut config = match &args.config {
        Some(path) => WebConfig::load(Some(path.as_str())),
        None => WebConfig::from_env(),
    }
    .context("Failed to load configuration")?;
    args.apply(&mut config);

    if config.app.llm.api_key.is_none() {
        warn!("GOOGLE_API_KEY is not set. The server will start but chat requests will fail.");
    }
    if let Some(static_dir) = &config.static_dir {
        info!("Static files: {}", static_dir);
    }
    if config.app.storage.database_url.is_empty() {
        info!("Database: in memory");
    } else {
        info!("Database: {}", config.app.storage.database_url);
    }

    let server = ParleyServerBuilder::from_config(config)
        .build()
        .await
        .context("Failed to build server")?;

    server.start().await.context("Server error")?;

    Ok(())
}

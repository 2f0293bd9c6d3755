use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;

use exif_extract::envelope::ResponseEnvelope;
use exif_extract::{config, exif, server};

#[derive(Parser, Debug)]
#[command(
    name = "exif-extract",
    version,
    about = "EXIF metadata extraction engine: decode JPEG/TIFF chunks into a timed JSON envelope over HTTP"
)]
struct Cli {
    /// Path to config file (default: config.json next to binary)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Initialize a default config.json and exit
    #[arg(long)]
    init: bool,

    /// Decode local image files, print their envelopes and exit
    #[arg(long, value_name = "PATH", num_args = 1..)]
    decode: Vec<PathBuf>,

    /// Address to listen on, overriding the config
    #[arg(long, value_name = "ADDR")]
    listen: Option<String>,

    /// Readiness warm-up in milliseconds, overriding the config
    #[arg(long, value_name = "MS")]
    warmup_ms: Option<u64>,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level))
        .format_timestamp(None)
        .init();

    // Handle --init
    if cli.init {
        let config = config::Config::default();
        let path = cli.config.as_deref();
        config.save(path)?;
        let save_path = match path {
            Some(p) => p.to_path_buf(),
            None => config::Config::config_path()?,
        };
        println!("Default config written to {}", save_path.display());
        return Ok(());
    }

    // Handle --decode
    if !cli.decode.is_empty() {
        for path in &cli.decode {
            let result = exif::read_exif(path)?;
            if let Err(reason) = &result {
                log::warn!("{}: {reason}", path.display());
            }
            let envelope = ResponseEnvelope::from_result(result, 0, 0);
            println!("{}", serde_json::to_string_pretty(&envelope)?);
        }
        return Ok(());
    }

    // Load config and apply overrides
    let mut config = config::Config::load(cli.config.as_deref())?;
    if let Some(listen) = cli.listen {
        config.server.listen = listen;
    }
    if let Some(warmup_ms) = cli.warmup_ms {
        config.readiness.warmup_ms = warmup_ms;
    }

    log::info!(
        "Starting exif-extract (warm-up {:?}, fetch timeout {:?}, heartbeats {})",
        config.warmup(),
        config.fetch_timeout(),
        if config.notify.enabled { "on" } else { "off" }
    );

    server::serve(&config).await
}

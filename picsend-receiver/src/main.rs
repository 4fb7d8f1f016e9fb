//! picsend receiver entry point.
//!
//! ```text
//! picsend-receiver                   Listen with defaults (0.0.0.0:5001)
//! picsend-receiver --config <path>   Load a custom config TOML
//! picsend-receiver --port 6000       Override the listen port
//! picsend-receiver --gen-config      Write default config to stdout
//! ```

use std::path::PathBuf;
use std::sync::atomic::Ordering;

use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use picsend_receiver::config::ReceiverConfig;
use picsend_receiver::service::ReceiverService;

// ── CLI ──────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "picsend-receiver", about = "Receive and store images sent by picsend")]
struct Cli {
    /// Path to configuration TOML file.
    #[arg(short, long, default_value = "picsend-receiver.toml")]
    config: PathBuf,

    /// Address to bind (overrides config).
    #[arg(long)]
    host: Option<String>,

    /// Port to listen on (overrides config).
    #[arg(short, long)]
    port: Option<u16>,

    /// Directory to store images in (overrides config).
    #[arg(long)]
    save_root: Option<PathBuf>,

    /// Print the default configuration to stdout and exit.
    #[arg(long)]
    gen_config: bool,
}

// ── Main ─────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // --gen-config: dump defaults and exit.
    if cli.gen_config {
        let text = toml::to_string_pretty(&ReceiverConfig::default())?;
        println!("{text}");
        return Ok(());
    }

    // Load config.
    let mut config = ReceiverConfig::load(&cli.config);
    if let Some(host) = cli.host {
        config.network.host = host;
    }
    if let Some(port) = cli.port {
        config.network.port = port;
    }
    if let Some(root) = cli.save_root {
        config.storage.save_root = root;
    }

    // Init tracing.
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("picsend-receiver v{}", env!("CARGO_PKG_VERSION"));
    info!("save root: {}", config.storage.save_root.display());
    info!("max frame: {} bytes", config.storage.max_frame_size);

    let service = ReceiverService::new(config);
    let stop = service.stop_handle();

    // Ctrl-C handler.
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        info!("Ctrl-C received, shutting down");
        stop.store(false, Ordering::SeqCst);
    });

    service.run().await?;

    Ok(())
}

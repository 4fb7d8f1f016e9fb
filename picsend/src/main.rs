//! picsend sender entry point.
//!
//! ```text
//! picsend photo.jpg                       Re-encode and send with defaults
//! picsend photo.jpg --host 192.168.0.10   Send to another receiver
//! picsend photo.jpg --raw                 Send the file bytes unchanged
//! picsend --gen-config                    Dump default config and exit
//! ```

use std::path::PathBuf;

use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use picsend::config::SenderConfig;
use picsend::send::send_file;
use picsend_core::ErrorKind;

// ── CLI ──────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "picsend", about = "Send an image to a picsend receiver")]
struct Cli {
    /// Image file to send.
    #[arg(required_unless_present = "gen_config")]
    image: Option<PathBuf>,

    /// Path to configuration TOML file.
    #[arg(short, long, default_value = "picsend.toml")]
    config: PathBuf,

    /// Receiver host (overrides config).
    #[arg(long)]
    host: Option<String>,

    /// Receiver port (overrides config).
    #[arg(short, long)]
    port: Option<u16>,

    /// Maximum width before downscaling (overrides config).
    #[arg(long)]
    max_width: Option<u32>,

    /// JPEG quality 1-100 (overrides config).
    #[arg(short, long)]
    quality: Option<u8>,

    /// Send the file bytes unchanged instead of re-encoding.
    #[arg(long)]
    raw: bool,

    /// Print the default configuration to stdout and exit.
    #[arg(long)]
    gen_config: bool,
}

// ── Main ─────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    if cli.gen_config {
        let text = toml::to_string_pretty(&SenderConfig::default())?;
        println!("{text}");
        return Ok(());
    }

    let mut config = SenderConfig::load(&cli.config);
    if let Some(host) = cli.host {
        config.server.host = host;
    }
    if let Some(port) = cli.port {
        config.server.port = port;
    }
    if let Some(width) = cli.max_width {
        config.encoding.max_width = width;
    }
    if let Some(quality) = cli.quality {
        config.encoding.quality = quality;
    }

    // Init tracing.
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let Some(image) = cli.image else {
        eprintln!("no image given");
        std::process::exit(2);
    };

    let endpoint = match config.endpoint() {
        Ok(ep) => ep,
        Err(e) => {
            println!("failed: {}", e.status_message());
            std::process::exit(1);
        }
    };

    info!("picsend v{} -> {endpoint}", env!("CARGO_PKG_VERSION"));

    let result = send_file(&image, &endpoint, &config, cli.raw, |status| {
        println!("{status}");
    })
    .await;

    match result {
        Ok(report) => {
            info!("{} bytes delivered to {}", report.bytes_sent, report.endpoint);
            Ok(())
        }
        Err(e) => {
            // The session prints its own status line; a file that cannot
            // be read fails before the session starts.
            if e.kind() == ErrorKind::Io {
                println!("failed: cannot read {}", image.display());
            }
            info!("send failed: {e}");
            std::process::exit(1);
        }
    }
}

//! AntiMirror — entry point.
//!
//! ```text
//! antimirror                     Mirror using antimirror.toml (or defaults)
//! antimirror --config <path>     Load a custom config TOML
//! antimirror --gen-config        Write default config to stdout
//! antimirror --dither atkinson   Override the quantization algorithm
//! antimirror --image <path>      Mirror a still image instead of the test pattern
//! ```

use std::path::PathBuf;

use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use antimirror_core::QuantizationConfig;
use antimirror_host::config::{HostConfig, SourceKind};
use antimirror_host::service::MirrorService;

// ── CLI ──────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "antimirror", about = "Mirror a frame source to a 1-bit display")]
struct Cli {
    /// Path to configuration TOML file.
    #[arg(short, long, default_value = "antimirror.toml")]
    config: PathBuf,

    /// Print the default configuration to stdout and exit.
    #[arg(long)]
    gen_config: bool,

    /// Quantization algorithm: threshold, ordered-dither, floyd-steinberg, atkinson.
    #[arg(short, long)]
    dither: Option<QuantizationConfig>,

    /// Mirror this image file instead of the configured source.
    #[arg(short, long)]
    image: Option<PathBuf>,
}

// ── Main ─────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // --gen-config: dump defaults and exit.
    if cli.gen_config {
        let text = toml::to_string_pretty(&HostConfig::default())?;
        println!("{text}");
        return Ok(());
    }

    // Load config.
    let mut config = HostConfig::load(&cli.config);
    if let Some(dither) = cli.dither {
        config.quantization = dither;
    }
    if let Some(image) = cli.image {
        config.capture.source = SourceKind::Image;
        config.capture.image_path = image;
    }

    // Init tracing.
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("antimirror v{}", env!("CARGO_PKG_VERSION"));
    info!("target FPS: {}", config.pipeline.fps.clamp(1, 60));
    info!("quantization: {}", config.quantization);
    info!("capture region: {:?}", config.capture.region);

    let service = MirrorService::new(config);
    let stop = service.stop_handle();

    // Ctrl-C handler.
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        info!("Ctrl-C received — shutting down");
        stop.store(false, std::sync::atomic::Ordering::SeqCst);
    });

    service.run().await?;

    Ok(())
}

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use tracing::info;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use clip_relay::config::{Config, ConfigLoadArgs};
use clip_relay::supervisor;

#[derive(Parser)]
#[command(name = "clip-relay")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Unattended RTMP relay that restreams a rotating pool of live sources")]
struct Cli {
    /// Path to a file containing the RTMP sink URL (single line, rtmp://...)
    #[arg(long, value_name = "PATH")]
    sink_url_file: PathBuf,

    /// Path to a file containing the remote playlist URL (single line)
    #[arg(long, value_name = "PATH")]
    playlist_url_file: PathBuf,

    /// Path to an optional blocklist file (one lowercase substring per line)
    #[arg(long, value_name = "PATH")]
    blocklist_file: Option<PathBuf>,

    /// Path to an optional TOML file overriding tunable defaults
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Directory used for clip buffering and the transport channel
    #[arg(long, value_name = "DIR")]
    buffer_dir: Option<PathBuf>,

    /// Override the number of capture workers
    #[arg(long, value_name = "N")]
    workers: Option<usize>,

    /// Log level (passed through to `tracing`'s env-filter)
    #[arg(short = 'l', long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("clip_relay={}", cli.log_level).into());
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("starting clip-relay v{}", env!("CARGO_PKG_VERSION"));

    let load_args = ConfigLoadArgs {
        sink_url_path: cli.sink_url_file,
        playlist_url_path: cli.playlist_url_file,
        blocklist_path: cli.blocklist_file,
        toml_config_path: cli.config,
        buffer_dir: cli.buffer_dir,
        workers: cli.workers,
    };
    let config = Config::load(&load_args)?;
    info!(
        workers = config.tuning.workers,
        max_queue = config.tuning.max_queue,
        "configuration loaded"
    );

    supervisor::run(config).await.map_err(anyhow::Error::from)
}

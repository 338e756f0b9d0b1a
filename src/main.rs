use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use multitrx_monitor::config::MonitorConfig;

/// Ground-station monitor for the multi-PHY SDR testbed.
#[derive(Parser, Debug)]
#[clap(version)]
struct Args {
    /// Configuration file (YAML); defaults are used when omitted
    #[clap(short, long)]
    config: Option<std::path::PathBuf>,
    /// UAV flowgraph API URL (overrides the config file)
    #[clap(long)]
    uav_url: Option<String>,
    /// Ground-station flowgraph API URL (overrides the config file)
    #[clap(long)]
    ground_url: Option<String>,
    /// UDP port for packet-counter telemetry (overrides the config file)
    #[clap(long)]
    counter_port: Option<u16>,
    /// UDP port for position telemetry (overrides the config file)
    #[clap(long)]
    position_port: Option<u16>,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let args = Args::parse();
    let mut config = match &args.config {
        Some(path) => MonitorConfig::load(path)?,
        None => MonitorConfig::default(),
    };
    if let Some(url) = args.uav_url {
        config.uav.flowgraph_url = url;
    }
    if let Some(url) = args.ground_url {
        config.ground.flowgraph_url = url;
    }
    if let Some(port) = args.counter_port {
        config.counter_port = port;
    }
    if let Some(port) = args.position_port {
        config.position_port = port;
    }

    info!(
        "starting monitor (uav: {}, ground: {})",
        config.uav.flowgraph_url, config.ground.flowgraph_url
    );
    multitrx_monitor::app::run(config)?;
    Ok(())
}

//! One-shot PHY switcher: the command-line counterpart of the GUI's protocol
//! buttons, for scripted experiments and quick tests against one flowgraph.

use clap::{Parser, ValueEnum};
use tracing::info;
use tracing_subscriber::EnvFilter;

use multitrx_monitor::phy::{Phy, PhyConfig, PhyController};

// The flowgraph API does not report which PHY is routed, so a one-shot
// invocation cannot toggle; the protocol must be named explicitly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Protocol {
    Wlan,
    Zigbee,
}

impl Protocol {
    fn phy(self) -> Phy {
        match self {
            Protocol::Wlan => Phy::Wlan,
            Protocol::Zigbee => Phy::Zigbee,
        }
    }
}

/// Select the active PHY protocol on a flowgraph.
#[derive(Parser, Debug)]
#[clap(version)]
struct Args {
    /// Flowgraph API URL
    #[clap(short, long, default_value = "http://127.0.0.1:1337/api/fg/0/")]
    url: String,
    /// Protocol to select
    #[clap(value_enum)]
    protocol: Protocol,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let args = Args::parse();
    let mut controller = PhyController::connect(args.url, PhyConfig::default())?;
    let phy = args.protocol.phy();
    controller.select_phy(phy)?;
    info!("selected {}", phy.label());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn protocol_maps_to_phy() {
        assert_eq!(Protocol::Wlan.phy(), Phy::Wlan);
        assert_eq!(Protocol::Zigbee.phy(), Phy::Zigbee);
    }

    #[test]
    fn cli_requires_an_explicit_protocol() {
        assert!(Args::try_parse_from(["phy-switch", "wlan"]).is_ok());
        assert!(Args::try_parse_from(["phy-switch", "zigbee"]).is_ok());
        assert!(Args::try_parse_from(["phy-switch", "toggle"]).is_err());
        assert!(Args::try_parse_from(["phy-switch"]).is_err());
    }
}

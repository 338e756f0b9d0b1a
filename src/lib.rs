//! Multi-TRX monitor crate root: re-exports and module wiring.
//!
//! Ground-station companion for a two-PHY SDR testbed. The remote flowgraphs
//! run WLAN and Zigbee transceiver chains in parallel; this crate switches
//! the active PHY through the flowgraph block-control REST API and shows the
//! link telemetry the testbed publishes over UDP in an egui/eframe GUI:
//! - `flowgraph` / `pmt`: the REST client and its tagged-value bodies
//! - `phy`: block discovery and the PHY switching sequence
//! - `telemetry`: UDP datagram decoding and listener threads
//! - `stats` / `pathloss` / `series`: the data behind the plots
//! - `config`: endpoints, radio defaults, plot timing
//! - `app`: the eframe application
//! - `ieee802154`: MAC frame parsing for the sniffer binary

pub mod app;
pub mod config;
pub mod flowgraph;
pub mod ieee802154;
pub mod pathloss;
pub mod phy;
pub mod pmt;
pub mod series;
pub mod stats;
pub mod telemetry;

// Public re-exports for a compact external API
pub use app::MonitorApp;
pub use config::MonitorConfig;
pub use flowgraph::{FlowgraphClient, FlowgraphError};
pub use pathloss::PathLossModel;
pub use phy::{Phy, PhyConfig, PhyController};
pub use pmt::Pmt;

//! Application configuration: testbed endpoints, radio defaults, plot timing.
//!
//! All fields have serde defaults so a config file only needs to state what
//! differs from the lab setup. Files are YAML, loaded/saved with
//! `serde_yaml`.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::phy::{PhyConfig, Tuning};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("reading config: {0}")]
    Io(#[from] std::io::Error),
    #[error("parsing config: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// One side of the link: a flowgraph to control and how its SDR is wired.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LinkEndpoint {
    pub flowgraph_url: String,
    pub rx_device_channel: u32,
    pub tx_device_channel: u32,
    /// The ground station tunes mirrored: its digital frequency offsets get
    /// the opposite sign of the configured ones.
    pub mirror_offsets: bool,
}

impl Default for LinkEndpoint {
    fn default() -> Self {
        Self {
            flowgraph_url: "http://127.0.0.1:1337/api/fg/0/".to_string(),
            rx_device_channel: 0,
            tx_device_channel: 0,
            mirror_offsets: false,
        }
    }
}

/// Radio parameters the settings form starts from; applied to both PHYs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RadioDefaults {
    pub center_freq_ghz: f64,
    pub sample_rate_msps: f64,
    pub rx_gain: f64,
    pub tx_gain: f64,
    pub rx_offset_mhz: f64,
    pub tx_offset_mhz: f64,
}

impl Default for RadioDefaults {
    fn default() -> Self {
        Self {
            center_freq_ghz: 2.45,
            sample_rate_msps: 4.0,
            rx_gain: 60.0,
            tx_gain: 40.0,
            rx_offset_mhz: 4.0,
            tx_offset_mhz: -4.0,
        }
    }
}

/// Top-level application configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    pub uav: LinkEndpoint,
    pub ground: LinkEndpoint,
    /// Channel-emulator endpoint the path-loss model index is sent to.
    pub chanem_addr: String,
    /// UDP port for packet-counter telemetry.
    pub counter_port: u16,
    /// UDP port for position telemetry.
    pub position_port: u16,
    pub radio: RadioDefaults,
    /// One plot sample is taken per interval.
    pub plot_interval_ms: u64,
    /// Delivery rate is counted over this many plot intervals.
    pub rate_smoothing: u32,
    /// Ground-station antenna height above the position telemetry's z = 0.
    pub station_height_m: f64,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            uav: LinkEndpoint {
                flowgraph_url: "http://10.193.0.73:1337/api/fg/0/".to_string(),
                ..LinkEndpoint::default()
            },
            ground: LinkEndpoint {
                flowgraph_url: "http://10.193.0.75:1337/api/fg/0/".to_string(),
                tx_device_channel: 1,
                mirror_offsets: true,
                ..LinkEndpoint::default()
            },
            chanem_addr: "10.193.0.73:1341".to_string(),
            counter_port: 1340,
            position_port: 1342,
            radio: RadioDefaults::default(),
            plot_interval_ms: 1000,
            rate_smoothing: 3,
            station_height_m: 0.0,
        }
    }
}

impl MonitorConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Ok(serde_yaml::from_str(&text)?)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let text = serde_yaml::to_string(self)?;
        std::fs::write(path, text)?;
        Ok(())
    }

    pub fn plot_interval(&self) -> Duration {
        Duration::from_millis(self.plot_interval_ms)
    }

    /// Window the delivery rate is averaged over.
    pub fn rate_window(&self) -> Duration {
        self.plot_interval() * self.rate_smoothing
    }

    /// Carrier wavelength for the local path-loss models.
    pub fn wavelength(&self) -> f64 {
        crate::pathloss::wavelength(self.radio.center_freq_ghz * 1e9)
    }

    /// Initial [`PhyConfig`] for one link side, offsets mirrored per
    /// [`LinkEndpoint::mirror_offsets`]. Both PHYs start from the same radio
    /// defaults.
    pub fn phy_config(&self, link: &LinkEndpoint) -> PhyConfig {
        let sign = if link.mirror_offsets { -1.0 } else { 1.0 };
        let rx = sign * self.radio.rx_offset_mhz * 1e6;
        let tx = -sign * self.radio.tx_offset_mhz * 1e6;
        PhyConfig {
            rx_gain: [self.radio.rx_gain; 2],
            tx_gain: [self.radio.tx_gain; 2],
            sample_rate: [self.radio.sample_rate_msps * 1e6; 2],
            tuning: Tuning::CenterOffset {
                center_freq: self.radio.center_freq_ghz * 1e9,
                rx_offset: [rx; 2],
                tx_offset: [tx; 2],
            },
            rx_device_channel: link.rx_device_channel,
            tx_device_channel: link.tx_device_channel,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn yaml_roundtrip() {
        let cfg = MonitorConfig::default();
        let text = serde_yaml::to_string(&cfg).unwrap();
        let back: MonitorConfig = serde_yaml::from_str(&text).unwrap();
        assert_eq!(cfg, back);
    }

    #[test]
    fn partial_file_fills_defaults() {
        let cfg: MonitorConfig = serde_yaml::from_str("counter_port: 9000\n").unwrap();
        assert_eq!(cfg.counter_port, 9000);
        assert_eq!(cfg.position_port, 1342);
        assert_eq!(cfg.rate_smoothing, 3);
    }

    #[test]
    fn ground_offsets_are_mirrored() {
        let cfg = MonitorConfig::default();
        let uav = cfg.phy_config(&cfg.uav);
        let ground = cfg.phy_config(&cfg.ground);
        let Tuning::CenterOffset {
            rx_offset: urx,
            tx_offset: utx,
            ..
        } = uav.tuning
        else {
            panic!("expected center-offset tuning");
        };
        let Tuning::CenterOffset {
            rx_offset: grx,
            tx_offset: gtx,
            ..
        } = ground.tuning
        else {
            panic!("expected center-offset tuning");
        };
        // UAV: +4 MHz both ways; ground: -4 MHz both ways.
        assert_eq!(urx, [4e6; 2]);
        assert_eq!(utx, [4e6; 2]);
        assert_eq!(grx, [-4e6; 2]);
        assert_eq!(gtx, [-4e6; 2]);
    }

    #[test]
    fn rate_window_spans_smoothing_intervals() {
        let cfg = MonitorConfig::default();
        assert_eq!(cfg.rate_window(), Duration::from_secs(3));
    }
}

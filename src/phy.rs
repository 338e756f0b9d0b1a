//! PHY selection and radio configuration on a remote flowgraph.
//!
//! The testbed flowgraph runs both PHY chains (WLAN and Zigbee) in parallel
//! and routes samples and MAC messages through selector blocks. Switching the
//! active PHY therefore means pointing three selectors at the new index and
//! re-tuning the Soapy source/sink to that PHY's stored radio parameters.
//!
//! [`PhyController`] resolves the named blocks once at connection time and
//! keeps per-PHY configuration arrays (index = selector value) that are
//! applied as a fixed POST sequence on [`select_phy`](PhyController::select_phy).

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::flowgraph::{FlowgraphClient, FlowgraphDescription, FlowgraphError};
use crate::pmt::Pmt;

/// Instance name of the 2-in/1-out sample selector (RX side).
pub const SOURCE_SELECTOR: &str = "Selector<2, 1>_0";
/// Instance name of the 1-in/2-out sample selector (TX side).
pub const SINK_SELECTOR: &str = "Selector<1, 2>_0";
/// Instance name of the MAC message selector.
pub const MESSAGE_SELECTOR: &str = "MessageSelector_0";
/// Instance name of the Soapy source block.
pub const SOAPY_SOURCE: &str = "SoapySource_0";
/// Instance name of the Soapy sink block.
pub const SOAPY_SINK: &str = "SoapySink_0";

// Message handler numbering on the Soapy blocks.
const HANDLER_FREQ: usize = 0;
const HANDLER_GAIN: usize = 1;
const HANDLER_SAMPLE_RATE: usize = 2;
const HANDLER_CENTER_FREQ: usize = 4;
const HANDLER_FREQ_OFFSET: usize = 5;

/// The two selectable PHY protocols. The discriminant is the selector value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Phy {
    Wlan = 0,
    Zigbee = 1,
}

impl Phy {
    /// Selector value / configuration array index of this PHY.
    pub fn index(self) -> usize {
        self as usize
    }

    /// The other PHY.
    pub fn toggled(self) -> Phy {
        match self {
            Phy::Wlan => Phy::Zigbee,
            Phy::Zigbee => Phy::Wlan,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Phy::Wlan => "WLAN",
            Phy::Zigbee => "Zigbee",
        }
    }
}

/// How the SDR is tuned when a PHY is selected.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Tuning {
    /// One shared center frequency plus a per-PHY digital offset.
    ///
    /// Lets both PHYs share a single analog tune and keeps protocol switches
    /// fast; the offsets are indexed by [`Phy::index`].
    CenterOffset {
        center_freq: f64,
        rx_offset: [f64; 2],
        tx_offset: [f64; 2],
    },
    /// Absolute per-PHY RX/TX frequencies.
    Direct {
        rx_freq: [f64; 2],
        tx_freq: [f64; 2],
    },
}

/// Per-PHY radio parameters, arrays indexed by [`Phy::index`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhyConfig {
    pub rx_gain: [f64; 2],
    pub tx_gain: [f64; 2],
    pub sample_rate: [f64; 2],
    pub tuning: Tuning,
    /// Soapy device channel the source is wired to.
    pub rx_device_channel: u32,
    /// Soapy device channel the sink is wired to.
    pub tx_device_channel: u32,
}

impl Default for PhyConfig {
    fn default() -> Self {
        Self {
            rx_gain: [60.0, 60.0],
            tx_gain: [40.0, 40.0],
            sample_rate: [4e6, 4e6],
            tuning: Tuning::CenterOffset {
                center_freq: 2.45e9,
                rx_offset: [4e6, 4e6],
                tx_offset: [4e6, 4e6],
            },
            rx_device_channel: 0,
            tx_device_channel: 0,
        }
    }
}

/// Resolved message-handler URLs for the five blocks the controller drives.
#[derive(Debug, Clone)]
pub struct Endpoints {
    pub source_selector: String,
    pub sink_selector: String,
    pub message_selector: String,
    pub source_freq: String,
    pub source_gain: String,
    pub source_sample_rate: String,
    pub source_center_freq: String,
    pub source_freq_offset: String,
    pub sink_freq: String,
    pub sink_gain: String,
    pub sink_sample_rate: String,
    pub sink_center_freq: String,
    pub sink_freq_offset: String,
}

impl Endpoints {
    /// Look up the named blocks in the description and build their handler
    /// URLs. Every missing block is logged before the first one is returned
    /// as an error, so a misconfigured flowgraph shows all its gaps at once.
    pub fn resolve(
        client: &FlowgraphClient,
        fg: &FlowgraphDescription,
    ) -> Result<Self, FlowgraphError> {
        let mut first_missing = None;
        let mut lookup = |name: &str| -> usize {
            match fg.block_id(name) {
                Ok(id) => id,
                Err(e) => {
                    warn!("cannot find block {:?} in {}", name, client.base_url());
                    if first_missing.is_none() {
                        first_missing = Some(e);
                    }
                    usize::MAX
                }
            }
        };

        let source_selector = lookup(SOURCE_SELECTOR);
        let sink_selector = lookup(SINK_SELECTOR);
        let message_selector = lookup(MESSAGE_SELECTOR);
        let soapy_source = lookup(SOAPY_SOURCE);
        let soapy_sink = lookup(SOAPY_SINK);
        if let Some(e) = first_missing {
            return Err(e);
        }

        Ok(Self {
            source_selector: client.handler_url(source_selector, 0),
            sink_selector: client.handler_url(sink_selector, 1),
            message_selector: client.handler_url(message_selector, 1),
            source_freq: client.handler_url(soapy_source, HANDLER_FREQ),
            source_gain: client.handler_url(soapy_source, HANDLER_GAIN),
            source_sample_rate: client.handler_url(soapy_source, HANDLER_SAMPLE_RATE),
            source_center_freq: client.handler_url(soapy_source, HANDLER_CENTER_FREQ),
            source_freq_offset: client.handler_url(soapy_source, HANDLER_FREQ_OFFSET),
            sink_freq: client.handler_url(soapy_sink, HANDLER_FREQ),
            sink_gain: client.handler_url(soapy_sink, HANDLER_GAIN),
            sink_sample_rate: client.handler_url(soapy_sink, HANDLER_SAMPLE_RATE),
            sink_center_freq: client.handler_url(soapy_sink, HANDLER_CENTER_FREQ),
            sink_freq_offset: client.handler_url(soapy_sink, HANDLER_FREQ_OFFSET),
        })
    }
}

/// Controller for one flowgraph's PHY selection and radio parameters.
pub struct PhyController {
    client: FlowgraphClient,
    endpoints: Endpoints,
    config: PhyConfig,
    current_phy: Phy,
}

impl PhyController {
    /// Connect to a flowgraph, resolve the controlled blocks, and store the
    /// given radio configuration. Nothing is posted yet; the configuration is
    /// applied on the first [`select_phy`](Self::select_phy).
    pub fn connect(url: impl Into<String>, config: PhyConfig) -> Result<Self, FlowgraphError> {
        let client = FlowgraphClient::new(url)?;
        let fg = client.description()?;
        let endpoints = Endpoints::resolve(&client, &fg)?;
        Ok(Self {
            client,
            endpoints,
            config,
            current_phy: Phy::Wlan,
        })
    }

    /// The PHY most recently applied with [`select_phy`](Self::select_phy).
    pub fn current_phy(&self) -> Phy {
        self.current_phy
    }

    pub fn config(&self) -> &PhyConfig {
        &self.config
    }

    pub fn endpoints(&self) -> &Endpoints {
        &self.endpoints
    }

    // ── Stored configuration, applied on the next select_phy ────────────────

    pub fn set_rx_gain_config(&mut self, phy: Phy, gain: f64) {
        self.config.rx_gain[phy.index()] = gain;
    }

    pub fn set_tx_gain_config(&mut self, phy: Phy, gain: f64) {
        self.config.tx_gain[phy.index()] = gain;
    }

    pub fn set_sample_rate_config(&mut self, phy: Phy, sample_rate: f64) {
        self.config.sample_rate[phy.index()] = sample_rate;
    }

    /// Set the shared center frequency (center-offset tuning only; ignored
    /// under direct tuning).
    pub fn set_center_freq_config(&mut self, freq: f64) {
        if let Tuning::CenterOffset { center_freq, .. } = &mut self.config.tuning {
            *center_freq = freq;
        }
    }

    pub fn set_rx_offset_config(&mut self, phy: Phy, offset: f64) {
        if let Tuning::CenterOffset { rx_offset, .. } = &mut self.config.tuning {
            rx_offset[phy.index()] = offset;
        }
    }

    pub fn set_tx_offset_config(&mut self, phy: Phy, offset: f64) {
        if let Tuning::CenterOffset { tx_offset, .. } = &mut self.config.tuning {
            tx_offset[phy.index()] = offset;
        }
    }

    pub fn set_rx_freq_config(&mut self, phy: Phy, freq: f64) {
        if let Tuning::Direct { rx_freq, .. } = &mut self.config.tuning {
            rx_freq[phy.index()] = freq;
        }
    }

    pub fn set_tx_freq_config(&mut self, phy: Phy, freq: f64) {
        if let Tuning::Direct { tx_freq, .. } = &mut self.config.tuning {
            tx_freq[phy.index()] = freq;
        }
    }

    // ── Direct manipulation; posts immediately, stored config untouched ─────

    pub fn set_rx_frequency(&self, freq: f64) -> Result<(), FlowgraphError> {
        self.client
            .call_url(&self.endpoints.source_freq, &Pmt::F64(freq))
    }

    pub fn set_tx_frequency(&self, freq: f64) -> Result<(), FlowgraphError> {
        self.client
            .call_url(&self.endpoints.sink_freq, &Pmt::F64(freq))
    }

    pub fn set_rx_gain(&self, gain: f64) -> Result<(), FlowgraphError> {
        self.client
            .call_url(&self.endpoints.source_gain, &Pmt::F64(gain))
    }

    pub fn set_tx_gain(&self, gain: f64) -> Result<(), FlowgraphError> {
        self.client
            .call_url(&self.endpoints.sink_gain, &Pmt::F64(gain))
    }

    pub fn set_rx_sample_rate(&self, rate: f64) -> Result<(), FlowgraphError> {
        self.client
            .call_url(&self.endpoints.source_sample_rate, &Pmt::F64(rate))
    }

    pub fn set_tx_sample_rate(&self, rate: f64) -> Result<(), FlowgraphError> {
        self.client
            .call_url(&self.endpoints.sink_sample_rate, &Pmt::F64(rate))
    }

    pub fn set_rx_center_frequency(&self, freq: f64, channel: u32) -> Result<(), FlowgraphError> {
        self.client.call_url(
            &self.endpoints.source_center_freq,
            &Pmt::f64_with_channel(freq, channel),
        )
    }

    pub fn set_tx_center_frequency(&self, freq: f64, channel: u32) -> Result<(), FlowgraphError> {
        self.client.call_url(
            &self.endpoints.sink_center_freq,
            &Pmt::f64_with_channel(freq, channel),
        )
    }

    pub fn set_rx_frequency_offset(&self, offset: f64, channel: u32) -> Result<(), FlowgraphError> {
        self.client.call_url(
            &self.endpoints.source_freq_offset,
            &Pmt::f64_with_channel(offset, channel),
        )
    }

    pub fn set_tx_frequency_offset(&self, offset: f64, channel: u32) -> Result<(), FlowgraphError> {
        self.client.call_url(
            &self.endpoints.sink_freq_offset,
            &Pmt::f64_with_channel(offset, channel),
        )
    }

    // ── PHY switching ───────────────────────────────────────────────────────

    /// Route the selectors to `phy` and apply its stored radio parameters.
    ///
    /// `current_phy` is only updated once the whole sequence went through, so
    /// a partially applied switch can be retried as-is.
    pub fn select_phy(&mut self, phy: Phy) -> Result<(), FlowgraphError> {
        let i = phy.index();
        let selector = Pmt::U32(phy.index() as u32);
        self.client
            .call_url(&self.endpoints.source_selector, &selector)?;
        self.client
            .call_url(&self.endpoints.sink_selector, &selector)?;
        self.client
            .call_url(&self.endpoints.message_selector, &selector)?;

        self.client
            .call_url(&self.endpoints.source_gain, &Pmt::F64(self.config.rx_gain[i]))?;
        self.client.call_url(
            &self.endpoints.source_sample_rate,
            &Pmt::F64(self.config.sample_rate[i]),
        )?;
        self.client
            .call_url(&self.endpoints.sink_gain, &Pmt::F64(self.config.tx_gain[i]))?;
        self.client.call_url(
            &self.endpoints.sink_sample_rate,
            &Pmt::F64(self.config.sample_rate[i]),
        )?;

        match &self.config.tuning {
            Tuning::CenterOffset {
                center_freq,
                rx_offset,
                tx_offset,
            } => {
                self.client.call_url(
                    &self.endpoints.source_center_freq,
                    &Pmt::f64_with_channel(*center_freq, self.config.rx_device_channel),
                )?;
                self.client.call_url(
                    &self.endpoints.sink_center_freq,
                    &Pmt::f64_with_channel(*center_freq, self.config.tx_device_channel),
                )?;
                self.client.call_url(
                    &self.endpoints.source_freq_offset,
                    &Pmt::f64_with_channel(rx_offset[i], self.config.rx_device_channel),
                )?;
                self.client.call_url(
                    &self.endpoints.sink_freq_offset,
                    &Pmt::f64_with_channel(tx_offset[i], self.config.tx_device_channel),
                )?;
            }
            Tuning::Direct { rx_freq, tx_freq } => {
                self.client
                    .call_url(&self.endpoints.source_freq, &Pmt::F64(rx_freq[i]))?;
                self.client
                    .call_url(&self.endpoints.sink_freq, &Pmt::F64(tx_freq[i]))?;
            }
        }

        self.current_phy = phy;
        Ok(())
    }

    /// Switch to the other PHY.
    pub fn switch_phy(&mut self) -> Result<(), FlowgraphError> {
        self.select_phy(self.current_phy.toggled())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn testbed_description() -> FlowgraphDescription {
        serde_json::from_str(
            r#"{
                "blocks": [
                    {"id": 2, "instance_name": "Selector<2, 1>_0"},
                    {"id": 5, "instance_name": "Selector<1, 2>_0"},
                    {"id": 9, "instance_name": "MessageSelector_0"},
                    {"id": 11, "instance_name": "SoapySource_0"},
                    {"id": 12, "instance_name": "SoapySink_0"},
                    {"id": 13, "instance_name": "NullSink_0"}
                ]
            }"#,
        )
        .unwrap()
    }

    #[test]
    fn endpoint_urls_from_block_list() {
        let client = FlowgraphClient::new("http://10.193.0.73:1337/api/fg/0/").unwrap();
        let ep = Endpoints::resolve(&client, &testbed_description()).unwrap();
        assert_eq!(
            ep.source_selector,
            "http://10.193.0.73:1337/api/fg/0/block/2/call/0/"
        );
        assert_eq!(
            ep.sink_selector,
            "http://10.193.0.73:1337/api/fg/0/block/5/call/1/"
        );
        assert_eq!(
            ep.message_selector,
            "http://10.193.0.73:1337/api/fg/0/block/9/call/1/"
        );
        assert_eq!(
            ep.source_center_freq,
            "http://10.193.0.73:1337/api/fg/0/block/11/call/4/"
        );
        assert_eq!(
            ep.sink_freq_offset,
            "http://10.193.0.73:1337/api/fg/0/block/12/call/5/"
        );
    }

    #[test]
    fn missing_block_is_reported_by_name() {
        let client = FlowgraphClient::new("http://localhost:1337/api/fg/0/").unwrap();
        let fg: FlowgraphDescription = serde_json::from_str(
            r#"{"blocks": [{"id": 0, "instance_name": "Selector<2, 1>_0"}]}"#,
        )
        .unwrap();
        match Endpoints::resolve(&client, &fg) {
            Err(FlowgraphError::BlockNotFound(name)) => assert_eq!(name, SINK_SELECTOR),
            other => panic!("expected BlockNotFound, got {other:?}"),
        }
    }

    #[test]
    fn phy_toggling() {
        assert_eq!(Phy::Wlan.toggled(), Phy::Zigbee);
        assert_eq!(Phy::Zigbee.toggled(), Phy::Wlan);
        assert_eq!(Phy::Wlan.index(), 0);
        assert_eq!(Phy::Zigbee.index(), 1);
    }

    #[test]
    fn config_setters_index_by_phy() {
        let mut cfg = PhyConfig::default();
        cfg.rx_gain[Phy::Zigbee.index()] = 50.0;
        assert_eq!(cfg.rx_gain, [60.0, 50.0]);
        match &mut cfg.tuning {
            Tuning::CenterOffset { rx_offset, .. } => rx_offset[Phy::Wlan.index()] = -4e6,
            _ => unreachable!(),
        }
        match cfg.tuning {
            Tuning::CenterOffset { rx_offset, .. } => assert_eq!(rx_offset, [-4e6, 4e6]),
            _ => unreachable!(),
        }
    }
}

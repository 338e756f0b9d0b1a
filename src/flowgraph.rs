//! Blocking client for the flowgraph block-control REST API.
//!
//! The remote runtime exposes each running flowgraph under a base URL such as
//! `http://10.193.0.73:1337/api/fg/0/`. A `GET` on the base URL returns the
//! flowgraph description (most importantly the block list with ids and
//! instance names); `POST {base}block/{id}/call/{handler}/` with a [`Pmt`]
//! body invokes a numbered message handler on a block.
//!
//! This client covers exactly that surface: fetch the description once, look
//! blocks up by instance name, and post handler calls.

use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

use crate::pmt::Pmt;

/// Errors talking to the block-control API.
#[derive(Debug, Error)]
pub enum FlowgraphError {
    #[error("http transport: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("endpoint {url} answered {status}")]
    Status {
        url: String,
        status: reqwest::StatusCode,
    },
    #[error("cannot find block {0:?} in flowgraph")]
    BlockNotFound(String),
}

/// One block of the remote flowgraph, as reported by the description endpoint.
///
/// The API reports more fields (ports, edges); only what block discovery
/// needs is deserialized here.
#[derive(Debug, Clone, Deserialize)]
pub struct BlockDescription {
    pub id: usize,
    pub instance_name: String,
    #[serde(default)]
    pub type_name: String,
}

/// Flowgraph description: the block list.
#[derive(Debug, Clone, Deserialize)]
pub struct FlowgraphDescription {
    pub blocks: Vec<BlockDescription>,
}

impl FlowgraphDescription {
    /// Linear scan for a block by its `instance_name`.
    pub fn block_id(&self, instance_name: &str) -> Result<usize, FlowgraphError> {
        self.blocks
            .iter()
            .find(|b| b.instance_name == instance_name)
            .map(|b| b.id)
            .ok_or_else(|| FlowgraphError::BlockNotFound(instance_name.to_string()))
    }
}

/// Blocking HTTP client bound to one flowgraph base URL.
#[derive(Debug, Clone)]
pub struct FlowgraphClient {
    base_url: String,
    client: reqwest::blocking::Client,
}

impl FlowgraphClient {
    /// Create a client for the given base URL without contacting the remote.
    ///
    /// The URL is normalized to end in exactly one `/` so that endpoint paths
    /// can be appended directly.
    pub fn new(base_url: impl Into<String>) -> Result<Self, FlowgraphError> {
        let mut base_url = base_url.into();
        while base_url.ends_with('/') {
            base_url.pop();
        }
        base_url.push('/');
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(5))
            .build()?;
        Ok(Self { base_url, client })
    }

    /// Base URL of the flowgraph, with trailing slash.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Fetch the current flowgraph description.
    pub fn description(&self) -> Result<FlowgraphDescription, FlowgraphError> {
        let resp = self.client.get(&self.base_url).send()?;
        if !resp.status().is_success() {
            return Err(FlowgraphError::Status {
                url: self.base_url.clone(),
                status: resp.status(),
            });
        }
        Ok(resp.json()?)
    }

    /// URL of a numbered message handler of a block.
    pub fn handler_url(&self, block_id: usize, handler: usize) -> String {
        format!("{}block/{}/call/{}/", self.base_url, block_id, handler)
    }

    /// Invoke a message handler with the given [`Pmt`] argument.
    pub fn call(&self, block_id: usize, handler: usize, pmt: &Pmt) -> Result<(), FlowgraphError> {
        self.call_url(&self.handler_url(block_id, handler), pmt)
    }

    /// Invoke a handler by pre-built URL (see [`handler_url`](Self::handler_url)).
    pub fn call_url(&self, url: &str, pmt: &Pmt) -> Result<(), FlowgraphError> {
        let resp = self.client.post(url).json(pmt).send()?;
        if !resp.status().is_success() {
            return Err(FlowgraphError::Status {
                url: url.to_string(),
                status: resp.status(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn description() -> FlowgraphDescription {
        serde_json::from_str(
            r#"{
                "blocks": [
                    {"id": 0, "instance_name": "Selector<2, 1>_0", "type_name": "Selector"},
                    {"id": 3, "instance_name": "SoapySource_0", "type_name": "SoapySource"},
                    {"id": 7, "instance_name": "MessageSelector_0"}
                ]
            }"#,
        )
        .unwrap()
    }

    #[test]
    fn block_lookup_by_instance_name() {
        let fg = description();
        assert_eq!(fg.block_id("Selector<2, 1>_0").unwrap(), 0);
        assert_eq!(fg.block_id("MessageSelector_0").unwrap(), 7);
        assert!(matches!(
            fg.block_id("SoapySink_0"),
            Err(FlowgraphError::BlockNotFound(name)) if name == "SoapySink_0"
        ));
    }

    #[test]
    fn handler_url_construction() {
        let c = FlowgraphClient::new("http://10.193.0.73:1337/api/fg/0/").unwrap();
        assert_eq!(
            c.handler_url(3, 4),
            "http://10.193.0.73:1337/api/fg/0/block/3/call/4/"
        );
    }

    #[test]
    fn base_url_normalization() {
        let c = FlowgraphClient::new("http://localhost:1337/api/fg/0").unwrap();
        assert_eq!(c.base_url(), "http://localhost:1337/api/fg/0/");
        let c = FlowgraphClient::new("http://localhost:1337/api/fg/0///").unwrap();
        assert_eq!(c.base_url(), "http://localhost:1337/api/fg/0/");
    }
}

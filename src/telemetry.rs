//! UDP telemetry: datagram decoding and background listener threads.
//!
//! The testbed publishes two telemetry feeds on well-known UDP ports:
//!
//! * **Packet counters** — one ASCII datagram `"<endpoint>,<direction>"` per
//!   packet seen at a link endpoint (`server`/`client` × `tx`/`rx`).
//! * **Position** — six packed big-endian `f32`: x, y, z in meters followed
//!   by roll, pitch, yaw in radians.
//!
//! Both formats are produced elsewhere; this module only decodes them and
//! forwards decoded messages to the GUI thread over `std::sync::mpsc`
//! channels, requesting a repaint per message so the UI wakes up.

use std::io::Cursor;
use std::net::UdpSocket;
use std::sync::mpsc::Sender;
use std::thread;

use byteorder::{BigEndian, ReadBytesExt};
use thiserror::Error;
use tracing::{debug, error, info};

/// Decode errors for telemetry datagrams.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TelemetryError {
    #[error("counter datagram is not valid utf-8")]
    NotText,
    #[error("counter datagram {0:?} is not of the form \"endpoint,direction\"")]
    BadCounter(String),
    #[error("unknown endpoint {0:?}")]
    UnknownEndpoint(String),
    #[error("unknown direction {0:?}")]
    UnknownDirection(String),
    #[error("position datagram too short: {0} bytes, need 24")]
    Truncated(usize),
}

/// Which side of the link reported a counter event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endpoint {
    /// Ground-station side.
    Server,
    /// UAV side.
    Client,
}

/// Whether the counted packet was sent or received.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Tx,
    Rx,
}

/// Identifies one of the four counting bins.
pub type CounterKey = (Endpoint, Direction);

/// A decoded position/attitude sample.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PositionUpdate {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub roll: f32,
    pub pitch: f32,
    pub yaw: f32,
}

/// Parse a packet-counter datagram: `"<endpoint>,<direction>"`, with trailing
/// whitespace tolerated.
pub fn parse_counter(data: &[u8]) -> Result<CounterKey, TelemetryError> {
    let text = std::str::from_utf8(data).map_err(|_| TelemetryError::NotText)?;
    let text = text.trim_end();
    let (endpoint, direction) = text
        .split_once(',')
        .ok_or_else(|| TelemetryError::BadCounter(text.to_string()))?;
    let endpoint = match endpoint {
        "server" => Endpoint::Server,
        "client" => Endpoint::Client,
        other => return Err(TelemetryError::UnknownEndpoint(other.to_string())),
    };
    let direction = match direction {
        "tx" => Direction::Tx,
        "rx" => Direction::Rx,
        other => return Err(TelemetryError::UnknownDirection(other.to_string())),
    };
    Ok((endpoint, direction))
}

/// Parse a position datagram: six big-endian `f32`. Extra trailing bytes are
/// ignored.
pub fn parse_position(data: &[u8]) -> Result<PositionUpdate, TelemetryError> {
    if data.len() < 24 {
        return Err(TelemetryError::Truncated(data.len()));
    }
    let mut rdr = Cursor::new(data);
    // Reads cannot fail after the length check.
    let mut next = || rdr.read_f32::<BigEndian>().unwrap_or_default();
    Ok(PositionUpdate {
        x: next(),
        y: next(),
        z: next(),
        roll: next(),
        pitch: next(),
        yaw: next(),
    })
}

/// Spawn a background thread receiving and decoding datagrams from `port`.
///
/// Each decoded message is forwarded over `tx` and a repaint is requested so
/// the GUI ingests it promptly. Malformed datagrams are logged and skipped.
/// The thread ends when the receiving side of the channel is dropped.
fn spawn_listener<T, F>(
    name: &str,
    port: u16,
    tx: Sender<T>,
    ctx: egui::Context,
    decode: F,
) -> std::io::Result<thread::JoinHandle<()>>
where
    T: Send + 'static,
    F: Fn(&[u8]) -> Result<T, TelemetryError> + Send + 'static,
{
    let socket = UdpSocket::bind(("0.0.0.0", port))?;
    info!("listening for {name} telemetry on udp port {port}");
    let name = name.to_string();
    thread::Builder::new().name(format!("udp-{name}")).spawn(move || {
        let mut buf = [0u8; 1024];
        loop {
            let (len, _addr) = match socket.recv_from(&mut buf) {
                Ok(r) => r,
                Err(e) => {
                    error!("{name} telemetry socket error: {e}");
                    return;
                }
            };
            match decode(&buf[..len]) {
                Ok(msg) => {
                    if tx.send(msg).is_err() {
                        // GUI is gone; nothing left to feed.
                        return;
                    }
                    ctx.request_repaint();
                }
                Err(e) => debug!("dropping malformed {name} datagram: {e}"),
            }
        }
    })
}

/// Spawn the packet-counter listener.
pub fn spawn_counter_listener(
    port: u16,
    tx: Sender<CounterKey>,
    ctx: egui::Context,
) -> std::io::Result<thread::JoinHandle<()>> {
    spawn_listener("counter", port, tx, ctx, parse_counter)
}

/// Spawn the position listener.
pub fn spawn_position_listener(
    port: u16,
    tx: Sender<PositionUpdate>,
    ctx: egui::Context,
) -> std::io::Result<thread::JoinHandle<()>> {
    spawn_listener("position", port, tx, ctx, parse_position)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counter_parsing() {
        assert_eq!(
            parse_counter(b"server,rx"),
            Ok((Endpoint::Server, Direction::Rx))
        );
        assert_eq!(
            parse_counter(b"client,tx\n"),
            Ok((Endpoint::Client, Direction::Tx))
        );
    }

    #[test]
    fn counter_rejects_garbage() {
        assert_eq!(
            parse_counter(b"serverrx"),
            Err(TelemetryError::BadCounter("serverrx".to_string()))
        );
        assert_eq!(
            parse_counter(b"relay,rx"),
            Err(TelemetryError::UnknownEndpoint("relay".to_string()))
        );
        assert_eq!(
            parse_counter(b"server,up"),
            Err(TelemetryError::UnknownDirection("up".to_string()))
        );
        assert!(matches!(
            parse_counter(&[0xff, 0xfe]),
            Err(TelemetryError::NotText)
        ));
    }

    #[test]
    fn position_parsing() {
        let mut data = Vec::new();
        for v in [1.0f32, -2.5, 120.0, 0.1, 0.2, 0.3] {
            data.extend_from_slice(&v.to_be_bytes());
        }
        let p = parse_position(&data).unwrap();
        assert_eq!(p.x, 1.0);
        assert_eq!(p.y, -2.5);
        assert_eq!(p.z, 120.0);
        assert_eq!(p.yaw, 0.3);
    }

    #[test]
    fn position_tolerates_trailing_bytes() {
        let mut data = vec![0u8; 24];
        data.extend_from_slice(&[0xde, 0xad]);
        assert!(parse_position(&data).is_ok());
    }

    #[test]
    fn position_rejects_short_datagram() {
        assert_eq!(
            parse_position(&[0u8; 23]),
            Err(TelemetryError::Truncated(23))
        );
    }
}

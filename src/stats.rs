//! Packet-delivery bookkeeping over a bounded time window.
//!
//! Every counter datagram marks one packet seen at one of the four counting
//! bins (server/client × tx/rx). The delivery rate of a link direction is the
//! ratio of packets received on one side to packets sent on the other, both
//! counted over the same trailing window. The window spans a few plot
//! intervals so the displayed rate is smoothed.

use std::collections::HashMap;
use std::collections::VecDeque;
use std::time::{Duration, Instant};

use crate::telemetry::{CounterKey, Direction, Endpoint};

/// Rolling per-bin packet timestamps and windowed rate computation.
pub struct DeliveryStats {
    window: Duration,
    bins: HashMap<CounterKey, VecDeque<Instant>>,
}

impl DeliveryStats {
    /// `window` is the trailing interval packets are counted over
    /// (plot interval × smoothing factor).
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            bins: HashMap::new(),
        }
    }

    /// Record one packet for `key` at time `now`.
    pub fn record(&mut self, key: CounterKey, now: Instant) {
        self.bins.entry(key).or_default().push_back(now);
    }

    /// Number of packets for `key` within the window, discarding older ones.
    pub fn count(&mut self, key: CounterKey, now: Instant) -> usize {
        let Some(bin) = self.bins.get_mut(&key) else {
            return 0;
        };
        while let Some(&t) = bin.front() {
            if now.duration_since(t) > self.window {
                bin.pop_front();
            } else {
                break;
            }
        }
        bin.len()
    }

    /// Windowed delivery rate: received / sent, clamped to `[0, 1]`.
    /// Zero when either count is zero.
    pub fn rate(&mut self, rx_key: CounterKey, tx_key: CounterKey, now: Instant) -> f64 {
        let received = self.count(rx_key, now);
        let sent = self.count(tx_key, now);
        if received == 0 || sent == 0 {
            return 0.0;
        }
        (received as f64 / sent as f64).min(1.0)
    }

    /// UAV → ground station: received at the server, sent by the client.
    pub fn air_to_ground(&mut self, now: Instant) -> f64 {
        self.rate(
            (Endpoint::Server, Direction::Rx),
            (Endpoint::Client, Direction::Tx),
            now,
        )
    }

    /// Ground station → UAV: received at the client, sent by the server.
    pub fn ground_to_air(&mut self, now: Instant) -> f64 {
        self.rate(
            (Endpoint::Client, Direction::Rx),
            (Endpoint::Server, Direction::Tx),
            now,
        )
    }

    /// Mean of both link directions.
    pub fn combined(&mut self, now: Instant) -> f64 {
        (self.air_to_ground(now) + self.ground_to_air(now)) / 2.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RX: CounterKey = (Endpoint::Server, Direction::Rx);
    const TX: CounterKey = (Endpoint::Client, Direction::Tx);

    #[test]
    fn rate_is_received_over_sent() {
        let mut s = DeliveryStats::new(Duration::from_secs(3));
        let now = Instant::now();
        for _ in 0..10 {
            s.record(TX, now);
        }
        for _ in 0..7 {
            s.record(RX, now);
        }
        assert!((s.rate(RX, TX, now) - 0.7).abs() < 1e-12);
    }

    #[test]
    fn rate_is_zero_without_traffic() {
        let mut s = DeliveryStats::new(Duration::from_secs(3));
        let now = Instant::now();
        assert_eq!(s.rate(RX, TX, now), 0.0);
        s.record(RX, now);
        // No packets sent: still zero, not a division by zero.
        assert_eq!(s.rate(RX, TX, now), 0.0);
    }

    #[test]
    fn rate_is_clamped_to_one() {
        let mut s = DeliveryStats::new(Duration::from_secs(3));
        let now = Instant::now();
        // More received than sent (duplicates on air): clamp, don't exceed 1.
        for _ in 0..5 {
            s.record(RX, now);
        }
        s.record(TX, now);
        assert_eq!(s.rate(RX, TX, now), 1.0);
    }

    #[test]
    fn old_packets_fall_out_of_the_window() {
        let mut s = DeliveryStats::new(Duration::from_secs(3));
        let start = Instant::now();
        s.record(TX, start);
        s.record(RX, start);
        let later = start + Duration::from_secs(10);
        s.record(TX, later);
        assert_eq!(s.count(TX, later), 1);
        assert_eq!(s.count(RX, later), 0);
        assert_eq!(s.rate(RX, TX, later), 0.0);
    }

    #[test]
    fn combined_averages_both_directions() {
        let mut s = DeliveryStats::new(Duration::from_secs(3));
        let now = Instant::now();
        // AG perfect, GA silent -> combined 0.5.
        s.record((Endpoint::Client, Direction::Tx), now);
        s.record((Endpoint::Server, Direction::Rx), now);
        assert!((s.combined(now) - 0.5).abs() < 1e-12);
    }
}

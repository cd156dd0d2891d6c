//! Telemetry fan-out — payload formatting and the dual-sink publisher.
//!
//! Each reading goes out twice: four fixed-precision text payloads to
//! the device's broker topic set, and one JSON datagram broadcast on
//! the local subnet.  The two sinks are fully independent — a failure
//! on one never blocks or aborts the other, and neither is retried
//! within the cycle (the next cycle publishes fresh data anyway).

use core::fmt::Write as _;

use log::{debug, warn};

use crate::app::ports::{BrokerPort, BroadcastPort};
use crate::error::CommsError;
use crate::tilt::Reading;

/// Baseline payload announced on every (re)connect so subscribers see
/// the device immediately.
pub const BASELINE_PAYLOAD: &str = "0";

/// Worst case datagram is well under this; the JSON skeleton plus four
/// formatted numbers fits in ~60 bytes.
const DATAGRAM_CAP: usize = 96;
const SCALAR_CAP: usize = 16;

// ── Topics ────────────────────────────────────────────────────

/// The device's five broker topics, derived from the configured root
/// (e.g. `HydroWort/Green`): four outbound value topics and the single
/// inbound tare control topic.
#[derive(Debug, Clone)]
pub struct TopicSet {
    pub tilt: String,
    pub temperature: String,
    pub gravity: String,
    pub battery: String,
    pub tare: String,
}

impl TopicSet {
    pub fn new(topic_root: &str) -> Self {
        Self {
            tilt: format!("{topic_root}/TILT"),
            temperature: format!("{topic_root}/TEMP"),
            gravity: format!("{topic_root}/SG"),
            battery: format!("{topic_root}/BATT"),
            tare: format!("{topic_root}/TARE"),
        }
    }

    /// The four outbound topics, in announce/publish order.
    pub fn outbound(&self) -> [&str; 4] {
        [&self.tilt, &self.temperature, &self.gravity, &self.battery]
    }
}

// ── Payload formatting ────────────────────────────────────────
//
// Wire precision is part of the external interface: tilt and
// temperature to 1 decimal, specific gravity to 3, battery an integer.

pub fn tilt_payload(r: &Reading) -> heapless::String<SCALAR_CAP> {
    let mut s = heapless::String::new();
    let _ = write!(s, "{:.1}", r.roll);
    s
}

pub fn temperature_payload(r: &Reading) -> heapless::String<SCALAR_CAP> {
    let mut s = heapless::String::new();
    let _ = write!(s, "{:.1}", r.temperature);
    s
}

pub fn gravity_payload(r: &Reading) -> heapless::String<SCALAR_CAP> {
    let mut s = heapless::String::new();
    let _ = write!(s, "{:.3}", r.specific_gravity);
    s
}

pub fn battery_payload(r: &Reading) -> heapless::String<SCALAR_CAP> {
    let mut s = heapless::String::new();
    let _ = write!(s, "{}", r.battery);
    s
}

/// The broadcast datagram body:
/// `{"tilt":<f1>,"temp":<f1>,"sg":<f3>,"batt":<int>}`.
pub fn datagram_payload(r: &Reading) -> heapless::String<DATAGRAM_CAP> {
    let mut s = heapless::String::new();
    let _ = write!(
        s,
        "{{\"tilt\":{:.1},\"temp\":{:.1},\"sg\":{:.3},\"batt\":{}}}",
        r.roll, r.temperature, r.specific_gravity, r.battery
    );
    s
}

// ── Publish outcome ───────────────────────────────────────────

/// Per-sink results of one publish pass.  The sinks never gate each
/// other, so both results are always populated.
#[derive(Debug, Clone, Copy)]
pub struct PublishOutcome {
    pub broker: Result<(), CommsError>,
    pub broadcast: Result<(), CommsError>,
}

impl PublishOutcome {
    pub fn fully_delivered(&self) -> bool {
        self.broker.is_ok() && self.broadcast.is_ok()
    }
}

// ── Publisher ─────────────────────────────────────────────────

pub struct TelemetryPublisher {
    topics: TopicSet,
}

impl TelemetryPublisher {
    pub fn new(topics: TopicSet) -> Self {
        Self { topics }
    }

    pub fn topics(&self) -> &TopicSet {
        &self.topics
    }

    /// Fan one reading out to both sinks.  Fire-and-forget: failures
    /// are logged and recorded in the outcome, never retried here.
    pub fn publish(
        &self,
        reading: &Reading,
        broker: &mut impl BrokerPort,
        broadcast: &mut impl BroadcastPort,
    ) -> PublishOutcome {
        let broker_result = self.publish_scalars(reading, broker);
        let broadcast_result = self.publish_datagram(reading, broadcast);

        if let Err(e) = broker_result {
            warn!("publish: broker sink failed ({e}), next attempt on next cycle");
        }
        if let Err(e) = broadcast_result {
            warn!("publish: broadcast sink failed ({e}), next attempt on next cycle");
        }

        PublishOutcome {
            broker: broker_result,
            broadcast: broadcast_result,
        }
    }

    /// Publish "0" to every outbound topic — the idempotent announce
    /// sent on each broker (re)connect.
    pub fn announce_baseline(&self, broker: &mut impl BrokerPort) -> Result<(), CommsError> {
        let mut first_err = Ok(());
        for topic in self.topics.outbound() {
            if let Err(e) = broker.publish(topic, BASELINE_PAYLOAD) {
                if first_err.is_ok() {
                    first_err = Err(e);
                }
            }
        }
        first_err
    }

    // All four topics are attempted even when an earlier one fails;
    // only the first error is reported.
    fn publish_scalars(
        &self,
        r: &Reading,
        broker: &mut impl BrokerPort,
    ) -> Result<(), CommsError> {
        let tilt = tilt_payload(r);
        let temp = temperature_payload(r);
        let gravity = gravity_payload(r);
        let battery = battery_payload(r);
        let pairs: [(&str, &str); 4] = [
            (&self.topics.tilt, tilt.as_str()),
            (&self.topics.temperature, temp.as_str()),
            (&self.topics.gravity, gravity.as_str()),
            (&self.topics.battery, battery.as_str()),
        ];

        let mut first_err = Ok(());
        for (topic, payload) in pairs {
            if let Err(e) = broker.publish(topic, payload) {
                if first_err.is_ok() {
                    first_err = Err(e);
                }
            }
        }
        first_err
    }

    fn publish_datagram(
        &self,
        r: &Reading,
        broadcast: &mut impl BroadcastPort,
    ) -> Result<(), CommsError> {
        let payload = datagram_payload(r);
        debug!("broadcast: {payload}");
        broadcast.send(payload.as_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reading() -> Reading {
        Reading {
            temperature: 21.47,
            roll: 25.33,
            pitch: 3.02,
            specific_gravity: 1.0518,
            battery: 100,
            acceleration: [0.1, 4.1, 8.8],
            gyro: [0.0, 0.0, 0.0],
        }
    }

    // ── Mock sinks ────────────────────────────────────────────

    struct MockBroker {
        published: Vec<(String, String)>,
        fail: bool,
    }

    impl MockBroker {
        fn new() -> Self {
            Self {
                published: Vec::new(),
                fail: false,
            }
        }
    }

    impl BrokerPort for MockBroker {
        fn connect(&mut self, _client_id: &str) -> Result<(), CommsError> {
            Ok(())
        }
        fn is_connected(&self) -> bool {
            true
        }
        fn publish(&mut self, topic: &str, payload: &str) -> Result<(), CommsError> {
            if self.fail {
                return Err(CommsError::BrokerPublishFailed);
            }
            self.published.push((topic.into(), payload.into()));
            Ok(())
        }
        fn subscribe(&mut self, _topic: &str) -> Result<(), CommsError> {
            Ok(())
        }
        fn poll(&mut self) {}
    }

    struct MockBroadcast {
        datagrams: Vec<Vec<u8>>,
        fail: bool,
    }

    impl MockBroadcast {
        fn new() -> Self {
            Self {
                datagrams: Vec::new(),
                fail: false,
            }
        }
    }

    impl BroadcastPort for MockBroadcast {
        fn send(&mut self, payload: &[u8]) -> Result<(), CommsError> {
            if self.fail {
                return Err(CommsError::BroadcastSendFailed);
            }
            self.datagrams.push(payload.to_vec());
            Ok(())
        }
    }

    fn publisher() -> TelemetryPublisher {
        TelemetryPublisher::new(TopicSet::new("HydroWort/Green"))
    }

    // ── Formatting round-trips ────────────────────────────────

    #[test]
    fn scalar_payloads_round_trip_at_stated_precision() {
        let r = reading();
        assert_eq!(tilt_payload(&r).as_str(), "25.3");
        assert_eq!(temperature_payload(&r).as_str(), "21.5");
        assert_eq!(gravity_payload(&r).as_str(), "1.052");
        assert_eq!(battery_payload(&r).as_str(), "100");

        assert!((tilt_payload(&r).parse::<f32>().unwrap() - 25.3).abs() < 1e-6);
        assert!((gravity_payload(&r).parse::<f32>().unwrap() - 1.052).abs() < 1e-6);
        assert_eq!(battery_payload(&r).parse::<u8>().unwrap(), 100);
    }

    #[test]
    fn datagram_parses_back_as_json() {
        let r = reading();
        let payload = datagram_payload(&r);
        let v: serde_json::Value = serde_json::from_str(payload.as_str()).unwrap();
        assert!((v["tilt"].as_f64().unwrap() - 25.3).abs() < 1e-9);
        assert!((v["temp"].as_f64().unwrap() - 21.5).abs() < 1e-9);
        assert!((v["sg"].as_f64().unwrap() - 1.052).abs() < 1e-9);
        assert_eq!(v["batt"].as_i64().unwrap(), 100);
    }

    #[test]
    fn topic_set_derives_from_root() {
        let t = TopicSet::new("HydroWort/Green");
        assert_eq!(t.tilt, "HydroWort/Green/TILT");
        assert_eq!(t.tare, "HydroWort/Green/TARE");
        assert_eq!(t.outbound().len(), 4);
    }

    // ── Dual-sink independence ────────────────────────────────

    #[test]
    fn publish_hits_all_four_topics_and_broadcast() {
        let p = publisher();
        let mut broker = MockBroker::new();
        let mut bcast = MockBroadcast::new();

        let outcome = p.publish(&reading(), &mut broker, &mut bcast);
        assert!(outcome.fully_delivered());
        assert_eq!(broker.published.len(), 4);
        assert_eq!(broker.published[0].0, "HydroWort/Green/TILT");
        assert_eq!(broker.published[0].1, "25.3");
        assert_eq!(bcast.datagrams.len(), 1);
    }

    #[test]
    fn broker_failure_does_not_block_broadcast() {
        let p = publisher();
        let mut broker = MockBroker::new();
        broker.fail = true;
        let mut bcast = MockBroadcast::new();

        let outcome = p.publish(&reading(), &mut broker, &mut bcast);
        assert_eq!(outcome.broker, Err(CommsError::BrokerPublishFailed));
        assert!(outcome.broadcast.is_ok());
        assert_eq!(bcast.datagrams.len(), 1);
    }

    #[test]
    fn broadcast_failure_does_not_block_broker() {
        let p = publisher();
        let mut broker = MockBroker::new();
        let mut bcast = MockBroadcast::new();
        bcast.fail = true;

        let outcome = p.publish(&reading(), &mut broker, &mut bcast);
        assert!(outcome.broker.is_ok());
        assert_eq!(outcome.broadcast, Err(CommsError::BroadcastSendFailed));
        assert_eq!(broker.published.len(), 4);
    }

    #[test]
    fn announce_publishes_baseline_everywhere() {
        let p = publisher();
        let mut broker = MockBroker::new();
        p.announce_baseline(&mut broker).unwrap();
        assert_eq!(broker.published.len(), 4);
        assert!(broker.published.iter().all(|(_, v)| v == "0"));
    }
}

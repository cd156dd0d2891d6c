//! MQTT broker-session adapter.
//!
//! Implements [`BrokerPort`].  On ESP-IDF this wraps `EspMqttClient`
//! with a connection-tracking callback; received messages on the
//! subscribed tare topic are handed to the lock-free control queue for
//! the supervisor to drain on its own pass.  On the host it is an
//! in-memory simulation with injectable connect failures.
//!
//! A failed or dropped session is cheap to replace: `connect()` always
//! builds a fresh client and discards the previous one, which is
//! exactly what the supervisor's full-handshake recovery wants.

use log::{debug, info, warn};

use crate::app::ports::BrokerPort;
use crate::error::CommsError;

#[cfg(target_os = "espidf")]
use std::sync::Arc;
#[cfg(target_os = "espidf")]
use std::sync::atomic::{AtomicBool, Ordering};

/// How long `connect()` waits for the broker to answer before giving
/// the supervisor its failure (which then applies the fixed retry
/// delay).
#[cfg(target_os = "espidf")]
const CONNECT_WAIT_MS: u32 = 5_000;
#[cfg(target_os = "espidf")]
const CONNECT_POLL_MS: u32 = 100;

pub struct MqttBroker {
    broker_url: String,
    #[cfg(target_os = "espidf")]
    client: Option<esp_idf_svc::mqtt::client::EspMqttClient<'static>>,
    #[cfg(target_os = "espidf")]
    connected: Arc<AtomicBool>,
    #[cfg(not(target_os = "espidf"))]
    sim_connected: bool,
    #[cfg(not(target_os = "espidf"))]
    sim_fail_connects: u32,
}

impl MqttBroker {
    pub fn new(broker_url: String) -> Self {
        Self {
            broker_url,
            #[cfg(target_os = "espidf")]
            client: None,
            #[cfg(target_os = "espidf")]
            connected: Arc::new(AtomicBool::new(false)),
            #[cfg(not(target_os = "espidf"))]
            sim_connected: false,
            #[cfg(not(target_os = "espidf"))]
            sim_fail_connects: 0,
        }
    }

    /// Make the next `n` simulated connect attempts fail.
    #[cfg(not(target_os = "espidf"))]
    pub fn sim_fail_connects(&mut self, n: u32) {
        self.sim_fail_connects = n;
    }

    // ── Platform-specific ─────────────────────────────────────

    #[cfg(target_os = "espidf")]
    fn platform_connect(&mut self, client_id: &str) -> Result<(), CommsError> {
        use esp_idf_svc::mqtt::client::{EspMqttClient, EventPayload, MqttClientConfiguration};

        // Drop any previous session before opening the new one.
        self.client = None;
        self.connected.store(false, Ordering::SeqCst);

        let mqtt_config = MqttClientConfiguration {
            client_id: Some(client_id),
            keep_alive_interval: Some(core::time::Duration::from_secs(30)),
            network_timeout: core::time::Duration::from_secs(2),
            ..Default::default()
        };

        let connected = self.connected.clone();
        let client = EspMqttClient::new_cb(&self.broker_url, &mqtt_config, move |event| {
            match event.payload() {
                EventPayload::Connected(_) => {
                    info!("MQTT: connected event");
                    connected.store(true, Ordering::SeqCst);
                }
                EventPayload::Disconnected => {
                    warn!("MQTT: disconnected event");
                    connected.store(false, Ordering::SeqCst);
                }
                EventPayload::Received { data, topic, .. } => {
                    debug!("MQTT: message on {:?} ({} bytes)", topic, data.len());
                    if !crate::events::push_control(data) {
                        warn!("MQTT: control queue full, message dropped");
                    }
                }
                EventPayload::Error(e) => {
                    warn!("MQTT: error event: {:?}", e);
                }
                _ => {}
            }
        })
        .map_err(|e| {
            warn!("MQTT: client create failed ({e})");
            CommsError::BrokerConnectFailed
        })?;

        self.client = Some(client);

        // Wait (bounded) for the connected event.
        let mut waited_ms = 0;
        while !self.connected.load(Ordering::SeqCst) {
            if waited_ms >= CONNECT_WAIT_MS {
                self.client = None;
                return Err(CommsError::BrokerConnectFailed);
            }
            esp_idf_hal::delay::FreeRtos::delay_ms(CONNECT_POLL_MS);
            waited_ms += CONNECT_POLL_MS;
        }
        Ok(())
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_connect(&mut self, client_id: &str) -> Result<(), CommsError> {
        if self.sim_fail_connects > 0 {
            self.sim_fail_connects -= 1;
            warn!("MQTT(sim): simulated connect failure to '{}'", self.broker_url);
            return Err(CommsError::BrokerConnectFailed);
        }
        info!("MQTT(sim): connected to '{}' as '{client_id}'", self.broker_url);
        self.sim_connected = true;
        Ok(())
    }
}

impl BrokerPort for MqttBroker {
    fn connect(&mut self, client_id: &str) -> Result<(), CommsError> {
        info!("MQTT: opening session to '{}' as '{client_id}'", self.broker_url);
        self.platform_connect(client_id)
    }

    #[cfg(target_os = "espidf")]
    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    #[cfg(not(target_os = "espidf"))]
    fn is_connected(&self) -> bool {
        self.sim_connected
    }

    #[cfg(target_os = "espidf")]
    fn publish(&mut self, topic: &str, payload: &str) -> Result<(), CommsError> {
        use esp_idf_svc::mqtt::client::QoS;

        let Some(client) = self.client.as_mut() else {
            return Err(CommsError::BrokerPublishFailed);
        };
        // QoS 0, non-blocking enqueue: telemetry is best-effort and the
        // next cycle brings fresh data anyway.
        client
            .enqueue(topic, QoS::AtMostOnce, false, payload.as_bytes())
            .map_err(|e| {
                warn!("MQTT: publish to '{topic}' failed ({e})");
                CommsError::BrokerPublishFailed
            })?;
        Ok(())
    }

    #[cfg(not(target_os = "espidf"))]
    fn publish(&mut self, topic: &str, payload: &str) -> Result<(), CommsError> {
        if !self.sim_connected {
            return Err(CommsError::BrokerPublishFailed);
        }
        debug!("MQTT(sim): {topic} <- {payload}");
        Ok(())
    }

    #[cfg(target_os = "espidf")]
    fn subscribe(&mut self, topic: &str) -> Result<(), CommsError> {
        use esp_idf_svc::mqtt::client::QoS;

        let Some(client) = self.client.as_mut() else {
            return Err(CommsError::SubscribeFailed);
        };
        client.subscribe(topic, QoS::AtLeastOnce).map_err(|e| {
            warn!("MQTT: subscribe to '{topic}' failed ({e})");
            CommsError::SubscribeFailed
        })?;
        Ok(())
    }

    #[cfg(not(target_os = "espidf"))]
    fn subscribe(&mut self, topic: &str) -> Result<(), CommsError> {
        if !self.sim_connected {
            return Err(CommsError::SubscribeFailed);
        }
        debug!("MQTT(sim): subscribed to {topic}");
        Ok(())
    }

    fn poll(&mut self) {
        // The ESP-IDF client is event-driven; there is nothing to pump.
        // The hook exists so a polled client implementation can slot in
        // behind the same port.
    }
}

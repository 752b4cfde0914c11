use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;

use rumqttc::{
    AsyncClient, ConnectReturnCode, Event, EventLoop, MqttOptions, Packet, QoS,
    TlsConfiguration, Transport,
};
use serde::Serialize;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use super::codec;
use super::messages::InboundMessage;
use crate::config::MqttConfig;
use crate::error::{RelayError, Result};

/// Connection lifecycle states.
///
/// Transitions to `Connected`/`Disconnected` are driven exclusively by
/// broker events observed on the network-loop task; `Connecting` and
/// `Failed` are set by the startup retry loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    Failed,
}

#[derive(Debug)]
struct SharedState(StdMutex<ConnectionState>);

impl SharedState {
    fn new() -> Self {
        Self(StdMutex::new(ConnectionState::Disconnected))
    }

    fn get(&self) -> ConnectionState {
        *self.0.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn set(&self, state: ConnectionState) {
        *self.0.lock().unwrap_or_else(|e| e.into_inner()) = state;
    }
}

/// Wait before the next connect attempt: `initial * 2^(attempt-1)`.
pub fn backoff_delay(initial: Duration, attempt: u32) -> Duration {
    initial.mul_f64(2f64.powi(attempt.saturating_sub(1) as i32))
}

fn map_qos(level: u8) -> Option<QoS> {
    match level {
        0 => Some(QoS::AtMostOnce),
        1 => Some(QoS::AtLeastOnce),
        2 => Some(QoS::ExactlyOnce),
        _ => None,
    }
}

/// MQTT client owning the single broker connection for the process.
///
/// The network loop must be started before the first connect attempt and
/// runs on its own task; connection state is therefore eventually
/// consistent and observers poll it rather than assuming it is current.
/// Automatic reconnection beyond the startup retry loop is deliberately
/// not performed by this client: after a mid-run disconnect, publishes
/// fail until the underlying event loop re-dials on its own.
pub struct MqttClient {
    client: AsyncClient,
    state: Arc<SharedState>,
    event_loop: StdMutex<Option<EventLoop>>,
    inbound_tx: StdMutex<Option<mpsc::Sender<InboundMessage>>>,
    loop_handle: StdMutex<Option<JoinHandle<()>>>,
    stop: Arc<AtomicBool>,
    max_payload_size: usize,
    host: String,
    port: u16,
}

impl MqttClient {
    /// Build the client from configuration. No network traffic happens
    /// here; the connection is dialed once the network loop polls.
    pub fn new(cfg: &MqttConfig, inbound_tx: mpsc::Sender<InboundMessage>) -> Result<Self> {
        if cfg.host.is_empty() {
            return Err(RelayError::Config("MQTT host must not be empty".to_string()));
        }
        if cfg.port == 0 {
            return Err(RelayError::Config(format!("invalid MQTT port: {}", cfg.port)));
        }

        let mut options = MqttOptions::new(cfg.client_id.clone(), cfg.host.clone(), cfg.port);
        options.set_keep_alive(Duration::from_secs(60));
        options.set_max_packet_size(cfg.max_payload_size, cfg.max_payload_size);
        if !cfg.username.is_empty() {
            options.set_credentials(cfg.username.clone(), cfg.password.clone());
        }
        if cfg.tls {
            options.set_transport(Transport::Tls(TlsConfiguration::Native));
        }

        let (client, event_loop) = AsyncClient::new(options, 32);

        Ok(Self {
            client,
            state: Arc::new(SharedState::new()),
            event_loop: StdMutex::new(Some(event_loop)),
            inbound_tx: StdMutex::new(Some(inbound_tx)),
            loop_handle: StdMutex::new(None),
            stop: Arc::new(AtomicBool::new(false)),
            max_payload_size: cfg.max_payload_size,
            host: cfg.host.clone(),
            port: cfg.port,
        })
    }

    /// Start the network loop task. Idempotent: subsequent calls are no-ops.
    pub fn start_network_loop(&self) {
        let mut loop_guard = self.event_loop.lock().unwrap_or_else(|e| e.into_inner());
        let Some(mut event_loop) = loop_guard.take() else {
            debug!("network loop already started");
            return;
        };
        let tx = self
            .inbound_tx
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take();
        let Some(tx) = tx else {
            debug!("network loop already started");
            return;
        };

        let state = Arc::clone(&self.state);
        let stop = Arc::clone(&self.stop);
        let max_payload_size = self.max_payload_size;

        let handle = tokio::spawn(async move {
            info!("MQTT network loop started");

            while !stop.load(Ordering::SeqCst) {
                match event_loop.poll().await {
                    Ok(Event::Incoming(Packet::ConnAck(ack))) => {
                        if ack.code == ConnectReturnCode::Success {
                            state.set(ConnectionState::Connected);
                            info!("MQTT connected");
                        } else {
                            state.set(ConnectionState::Disconnected);
                            error!("MQTT connection refused: {:?}", ack.code);
                        }
                    }
                    Ok(Event::Incoming(Packet::Publish(publish))) => {
                        match codec::decode_inbound(&publish.payload, max_payload_size) {
                            Ok(value) => {
                                let msg = InboundMessage {
                                    topic: publish.topic.clone(),
                                    payload: value,
                                };
                                if tx.send(msg).await.is_err() {
                                    debug!("inbound channel closed, stopping network loop");
                                    break;
                                }
                            }
                            Err(e) => {
                                warn!("dropping inbound message on {}: {}", publish.topic, e);
                            }
                        }
                    }
                    Ok(Event::Incoming(Packet::Disconnect)) => {
                        state.set(ConnectionState::Disconnected);
                        warn!("MQTT disconnected by broker");
                    }
                    Ok(_) => {}
                    Err(e) => {
                        if stop.load(Ordering::SeqCst) {
                            break;
                        }
                        state.set(ConnectionState::Disconnected);
                        warn!("MQTT network loop error: {e}");
                        // The next poll re-dials; pace it to avoid a tight error loop.
                        tokio::time::sleep(Duration::from_secs(1)).await;
                    }
                }
            }

            state.set(ConnectionState::Disconnected);
            info!("MQTT network loop stopped");
        });

        *self.loop_handle.lock().unwrap_or_else(|e| e.into_inner()) = Some(handle);
    }

    /// Connect with exponential backoff between attempts.
    ///
    /// Each attempt waits up to `per_attempt_timeout` for the broker
    /// acknowledgment, polling the shared state in short sleeps (the
    /// acknowledgment arrives asynchronously on the network-loop task).
    /// Returns false when all attempts fail.
    pub async fn connect(
        &self,
        retries: u32,
        initial_backoff: Duration,
        per_attempt_timeout: Duration,
    ) -> bool {
        self.start_network_loop();
        self.state.set(ConnectionState::Connecting);

        let retries = retries.max(1);
        for attempt in 1..=retries {
            info!(
                "connecting to MQTT broker {}:{} (attempt {}/{})",
                self.host, self.port, attempt, retries
            );

            let deadline = tokio::time::Instant::now() + per_attempt_timeout;
            while tokio::time::Instant::now() < deadline {
                if self.state.get() == ConnectionState::Connected {
                    info!("MQTT connection established");
                    return true;
                }
                tokio::time::sleep(Duration::from_millis(100)).await;
            }
            warn!("MQTT connection attempt {} timed out", attempt);

            if attempt < retries {
                let wait = backoff_delay(initial_backoff, attempt);
                info!("waiting {:.1}s before next attempt", wait.as_secs_f64());
                tokio::time::sleep(wait).await;
            }
        }

        self.state.set(ConnectionState::Failed);
        false
    }

    /// Publish a raw payload. Returns false (with no network write) when
    /// not connected, when the topic is empty, when the payload exceeds
    /// the maximum size, or when the transport reports an error. No retry
    /// is performed here; the caller decides whether to retry.
    pub async fn publish(&self, topic: &str, payload: &[u8], qos_level: u8, retain: bool) -> bool {
        if topic.is_empty() {
            error!("cannot publish: empty topic");
            return false;
        }
        if !self.is_connected() {
            error!("cannot publish: not connected");
            return false;
        }
        if payload.len() > self.max_payload_size {
            error!(
                "payload too large to publish: {} bytes (max {})",
                payload.len(),
                self.max_payload_size
            );
            return false;
        }
        let Some(qos) = map_qos(qos_level) else {
            error!("invalid QoS level: {qos_level}");
            return false;
        };

        match self.client.publish(topic, qos, retain, payload.to_vec()).await {
            Ok(()) => {
                debug!("published {} bytes to {}", payload.len(), topic);
                true
            }
            Err(e) => {
                error!("MQTT publish to {} failed: {e}", topic);
                false
            }
        }
    }

    /// Serialize a value to JSON and publish it.
    pub async fn publish_json<T: Serialize>(
        &self,
        topic: &str,
        value: &T,
        qos: u8,
        retain: bool,
    ) -> bool {
        let payload = match codec::encode(value) {
            Ok(payload) => payload,
            Err(e) => {
                error!("failed to encode payload for {}: {e}", topic);
                return false;
            }
        };
        self.publish(topic, &payload, qos, retain).await
    }

    pub async fn subscribe(&self, topic: &str, qos_level: u8) -> bool {
        let Some(qos) = map_qos(qos_level) else {
            error!("invalid QoS level: {qos_level}");
            return false;
        };
        match self.client.subscribe(topic, qos).await {
            Ok(()) => {
                info!("subscribed to {}", topic);
                true
            }
            Err(e) => {
                error!("MQTT subscribe to {} failed: {e}", topic);
                false
            }
        }
    }

    /// Best-effort graceful close. Errors are logged, never propagated,
    /// so shutdown is not blocked by transport failure.
    pub async fn disconnect(&self) {
        match self.client.disconnect().await {
            Ok(()) => info!("MQTT disconnected"),
            Err(e) => error!("error during MQTT disconnect: {e}"),
        }
        self.state.set(ConnectionState::Disconnected);
    }

    /// Stop the network loop task. Best-effort; safe to call when the
    /// loop was never started.
    pub fn stop_network_loop(&self) {
        self.stop.store(true, Ordering::SeqCst);
        let handle = self
            .loop_handle
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take();
        if let Some(handle) = handle {
            handle.abort();
            debug!("network loop task stopped");
        }
    }

    pub fn is_connected(&self) -> bool {
        self.state.get() == ConnectionState::Connected
    }

    pub fn state(&self) -> ConnectionState {
        self.state.get()
    }
}

#[async_trait::async_trait]
impl super::RelayTransport for MqttClient {
    fn is_connected(&self) -> bool {
        MqttClient::is_connected(self)
    }

    async fn publish_json(
        &self,
        topic: &str,
        payload: &serde_json::Value,
        qos: u8,
        retain: bool,
    ) -> bool {
        MqttClient::publish_json(self, topic, payload, qos, retain).await
    }

    async fn subscribe(&self, topic: &str, qos: u8) -> bool {
        MqttClient::subscribe(self, topic, qos).await
    }
}

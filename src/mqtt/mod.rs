pub mod client;
pub mod codec;
pub mod messages;

use async_trait::async_trait;
use serde_json::Value;

pub use client::{backoff_delay, ConnectionState, MqttClient};
pub use messages::{epoch_seconds, CommandMessage, InboundMessage, ResponseMessage};

/// Outbound seam between the orchestrator and the broker connection.
#[async_trait]
pub trait RelayTransport: Send + Sync {
    fn is_connected(&self) -> bool;

    /// Publish a JSON payload; returns false on any failure.
    async fn publish_json(&self, topic: &str, payload: &Value, qos: u8, retain: bool) -> bool;

    async fn subscribe(&self, topic: &str, qos: u8) -> bool;
}

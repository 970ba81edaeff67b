//! Publish/subscribe transports. Inbound traffic is decoded and pushed into the
//! ingestion queue from the transport's own thread; the control loop only
//! ever publishes.

use crate::{ingest::IngestProducer, payload::Outbound, Result};

mod loopback;
#[cfg(feature = "mqtt")]
mod mqtt;

pub use loopback::LoopbackTransport;
#[cfg(feature = "mqtt")]
pub use mqtt::MqttTransport;

pub const DEFAULT_BROKER_HOST: &str = "broker.hivemq.com";
pub const DEFAULT_BROKER_PORT: u16 = 1883;
pub const DEFAULT_TOPIC: &str = "gym/project";
pub const DEFAULT_CLIENT_ID: &str = "AC_Client";

/// Where and as whom to connect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportOptions {
    pub host: String,
    pub port: u16,
    pub topic: String,
    pub client_id: String,
}

impl Default for TransportOptions {
    fn default() -> Self {
        Self {
            host: DEFAULT_BROKER_HOST.to_string(),
            port: DEFAULT_BROKER_PORT,
            topic: DEFAULT_TOPIC.to_string(),
            client_id: DEFAULT_CLIENT_ID.to_string(),
        }
    }
}

pub trait Transport {
    /// Queue `payload` for delivery on the configured topic. Must not block
    /// the caller on the network. Failures are also surfaced as
    /// `SystemEvent::TransportFailure` through the ingestion queue.
    fn publish(&self, payload: &Outbound) -> Result<()>;

    /// Best-effort disconnect; idempotent.
    fn stop(&mut self);

    fn name(&self) -> &'static str;
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn publish(&self, payload: &Outbound) -> Result<()> {
        (**self).publish(payload)
    }

    fn stop(&mut self) {
        (**self).stop()
    }

    fn name(&self) -> &'static str {
        (**self).name()
    }
}

/// Pick the live broker transport, or the loopback when `offline`.
pub fn open_transport(
    options: &TransportOptions,
    producer: IngestProducer,
    offline: bool,
) -> Result<Box<dyn Transport>> {
    if offline {
        return Ok(Box::new(LoopbackTransport::new(producer)));
    }
    open_broker(options, producer)
}

#[cfg(feature = "mqtt")]
fn open_broker(options: &TransportOptions, producer: IngestProducer) -> Result<Box<dyn Transport>> {
    Ok(Box::new(MqttTransport::connect(options, producer)?))
}

#[cfg(not(feature = "mqtt"))]
fn open_broker(_options: &TransportOptions, _producer: IngestProducer) -> Result<Box<dyn Transport>> {
    Err(crate::Error::InvalidArgs(
        "built without mqtt support; run with --offline".into(),
    ))
}

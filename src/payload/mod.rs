//! Messages that cross the ingestion queue, plus the JSON wire codec.

use std::fmt;
use std::time::SystemTime;

mod parser;

pub use parser::{decode_inbound, Outbound, MAX_RAW_NOTICE_BYTES};

/// One temperature/humidity sample.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SensorReading {
    pub timestamp: SystemTime,
    /// Degrees Celsius.
    pub temperature: f64,
    /// Relative humidity, percent.
    pub humidity: f64,
}

impl SensorReading {
    pub fn new(timestamp: SystemTime, temperature: f64, humidity: f64) -> Self {
        Self {
            timestamp,
            temperature,
            humidity,
        }
    }

    pub fn now(temperature: f64, humidity: f64) -> Self {
        Self::new(SystemTime::now(), temperature, humidity)
    }
}

/// Relay intent that does not come from a temperature sample.
///
/// A button press is a one-shot flip; the override is a sticky flag that holds
/// the relay on until cleared. They are deliberately separate variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlEvent {
    ButtonPressed,
    ManualOverride(bool),
}

/// Transport lifecycle notices. Surfaced to the operator, never acted on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SystemEvent {
    Connected,
    ConnectFailed { reason: String },
    Disconnected,
    TransportFailure { context: String, message: String },
    /// Payload that could not be decoded into a known message.
    Unrecognized { raw: String },
}

impl SystemEvent {
    pub fn is_failure(&self) -> bool {
        !matches!(self, SystemEvent::Connected)
    }
}

impl fmt::Display for SystemEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SystemEvent::Connected => f.write_str("broker connected"),
            SystemEvent::ConnectFailed { reason } => write!(f, "broker refused connection: {reason}"),
            SystemEvent::Disconnected => f.write_str("broker disconnected"),
            SystemEvent::TransportFailure { context, message } => {
                write!(f, "transport {context} error: {message}")
            }
            SystemEvent::Unrecognized { raw } => write!(f, "unrecognized message: {raw}"),
        }
    }
}

/// The unit handed from the producer context to the control loop.
#[derive(Debug, Clone, PartialEq)]
pub enum IngestionMessage {
    Reading(SensorReading),
    Control(ControlEvent),
    System(SystemEvent),
}

impl From<SensorReading> for IngestionMessage {
    fn from(value: SensorReading) -> Self {
        IngestionMessage::Reading(value)
    }
}

impl From<ControlEvent> for IngestionMessage {
    fn from(value: ControlEvent) -> Self {
        IngestionMessage::Control(value)
    }
}

impl From<SystemEvent> for IngestionMessage {
    fn from(value: SystemEvent) -> Self {
        IngestionMessage::System(value)
    }
}

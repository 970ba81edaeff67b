use crate::Result;
use serde::{Deserialize, Serialize};
use std::time::SystemTime;

use super::{ControlEvent, IngestionMessage, SensorReading, SystemEvent};

/// Unrecognized payloads are echoed into notices, cut to this many bytes.
pub const MAX_RAW_NOTICE_BYTES: usize = 256;

#[derive(Debug, Deserialize)]
struct InboundPayload {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    temperature: Option<f64>,
    #[serde(default)]
    humidity: Option<f64>,
    #[serde(default)]
    manual_override: Option<bool>,
    #[serde(default)]
    enabled: Option<bool>,
}

/// Payloads this node publishes on the shared topic.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Outbound {
    Sensor { temperature: f64, humidity: f64 },
    ButtonPressed,
    ManualOverride { enabled: bool },
}

impl Outbound {
    pub fn encode(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Outbound::Sensor { .. } => "sensor",
            Outbound::ButtonPressed => "button_pressed",
            Outbound::ManualOverride { .. } => "manual_override",
        }
    }
}

/// Decode one inbound payload. Never fails: anything that is not a known
/// message becomes `SystemEvent::Unrecognized`.
///
/// A sensor payload carrying `manual_override` yields the override event first
/// so the flag is in place when the reading is applied.
pub fn decode_inbound(raw: &[u8], received_at: SystemTime) -> Vec<IngestionMessage> {
    let text = String::from_utf8_lossy(raw);
    let payload: InboundPayload = match serde_json::from_str(&text) {
        Ok(payload) => payload,
        Err(_) => return vec![unrecognized(&text)],
    };

    match payload.kind.as_str() {
        "sensor" => match (payload.temperature, payload.humidity) {
            (Some(temperature), Some(humidity))
                if temperature.is_finite() && humidity.is_finite() =>
            {
                let mut out = Vec::with_capacity(2);
                if let Some(flag) = payload.manual_override {
                    out.push(ControlEvent::ManualOverride(flag).into());
                }
                out.push(SensorReading::new(received_at, temperature, humidity).into());
                out
            }
            _ => vec![unrecognized(&text)],
        },
        "button_pressed" => vec![ControlEvent::ButtonPressed.into()],
        "manual_override" => match payload.enabled {
            Some(flag) => vec![ControlEvent::ManualOverride(flag).into()],
            None => vec![unrecognized(&text)],
        },
        _ => vec![unrecognized(&text)],
    }
}

fn unrecognized(text: &str) -> IngestionMessage {
    SystemEvent::Unrecognized {
        raw: truncate_raw(text),
    }
    .into()
}

fn truncate_raw(text: &str) -> String {
    if text.len() <= MAX_RAW_NOTICE_BYTES {
        return text.to_string();
    }
    let mut end = MAX_RAW_NOTICE_BYTES;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &text[..end])
}

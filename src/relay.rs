use std::fmt;

use crate::payload::{ControlEvent, SensorReading};

pub const DEFAULT_TEMP_THRESHOLD: f64 = 30.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RelayState {
    #[default]
    Off,
    On,
}

impl RelayState {
    pub fn is_on(self) -> bool {
        matches!(self, RelayState::On)
    }

    pub fn toggled(self) -> Self {
        match self {
            RelayState::Off => RelayState::On,
            RelayState::On => RelayState::Off,
        }
    }

    /// Persisted `relay_status` column value.
    pub fn as_status(self) -> u8 {
        match self {
            RelayState::Off => 0,
            RelayState::On => 1,
        }
    }

    pub fn from_status(status: u8) -> Option<Self> {
        match status {
            0 => Some(RelayState::Off),
            1 => Some(RelayState::On),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            RelayState::Off => "OFF",
            RelayState::On => "ON",
        }
    }
}

impl From<bool> for RelayState {
    fn from(on: bool) -> Self {
        if on {
            RelayState::On
        } else {
            RelayState::Off
        }
    }
}

impl fmt::Display for RelayState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Anything the controller reacts to.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RelayInput {
    Reading { temperature: f64 },
    Control(ControlEvent),
}

impl From<&SensorReading> for RelayInput {
    fn from(reading: &SensorReading) -> Self {
        RelayInput::Reading {
            temperature: reading.temperature,
        }
    }
}

impl From<ControlEvent> for RelayInput {
    fn from(event: ControlEvent) -> Self {
        RelayInput::Control(event)
    }
}

/// Result of one `apply`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub state: RelayState,
    pub changed: bool,
}

/// Threshold relay with a sticky manual override and a one-shot toggle.
///
/// No hysteresis: a temperature hovering at the threshold flips the relay on
/// every reading that crosses it.
#[derive(Debug, Clone)]
pub struct RelayController {
    threshold: f64,
    current: RelayState,
    manual_override: bool,
}

impl RelayController {
    pub fn new(threshold: f64) -> Self {
        Self {
            threshold,
            current: RelayState::Off,
            manual_override: false,
        }
    }

    pub fn state(&self) -> RelayState {
        self.current
    }

    pub fn manual_override(&self) -> bool {
        self.manual_override
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub fn is_over_threshold(&self, temperature: f64) -> bool {
        temperature >= self.threshold
    }

    pub fn apply(&mut self, input: impl Into<RelayInput>) -> Transition {
        let previous = self.current;
        match input.into() {
            RelayInput::Reading { temperature } => {
                let auto_on = self.is_over_threshold(temperature);
                self.current = RelayState::from(auto_on || self.manual_override);
            }
            RelayInput::Control(ControlEvent::ButtonPressed) => {
                self.current = self.current.toggled();
            }
            RelayInput::Control(ControlEvent::ManualOverride(flag)) => {
                // Takes effect on the next reading.
                self.manual_override = flag;
            }
        }
        Transition {
            state: self.current,
            changed: self.current != previous,
        }
    }
}

impl Default for RelayController {
    fn default() -> Self {
        Self::new(DEFAULT_TEMP_THRESHOLD)
    }
}

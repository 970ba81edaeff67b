//! Presentation side of the daemon: notices, the pull-based state view and
//! the terminal renderer.

use std::fmt;
use std::io::{self, Write};
use std::time::SystemTime;

use super::LogLevel;
use crate::{
    history::HistoryEntry, payload::SensorReading, relay::RelayState, storage::StoredRecord,
};

/// Timestamped operator-facing message.
#[derive(Debug, Clone, PartialEq)]
pub struct Notice {
    pub at: SystemTime,
    pub level: LogLevel,
    pub text: String,
}

impl Notice {
    pub fn new(level: LogLevel, text: impl Into<String>) -> Self {
        Self {
            at: SystemTime::now(),
            level,
            text: text.into(),
        }
    }
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} - {}",
            humantime::format_rfc3339_seconds(self.at),
            self.text
        )
    }
}

/// Everything a dashboard needs after a tick.
#[derive(Debug, Clone, PartialEq)]
pub struct DashboardView {
    pub relay: RelayState,
    pub manual_override: bool,
    pub threshold: f64,
    pub latest: Option<SensorReading>,
    pub history: Vec<HistoryEntry>,
    pub history_capacity: usize,
}

pub trait Presenter {
    fn notice(&mut self, notice: &Notice);
    /// Called once per tick after all drained messages are processed.
    fn refresh(&mut self, view: &DashboardView);
    fn show_records(&mut self, records: &[StoredRecord]);
}

/// Line-oriented presenter; write errors are ignored.
pub struct TerminalPresenter<W: Write> {
    out: W,
}

impl TerminalPresenter<io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write> TerminalPresenter<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> Presenter for TerminalPresenter<W> {
    fn notice(&mut self, notice: &Notice) {
        let _ = writeln!(self.out, "{notice}");
    }

    fn refresh(&mut self, view: &DashboardView) {
        let _ = writeln!(self.out, "{}", format_status(view));
        let _ = self.out.flush();
    }

    fn show_records(&mut self, records: &[StoredRecord]) {
        if records.is_empty() {
            let _ = writeln!(self.out, "No records found.");
            return;
        }
        let _ = writeln!(self.out, "Last {} records:", records.len());
        for stored in records {
            let _ = writeln!(self.out, "{}", format_record(stored));
        }
        let _ = self.out.flush();
    }
}

pub fn format_record(stored: &StoredRecord) -> String {
    let record = &stored.record;
    format!(
        "{} | Temp: {:.1}°C | Hum: {:.1}% | Relay: {}",
        humantime::format_rfc3339_seconds(record.timestamp),
        record.temperature,
        record.humidity,
        record.relay
    )
}

pub fn format_status(view: &DashboardView) -> String {
    let reading = match view.latest {
        Some(r) => format!("Temp: {:.1}°C | Hum: {:.1}%", r.temperature, r.humidity),
        None => "Temp: --.-°C | Hum: --.-%".to_string(),
    };
    let relay = if view.manual_override {
        format!("{} (override)", view.relay)
    } else {
        view.relay.to_string()
    };
    format!(
        "{reading} | Relay: {relay} | Threshold: {:.1}°C | Samples: {}/{}",
        view.threshold,
        view.history.len(),
        view.history_capacity
    )
}

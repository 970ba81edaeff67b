//! Periodic control tick: the single consumer of the ingestion queue and the
//! only owner of relay, history and storage state.

use std::time::Duration;

use crossbeam::channel::{self, never, select, tick, Receiver};

use super::{
    console::{OperatorCommand, CONSOLE_HELP},
    dashboard::{DashboardView, Notice, Presenter},
    synthetic::ReadingSource,
    LogLevel, Logger,
};
use crate::{
    history::{HistoryBuffer, HistoryEntry},
    ingest::IngestConsumer,
    payload::{ControlEvent, IngestionMessage, Outbound, SensorReading, SystemEvent},
    relay::RelayController,
    storage::{PersistedRecord, RecordStore},
    transport::Transport,
};

/// Counts of what one tick processed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickReport {
    pub readings: usize,
    pub persisted: usize,
    pub storage_failures: usize,
    pub control_events: usize,
    pub system_events: usize,
}

impl TickReport {
    pub fn is_idle(&self) -> bool {
        self.readings == 0 && self.control_events == 0 && self.system_events == 0
    }
}

/// What the driver should do after an operator command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandOutcome {
    Continue,
    Quit,
}

pub struct ControlLoop<'a, S, T, P> {
    relay: RelayController,
    history: HistoryBuffer,
    latest: Option<SensorReading>,
    consumer: IngestConsumer,
    store: S,
    transport: T,
    presenter: P,
    source: Option<Box<dyn ReadingSource + 'a>>,
    logger: &'a Logger,
}

impl<'a, S, T, P> ControlLoop<'a, S, T, P>
where
    S: RecordStore,
    T: Transport,
    P: Presenter,
{
    pub fn new(
        relay: RelayController,
        history: HistoryBuffer,
        consumer: IngestConsumer,
        store: S,
        transport: T,
        presenter: P,
        logger: &'a Logger,
    ) -> Self {
        Self {
            relay,
            history,
            latest: None,
            consumer,
            store,
            transport,
            presenter,
            source: None,
            logger,
        }
    }

    /// Publish one reading from `source` at the start of every tick.
    pub fn with_source(mut self, source: impl ReadingSource + 'a) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    /// Run one control cycle.
    ///
    /// Messages already queued are processed in arrival order; anything that
    /// arrives while the batch is running waits for the next tick.
    pub fn tick(&mut self) -> TickReport {
        let mut report = TickReport::default();

        if let Some(source) = self.source.as_mut() {
            if let Some(reading) = source.next_reading() {
                let payload = Outbound::Sensor {
                    temperature: reading.temperature,
                    humidity: reading.humidity,
                };
                // Failures come back through the queue as system events.
                if let Err(err) = self.transport.publish(&payload) {
                    self.logger.debug(format!("synthetic publish failed: {err}"));
                }
            }
        }

        for msg in self.consumer.drain_all() {
            match msg {
                IngestionMessage::Reading(reading) => self.accept_reading(reading, &mut report),
                IngestionMessage::Control(event) => self.apply_control(event, &mut report),
                IngestionMessage::System(event) => self.forward_system(event, &mut report),
            }
        }

        let view = self.view();
        self.presenter.refresh(&view);
        if !report.is_idle() {
            self.logger.debug(format!("tick: {report:?}"));
        }
        report
    }

    fn accept_reading(&mut self, reading: SensorReading, report: &mut TickReport) {
        report.readings += 1;
        let transition = self.relay.apply(&reading);
        self.latest = Some(reading);
        self.history.push(HistoryEntry::from(&reading));

        let record = PersistedRecord::from_reading(&reading, transition.state);
        match self.store.append(&record) {
            Ok(id) => {
                report.persisted += 1;
                self.logger.trace(format!("stored record #{id}"));
            }
            Err(err) => {
                report.storage_failures += 1;
                self.notify(LogLevel::Warn, err.to_string());
            }
        }

        if self.relay.is_over_threshold(reading.temperature) {
            self.notify(
                LogLevel::Warn,
                format!("High temperature: {:.1}°C", reading.temperature),
            );
        }
        if transition.changed {
            self.logger.info(format!(
                "relay {} at {:.1}°C",
                transition.state, reading.temperature
            ));
        }
    }

    fn apply_control(&mut self, event: ControlEvent, report: &mut TickReport) {
        report.control_events += 1;
        let transition = self.relay.apply(event);
        let text = match event {
            ControlEvent::ButtonPressed => {
                format!("Button press received → Relay {}", transition.state)
            }
            ControlEvent::ManualOverride(true) => {
                format!("Manual override enabled → Relay {}", transition.state)
            }
            ControlEvent::ManualOverride(false) => "Manual override disabled".to_string(),
        };
        self.notify(LogLevel::Info, text);
    }

    fn forward_system(&mut self, event: SystemEvent, report: &mut TickReport) {
        report.system_events += 1;
        let level = if event.is_failure() {
            LogLevel::Warn
        } else {
            LogLevel::Info
        };
        self.notify(level, event.to_string());
    }

    fn notify(&mut self, level: LogLevel, text: impl Into<String>) {
        let notice = Notice::new(level, text);
        self.logger.log(level, &notice.text);
        self.presenter.notice(&notice);
    }

    /// Act on one operator command between ticks.
    pub fn handle_command(&mut self, cmd: OperatorCommand) -> CommandOutcome {
        match cmd {
            OperatorCommand::Press => {
                if self.transport.publish(&Outbound::ButtonPressed).is_ok() {
                    self.notify(LogLevel::Info, "Manual button pressed → published");
                }
            }
            OperatorCommand::Override(enabled) => {
                if self
                    .transport
                    .publish(&Outbound::ManualOverride { enabled })
                    .is_ok()
                {
                    let state = if enabled { "on" } else { "off" };
                    self.notify(LogLevel::Info, format!("Manual override {state} → published"));
                }
            }
            OperatorCommand::Records(limit) => match self.store.recent(limit) {
                Ok(records) => self.presenter.show_records(&records),
                Err(err) => self.notify(LogLevel::Warn, format!("Error reading records: {err}")),
            },
            OperatorCommand::Status => {
                let view = self.view();
                self.presenter.refresh(&view);
            }
            OperatorCommand::Help => eprint!("{CONSOLE_HELP}"),
            OperatorCommand::Quit => return CommandOutcome::Quit,
        }
        CommandOutcome::Continue
    }

    pub fn view(&self) -> DashboardView {
        DashboardView {
            relay: self.relay.state(),
            manual_override: self.relay.manual_override(),
            threshold: self.relay.threshold(),
            latest: self.latest,
            history: self.history.snapshot(),
            history_capacity: self.history.capacity(),
        }
    }

    /// Disconnect the transport, then close the store. Queued messages are
    /// not processed.
    pub fn shutdown(&mut self) {
        self.transport.stop();
        if let Err(err) = self.store.close() {
            self.logger.warn(format!("closing store: {err}"));
        }
        self.logger.info("daemon exiting");
    }

    pub fn relay(&self) -> &RelayController {
        &self.relay
    }

    pub fn history(&self) -> &HistoryBuffer {
        &self.history
    }

    pub fn latest(&self) -> Option<&SensorReading> {
        self.latest.as_ref()
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn presenter(&self) -> &P {
        &self.presenter
    }
}

/// Drive `control` until shutdown is signalled or the operator quits.
///
/// Ticks fire every `interval`; operator commands are handled as they arrive.
/// A closed command channel (console EOF) only stops command handling.
pub fn run_control_loop<S, T, P>(
    control: &mut ControlLoop<'_, S, T, P>,
    interval: Duration,
    commands: Receiver<OperatorCommand>,
    shutdown: Receiver<()>,
) where
    S: RecordStore,
    T: Transport,
    P: Presenter,
{
    let ticker = tick(interval);
    let mut console_open = true;
    control.tick();

    loop {
        let commands = if console_open {
            commands.clone()
        } else {
            never()
        };
        select! {
            recv(ticker) -> _ => {
                control.tick();
            }
            recv(commands) -> msg => match msg {
                Ok(cmd) => {
                    if control.handle_command(cmd) == CommandOutcome::Quit {
                        control.logger.info("quit requested from console");
                        break;
                    }
                }
                Err(_) => {
                    control.logger.debug("console closed; continuing without it");
                    console_open = false;
                }
            },
            recv(shutdown) -> _ => {
                control.logger.info("shutdown signal received");
                break;
            }
        }
    }
}

/// Command channel for callers that have no console.
pub fn no_commands() -> Receiver<OperatorCommand> {
    channel::never()
}

use crate::{
    cli::{RecordsOptions, RunOptions},
    config::Config,
    history::HistoryBuffer,
    ingest,
    relay::RelayController,
    storage::{self, JsonlStore},
    transport::{open_transport, TransportOptions},
    Result,
};
use crossbeam::channel;
use std::{path::Path, str::FromStr, time::Duration};

mod console;
mod control_loop;
mod dashboard;
mod lifecycle;
mod logger;
mod synthetic;

pub use console::{spawn_console, OperatorCommand, CONSOLE_HELP};
pub use control_loop::{no_commands, run_control_loop, CommandOutcome, ControlLoop, TickReport};
pub use dashboard::{
    format_record, format_status, DashboardView, Notice, Presenter, TerminalPresenter,
};
use lifecycle::create_shutdown_signal;
pub use logger::{LogLevel, Logger};
pub use synthetic::{ReadingSource, SyntheticSensor};

/// Config for the daemon: the config file merged with CLI overrides.
#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub transport: TransportOptions,
    pub temp_threshold: f64,
    pub tick_interval_ms: u64,
    pub history_capacity: usize,
    pub store_path: String,
    pub synthetic: bool,
    pub offline: bool,
    pub log_level: LogLevel,
    pub log_file: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        let cfg = Config::default();
        Self {
            transport: cfg.transport_options(),
            temp_threshold: cfg.temp_threshold,
            tick_interval_ms: cfg.tick_interval_ms,
            history_capacity: cfg.history_capacity,
            store_path: cfg.store_path,
            synthetic: cfg.synthetic_sensor,
            offline: false,
            log_level: LogLevel::default(),
            log_file: None,
        }
    }
}

impl AppConfig {
    /// CLI values win over file values; the merged result is validated.
    pub fn from_sources(config: Config, opts: RunOptions) -> Result<Self> {
        let merged = Config {
            broker_host: opts.host.unwrap_or(config.broker_host),
            broker_port: opts.port.unwrap_or(config.broker_port),
            topic: opts.topic.unwrap_or(config.topic),
            client_id: opts.client_id.unwrap_or(config.client_id),
            temp_threshold: opts.threshold.unwrap_or(config.temp_threshold),
            tick_interval_ms: opts.tick_ms.unwrap_or(config.tick_interval_ms),
            history_capacity: opts.history.unwrap_or(config.history_capacity),
            store_path: opts.store.unwrap_or(config.store_path),
            synthetic_sensor: config.synthetic_sensor && !opts.no_synthetic,
        };
        crate::config::validate(&merged)?;

        Ok(Self {
            transport: merged.transport_options(),
            temp_threshold: merged.temp_threshold,
            tick_interval_ms: merged.tick_interval_ms,
            history_capacity: merged.history_capacity,
            store_path: merged.store_path,
            synthetic: merged.synthetic_sensor,
            offline: opts.offline,
            log_level: opts
                .log_level
                .as_deref()
                .and_then(|s| LogLevel::from_str(s).ok())
                .unwrap_or_default(),
            log_file: opts.log_file,
        })
    }
}

pub struct App {
    config: AppConfig,
    logger: Logger,
}

impl App {
    pub fn new(config: AppConfig) -> Result<Self> {
        let logger = Logger::new(config.log_level, config.log_file.clone())?;
        Ok(Self { config, logger })
    }

    pub fn from_options(opts: RunOptions) -> Result<Self> {
        let cfg_file = Config::load_or_default()?;
        let merged = AppConfig::from_sources(cfg_file, opts)?;
        Self::new(merged)
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Entry point for the daemon. Blocks until ctrl-c or `quit`.
    pub fn run(&self) -> Result<()> {
        let config = &self.config;
        self.logger.info(format!(
            "daemon start (broker={}:{}, topic={}, threshold={:.1}, tick={}ms)",
            config.transport.host,
            config.transport.port,
            config.transport.topic,
            config.temp_threshold,
            config.tick_interval_ms
        ));

        // The store must be usable before anything is consumed.
        let store = JsonlStore::open(&config.store_path)?;
        self.logger
            .info(format!("recording to {}", store.path().display()));

        let shutdown = create_shutdown_signal()?;
        let (producer, consumer) = ingest::queue();
        let transport = open_transport(&config.transport, producer, config.offline)?;
        self.logger.info(format!("transport: {}", transport.name()));

        let mut control = ControlLoop::new(
            RelayController::new(config.temp_threshold),
            HistoryBuffer::new(config.history_capacity),
            consumer,
            store,
            transport,
            TerminalPresenter::stdout(),
            &self.logger,
        );
        if config.synthetic {
            control = control.with_source(SyntheticSensor::new());
        }

        let (cmd_tx, cmd_rx) = channel::unbounded();
        let commands = match spawn_console(cmd_tx) {
            Ok(()) => cmd_rx,
            Err(err) => {
                self.logger
                    .warn(format!("console unavailable: {err}"));
                no_commands()
            }
        };

        run_control_loop(
            &mut control,
            Duration::from_millis(config.tick_interval_ms),
            commands,
            shutdown,
        );
        control.shutdown();
        Ok(())
    }
}

/// Print the most recent records from the store, newest first.
pub fn show_records(opts: RecordsOptions) -> Result<()> {
    let store_path = match opts.store {
        Some(path) => path,
        None => Config::load_or_default()?.store_path,
    };
    let records = storage::read_recent(Path::new(&store_path), opts.limit)?;
    TerminalPresenter::stdout().show_records(&records);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_from_options() {
        let opts = RunOptions {
            host: Some("localhost".into()),
            port: Some(1884),
            threshold: Some(27.0),
            tick_ms: Some(250),
            log_level: Some("debug".into()),
            no_synthetic: true,
            offline: true,
            ..RunOptions::default()
        };
        let cfg = AppConfig::from_sources(Config::default(), opts).unwrap();
        assert_eq!(cfg.transport.host, "localhost");
        assert_eq!(cfg.transport.port, 1884);
        assert_eq!(cfg.temp_threshold, 27.0);
        assert_eq!(cfg.tick_interval_ms, 250);
        assert_eq!(cfg.log_level, LogLevel::Debug);
        assert!(!cfg.synthetic);
        assert!(cfg.offline);
    }

    #[test]
    fn config_prefers_file_values_when_cli_missing() {
        let cfg_file = Config {
            broker_host: "mqtt.lan".into(),
            topic: "lab/ac".into(),
            temp_threshold: 26.5,
            history_capacity: 50,
            store_path: "/tmp/x.jsonl".into(),
            synthetic_sensor: false,
            ..Config::default()
        };
        let merged = AppConfig::from_sources(cfg_file.clone(), RunOptions::default()).unwrap();
        assert_eq!(merged.transport, cfg_file.transport_options());
        assert_eq!(merged.temp_threshold, 26.5);
        assert_eq!(merged.history_capacity, 50);
        assert_eq!(merged.store_path, "/tmp/x.jsonl");
        assert!(!merged.synthetic);
        assert_eq!(merged.log_level, LogLevel::Info);
    }

    #[test]
    fn merged_config_is_validated() {
        let opts = RunOptions {
            topic: Some("gym/+".into()),
            ..RunOptions::default()
        };
        assert!(AppConfig::from_sources(Config::default(), opts).is_err());

        let opts = RunOptions {
            history: Some(0),
            ..RunOptions::default()
        };
        assert!(AppConfig::from_sources(Config::default(), opts).is_err());
    }

    #[test]
    fn default_matches_default_config_file() {
        let merged = AppConfig::from_sources(Config::default(), RunOptions::default()).unwrap();
        assert_eq!(merged, AppConfig::default());
    }
}

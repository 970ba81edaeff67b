use coolrelay::{
    app::{ControlLoop, DashboardView, LogLevel, Logger, Notice, Presenter},
    history::HistoryBuffer,
    ingest::{self, IngestProducer},
    payload::{ControlEvent, SensorReading, SystemEvent},
    relay::{RelayController, RelayState},
    storage::{JsonlStore, MemoryStore, PersistedRecord, RecordStore, StoredRecord},
    transport::LoopbackTransport,
    Error, Result,
};
use std::time::{Duration, UNIX_EPOCH};

#[derive(Default)]
struct RecordingPresenter {
    notices: Vec<Notice>,
    views: Vec<DashboardView>,
}

impl RecordingPresenter {
    fn texts(&self) -> Vec<&str> {
        self.notices.iter().map(|n| n.text.as_str()).collect()
    }
}

impl Presenter for RecordingPresenter {
    fn notice(&mut self, notice: &Notice) {
        self.notices.push(notice.clone());
    }

    fn refresh(&mut self, view: &DashboardView) {
        self.views.push(view.clone());
    }

    fn show_records(&mut self, _records: &[StoredRecord]) {}
}

/// Store whose disk is permanently full.
struct FullDisk;

impl RecordStore for FullDisk {
    fn append(&mut self, _record: &PersistedRecord) -> Result<u64> {
        Err(Error::Storage("append sensor_data.jsonl: no space left on device".into()))
    }

    fn recent(&self, _limit: usize) -> Result<Vec<StoredRecord>> {
        Ok(Vec::new())
    }
}

/// Store that rejects exactly one append, by position.
struct FailsOnce {
    inner: MemoryStore,
    appends: usize,
    fail_on: usize,
}

impl FailsOnce {
    fn new(fail_on: usize) -> Self {
        Self {
            inner: MemoryStore::new(),
            appends: 0,
            fail_on,
        }
    }
}

impl RecordStore for FailsOnce {
    fn append(&mut self, record: &PersistedRecord) -> Result<u64> {
        self.appends += 1;
        if self.appends == self.fail_on {
            return Err(Error::Storage("append sensor_data.jsonl: disk I/O error".into()));
        }
        self.inner.append(record)
    }

    fn recent(&self, limit: usize) -> Result<Vec<StoredRecord>> {
        self.inner.recent(limit)
    }
}

fn reading(secs: u64, temperature: f64) -> SensorReading {
    SensorReading::new(UNIX_EPOCH + Duration::from_secs(secs), temperature, 50.0)
}

fn build<S: RecordStore>(
    store: S,
    logger: &Logger,
) -> (
    ControlLoop<'_, S, LoopbackTransport, RecordingPresenter>,
    IngestProducer,
) {
    let (producer, consumer) = ingest::queue();
    let control = ControlLoop::new(
        RelayController::new(30.0),
        HistoryBuffer::new(200),
        consumer,
        store,
        LoopbackTransport::new(producer.clone()),
        RecordingPresenter::default(),
        logger,
    );
    (control, producer)
}

#[test]
fn threshold_sequence_drives_relay_and_persists_each_reading() {
    let logger = Logger::stderr(LogLevel::Error);
    let (mut control, producer) = build(MemoryStore::new(), &logger);

    for (i, t) in [28.0, 31.0, 29.0].into_iter().enumerate() {
        producer.enqueue(reading(i as u64, t));
    }
    let report = control.tick();
    assert_eq!(report.readings, 3);
    assert_eq!(report.persisted, 3);

    let relays: Vec<RelayState> = control
        .store()
        .records()
        .iter()
        .map(|r| r.record.relay)
        .collect();
    assert_eq!(relays, vec![RelayState::Off, RelayState::On, RelayState::Off]);
    assert_eq!(control.relay().state(), RelayState::Off);
    assert_eq!(control.history().len(), 3);
    assert_eq!(control.latest().map(|r| r.temperature), Some(29.0));
}

#[test]
fn persisted_records_mirror_their_readings() {
    let logger = Logger::stderr(LogLevel::Error);
    let (mut control, producer) = build(MemoryStore::new(), &logger);

    let sent = [reading(10, 24.5), reading(11, 33.25)];
    for r in sent {
        producer.enqueue(r);
    }
    control.tick();

    let stored = control.store().records();
    assert_eq!(stored.len(), sent.len());
    for (stored, sent) in stored.iter().zip(sent.iter()) {
        assert_eq!(stored.record.timestamp, sent.timestamp);
        assert_eq!(stored.record.temperature, sent.temperature);
        assert_eq!(stored.record.humidity, sent.humidity);
    }
    assert!(stored[0].id < stored[1].id);
}

#[test]
fn override_holds_relay_on_until_cleared() {
    let logger = Logger::stderr(LogLevel::Error);
    let (mut control, producer) = build(MemoryStore::new(), &logger);

    producer.enqueue(ControlEvent::ManualOverride(true));
    producer.enqueue(reading(1, 10.0));
    control.tick();
    assert_eq!(control.relay().state(), RelayState::On);
    assert_eq!(control.store().records()[0].record.relay, RelayState::On);

    producer.enqueue(ControlEvent::ManualOverride(false));
    producer.enqueue(reading(2, 10.0));
    control.tick();
    assert_eq!(control.relay().state(), RelayState::Off);
}

#[test]
fn storage_failure_does_not_stop_the_loop() {
    let logger = Logger::stderr(LogLevel::Error);
    let (mut control, producer) = build(FullDisk, &logger);

    producer.enqueue(reading(1, 31.0));
    let report = control.tick();
    assert_eq!(report.storage_failures, 1);
    assert_eq!(control.relay().state(), RelayState::On);
    assert_eq!(control.history().len(), 1);
    assert!(control
        .presenter()
        .texts()
        .iter()
        .any(|t| t.contains("no space left on device")));

    producer.enqueue(reading(2, 25.0));
    let report = control.tick();
    assert_eq!(report.readings, 1);
    assert_eq!(control.relay().state(), RelayState::Off);
    assert_eq!(control.history().len(), 2);
}

#[test]
fn one_failed_append_leaves_the_rest_of_the_batch_intact() {
    let logger = Logger::stderr(LogLevel::Error);
    let (mut control, producer) = build(FailsOnce::new(2), &logger);

    for (i, t) in [28.0, 31.0, 29.0].into_iter().enumerate() {
        producer.enqueue(reading(i as u64, t));
    }
    let report = control.tick();
    assert_eq!(report.readings, 3);
    assert_eq!(report.persisted, 2);
    assert_eq!(report.storage_failures, 1);

    let temps: Vec<f64> = control
        .history()
        .snapshot()
        .iter()
        .map(|e| e.temperature)
        .collect();
    assert_eq!(temps, vec![28.0, 31.0, 29.0]);
    assert_eq!(control.relay().state(), RelayState::Off);
    assert_eq!(control.latest().map(|r| r.temperature), Some(29.0));

    let stored: Vec<(f64, RelayState)> = control
        .store()
        .inner
        .records()
        .iter()
        .map(|r| (r.record.temperature, r.record.relay))
        .collect();
    assert_eq!(stored, vec![(28.0, RelayState::Off), (29.0, RelayState::Off)]);

    let texts = control.presenter().texts();
    assert!(texts.iter().any(|t| t.contains("disk I/O error")));
    assert!(texts.contains(&"High temperature: 31.0°C"));
}

#[test]
fn system_events_are_surfaced_not_acted_on() {
    let logger = Logger::stderr(LogLevel::Error);
    let (mut control, producer) = build(MemoryStore::new(), &logger);

    producer.enqueue(SystemEvent::TransportFailure {
        context: "publish".into(),
        message: "queue full".into(),
    });
    let report = control.tick();
    assert_eq!(report.system_events, 2);
    assert_eq!(control.relay().state(), RelayState::Off);
    assert!(control.store().records().is_empty());

    let texts = control.presenter().texts();
    assert_eq!(texts, vec!["broker connected", "transport publish error: queue full"]);
    assert_eq!(control.presenter().notices[1].level, LogLevel::Warn);
}

#[test]
fn each_tick_refreshes_the_view_once() {
    let logger = Logger::stderr(LogLevel::Error);
    let (mut control, producer) = build(MemoryStore::new(), &logger);

    control.tick();
    producer.enqueue(reading(1, 26.0));
    control.tick();

    let views = &control.presenter().views;
    assert_eq!(views.len(), 2);
    assert!(views[0].latest.is_none());
    assert_eq!(views[1].history.len(), 1);
    assert_eq!(views[1].threshold, 30.0);
}

#[test]
fn jsonl_store_backs_the_loop() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("data").join("sensor_data.jsonl");
    let logger = Logger::stderr(LogLevel::Error);
    {
        let store = JsonlStore::open(&path).unwrap();
        let (mut control, producer) = build(store, &logger);
        producer.enqueue(reading(1, 28.0));
        producer.enqueue(reading(2, 31.0));
        control.tick();
        control.shutdown();
    }

    let recent = coolrelay::storage::read_recent(&path, 10).unwrap();
    assert_eq!(recent.len(), 2);
    assert_eq!(recent[0].record.temperature, 31.0);
    assert_eq!(recent[0].record.relay, RelayState::On);
    assert_eq!(recent[1].record.relay, RelayState::Off);
}

use std::cell::Cell;
use std::time::SystemTime;

use super::Transport;
use crate::{
    ingest::IngestProducer,
    payload::{decode_inbound, Outbound, SystemEvent},
    Result,
};

/// Offline transport: every publish is encoded, decoded and fed straight back
/// into the ingestion queue, as a broker would echo it on the shared topic.
#[derive(Debug)]
pub struct LoopbackTransport {
    producer: IngestProducer,
    published: Cell<u64>,
    stopped: bool,
}

impl LoopbackTransport {
    pub fn new(producer: IngestProducer) -> Self {
        producer.enqueue(SystemEvent::Connected);
        Self {
            producer,
            published: Cell::new(0),
            stopped: false,
        }
    }

    pub fn published(&self) -> u64 {
        self.published.get()
    }
}

impl Transport for LoopbackTransport {
    fn publish(&self, payload: &Outbound) -> Result<()> {
        let bytes = payload.encode().map_err(|err| {
            self.producer.enqueue(SystemEvent::TransportFailure {
                context: "publish".into(),
                message: err.to_string(),
            });
            err
        })?;
        self.producer
            .enqueue_all(decode_inbound(&bytes, SystemTime::now()));
        self.published.set(self.published.get() + 1);
        Ok(())
    }

    fn stop(&mut self) {
        if !self.stopped {
            self.stopped = true;
            self.producer.enqueue(SystemEvent::Disconnected);
        }
    }

    fn name(&self) -> &'static str {
        "loopback"
    }
}

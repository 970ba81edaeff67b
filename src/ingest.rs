//! Hand-off between the transport's delivery thread(s) and the control loop.
//!
//! Producers never block and never fail; the single consumer drains whatever
//! is queued once per tick, in enqueue order.

use crossbeam::channel::{self, Receiver, Sender};

use crate::payload::IngestionMessage;

/// Create a connected producer/consumer pair.
pub fn queue() -> (IngestProducer, IngestConsumer) {
    let (tx, rx) = channel::unbounded();
    (IngestProducer { tx }, IngestConsumer { rx })
}

/// Cloneable enqueue handle for producer contexts.
#[derive(Debug, Clone)]
pub struct IngestProducer {
    tx: Sender<IngestionMessage>,
}

impl IngestProducer {
    /// Append to the tail. A message sent after the consumer is gone is dropped.
    pub fn enqueue(&self, msg: impl Into<IngestionMessage>) {
        let _ = self.tx.send(msg.into());
    }

    pub fn enqueue_all(&self, msgs: impl IntoIterator<Item = IngestionMessage>) {
        for msg in msgs {
            self.enqueue(msg);
        }
    }
}

/// The one consumer. Not `Clone`, so only one context can drain.
#[derive(Debug)]
pub struct IngestConsumer {
    rx: Receiver<IngestionMessage>,
}

impl IngestConsumer {
    /// Remove and return every message queued right now, oldest first.
    pub fn drain_all(&self) -> Vec<IngestionMessage> {
        self.rx.try_iter().collect()
    }

    pub fn pending(&self) -> usize {
        self.rx.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::payload::{ControlEvent, SystemEvent};

    #[test]
    fn drain_on_empty_queue_returns_nothing() {
        let (_producer, consumer) = queue();
        assert!(consumer.drain_all().is_empty());
    }

    #[test]
    fn drain_preserves_order_and_empties_queue() {
        let (producer, consumer) = queue();
        producer.enqueue(ControlEvent::ButtonPressed);
        producer.enqueue(SystemEvent::Connected);
        producer.enqueue(ControlEvent::ManualOverride(true));
        assert_eq!(consumer.pending(), 3);

        let drained = consumer.drain_all();
        assert_eq!(
            drained,
            vec![
                IngestionMessage::Control(ControlEvent::ButtonPressed),
                IngestionMessage::System(SystemEvent::Connected),
                IngestionMessage::Control(ControlEvent::ManualOverride(true)),
            ]
        );
        assert!(consumer.drain_all().is_empty());
    }

    #[test]
    fn enqueue_after_consumer_dropped_does_not_panic() {
        let (producer, consumer) = queue();
        drop(consumer);
        producer.enqueue(SystemEvent::Disconnected);
    }
}

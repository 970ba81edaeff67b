use rumqttc::{Client, ConnectReturnCode, Connection, Event, MqttOptions, Packet, QoS};
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::thread;
use std::time::{Duration, SystemTime};

use super::{Transport, TransportOptions};
use crate::{
    ingest::IngestProducer,
    payload::{decode_inbound, Outbound, SystemEvent},
    Error, Result,
};

const KEEP_ALIVE_SECS: u64 = 60;
const REQUEST_CAPACITY: usize = 16;
// The client reconnects on the next poll; this only keeps a dead broker from
// spinning the thread.
const ERROR_PAUSE: Duration = Duration::from_secs(1);

/// MQTT client whose connection event loop runs on a dedicated thread.
pub struct MqttTransport {
    client: Client,
    topic: String,
    producer: IngestProducer,
    running: Arc<AtomicBool>,
}

impl MqttTransport {
    pub fn connect(options: &TransportOptions, producer: IngestProducer) -> Result<Self> {
        if options.host.is_empty() {
            return Err(Error::InvalidArgs("broker host cannot be empty".into()));
        }
        let mut mqtt = MqttOptions::new(options.client_id.clone(), options.host.clone(), options.port);
        mqtt.set_keep_alive(Duration::from_secs(KEEP_ALIVE_SECS));
        let (client, connection) = Client::new(mqtt, REQUEST_CAPACITY);

        let running = Arc::new(AtomicBool::new(true));
        let worker = ConnectionWorker {
            client: client.clone(),
            topic: options.topic.clone(),
            producer: producer.clone(),
            running: running.clone(),
        };
        thread::Builder::new()
            .name("coolrelay-mqtt".into())
            .spawn(move || worker.run(connection))
            .map_err(|e| Error::Transport(format!("failed to spawn mqtt thread: {e}")))?;

        Ok(Self {
            client,
            topic: options.topic.clone(),
            producer,
            running,
        })
    }
}

impl Transport for MqttTransport {
    fn publish(&self, payload: &Outbound) -> Result<()> {
        let bytes = payload.encode()?;
        self.client
            .try_publish(self.topic.as_str(), QoS::AtMostOnce, false, bytes)
            .map_err(|err| {
                let message = err.to_string();
                self.producer.enqueue(SystemEvent::TransportFailure {
                    context: "publish".into(),
                    message: message.clone(),
                });
                Error::Transport(format!("publish {}: {message}", payload.kind()))
            })
    }

    fn stop(&mut self) {
        if self.running.swap(false, Ordering::SeqCst) {
            if let Err(err) = self.client.try_disconnect() {
                self.producer.enqueue(SystemEvent::TransportFailure {
                    context: "disconnect".into(),
                    message: err.to_string(),
                });
            }
        }
    }

    fn name(&self) -> &'static str {
        "mqtt"
    }
}

impl Drop for MqttTransport {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Producer context: turns connection events into ingestion messages and
/// returns to polling immediately.
struct ConnectionWorker {
    client: Client,
    topic: String,
    producer: IngestProducer,
    running: Arc<AtomicBool>,
}

impl ConnectionWorker {
    fn run(self, mut connection: Connection) {
        let mut connected = false;
        for notification in connection.iter() {
            if !self.running.load(Ordering::SeqCst) {
                break;
            }
            match notification {
                Ok(Event::Incoming(Packet::ConnAck(ack))) => {
                    if ack.code == ConnectReturnCode::Success {
                        connected = true;
                        // Clean sessions drop subscriptions, so subscribe on every connect.
                        if let Err(err) = self.client.try_subscribe(self.topic.as_str(), QoS::AtMostOnce) {
                            self.producer.enqueue(SystemEvent::TransportFailure {
                                context: "subscribe".into(),
                                message: err.to_string(),
                            });
                        }
                        self.producer.enqueue(SystemEvent::Connected);
                    } else {
                        self.producer.enqueue(SystemEvent::ConnectFailed {
                            reason: format!("{:?}", ack.code),
                        });
                    }
                }
                Ok(Event::Incoming(Packet::Publish(publish))) => {
                    if publish.topic == self.topic {
                        self.producer
                            .enqueue_all(decode_inbound(&publish.payload, SystemTime::now()));
                    }
                }
                Ok(Event::Incoming(Packet::Disconnect)) => {
                    connected = false;
                    self.producer.enqueue(SystemEvent::Disconnected);
                }
                Ok(_) => {}
                Err(err) => {
                    if !self.running.load(Ordering::SeqCst) {
                        break;
                    }
                    if connected {
                        connected = false;
                        self.producer.enqueue(SystemEvent::Disconnected);
                    }
                    self.producer.enqueue(SystemEvent::TransportFailure {
                        context: "connection".into(),
                        message: err.to_string(),
                    });
                    thread::sleep(ERROR_PAUSE);
                }
            }
        }
    }
}

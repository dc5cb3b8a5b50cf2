//! Push adapter feeding externally published temperatures into a
//! [`CpuTemperature`] source.
//!
//! Publishers and the subscriber share a bounded channel per topic. The
//! subscriber only drains it when spun, on the observer's thread, so the
//! source itself is never shared. A full topic drops its oldest reading.

use std::sync::{Arc, Weak};

use crossbeam_channel::{Receiver, Sender, TrySendError};
use servosim_core::Dictionary;
use tracing::debug;

use crate::{cpu_temperature::CpuTemperature, error::ObservationError, source::Source};

/// Default topic name.
pub const DEFAULT_TOPIC: &str = "topic_temperature";

/// Readings buffered per topic before the oldest ones are dropped.
pub const QUEUE_DEPTH: usize = 10;

/// Sending half of a temperature topic.
#[derive(Clone, Debug)]
pub struct TemperaturePublisher {
    topic: String,
    sender: Sender<f64>,
    /// The subscriber's receiver, to evict stale readings. Weak so that
    /// dropping the subscriber still disconnects the topic.
    receiver: Weak<Receiver<f64>>,
}

impl TemperaturePublisher {
    /// Publish a reading (°C). When the topic is full the oldest pending
    /// reading is dropped, so the subscriber always sees the latest one.
    pub fn publish(&self, temperature: f64) -> Result<(), ObservationError> {
        let mut reading = temperature;
        loop {
            match self.sender.try_send(reading) {
                Ok(()) => return Ok(()),
                Err(TrySendError::Full(rejected)) => {
                    let Some(receiver) = self.receiver.upgrade() else {
                        return Err(ObservationError::Disconnected(self.topic.clone()));
                    };
                    if let Ok(stale) = receiver.try_recv() {
                        debug!(topic = %self.topic, stale, "topic full, oldest reading dropped");
                    }
                    reading = rejected;
                }
                Err(TrySendError::Disconnected(_)) => {
                    return Err(ObservationError::Disconnected(self.topic.clone()));
                }
            }
        }
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }
}

/// Receiving half of a temperature topic, wrapping a [`CpuTemperature`].
#[derive(Debug)]
pub struct TemperatureSubscriber {
    topic: String,
    receiver: Arc<Receiver<f64>>,
    source: CpuTemperature,
}

impl TemperatureSubscriber {
    /// Open a topic and return both of its ends.
    pub fn channel(topic: impl Into<String>) -> (TemperaturePublisher, Self) {
        let topic = topic.into();
        let (sender, receiver) = crossbeam_channel::bounded(QUEUE_DEPTH);
        let receiver = Arc::new(receiver);
        let publisher = TemperaturePublisher {
            topic: topic.clone(),
            sender,
            receiver: Arc::downgrade(&receiver),
        };
        let subscriber = Self {
            topic,
            receiver,
            source: CpuTemperature::new(),
        };
        (publisher, subscriber)
    }

    /// Apply every pending reading, oldest first. Returns how many were
    /// applied.
    pub fn spin_some(&mut self) -> usize {
        let mut received = 0;
        for temperature in self.receiver.try_iter() {
            self.source.update(temperature);
            received += 1;
        }
        if received > 0 {
            debug!(topic = %self.topic, received, "temperature readings");
        }
        received
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    pub const fn source(&self) -> &CpuTemperature {
        &self.source
    }

    pub fn source_mut(&mut self) -> &mut CpuTemperature {
        &mut self.source
    }
}

impl Source for TemperatureSubscriber {
    fn prefix(&self) -> &str {
        self.source.prefix()
    }

    fn write(&mut self, observation: &mut Dictionary) {
        self.spin_some();
        self.source.write(observation);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

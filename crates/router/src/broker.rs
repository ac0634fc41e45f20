//! Topic broker with channel-based fan-out
//!
//! # Design
//!
//! - **Channel-based**: each subscriber owns a `tokio::sync::mpsc`
//!   receiver; messages are wrapped in `Arc` for zero-copy fan-out
//! - **Non-blocking publish**: `try_send` keeps the pipeline moving; a
//!   full subscriber channel drops the message for that subscriber only
//! - **Self-pruning**: senders whose receiver was dropped are removed on
//!   the next publish

use std::collections::HashMap;
use std::sync::Arc;

use curator_queue::SafeQueue;
use parking_lot::Mutex;
use serde_json::Value;
use tokio::sync::mpsc;
use tracing::{debug, warn};

#[cfg(test)]
#[path = "broker_test.rs"]
mod tests;

/// Default subscriber channel capacity
pub const DEFAULT_CHANNEL_SIZE: usize = 256;

/// A message delivered to subscribers of a topic
#[derive(Debug, Clone)]
pub struct Message {
    /// Topic the message was published on
    pub topic: String,
    /// JSON payload
    pub payload: Value,
}

struct Subscriber {
    name: String,
    tx: mpsc::Sender<Arc<Message>>,
}

/// Topic registry shared by publishers and subscribers
#[derive(Clone, Default)]
pub struct Broker {
    topics: Arc<Mutex<HashMap<String, Vec<Subscriber>>>>,
}

impl Broker {
    /// Create an empty broker
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe to a topic with the default channel capacity
    pub fn subscribe(&self, topic: &str, name: &str) -> mpsc::Receiver<Arc<Message>> {
        self.subscribe_with_capacity(topic, name, DEFAULT_CHANNEL_SIZE)
    }

    /// Subscribe to a topic with an explicit channel capacity
    pub fn subscribe_with_capacity(
        &self,
        topic: &str,
        name: &str,
        capacity: usize,
    ) -> mpsc::Receiver<Arc<Message>> {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let mut topics = self.topics.lock();
        topics.entry(topic.to_string()).or_default().push(Subscriber {
            name: name.to_string(),
            tx,
        });
        debug!(topic, subscriber = name, "subscriber registered");
        rx
    }

    /// Subscribe with a blocking consumer interface
    ///
    /// Bridges the topic's channel into a [`SafeQueue`] so threads outside
    /// the async runtime can consume with blocking `pop`/`pop_bulk`. The
    /// forwarding task cancels the queue when the broker side goes away,
    /// releasing any blocked consumer.
    pub fn subscribe_blocking(&self, topic: &str, name: &str) -> Arc<SafeQueue<Arc<Message>>> {
        let mut rx = self.subscribe(topic, name);
        let queue = Arc::new(SafeQueue::new());

        let feed = Arc::clone(&queue);
        tokio::spawn(async move {
            while let Some(message) = rx.recv().await {
                feed.push(message);
            }
            feed.cancel();
        });

        queue
    }

    /// Create a publisher handle bound to one topic
    pub fn publisher(&self, topic: &str) -> Publisher {
        Publisher {
            topic: topic.to_string(),
            broker: self.clone(),
        }
    }

    /// Number of live subscribers on a topic
    pub fn subscriber_count(&self, topic: &str) -> usize {
        self.topics
            .lock()
            .get(topic)
            .map(|subs| subs.iter().filter(|s| !s.tx.is_closed()).count())
            .unwrap_or(0)
    }

    fn publish(&self, topic: &str, payload: Value) -> usize {
        let message = Arc::new(Message {
            topic: topic.to_string(),
            payload,
        });

        let mut topics = self.topics.lock();
        let Some(subscribers) = topics.get_mut(topic) else {
            debug!(topic, "publish with no subscribers");
            return 0;
        };

        // Drop senders whose receiver side is gone.
        subscribers.retain(|s| !s.tx.is_closed());

        let mut delivered = 0;
        for subscriber in subscribers.iter() {
            match subscriber.tx.try_send(Arc::clone(&message)) {
                Ok(()) => delivered += 1,
                Err(mpsc::error::TrySendError::Full(_)) => {
                    warn!(
                        topic,
                        subscriber = %subscriber.name,
                        "subscriber channel full, dropping message"
                    );
                }
                Err(mpsc::error::TrySendError::Closed(_)) => {}
            }
        }
        delivered
    }
}

/// Cloneable handle publishing to a single topic
#[derive(Clone)]
pub struct Publisher {
    topic: String,
    broker: Broker,
}

impl Publisher {
    /// Topic this handle publishes to
    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// Publish a payload to every live subscriber
    ///
    /// Returns the number of subscribers the message was handed to.
    pub fn publish(&self, payload: Value) -> usize {
        self.broker.publish(&self.topic, payload)
    }
}

impl std::fmt::Debug for Publisher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Publisher").field("topic", &self.topic).finish()
    }
}

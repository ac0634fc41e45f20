//! In-process pub-sub router
//!
//! Topic-based fan-out used by the update pipeline to notify subscribers
//! of fresh content. Delivery is at-least-once towards healthy
//! subscribers; a subscriber that cannot keep up has messages dropped
//! rather than stalling the publisher.
//!
//! # Architecture
//!
//! ```text
//! [Publisher] ──▶ topic ──┬──▶ mpsc ──▶ subscriber A
//!                         └──▶ mpsc ──▶ subscriber B
//! ```
//!
//! # Example
//!
//! ```
//! use curator_router::Broker;
//! use serde_json::json;
//!
//! # #[tokio::main(flavor = "current_thread")] async fn main() {
//! let broker = Broker::new();
//! let mut rx = broker.subscribe("threat-intel", "indexer");
//!
//! let publisher = broker.publisher("threat-intel");
//! publisher.publish(json!({"offset": 42}));
//!
//! let message = rx.recv().await.unwrap();
//! assert_eq!(message.payload["offset"], 42);
//! # }
//! ```

mod broker;
mod envelope;
mod error;

pub use broker::{Broker, Message, Publisher, DEFAULT_CHANNEL_SIZE};
pub use envelope::{adapt_delta_message, adapt_sync_message, AgentInfo};
pub use error::{Result, RouterError};

// Re-exported for blocking subscribers.
pub use curator_queue::SafeQueue;

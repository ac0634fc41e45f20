//! On-demand endpoint registry
//!
//! The endpoint namespace is process-global: actions register their topic
//! into a shared map and do not hold the map themselves. Registering an
//! already-taken topic is a conflict; triggering an unknown topic is an
//! error. Handler errors never reach the caller, matching the
//! orchestrator's swallow-and-log policy.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use once_cell::sync::Lazy;
use parking_lot::Mutex;
use tracing::{debug, info};

use crate::error::UpdaterError;
use crate::orchestrator::UpdateKind;
use crate::UpdaterResult;

#[cfg(test)]
#[path = "ondemand_test.rs"]
mod tests;

/// Handler invoked when a topic is triggered on demand
pub type OnDemandHandler =
    Arc<dyn Fn(Option<u64>, UpdateKind) -> Pin<Box<dyn Future<Output = ()> + Send>> + Send + Sync>;

static GLOBAL: Lazy<OnDemandRegistry> = Lazy::new(OnDemandRegistry::default);

/// Process-wide map of topic name to on-demand handler
#[derive(Default)]
pub struct OnDemandRegistry {
    endpoints: Mutex<HashMap<String, OnDemandHandler>>,
}

impl OnDemandRegistry {
    /// The process-wide registry instance
    pub fn global() -> &'static OnDemandRegistry {
        &GLOBAL
    }

    /// Register a handler for a topic
    ///
    /// Fails with `StateConflict` when the topic is already registered
    /// anywhere in the process.
    pub fn register(&self, topic: &str, handler: OnDemandHandler) -> UpdaterResult<()> {
        let mut endpoints = self.endpoints.lock();
        if endpoints.contains_key(topic) {
            return Err(UpdaterError::StateConflict(topic.to_string()));
        }
        endpoints.insert(topic.to_string(), handler);
        info!(topic, "on-demand endpoint registered");
        Ok(())
    }

    /// Remove a topic's handler; removing an absent topic is a no-op
    pub fn unregister(&self, topic: &str) {
        if self.endpoints.lock().remove(topic).is_some() {
            info!(topic, "on-demand endpoint unregistered");
        }
    }

    /// Remove every registered endpoint
    pub fn clear(&self) {
        let mut endpoints = self.endpoints.lock();
        let removed = endpoints.len();
        endpoints.clear();
        debug!(removed, "on-demand endpoints cleared");
    }

    /// Whether a topic is currently registered
    pub fn contains(&self, topic: &str) -> bool {
        self.endpoints.lock().contains_key(topic)
    }

    /// Number of registered endpoints
    pub fn len(&self) -> usize {
        self.endpoints.lock().len()
    }

    /// Whether no endpoint is registered
    pub fn is_empty(&self) -> bool {
        self.endpoints.lock().is_empty()
    }

    /// Invoke the handler registered for a topic
    ///
    /// Run-level errors are handled inside the handler; this only fails
    /// when the topic has no registered endpoint.
    pub async fn trigger(
        &self,
        topic: &str,
        offset: Option<u64>,
        kind: UpdateKind,
    ) -> UpdaterResult<()> {
        let handler = self
            .endpoints
            .lock()
            .get(topic)
            .cloned()
            .ok_or_else(|| UpdaterError::UnknownTopic(topic.to_string()))?;
        handler(offset, kind).await;
        Ok(())
    }
}

//! Message envelope adapters
//!
//! Subscribers downstream expect payloads wrapped in the agent-info
//! envelope:
//!
//! ```json
//! {"agent_info": {"agent_id": "…", "agent_ip": "…", "agent_name": "…",
//!   "node_name": "…"},
//!  "data_type": "…", "data": {…}, "operation": "…"}
//! ```
//!
//! Delta messages move `type`, `data` and `operation` across verbatim.
//! Sync messages reshape `data` to `{"attributes_type": <component>,
//! …original data fields…}` with the original fields deep-copied.

use serde::Serialize;
use serde_json::{json, Map, Value};

use crate::error::{Result, RouterError};

#[cfg(test)]
#[path = "envelope_test.rs"]
mod tests;

/// Identity block stamped on every adapted message
#[derive(Debug, Clone, Serialize)]
pub struct AgentInfo {
    pub agent_id: String,
    pub agent_ip: String,
    pub agent_name: String,
    pub node_name: String,
}

impl AgentInfo {
    /// Identity of the local process publishing on behalf of a consumer
    ///
    /// Content produced by the manager itself uses the reserved agent id
    /// `000`.
    pub fn local(consumer_name: &str, node_name: &str) -> Self {
        Self {
            agent_id: "000".to_string(),
            agent_ip: "127.0.0.1".to_string(),
            agent_name: consumer_name.to_string(),
            node_name: node_name.to_string(),
        }
    }
}

fn into_object(message: Value) -> Result<Map<String, Value>> {
    match message {
        Value::Object(map) => Ok(map),
        other => Err(RouterError::malformed(format!(
            "expected a JSON object, got {other}"
        ))),
    }
}

/// Wrap a delta message in the agent-info envelope
///
/// Takes a message with `type`, `data` and `operation` fields and moves
/// them into the envelope unchanged.
pub fn adapt_delta_message(message: Value, agent: &AgentInfo) -> Result<Value> {
    let mut source = into_object(message)?;

    Ok(json!({
        "agent_info": agent,
        "data_type": source.remove("type").unwrap_or(Value::Null),
        "data": source.remove("data").unwrap_or(Value::Null),
        "operation": source.remove("operation").unwrap_or(Value::Null),
    }))
}

/// Wrap a sync message in the agent-info envelope
///
/// The `data` object is rebuilt with an `attributes_type` field taken
/// from the message's `component`, followed by deep copies of the
/// original data fields. A message without `data` produces an envelope
/// without a `data` key.
pub fn adapt_sync_message(message: Value, agent: &AgentInfo) -> Result<Value> {
    let mut source = into_object(message)?;

    let mut envelope = Map::new();
    envelope.insert("agent_info".to_string(), json!(agent));
    envelope.insert(
        "data_type".to_string(),
        source.remove("type").unwrap_or(Value::Null),
    );

    if let Some(Value::Object(fields)) = source.remove("data") {
        let mut data = Map::new();
        data.insert(
            "attributes_type".to_string(),
            source.remove("component").unwrap_or(Value::Null),
        );
        for (key, value) in fields {
            data.insert(key, value);
        }
        envelope.insert("data".to_string(), Value::Object(data));
    }

    Ok(Value::Object(envelope))
}

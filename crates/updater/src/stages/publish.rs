//! Publication stage
//!
//! Wraps the run's results in the agent-info envelope and hands them to
//! the router. Offset runs publish one delta message per change item;
//! snapshot runs publish a single sync notification describing the
//! materialized content.

use std::future::Future;
use std::pin::Pin;

use curator_router::{adapt_delta_message, adapt_sync_message, AgentInfo};
use serde_json::{json, Value};
use tracing::debug;

use crate::context::{RunKind, UpdaterContext};
use crate::error::UpdaterError;
use crate::{Stage, UpdaterResult};

fn paths_value(ctx: &UpdaterContext<'_>) -> Value {
    Value::Array(
        ctx.paths
            .iter()
            .map(|p| Value::String(p.display().to_string()))
            .collect(),
    )
}

/// Publishes run results on the action's topic
pub struct RouterPublisher;

impl Stage for RouterPublisher {
    fn handle<'a>(
        &'a self,
        ctx: &'a mut UpdaterContext<'_>,
    ) -> Pin<Box<dyn Future<Output = UpdaterResult<()>> + Send + 'a>> {
        Box::pin(async move {
            if ctx.content_unchanged {
                debug!(topic = %ctx.base.topic_name, "content unchanged, nothing to publish");
                return Ok(());
            }
            if ctx.payload.is_empty() && ctx.paths.is_empty() {
                debug!(topic = %ctx.base.topic_name, "no content this run, nothing to publish");
                return Ok(());
            }

            let base = ctx.base;
            let agent = AgentInfo::local(&base.config.consumer_name, &base.topic_name);
            let mut messages = 0usize;

            match ctx.kind {
                RunKind::Offset if !ctx.payload.is_empty() => {
                    for item in &ctx.payload {
                        let operation = item
                            .get("type")
                            .cloned()
                            .unwrap_or_else(|| json!("update"));
                        let message = json!({
                            "type": "state",
                            "data": item,
                            "operation": operation,
                        });
                        let envelope = adapt_delta_message(message, &agent)
                            .map_err(|e| UpdaterError::decode(e.to_string()))?;
                        base.publisher.publish(envelope);
                        messages += 1;
                    }
                }
                _ => {
                    // Snapshot runs, and offset runs whose content was not
                    // parsed, announce the materialized files instead.
                    let message = json!({
                        "type": "snapshot",
                        "component": base.config.consumer_name,
                        "data": {
                            "offset": ctx.current_offset,
                            "paths": paths_value(ctx),
                            "hash": ctx.content_hash,
                        },
                    });
                    let envelope = adapt_sync_message(message, &agent)
                        .map_err(|e| UpdaterError::decode(e.to_string()))?;
                    base.publisher.publish(envelope);
                    messages += 1;
                }
            }

            debug!(
                topic = %base.topic_name,
                messages,
                offset = ctx.current_offset,
                "run results published"
            );
            Ok(())
        })
    }

    fn name(&self) -> &'static str {
        "publish"
    }
}

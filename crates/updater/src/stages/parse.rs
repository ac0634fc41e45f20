//! JSON parsing stage
//!
//! Parses materialized content files and collects the items awaiting
//! publication. Offset-change bodies carry their items in a top-level
//! `data` array; those are flattened into individual payload entries.

use std::future::Future;
use std::pin::Pin;

use serde_json::Value;
use tracing::debug;

use crate::context::UpdaterContext;
use crate::error::UpdaterError;
use crate::{Stage, UpdaterResult};

/// Parses `contents/` files as JSON into the run payload
pub struct JsonParser;

impl Stage for JsonParser {
    fn handle<'a>(
        &'a self,
        ctx: &'a mut UpdaterContext<'_>,
    ) -> Pin<Box<dyn Future<Output = UpdaterResult<()>> + Send + 'a>> {
        Box::pin(async move {
            for path in &ctx.paths {
                let bytes = tokio::fs::read(path).await?;
                let mut value: Value = serde_json::from_slice(&bytes).map_err(|e| {
                    UpdaterError::decode(format!("'{}' is not valid JSON: {e}", path.display()))
                })?;

                let change_items = value.as_object_mut().and_then(|map| match map.get("data") {
                    Some(Value::Array(_)) => map.remove("data"),
                    _ => None,
                });

                match change_items {
                    Some(Value::Array(items)) => ctx.payload.extend(items),
                    _ => ctx.payload.push(value),
                }
            }
            debug!(items = ctx.payload.len(), "content parsed");
            Ok(())
        })
    }

    fn name(&self) -> &'static str {
        "json_parse"
    }
}

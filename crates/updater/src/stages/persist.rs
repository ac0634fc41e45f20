//! Persistence stages
//!
//! `OffsetPersister` advances the offset cursor in the store after the
//! run's content reached subscribers; it runs last in the offset chain so
//! a failed run never advances the offset. `HashPersister` records the
//! digest of published snapshots, both under the `last_hash` key and as a
//! timestamped entry in the digest history column.

use std::future::Future;
use std::pin::Pin;

use chrono::Utc;
use curator_store::DEFAULT_COLUMN;
use tracing::debug;

use crate::context::{UpdaterContext, CURRENT_OFFSET_KEY, HASH_HISTORY_COLUMN, LAST_HASH_KEY};
use crate::{Stage, UpdaterResult};

/// Persists the run's offset cursor
pub struct OffsetPersister;

impl Stage for OffsetPersister {
    fn handle<'a>(
        &'a self,
        ctx: &'a mut UpdaterContext<'_>,
    ) -> Pin<Box<dyn Future<Output = UpdaterResult<()>> + Send + 'a>> {
        Box::pin(async move {
            let Some(store) = &ctx.base.store else {
                debug!("persistence disabled, offset not stored");
                return Ok(());
            };
            store.put(
                DEFAULT_COLUMN,
                CURRENT_OFFSET_KEY,
                &ctx.current_offset.to_le_bytes(),
            )?;
            debug!(offset = ctx.current_offset, "offset persisted");
            Ok(())
        })
    }

    fn name(&self) -> &'static str {
        "offset_persist"
    }
}

/// Persists the digest of freshly published content
pub struct HashPersister;

impl Stage for HashPersister {
    fn handle<'a>(
        &'a self,
        ctx: &'a mut UpdaterContext<'_>,
    ) -> Pin<Box<dyn Future<Output = UpdaterResult<()>> + Send + 'a>> {
        Box::pin(async move {
            if ctx.content_unchanged {
                return Ok(());
            }
            let Some(digest) = ctx.content_hash.clone() else {
                return Ok(());
            };

            if let Some(store) = &ctx.base.store {
                store.put(DEFAULT_COLUMN, LAST_HASH_KEY, digest.as_bytes())?;

                let stamp = Utc::now().format("%Y%m%d%H%M%S").to_string();
                store.put(HASH_HISTORY_COLUMN, stamp.as_bytes(), digest.as_bytes())?;
                debug!(digest = %digest, stamp = %stamp, "content digest persisted");
            }

            ctx.base.set_last_hash(digest);
            Ok(())
        })
    }

    fn name(&self) -> &'static str {
        "hash_persist"
    }
}

//! Content digest stages
//!
//! `HashCompute` digests the materialized content; `SkipUnchanged`
//! compares it against the digest of the last published run so identical
//! snapshots are not re-published. The skip is a flag on the context, not
//! a chain abort: downstream publish/persist stages observe it and
//! no-op, keeping the stage status complete.

use std::future::Future;
use std::pin::Pin;

use sha2::{Digest, Sha256};
use tracing::debug;

use crate::context::UpdaterContext;
use crate::{Stage, UpdaterResult};

/// Computes a SHA-256 digest over the run's materialized files
pub struct HashCompute;

impl Stage for HashCompute {
    fn handle<'a>(
        &'a self,
        ctx: &'a mut UpdaterContext<'_>,
    ) -> Pin<Box<dyn Future<Output = UpdaterResult<()>> + Send + 'a>> {
        Box::pin(async move {
            if ctx.paths.is_empty() {
                return Ok(());
            }

            let mut hasher = Sha256::new();
            for path in &ctx.paths {
                let bytes = tokio::fs::read(path).await?;
                hasher.update(&bytes);
            }
            let digest = hex::encode(hasher.finalize());
            debug!(digest = %digest, files = ctx.paths.len(), "content digest computed");
            ctx.content_hash = Some(digest);
            Ok(())
        })
    }

    fn name(&self) -> &'static str {
        "hash_compute"
    }
}

/// Flags the run as unchanged when the digest matches the last one
pub struct SkipUnchanged;

impl Stage for SkipUnchanged {
    fn handle<'a>(
        &'a self,
        ctx: &'a mut UpdaterContext<'_>,
    ) -> Pin<Box<dyn Future<Output = UpdaterResult<()>> + Send + 'a>> {
        Box::pin(async move {
            if ctx.content_hash.is_some() && ctx.content_hash == ctx.base.last_hash() {
                debug!(
                    topic = %ctx.base.topic_name,
                    "content unchanged since last run, publication will be skipped"
                );
                ctx.content_unchanged = true;
            }
            Ok(())
        })
    }

    fn name(&self) -> &'static str {
        "skip_unchanged"
    }
}

//! Cleanup stage
//!
//! Removes downloaded artifacts once a run finishes. Added to the chain
//! only when `deleteDownloadedContent` is enabled.

use std::future::Future;
use std::pin::Pin;

use tracing::debug;

use crate::context::UpdaterContext;
use crate::{Stage, UpdaterResult};

/// Empties the `downloads/` folder
pub struct Cleaner;

impl Stage for Cleaner {
    fn handle<'a>(
        &'a self,
        ctx: &'a mut UpdaterContext<'_>,
    ) -> Pin<Box<dyn Future<Output = UpdaterResult<()>> + Send + 'a>> {
        Box::pin(async move {
            let mut removed = 0usize;
            let mut entries = tokio::fs::read_dir(&ctx.base.downloads_folder).await?;
            while let Some(entry) = entries.next_entry().await? {
                if entry.file_type().await?.is_file() {
                    tokio::fs::remove_file(entry.path()).await?;
                    removed += 1;
                }
            }
            debug!(removed, "downloads folder cleaned");
            Ok(())
        })
    }

    fn name(&self) -> &'static str {
        "clean_downloads"
    }
}

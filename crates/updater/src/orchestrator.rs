//! Run orchestration
//!
//! Builds the stage chain appropriate to the configured content source
//! and the requested update kind, seeds the offset cursor, and drives the
//! chain over a fresh context.
//!
//! # Error policy
//!
//! Stage errors are caught here and never rethrown: the failing stage is
//! logged, the partial stage status is preserved in the returned outcome,
//! the persisted offset stays untouched (the persister runs after the
//! failing point never ran), and the cross-run content digest is cleared
//! so the next run republishes.

use std::sync::Arc;

use curator_config::{CompressionType, ContentSource, DataFormat};
use tracing::{debug, error, info};

use crate::chain::Chain;
use crate::context::{BaseContext, RunKind, StageRecord, UpdaterContext};
use crate::stages::{
    Cleaner, ContentDownloader, HashCompute, HashPersister, JsonParser, OffsetFetch,
    OffsetPersister, RouterPublisher, SkipUnchanged, SnapshotDownloader, XzDecompressor,
};
use crate::{Stage, UpdaterResult};

/// Kind of update a caller can request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateKind {
    /// Full snapshot refresh
    Content,
    /// Incremental catch-up from the offset cursor
    Offset,
}

/// Result of one orchestrated run
#[derive(Debug)]
pub struct RunOutcome {
    /// Whether every stage completed
    pub success: bool,
    /// One record per executed stage, in chain order
    pub stages: Vec<StageRecord>,
    /// Offset cursor at the end of the run
    pub offset: u64,
}

/// Builds and drives the update chain for one topic
pub struct Orchestrator {
    base: Arc<BaseContext>,
}

impl Orchestrator {
    /// Create an orchestrator over a per-action environment
    pub fn new(base: Arc<BaseContext>) -> Self {
        debug!(topic = %base.topic_name, "content updater orchestration created");
        Self { base }
    }

    /// Per-action environment this orchestrator runs against
    pub fn base(&self) -> &BaseContext {
        &self.base
    }

    /// Run the pipeline once
    ///
    /// `offset` semantics follow the on-demand contract: for offset
    /// updates it seeds the cursor, for content updates an explicit zero
    /// resets the cursor before the run. Errors are swallowed; inspect
    /// the outcome's `success` and `stages`.
    pub async fn run(&self, offset: Option<u64>, kind: UpdateKind) -> RunOutcome {
        let base = self.base.as_ref();
        let run_kind = match kind {
            UpdateKind::Offset if base.config.content_source == ContentSource::CtiOffset => {
                RunKind::Offset
            }
            _ => match base.config.compression_type {
                CompressionType::Raw => RunKind::Raw,
                CompressionType::Xz => RunKind::Content,
            },
        };

        let mut ctx = UpdaterContext::new(base, run_kind);
        let result = self.drive(&mut ctx, offset).await;

        match result {
            Ok(()) => {
                info!(
                    topic = %base.topic_name,
                    offset = ctx.current_offset,
                    stages = ctx.stage_status.len(),
                    "update run finished"
                );
                RunOutcome {
                    success: true,
                    stages: ctx.stage_status,
                    offset: ctx.current_offset,
                }
            }
            Err(err) => {
                error!(
                    topic = %base.topic_name,
                    stage = ctx.failed_stage().unwrap_or("setup"),
                    error = %err,
                    "update run failed"
                );
                base.clear_last_hash();
                RunOutcome {
                    success: false,
                    stages: ctx.stage_status,
                    offset: ctx.current_offset,
                }
            }
        }
    }

    async fn drive(&self, ctx: &mut UpdaterContext<'_>, offset: Option<u64>) -> UpdaterResult<()> {
        let base = self.base.as_ref();

        if ctx.kind == RunKind::Offset {
            let effective = match offset {
                Some(explicit) => explicit,
                None => base.persisted_offset()?.unwrap_or(0),
            };

            // A catch-up from zero would replay the entire event stream;
            // download the latest snapshot first and continue from its
            // offset instead.
            if effective == 0 {
                debug!(topic = %base.topic_name, "offset cursor at zero, fetching full snapshot first");
                self.run_snapshot_fallback(ctx).await?;
                return self
                    .offset_chain(Some(ctx.current_offset))
                    .run(ctx)
                    .await;
            }

            return self.offset_chain(Some(effective)).run(ctx).await;
        }

        debug!(topic = %base.topic_name, "running content update");
        if offset == Some(0) {
            ctx.current_offset = 0;
        } else if let Some(persisted) = base.persisted_offset()? {
            ctx.current_offset = persisted;
        }
        self.content_chain().run(ctx).await
    }

    /// Snapshot download preceding a from-zero catch-up
    ///
    /// Runs the content chain with the offset run's payload saved and
    /// restored around it, so only the snapshot's files and offset carry
    /// over into the catch-up.
    async fn run_snapshot_fallback(&self, ctx: &mut UpdaterContext<'_>) -> UpdaterResult<()> {
        let saved_kind = ctx.kind;
        ctx.kind = match self.base.config.compression_type {
            CompressionType::Raw => RunKind::Raw,
            CompressionType::Xz => RunKind::Content,
        };
        let saved_payload = std::mem::take(&mut ctx.payload);

        let result = self.content_chain().run(ctx).await;

        ctx.kind = saved_kind;
        ctx.payload = saved_payload;
        result
    }

    fn content_chain(&self) -> Chain {
        let config = &self.base.config;
        let mut stages: Vec<Box<dyn Stage>> = vec![Box::new(SnapshotDownloader)];
        if config.compression_type == CompressionType::Xz {
            stages.push(Box::new(XzDecompressor));
        }
        stages.push(Box::new(HashCompute));
        stages.push(Box::new(SkipUnchanged));
        stages.push(Box::new(RouterPublisher));
        stages.push(Box::new(HashPersister));
        if config.delete_downloaded_content {
            stages.push(Box::new(Cleaner));
        }
        Chain::new(stages)
    }

    fn offset_chain(&self, explicit: Option<u64>) -> Chain {
        let config = &self.base.config;
        let mut stages: Vec<Box<dyn Stage>> = vec![
            Box::new(OffsetFetch::new(explicit)),
            Box::new(ContentDownloader),
        ];
        if config.compression_type == CompressionType::Xz {
            stages.push(Box::new(XzDecompressor));
        }
        if config.data_format == DataFormat::Json {
            stages.push(Box::new(JsonParser));
        }
        stages.push(Box::new(RouterPublisher));
        stages.push(Box::new(OffsetPersister));
        if config.delete_downloaded_content {
            stages.push(Box::new(Cleaner));
        }
        Chain::new(stages)
    }
}

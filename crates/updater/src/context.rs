//! Run contexts
//!
//! `BaseContext` is the immutable per-action environment shared by every
//! run of a topic. `UpdaterContext` is the mutable per-run carrier
//! threaded through the stage chain; it borrows the base context, which
//! outlives every run spawned from it.

use std::path::PathBuf;

use curator_config::ConfigData;
use curator_router::Publisher;
use curator_store::{KvStore, DEFAULT_COLUMN};
use parking_lot::Mutex;
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use crate::error::UpdaterError;
use crate::UpdaterResult;

/// Key holding the persisted offset, little-endian u64, default column
pub const CURRENT_OFFSET_KEY: &[u8] = b"current_offset";

/// Key holding the digest of the last materialized content
pub const LAST_HASH_KEY: &[u8] = b"last_hash";

/// Column family accumulating one digest entry per content change
pub const HASH_HISTORY_COLUMN: &str = "downloaded_file_hash";

/// Flavor of a single pipeline run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunKind {
    /// Incremental catch-up from a persisted offset
    Offset,
    /// Full snapshot refresh
    Content,
    /// Uncompressed snapshot delivered straight into `contents/`
    Raw,
}

/// Outcome of one executed stage
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageStatus {
    Ok,
    Fail,
}

/// Stage name plus its outcome, in execution order
#[derive(Debug, Clone)]
pub struct StageRecord {
    pub stage: &'static str,
    pub status: StageStatus,
}

/// Immutable per-action environment
///
/// Shared by the orchestrator, the scheduler task and the on-demand
/// handler; runs borrow it for their whole lifetime.
pub struct BaseContext {
    /// Router topic, also the on-demand endpoint name
    pub topic_name: String,
    /// Feed configuration snapshot
    pub config: ConfigData,
    /// Work root
    pub output_folder: PathBuf,
    /// Where compressed bodies land
    pub downloads_folder: PathBuf,
    /// Where materialized content lands
    pub contents_folder: PathBuf,
    /// Offset bookkeeping; absent when persistence is disabled
    pub store: Option<KvStore>,
    /// Router handle for publishing run notifications
    pub publisher: Publisher,
    /// Shared HTTP client
    pub http: reqwest::Client,
    /// Stop handle interrupting download retries
    pub cancel: CancellationToken,
    // Digest of the last content that reached subscribers. Cleared when
    // a run fails so the next run republishes.
    last_hash: Mutex<Option<String>>,
}

impl BaseContext {
    pub(crate) fn new(
        topic_name: String,
        config: ConfigData,
        store: Option<KvStore>,
        publisher: Publisher,
        http: reqwest::Client,
        last_hash: Option<String>,
    ) -> Self {
        let output_folder = config.output_folder.clone();
        Self {
            topic_name,
            downloads_folder: output_folder.join(crate::stages::DOWNLOADS_DIR),
            contents_folder: output_folder.join(crate::stages::CONTENTS_DIR),
            output_folder,
            config,
            store,
            publisher,
            http,
            cancel: CancellationToken::new(),
            last_hash: Mutex::new(last_hash),
        }
    }

    /// Digest of the last published content, if any
    pub fn last_hash(&self) -> Option<String> {
        self.last_hash.lock().clone()
    }

    /// Record the digest of freshly published content
    pub fn set_last_hash(&self, hash: String) {
        *self.last_hash.lock() = Some(hash);
    }

    /// Forget the recorded digest
    pub fn clear_last_hash(&self) {
        *self.last_hash.lock() = None;
    }

    /// Offset persisted by the last successful run, if any
    pub fn persisted_offset(&self) -> UpdaterResult<Option<u64>> {
        let Some(store) = &self.store else {
            return Ok(None);
        };
        match store.get(DEFAULT_COLUMN, CURRENT_OFFSET_KEY)? {
            Some(bytes) => {
                let bytes: [u8; 8] = bytes.as_slice().try_into().map_err(|_| {
                    UpdaterError::decode("persisted offset is not a little-endian u64")
                })?;
                Ok(Some(u64::from_le_bytes(bytes)))
            }
            None => Ok(None),
        }
    }
}

/// Mutable per-run state threaded through the chain
///
/// Exclusively owned by one pipeline invocation; stages receive it by
/// exclusive reference and mutate it in place. On failure the context
/// stays observable so the orchestrator can log the partial
/// `stage_status`.
pub struct UpdaterContext<'a> {
    /// Per-action environment this run belongs to
    pub base: &'a BaseContext,
    /// Flavor of this run
    pub kind: RunKind,
    /// Offset cursor; monotonic across successful runs
    pub current_offset: u64,
    /// Files produced so far, append-only within one run
    pub paths: Vec<PathBuf>,
    /// Parsed content items awaiting publication
    pub payload: Vec<Value>,
    /// Digest of the materialized content
    pub content_hash: Option<String>,
    /// Set when the content matches what subscribers already have
    pub content_unchanged: bool,
    /// One record per executed stage, in chain order
    pub stage_status: Vec<StageRecord>,
}

impl<'a> UpdaterContext<'a> {
    /// Create a fresh context for one run
    pub fn new(base: &'a BaseContext, kind: RunKind) -> Self {
        Self {
            base,
            kind,
            current_offset: 0,
            paths: Vec::new(),
            payload: Vec::new(),
            content_hash: None,
            content_unchanged: false,
            stage_status: Vec::new(),
        }
    }

    /// Record a completed stage
    pub fn record_ok(&mut self, stage: &'static str) {
        self.stage_status.push(StageRecord {
            stage,
            status: StageStatus::Ok,
        });
    }

    /// Record a failed stage
    pub fn record_fail(&mut self, stage: &'static str) {
        self.stage_status.push(StageRecord {
            stage,
            status: StageStatus::Fail,
        });
    }

    /// Name of the failing stage, if any stage failed
    pub fn failed_stage(&self) -> Option<&'static str> {
        self.stage_status
            .iter()
            .find(|record| record.status == StageStatus::Fail)
            .map(|record| record.stage)
    }
}

//! Download stages
//!
//! Fetch content from the configured source: a CTI-style consumer API
//! (snapshot link or offset changes), a plain HTTP endpoint, or a local
//! file. Server errors (5xx) are retried with exponential backoff capped
//! at thirty seconds, forever, until the download succeeds or a stop is
//! requested; any other failure aborts the stage immediately.

use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;
use std::time::Duration;

use curator_config::{CompressionType, ContentSource};
use serde_json::Value;
use tracing::{debug, error};

use crate::context::{BaseContext, UpdaterContext};
use crate::error::UpdaterError;
use crate::stages::{artifact_name, materialized_name};
use crate::{Stage, UpdaterResult};

const RETRY_SLEEP_CAP: Duration = Duration::from_secs(30);

/// Metadata advertised by a CTI-style consumer endpoint
pub(crate) struct ConsumerInfo {
    pub last_offset: u64,
    pub last_snapshot_link: String,
    pub last_snapshot_offset: u64,
}

async fn get_once(base: &BaseContext, url: &str) -> UpdaterResult<Vec<u8>> {
    let response = base.http.get(url).send().await?;
    let status = response.status();

    if status.is_server_error() {
        let message = response.text().await.unwrap_or_default();
        return Err(UpdaterError::Server {
            status: status.as_u16(),
            message,
        });
    }
    if !status.is_success() {
        return Err(UpdaterError::Status {
            status: status.as_u16(),
            url: url.to_string(),
        });
    }

    Ok(response.bytes().await?.to_vec())
}

/// GET with retry on server errors
///
/// The backoff doubles per attempt up to [`RETRY_SLEEP_CAP`]. The sleep
/// is raced against the action's stop handle so a shutdown does not wait
/// out the backoff.
pub(crate) async fn get_with_retry(base: &BaseContext, url: &str) -> UpdaterResult<Vec<u8>> {
    let mut attempt: u32 = 0;
    loop {
        if base.cancel.is_cancelled() {
            return Err(UpdaterError::Interrupted);
        }

        match get_once(base, url).await {
            Ok(body) => return Ok(body),
            Err(err) if err.is_retryable() => {
                let backoff = RETRY_SLEEP_CAP.min(Duration::from_secs(1u64 << attempt.min(5)));
                error!(
                    url,
                    error = %err,
                    backoff_secs = backoff.as_secs(),
                    "server error, retrying download"
                );
                attempt += 1;
                tokio::select! {
                    _ = base.cancel.cancelled() => return Err(UpdaterError::Interrupted),
                    _ = tokio::time::sleep(backoff) => {}
                }
            }
            Err(err) => return Err(err),
        }
    }
}

pub(crate) async fn fetch_consumer_info(base: &BaseContext) -> UpdaterResult<ConsumerInfo> {
    let body = get_with_retry(base, &base.config.url).await?;
    let value: Value = serde_json::from_slice(&body)
        .map_err(|e| UpdaterError::decode(format!("consumer metadata: {e}")))?;
    let data = value
        .get("data")
        .ok_or_else(|| UpdaterError::decode("consumer metadata is missing 'data'"))?;

    let info = ConsumerInfo {
        last_offset: data.get("last_offset").and_then(Value::as_u64).unwrap_or(0),
        last_snapshot_link: data
            .get("last_snapshot_link")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
        last_snapshot_offset: data
            .get("last_snapshot_offset")
            .and_then(Value::as_u64)
            .unwrap_or(0),
    };
    debug!(
        last_offset = info.last_offset,
        last_snapshot_offset = info.last_snapshot_offset,
        link = %info.last_snapshot_link,
        "consumer metadata fetched"
    );
    Ok(info)
}

// Snapshot links from consumer metadata may omit the scheme.
fn absolute_url(link: &str) -> String {
    if link.starts_with("http://") || link.starts_with("https://") {
        link.to_string()
    } else {
        format!("http://{link}")
    }
}

fn local_source(url: &str) -> PathBuf {
    PathBuf::from(url.strip_prefix("file://").unwrap_or(url))
}

/// Target path for the artifact of the current offset
///
/// Raw bodies are materialized directly under `contents/`; compressed
/// bodies land under `downloads/` for the decompressor to pick up.
fn target_path(ctx: &UpdaterContext<'_>) -> PathBuf {
    let config = &ctx.base.config;
    match config.compression_type {
        CompressionType::Raw => ctx
            .base
            .contents_folder
            .join(materialized_name(ctx.current_offset, config)),
        CompressionType::Xz => ctx
            .base
            .downloads_folder
            .join(artifact_name(ctx.current_offset, config)),
    }
}

/// Seeds the run's offset cursor
///
/// An explicit offset always wins; otherwise a zero cursor is
/// bootstrapped from the persisted offset when a store is configured.
pub struct OffsetFetch {
    explicit: Option<u64>,
}

impl OffsetFetch {
    pub fn new(explicit: Option<u64>) -> Self {
        Self { explicit }
    }
}

impl Stage for OffsetFetch {
    fn handle<'a>(
        &'a self,
        ctx: &'a mut UpdaterContext<'_>,
    ) -> Pin<Box<dyn Future<Output = UpdaterResult<()>> + Send + 'a>> {
        Box::pin(async move {
            if let Some(offset) = self.explicit {
                ctx.current_offset = offset;
            } else if ctx.current_offset == 0 {
                if let Some(persisted) = ctx.base.persisted_offset()? {
                    ctx.current_offset = persisted;
                }
            }
            debug!(offset = ctx.current_offset, "offset cursor ready");
            Ok(())
        })
    }

    fn name(&self) -> &'static str {
        "offset_fetch"
    }
}

/// Downloads a full content snapshot
pub struct SnapshotDownloader;

impl Stage for SnapshotDownloader {
    fn handle<'a>(
        &'a self,
        ctx: &'a mut UpdaterContext<'_>,
    ) -> Pin<Box<dyn Future<Output = UpdaterResult<()>> + Send + 'a>> {
        Box::pin(async move {
            let base = ctx.base;
            let config = &base.config;

            match config.content_source {
                ContentSource::CtiSnapshot | ContentSource::CtiOffset => {
                    let info = fetch_consumer_info(base).await?;
                    if info.last_snapshot_link.is_empty() {
                        return Err(UpdaterError::decode(
                            "consumer metadata has no snapshot link",
                        ));
                    }
                    ctx.current_offset = info.last_snapshot_offset;

                    let target = target_path(ctx);
                    let body =
                        get_with_retry(base, &absolute_url(&info.last_snapshot_link)).await?;
                    tokio::fs::write(&target, &body).await?;
                    debug!(path = %target.display(), bytes = body.len(), "snapshot downloaded");
                    ctx.paths.push(target);
                }
                ContentSource::Api => {
                    let target = target_path(ctx);
                    let body = get_with_retry(base, &config.url).await?;
                    tokio::fs::write(&target, &body).await?;
                    debug!(path = %target.display(), bytes = body.len(), "content downloaded");
                    ctx.paths.push(target);
                }
                ContentSource::File | ContentSource::Offline => {
                    let source = local_source(&config.url);
                    let target = target_path(ctx);
                    tokio::fs::copy(&source, &target).await?;
                    debug!(
                        source = %source.display(),
                        path = %target.display(),
                        "local content copied"
                    );
                    ctx.paths.push(target);
                }
            }
            Ok(())
        })
    }

    fn name(&self) -> &'static str {
        "snapshot_download"
    }
}

/// Downloads offset changes since the current cursor
pub struct ContentDownloader;

impl Stage for ContentDownloader {
    fn handle<'a>(
        &'a self,
        ctx: &'a mut UpdaterContext<'_>,
    ) -> Pin<Box<dyn Future<Output = UpdaterResult<()>> + Send + 'a>> {
        Box::pin(async move {
            let base = ctx.base;
            let info = fetch_consumer_info(base).await?;

            if info.last_offset <= ctx.current_offset {
                debug!(
                    offset = ctx.current_offset,
                    last_offset = info.last_offset,
                    "content already up to date"
                );
                return Ok(());
            }

            let url = format!(
                "{}/changes?from_offset={}&to_offset={}",
                base.config.url, ctx.current_offset, info.last_offset
            );
            let body = get_with_retry(base, &url).await?;

            ctx.current_offset = info.last_offset;
            let target = target_path(ctx);
            tokio::fs::write(&target, &body).await?;
            debug!(
                path = %target.display(),
                bytes = body.len(),
                offset = ctx.current_offset,
                "offset changes downloaded"
            );
            ctx.paths.push(target);
            Ok(())
        })
    }

    fn name(&self) -> &'static str {
        "content_download"
    }
}

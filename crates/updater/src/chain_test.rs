//! Tests for the stage chain

use super::*;
use crate::context::{BaseContext, RunKind, StageStatus};
use crate::error::UpdaterError;
use curator_config::{CompressionType, ConfigData, ContentSource, DataFormat};
use curator_router::Broker;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

fn test_base(topic: &str) -> BaseContext {
    let config = ConfigData {
        url: "http://localhost:1/unused".to_string(),
        content_source: ContentSource::Api,
        compression_type: CompressionType::Raw,
        data_format: DataFormat::Raw,
        delete_downloaded_content: false,
        output_folder: std::env::temp_dir().join("curator-chain-test"),
        content_file_name: "content".to_string(),
        database_path: None,
        consumer_name: "consumer".to_string(),
    };
    let broker = Broker::new();
    BaseContext::new(
        topic.to_string(),
        config,
        None,
        broker.publisher(topic),
        reqwest::Client::new(),
        None,
    )
}

struct OrderedStage {
    expected: usize,
    counter: Arc<AtomicUsize>,
    name: &'static str,
}

impl Stage for OrderedStage {
    fn handle<'a>(
        &'a self,
        _ctx: &'a mut UpdaterContext<'_>,
    ) -> std::pin::Pin<Box<dyn std::future::Future<Output = UpdaterResult<()>> + Send + 'a>> {
        let current = self.counter.fetch_add(1, Ordering::SeqCst);
        assert_eq!(current, self.expected, "stage {} ran out of order", self.name);
        Box::pin(async move { Ok(()) })
    }

    fn name(&self) -> &'static str {
        self.name
    }
}

struct FailingStage;

impl Stage for FailingStage {
    fn handle<'a>(
        &'a self,
        _ctx: &'a mut UpdaterContext<'_>,
    ) -> std::pin::Pin<Box<dyn std::future::Future<Output = UpdaterResult<()>> + Send + 'a>> {
        Box::pin(async move { Err(UpdaterError::decode("intentional failure")) })
    }

    fn name(&self) -> &'static str {
        "failing"
    }
}

struct OffsetBump(u64);

impl Stage for OffsetBump {
    fn handle<'a>(
        &'a self,
        ctx: &'a mut UpdaterContext<'_>,
    ) -> std::pin::Pin<Box<dyn std::future::Future<Output = UpdaterResult<()>> + Send + 'a>> {
        let bump = self.0;
        Box::pin(async move {
            ctx.current_offset += bump;
            Ok(())
        })
    }

    fn name(&self) -> &'static str {
        "offset_bump"
    }
}

#[tokio::test]
async fn test_empty_chain_succeeds() {
    let base = test_base("chain-empty");
    let mut ctx = UpdaterContext::new(&base, RunKind::Content);

    let chain = Chain::new(Vec::new());
    assert!(chain.is_empty());
    assert!(chain.run(&mut ctx).await.is_ok());
    assert!(ctx.stage_status.is_empty());
}

#[tokio::test]
async fn test_stages_run_in_declared_order() {
    let counter = Arc::new(AtomicUsize::new(0));
    let chain = Chain::new(vec![
        Box::new(OrderedStage {
            expected: 0,
            counter: Arc::clone(&counter),
            name: "first",
        }),
        Box::new(OrderedStage {
            expected: 1,
            counter: Arc::clone(&counter),
            name: "second",
        }),
        Box::new(OrderedStage {
            expected: 2,
            counter: Arc::clone(&counter),
            name: "third",
        }),
    ]);

    assert_eq!(chain.len(), 3);
    assert_eq!(chain.names(), vec!["first", "second", "third"]);

    let base = test_base("chain-order");
    let mut ctx = UpdaterContext::new(&base, RunKind::Content);
    chain.run(&mut ctx).await.unwrap();

    assert_eq!(counter.load(Ordering::SeqCst), 3);
    assert_eq!(ctx.stage_status.len(), 3);
    assert!(ctx
        .stage_status
        .iter()
        .all(|record| record.status == StageStatus::Ok));
}

#[tokio::test]
async fn test_error_stops_the_chain_and_is_recorded() {
    let counter = Arc::new(AtomicUsize::new(0));
    let chain = Chain::new(vec![
        Box::new(OrderedStage {
            expected: 0,
            counter: Arc::clone(&counter),
            name: "first",
        }),
        Box::new(FailingStage),
        Box::new(OrderedStage {
            expected: 99, // would assert if ever reached
            counter: Arc::clone(&counter),
            name: "after_failure",
        }),
    ]);

    let base = test_base("chain-fail");
    let mut ctx = UpdaterContext::new(&base, RunKind::Content);
    let result = chain.run(&mut ctx).await;

    assert!(result.is_err());
    // Status covers every executed stage, failing one included.
    assert_eq!(ctx.stage_status.len(), 2);
    assert_eq!(ctx.stage_status[0].status, StageStatus::Ok);
    assert_eq!(ctx.stage_status[1].stage, "failing");
    assert_eq!(ctx.stage_status[1].status, StageStatus::Fail);
    assert_eq!(ctx.failed_stage(), Some("failing"));
    assert_eq!(counter.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_stages_share_the_mutable_context() {
    let chain = Chain::new(vec![
        Box::new(OffsetBump(10)),
        Box::new(OffsetBump(32)),
    ]);

    let base = test_base("chain-context");
    let mut ctx = UpdaterContext::new(&base, RunKind::Offset);
    chain.run(&mut ctx).await.unwrap();

    assert_eq!(ctx.current_offset, 42);
}

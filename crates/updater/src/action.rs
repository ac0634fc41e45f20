//! Action facade
//!
//! An `Action` binds the scheduler, the on-demand endpoint and the
//! orchestrator to one topic. Construction is the only user-visible
//! failure surface: it validates the parameter document, prepares the
//! workspace folders and opens the store. Everything that happens during
//! a run is logged and swallowed.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use curator_config::{ActionParameters, ContentSource};
use curator_router::Broker;
use curator_store::{KvStore, DEFAULT_COLUMN};
use serde_json::Value;
use tracing::{debug, info};

use crate::context::{BaseContext, HASH_HISTORY_COLUMN, LAST_HASH_KEY};
use crate::error::UpdaterError;
use crate::ondemand::{OnDemandHandler, OnDemandRegistry};
use crate::orchestrator::{Orchestrator, RunOutcome, UpdateKind};
use crate::scheduler::Scheduler;
use crate::UpdaterResult;

const HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Shared core of an action: the orchestrator plus the run-exclusivity
/// flag guarding it
pub(crate) struct ActionInner {
    orchestrator: Orchestrator,
    in_progress: AtomicBool,
    default_kind: UpdateKind,
}

impl ActionInner {
    fn topic(&self) -> &str {
        &self.orchestrator.base().topic_name
    }

    pub(crate) async fn run_scheduled(&self) -> bool {
        info!(topic = %self.topic(), "starting scheduled action");
        self.run_exclusively("scheduled", None, self.default_kind)
            .await
    }

    pub(crate) async fn run_on_demand(&self, offset: Option<u64>, kind: UpdateKind) -> bool {
        info!(topic = %self.topic(), "starting on-demand action");
        self.run_exclusively("on-demand", offset, kind).await
    }

    /// Run the pipeline unless another run is already in progress
    ///
    /// Returns whether the run was executed. At most one run per action
    /// is in flight at any moment; a second trigger is ignored with a
    /// log line, never queued.
    async fn run_exclusively(&self, trigger: &str, offset: Option<u64>, kind: UpdateKind) -> bool {
        if self
            .in_progress
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            info!(
                topic = %self.topic(),
                trigger,
                "action in progress, request ignored"
            );
            return false;
        }

        let outcome: RunOutcome = self.orchestrator.run(offset, kind).await;
        debug!(
            topic = %self.topic(),
            trigger,
            success = outcome.success,
            offset = outcome.offset,
            "action finished"
        );

        self.in_progress.store(false, Ordering::SeqCst);
        true
    }
}

/// Topic-scoped facade over scheduler, on-demand endpoint and orchestrator
///
/// The scheduler and the on-demand registration compose independently;
/// stopping one leaves the other untouched. Call [`Action::stop_scheduler`]
/// before dropping for a graceful join; dropping without it lets the
/// scheduler task wind down on its own after the current run.
pub struct Action {
    topic: String,
    parameters: ActionParameters,
    inner: Arc<ActionInner>,
    scheduler: Scheduler,
    registered: bool,
}

impl Action {
    /// Create an action from a parameter document
    ///
    /// Validates the document (`configData` is required), creates the
    /// output folder with its `downloads/` and `contents/` subfolders,
    /// and opens the key-value store when a `databasePath` is configured.
    /// Two actions must not share a database path; the second action
    /// omits it to disable persistence.
    pub fn new(broker: &Broker, parameters: Value) -> UpdaterResult<Self> {
        let parameters = ActionParameters::from_value(parameters)?;
        let config = parameters.validate()?.clone();
        let topic = parameters.topic_name.clone();

        std::fs::create_dir_all(config.output_folder.join(crate::stages::DOWNLOADS_DIR))?;
        std::fs::create_dir_all(config.output_folder.join(crate::stages::CONTENTS_DIR))?;

        let store = match &config.database_path {
            Some(path) => {
                let store = KvStore::open(path, true)?;
                if !store.column_exists(HASH_HISTORY_COLUMN)? {
                    store.create_column(HASH_HISTORY_COLUMN)?;
                }
                Some(store)
            }
            None => None,
        };

        let last_hash = match &store {
            Some(store) => store
                .get(DEFAULT_COLUMN, LAST_HASH_KEY)?
                .map(|bytes| String::from_utf8_lossy(&bytes).into_owned()),
            None => None,
        };

        let http = reqwest::Client::builder()
            .user_agent(concat!("curator/", env!("CARGO_PKG_VERSION")))
            .timeout(HTTP_TIMEOUT)
            .build()?;

        let default_kind = match config.content_source {
            // Offset feeds catch up incrementally by default; everything
            // else refreshes from a snapshot.
            ContentSource::CtiOffset => UpdateKind::Offset,
            _ => UpdateKind::Content,
        };

        let base = BaseContext::new(
            topic.clone(),
            config,
            store,
            broker.publisher(&topic),
            http,
            last_hash,
        );

        info!(topic = %topic, output = %base.output_folder.display(), "action created");

        Ok(Self {
            scheduler: Scheduler::new(topic.clone()),
            inner: Arc::new(ActionInner {
                orchestrator: Orchestrator::new(Arc::new(base)),
                in_progress: AtomicBool::new(false),
                default_kind,
            }),
            topic,
            parameters,
            registered: false,
        })
    }

    /// Topic this action owns
    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// Interval configured in the parameter document, in seconds
    pub fn configured_interval(&self) -> u64 {
        self.parameters.interval
    }

    /// Whether the document asks for the on-demand endpoint
    pub fn ondemand_enabled(&self) -> bool {
        self.parameters.ondemand
    }

    /// Whether the scheduler is currently running
    pub fn scheduler_running(&self) -> bool {
        self.scheduler.is_running()
    }

    /// Start the periodic scheduler
    ///
    /// The pipeline runs once immediately, then every `interval_secs`.
    pub fn start_scheduler(&mut self, interval_secs: u64) {
        self.scheduler.start(interval_secs, Arc::clone(&self.inner));
    }

    /// Stop the scheduler, waiting for any in-flight run
    ///
    /// Idempotent: a second call is a no-op.
    pub async fn stop_scheduler(&mut self) {
        self.scheduler.stop().await;
    }

    /// Change the scheduler interval; takes effect on the next sleep
    pub fn change_interval(&self, interval_secs: u64) {
        self.scheduler.change_interval(interval_secs);
    }

    /// Register this topic's on-demand endpoint
    ///
    /// Fails with `StateConflict` when another action already registered
    /// the same topic.
    pub fn register_on_demand(&mut self) -> UpdaterResult<()> {
        let inner = Arc::clone(&self.inner);
        let handler: OnDemandHandler = Arc::new(move |offset, kind| {
            let inner = Arc::clone(&inner);
            Box::pin(async move {
                inner.run_on_demand(offset, kind).await;
            })
        });

        OnDemandRegistry::global().register(&self.topic, handler)?;
        self.registered = true;
        Ok(())
    }

    /// Remove this topic's on-demand endpoint
    pub fn unregister_on_demand(&mut self) {
        if self.registered {
            OnDemandRegistry::global().unregister(&self.topic);
            self.registered = false;
        }
    }

    /// Remove every on-demand endpoint in the process
    pub fn clear_endpoints(&mut self) {
        OnDemandRegistry::global().clear();
        self.registered = false;
    }

    /// Run the pipeline once, now
    ///
    /// Returns whether the run was executed (`false` when another run was
    /// already in progress). Run-level errors are swallowed.
    pub async fn run_on_demand(&self, offset: Option<u64>, kind: Option<UpdateKind>) -> bool {
        self.inner
            .run_on_demand(offset, kind.unwrap_or(self.inner.default_kind))
            .await
    }

    /// Per-action environment, mainly for inspection in tests
    pub fn base(&self) -> &crate::context::BaseContext {
        self.inner.orchestrator.base()
    }
}

impl Drop for Action {
    fn drop(&mut self) {
        // Interrupt any retry wait and let the scheduler task wind down;
        // it holds its own Arc to the inner state, so it outlives us
        // safely without being aborted mid-run.
        self.inner.orchestrator.base().cancel.cancel();
        self.scheduler.request_stop();
        if self.registered {
            OnDemandRegistry::global().unregister(&self.topic);
        }
    }
}

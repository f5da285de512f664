//! Shared world state for push correlation BDD scenarios.

use std::sync::Arc;

use mockable::DefaultClock;
use rstest::fixture;
use tracksync::{
    config::SyncConfig,
    sync::{
        adapters::memory::{InMemoryTracker, InMemoryVcs, InMemoryWebhookStore, StaticUserDirectory},
        domain::TaskGid,
        services::{SyncAdapters, SyncEngine, VcsDeliveryError, VcsReply},
    },
};

/// Engine type used by the BDD world.
pub type TestEngine =
    SyncEngine<InMemoryTracker, InMemoryVcs, InMemoryWebhookStore, StaticUserDirectory>;

/// Token the engine expects on VCS deliveries.
pub const VCS_TOKEN: &str = "vcs-token";

/// Scenario world for push correlation behaviour tests.
pub struct PushWorld {
    pub tracker: Arc<InMemoryTracker>,
    pub engine: Option<TestEngine>,
    pub token: String,
    pub last_reply: Option<Result<VcsReply, VcsDeliveryError>>,
}

impl PushWorld {
    /// Creates a world with an empty tracker and no running engine.
    #[must_use]
    pub fn new() -> Self {
        Self {
            tracker: Arc::new(InMemoryTracker::new()),
            engine: None,
            token: VCS_TOKEN.to_owned(),
            last_reply: None,
        }
    }

    /// Returns the running engine, starting it on first use.
    ///
    /// # Errors
    ///
    /// Returns an error when the engine rejects its configuration.
    pub fn engine(&mut self) -> Result<&TestEngine, eyre::Report> {
        if self.engine.is_none() {
            let config = SyncConfig {
                project_prefix: "PROJ".to_owned(),
                project_id: "project-1".to_owned(),
                vcs_webhook_secret: VCS_TOKEN.to_owned(),
                base_url: "https://sync.example.com".to_owned(),
                retry_backoff_ms: 0,
                ..SyncConfig::default()
            };
            let engine = SyncEngine::start(
                &config,
                SyncAdapters {
                    tracker: Arc::clone(&self.tracker),
                    vcs: Arc::new(InMemoryVcs::new()),
                    store: Arc::new(InMemoryWebhookStore::new()),
                    users: Arc::new(StaticUserDirectory::new()),
                },
                Arc::new(DefaultClock),
            )?;
            self.engine = Some(engine);
        }
        self.engine
            .as_ref()
            .ok_or_else(|| eyre::eyre!("engine was not started"))
    }

    /// Returns the comments appended to a task.
    pub fn comments(&self, gid: &str) -> Vec<String> {
        self.tracker.comments_for(&TaskGid::new(gid))
    }
}

impl Default for PushWorld {
    fn default() -> Self {
        Self::new()
    }
}

/// Fixture that creates a new scenario world.
#[fixture]
pub fn world() -> PushWorld {
    PushWorld::default()
}

/// Runs an async operation within sync step definitions.
pub fn run_async<T>(future: impl std::future::Future<Output = T>) -> T {
    tokio::task::block_in_place(|| tokio::runtime::Handle::current().block_on(future))
}

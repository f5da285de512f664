//! Wiring of the sync services from configuration and adapters.

use mockable::Clock;
use std::sync::Arc;
use thiserror::Error;
use tracing::info;

use super::{
    CounterService, EventDispatcher, NoteComposer, NoteError, OutboundHandle, OutboundQueue,
    SignatureVerifier, TaskResolver, TaskUpdater, WebhookAdminService,
};
use crate::config::{ConfigError, SyncConfig};
use crate::sync::ports::{TrackerClient, UserDirectory, VcsClient, WebhookStore};

/// Platform adapters the engine runs against.
pub struct SyncAdapters<T, V, W, U> {
    /// Tracker client.
    pub tracker: Arc<T>,
    /// VCS client.
    pub vcs: Arc<V>,
    /// Webhook registration store.
    pub store: Arc<W>,
    /// User identity map.
    pub users: Arc<U>,
}

/// Errors raised while starting the engine.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The configuration is invalid.
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// The note templates failed to compile.
    #[error(transparent)]
    Note(#[from] NoteError),
}

/// Running sync engine: dispatcher, webhook administration, and the
/// outbound worker.
pub struct SyncEngine<T, V, W, U>
where
    T: TrackerClient + 'static,
    V: VcsClient,
    W: WebhookStore,
    U: UserDirectory,
{
    dispatcher: EventDispatcher<T, V, W, U>,
    admin: WebhookAdminService<T, W>,
    queue: OutboundQueue,
}

impl<T, V, W, U> SyncEngine<T, V, W, U>
where
    T: TrackerClient + 'static,
    V: VcsClient,
    W: WebhookStore,
    U: UserDirectory,
{
    /// Validates `config`, then builds the services and spawns the outbound
    /// worker on the current Tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError`] when the configuration is invalid or the
    /// note templates fail to compile.
    pub fn start<C>(
        config: &SyncConfig,
        adapters: SyncAdapters<T, V, W, U>,
        clock: Arc<C>,
    ) -> Result<Self, EngineError>
    where
        C: Clock + Send + Sync + 'static,
    {
        config.validate()?;
        let SyncAdapters {
            tracker,
            vcs,
            store,
            users,
        } = adapters;

        let resolver = Arc::new(TaskResolver::new(Arc::clone(&tracker)));
        let updater = Arc::new(TaskUpdater::new(
            Arc::clone(&tracker),
            resolver,
            config.progress_field_name.as_str(),
        ));
        let queue = OutboundQueue::start(updater, clock, config.outbound_settings());

        let dispatcher = EventDispatcher::new(
            Arc::clone(&tracker),
            vcs,
            SignatureVerifier::new(Arc::clone(&store), config.vcs_webhook_secret.as_str()),
            CounterService::new(Arc::clone(&tracker), config.project_prefix.as_str()),
            NoteComposer::new(users, config.mention_url_template.as_str())?,
            queue.handle(),
        )
        .with_excluded_branches(&config.excluded_branches);
        let admin = WebhookAdminService::new(tracker, store, &config.base_url);

        info!(
            prefix = %config.project_prefix,
            project = %config.project_id,
            "sync engine started"
        );
        Ok(Self {
            dispatcher,
            admin,
            queue,
        })
    }

    /// Returns the inbound dispatcher.
    #[must_use]
    pub const fn dispatcher(&self) -> &EventDispatcher<T, V, W, U> {
        &self.dispatcher
    }

    /// Returns the webhook administration service.
    #[must_use]
    pub const fn admin(&self) -> &WebhookAdminService<T, W> {
        &self.admin
    }

    /// Returns a handle to the outbound queue.
    #[must_use]
    pub fn outbound(&self) -> OutboundHandle {
        self.queue.handle()
    }

    /// Drains queued jobs and stops the outbound worker.
    pub async fn shutdown(self) {
        self.queue.shutdown().await;
        info!("sync engine stopped");
    }
}

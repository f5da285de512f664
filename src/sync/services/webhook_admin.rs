//! Tracker webhook registration management.

use std::sync::Arc;
use thiserror::Error;
use tracing::info;

use crate::sync::{
    domain::WebhookId,
    ports::{
        StoredWebhook, TrackerClient, TrackerError, WebhookFilter, WebhookInfo, WebhookStore,
        WebhookStoreError,
    },
};

/// Path of the tracker webhook endpoint below the public base URL.
pub const TRACKER_WEBHOOK_PATH: &str = "/webhooks/asana";

/// Errors returned by webhook administration.
#[derive(Debug, Error)]
pub enum WebhookAdminError {
    /// No registration is stored.
    #[error("no webhook registration is saved")]
    NoWebhookSaved,
    /// A tracker call failed.
    #[error(transparent)]
    Tracker(#[from] TrackerError),
    /// The webhook store failed.
    #[error(transparent)]
    Store(#[from] WebhookStoreError),
}

/// Creates, lists, and deletes the project webhook.
pub struct WebhookAdminService<T, W>
where
    T: TrackerClient,
    W: WebhookStore,
{
    tracker: Arc<T>,
    store: Arc<W>,
    target_url: String,
}

impl<T, W> WebhookAdminService<T, W>
where
    T: TrackerClient,
    W: WebhookStore,
{
    /// Creates a service registering hooks that call back `base_url`.
    #[must_use]
    pub fn new(tracker: Arc<T>, store: Arc<W>, base_url: &str) -> Self {
        Self {
            tracker,
            store,
            target_url: format!("{}{TRACKER_WEBHOOK_PATH}", base_url.trim_end_matches('/')),
        }
    }

    /// Returns the callback URL used for new registrations.
    #[must_use]
    pub fn target_url(&self) -> &str {
        &self.target_url
    }

    /// Registers a webhook for task creations on the project.
    ///
    /// The handshake secret stored during registration is kept.
    ///
    /// # Errors
    ///
    /// Returns [`WebhookAdminError`] when registration or persistence fails.
    pub async fn create_hook(&self) -> Result<WebhookId, WebhookAdminError> {
        let filters = [WebhookFilter {
            action: "added".to_owned(),
            resource_type: "task".to_owned(),
        }];
        let id = self
            .tracker
            .create_webhook(&self.target_url, &filters)
            .await?;
        self.store
            .update_webhook(StoredWebhook::with_id(id.clone()))
            .await?;
        info!(webhook_id = %id, target = %self.target_url, "tracker webhook created");
        Ok(id)
    }

    /// Lists the webhooks registered on the project.
    ///
    /// # Errors
    ///
    /// Returns [`WebhookAdminError::Tracker`] when the listing fails.
    pub async fn show_hooks(&self) -> Result<Vec<WebhookInfo>, WebhookAdminError> {
        Ok(self.tracker.list_webhooks().await?)
    }

    /// Deletes the stored registration on the tracker and locally.
    ///
    /// # Errors
    ///
    /// Returns [`WebhookAdminError::NoWebhookSaved`] when nothing is stored,
    /// or the tracker or store error.
    pub async fn delete_hook(&self) -> Result<WebhookId, WebhookAdminError> {
        let id = self
            .store
            .get_webhook()
            .await?
            .and_then(|stored| stored.webhook_id)
            .ok_or(WebhookAdminError::NoWebhookSaved)?;
        self.tracker.delete_webhook(&id).await?;
        self.store.delete_webhook().await?;
        info!(webhook_id = %id, "tracker webhook deleted");
        Ok(id)
    }
}

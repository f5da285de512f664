//! Persistence port for the tracker webhook registration.

use crate::sync::domain::WebhookId;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;

/// Result type for webhook store operations.
pub type WebhookStoreResult<T> = Result<T, WebhookStoreError>;

/// Persisted webhook registration.
///
/// Both fields are optional: the handshake stores the secret before the
/// tracker returns the registration id.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredWebhook {
    /// Registration identifier.
    #[serde(rename = "webhookID", default)]
    pub webhook_id: Option<WebhookId>,
    /// Shared secret received during the handshake.
    #[serde(default)]
    pub secret: Option<String>,
}

impl StoredWebhook {
    /// Creates a record holding only a secret.
    #[must_use]
    pub fn with_secret(secret: impl Into<String>) -> Self {
        Self {
            webhook_id: None,
            secret: Some(secret.into()),
        }
    }

    /// Creates a record holding only a registration id.
    #[must_use]
    pub const fn with_id(webhook_id: WebhookId) -> Self {
        Self {
            webhook_id: Some(webhook_id),
            secret: None,
        }
    }

    /// Fills fields missing from `self` with the values of `stored`.
    #[must_use]
    pub fn merged_over(self, stored: Self) -> Self {
        Self {
            webhook_id: self.webhook_id.or(stored.webhook_id),
            secret: self.secret.filter(|s| !s.is_empty()).or(stored.secret),
        }
    }
}

/// Webhook registration persistence contract.
#[async_trait]
pub trait WebhookStore: Send + Sync {
    /// Reads the stored registration.
    ///
    /// Returns `None` when nothing has been stored.
    async fn get_webhook(&self) -> WebhookStoreResult<Option<StoredWebhook>>;

    /// Returns the registered secret, cached in memory after the first load.
    async fn webhook_secret(&self) -> WebhookStoreResult<Option<String>>;

    /// Replaces the stored registration.
    async fn save_webhook(&self, webhook: StoredWebhook) -> WebhookStoreResult<()>;

    /// Removes the stored registration and clears the cached secret.
    async fn delete_webhook(&self) -> WebhookStoreResult<()>;

    /// Merges the set fields of `patch` over the stored registration.
    ///
    /// Returns the record that was written.
    async fn update_webhook(&self, patch: StoredWebhook) -> WebhookStoreResult<StoredWebhook> {
        let merged = match self.get_webhook().await? {
            Some(stored) => patch.merged_over(stored),
            None => patch,
        };
        self.save_webhook(merged.clone()).await?;
        Ok(merged)
    }
}

/// Errors returned by webhook store implementations.
#[derive(Debug, Clone, Error)]
pub enum WebhookStoreError {
    /// The stored record could not be decoded.
    #[error("corrupt webhook record: {0}")]
    Corrupt(String),

    /// Persistence-layer failure.
    #[error("persistence error: {0}")]
    Persistence(Arc<dyn std::error::Error + Send + Sync>),
}

impl WebhookStoreError {
    /// Wraps a persistence error.
    pub fn persistence(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Persistence(Arc::new(err))
    }
}

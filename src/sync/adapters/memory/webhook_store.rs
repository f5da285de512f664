//! In-memory webhook registration store.

use async_trait::async_trait;
use std::sync::{Arc, PoisonError, RwLock};

use crate::sync::ports::{StoredWebhook, WebhookStore, WebhookStoreResult};

/// Thread-safe in-memory webhook store.
#[derive(Debug, Clone, Default)]
pub struct InMemoryWebhookStore {
    record: Arc<RwLock<Option<StoredWebhook>>>,
}

impl InMemoryWebhookStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store already holding `webhook`.
    #[must_use]
    pub fn with_webhook(webhook: StoredWebhook) -> Self {
        Self {
            record: Arc::new(RwLock::new(Some(webhook))),
        }
    }
}

#[async_trait]
impl WebhookStore for InMemoryWebhookStore {
    async fn get_webhook(&self) -> WebhookStoreResult<Option<StoredWebhook>> {
        Ok(self
            .record
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone())
    }

    async fn webhook_secret(&self) -> WebhookStoreResult<Option<String>> {
        Ok(self
            .record
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .and_then(|webhook| webhook.secret.clone())
            .filter(|secret| !secret.is_empty()))
    }

    async fn save_webhook(&self, webhook: StoredWebhook) -> WebhookStoreResult<()> {
        *self.record.write().unwrap_or_else(PoisonError::into_inner) = Some(webhook);
        Ok(())
    }

    async fn delete_webhook(&self) -> WebhookStoreResult<()> {
        *self.record.write().unwrap_or_else(PoisonError::into_inner) = None;
        Ok(())
    }
}

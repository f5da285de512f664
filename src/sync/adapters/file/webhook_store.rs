//! Webhook registration persisted as a JSON file.

use async_trait::async_trait;
use camino::Utf8Path;
use cap_std::fs_utf8::Dir;
use std::io::ErrorKind;
use std::sync::{Mutex, PoisonError};

use super::open_parent_dir;
use crate::sync::ports::{StoredWebhook, WebhookStore, WebhookStoreError, WebhookStoreResult};

/// Webhook store backed by a single JSON file.
///
/// The secret is cached in memory after the first successful read. A
/// missing file, or a file holding `null`, means no registration.
pub struct JsonFileWebhookStore {
    dir: Dir,
    file_name: String,
    cached_secret: Mutex<Option<String>>,
}

impl JsonFileWebhookStore {
    /// Opens the store for the file at `path`.
    ///
    /// The file itself does not need to exist yet.
    ///
    /// # Errors
    ///
    /// Returns [`WebhookStoreError::Persistence`] when the parent directory
    /// cannot be opened.
    pub fn open(path: &Utf8Path) -> WebhookStoreResult<Self> {
        let (dir, file_name) = open_parent_dir(path).map_err(WebhookStoreError::persistence)?;
        Ok(Self {
            dir,
            file_name,
            cached_secret: Mutex::new(None),
        })
    }

    fn read_record(&self) -> WebhookStoreResult<Option<StoredWebhook>> {
        let contents = match self.dir.read_to_string(&self.file_name) {
            Ok(contents) => contents,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(WebhookStoreError::persistence(err)),
        };
        if contents.trim().is_empty() {
            return Ok(None);
        }
        serde_json::from_str::<Option<StoredWebhook>>(&contents)
            .map_err(|err| WebhookStoreError::Corrupt(err.to_string()))
    }

    fn cache_secret(&self, secret: Option<String>) {
        *self
            .cached_secret
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = secret;
    }
}

#[async_trait]
impl WebhookStore for JsonFileWebhookStore {
    async fn get_webhook(&self) -> WebhookStoreResult<Option<StoredWebhook>> {
        self.read_record()
    }

    async fn webhook_secret(&self) -> WebhookStoreResult<Option<String>> {
        let cached = self
            .cached_secret
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        if cached.is_some() {
            return Ok(cached);
        }
        let secret = self
            .read_record()?
            .and_then(|webhook| webhook.secret)
            .filter(|secret| !secret.is_empty());
        if secret.is_some() {
            self.cache_secret(secret.clone());
        }
        Ok(secret)
    }

    async fn save_webhook(&self, webhook: StoredWebhook) -> WebhookStoreResult<()> {
        let contents = serde_json::to_string_pretty(&webhook)
            .map_err(|err| WebhookStoreError::Corrupt(err.to_string()))?;
        self.dir
            .write(&self.file_name, contents)
            .map_err(WebhookStoreError::persistence)?;
        if let Some(secret) = webhook.secret.filter(|secret| !secret.is_empty()) {
            self.cache_secret(Some(secret));
        }
        Ok(())
    }

    async fn delete_webhook(&self) -> WebhookStoreResult<()> {
        match self.dir.remove_file(&self.file_name) {
            Ok(()) => {}
            Err(err) if err.kind() == ErrorKind::NotFound => {}
            Err(err) => return Err(WebhookStoreError::persistence(err)),
        }
        self.cache_secret(None);
        Ok(())
    }
}

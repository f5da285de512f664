//! Webhook authenticity checks for both inbound sources.

use std::sync::Arc;
use tracing::{debug, warn};

use crate::sync::{
    domain::verify,
    ports::{StoredWebhook, WebhookStore, WebhookStoreResult},
};

/// Outcome of a tracker signature check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignatureCheck {
    /// The signature matches the registered secret.
    Valid,
    /// No secret is registered yet, so the delivery is accepted.
    AcceptedWithoutSecret,
    /// The delivery carries no signature header.
    Missing,
    /// The signature does not match.
    Mismatch,
}

impl SignatureCheck {
    /// Returns `true` when the delivery may be processed.
    #[must_use]
    pub const fn is_accepted(self) -> bool {
        matches!(self, Self::Valid | Self::AcceptedWithoutSecret)
    }
}

/// Verifies inbound webhook deliveries.
#[derive(Clone)]
pub struct SignatureVerifier<W>
where
    W: WebhookStore,
{
    store: Arc<W>,
    vcs_secret: String,
}

impl<W> SignatureVerifier<W>
where
    W: WebhookStore,
{
    /// Creates a verifier using `store` for the tracker secret and
    /// `vcs_secret` for the VCS hook token.
    #[must_use]
    pub fn new(store: Arc<W>, vcs_secret: impl Into<String>) -> Self {
        Self {
            store,
            vcs_secret: vcs_secret.into(),
        }
    }

    /// Checks a tracker delivery signature over the raw body bytes.
    ///
    /// Before the handshake has stored a secret, deliveries are accepted
    /// with a warning.
    ///
    /// # Errors
    ///
    /// Returns a store error when the secret cannot be loaded.
    pub async fn verify_tracker(
        &self,
        signature: Option<&str>,
        raw_body: &[u8],
    ) -> WebhookStoreResult<SignatureCheck> {
        let Some(header) = signature.filter(|value| !value.is_empty()) else {
            warn!("tracker delivery rejected: no signature header");
            return Ok(SignatureCheck::Missing);
        };
        let Some(secret) = self.store.webhook_secret().await? else {
            warn!("tracker delivery accepted: no webhook secret registered yet");
            return Ok(SignatureCheck::AcceptedWithoutSecret);
        };
        if verify(header, raw_body, &secret) {
            Ok(SignatureCheck::Valid)
        } else {
            warn!(signature = header, "tracker delivery rejected: signature mismatch");
            Ok(SignatureCheck::Mismatch)
        }
    }

    /// Checks the static VCS hook token.
    #[must_use]
    pub fn verify_vcs(&self, token: Option<&str>) -> bool {
        token.is_some_and(|value| value == self.vcs_secret)
    }

    /// Stores the secret received in a tracker handshake.
    ///
    /// # Errors
    ///
    /// Returns a store error when the secret cannot be persisted.
    pub async fn handle_handshake(&self, secret: &str) -> WebhookStoreResult<()> {
        debug!("tracker webhook handshake");
        self.store
            .save_webhook(StoredWebhook::with_secret(secret))
            .await
    }
}

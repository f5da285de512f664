//! Webhook registration management flows.

#![expect(
    clippy::panic_in_result_fn,
    reason = "Tests assert on outcomes while propagating setup errors with ?"
)]

use rstest::rstest;
use tracksync::{
    config::SyncConfig,
    sync::{
        adapters::memory::InMemoryTracker,
        domain::WebhookId,
        ports::{StoredWebhook, WebhookStore},
        services::WebhookAdminError,
    },
};

use super::helpers::{SECRET, config, handshake, start_engine};

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn create_hook_targets_tracker_endpoint_and_keeps_secret(
    config: SyncConfig,
) -> eyre::Result<()> {
    let fixture = start_engine(&config, InMemoryTracker::new())?;
    fixture
        .engine
        .dispatcher()
        .handle_tracker_delivery(handshake())
        .await;
    let admin = fixture.engine.admin();

    let id = admin.create_hook().await?;

    assert_eq!(admin.target_url(), "https://sync.example.com/webhooks/asana");
    let hooks = admin.show_hooks().await?;
    assert_eq!(hooks.len(), 1);
    assert!(hooks.iter().all(|hook| hook.target == admin.target_url()));
    assert_eq!(
        fixture.store.get_webhook().await?,
        Some(StoredWebhook {
            webhook_id: Some(id),
            secret: Some(SECRET.to_owned()),
        })
    );
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn delete_hook_removes_registration(config: SyncConfig) -> eyre::Result<()> {
    let fixture = start_engine(&config, InMemoryTracker::new())?;
    let admin = fixture.engine.admin();
    let id = admin.create_hook().await?;

    let deleted = admin.delete_hook().await?;

    assert_eq!(deleted, id);
    assert!(admin.show_hooks().await?.is_empty());
    assert_eq!(fixture.store.get_webhook().await?, None);
    assert_eq!(fixture.store.webhook_secret().await?, None);
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn delete_without_registration_fails(config: SyncConfig) -> eyre::Result<()> {
    let fixture = start_engine(&config, InMemoryTracker::new())?;
    fixture
        .store
        .save_webhook(StoredWebhook::with_secret(SECRET))
        .await?;

    let result = fixture.engine.admin().delete_hook().await;

    assert!(matches!(result, Err(WebhookAdminError::NoWebhookSaved)));
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn delete_of_unknown_remote_hook_keeps_local_record(config: SyncConfig) -> eyre::Result<()> {
    let fixture = start_engine(&config, InMemoryTracker::new())?;
    fixture
        .store
        .save_webhook(StoredWebhook::with_id(WebhookId::new("gone")))
        .await?;

    let result = fixture.engine.admin().delete_hook().await;

    assert!(matches!(result, Err(WebhookAdminError::Tracker(_))));
    assert!(fixture.store.get_webhook().await?.is_some());
    Ok(())
}

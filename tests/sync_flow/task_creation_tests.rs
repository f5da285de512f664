//! Tracker task-creation flows: handshake, signatures, and stamping.

#![expect(
    clippy::panic_in_result_fn,
    reason = "Tests assert on outcomes while propagating setup errors with ?"
)]

use rstest::rstest;
use serde_json::json;
use tracksync::{
    config::SyncConfig,
    sync::{
        adapters::memory::{InMemoryTracker, TrackerOperation},
        ports::WebhookStore,
        services::{SignatureCheck, TrackerOutcome},
    },
};

use super::helpers::{
    SECRET, config, created, handshake, signed_delivery, start_engine, tracked_task,
};

fn board() -> InMemoryTracker {
    let tracker = InMemoryTracker::with_project_notes("Release board\n[currentTaskId: 41]");
    tracker.insert_task(tracked_task("100", "Write onboarding guide"));
    tracker.insert_task(tracked_task("101", "Rotate API keys"));
    tracker.insert_task(tracked_task("102", "[PROJ-40] Imported task"));
    tracker
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn handshake_then_signed_batch_stamps_new_tasks(config: SyncConfig) -> eyre::Result<()> {
    let fixture = start_engine(&config, board())?;
    let dispatcher = fixture.engine.dispatcher();

    let reply = dispatcher.handle_tracker_delivery(handshake()).await;
    assert_eq!(reply.echo_secret.as_deref(), Some(SECRET));
    assert_eq!(fixture.store.webhook_secret().await?, Some(SECRET.to_owned()));

    let body = json!({ "events": [created("100"), created("102"), created("101")] });
    let reply = dispatcher.handle_tracker_delivery(signed_delivery(&body)?).await;
    fixture.settle().await?;

    assert_eq!(reply.outcome, TrackerOutcome::Processed { stamped: 2 });
    assert_eq!(fixture.title("100").as_deref(), Some("[PROJ-42] Write onboarding guide"));
    assert_eq!(fixture.title("101").as_deref(), Some("[PROJ-43] Rotate API keys"));
    assert_eq!(fixture.title("102").as_deref(), Some("[PROJ-40] Imported task"));
    assert_eq!(
        fixture.tracker.project_notes(),
        "Release board\n[currentTaskId: 43]"
    );
    fixture.engine.shutdown().await;
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn redelivered_batch_does_not_restamp(config: SyncConfig) -> eyre::Result<()> {
    let fixture = start_engine(&config, board())?;
    let dispatcher = fixture.engine.dispatcher();
    dispatcher.handle_tracker_delivery(handshake()).await;
    let body = json!({ "events": [created("100")] });

    dispatcher.handle_tracker_delivery(signed_delivery(&body)?).await;
    fixture.settle().await?;
    let replay = dispatcher.handle_tracker_delivery(signed_delivery(&body)?).await;
    fixture.settle().await?;

    assert_eq!(replay.outcome, TrackerOutcome::Processed { stamped: 0 });
    assert_eq!(fixture.title("100").as_deref(), Some("[PROJ-42] Write onboarding guide"));
    assert_eq!(fixture.tracker.invocations(TrackerOperation::UpdateProjectNotes), 1);
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn forged_batch_is_rejected_after_handshake(config: SyncConfig) -> eyre::Result<()> {
    let fixture = start_engine(&config, board())?;
    let dispatcher = fixture.engine.dispatcher();
    dispatcher.handle_tracker_delivery(handshake()).await;
    let mut delivery = signed_delivery(&json!({ "events": [created("100")] }))?;
    delivery.signature = Some("00".repeat(32));

    let reply = dispatcher.handle_tracker_delivery(delivery).await;
    fixture.settle().await?;

    assert_eq!(reply.outcome, TrackerOutcome::Rejected(SignatureCheck::Mismatch));
    assert_eq!(reply.status(), 200);
    assert_eq!(fixture.title("100").as_deref(), Some("Write onboarding guide"));
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn counter_read_failure_is_swallowed(config: SyncConfig) -> eyre::Result<()> {
    let fixture = start_engine(&config, board())?;
    let dispatcher = fixture.engine.dispatcher();
    dispatcher.handle_tracker_delivery(handshake()).await;
    fixture
        .tracker
        .fail_next(TrackerOperation::GetProjectNotes, 1);

    let reply = dispatcher
        .handle_tracker_delivery(signed_delivery(&json!({ "events": [created("100")] }))?)
        .await;

    assert_eq!(reply.outcome, TrackerOutcome::Failed);
    assert_eq!(reply.status(), 200);
    Ok(())
}

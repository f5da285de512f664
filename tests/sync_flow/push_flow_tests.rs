//! Push correlation flows.

#![expect(
    clippy::panic_in_result_fn,
    reason = "Tests assert on outcomes while propagating setup errors with ?"
)]

use rstest::rstest;
use tracksync::{
    config::SyncConfig,
    sync::{
        adapters::memory::{InMemoryTracker, TrackerOperation},
        services::VcsOutcome,
    },
};

use super::helpers::{config, push, start_engine, tracked_task, vcs_delivery};

fn board() -> InMemoryTracker {
    let tracker = InMemoryTracker::new();
    tracker.insert_task(tracked_task("1", "[PROJ-12] Fix login"));
    tracker.insert_task(tracked_task("2", "Unrelated [PROJ-12] mention"));
    tracker
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn push_with_token_updates_exactly_one_task(config: SyncConfig) -> eyre::Result<()> {
    let fixture = start_engine(&config, board())?;
    let body = push(
        "refs/heads/feature/login",
        &[
            ("aaaaaaaa11111111", "[PROJ-12] fix bug"),
            ("bbbbbbbb22222222", "Bump dependencies"),
        ],
    );

    let reply = fixture
        .engine
        .dispatcher()
        .handle_vcs_delivery(vcs_delivery("Push Hook", &body)?)
        .await?;
    fixture.settle().await?;

    assert_eq!(reply.outcome, VcsOutcome::Queued { jobs: 1 });
    assert_eq!(fixture.progress("1").as_deref(), Some("In Progress"));
    let comments = fixture.comments("1");
    assert_eq!(comments.len(), 1);
    assert!(comments.iter().all(|note| note.contains("aaaaaaaa") && !note.contains("bbbbbbbb")));
    assert!(fixture.comments("2").is_empty());
    assert_eq!(fixture.progress("2"), None);
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn repeated_push_does_not_rewrite_progress(config: SyncConfig) -> eyre::Result<()> {
    let fixture = start_engine(&config, board())?;
    let dispatcher = fixture.engine.dispatcher();

    for sha in ["cccccccc33333333", "dddddddd44444444"] {
        let body = push("refs/heads/main", &[(sha, "[PROJ-12] follow-up")]);
        dispatcher
            .handle_vcs_delivery(vcs_delivery("Push Hook", &body)?)
            .await?;
    }
    fixture.settle().await?;

    assert_eq!(fixture.comments("1").len(), 2);
    assert_eq!(fixture.tracker.invocations(TrackerOperation::SetCustomEnum), 1);
    assert_eq!(fixture.tracker.invocations(TrackerOperation::SearchTasks), 1);
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn configured_excluded_branch_is_ignored(mut config: SyncConfig) -> eyre::Result<()> {
    config.excluded_branches = vec!["release".to_owned()];
    let fixture = start_engine(&config, board())?;
    let dispatcher = fixture.engine.dispatcher();

    let excluded = dispatcher
        .handle_vcs_delivery(vcs_delivery(
            "Push Hook",
            &push("refs/heads/release", &[("eeeeeeee55555555", "[PROJ-12] hotfix")]),
        )?)
        .await?;
    let allowed = dispatcher
        .handle_vcs_delivery(vcs_delivery(
            "Push Hook",
            &push("refs/heads/production", &[("ffffffff66666666", "[PROJ-12] hotfix")]),
        )?)
        .await?;
    fixture.settle().await?;

    assert_eq!(excluded.outcome, VcsOutcome::Ignored);
    assert_eq!(allowed.outcome, VcsOutcome::Queued { jobs: 1 });
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn outbound_failures_are_retried(config: SyncConfig) -> eyre::Result<()> {
    let fixture = start_engine(&config, board())?;
    fixture.tracker.fail_next(TrackerOperation::AddComment, 1);

    fixture
        .engine
        .dispatcher()
        .handle_vcs_delivery(vcs_delivery(
            "Push Hook",
            &push("refs/heads/main", &[("1234567890abcdef", "[PROJ-12] retry me")]),
        )?)
        .await?;
    fixture.settle().await?;

    let stats = fixture.engine.outbound().stats();
    assert_eq!(stats.enqueued, 2);
    assert_eq!(stats.retried, 1);
    assert_eq!(stats.succeeded, 2);
    assert_eq!(fixture.comments("1").len(), 1);
    Ok(())
}

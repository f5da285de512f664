//! Merge request lifecycle flows.

#![expect(
    clippy::panic_in_result_fn,
    reason = "Tests assert on outcomes while propagating setup errors with ?"
)]

use rstest::rstest;
use tracksync::{
    config::SyncConfig,
    sync::{
        adapters::memory::InMemoryTracker,
        ports::{CommitDetail, CommitSummary},
        services::VcsOutcome,
    },
};

use super::helpers::{PROJECT_URL, config, merge_request, start_engine, tracked_task, vcs_delivery};

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn merge_request_moves_task_through_testing_to_deploying(
    config: SyncConfig,
) -> eyre::Result<()> {
    let tracker = InMemoryTracker::new();
    tracker.insert_task(tracked_task("1", "[PROJ-12] Fix login"));
    let fixture = start_engine(&config, tracker)?;
    fixture.vcs.insert_merge_request(
        42,
        15,
        vec![CommitSummary {
            id: "aaaaaaaa11111111".to_owned(),
            title: "[PROJ-12] login form".to_owned(),
        }],
    );
    fixture.vcs.insert_commit(
        42,
        CommitDetail {
            id: "9999999988888888".to_owned(),
            title: "Merge branch 'feature/login' into 'main'".to_owned(),
            web_url: format!("{PROJECT_URL}/-/commit/9999999988888888"),
        },
    );
    let dispatcher = fixture.engine.dispatcher();

    let opened = dispatcher
        .handle_vcs_delivery(vcs_delivery(
            "Merge Request Hook",
            &merge_request("open", "opened", None),
        )?)
        .await?;
    fixture.settle().await?;
    assert_eq!(opened.outcome, VcsOutcome::Queued { jobs: 1 });
    assert_eq!(fixture.progress("1").as_deref(), Some("Testing"));

    let merged = dispatcher
        .handle_vcs_delivery(vcs_delivery(
            "Merge Request Hook",
            &merge_request("merge", "merged", Some("9999999988888888")),
        )?)
        .await?;
    fixture.settle().await?;
    assert_eq!(merged.outcome, VcsOutcome::Queued { jobs: 1 });
    assert_eq!(fixture.progress("1").as_deref(), Some("Deploying"));

    let comments = fixture.comments("1");
    assert_eq!(comments.len(), 2);
    let opened_note = comments.first().map(String::as_str).unwrap_or_default();
    let merged_note = comments.get(1).map(String::as_str).unwrap_or_default();
    assert!(opened_note.contains("⚔ Opened"));
    assert!(opened_note.contains(
        r#"<li>Assignee: <a href="https://app.asana.com/0/list-100/list">@Ada Lovelace</a></li>"#
    ));
    assert!(merged_note.contains("🏆 Merged"));
    assert!(merged_note.contains(">99999999</a>: Merge branch 'feature/login' into 'main'"));
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn approval_events_change_nothing(config: SyncConfig) -> eyre::Result<()> {
    let tracker = InMemoryTracker::new();
    tracker.insert_task(tracked_task("1", "[PROJ-12] Fix login"));
    let fixture = start_engine(&config, tracker)?;

    let reply = fixture
        .engine
        .dispatcher()
        .handle_vcs_delivery(vcs_delivery(
            "Merge Request Hook",
            &merge_request("approved", "opened", None),
        )?)
        .await?;
    fixture.settle().await?;

    assert_eq!(reply.outcome, VcsOutcome::NoTransition);
    assert!(fixture.comments("1").is_empty());
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn unknown_merge_request_is_a_server_error(config: SyncConfig) -> eyre::Result<()> {
    let fixture = start_engine(&config, InMemoryTracker::new())?;

    let result = fixture
        .engine
        .dispatcher()
        .handle_vcs_delivery(vcs_delivery(
            "Merge Request Hook",
            &merge_request("close", "closed", None),
        )?)
        .await;

    let err = result.err().ok_or_else(|| eyre::eyre!("expected a processing error"))?;
    assert_eq!(err.status(), 500);
    Ok(())
}

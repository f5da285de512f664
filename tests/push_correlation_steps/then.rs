//! Then steps for push correlation BDD scenarios.

use super::world::PushWorld;
use rstest_bdd_macros::then;
use tracksync::sync::{
    domain::TaskGid,
    services::{VcsOutcome, VcsReply},
};

fn outcome(world: &PushWorld) -> Result<VcsOutcome, eyre::Report> {
    match world.last_reply.as_ref() {
        Some(Ok(VcsReply { outcome, .. })) => Ok(*outcome),
        Some(Err(err)) => Err(eyre::eyre!("push delivery failed: {err}")),
        None => Err(eyre::eyre!("missing push reply")),
    }
}

#[then("the push is queued with {jobs:usize} job")]
fn push_is_queued(world: &PushWorld, jobs: usize) -> Result<(), eyre::Report> {
    let found = outcome(world)?;
    if found != (VcsOutcome::Queued { jobs }) {
        return Err(eyre::eyre!("expected {jobs} queued job(s), found {found:?}"));
    }
    Ok(())
}

#[then("the push reports no identified tasks")]
fn push_reports_no_tokens(world: &PushWorld) -> Result<(), eyre::Report> {
    let found = outcome(world)?;
    if found != VcsOutcome::NoTokens {
        return Err(eyre::eyre!("expected no identified tasks, found {found:?}"));
    }
    Ok(())
}

#[then("the push is ignored")]
fn push_is_ignored(world: &PushWorld) -> Result<(), eyre::Report> {
    let found = outcome(world)?;
    if found != VcsOutcome::Ignored {
        return Err(eyre::eyre!("expected the push to be ignored, found {found:?}"));
    }
    Ok(())
}

#[then("the push is rejected with status {status:u16}")]
fn push_is_rejected(world: &PushWorld, status: u16) -> Result<(), eyre::Report> {
    match world.last_reply.as_ref() {
        Some(Err(err)) if err.status() == status => Ok(()),
        Some(Err(err)) => Err(eyre::eyre!("expected status {status}, found {}", err.status())),
        Some(Ok(reply)) => Err(eyre::eyre!("expected a rejection, found {reply:?}")),
        None => Err(eyre::eyre!("missing push reply")),
    }
}

#[then(r#"task "{gid}" has progress "{label}""#)]
fn task_has_progress(world: &PushWorld, gid: String, label: String) -> Result<(), eyre::Report> {
    let current = world
        .tracker
        .task(&TaskGid::new(gid.as_str()))
        .ok_or_else(|| eyre::eyre!("unknown task {gid}"))?
        .custom_field("Progress")
        .and_then(|field| field.current.clone());
    if current.as_deref() != Some(label.as_str()) {
        return Err(eyre::eyre!("expected progress {label}, found {current:?}"));
    }
    Ok(())
}

#[then(r#"task "{gid}" has {count:usize} comment mentioning "{text}""#)]
fn task_has_comment_mentioning(
    world: &PushWorld,
    gid: String,
    count: usize,
    text: String,
) -> Result<(), eyre::Report> {
    let comments = world.comments(&gid);
    if comments.len() != count || !comments.iter().all(|note| note.contains(&text)) {
        return Err(eyre::eyre!("expected {count} comment(s) mentioning {text}, found {comments:?}"));
    }
    Ok(())
}

#[then(r#"task "{gid}" has {count:usize} comments"#)]
fn task_has_comments(world: &PushWorld, gid: String, count: usize) -> Result<(), eyre::Report> {
    let found = world.comments(&gid).len();
    if found != count {
        return Err(eyre::eyre!("expected {count} comment(s), found {found}"));
    }
    Ok(())
}

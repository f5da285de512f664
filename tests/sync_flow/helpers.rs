//! Shared helpers for the sync flow integration tests.

use std::sync::Arc;

use mockable::DefaultClock;
use rstest::fixture;
use serde_json::{Value, json};
use tracksync::{
    config::SyncConfig,
    sync::{
        adapters::memory::{InMemoryTracker, InMemoryVcs, InMemoryWebhookStore, StaticUserDirectory},
        domain::{TaskGid, UserRecord, sign},
        ports::{CustomEnumField, EnumOption, TrackerTask},
        services::{SyncAdapters, SyncEngine, TrackerDelivery, VcsDelivery},
    },
};

/// Tracker webhook secret agreed during the handshake.
pub const SECRET: &str = "hook-secret";
/// Static VCS hook token.
pub const VCS_TOKEN: &str = "vcs-token";
/// Web URL of the VCS project used in payloads.
pub const PROJECT_URL: &str = "https://git.example.com/acme/api";

/// Engine type wired to in-memory adapters.
pub type TestEngine =
    SyncEngine<InMemoryTracker, InMemoryVcs, InMemoryWebhookStore, StaticUserDirectory>;

/// A running engine and handles on its adapters.
pub struct EngineFixture {
    pub tracker: Arc<InMemoryTracker>,
    pub vcs: Arc<InMemoryVcs>,
    pub store: Arc<InMemoryWebhookStore>,
    pub engine: TestEngine,
}

impl EngineFixture {
    /// Waits for every queued outbound job to finish.
    pub async fn settle(&self) -> eyre::Result<()> {
        self.engine.outbound().flush().await?;
        Ok(())
    }

    /// Returns the title of a task.
    pub fn title(&self, gid: &str) -> Option<String> {
        self.tracker.task(&TaskGid::new(gid)).map(|task| task.name)
    }

    /// Returns the selected progress label of a task.
    pub fn progress(&self, gid: &str) -> Option<String> {
        self.tracker.task(&TaskGid::new(gid)).and_then(|task| {
            task.custom_field("Progress")
                .and_then(|field| field.current.clone())
        })
    }

    /// Returns the comments appended to a task.
    pub fn comments(&self, gid: &str) -> Vec<String> {
        self.tracker.comments_for(&TaskGid::new(gid))
    }
}

/// Provides the engine configuration used by the flows.
#[fixture]
pub fn config() -> SyncConfig {
    SyncConfig {
        project_prefix: "PROJ".to_owned(),
        workspace_id: "ws-1".to_owned(),
        project_id: "project-1".to_owned(),
        vcs_webhook_secret: VCS_TOKEN.to_owned(),
        base_url: "https://sync.example.com/".to_owned(),
        retry_backoff_ms: 0,
        ..SyncConfig::default()
    }
}

/// Builds a task carrying the progress field.
pub fn tracked_task(gid: &str, name: &str) -> TrackerTask {
    TrackerTask::new(TaskGid::new(gid), name).with_custom_field(CustomEnumField::new(
        "progress",
        "Progress",
        vec![
            EnumOption::new("p-1", "In Progress"),
            EnumOption::new("p-2", "Testing"),
            EnumOption::new("p-3", "Deploying"),
        ],
    ))
}

/// Starts an engine on the current runtime.
///
/// # Errors
///
/// Returns an error when the engine rejects the configuration.
pub fn start_engine(config: &SyncConfig, board: InMemoryTracker) -> eyre::Result<EngineFixture> {
    let tracker = Arc::new(board);
    let vcs = Arc::new(InMemoryVcs::new());
    let store = Arc::new(InMemoryWebhookStore::new());
    let users = Arc::new(StaticUserDirectory::from_records([UserRecord {
        email: "ada@example.com".to_owned(),
        name: "Ada Lovelace".to_owned(),
        tracker_id: "a-100".to_owned(),
        vcs_id: 7,
        task_list_id: "list-100".to_owned(),
    }]));
    let engine = SyncEngine::start(
        config,
        SyncAdapters {
            tracker: Arc::clone(&tracker),
            vcs: Arc::clone(&vcs),
            store: Arc::clone(&store),
            users,
        },
        Arc::new(DefaultClock),
    )?;
    Ok(EngineFixture {
        tracker,
        vcs,
        store,
        engine,
    })
}

/// Builds a signed tracker delivery.
///
/// # Errors
///
/// Returns an error when the body cannot be serialised or signed.
pub fn signed_delivery(body: &Value) -> eyre::Result<TrackerDelivery> {
    let raw = serde_json::to_vec(body)?;
    Ok(TrackerDelivery {
        hook_secret: None,
        signature: Some(sign(&raw, SECRET)?),
        body: raw,
    })
}

/// Builds the handshake delivery carrying [`SECRET`].
pub fn handshake() -> TrackerDelivery {
    TrackerDelivery {
        hook_secret: Some(SECRET.to_owned()),
        ..TrackerDelivery::default()
    }
}

/// Builds a task-creation sub-event.
pub fn created(gid: &str) -> Value {
    json!({
        "action": "added",
        "resource": { "gid": gid, "resource_type": "task" },
        "parent": { "gid": "project-1", "resource_type": "project" }
    })
}

/// Builds an authenticated VCS delivery.
///
/// # Errors
///
/// Returns an error when the body cannot be serialised.
pub fn vcs_delivery(event_type: &str, body: &Value) -> eyre::Result<VcsDelivery> {
    Ok(VcsDelivery {
        token: Some(VCS_TOKEN.to_owned()),
        event_type: Some(event_type.to_owned()),
        body: serde_json::to_vec(body)?,
    })
}

/// Builds a push hook payload.
pub fn push(git_ref: &str, commits: &[(&str, &str)]) -> Value {
    let entries: Vec<Value> = commits
        .iter()
        .map(|(sha, message)| {
            json!({
                "id": sha,
                "message": message,
                "title": message,
                "url": format!("{PROJECT_URL}/-/commit/{sha}"),
                "author": { "name": "ada" }
            })
        })
        .collect();
    json!({
        "ref": git_ref,
        "user_id": 7,
        "user_name": "ada",
        "project": { "id": 42, "name": "api", "web_url": PROJECT_URL },
        "total_commits_count": entries.len(),
        "commits": entries
    })
}

/// Builds a merge request hook payload.
pub fn merge_request(action: &str, state: &str, merge_commit_sha: Option<&str>) -> Value {
    json!({
        "user": { "name": "Ada L.", "username": "ada" },
        "project": { "id": 42, "name": "api", "web_url": PROJECT_URL },
        "object_attributes": {
            "author_id": 7,
            "iid": 15,
            "merge_commit_sha": merge_commit_sha,
            "source_branch": "feature/login",
            "target_branch": "main",
            "description": "",
            "title": "Login form",
            "url": format!("{PROJECT_URL}/-/merge_requests/15"),
            "state": state,
            "action": action,
            "work_in_progress": false,
            "assignee_ids": [7]
        },
        "assignees": [{ "name": "Ada L.", "username": "ada" }],
        "changes": {}
    })
}

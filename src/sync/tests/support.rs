//! Payload and adapter builders shared by the sync unit tests.

use serde_json::{Value, json};

use crate::sync::{
    adapters::memory::StaticUserDirectory,
    domain::{MergeRequestEvent, PushEvent, TaskGid, UserRecord},
    ports::{CustomEnumField, EnumOption, TrackerTask},
};

pub const PROJECT_URL: &str = "https://git.example.com/acme/api";

pub fn progress_field(current: Option<&str>) -> CustomEnumField {
    let field = CustomEnumField::new(
        "field-progress",
        "Progress",
        vec![
            EnumOption::new("opt-in-progress", "In Progress"),
            EnumOption::new("opt-testing", "Testing"),
            EnumOption::new("opt-deploying", "Deploying"),
        ],
    );
    match current {
        Some(label) => field.with_current(label),
        None => field,
    }
}

pub fn task(gid: &str, name: &str) -> TrackerTask {
    TrackerTask::new(TaskGid::new(gid), name).with_custom_field(progress_field(None))
}

pub fn users() -> StaticUserDirectory {
    StaticUserDirectory::from_records([
        UserRecord {
            email: "ada@example.com".to_owned(),
            name: "Ada Lovelace".to_owned(),
            tracker_id: "a-100".to_owned(),
            vcs_id: 7,
            task_list_id: "list-100".to_owned(),
        },
        UserRecord {
            email: "alan@example.com".to_owned(),
            name: "Alan Turing".to_owned(),
            tracker_id: "a-200".to_owned(),
            vcs_id: 8,
            task_list_id: "list-200".to_owned(),
        },
    ])
}

pub fn commit_json(sha: &str, message: &str, author: &str) -> Value {
    json!({
        "id": sha,
        "message": format!("{message}\n"),
        "title": message,
        "url": format!("{PROJECT_URL}/-/commit/{sha}"),
        "author": { "name": author, "email": "dev@example.com" }
    })
}

pub fn push_json(git_ref: &str, commits: Vec<Value>) -> Value {
    let total = commits.len();
    json!({
        "object_kind": "push",
        "ref": git_ref,
        "user_id": 7,
        "user_name": "ada",
        "project": { "id": 42, "name": "api", "web_url": PROJECT_URL },
        "commits": commits,
        "total_commits_count": total
    })
}

pub fn push_event(git_ref: &str, commits: Vec<Value>) -> PushEvent {
    serde_json::from_value(push_json(git_ref, commits)).expect("valid push payload")
}

pub fn merge_request_json(action: &str, state: &str, wip: bool, assignee_ids: Option<Vec<u64>>) -> Value {
    let mut attributes = json!({
        "author_id": 7,
        "iid": 15,
        "merge_commit_sha": null,
        "source_branch": "feature/login",
        "target_branch": "main",
        "description": "Adds login",
        "title": "Login form",
        "url": format!("{PROJECT_URL}/-/merge_requests/15"),
        "state": state,
        "action": action,
        "work_in_progress": wip
    });
    if let (Some(ids), Some(map)) = (assignee_ids, attributes.as_object_mut()) {
        map.insert("assignee_ids".to_owned(), json!(ids));
    }
    json!({
        "object_kind": "merge_request",
        "user": { "name": "Ada L.", "username": "ada" },
        "project": { "id": 42, "name": "api", "web_url": PROJECT_URL },
        "object_attributes": attributes,
        "assignees": [
            { "name": "Alan T.", "username": "alan" },
            { "name": "Grace H.", "username": "grace" }
        ],
        "changes": {}
    })
}

pub fn merge_request_event(
    action: &str,
    state: &str,
    wip: bool,
    assignee_ids: Option<Vec<u64>>,
) -> MergeRequestEvent {
    serde_json::from_value(merge_request_json(action, state, wip, assignee_ids))
        .expect("valid merge request payload")
}

//! In-memory tracker for sync service tests.

use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::sync::{
    domain::{TaskGid, WebhookId},
    ports::{
        TaskSummary, TrackerClient, TrackerError, TrackerResult, TrackerTask, WebhookFilter,
        WebhookInfo,
    },
};

/// Outbound tracker operation, used for call recording and fault injection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TrackerOperation {
    /// [`TrackerClient::get_task`].
    GetTask,
    /// [`TrackerClient::search_tasks`].
    SearchTasks,
    /// [`TrackerClient::rename_task`].
    RenameTask,
    /// [`TrackerClient::set_custom_enum`].
    SetCustomEnum,
    /// [`TrackerClient::add_comment`].
    AddComment,
    /// [`TrackerClient::get_project_notes`].
    GetProjectNotes,
    /// [`TrackerClient::update_project_notes`].
    UpdateProjectNotes,
    /// [`TrackerClient::list_webhooks`].
    ListWebhooks,
    /// [`TrackerClient::create_webhook`].
    CreateWebhook,
    /// [`TrackerClient::delete_webhook`].
    DeleteWebhook,
}

/// Mutation recorded by the in-memory tracker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrackerCall {
    /// A task title was replaced.
    Rename {
        /// Renamed task.
        gid: TaskGid,
        /// New title.
        name: String,
    },
    /// An enum custom field option was selected.
    SetCustomEnum {
        /// Updated task.
        gid: TaskGid,
        /// Field identifier.
        field_gid: String,
        /// Option identifier.
        option_gid: String,
    },
    /// A comment was appended.
    Comment {
        /// Commented task.
        gid: TaskGid,
        /// Comment markup.
        html: String,
    },
    /// The project notes were replaced.
    ProjectNotes(String),
}

/// Thread-safe in-memory tracker.
///
/// Search matches titles containing the query as a substring, which
/// reproduces the false positives of a real full-text search.
#[derive(Debug, Clone, Default)]
pub struct InMemoryTracker {
    state: Arc<RwLock<InMemoryTrackerState>>,
}

#[derive(Debug, Default)]
struct InMemoryTrackerState {
    tasks: BTreeMap<TaskGid, TrackerTask>,
    project_notes: String,
    webhooks: Vec<WebhookInfo>,
    next_webhook: u64,
    calls: Vec<TrackerCall>,
    invocations: HashMap<TrackerOperation, usize>,
    failures: HashMap<TrackerOperation, usize>,
}

impl InMemoryTracker {
    /// Creates an empty tracker.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a tracker whose project notes hold `notes`.
    #[must_use]
    pub fn with_project_notes(notes: impl Into<String>) -> Self {
        let tracker = Self::new();
        tracker.write().project_notes = notes.into();
        tracker
    }

    /// Adds or replaces a task.
    pub fn insert_task(&self, task: TrackerTask) {
        self.write().tasks.insert(task.gid.clone(), task);
    }

    /// Returns the current state of a task.
    #[must_use]
    pub fn task(&self, gid: &TaskGid) -> Option<TrackerTask> {
        self.read().tasks.get(gid).cloned()
    }

    /// Returns the current project notes.
    #[must_use]
    pub fn project_notes(&self) -> String {
        self.read().project_notes.clone()
    }

    /// Returns recorded mutations in call order.
    #[must_use]
    pub fn calls(&self) -> Vec<TrackerCall> {
        self.read().calls.clone()
    }

    /// Returns the comments appended to a task, oldest first.
    #[must_use]
    pub fn comments_for(&self, gid: &TaskGid) -> Vec<String> {
        self.read()
            .calls
            .iter()
            .filter_map(|call| match call {
                TrackerCall::Comment { gid: target, html } if target == gid => Some(html.clone()),
                _ => None,
            })
            .collect()
    }

    /// Returns how many times an operation was invoked, failures included.
    #[must_use]
    pub fn invocations(&self, operation: TrackerOperation) -> usize {
        self.read()
            .invocations
            .get(&operation)
            .copied()
            .unwrap_or_default()
    }

    /// Makes the next `times` invocations of `operation` fail.
    pub fn fail_next(&self, operation: TrackerOperation, times: usize) {
        self.write().failures.insert(operation, times);
    }

    /// Registers an existing webhook.
    pub fn insert_webhook(&self, webhook: WebhookInfo) {
        self.write().webhooks.push(webhook);
    }

    fn read(&self) -> RwLockReadGuard<'_, InMemoryTrackerState> {
        self.state
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, InMemoryTrackerState> {
        self.state
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    /// Counts the invocation and consumes one injected failure, if any.
    fn enter(
        &self,
        operation: TrackerOperation,
    ) -> TrackerResult<RwLockWriteGuard<'_, InMemoryTrackerState>> {
        let mut state = self.write();
        *state.invocations.entry(operation).or_default() += 1;
        let remaining = state.failures.entry(operation).or_default();
        if *remaining > 0 {
            *remaining -= 1;
            return Err(TrackerError::Api(format!("injected {operation:?} failure")));
        }
        Ok(state)
    }
}

fn missing_task(gid: &TaskGid) -> TrackerError {
    TrackerError::NotFound(format!("task {gid}"))
}

#[async_trait]
impl TrackerClient for InMemoryTracker {
    async fn get_task(&self, gid: &TaskGid) -> TrackerResult<TrackerTask> {
        let state = self.enter(TrackerOperation::GetTask)?;
        state.tasks.get(gid).cloned().ok_or_else(|| missing_task(gid))
    }

    async fn search_tasks(&self, text: &str) -> TrackerResult<Vec<TaskSummary>> {
        let state = self.enter(TrackerOperation::SearchTasks)?;
        let needle = text.to_lowercase();
        Ok(state
            .tasks
            .values()
            .filter(|task| task.name.to_lowercase().contains(&needle))
            .map(|task| TaskSummary {
                gid: task.gid.clone(),
                name: task.name.clone(),
            })
            .collect())
    }

    async fn rename_task(&self, gid: &TaskGid, name: &str) -> TrackerResult<()> {
        let mut state = self.enter(TrackerOperation::RenameTask)?;
        let task = state.tasks.get_mut(gid).ok_or_else(|| missing_task(gid))?;
        name.clone_into(&mut task.name);
        state.calls.push(TrackerCall::Rename {
            gid: gid.clone(),
            name: name.to_owned(),
        });
        Ok(())
    }

    async fn set_custom_enum(
        &self,
        gid: &TaskGid,
        field_gid: &str,
        option_gid: &str,
    ) -> TrackerResult<()> {
        let mut state = self.enter(TrackerOperation::SetCustomEnum)?;
        let task = state.tasks.get_mut(gid).ok_or_else(|| missing_task(gid))?;
        let field = task
            .custom_fields
            .iter_mut()
            .find(|field| field.gid == field_gid)
            .ok_or_else(|| TrackerError::NotFound(format!("custom field {field_gid}")))?;
        let label = field
            .options
            .iter()
            .find(|option| option.gid == option_gid)
            .map(|option| option.name.clone())
            .ok_or_else(|| TrackerError::NotFound(format!("enum option {option_gid}")))?;
        field.current = Some(label);
        state.calls.push(TrackerCall::SetCustomEnum {
            gid: gid.clone(),
            field_gid: field_gid.to_owned(),
            option_gid: option_gid.to_owned(),
        });
        Ok(())
    }

    async fn add_comment(&self, gid: &TaskGid, html: &str) -> TrackerResult<()> {
        let mut state = self.enter(TrackerOperation::AddComment)?;
        if !state.tasks.contains_key(gid) {
            return Err(missing_task(gid));
        }
        state.calls.push(TrackerCall::Comment {
            gid: gid.clone(),
            html: html.to_owned(),
        });
        Ok(())
    }

    async fn get_project_notes(&self) -> TrackerResult<String> {
        let state = self.enter(TrackerOperation::GetProjectNotes)?;
        Ok(state.project_notes.clone())
    }

    async fn update_project_notes(&self, notes: &str) -> TrackerResult<()> {
        let mut state = self.enter(TrackerOperation::UpdateProjectNotes)?;
        notes.clone_into(&mut state.project_notes);
        state.calls.push(TrackerCall::ProjectNotes(notes.to_owned()));
        Ok(())
    }

    async fn list_webhooks(&self) -> TrackerResult<Vec<WebhookInfo>> {
        let state = self.enter(TrackerOperation::ListWebhooks)?;
        Ok(state.webhooks.clone())
    }

    async fn create_webhook(
        &self,
        target: &str,
        filters: &[WebhookFilter],
    ) -> TrackerResult<WebhookId> {
        let mut state = self.enter(TrackerOperation::CreateWebhook)?;
        if filters.is_empty() {
            return Err(TrackerError::Api("webhook filters must not be empty".to_owned()));
        }
        state.next_webhook += 1;
        let id = WebhookId::new(format!("hook-{}", state.next_webhook));
        state.webhooks.push(WebhookInfo {
            id: id.clone(),
            active: true,
            resource_name: "project".to_owned(),
            target: target.to_owned(),
        });
        Ok(id)
    }

    async fn delete_webhook(&self, id: &WebhookId) -> TrackerResult<()> {
        let mut state = self.enter(TrackerOperation::DeleteWebhook)?;
        let before = state.webhooks.len();
        state.webhooks.retain(|webhook| &webhook.id != id);
        if state.webhooks.len() == before {
            return Err(TrackerError::NotFound(format!("webhook {id}")));
        }
        Ok(())
    }
}

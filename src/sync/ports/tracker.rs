//! Task tracker client port.
//!
//! Implementations are scoped to the configured workspace and project:
//! searches only cover that project and the project notes are that project's
//! free-text field.

use crate::sync::domain::{TaskGid, WebhookId};
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

/// Result type for tracker client operations.
pub type TrackerResult<T> = Result<T, TrackerError>;

/// Option of an enum custom field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumOption {
    /// Option identifier.
    pub gid: String,
    /// Option label.
    pub name: String,
}

impl EnumOption {
    /// Creates an enum option.
    #[must_use]
    pub fn new(gid: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            gid: gid.into(),
            name: name.into(),
        }
    }
}

/// Enum custom field attached to a task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CustomEnumField {
    /// Field identifier.
    pub gid: String,
    /// Field name.
    pub name: String,
    /// Label of the selected option, if any.
    pub current: Option<String>,
    /// Available options.
    pub options: Vec<EnumOption>,
}

impl CustomEnumField {
    /// Creates a field with no selected option.
    #[must_use]
    pub fn new(
        gid: impl Into<String>,
        name: impl Into<String>,
        options: impl IntoIterator<Item = EnumOption>,
    ) -> Self {
        Self {
            gid: gid.into(),
            name: name.into(),
            current: None,
            options: options.into_iter().collect(),
        }
    }

    /// Sets the selected option label.
    #[must_use]
    pub fn with_current(mut self, label: impl Into<String>) -> Self {
        self.current = Some(label.into());
        self
    }

    /// Finds an option by label.
    #[must_use]
    pub fn option(&self, label: &str) -> Option<&EnumOption> {
        self.options.iter().find(|option| option.name == label)
    }
}

/// Task as returned by the tracker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackerTask {
    /// Task identifier.
    pub gid: TaskGid,
    /// Task title.
    pub name: String,
    /// Enum custom fields of the task.
    pub custom_fields: Vec<CustomEnumField>,
}

impl TrackerTask {
    /// Creates a task with no custom fields.
    #[must_use]
    pub fn new(gid: TaskGid, name: impl Into<String>) -> Self {
        Self {
            gid,
            name: name.into(),
            custom_fields: Vec::new(),
        }
    }

    /// Adds a custom field.
    #[must_use]
    pub fn with_custom_field(mut self, field: CustomEnumField) -> Self {
        self.custom_fields.push(field);
        self
    }

    /// Finds a custom field by name.
    #[must_use]
    pub fn custom_field(&self, name: &str) -> Option<&CustomEnumField> {
        self.custom_fields.iter().find(|field| field.name == name)
    }
}

/// Search hit returned by a full-text task search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskSummary {
    /// Task identifier.
    pub gid: TaskGid,
    /// Task title.
    pub name: String,
}

/// Event filter of a webhook registration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebhookFilter {
    /// Event action, for example `added`.
    pub action: String,
    /// Resource type, for example `task`.
    pub resource_type: String,
}

/// Webhook registration as listed by the tracker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebhookInfo {
    /// Registration identifier.
    pub id: WebhookId,
    /// Whether the tracker still delivers to the hook.
    pub active: bool,
    /// Name of the watched resource.
    pub resource_name: String,
    /// Delivery target URL.
    pub target: String,
}

/// Tracker operations used by the sync services.
#[async_trait]
pub trait TrackerClient: Send + Sync {
    /// Fetches a task with its custom fields.
    ///
    /// # Errors
    ///
    /// Returns [`TrackerError::NotFound`] when the task does not exist.
    async fn get_task(&self, gid: &TaskGid) -> TrackerResult<TrackerTask>;

    /// Runs a full-text task search scoped to the configured project.
    ///
    /// Results may include false positives from substring matches.
    async fn search_tasks(&self, text: &str) -> TrackerResult<Vec<TaskSummary>>;

    /// Replaces the task title.
    async fn rename_task(&self, gid: &TaskGid, name: &str) -> TrackerResult<()>;

    /// Selects an option on an enum custom field of the task.
    async fn set_custom_enum(
        &self,
        gid: &TaskGid,
        field_gid: &str,
        option_gid: &str,
    ) -> TrackerResult<()>;

    /// Appends an HTML comment to the task.
    async fn add_comment(&self, gid: &TaskGid, html: &str) -> TrackerResult<()>;

    /// Reads the project notes field.
    async fn get_project_notes(&self) -> TrackerResult<String>;

    /// Replaces the project notes field.
    async fn update_project_notes(&self, notes: &str) -> TrackerResult<()>;

    /// Lists webhook registrations on the project.
    async fn list_webhooks(&self) -> TrackerResult<Vec<WebhookInfo>>;

    /// Registers a webhook on the project.
    async fn create_webhook(
        &self,
        target: &str,
        filters: &[WebhookFilter],
    ) -> TrackerResult<WebhookId>;

    /// Deletes a webhook registration.
    async fn delete_webhook(&self, id: &WebhookId) -> TrackerResult<()>;
}

/// Errors returned by tracker client implementations.
#[derive(Debug, Clone, Error)]
pub enum TrackerError {
    /// The task, project, or webhook does not exist.
    #[error("tracker resource not found: {0}")]
    NotFound(String),

    /// The platform rejected the request.
    #[error("tracker api error: {0}")]
    Api(String),

    /// Transport-layer failure.
    #[error("tracker transport error: {0}")]
    Transport(Arc<dyn std::error::Error + Send + Sync>),
}

impl TrackerError {
    /// Wraps a transport error.
    pub fn transport(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Transport(Arc::new(err))
    }
}

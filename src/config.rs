//! Process configuration.
//!
//! Values are layered: built-in defaults, then an optional JSON or TOML
//! file, then `TRACKSYNC_*` environment variables.

use camino::Utf8Path;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashMap;
use std::time::Duration;
use thiserror::Error;

use crate::sync::{
    domain::TaskToken,
    services::{DEFAULT_EXCLUDED_BRANCHES, DEFAULT_MENTION_URL_TEMPLATE, OutboundSettings},
};

/// Prefix of the environment variables read by [`SyncConfig::load`].
pub const ENV_PREFIX: &str = "TRACKSYNC";

/// Errors raised while loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A source could not be read or deserialised.
    #[error("failed to load configuration: {0}")]
    Load(#[from] ::config::ConfigError),
    /// A required value is empty.
    #[error("configuration value `{0}` must not be empty")]
    Missing(&'static str),
    /// The project prefix does not fit the token grammar.
    #[error("invalid project prefix `{0}`")]
    InvalidPrefix(String),
    /// A count that must be positive is zero.
    #[error("configuration value `{0}` must be greater than zero")]
    Zero(&'static str),
}

/// Sync engine configuration.
///
/// Unset values fall back to [`SyncConfig::default`]; required values
/// default to empty and are rejected by [`SyncConfig::validate`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Prefix of minted identifiers, as in `[PROJ-12]`.
    pub project_prefix: String,
    /// Tracker workspace id.
    pub workspace_id: String,
    /// Tracker project id holding the tasks and the counter.
    pub project_id: String,
    /// Name of the enum custom field holding progress.
    pub progress_field_name: String,
    /// Static token expected on VCS deliveries.
    pub vcs_webhook_secret: String,
    /// Branches whose pushes are ignored. Accepts a list or a
    /// comma-separated string.
    #[serde(deserialize_with = "branch_list")]
    pub excluded_branches: Vec<String>,
    /// Public base URL of this service.
    pub base_url: String,
    /// Mention link target with a `{task_list}` placeholder.
    pub mention_url_template: String,
    /// Outbound queue capacity.
    pub queue_capacity: usize,
    /// Attempts per outbound job.
    pub max_attempts: u32,
    /// Delay between outbound attempts, in milliseconds.
    pub retry_backoff_ms: u64,
    /// JSON file holding the webhook registration.
    pub webhook_store_path: String,
    /// JSON file holding the user identity map.
    pub user_map_path: String,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum BranchList {
    Many(Vec<String>),
    Joined(String),
}

/// Reads a branch list from either a sequence or a comma-separated string.
///
/// Environment values stay strings so secrets and prefixes such as `007`
/// keep their exact text.
fn branch_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let branches = match BranchList::deserialize(deserializer)? {
        BranchList::Many(items) => items,
        BranchList::Joined(joined) => joined.split(',').map(str::to_owned).collect(),
    };
    Ok(branches
        .into_iter()
        .map(|branch| branch.trim().to_owned())
        .filter(|branch| !branch.is_empty())
        .collect())
}

impl Default for SyncConfig {
    fn default() -> Self {
        let outbound = OutboundSettings::default();
        Self {
            project_prefix: String::new(),
            workspace_id: String::new(),
            project_id: String::new(),
            progress_field_name: "Progress".to_owned(),
            vcs_webhook_secret: String::new(),
            excluded_branches: DEFAULT_EXCLUDED_BRANCHES
                .iter()
                .map(|&branch| branch.to_owned())
                .collect(),
            base_url: String::new(),
            mention_url_template: DEFAULT_MENTION_URL_TEMPLATE.to_owned(),
            queue_capacity: outbound.capacity,
            max_attempts: outbound.max_attempts,
            retry_backoff_ms: u64::try_from(outbound.retry_backoff.as_millis()).unwrap_or(u64::MAX),
            webhook_store_path: "webhook.json".to_owned(),
            user_map_path: "users.json".to_owned(),
        }
    }
}

impl SyncConfig {
    /// Loads configuration from `file` (when given) and the process
    /// environment, then validates it.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when a source is unreadable or a value is
    /// invalid.
    pub fn load(file: Option<&Utf8Path>) -> Result<Self, ConfigError> {
        Self::from_sources(file, None)
    }

    /// Loads configuration reading environment variables from `env` instead
    /// of the process environment when given.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when a source is unreadable or a value is
    /// invalid.
    #[expect(
        clippy::implicit_hasher,
        reason = "the config crate takes its environment override as a std HashMap"
    )]
    pub fn from_sources(
        file: Option<&Utf8Path>,
        env: Option<HashMap<String, String>>,
    ) -> Result<Self, ConfigError> {
        let mut builder = ::config::Config::builder();
        if let Some(path) = file {
            builder = builder.add_source(::config::File::from(path.as_std_path()));
        }
        let loaded: Self = builder
            .add_source(
                ::config::Environment::with_prefix(ENV_PREFIX)
                    .source(env),
            )
            .build()?
            .try_deserialize()?;
        loaded.validate()?;
        Ok(loaded)
    }

    /// Checks required values and limits.
    ///
    /// # Errors
    ///
    /// Returns the first [`ConfigError`] found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let required = [
            ("project_prefix", &self.project_prefix),
            ("project_id", &self.project_id),
            ("vcs_webhook_secret", &self.vcs_webhook_secret),
            ("base_url", &self.base_url),
            ("progress_field_name", &self.progress_field_name),
        ];
        if let Some((name, _)) = required.iter().find(|(_, value)| value.trim().is_empty()) {
            return Err(ConfigError::Missing(*name));
        }
        if TaskToken::allocate(&self.project_prefix, 0).is_err() {
            return Err(ConfigError::InvalidPrefix(self.project_prefix.clone()));
        }
        if self.queue_capacity == 0 {
            return Err(ConfigError::Zero("queue_capacity"));
        }
        if self.max_attempts == 0 {
            return Err(ConfigError::Zero("max_attempts"));
        }
        Ok(())
    }

    /// Returns the outbound queue settings.
    #[must_use]
    pub const fn outbound_settings(&self) -> OutboundSettings {
        OutboundSettings {
            capacity: self.queue_capacity,
            max_attempts: self.max_attempts,
            retry_backoff: Duration::from_millis(self.retry_backoff_ms),
        }
    }

    /// Returns the webhook store path.
    #[must_use]
    pub fn webhook_store_path(&self) -> &Utf8Path {
        Utf8Path::new(&self.webhook_store_path)
    }

    /// Returns the user map path.
    #[must_use]
    pub fn user_map_path(&self) -> &Utf8Path {
        Utf8Path::new(&self.user_map_path)
    }
}

//! Composition of the HTML comments posted to tracker tasks.
//!
//! The tracker renders the comment markup as is, so the output is fixed byte
//! for byte: glyphs, link wrapping, and tag nesting are part of the
//! contract.

use minijinja::{Environment, context};
use std::sync::Arc;
use thiserror::Error;

use crate::sync::{
    domain::{MergeRequestAction, MergeRequestEvent, MergeRequestHeadline, PushCommit, PushEvent},
    ports::{CommitDetail, UserDirectory},
};

const LINK: &str = r#"<a href="{{ url }}">{{ text }}</a>"#;
const PUSH_HEADER: &str = "<body><strong>GitLab Push ⚙</strong> by <em>{{ user }}</em>: ➡️ {{ project }} branch {{ branch }}";
const MERGE_REQUEST_HEADER: &str = "<body><strong>GitLab MR {{ reference }} {{ glyph }} {{ headline }}</strong> by <em>{{ user }}</em>: {{ project }} ({{ source }} ➡️ {{ target }})";
const COMMIT_ITEM: &str =
    "<li>Commit {{ commit }}{% if author %} by <em>{{ author }}</em>{% endif %}: {{ title }}</li>";

/// Default mention link target; `{task_list}` is replaced by the tracker
/// task-list id of the mentioned user.
pub const DEFAULT_MENTION_URL_TEMPLATE: &str = "https://app.asana.com/0/{task_list}/list";

/// Number of SHA characters shown in commit links.
const SHORT_SHA_LEN: usize = 8;

/// Errors returned while rendering notes.
#[derive(Debug, Error)]
#[error("failed to render note template: {0}")]
pub struct NoteError(#[from] minijinja::Error);

/// Builds task comments from VCS event payloads.
pub struct NoteComposer<U>
where
    U: UserDirectory,
{
    users: Arc<U>,
    mention_url_template: String,
    templates: Environment<'static>,
}

impl<U> NoteComposer<U>
where
    U: UserDirectory,
{
    /// Creates a composer resolving mentions through `users`.
    ///
    /// # Errors
    ///
    /// Returns [`NoteError`] when a built-in template fails to compile.
    pub fn new(users: Arc<U>, mention_url_template: impl Into<String>) -> Result<Self, NoteError> {
        let mut templates = Environment::new();
        templates.add_template("link", LINK)?;
        templates.add_template("push_header", PUSH_HEADER)?;
        templates.add_template("merge_request_header", MERGE_REQUEST_HEADER)?;
        templates.add_template("commit_item", COMMIT_ITEM)?;
        Ok(Self {
            users,
            mention_url_template: mention_url_template.into(),
            templates,
        })
    }

    /// Renders a push note listing `commits`, the commits of one token.
    ///
    /// # Errors
    ///
    /// Returns [`NoteError`] when rendering fails.
    pub fn push_note(&self, push: &PushEvent, commits: &[&PushCommit]) -> Result<String, NoteError> {
        let user = self
            .users
            .by_vcs_id(push.user_id)
            .map_or(push.user_name.as_str(), |mapped| mapped.name.as_str());
        let mut note = self.render(
            "push_header",
            context! {
                user => user,
                project => self.link(&push.project.name, &push.project.web_url)?,
                branch => self.link(push.branch(), &push.branch_url())?,
            },
        )?;

        if commits.is_empty() {
            note.push_str("</body>");
            return Ok(note);
        }
        note.push_str("<ul>");
        for commit in commits {
            let author = (commit.author.name != push.user_name).then_some(commit.author.name.as_str());
            note.push_str(&self.render(
                "commit_item",
                context! {
                    commit => self.link(short_sha(&commit.id), &commit.url)?,
                    author => author,
                    title => commit.subject(),
                },
            )?);
        }
        note.push_str("</ul></body>");
        Ok(note)
    }

    /// Renders a merge request note.
    ///
    /// `merge_commit` is listed for merge actions only.
    ///
    /// # Errors
    ///
    /// Returns [`NoteError`] when rendering fails.
    pub fn merge_request_note(
        &self,
        event: &MergeRequestEvent,
        headline: MergeRequestHeadline,
        merge_commit: Option<&CommitDetail>,
    ) -> Result<String, NoteError> {
        let attributes = &event.object_attributes;
        let user = self
            .users
            .by_vcs_id(attributes.author_id)
            .map_or(event.user.name.as_str(), |mapped| mapped.name.as_str());
        let mut note = self.render(
            "merge_request_header",
            context! {
                reference => self.link(&format!("!{}", attributes.iid), &attributes.url)?,
                glyph => headline.glyph(),
                headline => headline.label(),
                user => user,
                project => self.link(&event.project.name, &event.project.web_url)?,
                source => attributes.source_branch.as_str(),
                target => attributes.target_branch.as_str(),
            },
        )?;

        let mut items = String::new();
        let message = event.message();
        if !message.is_empty() {
            items.push_str("<li>");
            items.push_str(message);
            items.push_str("</li>");
        }
        let action = MergeRequestAction::from(attributes.action.as_deref().unwrap_or_default());
        match action {
            MergeRequestAction::Open | MergeRequestAction::Update => {
                items.push_str(&self.assignees_item(event)?);
            }
            MergeRequestAction::Merge => {
                if let Some(commit) = merge_commit {
                    items.push_str(&self.render(
                        "commit_item",
                        context! {
                            commit => self.link(short_sha(&commit.id), &commit.web_url)?,
                            title => commit.title.as_str(),
                        },
                    )?);
                }
            }
            _ => {}
        }

        if !items.is_empty() {
            note.push_str("<ul>");
            note.push_str(&items);
            note.push_str("</ul>");
        }
        note.push_str("</body>");
        Ok(note)
    }

    /// Renders the assignee list item of a merge request.
    ///
    /// Mapped assignees become mention links; others fall back to their VCS
    /// display name.
    ///
    /// # Errors
    ///
    /// Returns [`NoteError`] when rendering fails.
    pub fn assignees_item(&self, event: &MergeRequestEvent) -> Result<String, NoteError> {
        let Some(assignee_ids) = event.object_attributes.assignee_ids.as_ref() else {
            return Ok("<li>Unassigned!</li>".to_owned());
        };
        let label = if assignee_ids.len() == 1 {
            "Assignee"
        } else {
            "Assignees"
        };
        let names = assignee_ids
            .iter()
            .enumerate()
            .map(|(index, vcs_id)| match self.users.by_vcs_id(*vcs_id) {
                Some(mapped) => self.link(
                    &format!("@{}", mapped.name),
                    &self.mention_url(&mapped.task_list_id),
                ),
                None => Ok(event
                    .assignees
                    .get(index)
                    .map_or_else(|| vcs_id.to_string(), |assignee| assignee.name.clone())),
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(format!("<li>{label}: {}</li>", names.join(", ")))
    }

    /// Wraps `text` in a link to `url`.
    ///
    /// Double quotes in the URL are escaped as `&quot;`.
    ///
    /// # Errors
    ///
    /// Returns [`NoteError`] when rendering fails.
    pub fn link(&self, text: &str, url: &str) -> Result<String, NoteError> {
        self.render(
            "link",
            context! {
                text => text,
                url => url.replace('"', "&quot;"),
            },
        )
    }

    fn mention_url(&self, task_list_id: &str) -> String {
        self.mention_url_template
            .replace("{task_list}", task_list_id)
    }

    fn render(&self, name: &str, ctx: minijinja::Value) -> Result<String, NoteError> {
        Ok(self.templates.get_template(name)?.render(ctx)?)
    }
}

fn short_sha(sha: &str) -> &str {
    sha.get(..SHORT_SHA_LEN).unwrap_or(sha)
}

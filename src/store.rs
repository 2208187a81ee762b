//! Ticket store: reads and rewrites the payload embedded in a ticket field.
//!
//! Every mutation is one read-modify-write cycle:
//!
//! ```text
//! fetch ticket → decode field → change items or jobs → encode → overwrite field
//! ```
//!
//! The whole field is rewritten each time; there is no partial patch.
//! Nothing is cached between calls, so each mutation sees the field as it was
//! at its own fetch.
//!
//! There is no concurrency control. Two writers racing on the same ticket can
//! lose an update: the second write is built from a fetch that predates the
//! first write. Callers that need correctness under concurrent writers must
//! serialize access per ticket key themselves.

use jiff::Timestamp;
use serde_json::Value;
use tracing::{info, warn};

use crate::codec::{self, CodecError};
use crate::model::{CommentId, FieldUpdate, Job, JobMap, Payload, TicketDetails, TicketSummary};
use crate::tracker::{Tracker, TrackerError};

/// Errors that can occur during store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error(transparent)]
    Tracker(#[from] TrackerError),

    #[error("{source}\nInspect it at {url}")]
    MalformedField {
        url: String,
        #[source]
        source: CodecError,
    },

    #[error(
        "items on {key} are null, so there is nothing to append to; \
         write an item list first (an empty list is fine)"
    )]
    ItemsUninitialized { key: String },

    #[error(transparent)]
    Codec(CodecError),
}

pub type Result<T> = core::result::Result<T, StoreError>;

/// Reads and mutates ticket payloads through a [`Tracker`].
///
/// Holds no ticket state of its own; the ticket service owns the data.
pub struct TicketStore<T> {
    tracker: T,
}

impl<T: Tracker> TicketStore<T> {
    pub fn new(tracker: T) -> Self {
        Self { tracker }
    }

    /// Fetches a ticket and decodes its payload.
    ///
    /// Pure read. Fails rather than guessing when the field can't be decoded.
    pub fn fetch(&self, key: &str) -> Result<TicketDetails> {
        info!(key, "fetching ticket");
        let raw = self.tracker.fetch_ticket(key)?;

        let payload = codec::decode(key, raw.field.as_deref()).map_err(|source| match source {
            CodecError::MalformedField { .. } | CodecError::UnexpectedShape { .. } => {
                let url = self.tracker.browse_url(key);
                warn!(key, %url, "designated field cannot be read");
                StoreError::MalformedField { url, source }
            }
            other @ CodecError::Encode(_) => StoreError::Codec(other),
        })?;

        Ok(TicketDetails {
            summary: raw.summary,
            payload,
            comments: raw.comments,
        })
    }

    /// Lists the open tickets of a project as `<key>: <summary>` lines, in service order.
    pub fn list_open(&self, project: &str) -> Result<Vec<String>> {
        info!(project, "listing open tickets");
        let query = open_tickets_query(project);
        let tickets = self.tracker.search(&query)?;
        Ok(tickets.iter().map(TicketSummary::to_string).collect())
    }

    /// Records a job, replacing any job already stored under `job_id`.
    pub fn add_job(
        &self,
        job_id: &str,
        key: &str,
        description: &str,
        item: &str,
    ) -> Result<FieldUpdate> {
        info!(key, job_id, "adding job");
        self.modify(key, |payload| {
            payload
                .jobs
                .insert(job_id.to_string(), Job::new(description, item));
            Ok(())
        })
    }

    /// Replaces every job. Items are kept as they are.
    pub fn replace_jobs(&self, jobs: JobMap, key: &str) -> Result<FieldUpdate> {
        info!(key, count = jobs.len(), "replacing jobs");
        self.modify(key, |payload| {
            payload.jobs = jobs;
            Ok(())
        })
    }

    /// Replaces every item. Jobs are kept as they are.
    pub fn replace_items(&self, items: Vec<Value>, key: &str) -> Result<FieldUpdate> {
        info!(key, count = items.len(), "replacing items");
        self.modify(key, |payload| {
            payload.items = Some(items);
            Ok(())
        })
    }

    /// Appends one item. Calling this twice appends twice.
    pub fn append_item(&self, item: Value, key: &str) -> Result<FieldUpdate> {
        info!(key, "appending item");
        self.modify(key, |payload| match payload.items.as_mut() {
            Some(items) => {
                items.push(item);
                Ok(())
            }
            None => Err(StoreError::ItemsUninitialized {
                key: key.to_string(),
            }),
        })
    }

    /// Posts a comment on a ticket.
    pub fn post_comment(&self, body: &str, key: &str) -> Result<CommentId> {
        let id = self.tracker.add_comment(key, body)?;
        info!(comment = %id, "posted comment");
        Ok(id)
    }

    /// Replaces the body of an existing comment.
    pub fn update_comment(&self, id: &CommentId, body: &str) -> Result<()> {
        info!(comment = %id, "updating comment");
        let handle = self.tracker.get_comment(id)?;
        self.tracker.update_comment(&handle, body)?;
        Ok(())
    }

    /// Fetch, apply `change`, and write the whole field back.
    ///
    /// Nothing is written when the fetch, the change, or the encode fails.
    fn modify(
        &self,
        key: &str,
        change: impl FnOnce(&mut Payload) -> Result<()>,
    ) -> Result<FieldUpdate> {
        let mut payload = self.fetch(key)?.payload;
        change(&mut payload)?;

        let now = Timestamp::now();
        let text = codec::encode_at(now, payload.items.as_deref(), &payload.jobs)
            .map_err(StoreError::Codec)?;
        self.tracker.update_field(key, &text)?;

        payload.timestamp = codec::format_time(now);
        Ok(FieldUpdate {
            key: key.to_string(),
            payload,
        })
    }
}

/// Query listing the open tickets of a project.
fn open_tickets_query(project: &str) -> String {
    let project = project.replace('\\', "\\\\").replace('"', "\\\"");
    format!("project = \"{project}\" AND statusCategory != Done")
}

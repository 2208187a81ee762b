//! The ticket service seam.
//!
//! `Tracker` is everything ticketstore needs from the service that owns the tickets.
//! The real implementation talks to Jira over HTTPS; tests use an in-memory tracker.

mod jira;
#[cfg(test)]
pub mod memory;

pub use jira::JiraTracker;

use crate::model::{CommentHandle, CommentId, RawTicket, TicketSummary};

/// Errors reported by the ticket service.
#[derive(Debug, thiserror::Error)]
pub enum TrackerError {
    #[error("ticket not found: {0}")]
    NotFound(String),

    #[error("{method} {url} returned {code}: {detail}")]
    Status {
        method: String,
        url: String,
        code: u16,
        detail: String,
    },

    #[error("ticket service error: {context}: {source}")]
    Service {
        context: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl TrackerError {
    /// Wraps a lower-level failure, keeping it as the source.
    pub fn service(
        context: impl Into<String>,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        Self::Service {
            context: context.into(),
            source: source.into(),
        }
    }
}

pub type Result<T> = core::result::Result<T, TrackerError>;

/// Operations the ticket service provides.
///
/// Every call is one blocking round trip. Nothing is retried or cached.
pub trait Tracker {
    /// Fetches a ticket with its summary, designated field, and comments.
    fn fetch_ticket(&self, key: &str) -> Result<RawTicket>;

    /// Overwrites the designated field of a ticket.
    fn update_field(&self, key: &str, text: &str) -> Result<()>;

    /// Runs a ticket query, returning results in service order.
    fn search(&self, query: &str) -> Result<Vec<TicketSummary>>;

    /// Adds a comment, returning its address.
    fn add_comment(&self, key: &str, body: &str) -> Result<CommentId>;

    /// Looks up a single comment.
    fn get_comment(&self, id: &CommentId) -> Result<CommentHandle>;

    /// Replaces the body of a comment.
    fn update_comment(&self, handle: &CommentHandle, body: &str) -> Result<()>;

    /// Where a person can look at a ticket.
    fn browse_url(&self, key: &str) -> String;
}

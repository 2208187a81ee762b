//! Ticket-side types: what the ticket service returns around the payload.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::Payload;

/// A ticket as the service returns it, before the field is decoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawTicket {
    pub key: String,
    pub summary: String,

    /// Raw text of the designated field. `None` when the field was never set.
    pub field: Option<String>,

    /// Comments in the order the service returned them.
    pub comments: Vec<Comment>,
}

/// A ticket with its designated field decoded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TicketDetails {
    pub summary: String,
    pub payload: Payload,
    pub comments: Vec<Comment>,
}

/// A comment on a ticket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: String,
    pub body: String,
    pub created: String,

    /// Display name of the author.
    pub author_name: String,

    /// Account name of the author.
    pub author_id: String,
}

/// A ticket in a search listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TicketSummary {
    pub key: String,
    pub summary: String,
}

impl fmt::Display for TicketSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.key, self.summary)
    }
}

/// Address of a comment: the ticket it lives on plus its service-assigned id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommentId {
    pub key: String,
    pub id: String,
}

impl fmt::Display for CommentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.key, self.id)
    }
}

/// A comment looked up on the service, ready to be updated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommentHandle {
    pub comment: CommentId,

    /// Body at the time of lookup.
    pub body: String,
}

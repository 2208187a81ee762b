//! Core data model for ticketstore.
//!
//! Two halves: what lives inside the designated ticket field (payload, jobs),
//! and what the ticket service hands back around it (summaries, comments).

mod payload;
mod ticket;

pub use payload::{FieldUpdate, Job, JobMap, Payload};
pub use ticket::{Comment, CommentHandle, CommentId, RawTicket, TicketDetails, TicketSummary};

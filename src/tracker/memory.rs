//! In-memory tracker for tests.

use std::cell::{Cell, RefCell};

use crate::model::{Comment, CommentHandle, CommentId, RawTicket, TicketSummary};

use super::{Result, Tracker, TrackerError};

/// A [`Tracker`] holding tickets in memory, counting reads and field writes.
///
/// Search ignores the query and lists tickets in insertion order.
#[derive(Debug, Default)]
pub struct MemoryTracker {
    tickets: RefCell<Vec<RawTicket>>,
    next_comment: Cell<u64>,
    reads: Cell<usize>,
    writes: Cell<usize>,

    /// When set, field writes fail with a service error.
    pub reject_writes: Cell<bool>,
}

impl MemoryTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a ticket with the given raw field text.
    pub fn insert(&self, key: &str, summary: &str, field: Option<&str>) {
        self.tickets.borrow_mut().push(RawTicket {
            key: key.to_string(),
            summary: summary.to_string(),
            field: field.map(str::to_string),
            comments: Vec::new(),
        });
    }

    /// Adds a comment as though someone wrote it on the service.
    pub fn push_comment(&self, key: &str, comment: Comment) {
        if let Some(ticket) = self.tickets.borrow_mut().iter_mut().find(|t| t.key == key) {
            ticket.comments.push(comment);
        }
    }

    /// Current raw field text of a ticket.
    pub fn field(&self, key: &str) -> Option<String> {
        self.tickets
            .borrow()
            .iter()
            .find(|t| t.key == key)
            .and_then(|t| t.field.clone())
    }

    /// Comments on a ticket, in order.
    pub fn comments(&self, key: &str) -> Vec<Comment> {
        self.tickets
            .borrow()
            .iter()
            .find(|t| t.key == key)
            .map(|t| t.comments.clone())
            .unwrap_or_default()
    }

    pub fn reads(&self) -> usize {
        self.reads.get()
    }

    pub fn writes(&self) -> usize {
        self.writes.get()
    }

    fn with_ticket<T>(&self, key: &str, f: impl FnOnce(&mut RawTicket) -> T) -> Result<T> {
        let mut tickets = self.tickets.borrow_mut();
        let ticket = tickets
            .iter_mut()
            .find(|t| t.key == key)
            .ok_or_else(|| TrackerError::NotFound(key.to_string()))?;
        Ok(f(ticket))
    }
}

impl Tracker for MemoryTracker {
    fn fetch_ticket(&self, key: &str) -> Result<RawTicket> {
        self.reads.set(self.reads.get() + 1);
        self.with_ticket(key, |t| t.clone())
    }

    fn update_field(&self, key: &str, text: &str) -> Result<()> {
        if self.reject_writes.get() {
            return Err(TrackerError::Status {
                method: "PUT".to_string(),
                url: self.browse_url(key),
                code: 403,
                detail: "Forbidden".to_string(),
            });
        }
        self.with_ticket(key, |t| t.field = Some(text.to_string()))?;
        self.writes.set(self.writes.get() + 1);
        Ok(())
    }

    fn search(&self, _query: &str) -> Result<Vec<TicketSummary>> {
        Ok(self
            .tickets
            .borrow()
            .iter()
            .map(|t| TicketSummary {
                key: t.key.clone(),
                summary: t.summary.clone(),
            })
            .collect())
    }

    fn add_comment(&self, key: &str, body: &str) -> Result<CommentId> {
        let id = self.next_comment.get() + 1;
        self.next_comment.set(id);
        let id = id.to_string();

        self.with_ticket(key, |t| {
            t.comments.push(Comment {
                id: id.clone(),
                body: body.to_string(),
                created: String::new(),
                author_name: "Test User".to_string(),
                author_id: "test".to_string(),
            });
        })?;

        Ok(CommentId {
            key: key.to_string(),
            id,
        })
    }

    fn get_comment(&self, id: &CommentId) -> Result<CommentHandle> {
        self.with_ticket(&id.key, |t| {
            t.comments
                .iter()
                .find(|c| c.id == id.id)
                .map(|c| CommentHandle {
                    comment: id.clone(),
                    body: c.body.clone(),
                })
        })?
        .ok_or_else(|| TrackerError::NotFound(id.to_string()))
    }

    fn update_comment(&self, handle: &CommentHandle, body: &str) -> Result<()> {
        let id = &handle.comment;
        self.with_ticket(&id.key, |t| {
            t.comments
                .iter_mut()
                .find(|c| c.id == id.id)
                .map(|c| c.body = body.to_string())
        })?
        .ok_or_else(|| TrackerError::NotFound(id.to_string()))
    }

    fn browse_url(&self, key: &str) -> String {
        format!("https://tracker.test/browse/{key}")
    }
}

mod tests {
    use super::*;

    #[test]
    fn missing_ticket_is_not_found() {
        let tracker = MemoryTracker::new();
        let err = tracker.fetch_ticket("NOPE-1").unwrap_err();
        assert!(matches!(err, TrackerError::NotFound(ref key) if key == "NOPE-1"));
    }

    #[test]
    fn comments_round_trip_through_handles() {
        let tracker = MemoryTracker::new();
        tracker.insert("EXAMPLE-1", "s", None);

        let id = tracker.add_comment("EXAMPLE-1", "draft").unwrap();
        let handle = tracker.get_comment(&id).unwrap();
        assert_eq!(handle.body, "draft");

        tracker.update_comment(&handle, "final").unwrap();
        assert_eq!(tracker.comments("EXAMPLE-1")[0].body, "final");
    }
}

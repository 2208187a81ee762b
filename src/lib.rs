//! ticketstore: a small structured store kept inside one ticket field.
//!
//! The designated field of a ticket holds a tagged JSON payload with an item
//! list and a job map. [`store::TicketStore`] reads and rewrites it through a
//! [`tracker::Tracker`]; [`codec`] owns the on-field text format.

pub mod cli;
pub mod codec;
pub mod config;
pub mod credentials;
pub mod model;
pub mod store;
pub mod tracker;

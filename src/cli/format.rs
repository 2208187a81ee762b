//! Output formatting for CLI display.

use crate::model::FieldUpdate;

/// One-line confirmation of a field write.
pub(super) fn format_update(update: &FieldUpdate) -> String {
    let payload = &update.payload;
    let items = payload
        .items
        .as_ref()
        .map_or_else(|| "no item list".to_string(), |i| plural(i.len(), "item"));
    let jobs = plural(payload.jobs.len(), "job");
    format!(
        "{} updated at {}: {items}, {jobs}",
        update.key, payload.timestamp
    )
}

fn plural(count: usize, noun: &str) -> String {
    if count == 1 {
        format!("1 {noun}")
    } else {
        format!("{count} {noun}s")
    }
}

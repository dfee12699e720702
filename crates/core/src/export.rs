//! CSV export of a notification feed.
//!
//! Produces the user-facing CSV artifact: a fixed header line, RFC
//! 4180-style quoting (fields containing a comma or double-quote are
//! wrapped, internal quotes doubled), `Read`/`Unread` status rendering, and
//! the `notifications-{user_id}-{timestamp}.csv` filename pattern.

use crate::types::{DbId, Timestamp};

/// The exact header line of every export.
pub const CSV_HEADER: &str = "ID,Message,Type,Status,Created At,Updated At,Link";

/// The fields of one exported notification.
///
/// A database-free view so the renderer stays independent of the row type;
/// the API layer maps store rows into it.
#[derive(Debug, Clone)]
pub struct ExportRow {
    pub id: DbId,
    pub message: String,
    /// `None` renders as an empty field.
    pub kind: Option<String>,
    pub is_read: bool,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
    pub link: Option<String>,
}

/// Render a full CSV document (header plus one line per row).
pub fn render(rows: &[ExportRow]) -> String {
    let mut out = String::from(CSV_HEADER);
    out.push('\n');
    for row in rows {
        render_row(&mut out, row);
    }
    out
}

/// Export filename for one user's feed: `notifications-{user_id}-{timestamp}.csv`.
pub fn filename(user_id: DbId, now: Timestamp) -> String {
    format!("notifications-{}-{}.csv", user_id, now.timestamp())
}

fn render_row(out: &mut String, row: &ExportRow) {
    let status = if row.is_read { "Read" } else { "Unread" };
    let fields = [
        row.id.to_string(),
        row.message.clone(),
        row.kind.clone().unwrap_or_default(),
        status.to_string(),
        row.created_at.to_rfc3339(),
        row.updated_at.to_rfc3339(),
        row.link.clone().unwrap_or_default(),
    ];
    for (i, field) in fields.iter().enumerate() {
        if i > 0 {
            out.push(',');
        }
        out.push_str(&escape(field));
    }
    out.push('\n');
}

/// Quote a field when it contains a comma, a double-quote, or a newline;
/// internal double-quotes are doubled.
fn escape(field: &str) -> String {
    if field.contains(',') || field.contains('"') || field.contains('\n') {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

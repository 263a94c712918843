//! Terminal rendering of display transcript entries.
//!
//! Annotated entries are drawn as boxed tool-progress blocks; entries with a
//! parent are nested one level under it.

use runtime::{DisplayMessage, Role, Status};

/// Render the entries appended since `from`, skipping the user's own input.
pub fn render_since(transcript: &[DisplayMessage], from: usize) -> String {
    transcript
        .iter()
        .skip(from)
        .filter(|entry| entry.role != Role::User)
        .map(render)
        .collect::<Vec<_>>()
        .join("\n")
}

/// Render one entry.
pub fn render(entry: &DisplayMessage) -> String {
    let Some(metadata) = &entry.metadata else {
        return entry.content.clone();
    };

    let indent = if metadata.parent_id.is_some() {
        "│ "
    } else {
        ""
    };
    let title = metadata.title.as_deref().unwrap_or("Tool");
    let status = match metadata.status {
        Some(Status::Pending) => " (running)",
        Some(Status::Done) => " (done)",
        None => "",
    };

    let mut out = format!("{indent}┌─ {title}{status}\n");
    if let Some(log) = &metadata.log {
        out.push_str(&format!("{indent}│ {log}\n"));
    }
    for line in entry.content.lines() {
        out.push_str(&format!("{indent}│ {line}\n"));
    }
    out.push_str(&format!("{indent}└─"));
    out
}

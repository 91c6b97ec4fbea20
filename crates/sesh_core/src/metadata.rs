//! Lenient metadata extraction from session documents.
//!
//! Session files are loosely structured Markdown:
//!
//! ~~~text
//! # Session: 2026-02-01
//! **Date:** 2026-02-01
//! **Started:** 09:15
//! **Last Updated:** 11:40
//!
//! ### Completed
//! - [x] wire up the parser
//!
//! ### In Progress
//! - [ ] error messages
//!
//! ### Notes for Next Session
//! Check the flaky test first.
//!
//! ### Context to Load
//! ```
//! src/parser.rs
//! ```
//! ~~~
//!
//! Every field is extracted independently. A missing label or section leaves
//! the field at its default; nothing here returns an error.

use regex::{NoExpand, Regex};
use serde::Serialize;
use std::sync::OnceLock;

/// Title used when a session document has no `# ` heading.
pub const UNTITLED_SESSION: &str = "Untitled Session";

/// Metadata parsed from a session document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SessionMetadata {
    /// Text of the first `# ` heading.
    pub title: Option<String>,
    /// Value of the `**Date:**` line (YYYY-MM-DD).
    pub date: Option<String>,
    /// Value of the `**Started:**` line (HH:MM).
    pub started: Option<String>,
    /// Value of the `**Last Updated:**` line (HH:MM).
    pub last_updated: Option<String>,
    /// Checked items under `### Completed`.
    pub completed: Vec<String>,
    /// Unchecked items under `### In Progress`.
    pub in_progress: Vec<String>,
    /// Body of `### Notes for Next Session`.
    pub notes: String,
    /// Fenced body of `### Context to Load`.
    pub context: String,
}

impl SessionMetadata {
    /// Returns the title, or [`UNTITLED_SESSION`].
    pub fn title_or_default(&self) -> &str {
        self.title.as_deref().unwrap_or(UNTITLED_SESSION)
    }
}

/// Summary counts for a session document.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SessionStats {
    /// Completed plus in-progress items.
    pub total_items: usize,
    /// Number of completed items.
    pub completed_items: usize,
    /// Number of in-progress items.
    pub in_progress_items: usize,
    /// Number of lines in the document (0 when empty or unreadable).
    pub line_count: usize,
    /// Whether the notes section has content.
    pub has_notes: bool,
    /// Whether the context section has content.
    pub has_context: bool,
}

impl SessionStats {
    /// Computes stats from document content, if any.
    pub fn from_content(content: Option<&str>) -> Self {
        let metadata = content.map(parse_metadata).unwrap_or_default();
        let line_count = match content {
            Some(c) if !c.is_empty() => c.split('\n').count(),
            _ => 0,
        };

        Self {
            total_items: metadata.completed.len() + metadata.in_progress.len(),
            completed_items: metadata.completed.len(),
            in_progress_items: metadata.in_progress.len(),
            line_count,
            has_notes: !metadata.notes.is_empty(),
            has_context: !metadata.context.is_empty(),
        }
    }
}

struct Patterns {
    title: Regex,
    date: Regex,
    started: Regex,
    last_updated: Regex,
    completed_heading: Regex,
    progress_heading: Regex,
    notes_heading: Regex,
    completed_item: Regex,
    progress_item: Regex,
    context: Regex,
}

fn patterns() -> &'static Patterns {
    static PATTERNS: OnceLock<Patterns> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        let re = |p: &str| Regex::new(p).expect("valid regex");
        Patterns {
            title: re(r"(?m)^#\s+(.+)$"),
            date: re(r"\*\*Date:\*\*\s*([0-9]{4}-[0-9]{2}-[0-9]{2})"),
            started: re(r"\*\*Started:\*\*\s*([0-9:]+)"),
            last_updated: re(r"\*\*Last Updated:\*\*\s*([0-9:]+)"),
            completed_heading: re(r"### Completed\s*\n"),
            progress_heading: re(r"### In Progress\s*\n"),
            notes_heading: re(r"### Notes for Next Session\s*\n"),
            completed_item: re(r"- \[x\]\s*(.+)"),
            progress_item: re(r"- \[ \]\s*(.+)"),
            context: re(r"(?s)### Context to Load\s*\n```\n(.*?)```"),
        }
    })
}

fn last_updated_line_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\*\*Last Updated:\*\*.*").expect("valid regex"))
}

/// Parses session metadata from document content.
pub fn parse_metadata(content: &str) -> SessionMetadata {
    let p = patterns();

    SessionMetadata {
        title: capture(&p.title, content),
        date: capture(&p.date, content),
        started: capture(&p.started, content),
        last_updated: capture(&p.last_updated, content),
        completed: section_body(&p.completed_heading, content)
            .map(|body| items(&p.completed_item, body))
            .unwrap_or_default(),
        in_progress: section_body(&p.progress_heading, content)
            .map(|body| items(&p.progress_item, body))
            .unwrap_or_default(),
        notes: section_body(&p.notes_heading, content)
            .map(|body| body.trim().to_string())
            .unwrap_or_default(),
        context: capture(&p.context, content).unwrap_or_default(),
    }
}

/// Renders the document written for a brand-new session.
pub fn render_template(date: &str, time: &str) -> String {
    format!(
        "# Session: {date}
**Date:** {date}
**Started:** {time}
**Last Updated:** {time}

---

## Current State

[Session context goes here]

### Completed
- [ ]

### In Progress
- [ ]

### Notes for Next Session
-

### Context to Load
```
[relevant files]
```
"
    )
}

/// Replaces the first `**Last Updated:**` line with the given time.
///
/// Content without such a line is returned unchanged.
pub fn touch_last_updated(content: &str, time: &str) -> String {
    let line = format!("**Last Updated:** {}", time);
    last_updated_line_re()
        .replace(content, NoExpand(&line))
        .into_owned()
}

fn capture(re: &Regex, content: &str) -> Option<String> {
    re.captures(content)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim().to_string())
}

/// Returns the body following a section heading.
///
/// The body ends at the next `###`, the first blank line, or end of content,
/// whichever comes first.
fn section_body<'a>(heading: &Regex, content: &'a str) -> Option<&'a str> {
    let rest = &content[heading.find(content)?.end()..];
    let end = [rest.find("###"), rest.find("\n\n")]
        .into_iter()
        .flatten()
        .min()
        .unwrap_or(rest.len());
    Some(&rest[..end])
}

fn items(re: &Regex, body: &str) -> Vec<String> {
    re.captures_iter(body)
        .filter_map(|c| c.get(1))
        .map(|m| m.as_str().trim().to_string())
        .collect()
}

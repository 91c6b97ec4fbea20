//! SESH Core Library
//!
//! Storage for assistant work-in-progress sessions, providing:
//! - Session files named `YYYY-MM-DD[-<short-id>]-session.tmp`
//! - Lenient metadata extraction from the session Markdown
//! - Paginated listing and id lookup
//! - A JSON alias index with backup-protected atomic rewrites
//!
//! # Quick Start
//!
//! ```
//! use sesh_core::{SessionRepository, ListOptions};
//! use tempfile::TempDir;
//!
//! let tmp = TempDir::new().unwrap();
//! let repo = SessionRepository::new(tmp.path());
//!
//! let path = repo.session_path("2026-02-01-a1b2c3d4-session.tmp");
//! assert!(repo.write(&path, "# Parser work\n"));
//!
//! let page = repo.list(&ListOptions::default());
//! assert_eq!(page.total, 1);
//! assert_eq!(repo.title(&path), "Parser work");
//! ```
//!
//! # Aliases
//!
//! Short human names can be bound to session files:
//!
//! ```
//! use sesh_core::AliasIndex;
//! use tempfile::TempDir;
//!
//! let tmp = TempDir::new().unwrap();
//! let index = AliasIndex::new(tmp.path().join("session-aliases.json"));
//!
//! let set = index.set("parser", "/sessions/2026-02-01-a1b2c3d4-session.tmp", None).unwrap();
//! assert!(set.is_new);
//!
//! assert_eq!(
//!     index.resolve_alias_or_id("parser"),
//!     "/sessions/2026-02-01-a1b2c3d4-session.tmp"
//! );
//! // Anything that is not an alias passes through unchanged
//! assert_eq!(index.resolve_alias_or_id("a1b2c3d4"), "a1b2c3d4");
//! ```

mod aliases;
mod atomic;
mod config;
mod error;
mod identity;
mod metadata;
mod repository;
mod store;

pub use aliases::{
    AliasDeleted, AliasDocument, AliasEntry, AliasIndex, AliasListOptions, AliasRenamed,
    AliasSet, AliasSummary, AliasTitleUpdated, CleanupReport, IndexMetadata, RemovedAlias,
    ResolvedAlias, ALIAS_VERSION, RESERVED_ALIASES,
};
pub use config::{Config, ListingConfig, StoreConfig, CONFIG_FILE};
pub use error::{Result, SeshError};
pub use identity::{
    derive_short_id, parse_identity, session_filename, SessionIdentity, DEFAULT_SHORT_ID,
    NO_ID_LABEL, SESSION_EXTENSION,
};
pub use metadata::{
    parse_metadata, render_template, touch_last_updated, SessionMetadata, SessionStats,
    UNTITLED_SESSION,
};
pub use repository::{
    format_size, ListOptions, Recorded, SessionDetail, SessionPage, SessionRecord,
    SessionRepository,
};
pub use store::SessionStore;

use chrono::{DateTime, SecondsFormat, Utc};

/// Time source for timestamps and age filters.
///
/// Anything that needs "now" takes a `Clock`, so tests can pin time with
/// `with_clock()`.
pub trait Clock: Send + Sync {
    /// Returns the current instant.
    fn now(&self) -> DateTime<Utc>;
}

impl<F> Clock for F
where
    F: Fn() -> DateTime<Utc> + Send + Sync,
{
    fn now(&self) -> DateTime<Utc> {
        self()
    }
}

/// The wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Formats an instant as ISO-8601 with millisecond precision (`2026-02-01T09:15:00.000Z`).
pub(crate) fn iso_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

//! Session identity derived from filenames.
//!
//! Session files come in two generations:
//! - legacy: `YYYY-MM-DD-session.tmp`
//! - current: `YYYY-MM-DD-<short-id>-session.tmp`, where the short id is at
//!   least 8 lowercase alphanumeric characters
//!
//! The two are distinct sessions even when they share a date.

use chrono::NaiveDate;
use regex::Regex;
use serde::Serialize;
use std::fmt;
use std::sync::OnceLock;

/// Extension shared by every session file.
pub const SESSION_EXTENSION: &str = "tmp";

/// Display label for sessions that predate short ids.
pub const NO_ID_LABEL: &str = "no-id";

/// Fallback short id when neither a session token nor a project name is known.
pub const DEFAULT_SHORT_ID: &str = "default";

/// Number of trailing token characters kept as the short id.
const SHORT_ID_LEN: usize = 8;

fn filename_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^([0-9]{4}-[0-9]{2}-[0-9]{2})(?:-([a-z0-9]{8,}))?-session\.tmp$")
            .expect("valid regex")
    })
}

/// Identity of a session file, as encoded in its filename.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "generation", rename_all = "snake_case")]
pub enum SessionIdentity {
    /// A file written before short ids were embedded in names.
    Legacy {
        /// Date the session file was created.
        date: NaiveDate,
    },
    /// A file carrying a short id.
    Current {
        /// Date the session file was created.
        date: NaiveDate,
        /// Short id segment.
        short_id: String,
    },
}

impl SessionIdentity {
    /// Parses a session filename.
    ///
    /// Returns `None` for anything that is not a session file name, including
    /// names whose date segment is not a real calendar date.
    pub fn parse(filename: &str) -> Option<Self> {
        let caps = filename_re().captures(filename)?;
        let date = NaiveDate::parse_from_str(&caps[1], "%Y-%m-%d").ok()?;

        Some(match caps.get(2) {
            Some(id) => Self::Current {
                date,
                short_id: id.as_str().to_string(),
            },
            None => Self::Legacy { date },
        })
    }

    /// Returns the session date.
    pub fn date(&self) -> NaiveDate {
        match self {
            Self::Legacy { date } | Self::Current { date, .. } => *date,
        }
    }

    /// Returns the short id, or `None` for legacy sessions.
    pub fn short_id(&self) -> Option<&str> {
        match self {
            Self::Legacy { .. } => None,
            Self::Current { short_id, .. } => Some(short_id),
        }
    }

    /// Returns the short id, or the `no-id` label for legacy sessions.
    pub fn label(&self) -> &str {
        self.short_id().unwrap_or(NO_ID_LABEL)
    }

    /// Returns true for legacy (no short id) sessions.
    pub fn is_legacy(&self) -> bool {
        matches!(self, Self::Legacy { .. })
    }

    /// Returns the filename this identity was parsed from.
    pub fn filename(&self) -> String {
        match self {
            Self::Legacy { date } => format!("{}-session.{}", date, SESSION_EXTENSION),
            Self::Current { date, short_id } => session_filename(*date, short_id),
        }
    }
}

impl fmt::Display for SessionIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.date(), self.label())
    }
}

/// Parses a session filename. See [`SessionIdentity::parse`].
pub fn parse_identity(filename: &str) -> Option<SessionIdentity> {
    SessionIdentity::parse(filename)
}

/// Builds the current-generation filename for a date and short id.
pub fn session_filename(date: NaiveDate, short_id: &str) -> String {
    format!("{}-{}-session.{}", date, short_id, SESSION_EXTENSION)
}

/// Derives the short id for a new session file.
///
/// Uses the last 8 characters of a non-empty session token, then the project
/// name, then `"default"`.
pub fn derive_short_id(token: Option<&str>, project: Option<&str>) -> String {
    if let Some(token) = token.filter(|t| !t.is_empty()) {
        let skip = token.chars().count().saturating_sub(SHORT_ID_LEN);
        return token.chars().skip(skip).collect();
    }

    project
        .filter(|p| !p.is_empty())
        .unwrap_or(DEFAULT_SHORT_ID)
        .to_string()
}

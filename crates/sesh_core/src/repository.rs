//! Session files on disk: discovery, lookup and content operations.
//!
//! Read paths never fail hard. A missing directory, an unreadable entry or a
//! name that is not a session file simply drops out of the result.

use crate::error::{Result, SeshError};
use crate::identity::{parse_identity, session_filename, SessionIdentity, SESSION_EXTENSION};
use crate::metadata::{
    parse_metadata, render_template, touch_last_updated, SessionMetadata, SessionStats,
};
use crate::{Clock, SystemClock};
use chrono::{DateTime, Duration, Local, NaiveDate, Utc};
use serde::Serialize;
use std::cmp::Reverse;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Name suffix shared by every session file, listable or not.
const SESSION_SUFFIX: &str = "-session.tmp";

/// Options for [`SessionRepository::list`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListOptions {
    /// Maximum sessions per page (default: 50).
    pub limit: usize,
    /// Sessions to skip (default: 0).
    pub offset: usize,
    /// Only sessions created on this date.
    pub date: Option<NaiveDate>,
    /// Only sessions whose short id contains this string.
    pub search: Option<String>,
}

impl Default for ListOptions {
    fn default() -> Self {
        Self {
            limit: 50,
            offset: 0,
            date: None,
            search: None,
        }
    }
}

/// One page of sessions, newest first.
#[derive(Debug, Clone, Serialize)]
pub struct SessionPage {
    /// Sessions on this page.
    pub sessions: Vec<SessionRecord>,
    /// Number of sessions matching the filters, across all pages.
    pub total: usize,
    /// Offset used for this page.
    pub offset: usize,
    /// Limit used for this page.
    pub limit: usize,
    /// Whether another page follows.
    pub has_more: bool,
}

/// A session file and its filesystem facts.
#[derive(Debug, Clone, Serialize)]
pub struct SessionRecord {
    /// File name inside the sessions directory.
    pub filename: String,
    /// Identity parsed from the file name. `None` for a file that only
    /// matches `*-session.tmp`, such as one recorded under a short id.
    pub identity: Option<SessionIdentity>,
    /// Full path to the file.
    pub path: PathBuf,
    /// Size in bytes.
    pub size: u64,
    /// Last modification time.
    pub modified: DateTime<Utc>,
    /// Creation time, where the platform reports it.
    pub created: Option<DateTime<Utc>>,
    /// Parsed content, when requested.
    pub detail: Option<SessionDetail>,
}

impl SessionRecord {
    /// Short id, for current-format sessions.
    pub fn short_id(&self) -> Option<&str> {
        self.identity.as_ref().and_then(SessionIdentity::short_id)
    }

    /// Date encoded in the file name, when it parses.
    pub fn date(&self) -> Option<NaiveDate> {
        self.identity.as_ref().map(SessionIdentity::date)
    }

    pub fn is_legacy(&self) -> bool {
        self.identity.as_ref().is_some_and(SessionIdentity::is_legacy)
    }

    /// Display label: the short id, "no-id" for legacy sessions, or the
    /// file stem for names outside the grammar.
    pub fn label(&self) -> &str {
        match &self.identity {
            Some(identity) => identity.label(),
            None => self
                .filename
                .strip_suffix(SESSION_SUFFIX)
                .unwrap_or(&self.filename),
        }
    }
}

/// Content of a session file with its parsed metadata.
#[derive(Debug, Clone, Serialize)]
pub struct SessionDetail {
    /// Raw document, or `None` if it could not be read.
    pub content: Option<String>,
    /// Metadata parsed from the document.
    pub metadata: SessionMetadata,
    /// Summary counts.
    pub stats: SessionStats,
}

/// Outcome of [`SessionRepository::record`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Recorded {
    /// A new session file was written from the template.
    Created(PathBuf),
    /// An existing session file had its last-updated time refreshed.
    Updated(PathBuf),
}

impl Recorded {
    /// Path of the session file.
    pub fn path(&self) -> &Path {
        match self {
            Self::Created(p) | Self::Updated(p) => p,
        }
    }
}

/// Manages the sessions directory.
///
/// Nothing is cached; every call goes back to the filesystem.
pub struct SessionRepository {
    dir: PathBuf,
    clock: Arc<dyn Clock>,
}

impl SessionRepository {
    /// Creates a repository over the given sessions directory.
    ///
    /// Note: This does not create the directory. Writes through
    /// [`record`](Self::record) create it on demand.
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
            clock: Arc::new(SystemClock),
        }
    }

    /// Replaces the clock used for age filters and new session timestamps.
    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    /// Returns the sessions directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Returns the full path for a session file name.
    pub fn session_path(&self, filename: &str) -> PathBuf {
        self.dir.join(filename)
    }

    /// Reads a session document.
    pub fn read(&self, path: &Path) -> Option<String> {
        if !path.exists() {
            return None;
        }

        match fs::read_to_string(path) {
            Ok(content) => Some(content),
            Err(e) => {
                warn!("Error reading session {}: {}", path.display(), e);
                None
            }
        }
    }

    /// Overwrites a session document.
    pub fn write(&self, path: &Path, content: &str) -> bool {
        match fs::write(path, content) {
            Ok(()) => true,
            Err(e) => {
                warn!("Error writing session {}: {}", path.display(), e);
                false
            }
        }
    }

    /// Appends to a session document, creating it if needed.
    pub fn append(&self, path: &Path, content: &str) -> bool {
        let result = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .and_then(|mut file| file.write_all(content.as_bytes()));

        match result {
            Ok(()) => true,
            Err(e) => {
                warn!("Error appending to session {}: {}", path.display(), e);
                false
            }
        }
    }

    /// Deletes a session file. Returns false if it did not exist.
    pub fn delete(&self, path: &Path) -> bool {
        if !path.exists() {
            return false;
        }

        match fs::remove_file(path) {
            Ok(()) => true,
            Err(e) => {
                warn!("Error deleting session {}: {}", path.display(), e);
                false
            }
        }
    }

    /// Returns true if `path` is an existing regular file.
    pub fn exists(&self, path: &Path) -> bool {
        path.is_file()
    }

    /// Returns the session title, or "Untitled Session".
    pub fn title(&self, path: &Path) -> String {
        let content = self.read(path).unwrap_or_default();
        parse_metadata(&content).title_or_default().to_string()
    }

    /// Computes summary counts for a session file.
    pub fn stats(&self, path: &Path) -> SessionStats {
        SessionStats::from_content(self.read(path).as_deref())
    }

    /// Returns the file size in human-readable form, e.g. "1.2 KB".
    pub fn size(&self, path: &Path) -> String {
        match fs::metadata(path) {
            Ok(meta) => format_size(meta.len()),
            Err(_) => format_size(0),
        }
    }

    /// Lists sessions, newest modification first, one page at a time.
    pub fn list(&self, options: &ListOptions) -> SessionPage {
        let search = options.search.as_deref().filter(|s| !s.is_empty());

        let mut sessions: Vec<SessionRecord> = self
            .scan()
            .into_iter()
            .filter(|s| options.date.map_or(true, |d| s.date() == Some(d)))
            .filter(|s| {
                search.map_or(true, |needle| {
                    s.short_id().is_some_and(|id| id.contains(needle))
                })
            })
            .collect();

        // Stable sort: equal mtimes keep directory order
        sessions.sort_by_key(|s| Reverse(s.modified));

        let total = sessions.len();
        let page = sessions
            .into_iter()
            .skip(options.offset)
            .take(options.limit)
            .collect();

        SessionPage {
            sessions: page,
            total,
            offset: options.offset,
            limit: options.limit,
            has_more: options.offset.saturating_add(options.limit) < total,
        }
    }

    /// Finds a session by short id prefix or file name.
    ///
    /// `id` matches a session when:
    /// - it is the file name, with or without the `.tmp` extension, or
    /// - it is the date of a legacy session (`2026-01-17` for
    ///   `2026-01-17-session.tmp`), or
    /// - it is a prefix of a current session's short id.
    ///
    /// Exact name matches win over prefix matches. Among several prefix
    /// matches the most recently modified session wins, then the smaller
    /// file name.
    pub fn get_by_id(&self, id: &str, include_content: bool) -> Option<SessionRecord> {
        if id.is_empty() {
            return None;
        }

        let with_ext = format!("{}.{}", id, SESSION_EXTENSION);
        let legacy_name = format!("{}-session.{}", id, SESSION_EXTENSION);

        let best = self
            .scan()
            .into_iter()
            .filter_map(|s| {
                let exact = s.filename == id
                    || s.filename == with_ext
                    || (s.is_legacy() && s.filename == legacy_name);
                let prefix = s.short_id().is_some_and(|sid| sid.starts_with(id));

                match (exact, prefix) {
                    (true, _) => Some((0u8, s)),
                    (false, true) => Some((1u8, s)),
                    (false, false) => None,
                }
            })
            .min_by(|(rank_a, a), (rank_b, b)| {
                rank_a
                    .cmp(rank_b)
                    .then_with(|| b.modified.cmp(&a.modified))
                    .then_with(|| a.filename.cmp(&b.filename))
            })
            .map(|(_, s)| s)?;

        Some(if include_content {
            self.with_detail(best)
        } else {
            best
        })
    }

    /// Loads a record for a known path, if it is a `*-session.tmp` file.
    ///
    /// Files outside the strict grammar are accepted here so that a session
    /// recorded under a short id can still be shown, aliased or deleted.
    pub fn get_by_path(&self, path: &Path, include_content: bool) -> Option<SessionRecord> {
        let filename = path.file_name()?.to_str()?;
        if !filename.ends_with(SESSION_SUFFIX) {
            return None;
        }
        let identity = parse_identity(filename);
        let meta = fs::metadata(path).ok().filter(|m| m.is_file())?;
        let record = record_from(filename.to_string(), identity, path.to_path_buf(), &meta);

        Some(if include_content {
            self.with_detail(record)
        } else {
            record
        })
    }

    /// Sessions modified within the last `max_age_days`, newest first.
    ///
    /// Matches every `*-session.tmp` file, including ones whose short id is
    /// too short to appear in [`list`](Self::list).
    pub fn recent(&self, max_age_days: u32) -> Vec<SessionRecord> {
        let now = self.clock.now();
        let cutoff = now
            .checked_sub_signed(Duration::days(i64::from(max_age_days)))
            .unwrap_or(DateTime::<Utc>::MIN_UTC);

        let mut sessions: Vec<SessionRecord> = self
            .scan_all()
            .into_iter()
            .filter(|s| s.modified >= cutoff)
            .collect();
        sessions.sort_by_key(|s| Reverse(s.modified));
        sessions
    }

    /// Creates today's session file for `short_id`, or refreshes its
    /// last-updated time if it already exists.
    ///
    /// Date and time are taken from the clock in local time.
    ///
    /// # Errors
    ///
    /// Returns [`SeshError::InvalidShortId`] if `short_id` is empty or is not
    /// a single file name component.
    pub fn record(&self, short_id: &str) -> Result<Recorded> {
        validate_short_id(short_id)?;

        let now = self.clock.now().with_timezone(&Local);
        let date = now.format("%Y-%m-%d").to_string();
        let time = now.format("%H:%M").to_string();

        let filename = session_filename(now.date_naive(), short_id);
        let path = self.dir.join(&filename);

        if parse_identity(&filename).is_none() {
            warn!(
                "Session file name {} does not carry a listable short id; only recent and path lookups will find it",
                filename
            );
        }

        fs::create_dir_all(&self.dir)?;

        if path.exists() {
            let content = fs::read_to_string(&path).map_err(|e| SeshError::RecordFailed {
                path: path.clone(),
                reason: format!("read failed: {}", e),
            })?;
            fs::write(&path, touch_last_updated(&content, &time)).map_err(|e| {
                SeshError::RecordFailed {
                    path: path.clone(),
                    reason: format!("write failed: {}", e),
                }
            })?;
            info!("Updated session file: {}", path.display());
            Ok(Recorded::Updated(path))
        } else {
            fs::write(&path, render_template(&date, &time)).map_err(|e| {
                SeshError::RecordFailed {
                    path: path.clone(),
                    reason: format!("write failed: {}", e),
                }
            })?;
            info!("Created session file: {}", path.display());
            Ok(Recorded::Created(path))
        }
    }

    /// Collects every conforming session file in directory order.
    fn scan(&self) -> Vec<SessionRecord> {
        self.scan_all()
            .into_iter()
            .filter(|s| s.identity.is_some())
            .collect()
    }

    /// Collects every regular `*-session.tmp` file in directory order.
    fn scan_all(&self) -> Vec<SessionRecord> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) => {
                debug!("Cannot read sessions directory {}: {}", self.dir.display(), e);
                return Vec::new();
            }
        };

        let mut sessions = Vec::new();
        for entry in entries.flatten() {
            if !entry.file_type().map(|t| t.is_file()).unwrap_or(false) {
                continue;
            }

            let Some(filename) = entry.file_name().to_str().map(str::to_string) else {
                continue;
            };
            if !filename.ends_with(SESSION_SUFFIX) {
                continue;
            }
            let identity = parse_identity(&filename);

            match entry.metadata() {
                Ok(meta) => sessions.push(record_from(filename, identity, entry.path(), &meta)),
                Err(e) => debug!("Skipping {}: {}", filename, e),
            }
        }

        sessions
    }

    fn with_detail(&self, mut record: SessionRecord) -> SessionRecord {
        let content = self.read(&record.path);
        let metadata = content.as_deref().map(parse_metadata).unwrap_or_default();
        let stats = SessionStats::from_content(content.as_deref());
        record.detail = Some(SessionDetail {
            content,
            metadata,
            stats,
        });
        record
    }
}

/// Accepts ids that stay a single component once joined into a file name.
fn validate_short_id(short_id: &str) -> Result<()> {
    let mut components = Path::new(short_id).components();
    let single = matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    );
    if !single || short_id.contains(['/', '\\']) {
        return Err(SeshError::InvalidShortId(short_id.to_string()));
    }
    Ok(())
}

fn record_from(
    filename: String,
    identity: Option<SessionIdentity>,
    path: PathBuf,
    meta: &fs::Metadata,
) -> SessionRecord {
    SessionRecord {
        filename,
        identity,
        path,
        size: meta.len(),
        modified: meta
            .modified()
            .map(DateTime::<Utc>::from)
            .unwrap_or(DateTime::<Utc>::MIN_UTC),
        created: meta.created().ok().map(DateTime::<Utc>::from),
        detail: None,
    }
}

/// Formats a byte count with 1024-based units and one decimal place.
pub fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = 1024 * 1024;

    if bytes < KB {
        format!("{} B", bytes)
    } else if bytes < MB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    }
}

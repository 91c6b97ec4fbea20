//! Named aliases for session files.
//!
//! All aliases live in one JSON document:
//!
//! ```json
//! {
//!   "version": "1.0",
//!   "aliases": {
//!     "parser": {
//!       "sessionPath": "/home/u/.claude/sessions/2026-02-01-a1b2c3d4-session.tmp",
//!       "createdAt": "2026-02-01T09:15:00.000Z",
//!       "updatedAt": "2026-02-01T11:40:00.000Z",
//!       "title": "Parser rewrite"
//!     }
//!   },
//!   "metadata": { "totalCount": 1, "lastUpdated": "2026-02-01T11:40:00.000Z" }
//! }
//! ```
//!
//! Every mutation loads the whole document, changes it in memory and writes it
//! back through [`write_with_backup`](crate::atomic::write_with_backup).
//! There is no cross-process locking: concurrent writers race and the last
//! one wins, but nobody ever reads a half-written file.

use crate::atomic::{backup_path, write_with_backup};
use crate::error::{Result, SeshError};
use crate::{iso_timestamp, Clock, SystemClock};
use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, warn};

/// Current alias index format version.
pub const ALIAS_VERSION: &str = "1.0";

/// Names that cannot be used as aliases (compared case-insensitively).
pub const RESERVED_ALIASES: [&str; 6] = ["list", "help", "remove", "delete", "create", "set"];

/// One alias entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AliasEntry {
    /// Location of the aliased session.
    pub session_path: String,
    /// When the alias was first created (ISO-8601).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    /// When the alias was last changed (ISO-8601).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
    /// Optional human title.
    #[serde(default)]
    pub title: Option<String>,
}

/// Summary recomputed on every save.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexMetadata {
    /// Number of aliases.
    pub total_count: usize,
    /// When the index was last written (ISO-8601).
    pub last_updated: String,
}

/// The alias index file, fully loaded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AliasDocument {
    /// Format version.
    pub version: String,
    /// Alias name to entry.
    pub aliases: BTreeMap<String, AliasEntry>,
    /// Derived summary; never trusted, always recomputed before saving.
    pub metadata: IndexMetadata,
}

impl AliasDocument {
    fn empty(now: &str) -> Self {
        Self {
            version: ALIAS_VERSION.to_string(),
            aliases: BTreeMap::new(),
            metadata: IndexMetadata {
                total_count: 0,
                last_updated: now.to_string(),
            },
        }
    }

    /// Builds a document from parsed JSON, backfilling what is missing.
    ///
    /// Returns `None` when the value has no `aliases` object.
    fn from_value(value: &Value, now: &str) -> Option<Self> {
        let raw_aliases = value.get("aliases")?.as_object()?;

        let mut aliases = BTreeMap::new();
        for (name, raw) in raw_aliases {
            match AliasEntry::deserialize(raw) {
                Ok(entry) => {
                    aliases.insert(name.clone(), entry);
                }
                Err(e) => warn!("Skipping malformed alias '{}': {}", name, e),
            }
        }

        let version = value
            .get("version")
            .and_then(Value::as_str)
            .filter(|v| !v.is_empty())
            .unwrap_or(ALIAS_VERSION)
            .to_string();

        let metadata = value
            .get("metadata")
            .and_then(|m| IndexMetadata::deserialize(m).ok())
            .unwrap_or_else(|| IndexMetadata {
                total_count: aliases.len(),
                last_updated: now.to_string(),
            });

        Some(Self {
            version,
            aliases,
            metadata,
        })
    }
}

/// Result of resolving an alias.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedAlias {
    /// Alias name.
    pub alias: String,
    /// Location of the aliased session.
    pub session_path: String,
    /// When the alias was created.
    pub created_at: Option<String>,
    /// Optional human title.
    pub title: Option<String>,
}

/// An alias as returned by listings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AliasSummary {
    /// Alias name.
    pub name: String,
    /// Location of the aliased session.
    pub session_path: String,
    /// When the alias was created.
    pub created_at: Option<String>,
    /// When the alias was last changed.
    pub updated_at: Option<String>,
    /// Optional human title.
    pub title: Option<String>,
}

impl AliasSummary {
    fn new(name: &str, entry: &AliasEntry) -> Self {
        Self {
            name: name.to_string(),
            session_path: entry.session_path.clone(),
            created_at: entry.created_at.clone(),
            updated_at: entry.updated_at.clone(),
            title: entry.title.clone(),
        }
    }

    /// Last touch time: `updated_at`, falling back to `created_at`.
    fn touched_at(&self) -> Option<DateTime<FixedOffset>> {
        self.updated_at
            .as_deref()
            .or(self.created_at.as_deref())
            .and_then(|t| DateTime::parse_from_rfc3339(t).ok())
    }
}

/// Options for [`AliasIndex::list`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AliasListOptions {
    /// Case-insensitive substring matched against name or title.
    pub search: Option<String>,
    /// Maximum number of aliases; `None` or 0 means no limit.
    pub limit: Option<usize>,
}

/// Outcome of [`AliasIndex::set`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AliasSet {
    /// Alias name.
    pub alias: String,
    /// Location the alias now points at.
    pub session_path: String,
    /// Title stored with the alias.
    pub title: Option<String>,
    /// Whether the alias did not exist before.
    pub is_new: bool,
}

/// Outcome of [`AliasIndex::delete`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AliasDeleted {
    /// Alias name.
    pub alias: String,
    /// Location the alias pointed at.
    pub session_path: String,
}

/// Outcome of [`AliasIndex::rename`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AliasRenamed {
    /// Previous alias name.
    pub old_alias: String,
    /// New alias name.
    pub new_alias: String,
    /// Location the alias points at.
    pub session_path: String,
}

/// Outcome of [`AliasIndex::update_title`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AliasTitleUpdated {
    /// Alias name.
    pub alias: String,
    /// New title.
    pub title: Option<String>,
}

/// An alias dropped by [`AliasIndex::cleanup`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RemovedAlias {
    /// Alias name.
    pub name: String,
    /// Location that no longer exists.
    pub session_path: String,
}

/// Report from [`AliasIndex::cleanup`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CleanupReport {
    /// Aliases inspected.
    pub total_checked: usize,
    /// Aliases removed. Zero when the index could not be saved.
    pub removed: usize,
    /// Details of the removed aliases.
    pub removed_aliases: Vec<RemovedAlias>,
    /// Stale aliases were found but the index could not be saved, so they
    /// are all still there.
    pub save_failed: bool,
}

/// Returns true if `name` is non-empty and only uses `[A-Za-z0-9_-]`.
fn is_valid_charset(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

/// Checks an alias name for emptiness, charset and reserved words.
fn validate_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(SeshError::EmptyAliasName);
    }
    if !is_valid_charset(name) {
        return Err(SeshError::InvalidAliasName(name.to_string()));
    }
    let lower = name.to_ascii_lowercase();
    if RESERVED_ALIASES.contains(&lower.as_str()) {
        return Err(SeshError::ReservedAliasName(name.to_string()));
    }
    Ok(())
}

/// Manages the alias index file.
///
/// The handle holds no alias state; every call reloads the file.
pub struct AliasIndex {
    path: PathBuf,
    clock: Arc<dyn Clock>,
}

impl AliasIndex {
    /// Creates a handle for the alias index at `path`.
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            clock: Arc::new(SystemClock),
        }
    }

    /// Replaces the clock used for timestamps.
    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    /// Returns the index file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn now(&self) -> String {
        iso_timestamp(self.clock.now())
    }

    /// Loads the index.
    ///
    /// A missing, empty or malformed file yields an empty index. If the file
    /// is missing but a `.bak` copy survived an interrupted save, the backup
    /// is loaded instead.
    pub fn load(&self) -> AliasDocument {
        let now = self.now();

        let Some(content) = self.read_raw() else {
            return AliasDocument::empty(&now);
        };
        if content.trim().is_empty() {
            return AliasDocument::empty(&now);
        }

        match serde_json::from_str::<Value>(&content) {
            Ok(value) => AliasDocument::from_value(&value, &now).unwrap_or_else(|| {
                warn!(
                    "Invalid alias file structure in {}, resetting",
                    self.path.display()
                );
                AliasDocument::empty(&now)
            }),
            Err(e) => {
                warn!("Error parsing alias file {}: {}", self.path.display(), e);
                AliasDocument::empty(&now)
            }
        }
    }

    fn read_raw(&self) -> Option<String> {
        let source = if self.path.exists() {
            self.path.clone()
        } else {
            let backup = backup_path(&self.path);
            if !backup.exists() {
                return None;
            }
            warn!(
                "Alias file {} missing, loading surviving backup",
                self.path.display()
            );
            backup
        };

        match fs::read_to_string(&source) {
            Ok(content) => Some(content),
            Err(e) => {
                warn!("Error reading alias file {}: {}", source.display(), e);
                None
            }
        }
    }

    /// Saves the index atomically, recomputing its metadata first.
    ///
    /// Returns false if the file could not be written; the previous file is
    /// left in place.
    pub fn save(&self, doc: &mut AliasDocument) -> bool {
        doc.metadata = IndexMetadata {
            total_count: doc.aliases.len(),
            last_updated: self.now(),
        };

        let result = serde_json::to_string_pretty(doc)
            .map_err(SeshError::from)
            .and_then(|content| write_with_backup(&self.path, content.as_bytes()));

        match result {
            Ok(()) => {
                debug!(
                    "Saved {} alias(es) to {}",
                    doc.metadata.total_count,
                    self.path.display()
                );
                true
            }
            Err(e) => {
                warn!("Error saving aliases: {}", e);
                false
            }
        }
    }

    /// Resolves an alias. Invalid names and unknown aliases give `None`.
    pub fn resolve(&self, alias: &str) -> Option<ResolvedAlias> {
        if !is_valid_charset(alias) {
            return None;
        }

        let doc = self.load();
        let entry = doc.aliases.get(alias)?;
        Some(ResolvedAlias {
            alias: alias.to_string(),
            session_path: entry.session_path.clone(),
            created_at: entry.created_at.clone(),
            title: entry.title.clone(),
        })
    }

    /// Creates or updates an alias.
    ///
    /// Updating keeps the original `created_at`. An empty title is stored as
    /// no title.
    pub fn set(&self, alias: &str, session_path: &str, title: Option<&str>) -> Result<AliasSet> {
        validate_name(alias)?;

        let mut doc = self.load();
        let now = self.now();
        let existing = doc.aliases.get(alias);
        let is_new = existing.is_none();
        let created_at = existing
            .and_then(|e| e.created_at.clone())
            .unwrap_or_else(|| now.clone());
        let title = title.filter(|t| !t.is_empty()).map(str::to_string);

        doc.aliases.insert(
            alias.to_string(),
            AliasEntry {
                session_path: session_path.to_string(),
                created_at: Some(created_at),
                updated_at: Some(now),
                title: title.clone(),
            },
        );

        if !self.save(&mut doc) {
            return Err(SeshError::PersistFailed("save alias"));
        }

        Ok(AliasSet {
            alias: alias.to_string(),
            session_path: session_path.to_string(),
            title,
            is_new,
        })
    }

    /// Lists aliases, most recently touched first.
    pub fn list(&self, options: &AliasListOptions) -> Vec<AliasSummary> {
        let doc = self.load();
        let mut aliases: Vec<AliasSummary> = doc
            .aliases
            .iter()
            .map(|(name, entry)| AliasSummary::new(name, entry))
            .collect();

        aliases.sort_by_key(|a| std::cmp::Reverse(a.touched_at()));

        if let Some(search) = options.search.as_deref().filter(|s| !s.is_empty()) {
            let needle = search.to_lowercase();
            aliases.retain(|a| {
                a.name.to_lowercase().contains(&needle)
                    || a
                        .title
                        .as_deref()
                        .is_some_and(|t| t.to_lowercase().contains(&needle))
            });
        }

        if let Some(limit) = options.limit.filter(|l| *l > 0) {
            aliases.truncate(limit);
        }

        aliases
    }

    /// Deletes an alias.
    pub fn delete(&self, alias: &str) -> Result<AliasDeleted> {
        let mut doc = self.load();
        let removed = doc
            .aliases
            .remove(alias)
            .ok_or_else(|| SeshError::AliasNotFound(alias.to_string()))?;

        if !self.save(&mut doc) {
            return Err(SeshError::PersistFailed("delete alias"));
        }

        Ok(AliasDeleted {
            alias: alias.to_string(),
            session_path: removed.session_path,
        })
    }

    /// Renames an alias, keeping its target, title and creation time.
    ///
    /// Either both the removal of `old` and the insertion of `new` are saved,
    /// or neither is.
    pub fn rename(&self, old: &str, new: &str) -> Result<AliasRenamed> {
        let mut doc = self.load();

        if !doc.aliases.contains_key(old) {
            return Err(SeshError::AliasNotFound(old.to_string()));
        }
        validate_name(new)?;
        if doc.aliases.contains_key(new) {
            return Err(SeshError::AliasExists(new.to_string()));
        }

        let Some(mut entry) = doc.aliases.remove(old) else {
            return Err(SeshError::AliasNotFound(old.to_string()));
        };
        let original = entry.clone();
        entry.updated_at = Some(self.now());
        let session_path = entry.session_path.clone();
        doc.aliases.insert(new.to_string(), entry);

        if !self.save(&mut doc) {
            doc.aliases.remove(new);
            doc.aliases.insert(old.to_string(), original);
            return Err(SeshError::PersistFailed("rename alias"));
        }

        Ok(AliasRenamed {
            old_alias: old.to_string(),
            new_alias: new.to_string(),
            session_path,
        })
    }

    /// Sets or clears an alias title.
    pub fn update_title(&self, alias: &str, title: Option<&str>) -> Result<AliasTitleUpdated> {
        let mut doc = self.load();
        let now = self.now();
        let entry = doc
            .aliases
            .get_mut(alias)
            .ok_or_else(|| SeshError::AliasNotFound(alias.to_string()))?;

        entry.title = title.map(str::to_string);
        entry.updated_at = Some(now);

        if !self.save(&mut doc) {
            return Err(SeshError::PersistFailed("update alias title"));
        }

        Ok(AliasTitleUpdated {
            alias: alias.to_string(),
            title: title.map(str::to_string),
        })
    }

    /// All aliases pointing at `session_path`.
    pub fn aliases_for_session(&self, session_path: &str) -> Vec<AliasSummary> {
        self.load()
            .aliases
            .iter()
            .filter(|(_, entry)| entry.session_path == session_path)
            .map(|(name, entry)| AliasSummary::new(name, entry))
            .collect()
    }

    /// Removes aliases whose session no longer exists.
    ///
    /// `exists` is called with each alias's session path. The index is saved
    /// once at the end, and only if something was removed. If that save
    /// fails nothing was removed, and the report says so.
    pub fn cleanup(&self, exists: impl Fn(&str) -> bool) -> CleanupReport {
        let mut doc = self.load();
        let total_checked = doc.aliases.len();

        let mut removed_aliases = Vec::new();
        doc.aliases.retain(|name, entry| {
            if exists(&entry.session_path) {
                true
            } else {
                removed_aliases.push(RemovedAlias {
                    name: name.clone(),
                    session_path: entry.session_path.clone(),
                });
                false
            }
        });

        if !removed_aliases.is_empty() && !self.save(&mut doc) {
            warn!(
                "Failed to save alias index; {} stale alias(es) kept",
                removed_aliases.len()
            );
            return CleanupReport {
                total_checked,
                save_failed: true,
                ..CleanupReport::default()
            };
        }

        CleanupReport {
            total_checked,
            removed: removed_aliases.len(),
            removed_aliases,
            save_failed: false,
        }
    }

    /// Resolves `input` as an alias, or returns it unchanged.
    pub fn resolve_alias_or_id(&self, input: &str) -> String {
        match self.resolve(input) {
            Some(resolved) => resolved.session_path,
            None => input.to_string(),
        }
    }
}

//! Store handle tying a content root's sessions and aliases together.

use crate::aliases::{AliasIndex, CleanupReport};
use crate::config::Config;
use crate::error::Result;
use crate::repository::{SessionRecord, SessionRepository};
use crate::Clock;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Session store handle.
///
/// Owns the repository and alias index for one content root, as laid out by
/// its `sesh.toml`.
pub struct SessionStore {
    root: PathBuf,
    config: Config,
    repository: SessionRepository,
    aliases: AliasIndex,
}

impl SessionStore {
    /// Opens the store rooted at `root`.
    ///
    /// Nothing is created on disk; a root without `sesh.toml` uses defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if `sesh.toml` exists but cannot be read or parsed.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use sesh_core::SessionStore;
    ///
    /// let store = SessionStore::open("/home/me/.claude").unwrap();
    /// let recent = store.repository().recent(store.config().listing.recent_days);
    /// ```
    pub fn open(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        let config = Config::load(&root)?;

        let sessions_dir = config.store.sessions_dir(&root);
        let aliases_path = config.store.aliases_path(&root);
        debug!(
            "Opened store: sessions={}, aliases={}",
            sessions_dir.display(),
            aliases_path.display()
        );

        Ok(Self {
            repository: SessionRepository::new(sessions_dir),
            aliases: AliasIndex::new(aliases_path),
            root,
            config,
        })
    }

    /// Replaces the clock of both the repository and the alias index.
    pub fn with_clock<C>(mut self, clock: C) -> Self
    where
        C: Clock + Clone + 'static,
    {
        self.repository = self.repository.with_clock(clock.clone());
        self.aliases = self.aliases.with_clock(clock);
        self
    }

    /// Returns the content root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Returns the loaded configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Returns the session repository.
    pub fn repository(&self) -> &SessionRepository {
        &self.repository
    }

    /// Returns the alias index.
    pub fn aliases(&self) -> &AliasIndex {
        &self.aliases
    }

    /// Drops aliases whose session file is gone.
    pub fn cleanup_aliases(&self) -> CleanupReport {
        self.aliases
            .cleanup(|path| self.repository.exists(Path::new(path)))
    }

    /// Finds a session by alias, file path or id.
    ///
    /// An alias wins over everything else. An alias whose target no longer
    /// exists yields `None` rather than falling back to id matching.
    pub fn find_session(&self, name_or_id: &str, include_content: bool) -> Option<SessionRecord> {
        if let Some(resolved) = self.aliases.resolve(name_or_id) {
            let found = self
                .repository
                .get_by_path(Path::new(&resolved.session_path), include_content);
            if found.is_none() {
                warn!(
                    "Alias '{}' points at missing session {}",
                    name_or_id, resolved.session_path
                );
            }
            return found;
        }

        let as_path = Path::new(name_or_id);
        if as_path.components().count() > 1 && as_path.is_file() {
            return self.repository.get_by_path(as_path, include_content);
        }

        self.repository.get_by_id(name_or_id, include_content)
    }
}

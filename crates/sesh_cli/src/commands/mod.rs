//! CLI commands.

pub mod alias;
pub mod sessions;

use anyhow::{Context, Result};
use sesh_core::SessionStore;
use std::path::PathBuf;

/// Opens the store at `root`, or at `~/.claude` when no root was given.
pub fn open_store(root: Option<PathBuf>) -> Result<SessionStore> {
    let root = match root {
        // Aliases store full session paths, so keep the root absolute
        Some(root) if root.is_relative() => std::env::current_dir()
            .context("cannot determine current directory")?
            .join(root),
        Some(root) => root,
        None => dirs::home_dir()
            .context("cannot determine home directory; pass --root")?
            .join(".claude"),
    };

    SessionStore::open(&root).with_context(|| format!("failed to open store at {}", root.display()))
}

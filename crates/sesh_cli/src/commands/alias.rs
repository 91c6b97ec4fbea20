//! Alias management commands.

use anyhow::{Context, Result};
use console::style;
use sesh_core::{AliasListOptions, SeshError, SessionStore};

/// Point an alias at a session.
pub fn set(store: &SessionStore, name: &str, target: &str, title: Option<&str>) -> Result<()> {
    let record = store
        .find_session(target, false)
        .ok_or_else(|| SeshError::SessionNotFound(target.to_string()))?;
    let session_path = record.path.to_string_lossy();

    let set = store.aliases().set(name, &session_path, title)?;

    let verb = if set.is_new { "Created" } else { "Updated" };
    println!(
        "{} {} alias {} -> {}",
        style("✓").green(),
        verb,
        style(&set.alias).cyan(),
        record.filename
    );
    if let Some(title) = &set.title {
        println!("  Title: {}", title);
    }

    Ok(())
}

/// List aliases.
pub fn list(store: &SessionStore, search: Option<String>, limit: Option<usize>) -> Result<()> {
    let aliases = store.aliases().list(&AliasListOptions { search, limit });

    if aliases.is_empty() {
        println!("No aliases");
        return Ok(());
    }

    let width = aliases.iter().map(|a| a.name.len()).max().unwrap_or(0);
    for alias in &aliases {
        let target = std::path::Path::new(&alias.session_path);
        let shown = target
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| alias.session_path.clone());
        let marker = if target.is_file() {
            style(" ").dim()
        } else {
            style("!").red()
        };

        print!("{} {:<width$}  {}", marker, style(&alias.name).cyan(), shown);
        if let Some(title) = &alias.title {
            print!("  {}", style(title).dim());
        }
        println!();
    }

    if aliases.iter().any(|a| !std::path::Path::new(&a.session_path).is_file()) {
        println!();
        println!(
            "{} '!' marks aliases whose session is gone; run {}",
            style("Note:").yellow(),
            style("sesh alias cleanup").cyan()
        );
    }

    Ok(())
}

/// Remove an alias.
pub fn remove(store: &SessionStore, name: &str) -> Result<()> {
    let deleted = store.aliases().delete(name)?;
    println!(
        "{} Removed alias {} (was {})",
        style("✓").green(),
        style(&deleted.alias).cyan(),
        deleted.session_path
    );
    Ok(())
}

/// Rename an alias.
pub fn rename(store: &SessionStore, old: &str, new: &str) -> Result<()> {
    let renamed = store
        .aliases()
        .rename(old, new)
        .with_context(|| format!("failed to rename alias '{}'", old))?;
    println!(
        "{} Renamed {} -> {}",
        style("✓").green(),
        renamed.old_alias,
        style(&renamed.new_alias).cyan()
    );
    Ok(())
}

/// Set or clear an alias title.
pub fn title(store: &SessionStore, name: &str, title: Option<&str>) -> Result<()> {
    let updated = store.aliases().update_title(name, title)?;
    match updated.title {
        Some(title) => println!(
            "{} Title of {} set to \"{}\"",
            style("✓").green(),
            style(&updated.alias).cyan(),
            title
        ),
        None => println!(
            "{} Title of {} cleared",
            style("✓").green(),
            style(&updated.alias).cyan()
        ),
    }
    Ok(())
}

/// Remove aliases pointing at missing sessions.
pub fn cleanup(store: &SessionStore) -> Result<()> {
    let report = store.cleanup_aliases();

    println!("{}", style("Alias Cleanup Report:").bold());
    println!("  Aliases checked: {}", style(report.total_checked).cyan());
    println!(
        "  Aliases removed: {}",
        if report.removed > 0 {
            style(report.removed).yellow()
        } else {
            style(report.removed).green()
        }
    );

    for removed in &report.removed_aliases {
        println!(
            "  {} {} -> {}",
            style("×").red(),
            removed.name,
            removed.session_path
        );
    }

    if report.save_failed {
        return Err(SeshError::PersistFailed("remove stale aliases").into());
    }

    Ok(())
}

//! Session browsing and recording commands.

use anyhow::{anyhow, Context, Result};
use chrono::{Local, NaiveDate};
use console::style;
use sesh_core::{
    derive_short_id, format_size, AliasListOptions, ListOptions, Recorded, SeshError,
    SessionRecord, SessionStore,
};
use std::collections::HashMap;

/// Environment variable carrying the assistant's session token.
const SESSION_TOKEN_VAR: &str = "CLAUDE_SESSION_ID";

/// Alias names per session path, at most `preview` each.
fn alias_names_by_path(store: &SessionStore, preview: usize) -> HashMap<String, Vec<String>> {
    let mut by_path: HashMap<String, Vec<String>> = HashMap::new();
    for alias in store.aliases().list(&AliasListOptions::default()) {
        let names = by_path.entry(alias.session_path).or_default();
        if names.len() < preview {
            names.push(alias.name);
        }
    }
    by_path
}

fn print_row(record: &SessionRecord, aliases: Option<&Vec<String>>) {
    let title = record
        .detail
        .as_ref()
        .map(|d| d.metadata.title_or_default().to_string())
        .unwrap_or_default();

    let label = if record.identity.is_some() && !record.is_legacy() {
        style(record.label().to_string()).cyan()
    } else {
        style(record.label().to_string()).dim()
    };
    let date = record
        .date()
        .map_or_else(|| "-".to_string(), |d| d.to_string());

    print!(
        "  {:<10}  {:<12} {:>8}  {}",
        date,
        label,
        format_size(record.size),
        title
    );
    if let Some(names) = aliases.filter(|n| !n.is_empty()) {
        print!("  {}", style(format!("[{}]", names.join(", "))).green());
    }
    println!();
}

fn with_titles(store: &SessionStore, record: SessionRecord) -> SessionRecord {
    store
        .repository()
        .get_by_path(&record.path, true)
        .unwrap_or(record)
}

/// List sessions.
pub fn list(
    store: &SessionStore,
    date: Option<&str>,
    search: Option<String>,
    limit: Option<usize>,
    offset: usize,
) -> Result<()> {
    let date = date
        .map(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d"))
        .transpose()
        .context("--date must be YYYY-MM-DD")?;

    let listing = &store.config().listing;
    let page = store.repository().list(&ListOptions {
        limit: limit.unwrap_or(listing.page_size),
        offset,
        date,
        search,
    });

    if page.sessions.is_empty() {
        println!("No sessions found in {}", store.repository().dir().display());
        return Ok(());
    }

    let aliases = alias_names_by_path(store, listing.alias_preview);
    for record in page.sessions {
        let record = with_titles(store, record);
        print_row(&record, aliases.get(&record.path.to_string_lossy().to_string()));
    }

    println!();
    println!(
        "Showing {}-{} of {} session(s)",
        (page.offset + 1).min(page.total),
        (page.offset + page.limit).min(page.total),
        page.total
    );
    if page.has_more {
        println!(
            "  {} sesh list --offset {}",
            style("More:").cyan(),
            page.offset + page.limit
        );
    }

    Ok(())
}

/// Show a single session.
pub fn show(store: &SessionStore, target: &str, raw: bool) -> Result<()> {
    let record = store
        .find_session(target, true)
        .ok_or_else(|| SeshError::SessionNotFound(target.to_string()))?;
    let detail = record
        .detail
        .as_ref()
        .ok_or_else(|| anyhow!("session {} has no readable content", record.filename))?;

    if raw {
        print!("{}", detail.content.as_deref().unwrap_or_default());
        return Ok(());
    }

    let meta = &detail.metadata;
    println!("{}", style(meta.title_or_default()).bold());
    println!("  File:     {}", record.path.display());
    let date = meta
        .date
        .clone()
        .or_else(|| record.date().map(|d| d.to_string()))
        .unwrap_or_else(|| "-".to_string());
    println!("  Id:       {}", record.label());
    println!("  Date:     {}", date);
    if let Some(started) = &meta.started {
        println!("  Started:  {}", started);
    }
    if let Some(updated) = &meta.last_updated {
        println!("  Updated:  {}", updated);
    }
    println!(
        "  Modified: {}",
        record.modified.with_timezone(&Local).format("%Y-%m-%d %H:%M")
    );
    println!("  Size:     {}", format_size(record.size));

    let aliases = store
        .aliases()
        .aliases_for_session(&record.path.to_string_lossy());
    if !aliases.is_empty() {
        let names: Vec<&str> = aliases.iter().map(|a| a.name.as_str()).collect();
        println!("  Aliases:  {}", style(names.join(", ")).green());
    }

    let stats = &detail.stats;
    println!(
        "  Items:    {}/{} completed, {} in progress",
        stats.completed_items, stats.total_items, stats.in_progress_items
    );

    if !meta.completed.is_empty() {
        println!();
        println!("{}", style("Completed:").bold());
        for item in &meta.completed {
            println!("  {} {}", style("✓").green(), item);
        }
    }
    if !meta.in_progress.is_empty() {
        println!();
        println!("{}", style("In progress:").bold());
        for item in &meta.in_progress {
            println!("  {} {}", style("○").yellow(), item);
        }
    }
    if !meta.notes.is_empty() {
        println!();
        println!("{}", style("Notes for next session:").bold());
        println!("{}", meta.notes);
    }
    if !meta.context.is_empty() {
        println!();
        println!("{}", style("Context to load:").bold());
        println!("{}", meta.context);
    }

    Ok(())
}

/// List recently modified sessions.
pub fn recent(store: &SessionStore, days: Option<u32>) -> Result<()> {
    let listing = &store.config().listing;
    let days = days.unwrap_or(listing.recent_days);
    let sessions = store.repository().recent(days);

    if sessions.is_empty() {
        println!("No sessions modified in the last {} day(s)", days);
        return Ok(());
    }

    println!(
        "{} session(s) modified in the last {} day(s):",
        sessions.len(),
        days
    );
    let aliases = alias_names_by_path(store, listing.alias_preview);
    for record in sessions {
        let record = with_titles(store, record);
        print_row(&record, aliases.get(&record.path.to_string_lossy().to_string()));
    }

    Ok(())
}

/// Create or refresh today's session file.
pub fn record(store: &SessionStore, id: Option<&str>) -> Result<()> {
    let short_id = match id {
        Some(id) => id.to_string(),
        None => {
            let token = std::env::var(SESSION_TOKEN_VAR).ok();
            let cwd = std::env::current_dir().context("cannot determine current directory")?;
            let project = cwd.file_name().map(|n| n.to_string_lossy().to_string());
            derive_short_id(token.as_deref(), project.as_deref())
        }
    };

    match store.repository().record(&short_id)? {
        Recorded::Created(path) => {
            println!("{} Created session file {}", style("✓").green(), path.display())
        }
        Recorded::Updated(path) => {
            println!("{} Updated session file {}", style("✓").green(), path.display())
        }
    }

    Ok(())
}

/// Delete a session file.
pub fn delete(store: &SessionStore, target: &str, prune_aliases: bool) -> Result<()> {
    let record = store
        .find_session(target, false)
        .ok_or_else(|| SeshError::SessionNotFound(target.to_string()))?;

    if !store.repository().delete(&record.path) {
        return Err(anyhow!("failed to delete {}", record.path.display()));
    }
    println!("{} Deleted {}", style("✓").green(), record.path.display());

    let path = record.path.to_string_lossy();
    let dangling = store.aliases().aliases_for_session(&path);
    if dangling.is_empty() {
        return Ok(());
    }

    if prune_aliases {
        for alias in &dangling {
            store
                .aliases()
                .delete(&alias.name)
                .with_context(|| format!("failed to remove alias '{}'", alias.name))?;
            println!("  Removed alias {}", style(&alias.name).cyan());
        }
    } else {
        let names: Vec<&str> = dangling.iter().map(|a| a.name.as_str()).collect();
        println!(
            "  {} alias(es) still point here: {}",
            style("Note:").yellow(),
            names.join(", ")
        );
        println!("  Run {} to remove them", style("sesh alias cleanup").cyan());
    }

    Ok(())
}

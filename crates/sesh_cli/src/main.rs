//! SESH CLI - Command-line interface for assistant session files and aliases.

use anyhow::Result;
use clap::{Parser, Subcommand};
use console::style;
use sesh_core::SeshError;
use std::path::PathBuf;

mod commands;

#[derive(Parser)]
#[command(name = "sesh")]
#[command(about = "Browse and name assistant session files", long_about = None)]
#[command(version)]
struct Cli {
    /// Content root holding sessions/ and the alias index (default: ~/.claude)
    #[arg(long, global = true)]
    root: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List sessions, newest first
    List {
        /// Only sessions from this date (YYYY-MM-DD)
        #[arg(long)]
        date: Option<String>,
        /// Only sessions whose short id contains this text
        #[arg(short, long)]
        search: Option<String>,
        /// Page size (defaults to listing.page_size)
        #[arg(short, long)]
        limit: Option<usize>,
        /// Number of sessions to skip
        #[arg(long, default_value = "0")]
        offset: usize,
    },
    /// Show one session by alias, id or path
    Show {
        /// Alias, short id, filename or path
        target: String,
        /// Print the raw file instead of the summary
        #[arg(long)]
        raw: bool,
    },
    /// List sessions modified in the last few days
    Recent {
        /// Age window in days (defaults to listing.recent_days)
        #[arg(short, long)]
        days: Option<u32>,
    },
    /// Create or refresh today's session file
    Record {
        /// Short id to use instead of deriving one
        #[arg(long)]
        id: Option<String>,
    },
    /// Delete a session file
    Delete {
        /// Alias, short id, filename or path
        target: String,
        /// Also remove aliases pointing at the session
        #[arg(long)]
        prune_aliases: bool,
    },
    /// Manage session aliases
    Alias {
        #[command(subcommand)]
        command: AliasCommands,
    },
}

#[derive(Subcommand)]
enum AliasCommands {
    /// Point an alias at a session
    Set {
        /// Alias name ([A-Za-z0-9_-]+)
        name: String,
        /// Session id, filename or path
        target: String,
        /// Optional title
        #[arg(short, long)]
        title: Option<String>,
    },
    /// List aliases, most recently changed first
    List {
        /// Filter by name or title (case-insensitive)
        #[arg(short, long)]
        search: Option<String>,
        /// Maximum number of aliases
        #[arg(short, long)]
        limit: Option<usize>,
    },
    /// Remove an alias
    Rm {
        /// Alias name
        name: String,
    },
    /// Rename an alias
    Rename {
        /// Current name
        old: String,
        /// New name
        new: String,
    },
    /// Set or clear an alias title
    Title {
        /// Alias name
        name: String,
        /// New title (omit to clear)
        title: Option<String>,
    },
    /// Remove aliases whose session file no longer exists
    Cleanup,
}

fn main() -> Result<()> {
    // Initialize tracing subscriber
    // Respects RUST_LOG environment variable (e.g., RUST_LOG=debug)
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let result = run(cli);

    if let Err(e) = &result {
        if let Some(hint) = e
            .downcast_ref::<SeshError>()
            .and_then(SeshError::recovery_suggestion)
        {
            eprintln!("{} {}", style("hint:").cyan(), hint);
        }
    }

    result
}

fn run(cli: Cli) -> Result<()> {
    let store = commands::open_store(cli.root)?;

    match cli.command {
        Commands::List {
            date,
            search,
            limit,
            offset,
        } => commands::sessions::list(&store, date.as_deref(), search, limit, offset),
        Commands::Show { target, raw } => commands::sessions::show(&store, &target, raw),
        Commands::Recent { days } => commands::sessions::recent(&store, days),
        Commands::Record { id } => commands::sessions::record(&store, id.as_deref()),
        Commands::Delete {
            target,
            prune_aliases,
        } => commands::sessions::delete(&store, &target, prune_aliases),
        Commands::Alias { command } => match command {
            AliasCommands::Set {
                name,
                target,
                title,
            } => commands::alias::set(&store, &name, &target, title.as_deref()),
            AliasCommands::List { search, limit } => commands::alias::list(&store, search, limit),
            AliasCommands::Rm { name } => commands::alias::remove(&store, &name),
            AliasCommands::Rename { old, new } => commands::alias::rename(&store, &old, &new),
            AliasCommands::Title { name, title } => {
                commands::alias::title(&store, &name, title.as_deref())
            }
            AliasCommands::Cleanup => commands::alias::cleanup(&store),
        },
    }
}

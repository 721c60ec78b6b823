//! Command-line front end for the review store.
//!
//! The store is built once here and handed to every command.

use anyhow::{Context, Result, bail};
use chrono::{DateTime, Local, Offset, TimeZone, Utc};
use clap::{Parser, Subcommand};
use spaced_review::export::{export_json_to_path, import_json};
use spaced_review::models::sm2::{format_interval, preview_intervals};
use spaced_review::*;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "review")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Spaced repetition flashcards from the terminal")]
struct Cli {
    /// Directory holding the item collection
    #[arg(long, env = "SPACED_REVIEW_DATA_DIR", global = true)]
    data_dir: Option<PathBuf>,

    /// Storage backend: json or sqlite
    #[arg(long, env = "SPACED_REVIEW_BACKEND", default_value = "json", global = true)]
    backend: Backend,

    /// Refuse to start when stored items cannot be decoded
    #[arg(long, global = true)]
    strict: bool,

    /// Pretend the current time is this RFC 3339 timestamp
    #[arg(long, global = true)]
    now: Option<DateTime<Utc>>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Save a front/back pair (existing pairs keep their progress)
    Add { front: String, back: String },

    /// Change the text of an item without touching its schedule
    Edit {
        id: ItemId,
        front: String,
        back: String,
    },

    /// List every item
    List,

    /// List items due today
    Due,

    /// Record a grade: again, hard, good, easy (or 1-4)
    Grade { id: ItemId, grade: Grade },

    /// Show the interval each grade would give
    Preview { id: ItemId },

    /// Delete one item
    Remove { id: ItemId },

    /// Delete every item
    Clear {
        /// Skip confirmation prompt
        #[arg(long)]
        yes: bool,
    },

    /// Show collection statistics
    Stats {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// Add a few starter items if the collection is empty
    Seed,

    /// Export all items to a JSON file
    Export { path: PathBuf },

    /// Merge items from an exported JSON file
    Import { path: PathBuf },

    /// Review due items interactively
    Session,
}

const STARTER_ITEMS: &[(&str, &str)] = &[
    ("cześć", "hello"),
    ("dziękuję", "thank you"),
    ("proszę", "please"),
];

fn format_date(time: DateTime<Utc>) -> String {
    let datetime: DateTime<Local> = time.into();
    datetime.format("%Y-%m-%d").to_string()
}

fn print_item(item: &ReviewItem) {
    println!(
        "{}  {} -> {}  (due {}, interval {}, ease {:.2}, reps {})",
        item.id,
        item.front,
        item.back,
        format_date(item.due_date),
        format_interval(item.interval_days),
        item.ease,
        item.repetitions
    );
}

fn build_clock(now: Option<DateTime<Utc>>) -> Arc<dyn Clock> {
    match now {
        Some(now) => {
            let offset = Local.offset_from_utc_datetime(&now.naive_utc()).fix();
            Arc::new(FixedClock::new(now, offset))
        }
        None => Arc::new(SystemClock),
    }
}

fn confirm(prompt: &str) -> Result<bool> {
    print!("{} [y/N] ", prompt);
    io::stdout().flush()?;
    let mut answer = String::new();
    io::stdin().lock().read_line(&mut answer)?;
    Ok(matches!(answer.trim(), "y" | "Y" | "yes"))
}

fn run_session(store: &ReviewStore) -> Result<()> {
    let mut session = ReviewSession::start(store, store.clock().now());
    if session.is_completed() {
        println!("Nothing due today.");
        return Ok(());
    }

    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();
    let mut round = 0;

    while let Some(item) = session.current().cloned() {
        if session.round_number() != round {
            round = session.round_number();
            println!("\n{}", session.phase_message());
        }

        print!("\n{}  (press Enter to reveal) ", item.front);
        io::stdout().flush()?;
        if lines.next().transpose()?.is_none() {
            break;
        }
        println!("{}", item.back);

        let grade = loop {
            print!("Grade [1 again, 2 hard, 3 good, 4 easy]: ");
            io::stdout().flush()?;
            let Some(line) = lines.next().transpose()? else {
                return Ok(());
            };
            match line.parse::<Grade>() {
                Ok(grade) => break grade,
                Err(e) => println!("{}", e),
            }
        };

        match session.grade_current(grade, store.clock().now()) {
            Ok(Some(updated)) => println!("Next review in {}", format_interval(updated.interval_days)),
            Ok(None) => break,
            Err(StoreError::ItemNotFound(id)) => println!("Item {} was removed, skipping", id),
            Err(e) => return Err(anyhow::Error::new(e).context("Failed to record grade")),
        }
    }

    println!(
        "\nSession finished: {} reviews over {} round(s).",
        session.reviewed_count(),
        session.round_number()
    );
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(io::stderr)
        .with_target(false)
        .init();

    let data_dir = match cli.data_dir {
        Some(dir) => dir,
        None => StoreConfig::default_data_dir().context("Could not determine a data directory")?,
    };
    let policy = if cli.strict {
        CorruptDataPolicy::Fail
    } else {
        CorruptDataPolicy::StartEmpty
    };
    let config = StoreConfig::new(data_dir)
        .with_backend(cli.backend)
        .with_corrupt_policy(policy);

    let store = config
        .open_store(build_clock(cli.now))
        .with_context(|| format!("Failed to open {}", config.items_path().display()))?;
    if let LoadOutcome::Recovered { reason } = store.load_outcome() {
        eprintln!("warning: stored items were unreadable ({}); starting empty", reason);
    }

    let now = store.clock().now();
    match cli.command {
        Commands::Add { front, back } => {
            let id = store.add_or_update(front, back)?;
            println!("{}", id);
        }
        Commands::Edit { id, front, back } => {
            let item = store.update_content(id, front, back)?;
            print_item(&item);
        }
        Commands::List => {
            for item in store.items() {
                print_item(&item);
            }
        }
        Commands::Due => {
            let due = store.items_due(now);
            if due.is_empty() {
                println!("Nothing due today.");
            }
            for item in &due {
                print_item(item);
            }
        }
        Commands::Grade { id, grade } => {
            let item = store.record_grade(id, grade, now)?;
            print_item(&item);
        }
        Commands::Preview { id } => {
            let Some(item) = store.get(id) else {
                bail!("Item not found: {}", id);
            };
            for (grade, days) in Grade::ALL.iter().zip(preview_intervals(&item)) {
                println!("{:<6} {}", grade, format_interval(days));
            }
        }
        Commands::Remove { id } => store.remove(id)?,
        Commands::Clear { yes } => {
            if yes || confirm(&format!("Delete all {} items?", store.len()))? {
                store.remove_all()?;
            }
        }
        Commands::Stats { json: true } => {
            println!("{}", serde_json::to_string_pretty(&store.stats(now))?);
        }
        Commands::Stats { json: false } => {
            let stats = store.stats(now);
            println!("Total:    {}", stats.total);
            println!("Due:      {}", stats.due);
            println!("New:      {}", stats.new);
            println!("Learning: {}", stats.learning);
            println!("Mature:   {}", stats.mature);
        }
        Commands::Export { path } => {
            export_json_to_path(&store.items(), now, &path)
                .with_context(|| format!("Failed to export to {}", path.display()))?;
            println!("Exported {} items to {}", store.len(), path.display());
        }
        Commands::Import { path } => {
            let items = import_json(&path)
                .with_context(|| format!("Failed to import {}", path.display()))?;
            let report = store.merge(items)?;
            println!("Added {}, skipped {}", report.added, report.skipped);
        }
        Commands::Seed => {
            let added = store.seed_if_empty(STARTER_ITEMS)?;
            if added == 0 {
                println!("Collection is not empty, nothing seeded.");
            } else {
                println!("Sample data created! ({} items)", added);
            }
        }
        Commands::Session => run_session(&store)?,
    }

    Ok(())
}

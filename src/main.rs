//! filedex - live file index with instant substring search.
//!
//! Indexes the given directories (or a solution JSON file) and answers
//! queries: one-shot with `--query`, or interactively from stdin.

#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

use std::io::BufRead;
use std::path::PathBuf;
use std::sync::mpsc;
use std::time::Duration;

use clap::Parser;
use filedex::{DirectoryEntry, FileRepository, RecordView, SolutionConfig};

/// Live file index with instant substring search
#[derive(Parser, Debug)]
#[command(name = "filedex")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Directories to index
    #[arg(value_name = "DIR")]
    dirs: Vec<PathBuf>,

    /// Solution configuration file (JSON) instead of ad-hoc directories
    #[arg(short, long, env = "FILEDEX_SOLUTION")]
    solution: Option<PathBuf>,

    /// Dot-separated extension include list (e.g. "rs.toml.md")
    #[arg(long, env = "FILEDEX_INCLUDE", conflicts_with = "exclude")]
    include: Option<String>,

    /// Dot-separated extension exclude list
    #[arg(long, env = "FILEDEX_EXCLUDE")]
    exclude: Option<String>,

    /// Do not descend into subdirectories
    #[arg(long)]
    flat: bool,

    /// Keep the index synchronized with live file-system changes
    #[arg(short, long)]
    watch: bool,

    /// Run one query and exit instead of reading queries from stdin
    #[arg(short, long)]
    query: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "FILEDEX_LOG_LEVEL", default_value = "warn")]
    log_level: String,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli.log_level);

    let directories = if let Some(path) = &cli.solution {
        SolutionConfig::load(path)?.directories
    } else {
        cli.dirs
            .iter()
            .map(|dir| DirectoryEntry {
                path: dir.clone(),
                include_filter: cli.include.clone(),
                exclude_filter: cli.exclude.clone(),
                recursive: !cli.flat,
                monitored: cli.watch,
            })
            .collect()
    };
    if directories.is_empty() {
        anyhow::bail!("nothing to index: pass directories or --solution");
    }

    let repository = FileRepository::new();
    repository.add_solution(&directories);

    while repository.pending_scans() > 0 {
        std::thread::sleep(Duration::from_millis(20));
    }

    if let Some(query) = &cli.query {
        print_matches(&run_query(&repository, query)?);
    } else {
        interactive(&repository)?;
    }

    repository.stop();
    Ok(())
}

fn run_query(repository: &FileRepository, query: &str) -> anyhow::Result<Vec<RecordView>> {
    let (tx, rx) = mpsc::channel();
    repository.search(query, move |results| {
        let _ = tx.send(results.iter().collect::<Vec<_>>());
    });
    rx.recv_timeout(Duration::from_secs(10))
        .map_err(|_| anyhow::anyhow!("search did not complete"))
}

fn print_matches(rows: &[RecordView]) {
    for row in rows {
        println!("{}{}\t{}", row.path, row.filename, row.date);
    }
    println!("{} file(s)", rows.len());
}

fn interactive(repository: &FileRepository) -> anyhow::Result<()> {
    let stdin = std::io::stdin();
    for line in stdin.lock().lines() {
        let line = line?;
        let query = line.trim();
        if query == ":q" || query == ":quit" {
            break;
        }
        print_matches(&run_query(repository, query)?);
    }
    Ok(())
}

fn init_tracing(level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

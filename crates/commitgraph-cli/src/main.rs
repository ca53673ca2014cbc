//! Commit graph CLI.
//!
//! Provides the `commitgraph` binary. It reads commit records produced by
//!
//! ```text
//! git log --format='%H%x09%P%x09%an%x09%at%x09%s'
//! ```
//!
//! plus optional `git show-ref` output, lays the history out in rows,
//! collapses the branches named with `--hide` and prints the result.

mod render;

use std::fs;
use std::path::{Path, PathBuf};
use std::process;

use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use tracing::{debug, warn, Level};

use commitgraph_core::{BuildOptions, CommitOrder, CoreError, Graph, GraphBuilder, Refs};

/// Commit graph layout with collapsible branches.
#[derive(Parser)]
#[command(name = "commitgraph", about = "Commit graph layout with collapsible branches")]
struct Cli {
    /// Log progress to stderr.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Available subcommands.
#[derive(Subcommand)]
enum Commands {
    /// Print the visible rows.
    Rows {
        #[command(flatten)]
        input: InputArgs,
    },
    /// Print the branch table.
    Branches {
        #[command(flatten)]
        input: InputArgs,
    },
}

#[derive(Args)]
struct InputArgs {
    /// Path to the commit records, one per line.
    #[arg(short, long)]
    log: PathBuf,

    /// Path to `git show-ref` output naming branch heads.
    #[arg(short, long)]
    refs: Option<PathBuf>,

    /// Input order: oldest-first or newest-first.
    #[arg(short, long, default_value = "oldest-first")]
    order: String,

    /// Collapse the named branch. May be repeated.
    #[arg(long = "hide", value_name = "NAME")]
    hide: Vec<String>,

    /// Print JSON instead of text.
    #[arg(long)]
    json: bool,
}

#[derive(Clone, Copy)]
enum Listing {
    Rows,
    Branches,
}

fn main() {
    let cli = Cli::parse();

    let level = if cli.verbose { Level::DEBUG } else { Level::WARN };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_max_level(level)
        .init();

    let exit_code = match cli.command {
        Commands::Rows { input } => run(&input, Listing::Rows),
        Commands::Branches { input } => run(&input, Listing::Branches),
    };
    process::exit(exit_code);
}

/// Execute a listing subcommand.
///
/// Returns exit code: 0 = success, 1 = malformed input,
/// 2 = graph inconsistency, 3 = I/O error.
fn run(input: &InputArgs, listing: Listing) -> i32 {
    let order = match parse_order(&input.order) {
        Ok(order) => order,
        Err(msg) => {
            eprintln!("Error: {}", msg);
            return 1;
        }
    };

    let log = match read_input(&input.log) {
        Ok(text) => text,
        Err(code) => return code,
    };
    let refs = match &input.refs {
        Some(path) => match read_input(path) {
            Ok(text) => text,
            Err(code) => return code,
        },
        None => String::new(),
    };

    let graph = match build_graph(&log, &refs, order) {
        Ok(graph) => graph,
        Err(e) => {
            eprintln!("Error: {}", e);
            return exit_code(&e);
        }
    };

    for name in &input.hide {
        match graph.branch_by_name(name) {
            Some(branch) => {
                graph.visibility().hide(branch);
            }
            None => warn!(branch = %name, "no branch with this name, not hiding"),
        }
    }

    if let Err(e) = graph.validate() {
        eprintln!("Error: {}", e);
        return exit_code(&e);
    }

    let output = match (listing, input.json) {
        (Listing::Rows, false) => render::format_rows(&render::row_summaries(&graph)),
        (Listing::Rows, true) => to_json(&render::row_summaries(&graph)),
        (Listing::Branches, false) => render::format_branches(&render::branch_summaries(&graph)),
        (Listing::Branches, true) => to_json(&render::branch_summaries(&graph)),
    };
    print!("{}", output);
    if input.json {
        println!();
    }
    0
}

fn read_input(path: &Path) -> Result<String, i32> {
    fs::read_to_string(path).map_err(|e| {
        eprintln!("Error: failed to read '{}': {}", path.display(), e);
        3
    })
}

fn build_graph(log: &str, refs: &str, order: CommitOrder) -> Result<Graph, CoreError> {
    let commits = commitgraph_core::log::parse_log(log)?;
    let refs: Refs = commitgraph_core::log::parse_refs(refs)?;
    debug!(commits = commits.len(), refs = refs.len(), "parsed input");
    GraphBuilder::new(BuildOptions { order })
        .with_refs(refs)
        .build(commits)
}

fn to_json<T: Serialize>(value: &T) -> String {
    serde_json::to_string_pretty(value)
        .unwrap_or_else(|e| format!("{{\"error\": \"failed to serialize output: {}\"}}", e))
}

fn exit_code(error: &CoreError) -> i32 {
    match error {
        CoreError::GraphInconsistency { .. } => 2,
        _ => 1,
    }
}

/// Parse an input order string to `CommitOrder`.
fn parse_order(s: &str) -> Result<CommitOrder, String> {
    match s {
        "oldest-first" | "oldest" => Ok(CommitOrder::OldestFirst),
        "newest-first" | "newest" => Ok(CommitOrder::NewestFirst),
        _ => Err(format!(
            "invalid order '{}', expected oldest-first/newest-first",
            s
        )),
    }
}

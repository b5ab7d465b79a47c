use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use pagedex::{EngineConfig, LookupRequest, PageSummary, QueryEngine, SearchRequest};
use serde::Serialize;
use tracing::info;

#[derive(Parser)]
#[command(name = "pagedex")]
#[command(about = "Query a captured wiki snapshot offline", long_about = None)]
struct Args {
    /// Snapshot file (JSON array or JSON Lines)
    #[arg(long, env = "PAGEDEX_SNAPSHOT")]
    snapshot: PathBuf,

    /// Index build worker threads
    #[arg(long, env = "PAGEDEX_BUILD_WORKERS")]
    build_workers: Option<usize>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run a filter query, e.g. `text ~ "outage" AND space = OPS`
    Search {
        query: String,
        /// Restrict results to one space
        #[arg(long)]
        space: Option<String>,
        #[arg(long, default_value_t = 0)]
        limit: usize,
        #[arg(long, default_value_t = 0)]
        offset: usize,
        #[arg(long)]
        timeout_ms: Option<u64>,
    },
    /// Fetch one page by id, or by title within a space
    Get {
        #[arg(long, conflicts_with_all = ["title", "space"])]
        id: Option<String>,
        #[arg(long, requires = "space")]
        title: Option<String>,
        #[arg(long)]
        space: Option<String>,
        /// Print the document tree instead of plain text
        #[arg(long)]
        tree: bool,
    },
    /// List spaces with their page counts
    Spaces,
    /// List the pages of a space in hierarchy order
    Pages {
        space: String,
        #[arg(long, default_value_t = 0)]
        offset: usize,
        #[arg(long, default_value_t = 50)]
        limit: usize,
    },
}

#[derive(Serialize)]
struct PageListing {
    total: usize,
    pages: Vec<PageSummary>,
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .init();

    let args = Args::parse();

    let mut config = EngineConfig::default();
    if let Some(workers) = args.build_workers {
        config = config.with_build_workers(workers);
    }

    info!("pagedex v{}", pagedex::VERSION);
    let engine = QueryEngine::new(config);
    let documents = pagedex::read_snapshot_file(&args.snapshot)
        .with_context(|| format!("reading snapshot {}", args.snapshot.display()))?;
    engine.load_snapshot(documents);

    match args.command {
        Command::Search {
            query,
            space,
            limit,
            offset,
            timeout_ms,
        } => {
            engine.reindex().context("building index")?;
            let mut request = SearchRequest::new(query)
                .with_limit(limit)
                .with_offset(offset);
            if let Some(space) = space {
                request = request.with_container(space);
            }
            if let Some(ms) = timeout_ms {
                request = request.with_timeout_ms(ms);
            }
            print_json(&engine.search(&request)?)?;
        }
        Command::Get {
            id,
            title,
            space,
            tree,
        } => {
            let request = match (id, title, space) {
                (Some(id), _, _) => LookupRequest::by_id(id),
                (None, Some(title), Some(space)) => LookupRequest::by_title(title, space),
                _ => bail!("pass --id, or --title together with --space"),
            };
            let Some(view) = engine.lookup(&request) else {
                bail!("page not found");
            };
            if tree {
                print_json(&view.document_tree)?;
            } else {
                println!("# {}\n\n{}", view.title, view.plain_text);
            }
        }
        Command::Spaces => print_json(&engine.list_containers())?,
        Command::Pages {
            space,
            offset,
            limit,
        } => {
            let page = engine.list_pages(&space, offset, limit);
            print_json(&PageListing {
                total: page.total,
                pages: page.items.iter().map(|d| d.summary()).collect(),
            })?;
        }
    }

    Ok(())
}

use anyhow::{Context, Result};
use clap::Parser;
use std::path::Path;
use tracing_subscriber::EnvFilter;

use comment_thread_render::hn_client::{parse_comments, HackerNewsClient};
use comment_thread_render::{FreshnessWalker, ListStyle, WalkArgs};

#[derive(Parser)]
#[command(name = "comment-thread-render")]
#[command(about = "Render a Hacker News comment thread with freshness timestamps")]
struct Cli {
    /// Item id to fetch, or a path to a saved item page (.html)
    source: String,
    /// div, ol or ul
    #[arg(long, default_value = "ul")]
    style: ListStyle,
    /// -1 lists flat, 0 nests without limit
    #[arg(long, default_value_t = 5, allow_hyphen_values = true)]
    max_depth: i32,
    #[arg(long, default_value_t = 1)]
    page: i32,
    #[arg(long, default_value_t = 20)]
    per_page: i32,
    /// Newest top-level threads first
    #[arg(long)]
    reverse: bool,
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn main() -> Result<()> {
    init_logging();
    let cli = Cli::parse();

    let comments = if cli.source.ends_with(".html") || Path::new(&cli.source).is_file() {
        let html = std::fs::read_to_string(&cli.source)
            .with_context(|| format!("Failed to read {}", cli.source))?;
        parse_comments(&html)?
    } else {
        HackerNewsClient::new()?.fetch_comments(&cli.source)?
    };

    let args = WalkArgs {
        style: cli.style,
        max_depth: cli.max_depth,
        page: cli.page,
        per_page: cli.per_page,
        reverse_top_level: cli.reverse,
        ..WalkArgs::default()
    };

    let mut walker = FreshnessWalker::new();
    let html = walker.render_page(&comments, &args);
    tracing::info!(
        threads = comments.len(),
        page = args.page,
        max_pages = walker.max_pages(),
        "rendered comment page"
    );

    println!("{}", html);
    Ok(())
}

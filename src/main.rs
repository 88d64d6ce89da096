//! Visitor main entry point
//!
//! This is the command-line interface for the Visitor crawler.

use anyhow::{bail, Context};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use visitor::config::{load_project_with_hash, Options};
use visitor::crawler::crawl;
use visitor::output::{LogSink, MemorySink, PrintSink};
use tracing_subscriber::EnvFilter;

/// Visitor: a single-host web crawler
///
/// Visitor fetches a start page, collects the links and resources it
/// references and visits them recursively, printing a line per fetch.
#[derive(Parser, Debug)]
#[command(name = "visitor")]
#[command(version = "1.0.0")]
#[command(about = "A single-host web crawler", long_about = None)]
struct Cli {
    /// URL to start crawling from
    #[arg(value_name = "URL")]
    url: Option<String>,

    /// Output format for visits, e.g. "%code %url"
    #[arg(short, long)]
    format: Option<String>,

    /// Time limit in seconds (0 disables it)
    #[arg(short, long, value_name = "SECONDS")]
    time_limit: Option<u64>,

    /// Basic auth credentials
    #[arg(short = 'u', long, value_name = "USER:PASS")]
    auth: Option<String>,

    /// Do not send or store cookies
    #[arg(long)]
    no_cookies: bool,

    /// Write the cookie jar to this file at the end of the run
    #[arg(long, value_name = "PATH")]
    cookiejar: Option<PathBuf>,

    /// Read the project from ./visitor.json
    #[arg(long, conflicts_with = "project_file")]
    project: bool,

    /// Read the project from the given JSON or TOML file
    #[arg(long, value_name = "PATH")]
    project_file: Option<PathBuf>,

    /// Number of pages fetched concurrently
    #[arg(long)]
    workers: Option<usize>,

    /// Buffer events and print them as JSON at the end
    #[arg(long)]
    no_print: bool,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    let (start_url, mut options) = load_start(&cli)?;
    apply_overrides(&cli, &mut options);

    let buffered = !options.print;
    let memory = Arc::new(MemorySink::new());
    let sink: Arc<dyn LogSink> = if options.print {
        Arc::new(PrintSink::stdout(options.format.clone()))
    } else {
        memory.clone()
    };

    let report = crawl(&start_url, options, sink)
        .await
        .with_context(|| format!("Failed to crawl {}", start_url))?;

    if buffered {
        println!("{}", memory.to_json().context("Failed to serialize event log")?);
    }

    match &report.halted {
        Some(error) => tracing::warn!("Crawl stopped early: {}", error),
        None => tracing::info!("Crawl completed successfully"),
    }

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("visitor=info,warn"),
            1 => EnvFilter::new("visitor=debug,info"),
            2 => EnvFilter::new("visitor=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Determines the start URL and base options from the project file or URL
fn load_start(cli: &Cli) -> anyhow::Result<(String, Options)> {
    let project_path = match (&cli.project_file, cli.project) {
        (Some(path), _) => Some(path.clone()),
        (None, true) => Some(PathBuf::from("visitor.json")),
        (None, false) => None,
    };

    let Some(path) = project_path else {
        let Some(url) = &cli.url else {
            bail!("No url given");
        };
        return Ok((url.clone(), Options::default()));
    };

    tracing::info!("Loading project from: {}", path.display());
    let (project, hash) = load_project_with_hash(&path)
        .with_context(|| format!("Failed to load project {}", path.display()))?;
    tracing::info!(
        "Project {} loaded successfully (hash: {})",
        project.name.as_deref().unwrap_or("<unnamed>"),
        hash
    );

    let start_url = cli.url.clone().unwrap_or(project.start_url);
    Ok((start_url, project.options))
}

/// Applies command-line flags on top of the loaded options
fn apply_overrides(cli: &Cli, options: &mut Options) {
    if let Some(format) = &cli.format {
        options.format = format.clone();
    }
    if let Some(time_limit) = cli.time_limit {
        options.time_limit = time_limit;
    }
    if let Some(auth) = &cli.auth {
        options.http.auth = Some(auth.clone());
    }
    if cli.no_cookies {
        options.cookies_enabled = false;
    }
    if let Some(cookiejar) = &cli.cookiejar {
        options.cookiejar = Some(cookiejar.clone());
    }
    if let Some(workers) = cli.workers {
        options.workers = workers;
    }
    if cli.no_print {
        options.print = false;
    }
}

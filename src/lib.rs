//! KaggleEase: load Kaggle datasets and competitions from a loose handle.
//!
//! Hand it `"titanic"`, `"owner/slug"` or a kaggle.com URL and get back
//! either a parsed table or the path of the downloaded content. The library
//! works out whether the handle names a competition or a dataset, probes the
//! catalog's inconsistent listing endpoints in a fixed order, proposes near
//! matches when nothing resolves, and picks the file to parse.
//!
//! # Modules
//!
//! - [`catalog`]: handle resolution, suggestions, search, download and file selection
//! - [`table`]: CSV/TSV/JSON readers and the in-memory frame
//! - [`config`]: credential discovery and settings
//! - [`error`]: the error taxonomy

pub mod catalog;
pub mod config;
pub mod error;
pub mod session;
pub mod table;

use std::fs::File;
use std::io::BufWriter;
use std::path::PathBuf;
use std::time::Duration;

use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

pub use catalog::{Loaded, ResolvedMetadata, ResourceKind, SearchResult};
pub use error::{ErrorKind, KaggleEaseError, NetworkStage};
pub use session::{
    KaggleEase, DEFAULT_LOAD_TIMEOUT, DEFAULT_SEARCH_TIMEOUT, DEFAULT_SUGGESTIONS, DEFAULT_TOP,
    PREVIEW_ROWS,
};
pub use table::TabularFrame;

use config::{Credentials, Settings};

/// The kaggleease CLI application.
#[derive(Parser)]
#[command(name = "kaggleease")]
#[command(version, author, about)]
#[command(propagate_version = true)]
struct Cli {
    /// More log output on stderr (-v info, -vv debug). RUST_LOG overrides.
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    /// Kaggle username (otherwise read from kaggle.json).
    #[arg(long, env = config::ENV_USERNAME, global = true)]
    username: Option<String>,

    /// Kaggle API key (otherwise read from kaggle.json).
    #[arg(long, env = config::ENV_KEY, global = true, hide_env_values = true)]
    key: Option<String>,

    /// Catalog API base URL.
    #[arg(long, env = config::ENV_API_BASE, global = true)]
    api_base: Option<String>,

    /// Directory downloads are unpacked into.
    #[arg(long, env = config::ENV_CACHE_DIR, global = true)]
    cache_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand)]
enum Commands {
    /// Load a dataset or competition file.
    Load(LoadArgs),
    /// Show the first rows of a dataset or competition file.
    Preview(PreviewArgs),
    /// Search the dataset catalog.
    Search(SearchArgs),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(clap::Args)]
struct LoadArgs {
    /// Handle, e.g. 'titanic', 'owner/slug' or a kaggle.com URL.
    handle: String,

    /// File to load when the resource has several.
    #[arg(long)]
    file: Option<String>,

    /// Overall timeout in seconds.
    #[arg(long, default_value_t = DEFAULT_LOAD_TIMEOUT.as_secs())]
    timeout: u64,

    /// Write the loaded table to this CSV file instead of printing it.
    #[arg(short, long)]
    output: Option<PathBuf>,

    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,
}

#[derive(clap::Args)]
struct PreviewArgs {
    /// Handle, e.g. 'titanic', 'owner/slug' or a kaggle.com URL.
    handle: String,

    /// File to preview when the resource has several.
    #[arg(long)]
    file: Option<String>,

    /// Number of rows to show.
    #[arg(long, default_value_t = PREVIEW_ROWS)]
    rows: usize,

    /// Overall timeout in seconds.
    #[arg(long, default_value_t = DEFAULT_LOAD_TIMEOUT.as_secs())]
    timeout: u64,
}

#[derive(clap::Args)]
struct SearchArgs {
    /// Free-text query.
    query: String,

    /// Maximum number of results.
    #[arg(long, default_value_t = DEFAULT_TOP)]
    top: usize,

    /// Timeout in seconds.
    #[arg(long, default_value_t = DEFAULT_SEARCH_TIMEOUT.as_secs())]
    timeout: u64,

    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,
}

/// Run the kaggleease CLI.
///
/// This is the main entry point for the CLI, called from `main.rs`.
pub fn run() -> Result<(), KaggleEaseError> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let Some(command) = cli.command.as_ref() else {
        println!("kaggleease {}", env!("CARGO_PKG_VERSION"));
        println!();
        println!("Load Kaggle datasets and competitions from a loose handle.");
        println!();
        println!("Run 'kaggleease --help' for usage information.");
        return Ok(());
    };

    let kaggle = KaggleEase::from_settings(&settings_from(&cli)?);
    match command {
        Commands::Load(args) => run_load(&kaggle, args),
        Commands::Preview(args) => run_preview(&kaggle, args),
        Commands::Search(args) => run_search(&kaggle, args),
    }
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    // A subscriber may already be installed when run() is embedded.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn settings_from(cli: &Cli) -> Result<Settings, KaggleEaseError> {
    let credentials = match Credentials::from_parts(cli.username.clone(), cli.key.clone()) {
        Some(credentials) => credentials,
        None => Credentials::discover()?,
    };

    let mut settings = Settings::new(credentials);
    if let Some(base) = cli.api_base.as_deref().filter(|base| !base.trim().is_empty()) {
        settings = settings.with_api_base(base);
    }
    if let Some(dir) = &cli.cache_dir {
        settings = settings.with_cache_dir(dir);
    }
    Ok(settings)
}

fn run_load(kaggle: &KaggleEase, args: &LoadArgs) -> Result<(), KaggleEaseError> {
    let loaded = kaggle.load(
        &args.handle,
        args.file.as_deref(),
        Duration::from_secs(args.timeout),
    )?;

    if let (Some(output), Loaded::Frame(frame)) = (&args.output, &loaded) {
        let file = File::create(output).map_err(|source| {
            KaggleEaseError::data_format(format!("cannot create {}: {}", output.display(), source))
        })?;
        frame.write_csv(BufWriter::new(file)).map_err(|source| {
            KaggleEaseError::data_format(format!("cannot write {}: {}", output.display(), source))
        })?;
        println!(
            "Wrote {} rows x {} columns to {}",
            frame.row_count(),
            frame.column_count(),
            output.display()
        );
        return Ok(());
    }

    print_loaded(&loaded, args.format)
}

fn run_preview(kaggle: &KaggleEase, args: &PreviewArgs) -> Result<(), KaggleEaseError> {
    let loaded = kaggle.preview(
        &args.handle,
        args.file.as_deref(),
        Duration::from_secs(args.timeout),
        args.rows,
    )?;
    print_loaded(&loaded, OutputFormat::Text)
}

fn print_loaded(loaded: &Loaded, format: OutputFormat) -> Result<(), KaggleEaseError> {
    match (loaded, format) {
        (Loaded::Frame(frame), OutputFormat::Text) => {
            print!("{}", frame);
            println!("[{} rows x {} columns]", frame.row_count(), frame.column_count());
        }
        (Loaded::Path(path), OutputFormat::Text) => {
            println!("Downloaded non-tabular content to {}", path.display());
        }
        (Loaded::Frame(frame), OutputFormat::Json) => println!("{}", to_json(frame)?),
        (Loaded::Path(path), OutputFormat::Json) => {
            println!("{}", to_json(&serde_json::json!({ "path": path }))?)
        }
    }
    Ok(())
}

fn run_search(kaggle: &KaggleEase, args: &SearchArgs) -> Result<(), KaggleEaseError> {
    let results = kaggle.search(&args.query, args.top, Duration::from_secs(args.timeout))?;

    if args.format == OutputFormat::Json {
        println!("{}", to_json(&results)?);
        return Ok(());
    }

    if results.is_empty() {
        println!("No datasets match '{}'.", args.query);
        return Ok(());
    }
    for (rank, result) in results.iter().enumerate() {
        println!(
            "{:>2}. {}  {} ({}, {} votes)",
            rank + 1,
            result.handle,
            result.title,
            catalog::human_size(result.size),
            result.votes
        );
    }
    Ok(())
}

fn to_json<T: serde::Serialize + ?Sized>(value: &T) -> Result<String, KaggleEaseError> {
    serde_json::to_string_pretty(value)
        .map_err(|source| KaggleEaseError::data_format(format!("cannot render JSON: {source}")))
}

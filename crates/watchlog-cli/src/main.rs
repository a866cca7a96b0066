use clap::{ArgAction, Parser, Subcommand};
use commands::{clear, config, history, import, metadata, recommend, stats};
use std::path::PathBuf;

mod commands;
mod logging;
mod output;

#[derive(Parser)]
#[command(name = "watchlog")]
#[command(about = "Watchlog - the movie club's watch history, statistics and recommendations")]
#[command(version)]
struct Cli {
    /// Enable verbose output (use multiple times for more verbosity: -v, -vv)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Output format
    #[arg(long, global = true, default_value = "human", value_enum)]
    output: output::OutputFormat,

    /// Also write logs to a daily rotating file (defaults to the log directory when given without a value)
    #[arg(long, global = true, value_name = "PATH", num_args = 0..=1)]
    log_file: Option<Option<PathBuf>>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the watch history grouped by year and month
    History {
        /// Oldest year first (archive view)
        #[arg(long, action = ArgAction::SetTrue)]
        ascending: bool,

        /// Only show records chosen by this person
        #[arg(long)]
        person: Option<String>,
    },
    /// Show statistics over the watch history
    #[command(long_about = "Show turns per person, monthly activity, pace, and the release decade, genre and country distributions. Genre and country lists are truncated for charts unless --full is given.")]
    Stats {
        /// Restrict statistics to one person (turns then show that person only)
        #[arg(long)]
        person: Option<String>,

        /// Show full genre and country lists instead of the top entries
        #[arg(long, action = ArgAction::SetTrue)]
        full: bool,

        /// List release decades newest first
        #[arg(long, action = ArgAction::SetTrue)]
        decades_desc: bool,
    },
    /// Manage the metadata cache
    Metadata {
        #[command(subcommand)]
        cmd: MetadataCommands,
    },
    /// Suggest unwatched movies
    Recommend {
        /// Comma-separated TMDB ids to leave out (e.g. already shown)
        #[arg(long, value_delimiter = ',')]
        exclude: Vec<u32>,

        /// Maximum number of suggestions
        #[arg(long, value_parser = clap::builder::RangedU64ValueParser::<usize>::new().range(1..))]
        limit: Option<usize>,

        /// Seed for reproducible picks
        #[arg(long)]
        seed: Option<u64>,
    },
    /// Import the legacy plain-text history log
    #[command(long_about = "Import a plain-text history log (a year line followed by 'Title (Person) - Month' lines). Titles are matched against TMDB to fill in ids and release years. Re-importing the same log adds nothing twice.")]
    Import {
        /// Path to the log file
        file: PathBuf,

        /// Parse and match, but do not write to the record store
        #[arg(long, action = ArgAction::SetTrue)]
        dry_run: bool,
    },
    /// Configure credentials and settings
    Config {
        #[command(subcommand)]
        cmd: ConfigCommands,
    },
    /// Clear cached data
    Clear {
        /// Clear the metadata cache
        #[arg(long, action = ArgAction::SetTrue)]
        cache: bool,

        /// Clear stored credentials
        #[arg(long, action = ArgAction::SetTrue)]
        credentials: bool,

        /// Clear everything above
        #[arg(long, action = ArgAction::SetTrue)]
        all: bool,
    },
}

#[derive(Subcommand)]
pub enum MetadataCommands {
    /// Fetch missing and legacy metadata entries from TMDB
    Sync,
    /// Show how many entries are cached and how many need a refresh
    Status,
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Show current configuration (masks sensitive data)
    Show {
        /// Show the API key unmasked
        #[arg(long, action = ArgAction::SetTrue)]
        full: bool,
    },
    /// Write a default configuration file if none exists
    Init,
    /// Store the TMDB API key
    #[command(long_about = "Store the TMDB API key in the credentials file. The TMDB_API_KEY environment variable, when set, takes precedence over the stored key.")]
    Tmdb {
        /// TMDB API key (if not provided, will prompt)
        #[arg(long)]
        api_key: Option<String>,
    },
}

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;

    let cli = Cli::parse();

    let log_file = cli
        .log_file
        .map(|path| path.unwrap_or_else(|| watchlog_config::PathManager::default().log_file()));
    logging::init_logging_with_file(cli.verbose, cli.quiet, log_file)
        .map_err(|e| color_eyre::eyre::eyre!("{}", e))?;

    let output = output::Output::new(cli.output, cli.quiet);

    match cli.command {
        Commands::History { ascending, person } => history::run_history(ascending, person, &output).await,
        Commands::Stats { person, full, decades_desc } => stats::run_stats(person, full, decades_desc, &output).await,
        Commands::Metadata { cmd } => metadata::run_metadata(cmd, &output).await,
        Commands::Recommend { exclude, limit, seed } => recommend::run_recommend(exclude, limit, seed, &output).await,
        Commands::Import { file, dry_run } => import::run_import(file, dry_run, &output).await,
        Commands::Config { cmd } => config::run_config(cmd, &output).await,
        Commands::Clear { cache, credentials, all } => clear::run_clear(all, cache, credentials, &output).await,
    }
}

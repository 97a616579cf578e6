//! CLI parser and command dispatch.

mod archives;
mod helpers;
mod measure;
mod mementos;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use wasteback::Config;

#[derive(Parser)]
#[command(name = "wasteback")]
#[command(about = "Measure the historical weight of web pages from web archives")]
#[command(version)]
pub struct Cli {
    /// Config file path (overrides auto-discovery)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Check if verbose mode is enabled (for early logging setup).
pub fn is_verbose() -> bool {
    std::env::args().any(|arg| arg == "-v" || arg == "--verbose")
}

#[derive(Subcommand)]
enum Commands {
    /// Measure the composition of a page as archived near a date
    Measure {
        /// Page URL (https:// is assumed when no scheme is given)
        url: String,
        /// Year of the capture
        #[arg(short, long)]
        year: i32,
        /// Month (1-12, default 1)
        #[arg(short, long)]
        month: Option<u32>,
        /// Day (1-31, default 1)
        #[arg(short, long)]
        day: Option<u32>,
        /// Archive id (see `wasteback archives`)
        #[arg(short, long)]
        archive: Option<String>,
        /// First year to search for captures (default: the requested year)
        #[arg(long)]
        from_year: Option<i32>,
        /// Last year to search for captures (default: the requested year)
        #[arg(long)]
        to_year: Option<i32>,
        /// List every measured resource
        #[arg(short, long)]
        resources: bool,
        /// Also measure absolute URLs quoted in scripts
        #[arg(long)]
        scan_scripts: bool,
        /// Resources fetched at once
        #[arg(long)]
        concurrency: Option<usize>,
        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// List the captures an archive holds for a URL
    Mementos {
        /// Page URL
        url: String,
        /// Archive id
        #[arg(short, long)]
        archive: Option<String>,
        /// First year to search
        #[arg(long)]
        from_year: i32,
        /// Last year to search (default: current year)
        #[arg(long)]
        to_year: Option<i32>,
        /// Print timestamps as JSON
        #[arg(long)]
        json: bool,
    },

    /// List supported archives
    Archives,
}

/// Run the CLI.
pub async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = Config::load(cli.config.as_deref()).await?;

    match cli.command {
        Commands::Measure {
            url,
            year,
            month,
            day,
            archive,
            from_year,
            to_year,
            resources,
            scan_scripts,
            concurrency,
            json,
        } => {
            let args = measure::MeasureArgs {
                url,
                year,
                month,
                day,
                archive,
                from_year,
                to_year,
                resources,
                scan_scripts,
                concurrency,
                json,
            };
            measure::cmd_measure(&config, args).await
        }
        Commands::Mementos {
            url,
            archive,
            from_year,
            to_year,
            json,
        } => {
            mementos::cmd_mementos(&config, &url, archive.as_deref(), from_year, to_year, json)
                .await
        }
        Commands::Archives => archives::cmd_archives(&config),
    }
}

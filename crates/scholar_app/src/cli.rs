use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::platform::logging::LogDestination;

/// Cached-first search client for an academic repository harvester.
#[derive(Debug, Parser)]
#[command(name = "scholar_search", version, about)]
pub struct Cli {
    /// RON config file (defaults to ./scholar_search.ron when present)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Backend API base URL, e.g. http://localhost:3000/api
    #[arg(long, global = true)]
    pub base_url: Option<String>,

    /// Starting category: all, theses, articles, research, elis
    #[arg(long, global = true)]
    pub category: Option<String>,

    /// Where log output goes
    #[arg(long, value_enum, default_value = "file", global = true)]
    pub log: LogDestination,

    #[command(subcommand)]
    pub command: Option<CliCommand>,
}

#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// Line-based interactive session (default)
    Interactive,
    /// Run one search and print the result page
    Search(SearchArgs),
    /// Print repository statistics
    Health,
}

#[derive(Debug, Args)]
pub struct SearchArgs {
    /// Search terms
    pub query: Vec<String>,

    /// Result page to print
    #[arg(long, default_value_t = 1)]
    pub page: u32,

    #[arg(long)]
    pub year: Option<String>,

    #[arg(long)]
    pub institution: Option<String>,

    #[arg(long)]
    pub author: Option<String>,

    #[arg(long = "type")]
    pub kind: Option<String>,

    #[arg(long)]
    pub keyword: Option<String>,
}

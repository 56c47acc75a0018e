mod cli;
mod config;
mod platform;

use anyhow::Context;
use clap::Parser;
use scholar_core::{FilterKey, SearchState};
use scholar_logging::scholar_info;

use cli::{Cli, CliCommand, SearchArgs};
use config::AppConfig;

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = AppConfig::load(cli.config.as_deref()).context("failed to load config")?;
    if let Some(base_url) = cli.base_url {
        config.apply_base_url(base_url);
    }
    if let Some(category) = cli.category {
        config.category = category;
    }

    platform::logging::initialize(cli.log, config.log_level()?);
    scholar_info!(
        "scholar_search {} base_url={} flavor={:?}",
        env!("CARGO_PKG_VERSION"),
        config.base_url,
        config.api_flavor
    );

    match cli.command.unwrap_or(CliCommand::Interactive) {
        CliCommand::Interactive => platform::run_interactive(&config),
        CliCommand::Search(args) => platform::run_search(&config, search_state(&config, args)?),
        CliCommand::Health => platform::run_health(&config),
    }
}

fn search_state(config: &AppConfig, args: SearchArgs) -> anyhow::Result<SearchState> {
    let mut search = SearchState::new(config.core_settings().page_size, config.category()?);
    search.query = args.query.join(" ");
    search.page = args.page.max(1);
    for (key, value) in [
        (FilterKey::Year, args.year),
        (FilterKey::Institution, args.institution),
        (FilterKey::Author, args.author),
        (FilterKey::Type, args.kind),
        (FilterKey::Keyword, args.keyword),
    ] {
        search.filters.set(key, value);
    }
    Ok(search)
}

//! Line commands for the interactive session.
//!
//! A line starting with `:` is a command; anything else replaces the search
//! box text and goes through the debounce like typing would.

use scholar_core::{Category, FilterKey, Msg};
use thiserror::Error;

pub const HELP: &str = "\
Type to search (debounced). Commands:
  :go                 search now
  :next / :prev       change page
  :page N             jump to page N
  :filter KEY VALUE   set a filter (year, institution, author, type, keyword)
  :unfilter KEY       remove a filter
  :clear              remove all filters
  :tab CATEGORY       all, theses, articles, research, elis
  :stats              reload repository statistics
  :help               show this text
  :quit               exit";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Input(String),
    Submit,
    Next,
    Prev,
    Page(u32),
    Filter(FilterKey, String),
    Unfilter(FilterKey),
    Clear,
    Tab(Category),
    Stats,
    Help,
    Quit,
}

impl Command {
    /// The controller message for this command, if it has one.
    pub fn into_msg(self) -> Option<Msg> {
        let msg = match self {
            Command::Input(text) => Msg::InputChanged(text),
            Command::Submit => Msg::SearchSubmitted,
            Command::Next => Msg::NextPage,
            Command::Prev => Msg::PrevPage,
            Command::Page(page) => Msg::PageRequested(page),
            Command::Filter(key, value) => Msg::FilterChanged {
                key,
                value: Some(value),
            },
            Command::Unfilter(key) => Msg::FilterChanged { key, value: None },
            Command::Clear => Msg::FiltersCleared,
            Command::Tab(category) => Msg::CategorySelected(category),
            Command::Stats => Msg::Started,
            Command::Help | Command::Quit => return None,
        };
        Some(msg)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandError {
    #[error("unknown command :{0} (try :help)")]
    Unknown(String),
    #[error("usage: {0}")]
    Usage(&'static str),
    #[error("unknown filter {0:?}")]
    UnknownFilter(String),
    #[error("unknown category {0:?}")]
    UnknownCategory(String),
}

pub fn parse(line: &str) -> Result<Command, CommandError> {
    let Some(rest) = line.trim_start().strip_prefix(':') else {
        return Ok(Command::Input(line.to_string()));
    };

    let mut parts = rest.trim().splitn(2, char::is_whitespace);
    let name = parts.next().unwrap_or_default().to_ascii_lowercase();
    let args = parts.next().map(str::trim).unwrap_or_default();

    match name.as_str() {
        "go" | "search" => Ok(Command::Submit),
        "next" | "n" => Ok(Command::Next),
        "prev" | "p" => Ok(Command::Prev),
        "page" => args
            .parse()
            .map(Command::Page)
            .map_err(|_| CommandError::Usage(":page N")),
        "filter" => {
            let mut kv = args.splitn(2, char::is_whitespace);
            let key = kv.next().filter(|k| !k.is_empty());
            let value = kv.next().map(str::trim).filter(|v| !v.is_empty());
            match (key, value) {
                (Some(key), Some(value)) => Ok(Command::Filter(
                    parse_filter_key(key)?,
                    value.to_string(),
                )),
                _ => Err(CommandError::Usage(":filter KEY VALUE")),
            }
        }
        "unfilter" => {
            if args.is_empty() {
                return Err(CommandError::Usage(":unfilter KEY"));
            }
            Ok(Command::Unfilter(parse_filter_key(args)?))
        }
        "clear" => Ok(Command::Clear),
        "tab" => {
            if args.is_empty() {
                return Err(CommandError::Usage(":tab CATEGORY"));
            }
            Category::parse(args)
                .map(Command::Tab)
                .ok_or_else(|| CommandError::UnknownCategory(args.to_string()))
        }
        "stats" => Ok(Command::Stats),
        "help" | "h" | "?" => Ok(Command::Help),
        "quit" | "q" | "exit" => Ok(Command::Quit),
        _ => Err(CommandError::Unknown(name)),
    }
}

fn parse_filter_key(name: &str) -> Result<FilterKey, CommandError> {
    FilterKey::parse(name).ok_or_else(|| CommandError::UnknownFilter(name.to_string()))
}

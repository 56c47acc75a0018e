use std::fmt::Write;

use chrono::{DateTime, Local};
use scholar_core::{
    AppViewModel, Category, DisplayState, FacetView, HarvestStatus, LinkAction, Pagination,
    RepositoryStats, ResultCardView,
};

const RULE: &str = "────────────────────────────────────────────────────────────";

/// Renders the whole screen as plain text.
pub fn render(view: &AppViewModel) -> String {
    let mut out = String::new();

    let _ = writeln!(out, "{RULE}");
    let _ = writeln!(out, "{}", tabs_line(view.category));
    if let Some(stats) = &view.stats {
        let _ = writeln!(out, "{}", render_stats(stats));
    }
    let _ = writeln!(out, "{}", query_line(view));
    if let Some(harvest) = harvest_line(&view.harvest_status) {
        let _ = writeln!(out, "{harvest}");
    }
    if view.loading {
        let _ = writeln!(out, "Loading...");
    } else if view.refreshing {
        let _ = writeln!(out, "Refreshing with new records...");
    }
    let _ = writeln!(out);

    match &view.display {
        DisplayState::Idle => {
            let _ = writeln!(out, "Type a query and press Enter, or :go to browse.");
        }
        DisplayState::Prompt => {
            let _ = writeln!(
                out,
                "{} searches the live repository. Enter a query to search.",
                view.category.label()
            );
        }
        DisplayState::Empty => {
            let _ = writeln!(out, "No results found.");
        }
        DisplayState::Error(failure) => {
            let _ = writeln!(out, "Search failed: {failure}");
        }
        DisplayState::Results => {
            let first = view.pagination.first_position();
            for (offset, card) in view.cards.iter().enumerate() {
                render_card(&mut out, first + offset as u64, card);
            }
            let _ = writeln!(out, "{}", pagination_line(&view.pagination));
        }
    }

    if !view.facets.is_empty() {
        let _ = writeln!(out);
        for facet in &view.facets {
            render_facet(&mut out, facet);
        }
    }

    out
}

pub fn render_stats(stats: &RepositoryStats) -> String {
    let mut line = format!(
        "{} records | theses {} | articles {} | research {}",
        format_with_commas(stats.total_records),
        format_with_commas(stats.theses),
        format_with_commas(stats.articles),
        format_with_commas(stats.research),
    );
    if let Some(last) = &stats.last_harvest {
        let _ = write!(line, " | last harvest {}", format_timestamp(last));
    }
    if stats.includes_elis {
        line.push_str(" | E-LIS available");
    }
    line
}

fn tabs_line(active: Category) -> String {
    Category::ALL
        .iter()
        .map(|category| {
            if *category == active {
                format!("[{}]", category.label())
            } else {
                format!(" {} ", category.label())
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn query_line(view: &AppViewModel) -> String {
    let mut line = if view.input.trim() == view.query {
        format!("Query: {:?}", view.query)
    } else {
        format!("Query: {:?} (typing {:?})", view.query, view.input)
    };
    if !view.filters.is_empty() {
        let filters = view
            .filters
            .iter()
            .map(|(key, value)| format!("{key}={value}"))
            .collect::<Vec<_>>()
            .join(", ");
        let _ = write!(line, " | Filters: {filters}");
    }
    line
}

fn harvest_line(status: &HarvestStatus) -> Option<String> {
    let text = match status {
        HarvestStatus::Idle | HarvestStatus::Skipped(_) => return None,
        HarvestStatus::Running { category } => {
            format!("Checking {} for new records...", category.label())
        }
        HarvestStatus::UpToDate => "Repository is up to date.".to_string(),
        HarvestStatus::Added { new_records } => format!(
            "{} new records harvested.",
            format_with_commas(*new_records)
        ),
        HarvestStatus::Failed(message) => format!("Background update failed: {message}"),
        HarvestStatus::RefreshFailed(message) => {
            format!("Could not refresh after update: {message}")
        }
    };
    Some(text)
}

fn render_card(out: &mut String, position: u64, card: &ResultCardView) {
    let _ = writeln!(out, "{position:>3}. {}", card.title);
    if let Some(authors) = &card.authors_line {
        let _ = writeln!(out, "     {authors}");
    }
    if !card.meta.is_empty() {
        let _ = writeln!(out, "     {}", card.meta);
    }
    if let Some(description) = &card.description {
        let _ = writeln!(out, "     {description}");
    }
    if let Some(identifier) = &card.identifier {
        let _ = writeln!(out, "     id: {identifier}");
    }
    match &card.link {
        LinkAction::Open(url) => {
            let _ = writeln!(out, "     -> {url}");
        }
        LinkAction::Unavailable => {
            let _ = writeln!(out, "     No URL");
        }
    }
}

fn pagination_line(pagination: &Pagination) -> String {
    if pagination.total_pages == 0 {
        return String::new();
    }
    format!(
        "{} Page {} of {} ({} records) {}",
        if pagination.prev_enabled { "<prev" } else { "     " },
        pagination.page,
        pagination.total_pages,
        format_with_commas(pagination.total_records),
        if pagination.next_enabled { "next>" } else { "" },
    )
    .trim_end()
    .to_string()
}

fn render_facet(out: &mut String, facet: &FacetView) {
    if facet.options.is_empty() {
        return;
    }
    let options = facet
        .options
        .iter()
        .map(|option| {
            let marker = if option.selected { "*" } else { "" };
            format!("{marker}{} ({})", option.value, option.count)
        })
        .collect::<Vec<_>>()
        .join(", ");
    let _ = writeln!(out, "{}: {options}", facet.key);
}

fn format_timestamp(raw: &str) -> String {
    DateTime::parse_from_rfc3339(raw)
        .map(|ts| ts.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|_| raw.to_string())
}

fn format_with_commas(value: u64) -> String {
    let mut out = String::new();
    for (i, ch) in value.to_string().chars().rev().enumerate() {
        if i != 0 && i % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out.chars().rev().collect()
}

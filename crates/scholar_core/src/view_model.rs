use url::Url;

use crate::{Category, DisplayState, FilterKey, HarvestStatus, RepositoryStats, ResultRecord};

/// Title shown for records without one.
pub const UNTITLED: &str = "Untitled";
/// Maximum description length on a card, in characters.
pub const DESCRIPTION_LIMIT: usize = 300;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppViewModel {
    pub query: String,
    pub input: String,
    pub category: Category,
    pub filters: Vec<(FilterKey, String)>,
    pub display: DisplayState,
    /// An interactive fetch is outstanding.
    pub loading: bool,
    /// A silent post-harvest refresh is outstanding.
    pub refreshing: bool,
    pub pagination: Pagination,
    pub cards: Vec<ResultCardView>,
    pub facets: Vec<FacetView>,
    pub harvest_status: HarvestStatus,
    pub stats: Option<RepositoryStats>,
    pub dirty: bool,
}

/// `ceil(total_records / page_size)`, zero when there is nothing to page through.
pub fn total_pages(total_records: u64, page_size: u32) -> u32 {
    if page_size == 0 {
        return 0;
    }
    let pages = total_records.div_ceil(u64::from(page_size));
    u32::try_from(pages).unwrap_or(u32::MAX)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub page: u32,
    pub page_size: u32,
    pub total_pages: u32,
    pub total_records: u64,
    pub prev_enabled: bool,
    pub next_enabled: bool,
}

impl Pagination {
    pub fn new(page: u32, page_size: u32, total_records: u64) -> Self {
        let total_pages = total_pages(total_records, page_size);
        Self {
            page,
            page_size,
            total_pages,
            total_records,
            prev_enabled: page > 1,
            next_enabled: page < total_pages,
        }
    }

    /// One-based position of the first record on this page.
    pub fn first_position(&self) -> u64 {
        u64::from(self.page.saturating_sub(1)) * u64::from(self.page_size) + 1
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkAction {
    Open(String),
    /// No usable http(s) link; rendered as a disabled "No URL" action.
    Unavailable,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultCardView {
    pub title: String,
    pub authors_line: Option<String>,
    pub description: Option<String>,
    pub meta: String,
    pub identifier: Option<String>,
    pub link: LinkAction,
}

impl ResultCardView {
    pub fn from_record(record: &ResultRecord) -> Self {
        let title = non_blank(record.title.as_deref())
            .unwrap_or(UNTITLED)
            .to_string();

        let authors: Vec<&str> = record
            .authors
            .iter()
            .map(|author| author.trim())
            .filter(|author| !author.is_empty())
            .collect();
        let authors_line = (!authors.is_empty()).then(|| authors.join(", "));

        let description = non_blank(record.description.as_deref())
            .map(|text| truncate(text, DESCRIPTION_LIMIT));

        let meta = [
            record.source.as_deref(),
            record.institution.as_deref(),
            record.kind.as_deref(),
            record.year.as_deref(),
        ]
        .into_iter()
        .filter_map(non_blank)
        .collect::<Vec<_>>()
        .join(" · ");

        let link = match non_blank(record.url.as_deref()) {
            Some(raw) if is_http_url(raw) => LinkAction::Open(raw.to_string()),
            _ => LinkAction::Unavailable,
        };

        Self {
            title,
            authors_line,
            description,
            meta,
            identifier: non_blank(record.identifier.as_deref()).map(ToOwned::to_owned),
            link,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FacetView {
    pub key: FilterKey,
    pub options: Vec<FacetOptionView>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FacetOptionView {
    pub value: String,
    pub count: u64,
    pub selected: bool,
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

fn is_http_url(raw: &str) -> bool {
    Url::parse(raw)
        .map(|url| matches!(url.scheme(), "http" | "https"))
        .unwrap_or(false)
}

/// Collapses whitespace and cuts to `limit` characters, appending "...".
fn truncate(text: &str, limit: usize) -> String {
    let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.chars().count() <= limit {
        return collapsed;
    }
    let mut cut: String = collapsed.chars().take(limit).collect();
    cut.truncate(cut.trim_end().len());
    cut.push_str("...");
    cut
}

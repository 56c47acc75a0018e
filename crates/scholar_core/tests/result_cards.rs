use pretty_assertions::assert_eq;
use scholar_core::{LinkAction, ResultCardView, ResultRecord, DESCRIPTION_LIMIT, UNTITLED};

#[test]
fn blank_record_gets_placeholders() {
    let record = ResultRecord {
        title: Some(String::new()),
        authors: Vec::new(),
        url: Some("ftp://x".to_string()),
        ..ResultRecord::default()
    };

    let card = ResultCardView::from_record(&record);
    assert_eq!(card.title, UNTITLED);
    assert_eq!(card.title, "Untitled");
    assert_eq!(card.authors_line, None);
    assert_eq!(card.description, None);
    assert_eq!(card.meta, "");
    assert_eq!(card.link, LinkAction::Unavailable);
}

#[test]
fn full_record_renders_every_line() {
    let record = ResultRecord {
        title: Some("  Open Repositories  ".to_string()),
        authors: vec!["Lovelace, Ada".to_string(), " ".to_string(), "Turing, Alan".to_string()],
        description: Some("A study\nof   harvesting.".to_string()),
        source: Some("DSpace".to_string()),
        institution: Some("Universidad Nacional".to_string()),
        kind: Some("Thesis".to_string()),
        year: Some("2019".to_string()),
        identifier: Some("oai:repo:123".to_string()),
        url: Some("https://repo.example.org/handle/123".to_string()),
    };

    let card = ResultCardView::from_record(&record);
    assert_eq!(card.title, "Open Repositories");
    assert_eq!(card.authors_line.as_deref(), Some("Lovelace, Ada, Turing, Alan"));
    assert_eq!(card.description.as_deref(), Some("A study of harvesting."));
    assert_eq!(card.meta, "DSpace · Universidad Nacional · Thesis · 2019");
    assert_eq!(card.identifier.as_deref(), Some("oai:repo:123"));
    assert_eq!(
        card.link,
        LinkAction::Open("https://repo.example.org/handle/123".to_string())
    );
}

#[test]
fn long_description_is_truncated() {
    let record = ResultRecord {
        description: Some("word ".repeat(200)),
        ..ResultRecord::default()
    };
    let card = ResultCardView::from_record(&record);
    let description = card.description.unwrap();
    assert!(description.ends_with("..."));
    assert!(description.chars().count() <= DESCRIPTION_LIMIT + 3);
}

#[test]
fn missing_title_and_relative_url() {
    let record = ResultRecord {
        url: Some("/handle/1".to_string()),
        ..ResultRecord::default()
    };
    let card = ResultCardView::from_record(&record);
    assert_eq!(card.title, UNTITLED);
    assert_eq!(card.link, LinkAction::Unavailable);
}

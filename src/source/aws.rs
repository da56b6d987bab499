//! AWS Health Dashboard RSS feed.

use std::time::Instant;

use quick_xml::events::Event;
use quick_xml::Reader;

use servicedash_types::{NormalizedStatus, Status};

use super::http::{elapsed_ms, HttpSource};
use super::service::AwsRssSettings;
use super::AdapterError;

/// Titles inspected for unresolved events.
const INSPECTED_ITEMS: usize = 10;

pub(crate) async fn fetch(
    source: &HttpSource,
    settings: &AwsRssSettings,
) -> Result<NormalizedStatus, AdapterError> {
    let started = Instant::now();
    let xml = source.get_text(&settings.rss_url).await?;
    Ok(interpret_feed(&xml).with_latency_ms(elapsed_ms(started)))
}

/// Map an RSS document to a status.
///
/// Any recent title without `RESOLVED` counts as an active event. A
/// document that is not well-formed XML is a parse error.
pub(crate) fn interpret_feed(xml: &str) -> NormalizedStatus {
    let Some(items) = item_titles(xml) else {
        return NormalizedStatus::unknown("RSS parse error");
    };
    if items.is_empty() {
        return NormalizedStatus::operational("No active events");
    }

    let titles: Vec<&str> = items
        .iter()
        .take(INSPECTED_ITEMS)
        .map(|t| t.trim())
        .filter(|t| !t.is_empty())
        .collect();

    match titles.iter().find(|t| !t.to_uppercase().contains("RESOLVED")) {
        Some(active) => NormalizedStatus::new(Status::Degraded, format!("Active: {active}")),
        None => NormalizedStatus::operational(format!("{} event(s) (all resolved)", titles.len())),
    }
}

/// Title text of every `<root>/channel/item`, in document order; an item
/// without a title yields an empty string. `None` when the document is
/// malformed.
fn item_titles(xml: &str) -> Option<Vec<String>> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut path: Vec<Vec<u8>> = Vec::new();
    let mut seen_root = false;
    let mut titles = Vec::new();

    loop {
        match reader.read_event().ok()? {
            Event::Start(e) => {
                enter(&mut path, &mut seen_root, e.name().as_ref())?;
                if is_item(&path) {
                    titles.push(String::new());
                }
            }
            Event::Empty(e) => {
                enter(&mut path, &mut seen_root, e.name().as_ref())?;
                if is_item(&path) {
                    titles.push(String::new());
                }
                path.pop();
            }
            Event::End(_) => {
                path.pop()?;
            }
            Event::Text(t) => {
                if path.is_empty() {
                    return None;
                }
                let text = t.unescape().ok()?;
                push_title(&path, &mut titles, &text);
            }
            Event::CData(c) => {
                if path.is_empty() {
                    return None;
                }
                let text = String::from_utf8_lossy(&c.into_inner()).into_owned();
                push_title(&path, &mut titles, &text);
            }
            Event::Eof => break,
            _ => {}
        }
    }

    (seen_root && path.is_empty()).then_some(titles)
}

/// Open an element; a second top-level element is malformed.
fn enter(path: &mut Vec<Vec<u8>>, seen_root: &mut bool, name: &[u8]) -> Option<()> {
    if path.is_empty() {
        if *seen_root {
            return None;
        }
        *seen_root = true;
    }
    path.push(name.to_vec());
    Some(())
}

fn is_item(path: &[Vec<u8>]) -> bool {
    path.len() == 3 && path[1] == b"channel" && path[2] == b"item"
}

fn push_title(path: &[Vec<u8>], titles: &mut [String], text: &str) {
    if path.len() == 4 && is_item(&path[..3]) && path[3] == b"title" {
        if let Some(title) = titles.last_mut() {
            title.push_str(text);
        }
    }
}

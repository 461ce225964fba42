use crate::types::{FeedItem, Result, SummarizerError};
use chrono::{DateTime, Utc};
use feed_rs::model::{Entry, FeedType, Link};
use feed_rs::parser;
use quick_xml::events::Event;
use quick_xml::reader::Reader;
use tracing::{debug, info, warn};

/// Maps feed documents (RSS 0.9x/1.0/2.0, Atom, JSON Feed) to [`FeedItem`]s.
pub struct FeedParser;

impl FeedParser {
    /// Parse a whole feed document.
    ///
    /// Entries missing a link, title or publication date are dropped with a
    /// warning; only a document that cannot be parsed at all is an error.
    pub fn parse_feed(content: &str, feed_url: &str) -> Result<Vec<FeedItem>> {
        debug!("Parsing feed content ({} bytes)", content.len());

        let feed = parser::parse(content.as_bytes())
            .map_err(|e| SummarizerError::Parse(format!("Failed to parse feed: {}", e)))?;

        let feed_title = feed
            .title
            .map(|t| t.content.trim().to_string())
            .filter(|t| !t.is_empty());
        // RSS descriptions are article bodies, not summaries.
        let has_summaries = matches!(feed.feed_type, FeedType::Atom | FeedType::JSON);

        let total = feed.entries.len();
        let raw_dates = match feed.feed_type {
            FeedType::JSON => raw_json_dates(content),
            _ => raw_xml_dates(content),
        }
        .filter(|dates| dates.len() == total);
        if raw_dates.is_none() {
            debug!("Could not align raw dates for {}; using normalized dates", feed_url);
        }

        let mut items = Vec::with_capacity(total);

        for (index, entry) in feed.entries.into_iter().enumerate() {
            let entry_title = entry
                .title
                .as_ref()
                .map(|t| t.content.clone())
                .unwrap_or_else(|| "unknown-title".to_string());
            let raw_date = raw_dates
                .as_ref()
                .and_then(|dates| dates.get(index).cloned().flatten());

            match Self::parse_entry(entry, raw_date, feed_url, feed_title.as_deref(), has_summaries) {
                Ok(item) => items.push(item),
                Err(e) => warn!("Dropping entry \"{}\" from {}: {}", entry_title, feed_url, e),
            }
        }

        info!(
            "Parsed feed {} with {} of {} entries usable",
            feed_url,
            items.len(),
            total
        );
        Ok(items)
    }

    fn parse_entry(
        entry: Entry,
        raw_date: Option<String>,
        feed_url: &str,
        feed_title: Option<&str>,
        has_summaries: bool,
    ) -> Result<FeedItem> {
        let feed_title = feed_title.ok_or(SummarizerError::ItemValidation { field: "feed_title" })?;

        let title = entry
            .title
            .map(|t| t.content.trim().to_string())
            .filter(|t| !t.is_empty())
            .ok_or(SummarizerError::ItemValidation { field: "title" })?;

        let link = article_link(&entry.links)
            .map(|l| l.href.trim().to_string())
            .filter(|href| !href.is_empty())
            .ok_or(SummarizerError::ItemValidation { field: "link" })?;

        // Kept as published; the normalized date only fills in when the raw
        // text could not be recovered.
        let publication_date = raw_date
            .or_else(|| entry.published.or(entry.updated).map(format_publication_date))
            .ok_or(SummarizerError::ItemValidation { field: "publication_date" })?;

        let description = entry.summary.map(|s| s.content);
        let content = entry
            .content
            .and_then(|c| c.body)
            .or_else(|| description.clone())
            .unwrap_or_default();
        let summary = if has_summaries { description } else { None };

        let categories: Vec<String> = entry.categories.into_iter().map(|c| c.term).collect();

        Ok(FeedItem {
            feed_url: feed_url.to_string(),
            feed_title: feed_title.to_string(),
            link,
            publication_date,
            title,
            summary,
            content,
            categories: (!categories.is_empty()).then_some(categories),
        })
    }
}

/// The page an entry points at: its `alternate` (or untyped) link, else the
/// first link it lists.
fn article_link(links: &[Link]) -> Option<&Link> {
    links
        .iter()
        .find(|l| matches!(l.rel.as_deref(), None | Some("alternate")))
        .or_else(|| links.first())
}

/// RFC 2822 in UTC, so re-parsing the same entry always yields the same key.
fn format_publication_date(dt: DateTime<Utc>) -> String {
    dt.to_rfc2822()
}

#[derive(Clone, Copy)]
enum DateField {
    Published,
    Updated,
}

impl DateField {
    fn from_local_name(name: &[u8]) -> Option<Self> {
        match name {
            b"pubDate" | b"published" | b"issued" | b"date" => Some(DateField::Published),
            b"updated" | b"modified" => Some(DateField::Updated),
            _ => None,
        }
    }
}

#[derive(Default)]
struct RawDates {
    published: Option<String>,
    updated: Option<String>,
}

impl RawDates {
    fn push(&mut self, field: DateField, text: &str) {
        let slot = match field {
            DateField::Published => &mut self.published,
            DateField::Updated => &mut self.updated,
        };
        slot.get_or_insert_with(String::new).push_str(text);
    }

    fn take(&mut self) -> Option<String> {
        let dates = std::mem::take(self);
        dates
            .published
            .or(dates.updated)
            .map(|d| d.trim().to_string())
            .filter(|d| !d.is_empty())
    }
}

/// Date text of every `item`/`entry`, in document order, exactly as written.
///
/// Only direct children of an entry count, so an Atom `<source><updated>`
/// never stands in for the entry's own date.
fn raw_xml_dates(content: &str) -> Option<Vec<Option<String>>> {
    let mut reader = Reader::from_str(content);
    reader.config_mut().trim_text(true);

    let mut dates = Vec::new();
    let mut depth = 0usize;
    let mut entry_depth: Option<usize> = None;
    let mut field: Option<DateField> = None;
    let mut current = RawDates::default();

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                depth += 1;
                let name = e.local_name();
                match entry_depth {
                    None if matches!(name.as_ref(), b"item" | b"entry") => {
                        entry_depth = Some(depth);
                        current = RawDates::default();
                    }
                    Some(d) if depth == d + 1 => field = DateField::from_local_name(name.as_ref()),
                    _ => {}
                }
            }
            Ok(Event::Empty(e)) => {
                if entry_depth.is_none() && matches!(e.local_name().as_ref(), b"item" | b"entry") {
                    dates.push(None);
                }
            }
            Ok(Event::Text(t)) => {
                if let Some(f) = field {
                    let text = t.unescape().ok()?;
                    current.push(f, &text);
                }
            }
            Ok(Event::CData(c)) => {
                if let Some(f) = field {
                    current.push(f, &String::from_utf8_lossy(&c.into_inner()));
                }
            }
            Ok(Event::End(_)) => {
                if entry_depth == Some(depth) {
                    dates.push(current.take());
                    entry_depth = None;
                }
                field = None;
                depth = depth.saturating_sub(1);
            }
            Ok(Event::Eof) => break,
            Err(_) => return None,
            _ => {}
        }
    }

    Some(dates)
}

/// `date_published` (else `date_modified`) of every JSON Feed item.
fn raw_json_dates(content: &str) -> Option<Vec<Option<String>>> {
    let document: serde_json::Value = serde_json::from_str(content).ok()?;
    let items = document.get("items")?.as_array()?;

    Some(
        items
            .iter()
            .map(|item| {
                ["date_published", "date_modified"]
                    .iter()
                    .find_map(|key| item.get(*key).and_then(serde_json::Value::as_str))
                    .map(|d| d.trim().to_string())
                    .filter(|d| !d.is_empty())
            })
            .collect(),
    )
}

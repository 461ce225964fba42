use crate::types::{Result, SummarizerError};
use quick_xml::events::Event;
use quick_xml::reader::Reader;
use std::path::Path;
use tracing::{info, warn};

/// Read the feed list at `path` and return every feed URL it names.
pub async fn load_feed_urls(path: &Path) -> Result<Vec<String>> {
    let content = tokio::fs::read_to_string(path).await?;
    let urls = parse_feed_list(&content)?;

    if urls.is_empty() {
        warn!("No feed URLs found in {}", path.display());
    } else {
        info!("Extracted {} feed URLs from {}", urls.len(), path.display());
    }
    Ok(urls)
}

/// Parse either an OPML document or a plain list with one URL per line.
pub fn parse_feed_list(content: &str) -> Result<Vec<String>> {
    let trimmed = content.trim_start();
    if trimmed.starts_with('<') && trimmed.to_ascii_lowercase().contains("<opml") {
        return parse_opml(content);
    }

    Ok(content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect())
}

/// Collect the `xmlUrl` of every `outline`, at any nesting depth, in
/// document order.
fn parse_opml(content: &str) -> Result<Vec<String>> {
    let mut reader = Reader::from_str(content);
    reader.config_mut().trim_text(true);

    let mut urls = Vec::new();

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) | Ok(Event::Empty(e)) => {
                if e.local_name().as_ref() != b"outline" {
                    continue;
                }
                let attr = e
                    .try_get_attribute("xmlUrl")
                    .map_err(|err| SummarizerError::Parse(format!("OPML attribute error: {}", err)))?;
                if let Some(attr) = attr {
                    let url = attr
                        .unescape_value()
                        .map_err(|err| SummarizerError::Parse(format!("OPML attribute error: {}", err)))?;
                    let url = url.trim();
                    if !url.is_empty() {
                        urls.push(url.to_string());
                    }
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(SummarizerError::Parse(format!("OPML parse error: {}", e))),
            _ => {}
        }
    }

    Ok(urls)
}

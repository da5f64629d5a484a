use crate::types::{CuratorError, Result};
use chrono::{DateTime, Utc};
use feed_rs::parser;
use tracing::debug;

/// Excerpts are cut to this many characters before the ellipsis.
pub const EXCERPT_MAX_CHARS: usize = 200;

/// A feed document reduced to the fields the pipeline consumes.
#[derive(Debug)]
pub struct ParsedDocument {
    pub title: Option<String>,
    pub entries: Vec<NormalizedEntry>,
}

/// One feed entry after normalization: media references folded into the
/// content body, excerpt derived, publish timestamp resolved.
#[derive(Debug, Clone)]
pub struct NormalizedEntry {
    pub title: String,
    pub link: String,
    pub content: String,
    pub excerpt: String,
    pub author: Option<String>,
    pub published_at: DateTime<Utc>,
}

/// Parse a feed document and normalize its entries. Entries missing a
/// title or link are skipped; a malformed entry never fails the document.
pub fn parse_document(content: &str, fetched_at: DateTime<Utc>) -> Result<ParsedDocument> {
    let feed = parser::parse(content.as_bytes())
        .map_err(|e| CuratorError::Parse(format!("failed to parse feed: {e}")))?;

    let title = feed.title.map(|t| t.content);
    let mut entries = Vec::new();
    for entry in feed.entries {
        match normalize_entry(entry, fetched_at) {
            Some(normalized) => entries.push(normalized),
            None => debug!("skipping entry without title or link"),
        }
    }

    debug!("parsed feed with {} usable entries", entries.len());
    Ok(ParsedDocument { title, entries })
}

fn normalize_entry(entry: feed_rs::model::Entry, fetched_at: DateTime<Utc>) -> Option<NormalizedEntry> {
    let title = entry.title.as_ref().map(|t| t.content.trim().to_string())?;
    if title.is_empty() {
        return None;
    }
    let link = entry.links.first()?.href.clone();

    // Prefer full content over the summary snippet.
    let body = entry
        .content
        .as_ref()
        .and_then(|c| c.body.clone())
        .or_else(|| entry.summary.as_ref().map(|s| s.content.clone()))
        .unwrap_or_default();

    let images = media_image_urls(&entry);
    let content = prepend_media_markup(&images, &body);
    let excerpt = make_excerpt(&content);

    let author = entry
        .authors
        .first()
        .map(|a| a.name.clone())
        .filter(|name| !name.is_empty());

    // Explicit publish date, then the entry's update date, then fetch time.
    let published_at = entry.published.or(entry.updated).unwrap_or(fetched_at);

    Some(NormalizedEntry {
        title,
        link,
        content,
        excerpt,
        author,
        published_at,
    })
}

/// Image references from enclosure/media:content/media:thumbnail/itunes
/// conventions, all of which feed-rs surfaces through `entry.media`.
fn media_image_urls(entry: &feed_rs::model::Entry) -> Vec<String> {
    let mut urls = Vec::new();
    for media in &entry.media {
        for content in &media.content {
            if let Some(url) = &content.url {
                let is_image = content
                    .content_type
                    .as_ref()
                    .map(|mime| mime.to_string().starts_with("image/"))
                    .unwrap_or(true);
                if is_image {
                    urls.push(url.to_string());
                }
            }
        }
        for thumbnail in &media.thumbnails {
            urls.push(thumbnail.image.uri.clone());
        }
    }
    urls.dedup();
    urls
}

fn prepend_media_markup(images: &[String], body: &str) -> String {
    if images.is_empty() {
        return body.to_string();
    }
    let mut content = String::new();
    for url in images {
        content.push_str(&format!("<img src=\"{url}\" />\n"));
    }
    content.push_str(body);
    content
}

/// Markup-stripped content cut to [`EXCERPT_MAX_CHARS`], with an ellipsis
/// appended when anything was cut.
pub fn make_excerpt(content: &str) -> String {
    let text = strip_markup(content);
    if text.chars().count() <= EXCERPT_MAX_CHARS {
        return text;
    }
    let mut excerpt: String = text.chars().take(EXCERPT_MAX_CHARS).collect();
    excerpt.push_str("...");
    excerpt
}

/// Remove tags and collapse whitespace.
pub fn strip_markup(html: &str) -> String {
    html.chars()
        .fold((String::new(), false), |(mut text, in_tag), c| match c {
            '<' => (text, true),
            '>' => {
                text.push(' ');
                (text, false)
            }
            _ if !in_tag => {
                text.push(c);
                (text, in_tag)
            }
            _ => (text, in_tag),
        })
        .0
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

//! RSS/Atom feed ingestion.
//!
//! The feed is the only index of new articles. Its entries become
//! [`Candidate`]s in the feed's native order (newest first for NRK),
//! truncated to the configured scan depth.
//!
//! # Supported formats
//!
//! | Format | Entry | Link | Timestamp |
//! |--------|-------|------|-----------|
//! | RSS 2.0 | `<item>` | `<link>` text | `<pubDate>`, `<dc:date>` |
//! | RSS 1.0 (RDF) | `<item>` | `<link>` text | `<dc:date>` |
//! | Atom | `<entry>` | `<link href>` (alternate) | `<published>`, `<updated>` |
//!
//! A feed that cannot be fetched or parsed is fatal for the run and is
//! reported as a [`FeedError`], never as an empty candidate list.

use itertools::Itertools;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use reqwest::Client;
use tracing::{debug, info, instrument, warn};
use url::Url;

use crate::error::FeedError;
use crate::models::Candidate;

/// Anything that can list the current feed candidates.
pub trait FeedSource {
    async fn fetch_candidates(&self, limit: usize) -> Result<Vec<Candidate>, FeedError>;
}

/// Reads the configured feed over HTTP(S).
#[derive(Debug, Clone)]
pub struct FeedReader {
    client: Client,
    feed_url: Url,
}

impl FeedReader {
    pub fn new(client: Client, feed_url: Url) -> Self {
        Self { client, feed_url }
    }
}

impl FeedSource for FeedReader {
    #[instrument(level = "info", skip_all, fields(feed_url = %self.feed_url, limit = limit))]
    async fn fetch_candidates(&self, limit: usize) -> Result<Vec<Candidate>, FeedError> {
        let response = self.client.get(self.feed_url.clone()).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(FeedError::Status(status.as_u16()));
        }
        let body = response.text().await?;

        let entries = parse_feed(&body, &self.feed_url)?;
        let total = entries.len();
        let candidates = entries.into_iter().take(limit).collect::<Vec<_>>();
        info!(total, selected = candidates.len(), "Parsed feed");
        Ok(candidates)
    }
}

#[derive(Debug, Default)]
struct EntryBuilder {
    link: Option<String>,
    title: String,
    published: Option<String>,
    updated: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Title,
    Link,
    Published,
    Updated,
}

impl Field {
    fn for_element(name: &str) -> Option<Self> {
        match name {
            "title" => Some(Field::Title),
            "link" => Some(Field::Link),
            "pubDate" | "published" | "date" | "issued" => Some(Field::Published),
            "updated" | "modified" => Some(Field::Updated),
            _ => None,
        }
    }
}

/// Parse a feed document into candidates, resolving relative links
/// against `base` and dropping repeated links after their first entry.
pub fn parse_feed(xml: &str, base: &Url) -> Result<Vec<Candidate>, FeedError> {
    let mut reader = Reader::from_str(xml);

    let mut root_seen = false;
    let mut entries = Vec::new();
    let mut current: Option<EntryBuilder> = None;
    // Elements open below the current entry. Only direct children (depth 0
    // when they start) are entry fields; `<source>`, `<media:content>` and
    // similar wrappers are skipped with everything inside them.
    let mut depth = 0usize;
    let mut field: Option<Field> = None;
    let mut buffer = String::new();

    loop {
        match reader.read_event() {
            Err(e) => return Err(FeedError::Parse(e.to_string())),
            Ok(Event::Eof) => break,
            Ok(Event::Start(e)) => {
                let name = local_name(&e);
                if !root_seen {
                    check_root(&name)?;
                    root_seen = true;
                    continue;
                }
                if current.is_none() {
                    if name == "item" || name == "entry" {
                        current = Some(EntryBuilder::default());
                        depth = 0;
                        field = None;
                    }
                    continue;
                }
                let Some(entry) = current.as_mut() else {
                    continue;
                };
                if depth == 0 && !(name == "link" && take_atom_link(&e, entry)) {
                    field = Field::for_element(&name);
                    buffer.clear();
                }
                depth += 1;
            }
            Ok(Event::Empty(e)) => {
                let name = local_name(&e);
                if !root_seen {
                    check_root(&name)?;
                    root_seen = true;
                    continue;
                }
                if let Some(entry) = current.as_mut() {
                    if depth == 0 && name == "link" {
                        take_atom_link(&e, entry);
                    }
                }
            }
            Ok(Event::Text(t)) => {
                if field.is_some() {
                    buffer.push_str(&unescape_bytes(&t));
                }
            }
            Ok(Event::CData(c)) => {
                if field.is_some() {
                    buffer.push_str(&String::from_utf8_lossy(&c));
                }
            }
            Ok(Event::GeneralRef(r)) => {
                if field.is_some() {
                    let reference = format!("&{};", String::from_utf8_lossy(&r));
                    buffer.push_str(&unescape_bytes(reference.as_bytes()));
                }
            }
            Ok(Event::End(_)) => {
                if depth > 0 {
                    depth -= 1;
                    if depth == 0 {
                        if let (Some(entry), Some(f)) = (current.as_mut(), field.take()) {
                            store_field(entry, f, buffer.trim());
                        }
                    }
                } else if let Some(entry) = current.take() {
                    if let Some(candidate) = finish_entry(entry, base) {
                        entries.push(candidate);
                    }
                }
            }
            Ok(_) => {}
        }
    }

    if !root_seen {
        return Err(FeedError::Parse("document has no root element".to_string()));
    }

    let parsed = entries.len();
    let unique = entries
        .into_iter()
        .unique_by(|c| c.url.clone())
        .collect::<Vec<_>>();
    if unique.len() != parsed {
        debug!(dropped = parsed - unique.len(), "Dropped repeated feed links");
    }
    Ok(unique)
}

fn check_root(name: &str) -> Result<(), FeedError> {
    match name {
        "rss" | "feed" | "RDF" => Ok(()),
        other => Err(FeedError::Parse(format!(
            "unexpected root element <{other}>"
        ))),
    }
}

fn local_name(e: &BytesStart<'_>) -> String {
    String::from_utf8_lossy(e.local_name().as_ref()).into_owned()
}

fn unescape_bytes(raw: &[u8]) -> String {
    let s = String::from_utf8_lossy(raw);
    match quick_xml::escape::unescape(&s) {
        Ok(unescaped) => unescaped.into_owned(),
        Err(_) => s.into_owned(),
    }
}

/// Record an Atom-style `<link href=".." rel="..">`. Returns whether the
/// element carried an `href` (and so has no text content to capture).
fn take_atom_link(e: &BytesStart<'_>, entry: &mut EntryBuilder) -> bool {
    let mut href = None;
    let mut rel = None;
    for attr in e.attributes().flatten() {
        match attr.key.local_name().as_ref() {
            b"href" => href = Some(unescape_bytes(&attr.value)),
            b"rel" => rel = Some(unescape_bytes(&attr.value)),
            _ => {}
        }
    }

    let Some(href) = href else {
        return false;
    };
    let alternate = rel.as_deref().is_none_or(|r| r == "alternate");
    if alternate && entry.link.is_none() {
        entry.link = Some(href.trim().to_string());
    }
    true
}

fn store_field(entry: &mut EntryBuilder, field: Field, value: &str) {
    if value.is_empty() {
        return;
    }
    match field {
        Field::Title => {
            if entry.title.is_empty() {
                entry.title = value.to_string();
            }
        }
        Field::Link => {
            if entry.link.is_none() {
                entry.link = Some(value.to_string());
            }
        }
        Field::Published => {
            if entry.published.is_none() {
                entry.published = Some(value.to_string());
            }
        }
        Field::Updated => {
            if entry.updated.is_none() {
                entry.updated = Some(value.to_string());
            }
        }
    }
}

fn finish_entry(entry: EntryBuilder, base: &Url) -> Option<Candidate> {
    let Some(link) = entry.link else {
        warn!(title = %entry.title, "Feed entry has no link; skipping");
        return None;
    };
    let url = match base.join(&link) {
        Ok(url) => url,
        Err(e) => {
            warn!(%link, error = %e, "Feed entry link is not a valid URL; skipping");
            return None;
        }
    };

    Some(Candidate {
        url: url.to_string(),
        title: entry.title,
        published_at: entry.published.or(entry.updated),
    })
}

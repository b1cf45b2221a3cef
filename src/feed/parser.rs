use quick_xml::events::{BytesStart, BytesText, Event};
use quick_xml::Reader;
use tracing::debug;

use crate::error::{Error, Result};
use crate::feed::dates::normalize_date;
use crate::feed::sanitize::TextSanitizer;
use crate::feed::{Feed, FeedType, NewsArticle, ParsedFeed};

/// Format-specific article extraction.
///
/// Two paths share one contract: given feed content and the owning feed's
/// metadata, produce a [`ParsedFeed`]. The RSS path covers both the
/// RSS 2.0 and the RDF/RSS 1.0 item vocabularies; the Atom path handles
/// entry link relations, summary/content fallback, and nested authors.
///
/// Entries missing a title or link are skipped, never fatal. A document
/// that is not well-formed XML fails the whole parse.
#[derive(Debug, Clone, Default)]
pub struct FeedParser {
    sanitizer: TextSanitizer,
}

/// Accumulates one item/entry while its element is open.
#[derive(Debug, Default)]
struct ArticleDraft {
    title: String,
    link: String,
    description: String,
    summary: String,
    content: String,
    author: String,
    category: String,
    published_raw: String,
    updated_raw: String,
}

/// Rank of an Atom link relation; lower is preferred.
fn link_rank(rel: Option<&str>) -> u8 {
    match rel {
        Some("alternate") => 0,
        None => 1,
        Some(_) => 2,
    }
}

impl FeedParser {
    pub fn new() -> Self {
        Self {
            sanitizer: TextSanitizer::new(),
        }
    }

    /// Dispatches to the extraction path for the detected format.
    pub fn parse(&self, feed_type: FeedType, content: &str, feed: &Feed) -> Result<ParsedFeed> {
        match feed_type {
            FeedType::Rss2 | FeedType::Rss1 => self.parse_rss(content, feed),
            FeedType::Atom1 => self.parse_atom(content, feed),
            FeedType::Unknown => Err(Error::UnknownFormat(format!(
                "no recognizable feed markers in document from {}",
                feed.url
            ))),
        }
    }

    /// RSS 2.0 / RSS 1.0: channel metadata plus `<item>` elements.
    /// `pubDate`/`dc:date` and `author`/`dc:creator` are accepted
    /// interchangeably, which is what covers the RDF dialect.
    fn parse_rss(&self, content: &str, feed: &Feed) -> Result<ParsedFeed> {
        let mut reader = Reader::from_reader(content.as_bytes());
        reader.config_mut().trim_text(true);

        let mut parsed = ParsedFeed::default();
        let mut draft: Option<ArticleDraft> = None;
        let mut skipping: Option<String> = None;
        let mut text = String::new();
        let mut buf = Vec::new();
        let mut skipped = 0usize;

        loop {
            match reader.read_event_into(&mut buf) {
                Ok(Event::Start(e)) => {
                    let name = element_name(&e);
                    if skipping.is_some() {
                        // nothing inside a skipped subtree is ours
                    } else if draft.is_none() && matches!(name.as_str(), "image" | "textinput" | "textInput") {
                        skipping = Some(name);
                    } else if name == "item" {
                        draft = Some(ArticleDraft::default());
                    }
                    text.clear();
                }
                Ok(Event::Empty(_)) => text.clear(),
                Ok(Event::Text(e)) => text.push_str(&decode_text(&e)),
                Ok(Event::CData(e)) => text.push_str(&String::from_utf8_lossy(&e.into_inner())),
                Ok(Event::End(e)) => {
                    let name = element_name_end(e.name().as_ref());
                    if skipping.as_deref() == Some(name.as_str()) {
                        skipping = None;
                    } else if skipping.is_some() {
                        // still inside the skipped subtree
                    } else if name == "item" {
                        match self.finish_draft(draft.take()) {
                            Some(article) => parsed.articles.push(article),
                            None => skipped += 1,
                        }
                    } else if let Some(ref mut item) = draft {
                        match name.as_str() {
                            "title" => item.title = text.clone(),
                            "link" => item.link = text.trim().to_string(),
                            "description" => item.description = text.clone(),
                            "pubDate" | "dc:date" => item.published_raw = text.clone(),
                            "author" | "dc:creator" => item.author = text.clone(),
                            "category" => {
                                if item.category.is_empty() {
                                    item.category = text.clone();
                                }
                            }
                            _ => {}
                        }
                    } else {
                        match name.as_str() {
                            "title" => parsed.title = self.sanitizer.strip_markup(&text),
                            "description" => parsed.description = self.sanitizer.strip_markup(&text),
                            _ => {}
                        }
                    }
                    text.clear();
                }
                Ok(Event::Eof) => break,
                Ok(_) => {}
                Err(e) => {
                    return Err(Error::FeedParse(format!(
                        "malformed XML in feed from {}: {}",
                        feed.url, e
                    )))
                }
            }
            buf.clear();
        }

        if skipped > 0 {
            debug!(url = %feed.url, skipped, "dropped items missing title or link");
        }
        self.stamp_source(&mut parsed, feed);
        Ok(parsed)
    }

    /// Atom 1.0: feed metadata plus `<entry>` elements.
    fn parse_atom(&self, content: &str, feed: &Feed) -> Result<ParsedFeed> {
        let mut reader = Reader::from_reader(content.as_bytes());
        reader.config_mut().trim_text(true);

        let mut parsed = ParsedFeed::default();
        let mut draft: Option<ArticleDraft> = None;
        let mut in_author = false;
        let mut in_source = false;
        let mut link_best = u8::MAX;
        let mut text = String::new();
        let mut buf = Vec::new();
        let mut skipped = 0usize;

        loop {
            match reader.read_event_into(&mut buf) {
                Ok(Event::Start(e)) => {
                    let name = element_name(&e);
                    match name.as_str() {
                        "entry" => {
                            draft = Some(ArticleDraft::default());
                            link_best = u8::MAX;
                        }
                        "author" => in_author = true,
                        "source" if draft.is_some() => in_source = true,
                        "link" => {
                            if let Some(ref mut item) = draft {
                                if !in_source {
                                    Self::take_atom_link(&e, item, &mut link_best);
                                }
                            }
                        }
                        _ => {}
                    }
                    text.clear();
                }
                Ok(Event::Empty(e)) => {
                    let name = element_name(&e);
                    if let Some(ref mut item) = draft {
                        if !in_source {
                            match name.as_str() {
                                "link" => Self::take_atom_link(&e, item, &mut link_best),
                                "category" => {
                                    if item.category.is_empty() {
                                        item.category = attribute(&e, b"term");
                                    }
                                }
                                _ => {}
                            }
                        }
                    }
                    text.clear();
                }
                Ok(Event::Text(e)) => text.push_str(&decode_text(&e)),
                Ok(Event::CData(e)) => text.push_str(&String::from_utf8_lossy(&e.into_inner())),
                Ok(Event::End(e)) => {
                    let name = element_name_end(e.name().as_ref());
                    match name.as_str() {
                        "entry" => {
                            match self.finish_draft(draft.take()) {
                                Some(article) => parsed.articles.push(article),
                                None => skipped += 1,
                            }
                        }
                        "author" => in_author = false,
                        "source" if draft.is_some() => in_source = false,
                        _ if in_source => {}
                        "name" => {
                            if in_author {
                                if let Some(ref mut item) = draft {
                                    item.author = text.clone();
                                }
                            }
                        }
                        "title" => match draft {
                            Some(ref mut item) => item.title = text.clone(),
                            None => parsed.title = self.sanitizer.strip_markup(&text),
                        },
                        "subtitle" => {
                            if draft.is_none() {
                                parsed.description = self.sanitizer.strip_markup(&text);
                            }
                        }
                        "summary" => {
                            if let Some(ref mut item) = draft {
                                item.summary = text.clone();
                            }
                        }
                        "content" => {
                            if let Some(ref mut item) = draft {
                                item.content = text.clone();
                            }
                        }
                        "published" => {
                            if let Some(ref mut item) = draft {
                                item.published_raw = text.clone();
                            }
                        }
                        "updated" => {
                            if let Some(ref mut item) = draft {
                                item.updated_raw = text.clone();
                            }
                        }
                        _ => {}
                    }
                    text.clear();
                }
                Ok(Event::Eof) => break,
                Ok(_) => {}
                Err(e) => {
                    return Err(Error::FeedParse(format!(
                        "malformed XML in feed from {}: {}",
                        feed.url, e
                    )))
                }
            }
            buf.clear();
        }

        if skipped > 0 {
            debug!(url = %feed.url, skipped, "dropped entries missing title or link");
        }
        self.stamp_source(&mut parsed, feed);
        Ok(parsed)
    }

    fn take_atom_link(e: &BytesStart<'_>, item: &mut ArticleDraft, best: &mut u8) {
        let rel = optional_attribute(e, b"rel");
        let rank = link_rank(rel.as_deref());
        if rank < *best {
            let href = attribute(e, b"href");
            if !href.is_empty() {
                item.link = href.trim().to_string();
                *best = rank;
            }
        }
    }

    /// Normalizes an accumulated draft into an article, or drops it when
    /// title or link is missing. Ids are assigned later, at dedup.
    fn finish_draft(&self, draft: Option<ArticleDraft>) -> Option<NewsArticle> {
        let draft = draft?;
        let title = self.sanitizer.strip_markup(&draft.title);
        if title.is_empty() || draft.link.is_empty() {
            return None;
        }

        let raw_description = if !draft.description.is_empty() {
            draft.description
        } else if !draft.summary.is_empty() {
            draft.summary
        } else {
            draft.content
        };
        let date_raw = if !draft.published_raw.is_empty() {
            draft.published_raw
        } else {
            draft.updated_raw
        };

        Some(NewsArticle {
            id: String::new(),
            title,
            description: self.sanitizer.strip_markup(&raw_description),
            link: draft.link,
            source: String::new(),
            author: draft.author.trim().to_string(),
            category: draft.category.trim().to_string(),
            published_date: normalize_date(&date_raw),
            cached_at: 0,
        })
    }

    /// Source label: the document's own title wins, the stored feed
    /// metadata covers documents that carry none.
    fn stamp_source(&self, parsed: &mut ParsedFeed, feed: &Feed) {
        let source = if !parsed.title.is_empty() {
            parsed.title.clone()
        } else {
            feed.display_source().to_string()
        };
        for article in &mut parsed.articles {
            article.source = source.clone();
        }
    }
}

fn element_name(e: &BytesStart<'_>) -> String {
    String::from_utf8_lossy(e.name().as_ref()).into_owned()
}

fn element_name_end(name: &[u8]) -> String {
    String::from_utf8_lossy(name).into_owned()
}

/// Unescapes element text; undefined entities are kept verbatim rather
/// than failing the document.
fn decode_text(e: &BytesText<'_>) -> String {
    match e.unescape() {
        Ok(unescaped) => unescaped.into_owned(),
        Err(_) => String::from_utf8_lossy(e.as_ref()).into_owned(),
    }
}

fn attribute(e: &BytesStart<'_>, key: &[u8]) -> String {
    optional_attribute(e, key).unwrap_or_default()
}

fn optional_attribute(e: &BytesStart<'_>, key: &[u8]) -> Option<String> {
    for attr in e.attributes().flatten() {
        if attr.key.as_ref() == key {
            return attr
                .unescape_value()
                .map(|v| v.into_owned())
                .ok()
                .or_else(|| Some(String::from_utf8_lossy(&attr.value).into_owned()));
        }
    }
    None
}

// src/ingest/feed.rs
//! RSS 2.0 / RSS 1.0 (RDF) / Atom parsing on top of quick-xml's serde support.

use std::borrow::Cow;

use anyhow::{anyhow, Context, Result};
use metrics::{counter, histogram};
use once_cell::sync::OnceCell;
use quick_xml::de::from_str;
use quick_xml::events::Event;
use quick_xml::Reader;
use regex::{Captures, Regex};
use serde::Deserialize;

use crate::ingest::plain_text;
use crate::ingest::types::FeedEntry;

#[derive(Debug, Deserialize)]
struct Text {
    #[serde(rename = "$text", default)]
    value: String,
}

// --- RSS 2.0 ---
#[derive(Debug, Deserialize)]
struct Rss {
    channel: Channel,
}
#[derive(Debug, Deserialize)]
struct Channel {
    #[serde(rename = "item", default)]
    item: Vec<Item>,
}

// --- RSS 1.0: items are siblings of <channel> ---
#[derive(Debug, Deserialize)]
struct Rdf {
    #[serde(rename = "item", default)]
    item: Vec<Item>,
}

#[derive(Debug, Deserialize)]
struct Item {
    title: Option<String>,
    // Some feeds repeat <link> (or mix in <atom:link/>) inside an item.
    #[serde(rename = "link", default)]
    link: Vec<String>,
    guid: Option<Text>,
    description: Option<String>,
}

// --- Atom ---
#[derive(Debug, Deserialize)]
struct AtomFeed {
    #[serde(rename = "entry", default)]
    entry: Vec<AtomEntry>,
}
#[derive(Debug, Deserialize)]
struct AtomEntry {
    id: Option<String>,
    title: Option<Text>,
    summary: Option<Text>,
    content: Option<Text>,
    #[serde(rename = "link", default)]
    link: Vec<AtomLink>,
}
#[derive(Debug, Deserialize)]
struct AtomLink {
    #[serde(rename = "@href")]
    href: Option<String>,
    #[serde(rename = "@rel")]
    rel: Option<String>,
}

impl AtomEntry {
    /// `rel="alternate"` (or no rel) wins over any other link.
    fn alternate_href(&self) -> Option<&str> {
        self.link
            .iter()
            .find(|l| matches!(l.rel.as_deref(), None | Some("alternate")))
            .or_else(|| self.link.first())
            .and_then(|l| l.href.as_deref())
    }
}

fn non_blank(s: Option<&str>) -> Option<String> {
    s.map(str::trim).filter(|s| !s.is_empty()).map(str::to_string)
}

/// Identifiers are stored one per line, so one spanning lines can never match again.
fn entry_id(s: Option<&str>) -> Option<String> {
    non_blank(s).filter(|id| !id.contains(['\r', '\n']))
}

/// Re-encode inline xhtml `<summary>`/`<content>` as escaped text so it survives as `$text`.
fn flatten_atom_xhtml(xml: &str) -> Cow<'_, str> {
    static RE: OnceCell<[Regex; 2]> = OnceCell::new();
    let res = RE.get_or_init(|| {
        ["summary", "content"].map(|tag| {
            Regex::new(&format!(
                r#"(?s)<{tag}(\s[^>]*?)?\stype\s*=\s*["']xhtml["']([^>]*)>(.*?)</{tag}>"#
            ))
            .expect("xhtml regex")
        })
    });
    if !xml.contains("xhtml") {
        return Cow::Borrowed(xml);
    }
    let mut out = xml.to_string();
    for (re, tag) in res.iter().zip(["summary", "content"]) {
        out = re
            .replace_all(&out, |c: &Captures| {
                let inner = c.get(3).map_or("", |m| m.as_str());
                format!(
                    r#"<{tag} type="html">{}</{tag}>"#,
                    html_escape::encode_text(inner)
                )
            })
            .into_owned();
    }
    Cow::Owned(out)
}

/// Local name of the document element, if the document has one.
fn root_element(xml: &str) -> Option<String> {
    let mut reader = Reader::from_str(xml);
    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) | Ok(Event::Empty(e)) => {
                return Some(String::from_utf8_lossy(e.local_name().as_ref()).into_owned())
            }
            Ok(Event::Eof) | Err(_) => return None,
            _ => {}
        }
    }
}

fn from_item(it: Item) -> FeedEntry {
    let link = it.link.iter().map(String::as_str).find(|l| !l.trim().is_empty());
    let id = entry_id(it.guid.as_ref().map(|g| g.value.as_str())).or_else(|| entry_id(link));
    FeedEntry {
        title: it.title.as_deref().unwrap_or_default().trim().to_string(),
        summary: plain_text(it.description.as_deref().unwrap_or_default()),
        id,
    }
}

fn from_atom(e: AtomEntry) -> FeedEntry {
    let id = entry_id(e.id.as_deref()).or_else(|| entry_id(e.alternate_href()));
    let summary = e
        .summary
        .as_ref()
        .map(|t| t.value.as_str())
        .filter(|s| !s.trim().is_empty())
        .or(e.content.as_ref().map(|t| t.value.as_str()))
        .unwrap_or_default();
    FeedEntry {
        title: e
            .title
            .as_ref()
            .map(|t| t.value.trim().to_string())
            .unwrap_or_default(),
        summary: plain_text(summary),
        id,
    }
}

/// Parse a feed document into entries, in document order.
/// An error means the document is malformed; an empty vec means it has no entries.
pub fn parse_feed(xml: &str) -> Result<Vec<FeedEntry>> {
    let t0 = std::time::Instant::now();
    let xml_clean = scrub_html_entities_for_xml(&flatten_atom_xhtml(xml));

    let root = root_element(&xml_clean).ok_or_else(|| anyhow!("no root element"))?;
    let out: Vec<FeedEntry> = match root.as_str() {
        "rss" => {
            let rss: Rss = from_str(&xml_clean).context("parsing rss xml")?;
            rss.channel.item.into_iter().map(from_item).collect()
        }
        "RDF" => {
            let rdf: Rdf = from_str(&xml_clean).context("parsing rdf xml")?;
            rdf.item.into_iter().map(from_item).collect()
        }
        "feed" => {
            let atom: AtomFeed = from_str(&xml_clean).context("parsing atom xml")?;
            atom.entry.into_iter().map(from_atom).collect()
        }
        other => return Err(anyhow!("unsupported feed root <{other}>")),
    };

    let ms = t0.elapsed().as_secs_f64() * 1_000.0;
    histogram!("feed_parse_ms").record(ms);
    counter!("feed_entries_total").increment(out.len() as u64);
    Ok(out)
}

fn scrub_html_entities_for_xml(s: &str) -> String {
    s.replace("&nbsp;", " ")
        .replace("&ndash;", "-")
        .replace("&mdash;", "-")
        .replace("&hellip;", "...")
        .replace("&ldquo;", "\"")
        .replace("&rdquo;", "\"")
        .replace("&lsquo;", "'")
        .replace("&rsquo;", "'")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rss_guid_beats_link_and_link_is_fallback() {
        let xml = r#"<?xml version="1.0"?>
<rss version="2.0"><channel><title>t</title>
  <item><title>One</title><link>https://x/1</link><guid isPermaLink="false">g-1</guid><description>a</description></item>
  <item><title>Two</title><link>https://x/2</link></item>
  <item><title>Three</title></item>
</channel></rss>"#;
        let v = parse_feed(xml).unwrap();
        assert_eq!(v.len(), 3);
        assert_eq!(v[0].id.as_deref(), Some("g-1"));
        assert_eq!(v[1].id.as_deref(), Some("https://x/2"));
        assert_eq!(v[2].id, None);
        assert_eq!(v[1].summary, "");
    }

    #[test]
    fn atom_uses_id_then_alternate_link() {
        let xml = r#"<feed xmlns="http://www.w3.org/2005/Atom">
  <title>r/shopify</title>
  <entry><id>t3_abc</id><title>Hello</title><link href="https://r/abc"/>
    <content type="html">&lt;p&gt;Body &amp;amp; more&lt;/p&gt;</content></entry>
  <entry><title>No id</title><link rel="self" href="https://r/self"/><link rel="alternate" href="https://r/alt"/></entry>
</feed>"#;
        let v = parse_feed(xml).unwrap();
        assert_eq!(v[0].id.as_deref(), Some("t3_abc"));
        assert_eq!(v[0].summary, "Body & more");
        assert_eq!(v[1].id.as_deref(), Some("https://r/alt"));
    }

    #[test]
    fn rdf_items_sit_beside_the_channel() {
        let xml = r#"<?xml version="1.0"?>
<rdf:RDF xmlns:rdf="http://www.w3.org/1999/02/22-rdf-syntax-ns#" xmlns="http://purl.org/rss/1.0/">
  <channel rdf:about="https://x/"><title>x</title></channel>
  <item rdf:about="https://x/a"><title>A</title><link>https://x/a</link><description>&lt;b&gt;hi&lt;/b&gt;</description></item>
  <item rdf:about="https://x/b"><title>B</title><link>https://x/b</link></item>
</rdf:RDF>"#;
        let v = parse_feed(xml).unwrap();
        assert_eq!(v.len(), 2);
        assert_eq!(v[0].id.as_deref(), Some("https://x/a"));
        assert_eq!(v[0].summary, "hi");
        assert_eq!(v[1].title, "B");
    }

    #[test]
    fn multi_line_ids_count_as_missing() {
        let xml = "<rss><channel>\
            <item><title>Split</title><guid>a\nb</guid><link>https://x/split</link></item>\
            <item><title>Both</title><guid>c\r\nd</guid></item>\
            <item><title>Padded</title><guid>\n  g-9  \n</guid></item>\
            </channel></rss>";
        let v = parse_feed(xml).unwrap();
        assert_eq!(v[0].id.as_deref(), Some("https://x/split"));
        assert_eq!(v[1].id, None);
        assert_eq!(v[2].id.as_deref(), Some("g-9"));
    }

    #[test]
    fn repeated_links_keep_the_feed_and_first_non_blank_wins() {
        let xml = r#"<rss xmlns:atom="http://www.w3.org/2005/Atom"><channel>
  <item><title>A</title><atom:link href="https://x/self" rel="self"/><link>https://x/a</link><link>https://x/a2</link></item>
  <item><title>B</title><link>https://x/b</link></item>
</channel></rss>"#;
        let v = parse_feed(xml).unwrap();
        assert_eq!(v.len(), 2);
        assert_eq!(v[0].id.as_deref(), Some("https://x/a"));
        assert_eq!(v[1].id.as_deref(), Some("https://x/b"));
    }

    #[test]
    fn atom_xhtml_content_becomes_summary_text() {
        let xml = r#"<feed xmlns="http://www.w3.org/2005/Atom">
  <entry><id>e1</id><title>X</title>
    <content type="xhtml"><div xmlns="http://www.w3.org/1999/xhtml"><p>Ship <b>faster</b> &amp; cheaper</p></div></content>
  </entry>
</feed>"#;
        let v = parse_feed(xml).unwrap();
        assert_eq!(v[0].id.as_deref(), Some("e1"));
        assert_eq!(v[0].summary, "Ship faster & cheaper");
    }

    #[test]
    fn unknown_root_and_garbage_are_malformed() {
        assert!(parse_feed("<html><body>nope</body></html>").is_err());
        assert!(parse_feed("not xml at all").is_err());
    }

    #[test]
    fn empty_channel_is_ok_and_empty() {
        let xml = "<rss><channel><title>x</title></channel></rss>";
        assert!(parse_feed(xml).unwrap().is_empty());
    }
}

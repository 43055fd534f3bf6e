// src/ingest/mod.rs
pub mod feed;
pub mod providers;
pub mod types;

use once_cell::sync::OnceCell;
use rand::seq::{IndexedRandom, SliceRandom};
use rand::Rng;
use regex::Regex;

use crate::config::{FeedSource, SelectionStrategy};
use crate::ingest::types::{Candidate, FeedEntry, FeedFetcher, FetchOutcome, NoCandidate};
use crate::ledger::Ledger;

const SUMMARY_MAX_CHARS: usize = 1500;

/// Reduce feed HTML to prompt-friendly text: decode entities, drop tags, collapse whitespace.
pub fn plain_text(s: &str) -> String {
    // 1) HTML entity decode
    let mut out = html_escape::decode_html_entities(s).to_string();

    // 2) Strip HTML tags
    static RE_TAGS: OnceCell<Regex> = OnceCell::new();
    let re_tags = RE_TAGS.get_or_init(|| Regex::new(r"(?is)</?[^>]+>").expect("tag regex"));
    out = re_tags.replace_all(&out, " ").to_string();

    // 3) Collapse whitespace
    static RE_WS: OnceCell<Regex> = OnceCell::new();
    let re_ws = RE_WS.get_or_init(|| Regex::new(r"\s+").expect("ws regex"));
    out = re_ws.replace_all(&out, " ").trim().to_string();

    // 4) Length cap
    if out.chars().count() > SUMMARY_MAX_CHARS {
        out = out.chars().take(SUMMARY_MAX_CHARS).collect();
    }
    out
}

/// Sources to try this run, in order. `Random` draws exactly one.
pub fn source_order<'a, R: Rng + ?Sized>(
    sources: &'a [FeedSource],
    strategy: SelectionStrategy,
    rng: &mut R,
) -> Vec<&'a FeedSource> {
    match strategy {
        SelectionStrategy::Random => sources.choose(rng).into_iter().collect(),
        SelectionStrategy::RandomWithFallback => {
            let mut all: Vec<&FeedSource> = sources.iter().collect();
            all.shuffle(rng);
            all
        }
    }
}

/// First entry, in feed order, with an identifier that `is_seen` rejects.
/// Entries without an identifier are passed over.
pub fn first_unseen<F>(source: &str, entries: Vec<FeedEntry>, is_seen: F) -> Option<Candidate>
where
    F: Fn(&str) -> bool,
{
    entries.into_iter().find_map(|e| {
        let id = e.id?;
        if is_seen(&id) {
            return None;
        }
        Some(Candidate {
            source: source.to_string(),
            title: e.title,
            summary: e.summary,
            id,
        })
    })
}

/// Fetch one source and look for an unseen entry in it.
pub async fn fetch_from_source(
    source: &FeedSource,
    fetcher: &dyn FeedFetcher,
    ledger: &Ledger,
) -> FetchOutcome {
    tracing::info!(source = %source.name, url = %source.url, "fetching feed");

    let body = match fetcher.fetch(source).await {
        Ok(b) => b,
        Err(e) => {
            tracing::warn!(
                error = ?e,
                source = %source.name,
                fetcher = fetcher.name(),
                "feed fetch error"
            );
            return FetchOutcome::NoCandidate(NoCandidate::Transport(format!("{e:#}")));
        }
    };

    let entries = match feed::parse_feed(&body) {
        Ok(v) => v,
        Err(e) => {
            tracing::warn!(error = ?e, source = %source.name, "feed parse error");
            return FetchOutcome::NoCandidate(NoCandidate::Malformed(format!("{e:#}")));
        }
    };
    if entries.is_empty() {
        return FetchOutcome::NoCandidate(NoCandidate::EmptyFeed);
    }

    let total = entries.len();
    match first_unseen(&source.name, entries, |id| ledger.contains(id)) {
        Some(c) => {
            tracing::info!(source = %source.name, id = %c.id, title = %c.title, "new entry found");
            FetchOutcome::Candidate(c)
        }
        None => FetchOutcome::NoCandidate(NoCandidate::AllSeen { entries: total }),
    }
}

/// Walk `order` until a source yields a candidate. Reports the last reason otherwise.
pub async fn find_candidate(
    order: &[&FeedSource],
    fetcher: &dyn FeedFetcher,
    ledger: &Ledger,
) -> FetchOutcome {
    let mut last = NoCandidate::EmptyFeed;
    for source in order {
        match fetch_from_source(source, fetcher, ledger).await {
            FetchOutcome::Candidate(c) => return FetchOutcome::Candidate(c),
            FetchOutcome::NoCandidate(reason) => {
                tracing::info!(source = %source.name, %reason, "no candidate from source");
                last = reason;
            }
        }
    }
    FetchOutcome::NoCandidate(last)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::collections::HashSet;

    fn entry(id: Option<&str>, title: &str) -> FeedEntry {
        FeedEntry {
            title: title.into(),
            summary: String::new(),
            id: id.map(Into::into),
        }
    }

    #[test]
    fn plain_text_strips_markup() {
        let s = "  <p>Hello,&nbsp;&nbsp; <b>world</b>!</p>\n\n ";
        assert_eq!(plain_text(s), "Hello, world !");
    }

    #[test]
    fn first_unseen_wins_over_later_ones() {
        let seen: HashSet<&str> = ["A"].into_iter().collect();
        let entries = vec![entry(Some("A"), "a"), entry(Some("B"), "b"), entry(Some("C"), "c")];
        let c = first_unseen("src", entries, |id| seen.contains(id)).unwrap();
        assert_eq!(c.id, "B");
        assert_eq!(c.source, "src");
    }

    #[test]
    fn entries_without_id_are_skipped() {
        let entries = vec![entry(None, "no id"), entry(Some("x"), "x")];
        let c = first_unseen("src", entries, |_| false).unwrap();
        assert_eq!(c.id, "x");

        let only_missing = vec![entry(None, "a"), entry(None, "b")];
        assert!(first_unseen("src", only_missing, |_| false).is_none());
    }

    #[test]
    fn random_draws_exactly_one_source() {
        let sources = vec![FeedSource::new("a", "u1"), FeedSource::new("b", "u2")];
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..20 {
            assert_eq!(source_order(&sources, SelectionStrategy::Random, &mut rng).len(), 1);
        }
    }

    #[test]
    fn fallback_covers_every_source_once() {
        let sources = vec![
            FeedSource::new("a", "u1"),
            FeedSource::new("b", "u2"),
            FeedSource::new("c", "u3"),
        ];
        let mut rng = StdRng::seed_from_u64(42);
        let order = source_order(&sources, SelectionStrategy::RandomWithFallback, &mut rng);
        let names: HashSet<&str> = order.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(order.len(), 3);
        assert_eq!(names.len(), 3);
    }
}

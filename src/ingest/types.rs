// src/ingest/types.rs
use anyhow::Result;
use std::fmt;

use crate::config::FeedSource;

/// An entry as parsed from a feed, before dedup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedEntry {
    pub title: String,
    pub summary: String,
    /// Entry id, else its link; `None` makes the entry unusable.
    pub id: Option<String>,
}

/// The unseen entry picked for this run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub source: String,
    pub title: String,
    pub summary: String,
    pub id: String,
}

/// Why a source produced nothing. None of these are errors for the run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NoCandidate {
    Transport(String),
    Malformed(String),
    EmptyFeed,
    AllSeen { entries: usize },
}

impl fmt::Display for NoCandidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NoCandidate::Transport(e) => write!(f, "feed fetch failed: {e}"),
            NoCandidate::Malformed(e) => write!(f, "feed could not be parsed: {e}"),
            NoCandidate::EmptyFeed => f.write_str("feed has no entries"),
            NoCandidate::AllSeen { entries } => {
                write!(f, "all {entries} entries already processed or without id")
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    Candidate(Candidate),
    NoCandidate(NoCandidate),
}

/// Retrieves the raw feed document for a source.
#[async_trait::async_trait]
pub trait FeedFetcher: Send + Sync {
    async fn fetch(&self, source: &FeedSource) -> Result<String>;
    fn name(&self) -> &'static str;
}

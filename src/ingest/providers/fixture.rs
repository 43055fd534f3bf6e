// src/ingest/providers/fixture.rs
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;

use crate::config::FeedSource;
use crate::ingest::types::FeedFetcher;

/// Serves canned feed documents keyed by URL. Records which URLs were requested.
#[derive(Default)]
pub struct FixtureFetcher {
    docs: HashMap<String, String>,
    pub calls: Mutex<Vec<String>>,
}

impl FixtureFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_doc(mut self, url: &str, xml: &str) -> Self {
        self.docs.insert(url.to_string(), xml.to_string());
        self
    }

    pub fn requested(&self) -> Vec<String> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl FeedFetcher for FixtureFetcher {
    async fn fetch(&self, source: &FeedSource) -> Result<String> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(source.url.clone());
        }
        self.docs
            .get(&source.url)
            .cloned()
            .ok_or_else(|| anyhow!("no fixture for {}", source.url))
    }

    fn name(&self) -> &'static str {
        "fixture"
    }
}

// src/ingest/providers/http.rs
use anyhow::{Context, Result};
use async_trait::async_trait;
use metrics::counter;

use crate::config::{AgentConfig, FeedSource};
use crate::ingest::types::FeedFetcher;

/// Fetches feeds over HTTP(S) with a browser-like user agent.
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new(cfg: &AgentConfig) -> Result<Self> {
        let mut builder = reqwest::Client::builder().user_agent(cfg.user_agent.as_str());
        if let Some(t) = cfg.http_timeout() {
            builder = builder.timeout(t);
        }
        let client = builder.build().context("building feed http client")?;
        Ok(Self { client })
    }
}

#[async_trait]
impl FeedFetcher for HttpFetcher {
    async fn fetch(&self, source: &FeedSource) -> Result<String> {
        let resp = match self.client.get(&source.url).send().await {
            Ok(resp) => resp,
            Err(e) => {
                counter!("feed_fetch_errors_total").increment(1);
                return Err(e).with_context(|| format!("GET {}", source.url));
            }
        };

        let status = resp.status();
        if !status.is_success() {
            counter!("feed_fetch_errors_total").increment(1);
            anyhow::bail!("HTTP {} when fetching {}", status, source.url);
        }
        resp.text().await.context("reading feed body")
    }

    fn name(&self) -> &'static str {
        "http"
    }
}

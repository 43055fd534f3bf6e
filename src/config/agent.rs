// src/config/agent.rs
use anyhow::{anyhow, bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const ENV_CONFIG_PATH: &str = "AGENT_CONFIG_PATH";
pub const DEFAULT_CONFIG_PATH: &str = "config/agent.toml";

const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/58.0.3029.110 Safari/537.36";

/// One named feed in the source table.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FeedSource {
    pub name: String,
    pub url: String,
}

impl FeedSource {
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
        }
    }
}

/// How the run picks a feed.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum SelectionStrategy {
    /// One uniformly random source per run; nothing found means nothing to do.
    #[default]
    Random,
    /// Random first pick, then the remaining sources in random order until one yields.
    RandomWithFallback,
}

fn default_feeds() -> Vec<FeedSource> {
    vec![
        FeedSource::new("r/shopify", "https://www.reddit.com/r/shopify/.rss"),
        FeedSource::new("r/shopee", "https://www.reddit.com/r/shopee/.rss"),
        FeedSource::new("e-commerce-times", "https://www.ecommercetimes.com/feed/"),
    ]
}
fn default_ledger_path() -> PathBuf {
    PathBuf::from("_data/processed_posts.log")
}
fn default_posts_dir() -> PathBuf {
    PathBuf::from("_posts")
}
fn default_layout() -> String {
    "default".to_string()
}
fn default_user_agent() -> String {
    DEFAULT_USER_AGENT.to_string()
}
fn default_model() -> String {
    "gemini-2.5-flash".to_string()
}
fn default_api_base() -> String {
    "https://generativelanguage.googleapis.com/v1beta".to_string()
}
fn default_http_timeout_secs() -> u64 {
    30
}

/// Process-wide configuration. Built once in `main` and passed by reference.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    #[serde(default = "default_feeds")]
    pub feeds: Vec<FeedSource>,
    #[serde(default = "default_ledger_path")]
    pub ledger_path: PathBuf,
    #[serde(default = "default_posts_dir")]
    pub posts_dir: PathBuf,
    /// Front-matter `layout:` value expected by the site generator.
    #[serde(default = "default_layout")]
    pub layout: String,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_api_base")]
    pub api_base: String,
    /// 0 disables the timeout.
    #[serde(default = "default_http_timeout_secs")]
    pub http_timeout_secs: u64,
    #[serde(default)]
    pub selection: SelectionStrategy,
    /// Prometheus textfile written at the end of a run (optional).
    #[serde(default)]
    pub metrics_path: Option<PathBuf>,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            feeds: default_feeds(),
            ledger_path: default_ledger_path(),
            posts_dir: default_posts_dir(),
            layout: default_layout(),
            user_agent: default_user_agent(),
            model: default_model(),
            api_base: default_api_base(),
            http_timeout_secs: default_http_timeout_secs(),
            selection: SelectionStrategy::default(),
            metrics_path: None,
        }
    }
}

impl AgentConfig {
    pub fn http_timeout(&self) -> Option<Duration> {
        (self.http_timeout_secs > 0).then(|| Duration::from_secs(self.http_timeout_secs))
    }

    /// Parse TOML and check the invariants the pipeline relies on.
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let mut cfg: AgentConfig = toml::from_str(s).context("parsing agent config toml")?;

        for f in cfg.feeds.iter_mut() {
            f.name = f.name.trim().to_string();
            f.url = f.url.trim().to_string();
        }
        cfg.layout = cfg.layout.trim().to_string();
        if cfg.layout.is_empty() {
            cfg.layout = default_layout();
        }
        cfg.api_base = cfg.api_base.trim_end_matches('/').to_string();

        cfg.validate()?;
        Ok(cfg)
    }

    fn validate(&self) -> Result<()> {
        if self.feeds.is_empty() {
            bail!("config must list at least one feed");
        }
        let mut names = HashSet::new();
        for f in &self.feeds {
            if f.name.is_empty() || f.url.is_empty() {
                bail!("feed entries need both a name and a url");
            }
            if !names.insert(f.name.as_str()) {
                bail!("duplicate feed name: {}", f.name);
            }
        }
        Ok(())
    }
}

/// Load config from an explicit TOML path.
pub fn load_config_from(path: &Path) -> Result<AgentConfig> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("reading agent config from {}", path.display()))?;
    AgentConfig::from_toml_str(&content)
        .with_context(|| format!("invalid agent config {}", path.display()))
}

/// Load config using env var + fallbacks:
/// 1) $AGENT_CONFIG_PATH
/// 2) config/agent.toml
/// 3) built-in defaults
pub fn load_config_default() -> Result<AgentConfig> {
    if let Ok(p) = std::env::var(ENV_CONFIG_PATH) {
        let pb = PathBuf::from(p);
        if pb.exists() {
            return load_config_from(&pb);
        } else {
            return Err(anyhow!("{ENV_CONFIG_PATH} points to non-existent path"));
        }
    }
    let toml_p = PathBuf::from(DEFAULT_CONFIG_PATH);
    if toml_p.exists() {
        return load_config_from(&toml_p);
    }
    Ok(AgentConfig::default())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_toml_fills_defaults() {
        let cfg = AgentConfig::from_toml_str(
            r#"
posts_dir = "out/_posts"
selection = "random_with_fallback"

[[feeds]]
name = " blog "
url = "https://example.com/feed.xml"
"#,
        )
        .unwrap();
        assert_eq!(cfg.feeds, vec![FeedSource::new("blog", "https://example.com/feed.xml")]);
        assert_eq!(cfg.posts_dir, PathBuf::from("out/_posts"));
        assert_eq!(cfg.ledger_path, default_ledger_path());
        assert_eq!(cfg.layout, "default");
        assert_eq!(cfg.selection, SelectionStrategy::RandomWithFallback);
        assert_eq!(cfg.http_timeout(), Some(Duration::from_secs(30)));
    }

    #[test]
    fn empty_feed_table_is_rejected() {
        let err = AgentConfig::from_toml_str("feeds = []").unwrap_err();
        assert!(err.to_string().contains("at least one feed"));
    }

    #[test]
    fn duplicate_names_are_rejected() {
        let toml = r#"
[[feeds]]
name = "a"
url = "https://a.example/rss"

[[feeds]]
name = "a"
url = "https://b.example/rss"
"#;
        assert!(AgentConfig::from_toml_str(toml).is_err());
    }

    #[test]
    fn zero_timeout_disables_it() {
        let cfg = AgentConfig::from_toml_str("http_timeout_secs = 0").unwrap();
        assert_eq!(cfg.http_timeout(), None);
        assert_eq!(cfg.feeds.len(), 3);
    }
}

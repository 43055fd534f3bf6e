//! ledger.rs — append-only record of feed entries already turned into posts.
//!
//! One identifier per line. The whole file is read into memory at load; only
//! `append` ever writes, and only after a post is on disk.

use std::collections::HashSet;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use metrics::counter;

#[derive(Debug)]
pub struct Ledger {
    path: PathBuf,
    seen: HashSet<String>,
}

impl Ledger {
    /// Ensure the file (and its parent dir) exists, then read every identifier.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("creating ledger dir {}", parent.display()))?;
        }
        if !path.exists() {
            fs::File::create(&path)
                .with_context(|| format!("creating ledger {}", path.display()))?;
        }

        let content = fs::read_to_string(&path)
            .with_context(|| format!("reading ledger {}", path.display()))?;
        let seen = content
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(str::to_string)
            .collect();

        Ok(Self { path, seen })
    }

    pub fn contains(&self, id: &str) -> bool {
        self.seen.contains(id)
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one identifier and sync it to disk. Errors here are fatal for the run.
    pub fn append(&mut self, id: &str) -> Result<()> {
        if id.trim().is_empty() || id.contains(['\r', '\n']) {
            bail!("ledger identifier must be a single non-blank line: {id:?}");
        }
        let mut f = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .with_context(|| format!("opening ledger {} for append", self.path.display()))?;
        writeln!(f, "{id}")
            .with_context(|| format!("appending to ledger {}", self.path.display()))?;
        f.sync_all().context("syncing ledger")?;

        self.seen.insert(id.to_string());
        counter!("ledger_appends_total").increment(1);
        Ok(())
    }
}

// src/publish/mod.rs
//! Static-site post output: `<posts_dir>/<YYYY-MM-DD>-<slug>.md` with a front-matter header.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PostError {
    #[error("generated text has no blank line between title and body")]
    MissingSeparator,
    #[error("generated title is empty after cleanup")]
    EmptyTitle,
    #[error("writing post {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl PostError {
    fn io(path: &Path, source: io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Title/body split of a generated insight.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Insight {
    pub title: String,
    pub body: String,
}

/// Split on the first blank line. Title is cleaned of markup; body is trimmed.
pub fn parse_insight(text: &str) -> Result<Insight, PostError> {
    let text = text.replace("\r\n", "\n");
    let (raw_title, body) = text
        .split_once("\n\n")
        .ok_or(PostError::MissingSeparator)?;

    let title = sanitize_title(raw_title);
    if slugify(&title).is_empty() {
        return Err(PostError::EmptyTitle);
    }
    Ok(Insight {
        title,
        body: body.trim().to_string(),
    })
}

/// Drop emphasis markers and heading/code decoration; fold inner whitespace.
pub fn sanitize_title(raw: &str) -> String {
    let t = raw.replace("**", "").replace("__", "");
    let t = t.trim_matches(|c: char| c.is_whitespace() || matches!(c, '#' | '*' | '_' | '`'));
    t.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Longest slug in bytes; keeps `<date>-<slug>.md` and its tmp sibling under NAME_MAX.
const SLUG_MAX_BYTES: usize = 120;

/// lowercase, spaces to hyphens, then keep only alphanumerics and hyphens.
/// Over-long slugs are cut on a char boundary, dropping any dangling hyphen.
pub fn slugify(title: &str) -> String {
    let mut slug: String = title
        .to_lowercase()
        .replace(' ', "-")
        .chars()
        .filter(|c| c.is_alphanumeric() || *c == '-')
        .collect();
    if slug.len() > SLUG_MAX_BYTES {
        let mut cut = SLUG_MAX_BYTES;
        while !slug.is_char_boundary(cut) {
            cut -= 1;
        }
        slug.truncate(cut);
        slug.truncate(slug.trim_end_matches('-').len());
    }
    slug
}

pub fn post_filename(date: NaiveDate, slug: &str) -> String {
    format!("{}-{}.md", date.format("%Y-%m-%d"), slug)
}

fn yaml_quote(s: &str) -> String {
    format!("\"{}\"", s.replace('\\', "\\\\").replace('"', "\\\""))
}

/// Front matter, blank line, body.
pub fn render_post(layout: &str, insight: &Insight) -> String {
    format!(
        "---\nlayout: {}\ntitle: {}\n---\n\n{}",
        layout,
        yaml_quote(&insight.title),
        insight.body
    )
}

/// Writes posts into one directory.
#[derive(Debug, Clone)]
pub struct PostWriter {
    posts_dir: PathBuf,
    layout: String,
}

impl PostWriter {
    pub fn new(posts_dir: impl Into<PathBuf>, layout: impl Into<String>) -> Self {
        Self {
            posts_dir: posts_dir.into(),
            layout: layout.into(),
        }
    }

    /// Parse, render and write one post dated `date`. Returns the final path.
    /// A same-day post with the same slug is overwritten.
    pub fn write(&self, text: &str, date: NaiveDate) -> Result<PathBuf, PostError> {
        let insight = parse_insight(text)?;
        let name = post_filename(date, &slugify(&insight.title));
        let content = render_post(&self.layout, &insight);

        fs::create_dir_all(&self.posts_dir).map_err(|e| PostError::io(&self.posts_dir, e))?;
        let path = self.posts_dir.join(&name);
        write_atomic(&path, &self.posts_dir.join(format!(".{name}.tmp")), &content)?;
        Ok(path)
    }
}

fn write_atomic(path: &Path, tmp: &Path, content: &str) -> Result<(), PostError> {
    let res = (|| -> io::Result<()> {
        let mut f = fs::File::create(tmp)?;
        f.write_all(content.as_bytes())?;
        f.sync_all()?;
        fs::rename(tmp, path)
    })();
    if let Err(e) = res {
        let _ = fs::remove_file(tmp);
        return Err(PostError::io(path, e));
    }
    Ok(())
}

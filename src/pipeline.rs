//! # Orchestrator
//! One linear pass: FETCH → GENERATE → WRITE → LEDGER APPEND.
//!
//! Every soft failure ends the run without touching the ledger. Only ledger I/O
//! errors escape as `Err`; they are fatal for the process.

use std::fmt;
use std::path::PathBuf;

use anyhow::Result;
use chrono::NaiveDate;
use metrics::counter;
use rand::Rng;
use tracing::{info, warn};

use crate::config::AgentConfig;
use crate::ingest::types::{FeedFetcher, FetchOutcome, NoCandidate};
use crate::ingest::{find_candidate, source_order};
use crate::insight::ai_adapter::{Generation, GenerationFailure, Provider};
use crate::insight::generate_insight;
use crate::ledger::Ledger;
use crate::publish::PostWriter;

/// Where a run stopped.
#[derive(Debug)]
pub enum RunOutcome {
    NoCandidate(NoCandidate),
    GenerationFailed { id: String, reason: GenerationFailure },
    WriteFailed { id: String, reason: String },
    Published { id: String, path: PathBuf },
}

impl RunOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            RunOutcome::NoCandidate(_) => "no_candidate",
            RunOutcome::GenerationFailed { .. } => "generation_failed",
            RunOutcome::WriteFailed { .. } => "write_failed",
            RunOutcome::Published { .. } => "published",
        }
    }
}

impl fmt::Display for RunOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunOutcome::NoCandidate(r) => write!(f, "nothing to do: {r}"),
            RunOutcome::GenerationFailed { id, reason } => {
                write!(f, "generation failed for {id}: {reason}")
            }
            RunOutcome::WriteFailed { id, reason } => {
                write!(f, "post for {id} not saved: {reason}")
            }
            RunOutcome::Published { id, path } => write!(f, "published {id} to {}", path.display()),
        }
    }
}

/// Collaborators for one run. Borrowed so tests can inspect them afterwards.
pub struct Pipeline<'a> {
    pub cfg: &'a AgentConfig,
    pub fetcher: &'a dyn FeedFetcher,
    pub provider: &'a dyn Provider,
}

impl<'a> Pipeline<'a> {
    pub fn new(
        cfg: &'a AgentConfig,
        fetcher: &'a dyn FeedFetcher,
        provider: &'a dyn Provider,
    ) -> Self {
        Self {
            cfg,
            fetcher,
            provider,
        }
    }

    /// Run the pipeline once. `today` dates the post file.
    pub async fn run_once<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
        today: NaiveDate,
    ) -> Result<RunOutcome> {
        let outcome = self.run_inner(rng, today).await?;
        counter!("agent_runs_total", "outcome" => outcome.label()).increment(1);
        Ok(outcome)
    }

    async fn run_inner<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
        today: NaiveDate,
    ) -> Result<RunOutcome> {
        let mut ledger = Ledger::load(&self.cfg.ledger_path)?;
        info!(ledger = %ledger.path().display(), seen = ledger.len(), "ledger loaded");

        // FETCH
        let order = source_order(&self.cfg.feeds, self.cfg.selection, rng);
        let candidate = match find_candidate(&order, self.fetcher, &ledger).await {
            FetchOutcome::Candidate(c) => c,
            FetchOutcome::NoCandidate(reason) => {
                info!(%reason, "no new entry to process, ending run");
                return Ok(RunOutcome::NoCandidate(reason));
            }
        };

        // GENERATE
        info!(provider = self.provider.name(), id = %candidate.id, "generating insight");
        let generated =
            generate_insight(self.provider, &candidate.title, &candidate.summary).await;
        let text = match generated {
            Generation::Success(text) => text,
            Generation::Failure(reason) => {
                warn!(%reason, id = %candidate.id, "insight generation failed");
                return Ok(RunOutcome::GenerationFailed {
                    id: candidate.id,
                    reason,
                });
            }
        };

        // WRITE
        let writer = PostWriter::new(&self.cfg.posts_dir, &self.cfg.layout);
        let path = match writer.write(&text, today) {
            Ok(p) => p,
            Err(e) => {
                warn!(error = %e, id = %candidate.id, "post not saved; ledger left untouched");
                return Ok(RunOutcome::WriteFailed {
                    id: candidate.id,
                    reason: e.to_string(),
                });
            }
        };
        info!(path = %path.display(), "post saved");

        // LEDGER APPEND
        ledger.append(&candidate.id)?;
        info!(id = %candidate.id, "recorded in ledger");

        Ok(RunOutcome::Published {
            id: candidate.id,
            path,
        })
    }
}

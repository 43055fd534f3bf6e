// src/config/ai.rs
use std::env;
use std::fmt;

pub const ENV_API_KEY: &str = "GOOGLE_API_KEY";
pub const ENV_TEST_MODE: &str = "INSIGHT_TEST_MODE";

/// The single process-wide credential for the generation backend.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// Read `GOOGLE_API_KEY`. Blank values count as missing.
    pub fn from_env() -> anyhow::Result<Self> {
        let key = env::var(ENV_API_KEY)
            .map_err(|_| anyhow::anyhow!("Missing {ENV_API_KEY} env var"))?;
        let key = key.trim();
        if key.is_empty() {
            anyhow::bail!("{ENV_API_KEY} is set but empty");
        }
        Ok(Self(key.to_string()))
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

// Never print the key itself; only its length for diagnostics.
impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Credential(len={})", self.0.len())
    }
}

/// `INSIGHT_TEST_MODE=mock` swaps the Gemini provider for a canned one.
pub fn mock_mode_enabled() -> bool {
    env::var(ENV_TEST_MODE)
        .map(|v| v.eq_ignore_ascii_case("mock"))
        .unwrap_or(false)
}

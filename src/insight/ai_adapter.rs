//! AI adapter: generation backend abstraction + the Gemini REST provider.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::config::ai::mock_mode_enabled;
use crate::config::{AgentConfig, Credential};

// ------------------------------------------------------------
// Public surface
// ------------------------------------------------------------

/// Outcome of one generation call. Failures keep their reason for logs/tests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Generation {
    Success(String),
    Failure(GenerationFailure),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GenerationFailure {
    #[error("request failed: {0}")]
    Transport(String),
    #[error("backend returned HTTP {status}: {message}")]
    Status { status: u16, message: String },
    #[error("could not decode backend response: {0}")]
    Decode(String),
    #[error("backend returned no candidates ({0})")]
    Blocked(String),
    #[error("backend returned empty text")]
    Empty,
}

/// A text-completion backend: one prompt in, one text out. No streaming, no state.
pub trait Provider: Send + Sync {
    fn generate<'a>(&'a self, prompt: &'a str)
        -> Pin<Box<dyn Future<Output = Generation> + Send + 'a>>;
    fn name(&self) -> &'static str;
}

pub type DynProvider = Arc<dyn Provider>;

/// Factory used by `main`.
///
/// * If `INSIGHT_TEST_MODE=mock`, returns a canned provider.
/// * Else builds the Gemini provider from config + credential.
pub fn build_provider(cfg: &AgentConfig, credential: Credential) -> anyhow::Result<DynProvider> {
    if mock_mode_enabled() {
        tracing::warn!("INSIGHT_TEST_MODE=mock: using canned generation output");
        return Ok(Arc::new(MockProvider::new(
            "**Test Your Checkout Today**\n\nWalk through your own checkout on mobile. Fix the first thing that slows you down.",
        )));
    }
    Ok(Arc::new(GeminiProvider::new(cfg, credential)?))
}

// ------------------------------------------------------------
// Gemini
// ------------------------------------------------------------

/// Google Gemini `generateContent` over REST. Key goes in `x-goog-api-key`.
pub struct GeminiProvider {
    http: reqwest::Client,
    credential: Credential,
    endpoint: String,
}

impl GeminiProvider {
    pub fn new(cfg: &AgentConfig, credential: Credential) -> anyhow::Result<Self> {
        let mut builder = reqwest::Client::builder().user_agent(concat!(
            env!("CARGO_PKG_NAME"),
            "/",
            env!("CARGO_PKG_VERSION")
        ));
        if let Some(t) = cfg.http_timeout() {
            builder = builder.timeout(t);
        }
        let http = builder.build()?;
        let model = cfg.model.trim_start_matches("models/");
        let endpoint = format!("{}/models/{}:generateContent", cfg.api_base, model);
        Ok(Self {
            http,
            credential,
            endpoint,
        })
    }
}

#[derive(Serialize)]
struct Part<'a> {
    text: &'a str,
}
#[derive(Serialize)]
struct Content<'a> {
    parts: Vec<Part<'a>>,
}
#[derive(Serialize)]
struct Req<'a> {
    contents: Vec<Content<'a>>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Resp {
    #[serde(default)]
    candidates: Vec<RespCandidate>,
    prompt_feedback: Option<PromptFeedback>,
}
#[derive(Deserialize)]
struct RespCandidate {
    content: Option<RespContent>,
}
#[derive(Deserialize)]
struct RespContent {
    #[serde(default)]
    parts: Vec<RespPart>,
}
#[derive(Deserialize)]
struct RespPart {
    text: Option<String>,
}
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}
#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}
#[derive(Deserialize)]
struct ErrorBody {
    message: String,
}

/// Text of the first candidate, parts joined. Pure so it can be tested without HTTP.
pub(crate) fn extract_text(body: &str) -> Generation {
    let resp: Resp = match serde_json::from_str(body) {
        Ok(r) => r,
        Err(e) => return Generation::Failure(GenerationFailure::Decode(e.to_string())),
    };
    let Some(first) = resp.candidates.first() else {
        let reason = resp
            .prompt_feedback
            .and_then(|f| f.block_reason)
            .unwrap_or_else(|| "no reason given".to_string());
        return Generation::Failure(GenerationFailure::Blocked(reason));
    };
    let text: String = first
        .content
        .as_ref()
        .map(|c| c.parts.iter().filter_map(|p| p.text.as_deref()).collect())
        .unwrap_or_default();
    let text = text.trim();
    if text.is_empty() {
        Generation::Failure(GenerationFailure::Empty)
    } else {
        Generation::Success(text.to_string())
    }
}

impl Provider for GeminiProvider {
    fn generate<'a>(
        &'a self,
        prompt: &'a str,
    ) -> Pin<Box<dyn Future<Output = Generation> + Send + 'a>> {
        Box::pin(async move {
            let req = Req {
                contents: vec![Content {
                    parts: vec![Part { text: prompt }],
                }],
            };

            let resp = match self
                .http
                .post(&self.endpoint)
                .header("x-goog-api-key", self.credential.expose())
                .json(&req)
                .send()
                .await
            {
                Ok(r) => r,
                Err(e) => return Generation::Failure(GenerationFailure::Transport(e.to_string())),
            };

            let status = resp.status();
            let body = match resp.text().await {
                Ok(b) => b,
                Err(e) => return Generation::Failure(GenerationFailure::Transport(e.to_string())),
            };

            if !status.is_success() {
                let message = serde_json::from_str::<ErrorEnvelope>(&body)
                    .map(|e| e.error.message)
                    .unwrap_or_else(|_| body.chars().take(200).collect());
                return Generation::Failure(GenerationFailure::Status {
                    status: status.as_u16(),
                    message,
                });
            }
            extract_text(&body)
        })
    }
    fn name(&self) -> &'static str {
        "gemini"
    }
}

// ------------------------------------------------------------
// Canned providers
// ------------------------------------------------------------

/// Returns the same text for every prompt; keeps the prompts it saw.
pub struct MockProvider {
    pub fixed: String,
    pub prompts: std::sync::Mutex<Vec<String>>,
}

impl MockProvider {
    pub fn new(fixed: impl Into<String>) -> Self {
        Self {
            fixed: fixed.into(),
            prompts: std::sync::Mutex::new(Vec::new()),
        }
    }
}

impl Provider for MockProvider {
    fn generate<'a>(
        &'a self,
        prompt: &'a str,
    ) -> Pin<Box<dyn Future<Output = Generation> + Send + 'a>> {
        if let Ok(mut seen) = self.prompts.lock() {
            seen.push(prompt.to_string());
        }
        let out = self.fixed.clone();
        Box::pin(async move { Generation::Success(out) })
    }
    fn name(&self) -> &'static str {
        "mock"
    }
}

/// Always fails with the given reason.
pub struct FailingProvider(pub GenerationFailure);

impl Provider for FailingProvider {
    fn generate<'a>(
        &'a self,
        _prompt: &'a str,
    ) -> Pin<Box<dyn Future<Output = Generation> + Send + 'a>> {
        let out = Generation::Failure(self.0.clone());
        Box::pin(async move { out })
    }
    fn name(&self) -> &'static str {
        "failing"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn joins_parts_of_first_candidate() {
        let body = r#"{"candidates":[{"content":{"role":"model","parts":[{"text":"**Title**\n\n"},{"text":"Body. "}]},"finishReason":"STOP"}]}"#;
        assert_eq!(
            extract_text(body),
            Generation::Success("**Title**\n\nBody.".to_string())
        );
    }

    #[test]
    fn blocked_prompt_reports_reason() {
        let body = r#"{"promptFeedback":{"blockReason":"SAFETY"}}"#;
        assert_eq!(
            extract_text(body),
            Generation::Failure(GenerationFailure::Blocked("SAFETY".into()))
        );
    }

    #[test]
    fn whitespace_only_text_is_empty_failure() {
        let body = r#"{"candidates":[{"content":{"parts":[{"text":"  \n "}]}}]}"#;
        assert_eq!(extract_text(body), Generation::Failure(GenerationFailure::Empty));
        assert!(matches!(
            extract_text("<html>"),
            Generation::Failure(GenerationFailure::Decode(_))
        ));
    }

    #[test]
    fn endpoint_strips_models_prefix() {
        let cfg = AgentConfig {
            model: "models/gemini-2.5-flash".into(),
            ..AgentConfig::default()
        };
        let p = GeminiProvider::new(&cfg, Credential::new("k")).unwrap();
        assert_eq!(
            p.endpoint,
            "https://generativelanguage.googleapis.com/v1beta/models/gemini-2.5-flash:generateContent"
        );
    }
}

// src/insight/mod.rs
//! Turns a feed entry into a short actionable insight via the generation backend.

pub mod ai_adapter;

use ai_adapter::{Generation, GenerationFailure, Provider};

/// Fixed instruction template; title and summary are embedded verbatim.
pub fn build_prompt(title: &str, summary: &str) -> String {
    format!(
        r#"Goal: Act as an e-commerce specialist focused on Shopify and Shopee.
Your task is to read the source material and produce one "actionable insight"
for small business owners.

Output rules:
1. Write a short, magnetic title (max. 10 words).
2. Leave one blank line after the title.
3. Write an insight of 2 to 3 sentences (max. 50 words).
4. The language must be direct, clear and focused on action.

Source material:
- Title: "{title}"
- Summary: "{summary}"

Generated insight:"#
    )
}

/// One generation call. Backend trouble comes back as `Failure`, never as a panic or `Err`.
pub async fn generate_insight(provider: &dyn Provider, title: &str, summary: &str) -> Generation {
    let prompt = build_prompt(title, summary);
    tracing::debug!(
        provider = provider.name(),
        prompt_len = prompt.len(),
        "calling generation backend"
    );

    match provider.generate(&prompt).await {
        Generation::Success(text) => {
            let text = text.trim();
            if text.is_empty() {
                Generation::Failure(GenerationFailure::Empty)
            } else {
                Generation::Success(text.to_string())
            }
        }
        failure => failure,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ai_adapter::{FailingProvider, MockProvider};

    #[test]
    fn prompt_embeds_inputs_verbatim() {
        let p = build_prompt("Shopify raises fees", "");
        assert!(p.contains(r#"- Title: "Shopify raises fees""#));
        assert!(p.contains(r#"- Summary: """#));
        assert!(p.contains("max. 10 words"));
        assert!(p.contains("max. 50 words"));
    }

    #[tokio::test]
    async fn success_is_trimmed_and_prompt_reaches_provider() {
        let mock = MockProvider::new("  **T**\n\nBody.\n\n");
        let out = generate_insight(&mock, "Title X", "Sum Y").await;
        assert_eq!(out, Generation::Success("**T**\n\nBody.".into()));

        let prompts = mock.prompts.lock().unwrap();
        assert_eq!(prompts.len(), 1);
        assert!(prompts[0].contains("Title X") && prompts[0].contains("Sum Y"));
    }

    #[tokio::test]
    async fn failures_pass_through() {
        let p = FailingProvider(GenerationFailure::Transport("dns".into()));
        let out = generate_insight(&p, "t", "s").await;
        assert_eq!(out, Generation::Failure(GenerationFailure::Transport("dns".into())));

        let blank = MockProvider::new("   ");
        assert_eq!(
            generate_insight(&blank, "t", "s").await,
            Generation::Failure(GenerationFailure::Empty)
        );
    }
}

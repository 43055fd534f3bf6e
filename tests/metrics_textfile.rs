// tests/metrics_textfile.rs
// Single test in this binary: it installs the global recorder.
use insight_agent::ai_adapter::MockProvider;
use insight_agent::config::{AgentConfig, FeedSource};
use insight_agent::ingest::providers::FixtureFetcher;
use insight_agent::metrics::Metrics;
use insight_agent::Pipeline;
use rand::rngs::StdRng;
use rand::SeedableRng;

#[tokio::test]
async fn run_outcome_and_feed_series_are_exported() {
    let metrics = Metrics::install().expect("recorder");

    let tmp = tempfile::tempdir().unwrap();
    let cfg = AgentConfig {
        feeds: vec![FeedSource::new("shopify", "https://r/atom")],
        ledger_path: tmp.path().join("seen.log"),
        posts_dir: tmp.path().join("_posts"),
        ..AgentConfig::default()
    };
    let fetcher =
        FixtureFetcher::new().with_doc("https://r/atom", include_str!("fixtures/shopify_atom.xml"));
    let provider = MockProvider::new("**Fix Cart Emails**\n\nSend the first one within an hour.");

    let day = chrono::NaiveDate::from_ymd_opt(2025, 9, 6).unwrap();
    let out = Pipeline::new(&cfg, &fetcher, &provider)
        .run_once(&mut StdRng::seed_from_u64(9), day)
        .await
        .unwrap();
    assert_eq!(out.label(), "published");

    let prom = tmp.path().join("metrics").join("agent.prom");
    metrics.write_textfile(&prom).unwrap();
    let text = std::fs::read_to_string(&prom).unwrap();

    assert!(text.contains(r#"agent_runs_total{outcome="published"} 1"#), "{text}");
    assert!(text.contains("feed_entries_total 3"), "{text}");
    assert!(text.contains("ledger_appends_total 1"), "{text}");
    assert!(text.contains("feed_parse_ms"), "{text}");
}

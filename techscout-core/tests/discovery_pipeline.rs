//! Integration tests for the discovery pipeline.
//!
//! These run the whole engine against MockLlmProvider and in-memory source
//! providers, so no network is touched.

use async_trait::async_trait;
use chrono::NaiveDate;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use techscout_core::adapter::{SourceAdapter, SourceProvider};
use techscout_core::brain::{Brain, MockLlmProvider};
use techscout_core::discovery::{DiscoveryEngine, DiscoveryPhase, DiscoverySession, ScoutingRequest};
use techscout_core::error::{LlmError, SourceError};
use techscout_core::evidence::EvidenceAggregator;
use techscout_core::persistence::{OutputDir, SCOUTING_RESULTS_FILE, SEARCH_QUERIES_FILE};
use techscout_core::records::{SearchRecord, SourceCategory, TimeWindow};
use techscout_core::retry::RetryPolicy;
use tempfile::TempDir;

/// Source provider returning canned records or a fixed failure.
struct StaticProvider {
    name: &'static str,
    category: SourceCategory,
    records: usize,
    fail: bool,
    calls: AtomicUsize,
}

impl StaticProvider {
    fn ok(name: &'static str, category: SourceCategory, records: usize) -> Arc<Self> {
        Arc::new(Self {
            name,
            category,
            records,
            fail: false,
            calls: AtomicUsize::new(0),
        })
    }

    fn down(name: &'static str, category: SourceCategory) -> Arc<Self> {
        Arc::new(Self {
            name,
            category,
            records: 0,
            fail: true,
            calls: AtomicUsize::new(0),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SourceProvider for StaticProvider {
    fn name(&self) -> &str {
        self.name
    }

    fn category(&self) -> SourceCategory {
        self.category
    }

    async fn search(
        &self,
        query: &str,
        _window: &TimeWindow,
        limit: usize,
    ) -> Result<Vec<SearchRecord>, SourceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(SourceError::Server {
                provider: self.name.to_string(),
                status: 503,
            });
        }
        Ok((0..self.records.min(limit))
            .map(|i| SearchRecord::new("", format!("{query} result {i}")))
            .collect())
    }
}

fn adapter(category: SourceCategory, providers: Vec<Arc<StaticProvider>>) -> SourceAdapter {
    providers
        .into_iter()
        .fold(SourceAdapter::new(category, RetryPolicy::immediate(2)), |a, p| {
            a.with_provider(p)
        })
}

fn healthy_aggregator() -> EvidenceAggregator {
    EvidenceAggregator::new(
        adapter(
            SourceCategory::Papers,
            vec![StaticProvider::ok("papers", SourceCategory::Papers, 2)],
        ),
        adapter(
            SourceCategory::Patents,
            vec![StaticProvider::ok("patents", SourceCategory::Patents, 1)],
        ),
        adapter(
            SourceCategory::News,
            vec![StaticProvider::ok("news", SourceCategory::News, 1)],
        ),
    )
    .with_request_delay(Duration::ZERO)
}

fn engine(mock: &Arc<MockLlmProvider>, aggregator: EvidenceAggregator) -> DiscoveryEngine {
    let brain = Brain::new(mock.clone()).with_retry(RetryPolicy::immediate(1));
    DiscoveryEngine::new(Arc::new(brain), aggregator)
}

fn request(num_reflections: u32) -> ScoutingRequest {
    let mut request = ScoutingRequest::new("CleanTech");
    request.focus_areas = vec!["Energy Storage".into()];
    request.search_queries = vec!["sodium ion battery".into()];
    request.num_reflections = num_reflections;
    request.reference_date = NaiveDate::from_ymd_opt(2025, 6, 1);
    request
}

const INITIAL: &str = r#"ANALYSIS:
Storage chemistry is moving fast.

TECHNOLOGIES JSON:
```json
[
  {"name": "sodium_ion", "title": "Sodium-Ion Batteries", "strategic_relevance": 8},
  {"name": "iron_air", "title": "Iron-Air Batteries", "strategic_relevance": 6}
]
```"#;

const TRENDS: &str = r#"INSIGHTS JSON:
```json
{"major_trends": [{"trend": "Post-lithium chemistry", "description": "Cheaper cells"}]}
```"#;

#[tokio::test]
async fn test_single_round_skips_refinement() {
    let mock = Arc::new(MockLlmProvider::with_responses([INITIAL, TRENDS]));
    let result = engine(&mock, healthy_aggregator())
        .run(&request(1))
        .await
        .unwrap();

    assert_eq!(mock.call_count(), 2);
    assert_eq!(result.technologies.len(), 2);
    assert_eq!(result.trend_insights.major_trends.len(), 1);
    assert_eq!(result.data_sources.papers_count, 2);
    assert_eq!(result.data_sources.patents_count, 1);
    assert_eq!(result.data_sources.news_count, 1);
    assert_eq!(result.raw_data.papers[0].source, "papers");
}

#[tokio::test]
async fn test_refinement_replaces_set_and_shares_history() {
    let refined = r#"TECHNOLOGIES JSON:
```json
[{"name": "sodium_ion", "title": "Sodium-Ion Batteries"}]
```"#;
    let mock = Arc::new(MockLlmProvider::with_responses([INITIAL, refined, refined, TRENDS]));
    let result = engine(&mock, healthy_aggregator())
        .run(&request(3))
        .await
        .unwrap();

    assert_eq!(mock.call_count(), 4);
    assert_eq!(result.technologies.len(), 1);

    let requests = mock.requests();
    // system + initial prompt
    assert_eq!(requests[0].messages.len(), 2);
    // system + initial exchange + round 2 prompt
    assert_eq!(requests[1].messages.len(), 4);
    assert!(requests[1].messages[3].content.starts_with("Round 2/3."));
    assert_eq!(requests[2].messages.len(), 6);
    // Trend analysis does not see the conversation.
    assert_eq!(requests[3].messages.len(), 2);
}

#[tokio::test]
async fn test_unparseable_refinement_keeps_previous_set() {
    let mock = Arc::new(MockLlmProvider::with_responses([
        INITIAL,
        "I would keep everything as it is.",
        TRENDS,
    ]));
    let result = engine(&mock, healthy_aggregator())
        .run(&request(2))
        .await
        .unwrap();
    let names: Vec<&str> = result.technologies.iter().map(|t| t.name.as_str()).collect();
    assert_eq!(names, vec!["sodium_ion", "iron_air"]);
}

#[tokio::test]
async fn test_completion_marker_stops_refinement() {
    let converged = r#"ANALYSIS:
Nothing left to change. ANALYSIS COMPLETE

TECHNOLOGIES JSON:
```json
[{"name": "sodium_ion", "title": "Sodium-Ion Batteries"}]
```"#;
    let mock = Arc::new(MockLlmProvider::with_responses([INITIAL, converged, TRENDS]));
    let mut session = DiscoverySession::new(5);
    let result = engine(&mock, healthy_aggregator())
        .run_session(&request(5), &mut session)
        .await
        .unwrap();

    assert_eq!(mock.call_count(), 3);
    assert_eq!(session.converged_at, Some(2));
    assert_eq!(session.phase, DiscoveryPhase::Done);
    assert_eq!(result.technologies.len(), 1);
}

#[tokio::test]
async fn test_all_sources_down_still_completes() {
    let aggregator = EvidenceAggregator::new(
        adapter(
            SourceCategory::Papers,
            vec![StaticProvider::down("papers", SourceCategory::Papers)],
        ),
        adapter(
            SourceCategory::Patents,
            vec![StaticProvider::down("patents", SourceCategory::Patents)],
        ),
        adapter(
            SourceCategory::News,
            vec![StaticProvider::down("news", SourceCategory::News)],
        ),
    )
    .with_request_delay(Duration::ZERO);

    let mock = Arc::new(MockLlmProvider::with_responses([INITIAL, TRENDS]));
    let result = engine(&mock, aggregator).run(&request(1)).await.unwrap();

    assert!(result.raw_data.is_empty());
    assert_eq!(result.data_sources.papers_count, 0);
    assert_eq!(result.technologies.len(), 2);
}

#[tokio::test]
async fn test_failing_primary_falls_back_once_per_query() {
    let primary = StaticProvider::down("primary", SourceCategory::Papers);
    let secondary = StaticProvider::ok("secondary", SourceCategory::Papers, 1);
    let aggregator = EvidenceAggregator::new(
        adapter(
            SourceCategory::Papers,
            vec![Arc::clone(&primary), Arc::clone(&secondary)],
        ),
        adapter(SourceCategory::Patents, Vec::new()),
        adapter(SourceCategory::News, Vec::new()),
    )
    .with_request_delay(Duration::ZERO);

    let mut req = request(1);
    req.search_queries = vec!["a".into(), "b".into(), "c".into()];
    let mock = Arc::new(MockLlmProvider::with_responses([INITIAL, TRENDS]));
    let result = engine(&mock, aggregator).run(&req).await.unwrap();

    assert_eq!(secondary.calls(), 3);
    // Two attempts per query on the primary.
    assert_eq!(primary.calls(), 6);
    assert_eq!(result.data_sources.papers_count, 3);
    assert!(result.raw_data.papers.iter().all(|r| r.source == "secondary"));
}

#[tokio::test]
async fn test_query_generation_falls_back_and_is_saved() {
    let dir = TempDir::new().unwrap();
    let mock = Arc::new(MockLlmProvider::with_responses([
        "Sorry, here are some ideas without JSON.",
        INITIAL,
        TRENDS,
    ]));
    let mut req = request(1);
    req.search_queries.clear();

    let result = engine(&mock, healthy_aggregator())
        .with_output_dir(OutputDir::new(dir.path()))
        .run(&req)
        .await
        .unwrap();

    assert_eq!(result.search_queries, vec!["CleanTech", "Energy Storage"]);
    let saved: Vec<String> = serde_json::from_str(
        &std::fs::read_to_string(dir.path().join(SEARCH_QUERIES_FILE)).unwrap(),
    )
    .unwrap();
    assert_eq!(saved, result.search_queries);
    assert!(dir.path().join(SCOUTING_RESULTS_FILE).exists());
}

#[tokio::test]
async fn test_skip_collection_returns_cached_result() {
    let dir = TempDir::new().unwrap();
    let first = Arc::new(MockLlmProvider::with_responses([INITIAL, TRENDS]));
    let original = engine(&first, healthy_aggregator())
        .with_output_dir(OutputDir::new(dir.path()))
        .run(&request(1))
        .await
        .unwrap();

    let second = Arc::new(MockLlmProvider::new());
    let mut req = request(1);
    req.skip_collection = true;
    let cached = engine(&second, healthy_aggregator())
        .with_output_dir(OutputDir::new(dir.path()))
        .run(&req)
        .await
        .unwrap();

    assert_eq!(second.call_count(), 0);
    assert_eq!(cached, original);
}

#[tokio::test]
async fn test_llm_failure_propagates_and_marks_session() {
    let mock = Arc::new(MockLlmProvider::new());
    mock.queue_error(LlmError::AuthFailed {
        provider: "mock".into(),
    });
    let mut session = DiscoverySession::new(2);
    let err = engine(&mock, healthy_aggregator())
        .run_session(&request(2), &mut session)
        .await
        .unwrap_err();

    assert!(matches!(err, LlmError::AuthFailed { .. }));
    assert_eq!(session.phase, DiscoveryPhase::Failed);
    assert!(session.error.is_some());
}

//! Sequential evidence collection across all source categories.

use std::time::Duration;
use tracing::info;

use crate::adapter::SourceAdapter;
use crate::records::{EvidenceBundle, SourceCategory, TimeWindow};

/// Per-category request limits for a single query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchLimits {
    pub papers: usize,
    pub patents: usize,
    pub news: usize,
}

impl SearchLimits {
    pub fn for_category(&self, category: SourceCategory) -> usize {
        match category {
            SourceCategory::Papers => self.papers,
            SourceCategory::Patents => self.patents,
            SourceCategory::News => self.news,
        }
    }
}

impl Default for SearchLimits {
    fn default() -> Self {
        Self {
            papers: 30,
            patents: 20,
            news: 20,
        }
    }
}

/// Runs every query through the papers, patents, and news adapters in turn.
///
/// Results are concatenated in query order with no deduplication. A pause of
/// `request_delay` follows every adapter call.
pub struct EvidenceAggregator {
    papers: SourceAdapter,
    patents: SourceAdapter,
    news: SourceAdapter,
    limits: SearchLimits,
    request_delay: Duration,
}

impl EvidenceAggregator {
    pub fn new(papers: SourceAdapter, patents: SourceAdapter, news: SourceAdapter) -> Self {
        Self {
            papers,
            patents,
            news,
            limits: SearchLimits::default(),
            request_delay: Duration::from_secs(1),
        }
    }

    pub fn with_limits(mut self, limits: SearchLimits) -> Self {
        self.limits = limits;
        self
    }

    pub fn with_request_delay(mut self, delay: Duration) -> Self {
        self.request_delay = delay;
        self
    }

    fn adapter(&self, category: SourceCategory) -> &SourceAdapter {
        match category {
            SourceCategory::Papers => &self.papers,
            SourceCategory::Patents => &self.patents,
            SourceCategory::News => &self.news,
        }
    }

    /// Collect evidence for every query. Never fails.
    pub async fn collect(&self, queries: &[String], window: &TimeWindow) -> EvidenceBundle {
        let mut bundle = EvidenceBundle::default();

        for (i, query) in queries.iter().enumerate() {
            info!(query = %query, index = i + 1, total = queries.len(), "Searching sources");
            for category in SourceCategory::ALL {
                let limit = self.limits.for_category(category);
                let records = self.adapter(category).search(query, window, limit).await;
                info!(query = %query, category = %category, count = records.len(), "Collected records");
                bundle.extend(category, records);
                if !self.request_delay.is_zero() {
                    tokio::time::sleep(self.request_delay).await;
                }
            }
        }

        let counts = bundle.counts();
        info!(
            papers = counts.papers_count,
            patents = counts.patents_count,
            news = counts.news_count,
            "Evidence collection complete"
        );
        bundle
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::SourceProvider;
    use crate::error::SourceError;
    use crate::records::SearchRecord;
    use crate::retry::RetryPolicy;
    use async_trait::async_trait;
    use chrono::NaiveDate;
    use std::sync::{Arc, Mutex};

    struct EchoProvider {
        category: SourceCategory,
        seen: Arc<Mutex<Vec<(SourceCategory, String, usize)>>>,
    }

    #[async_trait]
    impl SourceProvider for EchoProvider {
        fn name(&self) -> &str {
            "echo"
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
            self.seen
                .lock()
                .unwrap()
                .push((self.category, query.to_string(), limit));
            Ok(vec![SearchRecord::new("echo", format!("{}:{}", self.category, query))])
        }
    }

    fn adapter(
        category: SourceCategory,
        seen: &Arc<Mutex<Vec<(SourceCategory, String, usize)>>>,
    ) -> SourceAdapter {
        SourceAdapter::new(category, RetryPolicy::none()).with_provider(Arc::new(EchoProvider {
            category,
            seen: seen.clone(),
        }))
    }

    #[tokio::test]
    async fn test_collect_is_sequential_and_keeps_duplicates() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let aggregator = EvidenceAggregator::new(
            adapter(SourceCategory::Papers, &seen),
            adapter(SourceCategory::Patents, &seen),
            adapter(SourceCategory::News, &seen),
        )
        .with_request_delay(Duration::ZERO);

        let window = TimeWindow::ending_at(NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(), 3, 180);
        let queries = vec!["a".to_string(), "a".to_string()];
        let bundle = aggregator.collect(&queries, &window).await;

        assert_eq!(bundle.papers.len(), 2);
        assert_eq!(bundle.papers[0], bundle.papers[1]);
        assert_eq!(bundle.news[0].title, "news:a");

        let order: Vec<(SourceCategory, usize)> =
            seen.lock().unwrap().iter().map(|(c, _, l)| (*c, *l)).collect();
        assert_eq!(
            order,
            vec![
                (SourceCategory::Papers, 30),
                (SourceCategory::Patents, 20),
                (SourceCategory::News, 20),
                (SourceCategory::Papers, 30),
                (SourceCategory::Patents, 20),
                (SourceCategory::News, 20),
            ]
        );
    }

    #[tokio::test]
    async fn test_collect_with_no_queries_is_empty() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let aggregator = EvidenceAggregator::new(
            adapter(SourceCategory::Papers, &seen),
            adapter(SourceCategory::Patents, &seen),
            adapter(SourceCategory::News, &seen),
        );
        let window = TimeWindow::ending_at(NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(), 1, 30);
        assert!(aggregator.collect(&[], &window).await.is_empty());
    }
}

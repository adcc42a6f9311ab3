//! Source adapter contract and per-category fallback chains.
//!
//! A [`SourceProvider`] talks to one external API and may fail. A
//! [`SourceAdapter`] owns an ordered list of providers for one category and
//! never fails: it retries transient errors, falls through to the next
//! provider on error or empty results, and returns an empty list when the
//! whole chain comes up dry.

use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::error::SourceError;
use crate::records::{SearchRecord, SourceCategory, TimeWindow};
use crate::retry::RetryPolicy;

/// One external search provider.
#[async_trait]
pub trait SourceProvider: Send + Sync {
    /// Identifier stamped into `SearchRecord::source`.
    fn name(&self) -> &str;

    fn category(&self) -> SourceCategory;

    /// Providers that need credentials report `false` when none are set and
    /// are skipped without a request.
    fn is_configured(&self) -> bool {
        true
    }

    async fn search(
        &self,
        query: &str,
        window: &TimeWindow,
        limit: usize,
    ) -> Result<Vec<SearchRecord>, SourceError>;
}

/// Ordered fallback chain of providers for one category.
pub struct SourceAdapter {
    category: SourceCategory,
    providers: Vec<Arc<dyn SourceProvider>>,
    retry: RetryPolicy,
}

impl SourceAdapter {
    pub fn new(category: SourceCategory, retry: RetryPolicy) -> Self {
        Self {
            category,
            providers: Vec::new(),
            retry,
        }
    }

    /// Append a provider to the end of the chain.
    pub fn with_provider(mut self, provider: Arc<dyn SourceProvider>) -> Self {
        self.push(provider);
        self
    }

    pub fn push(&mut self, provider: Arc<dyn SourceProvider>) {
        if provider.category() != self.category {
            warn!(
                provider = provider.name(),
                expected = %self.category,
                actual = %provider.category(),
                "Adding provider to a chain of a different category"
            );
        }
        self.providers.push(provider);
    }

    pub fn category(&self) -> SourceCategory {
        self.category
    }

    pub fn provider_names(&self) -> Vec<&str> {
        self.providers.iter().map(|p| p.name()).collect()
    }

    /// Search the chain. Never fails; an exhausted chain yields an empty list.
    pub async fn search(&self, query: &str, window: &TimeWindow, limit: usize) -> Vec<SearchRecord> {
        for provider in &self.providers {
            if !provider.is_configured() {
                debug!(
                    provider = provider.name(),
                    category = %self.category,
                    "Skipping unconfigured provider"
                );
                continue;
            }

            let label = format!("{}.search", provider.name());
            let result = self
                .retry
                .run(&label, || provider.search(query, window, limit))
                .await;

            match result {
                Ok(records) if !records.is_empty() => {
                    info!(
                        provider = provider.name(),
                        category = %self.category,
                        query,
                        count = records.len(),
                        "Source search succeeded"
                    );
                    return stamp_source(records, provider.name());
                }
                Ok(_) => {
                    info!(
                        provider = provider.name(),
                        category = %self.category,
                        query,
                        "Provider returned no results, trying next"
                    );
                }
                Err(e) => {
                    warn!(
                        provider = provider.name(),
                        category = %self.category,
                        query,
                        error = %e,
                        "Provider failed, trying next"
                    );
                }
            }
        }

        warn!(
            category = %self.category,
            query,
            providers = self.providers.len(),
            "No provider returned results"
        );
        Vec::new()
    }
}

fn stamp_source(mut records: Vec<SearchRecord>, provider: &str) -> Vec<SearchRecord> {
    for record in &mut records {
        if record.source.is_empty() {
            record.source = provider.to_string();
        }
    }
    records
}

//! # TechScout Sources
//!
//! HTTP source providers for papers, patents, and news, and the factory that
//! arranges them into the per-category fallback chains used by the
//! evidence aggregator.
//!
//! | category | chain                                                     |
//! |----------|-----------------------------------------------------------|
//! | papers   | OpenAlex, OpenAlex per region, Semantic Scholar (key)     |
//! | patents  | SerpAPI Google Patents (key), USPTO PatentsView           |
//! | news     | Google News US, Google News per region, NewsAPI (key)     |

pub mod feed;
pub mod google_news;
pub mod http;
pub mod newsapi;
pub mod openalex;
pub mod patentsview;
pub mod semantic_scholar;
pub mod serpapi;

use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use techscout_core::adapter::SourceAdapter;
use techscout_core::config::SourcesConfig;
use techscout_core::error::SourceError;
use techscout_core::evidence::{EvidenceAggregator, SearchLimits};
use techscout_core::records::SourceCategory;
use techscout_core::retry::RetryPolicy;

pub use google_news::GoogleNewsProvider;
pub use newsapi::NewsApiProvider;
pub use openalex::OpenAlexProvider;
pub use patentsview::PatentsViewProvider;
pub use semantic_scholar::SemanticScholarProvider;
pub use serpapi::SerpApiPatentsProvider;

/// Configured region codes, upper-cased and deduplicated.
fn extra_regions(config: &SourcesConfig) -> Vec<String> {
    let mut regions: Vec<String> = Vec::new();
    for region in &config.regions {
        let code = region.trim().to_uppercase();
        if !code.is_empty() && !regions.contains(&code) {
            regions.push(code);
        }
    }
    regions
}

pub fn paper_adapter(
    client: &reqwest::Client,
    config: &SourcesConfig,
    retry: RetryPolicy,
) -> SourceAdapter {
    let email = config.openalex_email.clone();
    let mut adapter = SourceAdapter::new(SourceCategory::Papers, retry)
        .with_provider(Arc::new(OpenAlexProvider::new(client.clone(), email.clone())));
    for region in extra_regions(config) {
        adapter.push(Arc::new(OpenAlexProvider::for_region(
            client.clone(),
            email.clone(),
            &region,
        )));
    }
    adapter.with_provider(Arc::new(SemanticScholarProvider::new(
        client.clone(),
        config.semantic_scholar_key(),
    )))
}

pub fn patent_adapter(
    client: &reqwest::Client,
    config: &SourcesConfig,
    retry: RetryPolicy,
) -> SourceAdapter {
    SourceAdapter::new(SourceCategory::Patents, retry)
        .with_provider(Arc::new(SerpApiPatentsProvider::new(
            client.clone(),
            config.serpapi_key(),
        )))
        .with_provider(Arc::new(PatentsViewProvider::new(client.clone())))
}

pub fn news_adapter(
    client: &reqwest::Client,
    config: &SourcesConfig,
    retry: RetryPolicy,
) -> SourceAdapter {
    let mut adapter = SourceAdapter::new(SourceCategory::News, retry)
        .with_provider(Arc::new(GoogleNewsProvider::new(client.clone())));
    for region in extra_regions(config).into_iter().filter(|r| r != "US") {
        adapter.push(Arc::new(GoogleNewsProvider::for_region(client.clone(), &region)));
    }
    adapter.with_provider(Arc::new(NewsApiProvider::new(
        client.clone(),
        config.newsapi_key(),
    )))
}

/// Build the evidence aggregator described by `config`.
pub fn build_aggregator(config: &SourcesConfig) -> Result<EvidenceAggregator, SourceError> {
    let client = http::build_client(config.http_timeout_secs)?;
    let retry = RetryPolicy::from(&config.retry);

    let papers = paper_adapter(&client, config, retry.clone());
    let patents = patent_adapter(&client, config, retry.clone());
    let news = news_adapter(&client, config, retry);

    info!(
        papers = ?papers.provider_names(),
        patents = ?patents.provider_names(),
        news = ?news.provider_names(),
        "Source chains ready"
    );

    Ok(EvidenceAggregator::new(papers, patents, news)
        .with_limits(SearchLimits {
            papers: config.papers_limit,
            patents: config.patents_limit,
            news: config.news_limit,
        })
        .with_request_delay(Duration::from_millis(config.request_delay_ms)))
}

//! Semantic Scholar paper search. Used as the paper fallback when a key is set.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::http;
use techscout_core::adapter::SourceProvider;
use techscout_core::error::SourceError;
use techscout_core::records::{SearchRecord, SourceCategory, TimeWindow};

const SEMANTIC_SCHOLAR_API: &str = "https://api.semanticscholar.org/graph/v1/paper/search";
const SEMANTIC_SCHOLAR_FIELDS: &str =
    "title,abstract,authors,year,citationCount,venue,publicationDate,externalIds,url";
const MAX_LIMIT: usize = 100;

pub struct SemanticScholarProvider {
    client: reqwest::Client,
    api_key: Option<String>,
}

impl SemanticScholarProvider {
    pub fn new(client: reqwest::Client, api_key: Option<String>) -> Self {
        Self { client, api_key }
    }
}

#[async_trait]
impl SourceProvider for SemanticScholarProvider {
    fn name(&self) -> &str {
        "semantic_scholar"
    }

    fn category(&self) -> SourceCategory {
        SourceCategory::Papers
    }

    fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    async fn search(
        &self,
        query: &str,
        window: &TimeWindow,
        limit: usize,
    ) -> Result<Vec<SearchRecord>, SourceError> {
        let Some(key) = &self.api_key else {
            return Err(SourceError::NotConfigured {
                provider: self.name().to_string(),
            });
        };

        let params = [
            ("query", query.to_string()),
            ("year", format!("{}-{}", window.year_start, window.year_end)),
            ("limit", limit.clamp(1, MAX_LIMIT).to_string()),
            ("fields", SEMANTIC_SCHOLAR_FIELDS.to_string()),
        ];

        debug!(provider = self.name(), query, "Semantic Scholar request");
        let response = self
            .client
            .get(SEMANTIC_SCHOLAR_API)
            .header("x-api-key", key)
            .query(&params)
            .send()
            .await
            .map_err(|e| http::send_error(self.name(), e))?;
        let payload = http::read_json(self.name(), response).await?;
        parse_papers(self.name(), &payload)
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Paper {
    #[serde(default)]
    paper_id: Option<String>,
    #[serde(default)]
    title: Option<String>,
    #[serde(default, rename = "abstract")]
    abstract_text: Option<String>,
    #[serde(default)]
    authors: Option<Vec<Author>>,
    #[serde(default)]
    year: Option<i32>,
    #[serde(default)]
    publication_date: Option<String>,
    #[serde(default)]
    citation_count: Option<u64>,
    #[serde(default)]
    venue: Option<String>,
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    external_ids: Option<ExternalIds>,
}

#[derive(Deserialize)]
struct Author {
    #[serde(default)]
    name: Option<String>,
}

#[derive(Deserialize)]
struct ExternalIds {
    #[serde(default, rename = "DOI")]
    doi: Option<String>,
}

pub fn parse_papers(provider: &str, payload: &Value) -> Result<Vec<SearchRecord>, SourceError> {
    // An empty search has no "data" key at all.
    if payload.get("data").is_none() && payload.get("total").is_some() {
        return Ok(Vec::new());
    }
    let data = http::items(provider, payload, "data")?;

    Ok(data
        .iter()
        .filter_map(|entry| match serde_json::from_value::<Paper>(entry.clone()) {
            Ok(paper) => Some(paper),
            Err(e) => {
                debug!(provider, error = %e, "Skipping malformed Semantic Scholar paper");
                None
            }
        })
        .filter_map(|paper| {
            let title = paper.title.filter(|t| !t.trim().is_empty())?;
            Some(SearchRecord {
                title: title.trim().to_string(),
                abstract_text: paper.abstract_text.unwrap_or_default(),
                authors: paper
                    .authors
                    .unwrap_or_default()
                    .into_iter()
                    .filter_map(|a| a.name)
                    .collect(),
                date: paper
                    .publication_date
                    .or_else(|| paper.year.map(|y| y.to_string()))
                    .unwrap_or_default(),
                source: provider.to_string(),
                region: None,
                venue: paper.venue.unwrap_or_default(),
                url: paper.url.unwrap_or_default(),
                identifier: paper
                    .external_ids
                    .and_then(|ids| ids.doi)
                    .or(paper.paper_id)
                    .unwrap_or_default(),
                citations: paper.citation_count.unwrap_or(0),
            })
        })
        .collect())
}

//! Google Patents through SerpAPI. Primary patent source when a key is set.

use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

use crate::http;
use techscout_core::adapter::SourceProvider;
use techscout_core::error::SourceError;
use techscout_core::records::{SearchRecord, SourceCategory, TimeWindow};

const SERPAPI_URL: &str = "https://serpapi.com/search";

pub struct SerpApiPatentsProvider {
    client: reqwest::Client,
    api_key: Option<String>,
}

impl SerpApiPatentsProvider {
    pub fn new(client: reqwest::Client, api_key: Option<String>) -> Self {
        Self { client, api_key }
    }
}

#[async_trait]
impl SourceProvider for SerpApiPatentsProvider {
    fn name(&self) -> &str {
        "serpapi"
    }

    fn category(&self) -> SourceCategory {
        SourceCategory::Patents
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

        // Google Patents takes dates as YYYYMMDD.
        let after = format!("publication:{}", window.start_date().format("%Y%m%d"));
        let params = [
            ("engine", "google_patents".to_string()),
            ("q", query.to_string()),
            ("after", after),
            ("num", limit.clamp(10, 100).to_string()),
            ("api_key", key.clone()),
        ];

        debug!(provider = self.name(), query, "SerpAPI request");
        let response = self
            .client
            .get(SERPAPI_URL)
            .query(&params)
            .send()
            .await
            .map_err(|e| http::send_error(self.name(), e))?;
        let payload = http::read_json(self.name(), response).await?;
        let mut records = parse_patents(self.name(), &payload)?;
        records.truncate(limit);
        Ok(records)
    }
}

fn str_field(entry: &Value, key: &str) -> String {
    entry
        .get(key)
        .and_then(Value::as_str)
        .map(|s| s.trim().to_string())
        .unwrap_or_default()
}

pub fn parse_patents(provider: &str, payload: &Value) -> Result<Vec<SearchRecord>, SourceError> {
    if let Some(error) = payload.get("error").and_then(Value::as_str) {
        // SerpAPI reports "no results" as an error string.
        if error.contains("hasn't returned any results") {
            return Ok(Vec::new());
        }
        return Err(SourceError::Parse {
            provider: provider.to_string(),
            message: error.to_string(),
        });
    }
    let results = http::items(provider, payload, "organic_results")?;

    Ok(results
        .iter()
        .filter(|entry| entry.is_object())
        .filter_map(|entry| {
            let title = str_field(entry, "title");
            if title.is_empty() {
                return None;
            }
            let assignee = str_field(entry, "assignee");
            let authors = if assignee.is_empty() {
                str_field(entry, "inventor")
                    .split(", ")
                    .filter(|s| !s.is_empty())
                    .map(str::to_string)
                    .collect()
            } else {
                vec![assignee]
            };
            Some(SearchRecord {
                title,
                abstract_text: str_field(entry, "snippet"),
                authors,
                date: str_field(entry, "publication_date"),
                source: provider.to_string(),
                region: None,
                venue: String::new(),
                url: str_field(entry, "patent_link"),
                identifier: str_field(entry, "patent_id"),
                citations: 0,
            })
        })
        .collect())
}

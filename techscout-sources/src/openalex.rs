//! OpenAlex works search. Free and unauthenticated; the primary paper source.
//!
//! <https://docs.openalex.org/api-entities/works/search-works>

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::debug;

use crate::http;
use techscout_core::adapter::SourceProvider;
use techscout_core::error::SourceError;
use techscout_core::records::{SearchRecord, SourceCategory, TimeWindow, reconstruct_abstract};

const OPENALEX_API: &str = "https://api.openalex.org/works";
const MAX_PER_PAGE: usize = 200;

pub struct OpenAlexProvider {
    client: reqwest::Client,
    name: String,
    email: Option<String>,
    /// ISO country code restricting results to institutions in that country.
    region: Option<String>,
}

impl OpenAlexProvider {
    pub fn new(client: reqwest::Client, email: Option<String>) -> Self {
        Self {
            client,
            name: "openalex".to_string(),
            email,
            region: None,
        }
    }

    /// A provider limited to papers with an author affiliated in `country`.
    pub fn for_region(client: reqwest::Client, email: Option<String>, country: &str) -> Self {
        let country = country.trim().to_uppercase();
        Self {
            client,
            name: format!("openalex_{}", country.to_lowercase()),
            email,
            region: Some(country),
        }
    }

    pub fn filter(&self, window: &TimeWindow) -> String {
        let mut filter = format!("publication_year:{}-{}", window.year_start, window.year_end);
        if let Some(region) = &self.region {
            filter.push_str(&format!(
                ",authorships.institutions.country_code:{}",
                region
            ));
        }
        filter
    }
}

#[async_trait]
impl SourceProvider for OpenAlexProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn category(&self) -> SourceCategory {
        SourceCategory::Papers
    }

    async fn search(
        &self,
        query: &str,
        window: &TimeWindow,
        limit: usize,
    ) -> Result<Vec<SearchRecord>, SourceError> {
        let mut params: Vec<(&str, String)> = vec![
            ("search", query.to_string()),
            ("filter", self.filter(window)),
            ("per_page", limit.clamp(1, MAX_PER_PAGE).to_string()),
            ("sort", "cited_by_count:desc".to_string()),
        ];
        if let Some(email) = &self.email {
            params.push(("mailto", email.clone()));
        }

        debug!(provider = %self.name, query, "OpenAlex request");
        let response = self
            .client
            .get(OPENALEX_API)
            .query(&params)
            .send()
            .await
            .map_err(|e| http::send_error(&self.name, e))?;
        let payload = http::read_json(&self.name, response).await?;
        parse_works(&self.name, &payload, self.region.as_deref())
    }
}

#[derive(Deserialize)]
struct Work {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    doi: Option<String>,
    #[serde(default)]
    publication_year: Option<i32>,
    #[serde(default)]
    publication_date: Option<String>,
    #[serde(default)]
    cited_by_count: Option<u64>,
    #[serde(default)]
    abstract_inverted_index: Option<BTreeMap<String, Vec<usize>>>,
    #[serde(default)]
    primary_location: Option<Location>,
    #[serde(default)]
    authorships: Option<Vec<Option<Authorship>>>,
}

#[derive(Deserialize)]
struct Location {
    #[serde(default)]
    source: Option<Named>,
    #[serde(default)]
    landing_page_url: Option<String>,
}

#[derive(Deserialize)]
struct Authorship {
    #[serde(default)]
    author: Option<Named>,
}

#[derive(Deserialize)]
struct Named {
    #[serde(default)]
    display_name: Option<String>,
}

/// Convert an OpenAlex works payload. Entries that do not have the expected
/// shape, or have no title, are skipped one by one.
pub fn parse_works(
    provider: &str,
    payload: &Value,
    region: Option<&str>,
) -> Result<Vec<SearchRecord>, SourceError> {
    let results = http::items(provider, payload, "results")?;
    let mut records = Vec::with_capacity(results.len());

    for entry in results {
        let work: Work = match serde_json::from_value(entry.clone()) {
            Ok(work) => work,
            Err(e) => {
                debug!(provider, error = %e, "Skipping malformed OpenAlex work");
                continue;
            }
        };
        let Some(title) = work.title.filter(|t| !t.trim().is_empty()) else {
            debug!(provider, "Skipping OpenAlex work without a title");
            continue;
        };

        let authors = work
            .authorships
            .unwrap_or_default()
            .into_iter()
            .flatten()
            .filter_map(|a| a.author.and_then(|n| n.display_name))
            .filter(|name| !name.is_empty())
            .collect();
        let (venue, landing) = match work.primary_location {
            Some(loc) => (
                loc.source.and_then(|s| s.display_name).unwrap_or_default(),
                loc.landing_page_url,
            ),
            None => (String::new(), None),
        };
        let date = work
            .publication_date
            .or_else(|| work.publication_year.map(|y| y.to_string()))
            .unwrap_or_default();

        records.push(SearchRecord {
            title: title.trim().to_string(),
            abstract_text: work
                .abstract_inverted_index
                .as_ref()
                .map(reconstruct_abstract)
                .unwrap_or_default(),
            authors,
            date,
            source: provider.to_string(),
            region: region.map(str::to_string),
            venue,
            url: landing
                .or_else(|| work.doi.clone())
                .or(work.id.clone())
                .unwrap_or_default(),
            identifier: work.doi.or(work.id).unwrap_or_default(),
            citations: work.cited_by_count.unwrap_or(0),
        });
    }

    Ok(records)
}

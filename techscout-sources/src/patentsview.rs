//! USPTO PatentsView query API. Free fallback for patents.

use async_trait::async_trait;
use serde_json::{Value, json};
use tracing::debug;

use crate::http;
use techscout_core::adapter::SourceProvider;
use techscout_core::error::SourceError;
use techscout_core::records::{SearchRecord, SourceCategory, TimeWindow};

const PATENTSVIEW_API: &str = "https://api.patentsview.org/patents/query";
/// Longer queries match almost nothing with `_text_any`.
const QUERY_WORDS: usize = 6;
const ABSTRACT_CHARS: usize = 500;

pub struct PatentsViewProvider {
    client: reqwest::Client,
}

impl PatentsViewProvider {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

/// Request body for `query` over patents granted since `year_start`.
pub fn build_payload(query: &str, year_start: i32, limit: usize) -> Value {
    let clean_query = query
        .split_whitespace()
        .take(QUERY_WORDS)
        .collect::<Vec<_>>()
        .join(" ");
    json!({
        "q": {
            "_and": [
                {"_text_any": {"patent_abstract": clean_query}},
                {"_gte": {"patent_date": format!("{}-01-01", year_start)}}
            ]
        },
        "f": [
            "patent_number",
            "patent_title",
            "patent_abstract",
            "patent_date",
            "assignee_organization",
            "inventor_first_name",
            "inventor_last_name"
        ],
        "o": {"per_page": limit},
        "s": [{"patent_date": "desc"}]
    })
}

#[async_trait]
impl SourceProvider for PatentsViewProvider {
    fn name(&self) -> &str {
        "uspto_patentsview"
    }

    fn category(&self) -> SourceCategory {
        SourceCategory::Patents
    }

    async fn search(
        &self,
        query: &str,
        window: &TimeWindow,
        limit: usize,
    ) -> Result<Vec<SearchRecord>, SourceError> {
        let payload = build_payload(query, window.year_start, limit);
        debug!(provider = self.name(), query, "PatentsView request");
        let response = self
            .client
            .post(PATENTSVIEW_API)
            .json(&payload)
            .send()
            .await
            .map_err(|e| http::send_error(self.name(), e))?;
        let body = http::read_json(self.name(), response).await?;
        parse_patents(self.name(), &body)
    }
}

fn str_field<'a>(entry: &'a Value, key: &str) -> &'a str {
    entry.get(key).and_then(Value::as_str).unwrap_or("").trim()
}

pub fn parse_patents(provider: &str, payload: &Value) -> Result<Vec<SearchRecord>, SourceError> {
    let patents = http::items(provider, payload, "patents")?;

    Ok(patents
        .iter()
        .filter(|p| p.is_object())
        .filter_map(|patent| {
            let title = str_field(patent, "patent_title");
            if title.is_empty() {
                return None;
            }
            let assignees: Vec<String> = patent
                .get("assignees")
                .and_then(Value::as_array)
                .into_iter()
                .flatten()
                .map(|a| str_field(a, "assignee_organization"))
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect();
            let inventors: Vec<String> = patent
                .get("inventors")
                .and_then(Value::as_array)
                .into_iter()
                .flatten()
                .map(|i| {
                    format!(
                        "{} {}",
                        str_field(i, "inventor_first_name"),
                        str_field(i, "inventor_last_name")
                    )
                    .trim()
                    .to_string()
                })
                .filter(|s| !s.is_empty())
                .collect();
            let number = str_field(patent, "patent_number");

            Some(SearchRecord {
                title: title.to_string(),
                abstract_text: str_field(patent, "patent_abstract")
                    .chars()
                    .take(ABSTRACT_CHARS)
                    .collect(),
                authors: if assignees.is_empty() { inventors } else { assignees },
                date: str_field(patent, "patent_date").to_string(),
                source: provider.to_string(),
                region: Some("US".to_string()),
                venue: String::new(),
                url: if number.is_empty() {
                    String::new()
                } else {
                    format!("https://patents.google.com/patent/US{}", number)
                },
                identifier: number.to_string(),
                citations: 0,
            })
        })
        .collect())
}

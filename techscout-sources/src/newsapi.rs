//! NewsAPI `everything` search. News fallback when a key is set.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::http;
use techscout_core::adapter::SourceProvider;
use techscout_core::error::SourceError;
use techscout_core::records::{SearchRecord, SourceCategory, TimeWindow};

const NEWSAPI_URL: &str = "https://newsapi.org/v2/everything";
const MAX_PAGE_SIZE: usize = 100;

pub struct NewsApiProvider {
    client: reqwest::Client,
    api_key: Option<String>,
}

impl NewsApiProvider {
    pub fn new(client: reqwest::Client, api_key: Option<String>) -> Self {
        Self { client, api_key }
    }
}

#[async_trait]
impl SourceProvider for NewsApiProvider {
    fn name(&self) -> &str {
        "newsapi"
    }

    fn category(&self) -> SourceCategory {
        SourceCategory::News
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
            ("q", query.to_string()),
            ("from", window.news_start().format("%Y-%m-%d").to_string()),
            ("to", window.news_end().format("%Y-%m-%d").to_string()),
            ("sortBy", "relevancy".to_string()),
            ("pageSize", limit.clamp(1, MAX_PAGE_SIZE).to_string()),
        ];

        debug!(provider = self.name(), query, "NewsAPI request");
        let response = self
            .client
            .get(NEWSAPI_URL)
            .header("X-Api-Key", key)
            .query(&params)
            .send()
            .await
            .map_err(|e| http::send_error(self.name(), e))?;
        let payload = http::read_json(self.name(), response).await?;
        parse_articles(self.name(), &payload)
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Article {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    author: Option<String>,
    #[serde(default)]
    published_at: Option<String>,
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    source: Option<ArticleSource>,
}

#[derive(Deserialize)]
struct ArticleSource {
    #[serde(default)]
    name: Option<String>,
}

pub fn parse_articles(provider: &str, payload: &Value) -> Result<Vec<SearchRecord>, SourceError> {
    if payload.get("status").and_then(Value::as_str) == Some("error") {
        return Err(SourceError::Parse {
            provider: provider.to_string(),
            message: payload
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or("unknown error")
                .to_string(),
        });
    }
    let articles = http::items(provider, payload, "articles")?;

    Ok(articles
        .iter()
        .filter_map(|entry| serde_json::from_value::<Article>(entry.clone()).ok())
        .filter_map(|article| {
            let title = article.title.filter(|t| !t.trim().is_empty() && t != "[Removed]")?;
            let url = article.url.unwrap_or_default();
            Some(SearchRecord {
                title,
                abstract_text: article.description.unwrap_or_default(),
                authors: article.author.into_iter().filter(|a| !a.is_empty()).collect(),
                date: article.published_at.unwrap_or_default(),
                source: provider.to_string(),
                region: None,
                venue: article.source.and_then(|s| s.name).unwrap_or_default(),
                identifier: url.clone(),
                url,
                citations: 0,
            })
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_articles() {
        let payload = json!({
            "status": "ok",
            "articles": [
                {
                    "source": {"id": null, "name": "Wired"},
                    "author": null,
                    "title": "Batteries go solid",
                    "description": "A look at solid electrolytes.",
                    "url": "https://wired.example/solid",
                    "publishedAt": "2025-01-10T12:00:00Z"
                },
                {"title": "[Removed]", "source": {"name": "[Removed]"}}
            ]
        });
        let records = parse_articles("newsapi", &payload).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].venue, "Wired");
        assert!(records[0].authors.is_empty());
        assert_eq!(records[0].abstract_text, "A look at solid electrolytes.");
    }

    #[test]
    fn test_error_status() {
        let payload = json!({"status": "error", "code": "apiKeyInvalid", "message": "bad key"});
        assert!(matches!(
            parse_articles("newsapi", &payload),
            Err(SourceError::Parse { .. })
        ));
    }
}

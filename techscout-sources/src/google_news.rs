//! Google News RSS search. Free primary news source, optionally per region.

use async_trait::async_trait;
use tracing::debug;

use crate::feed;
use crate::http;
use techscout_core::adapter::SourceProvider;
use techscout_core::error::SourceError;
use techscout_core::records::{SearchRecord, SourceCategory, TimeWindow};

const GOOGLE_NEWS_RSS: &str = "https://news.google.com/rss/search";

/// Locale parameters for one Google News edition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewsEdition {
    pub country: String,
    pub language: String,
}

impl NewsEdition {
    pub fn us() -> Self {
        Self::for_country("US")
    }

    /// Edition for an ISO country code. Countries without a known language
    /// get the English edition.
    pub fn for_country(country: &str) -> Self {
        let country = country.trim().to_uppercase();
        let language = match country.as_str() {
            "JP" => "ja",
            "KR" => "ko",
            "CN" => "zh-Hans",
            "TW" => "zh-Hant",
            "DE" => "de",
            "FR" => "fr",
            "ES" => "es",
            "IT" => "it",
            "BR" => "pt-BR",
            _ => "en",
        };
        Self {
            country,
            language: language.to_string(),
        }
    }

    /// `hl`/`gl`/`ceid` query suffix.
    pub fn locale_params(&self) -> String {
        let hl = if self.language == "en" {
            format!("en-{}", self.country)
        } else {
            self.language.clone()
        };
        let ceid_lang = self.language.split('-').next().unwrap_or("en");
        format!(
            "hl={}&gl={}&ceid={}:{}",
            hl, self.country, self.country, ceid_lang
        )
    }
}

pub struct GoogleNewsProvider {
    client: reqwest::Client,
    name: String,
    edition: NewsEdition,
}

impl GoogleNewsProvider {
    pub fn new(client: reqwest::Client) -> Self {
        Self {
            client,
            name: "google_news".to_string(),
            edition: NewsEdition::us(),
        }
    }

    pub fn for_region(client: reqwest::Client, country: &str) -> Self {
        let edition = NewsEdition::for_country(country);
        Self {
            client,
            name: format!("google_news_{}", edition.country.to_lowercase()),
            edition,
        }
    }

    pub fn search_url(&self, query: &str, window: &TimeWindow) -> String {
        // Google News understands "when:Nd" inside the query.
        let scoped = format!("{} when:{}d", query, window.news_days_back.max(1));
        format!(
            "{}?q={}&{}",
            GOOGLE_NEWS_RSS,
            urlencoding::encode(&scoped),
            self.edition.locale_params()
        )
    }
}

#[async_trait]
impl SourceProvider for GoogleNewsProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn category(&self) -> SourceCategory {
        SourceCategory::News
    }

    async fn search(
        &self,
        query: &str,
        window: &TimeWindow,
        limit: usize,
    ) -> Result<Vec<SearchRecord>, SourceError> {
        let url = self.search_url(query, window);
        debug!(provider = %self.name, url = %url, "Google News request");
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| http::send_error(&self.name, e))?;
        let xml = http::read_text(&self.name, response).await?;
        Ok(parse_feed(&self.name, &xml, &self.edition.country, limit))
    }
}

/// Convert RSS `<item>`s into records. Items without a title are dropped.
pub fn parse_feed(provider: &str, xml: &str, country: &str, limit: usize) -> Vec<SearchRecord> {
    feed::extract_items(xml)
        .into_iter()
        .filter_map(|item| {
            let title = feed::extract_tag_text(item, "title").filter(|t| !t.is_empty())?;
            Some(SearchRecord {
                title,
                abstract_text: String::new(),
                authors: Vec::new(),
                date: feed::extract_tag_text(item, "pubDate").unwrap_or_default(),
                source: provider.to_string(),
                region: Some(country.to_string()),
                venue: feed::extract_tag_text(item, "source")
                    .unwrap_or_else(|| "Google News".to_string()),
                url: feed::extract_tag_text(item, "link").unwrap_or_default(),
                identifier: feed::extract_tag_text(item, "guid").unwrap_or_default(),
                citations: 0,
            })
        })
        .take(limit)
        .collect()
}

//! Normalized evidence records shared by every source provider.
//!
//! Whatever a provider returns (JSON REST payloads, RSS feeds, inverted-index
//! abstracts), it is flattened into [`SearchRecord`] so the aggregator can pool
//! records from different providers without interpreting them.

use chrono::{Datelike, Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::config::EvidenceCaps;

/// One paper, patent, or news item.
///
/// Every field is always serialized. Missing data is an empty string or list,
/// never an absent key.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchRecord {
    pub title: String,
    /// Abstract for papers and patents, snippet or description for news.
    #[serde(rename = "abstract")]
    pub abstract_text: String,
    /// Authors for papers and news, assignees for patents.
    pub authors: Vec<String>,
    /// Publication year or date as reported by the provider.
    pub date: String,
    /// Identifier of the provider that produced the record.
    pub source: String,
    pub region: Option<String>,
    /// Venue, journal, or news outlet.
    pub venue: String,
    pub url: String,
    /// DOI, patent number, or provider-specific id.
    pub identifier: String,
    pub citations: u64,
}

impl SearchRecord {
    pub fn new(source: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            title: title.into(),
            ..Default::default()
        }
    }
}

/// The three evidence categories, each served by its own fallback chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceCategory {
    Papers,
    Patents,
    News,
}

impl SourceCategory {
    pub const ALL: [SourceCategory; 3] = [
        SourceCategory::Papers,
        SourceCategory::Patents,
        SourceCategory::News,
    ];
}

impl std::fmt::Display for SourceCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SourceCategory::Papers => write!(f, "papers"),
            SourceCategory::Patents => write!(f, "patents"),
            SourceCategory::News => write!(f, "news"),
        }
    }
}

/// Time range applied to a search.
///
/// Papers and patents are filtered by publication year, news by a rolling
/// window of days ending at `reference`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    pub year_start: i32,
    pub year_end: i32,
    pub news_days_back: u32,
    pub reference: NaiveDate,
}

impl TimeWindow {
    pub fn ending_at(reference: NaiveDate, year_lookback: u32, news_days_back: u32) -> Self {
        Self {
            year_start: reference
                .year()
                .saturating_sub(i32::try_from(year_lookback).unwrap_or(i32::MAX))
                .max(NaiveDate::MIN.year()),
            year_end: reference.year(),
            news_days_back,
            reference,
        }
    }

    pub fn ending_today(year_lookback: u32, news_days_back: u32) -> Self {
        Self::ending_at(chrono::Local::now().date_naive(), year_lookback, news_days_back)
    }

    /// First day of `year_start`.
    pub fn start_date(&self) -> NaiveDate {
        NaiveDate::from_ymd_opt(self.year_start, 1, 1).unwrap_or(self.reference)
    }

    pub fn news_start(&self) -> NaiveDate {
        self.reference
            .checked_sub_signed(Duration::days(i64::from(self.news_days_back)))
            .unwrap_or(NaiveDate::MIN)
    }

    pub fn news_end(&self) -> NaiveDate {
        self.reference
    }
}

/// Record counts per category, serialized as `data_sources`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceCounts {
    pub papers_count: usize,
    pub patents_count: usize,
    pub news_count: usize,
}

/// Evidence collected over every query of one scouting run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EvidenceBundle {
    pub papers: Vec<SearchRecord>,
    pub patents: Vec<SearchRecord>,
    pub news: Vec<SearchRecord>,
}

impl EvidenceBundle {
    pub fn counts(&self) -> SourceCounts {
        SourceCounts {
            papers_count: self.papers.len(),
            patents_count: self.patents.len(),
            news_count: self.news.len(),
        }
    }

    pub fn category(&self, category: SourceCategory) -> &[SearchRecord] {
        match category {
            SourceCategory::Papers => &self.papers,
            SourceCategory::Patents => &self.patents,
            SourceCategory::News => &self.news,
        }
    }

    pub fn extend(&mut self, category: SourceCategory, records: Vec<SearchRecord>) {
        match category {
            SourceCategory::Papers => self.papers.extend(records),
            SourceCategory::Patents => self.patents.extend(records),
            SourceCategory::News => self.news.extend(records),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.papers.is_empty() && self.patents.is_empty() && self.news.is_empty()
    }

    /// Keep the first records of each category, preserving order.
    pub fn capped(&self, caps: &EvidenceCaps) -> EvidenceBundle {
        EvidenceBundle {
            papers: self.papers.iter().take(caps.papers).cloned().collect(),
            patents: self.patents.iter().take(caps.patents).cloned().collect(),
            news: self.news.iter().take(caps.news).cloned().collect(),
        }
    }
}

/// Rebuild an abstract stored as `word -> [positions]`.
///
/// All (position, word) pairs are sorted by position and joined with spaces.
pub fn reconstruct_abstract(index: &BTreeMap<String, Vec<usize>>) -> String {
    let mut positioned: Vec<(usize, &str)> = index
        .iter()
        .flat_map(|(word, positions)| positions.iter().map(move |&pos| (pos, word.as_str())))
        .collect();
    positioned.sort_by_key(|&(pos, _)| pos);
    positioned
        .into_iter()
        .map(|(_, word)| word)
        .collect::<Vec<_>>()
        .join(" ")
}

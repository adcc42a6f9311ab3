//! Forgiving `deserialize_with` helpers for LLM-produced JSON.
//!
//! Models return scores as `7`, `7.5`, `"7"` or `"7/10"`, lists as a single
//! string, and nulls anywhere. These helpers coerce what they can and fall
//! back to a default for the rest so one odd field never drops a record.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use std::collections::BTreeMap;

/// First decimal number appearing in `text`, e.g. `"3-5 years"` -> 3.0.
pub fn first_number(text: &str) -> Option<f64> {
    let start = text.find(|c: char| c.is_ascii_digit())?;
    let rest = &text[start..];
    let end = rest
        .find(|c: char| !(c.is_ascii_digit() || c == '.'))
        .unwrap_or(rest.len());
    rest[..end].trim_end_matches('.').parse().ok()
}

pub fn value_as_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => first_number(s),
        _ => None,
    }
}

fn clamp_score(raw: f64, min: f64, max: f64) -> f64 {
    raw.round().clamp(min, max)
}

/// Integer score on 1..=10. Unparseable values become 5.
pub fn score<'de, D>(deserializer: D) -> Result<u8, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(value_as_f64(&value)
        .map(|v| clamp_score(v, 1.0, 10.0) as u8)
        .unwrap_or(5))
}

/// Optional score on 1..=10. Unparseable values become `None`.
pub fn opt_score<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(value_as_f64(&value).map(|v| v.clamp(1.0, 10.0)))
}

/// Optional TRL on 1..=9.
pub fn opt_trl<'de, D>(deserializer: D) -> Result<Option<u8>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(value_as_f64(&value).map(|v| clamp_score(v, 1.0, 9.0) as u8))
}

/// Non-negative number. Unparseable values become 0.
pub fn number<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(value_as_f64(&value).map(|v| v.max(0.0)).unwrap_or(0.0))
}

/// A string, stringifying scalars and mapping null to empty.
pub fn string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(value_to_string(&value))
}

/// A list of strings. A lone string becomes a one-element list; objects are
/// rendered as JSON text.
pub fn string_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::Null => Vec::new(),
        Value::Array(items) => items
            .iter()
            .map(value_to_string)
            .filter(|s| !s.is_empty())
            .collect(),
        other => {
            let s = value_to_string(&other);
            if s.is_empty() { Vec::new() } else { vec![s] }
        }
    })
}

/// Optional free-form number, not clamped. Unparseable values become `None`.
pub fn opt_number<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(value_as_f64(&value))
}

/// Optional label. Anything but a non-empty string becomes `None`.
pub fn opt_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        _ => None,
    })
}

/// A JSON object. Null and non-objects become an empty map.
pub fn map<'de, D>(deserializer: D) -> Result<BTreeMap<String, Value>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::Object(entries) => entries.into_iter().collect(),
        _ => BTreeMap::new(),
    })
}

/// A list of records. Entries that do not deserialize are dropped one by
/// one; a non-list becomes empty.
pub fn list<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::Array(items) => items
            .into_iter()
            .filter_map(|item| serde_json::from_value(item).ok())
            .collect(),
        _ => Vec::new(),
    })
}

fn value_to_string(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.trim().to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Deserialize)]
    struct Sample {
        #[serde(default, deserialize_with = "score")]
        score: u8,
        #[serde(default, deserialize_with = "opt_score")]
        opt: Option<f64>,
        #[serde(default, deserialize_with = "string_list")]
        list: Vec<String>,
        #[serde(default, deserialize_with = "number")]
        years: f64,
    }

    fn sample(json: &str) -> Sample {
        serde_json::from_str(json).unwrap()
    }

    #[derive(Deserialize)]
    struct Labelled {
        #[serde(default, deserialize_with = "opt_string")]
        label: Option<String>,
        #[serde(default, deserialize_with = "map")]
        table: BTreeMap<String, Value>,
        #[serde(default, deserialize_with = "opt_number")]
        raw: Option<f64>,
        #[serde(default, deserialize_with = "list")]
        items: Vec<Item>,
    }

    #[derive(Deserialize)]
    struct Item {
        id: u32,
    }

    fn labelled(json: &str) -> Labelled {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_first_number() {
        assert_eq!(first_number("3-5 years"), Some(3.0));
        assert_eq!(first_number("about 2.5"), Some(2.5));
        assert_eq!(first_number("7/10"), Some(7.0));
        assert_eq!(first_number("soon"), None);
    }

    #[test]
    fn test_score_coercion() {
        assert_eq!(sample(r#"{"score": 7}"#).score, 7);
        assert_eq!(sample(r#"{"score": "8/10"}"#).score, 8);
        assert_eq!(sample(r#"{"score": 42}"#).score, 10);
        assert_eq!(sample(r#"{"score": 0}"#).score, 1);
        assert_eq!(sample(r#"{"score": "high"}"#).score, 5);
        assert_eq!(sample(r#"{"score": null}"#).score, 5);
    }

    #[test]
    fn test_opt_score_keeps_fraction() {
        assert_eq!(sample(r#"{"opt": 6.5}"#).opt, Some(6.5));
        assert_eq!(sample(r#"{"opt": "n/a"}"#).opt, None);
        assert_eq!(sample("{}").opt, None);
    }

    #[test]
    fn test_string_list_coercion() {
        assert_eq!(sample(r#"{"list": "single"}"#).list, vec!["single"]);
        assert_eq!(sample(r#"{"list": ["a", 2, null, ""]}"#).list, vec!["a", "2"]);
        assert!(sample(r#"{"list": null}"#).list.is_empty());
    }

    #[test]
    fn test_number_from_text() {
        assert_eq!(sample(r#"{"years": "3-5 years"}"#).years, 3.0);
        assert_eq!(sample(r#"{"years": -2}"#).years, 0.0);
    }

    #[test]
    fn test_opt_string_ignores_non_strings() {
        assert_eq!(labelled(r#"{"label": " partner "}"#).label.as_deref(), Some("partner"));
        assert_eq!(labelled(r#"{"label": ["growth", "early"]}"#).label, None);
        assert_eq!(labelled(r#"{"label": {"k": 1}}"#).label, None);
        assert_eq!(labelled(r#"{"label": ""}"#).label, None);
    }

    #[test]
    fn test_map_tolerates_null_and_lists() {
        assert!(labelled(r#"{"table": null}"#).table.is_empty());
        assert!(labelled(r#"{"table": ["Innovation"]}"#).table.is_empty());
        assert_eq!(labelled(r#"{"table": {"Growth": 8}}"#).table["Growth"], Value::from(8));
    }

    #[test]
    fn test_opt_number_is_unclamped() {
        assert_eq!(labelled(r#"{"raw": "85"}"#).raw, Some(85.0));
        assert_eq!(labelled(r#"{"raw": 92.5}"#).raw, Some(92.5));
        assert_eq!(labelled(r#"{"raw": "unknown"}"#).raw, None);
    }

    #[test]
    fn test_list_drops_bad_entries() {
        let ids: Vec<u32> = labelled(r#"{"items": [{"id": 1}, "junk", {"id": "x"}, {"id": 3}]}"#)
            .items
            .iter()
            .map(|i| i.id)
            .collect();
        assert_eq!(ids, vec![1, 3]);
        assert!(labelled(r#"{"items": {"id": 1}}"#).items.is_empty());
    }
}

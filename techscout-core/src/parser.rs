//! Extraction of JSON payloads from free-text LLM output.
//!
//! Responses interleave prose analysis with fenced code blocks. The payload
//! is the last fenced block (optionally tagged `json`) whose body parses as a
//! JSON object or array. Fences that appear inside JSON strings are handled
//! by trying successive closing fences until the body parses.

use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;

use crate::technology::Technology;

const FENCE: &str = "```";

/// Byte offsets of every triple-backtick fence in `text`.
fn fence_positions(text: &str) -> Vec<usize> {
    let mut positions = Vec::new();
    let mut from = 0;
    while let Some(idx) = text[from..].find(FENCE) {
        let pos = from + idx;
        positions.push(pos);
        from = pos + FENCE.len();
    }
    positions
}

/// Where the block body begins for a fence at `fence`: past an info string
/// such as `json` when the rest of the line is a bare tag.
fn body_start(text: &str, fence: usize) -> usize {
    let after = fence + FENCE.len();
    let rest = &text[after..];
    let line_end = rest.find('\n').unwrap_or(rest.len());
    let tag = rest[..line_end].trim();
    if tag
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        after + line_end
    } else {
        after
    }
}

fn parse_container(body: &str) -> Option<Value> {
    let body = body.trim();
    if !(body.starts_with('{') || body.starts_with('[')) {
        return None;
    }
    match serde_json::from_str::<Value>(body) {
        Ok(v @ (Value::Object(_) | Value::Array(_))) => Some(v),
        _ => None,
    }
}

/// Return the last fenced JSON object or array in `text`, or `None`.
pub fn extract_json_block(text: &str) -> Option<Value> {
    let fences = fence_positions(text);
    for (i, &open) in fences.iter().enumerate().rev() {
        let start = body_start(text, open);
        for &close in fences[i + 1..].iter().filter(|&&c| c >= start) {
            if let Some(value) = parse_container(&text[start..close]) {
                return Some(value);
            }
        }
    }
    debug!(len = text.len(), "No fenced JSON block found in response");
    None
}

/// Extract the last fenced block and deserialize it into `T`.
pub fn parse_as<T: DeserializeOwned>(text: &str) -> Option<T> {
    let value = extract_json_block(text)?;
    match serde_json::from_value(value) {
        Ok(parsed) => Some(parsed),
        Err(e) => {
            debug!(error = %e, "Fenced JSON did not match the expected shape");
            None
        }
    }
}

/// Extract a technology list.
///
/// Accepts a bare array, an object wrapping the array under `technologies`,
/// or a single technology object. Malformed entries are dropped one by one.
pub fn parse_technologies(text: &str) -> Option<Vec<Technology>> {
    let items = match extract_json_block(text)? {
        Value::Array(items) => items,
        Value::Object(mut map) => match map.remove("technologies") {
            Some(Value::Array(items)) => items,
            Some(_) => return None,
            None => vec![Value::Object(map)],
        },
        _ => return None,
    };
    let total = items.len();
    let technologies: Vec<Technology> = items.iter().filter_map(Technology::from_value).collect();
    if technologies.len() < total {
        debug!(
            dropped = total - technologies.len(),
            kept = technologies.len(),
            "Dropped malformed technology entries"
        );
    }
    Some(technologies)
}

/// Extract a list of search queries from `["q1", ...]` or `{"queries": [...]}`.
pub fn parse_queries(text: &str) -> Option<Vec<String>> {
    let items = match extract_json_block(text)? {
        Value::Array(items) => items,
        Value::Object(mut map) => match map.remove("queries") {
            Some(Value::Array(items)) => items,
            _ => return None,
        },
        _ => return None,
    };
    let queries: Vec<String> = items
        .iter()
        .filter_map(|v| match v {
            Value::String(s) => Some(s.trim().to_string()),
            Value::Object(obj) => obj
                .get("query")
                .and_then(Value::as_str)
                .map(|s| s.trim().to_string()),
            _ => None,
        })
        .filter(|s| !s.is_empty())
        .collect();
    if queries.is_empty() { None } else { Some(queries) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_single_json_block() {
        let text = "ANALYSIS:\nLots of prose.\n\nTECHNOLOGIES JSON:\n```json\n[{\"name\": \"a\"}]\n```\n";
        assert_eq!(extract_json_block(text), Some(json!([{"name": "a"}])));
    }

    #[test]
    fn test_untagged_block() {
        let text = "Here you go:\n```\n{\"k\": 1}\n```";
        assert_eq!(extract_json_block(text), Some(json!({"k": 1})));
    }

    #[test]
    fn test_no_block_returns_none() {
        assert_eq!(extract_json_block("I could not find anything relevant."), None);
        assert_eq!(extract_json_block(""), None);
    }

    #[test]
    fn test_unfenced_json_is_ignored() {
        assert_eq!(extract_json_block("{\"k\": 1}"), None);
    }

    #[test]
    fn test_two_blocks_returns_last() {
        let text = "First draft:\n```json\n{\"v\": 1}\n```\nRevised:\n```json\n{\"v\": 2}\n```\nDone.";
        assert_eq!(extract_json_block(text), Some(json!({"v": 2})));
    }

    #[test]
    fn test_invalid_last_block_falls_back_to_earlier() {
        let text = "```json\n{\"v\": 1}\n```\nthen\n```json\n{\"v\": 2,,}\n```";
        assert_eq!(extract_json_block(text), Some(json!({"v": 1})));
    }

    #[test]
    fn test_trailing_code_block_of_other_language() {
        let text = "```json\n[1, 2]\n```\nExample usage:\n```python\nprint('hi')\n```\n";
        assert_eq!(extract_json_block(text), Some(json!([1, 2])));
    }

    #[test]
    fn test_backticks_inside_json_string() {
        let text = "```json\n{\"snippet\": \"use ```rust``` fences\", \"n\": 3}\n```\ntrailing words";
        assert_eq!(
            extract_json_block(text),
            Some(json!({"snippet": "use ```rust``` fences", "n": 3}))
        );
    }

    #[test]
    fn test_scalar_block_is_not_a_result() {
        assert_eq!(extract_json_block("```json\n42\n```"), None);
        assert_eq!(extract_json_block("```json\n\"text\"\n```"), None);
    }

    #[test]
    fn test_parse_technologies_shapes() {
        let bare = "```json\n[{\"name\": \"Edge AI\"}, 5, {\"title\": \"Neuromorphic Chips\"}]\n```";
        let techs = parse_technologies(bare).unwrap();
        let names: Vec<&str> = techs.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["edge_ai", "neuromorphic_chips"]);

        let wrapped = "```json\n{\"technologies\": [{\"name\": \"x\"}]}\n```";
        assert_eq!(parse_technologies(wrapped).unwrap().len(), 1);

        let single = "```json\n{\"name\": \"solo\", \"potential_impact\": 7}\n```";
        assert_eq!(parse_technologies(single).unwrap()[0].potential_impact, 7);

        assert!(parse_technologies("no json here").is_none());
    }

    #[test]
    fn test_parse_queries() {
        let text = "```json\n[\"solid state battery\", \"  \", \"sodium ion\"]\n```";
        assert_eq!(
            parse_queries(text),
            Some(vec!["solid state battery".to_string(), "sodium ion".to_string()])
        );
        let wrapped = "```json\n{\"queries\": [{\"query\": \"grid storage\"}]}\n```";
        assert_eq!(parse_queries(wrapped), Some(vec!["grid storage".to_string()]));
        assert_eq!(parse_queries("```json\n[]\n```"), None);
    }

    #[test]
    fn test_parse_as_typed() {
        #[derive(serde::Deserialize)]
        struct Score {
            value: u8,
        }
        let parsed: Score = parse_as("```json\n{\"value\": 9}\n```").unwrap();
        assert_eq!(parsed.value, 9);
        assert!(parse_as::<Score>("```json\n{\"other\": 1}\n```").is_none());
    }
}

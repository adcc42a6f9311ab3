//! Minimal RSS helpers.
//!
//! Feeds are scanned with plain string search rather than a full XML parser;
//! only `<item>` blocks and a handful of child tags are needed.

/// All `<item>...</item>` blocks, in document order.
pub fn extract_items(xml: &str) -> Vec<&str> {
    let mut items = Vec::new();
    let mut search_from = 0;

    while let Some(pos) = xml[search_from..].find("<item") {
        let start = search_from + pos;
        // Skip tags that merely start with "item", e.g. <itemref>.
        let after = xml[start + 5..].chars().next();
        if !matches!(after, Some('>') | Some(' ') | Some('\n') | Some('\t') | Some('\r')) {
            search_from = start + 5;
            continue;
        }
        let Some(end) = xml[start..].find("</item>") else {
            break;
        };
        let end = start + end + "</item>".len();
        items.push(&xml[start..end]);
        search_from = end;
    }

    items
}

/// Text content of the first `<tag>`, with CDATA unwrapped and entities decoded.
pub fn extract_tag_text(xml: &str, tag: &str) -> Option<String> {
    let open = format!("<{}", tag);
    let close = format!("</{}>", tag);

    let mut from = 0;
    let start_pos = loop {
        let pos = from + xml[from..].find(&open)?;
        let next = xml[pos + open.len()..].chars().next();
        if matches!(next, Some('>') | Some(' ') | Some('/')) {
            break pos;
        }
        from = pos + open.len();
    };
    let tag_end = xml[start_pos..].find('>')? + start_pos;
    if xml[..tag_end].ends_with('/') {
        return Some(String::new());
    }
    let content_start = tag_end + 1;
    let content_end = xml[content_start..].find(&close)? + content_start;

    let raw = xml[content_start..content_end].trim();
    let text = match raw
        .strip_prefix("<![CDATA[")
        .and_then(|s| s.strip_suffix("]]>"))
    {
        Some(inner) => inner.to_string(),
        None => decode_entities(raw),
    };
    Some(normalize_whitespace(&text))
}

/// Extract an attribute value from a tag string.
pub fn extract_attribute(tag: &str, attr: &str) -> Option<String> {
    let search = format!("{}=\"", attr);
    let start = tag.find(&search)? + search.len();
    let end = tag[start..].find('"')? + start;
    Some(decode_entities(&tag[start..end]))
}

pub fn decode_entities(s: &str) -> String {
    s.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}

pub fn normalize_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

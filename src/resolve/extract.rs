//! Image reference extraction from page markup.
//!
//! Looks in three places, first match wins:
//! - Open Graph (`og:image`, `og:image:url`, `og:image:secure_url`)
//! - Twitter Card (`twitter:image`, `twitter:image:src`, as `name` or `property`)
//! - JSON-LD `image` (string, `{url}`, `{contentUrl}`, arrays, nested `@graph`)

use regex::Regex;
use scraper::{Html, Selector};
use serde_json::Value;
use std::sync::LazyLock;

const META_SELECTOR_STR: &str = "meta[content]";
const JSON_LD_PATTERN: &str = concat!(
    r#"(?is)<script[^>]*type\s*=\s*["']\s*application/ld\+json\s*(?:;[^"']*)?["']"#,
    r#"[^>]*>(.*?)</script>"#
);

const OPEN_GRAPH_KEYS: &[&str] = &["og:image", "og:image:url", "og:image:secure_url"];
const TWITTER_KEYS: &[&str] = &["twitter:image", "twitter:image:src"];

static JSON_LD_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(JSON_LD_PATTERN).unwrap_or_else(|e| {
        panic!(
            "Failed to compile regex pattern '{}' in JSON_LD_RE: {}. This is a programming error.",
            JSON_LD_PATTERN, e
        )
    })
});

/// Image references found in `html`, highest priority first.
///
/// Values are returned as written in the page; relative references are not
/// resolved here.
pub(crate) fn image_candidates(html: &str) -> Vec<String> {
    let document = Html::parse_document(html);
    let meta = meta_tags(&document);

    let mut candidates = Vec::new();
    for keys in [OPEN_GRAPH_KEYS, TWITTER_KEYS] {
        for key in keys {
            candidates.extend(
                meta.iter()
                    .filter(|(name, _)| name == key)
                    .map(|(_, content)| content.clone()),
            );
        }
    }
    candidates.extend(json_ld_images(html));
    candidates
}

/// `(key, content)` for every meta tag, key taken from `property` or `name`
/// and lower-cased. Empty content is skipped.
fn meta_tags(document: &Html) -> Vec<(String, String)> {
    let mut tags = Vec::new();
    if let Ok(selector) = Selector::parse(META_SELECTOR_STR) {
        for element in document.select(&selector) {
            let el = element.value();
            let Some(content) = el.attr("content").map(str::trim) else {
                continue;
            };
            if content.is_empty() {
                continue;
            }
            for key in [el.attr("property"), el.attr("name")].into_iter().flatten() {
                tags.push((key.trim().to_ascii_lowercase(), content.to_string()));
            }
        }
    }
    tags
}

fn json_ld_images(html: &str) -> Vec<String> {
    let mut images = Vec::new();
    for cap in JSON_LD_RE.captures_iter(html) {
        let Some(json_content) = cap.get(1) else {
            continue;
        };
        match serde_json::from_str::<Value>(json_content.as_str().trim()) {
            Ok(value) => collect_json_ld_images(&value, &mut images),
            Err(e) => log::debug!("Skipping malformed JSON-LD block: {e}"),
        }
    }
    images
}

/// Walks documents, arrays of documents and `@graph` containers.
fn collect_json_ld_images(value: &Value, out: &mut Vec<String>) {
    match value {
        Value::Array(items) => {
            for item in items {
                collect_json_ld_images(item, out);
            }
        }
        Value::Object(obj) => {
            if let Some(image) = obj.get("image") {
                collect_image_value(image, out);
            }
            if let Some(graph) = obj.get("@graph") {
                collect_json_ld_images(graph, out);
            }
        }
        _ => {}
    }
}

/// Reads an `image` property: a URL string, an `ImageObject`, or a list of either.
fn collect_image_value(value: &Value, out: &mut Vec<String>) {
    match value {
        Value::String(url) if !url.trim().is_empty() => out.push(url.trim().to_string()),
        Value::Object(obj) => {
            if let Some(url) = ["url", "contentUrl"]
                .iter()
                .filter_map(|key| obj.get(*key).and_then(Value::as_str))
                .map(str::trim)
                .find(|url| !url.is_empty())
            {
                out.push(url.to_string());
            }
        }
        Value::Array(items) => {
            for item in items {
                collect_image_value(item, out);
            }
        }
        _ => {}
    }
}

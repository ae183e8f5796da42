/*!
 * Extraction of the two keyword variants from a model reply.
 *
 * Accepted shapes, tried in order on the whole reply, the body of a fenced
 * code block, and the outermost `{...}` / `[...]` span:
 * - a JSON object carrying one of the primary keys and one of the variant keys
 * - a JSON array of exactly two strings
 */

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};

use super::VariantPair;
use crate::errors::TranslationError;

/// Markdown code fence, with or without a language tag
static CODE_FENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)```[A-Za-z]*\s*(.*?)\s*```").unwrap());

/// Keys that may hold the primary translation
const PRIMARY_KEYS: &[&str] = &[
    "translated_keyword",
    "translated_variant_1",
    "translation_1",
    "variant_1",
];

/// Keys that may hold the alternative phrasing
const VARIANT_KEYS: &[&str] = &[
    "translated_variant",
    "translated_variant_2",
    "translated_variable_2",
    "translation_2",
    "variant_2",
];

/// Parse a raw model reply into a variant pair
pub fn parse_variants(raw: &str) -> Result<VariantPair, TranslationError> {
    let text = raw.trim();
    if text.is_empty() {
        return Err(TranslationError::MalformedResponse("empty response".to_string()));
    }

    candidates(text)
        .into_iter()
        .filter_map(|candidate| serde_json::from_str::<Value>(candidate).ok())
        .find_map(|value| pair_from_value(&value))
        .ok_or_else(|| TranslationError::MalformedResponse(preview(text)))
}

fn candidates(text: &str) -> Vec<&str> {
    let mut found = vec![text];

    if let Some(body) = CODE_FENCE.captures(text).and_then(|c| c.get(1)) {
        found.push(body.as_str());
    }
    if let (Some(start), Some(end)) = (text.find('{'), text.rfind('}')) {
        if start < end {
            found.push(&text[start..=end]);
        }
    }
    if let (Some(start), Some(end)) = (text.find('['), text.rfind(']')) {
        if start < end {
            found.push(&text[start..=end]);
        }
    }

    found
}

fn pair_from_value(value: &Value) -> Option<VariantPair> {
    match value {
        Value::Object(map) => {
            let first = lookup(map, PRIMARY_KEYS)?;
            let second = lookup(map, VARIANT_KEYS)?;
            VariantPair::new(clean(first), clean(second))
        }
        Value::Array(values) if values.len() == 2 => {
            let first = values[0].as_str()?;
            let second = values[1].as_str()?;
            VariantPair::new(clean(first), clean(second))
        }
        _ => None,
    }
}

fn lookup<'a>(map: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a str> {
    keys.iter().find_map(|key| map.get(*key).and_then(Value::as_str))
}

/// Trim whitespace and drop surrounding or stray double quotes
fn clean(text: &str) -> String {
    text.replace('"', "")
        .trim()
        .trim_matches(|c| c == '\'' || c == '`' || c == '“' || c == '”')
        .trim()
        .to_string()
}

fn preview(text: &str) -> String {
    let mut short: String = text.chars().take(80).collect();
    if short.len() < text.len() {
        short.push_str("...");
    }
    short
}

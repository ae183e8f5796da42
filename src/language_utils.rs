//! Language utilities for target language handling
//!
//! Jobs store the English name of their target language ("French"), which is
//! what the prompt needs. Callers may give an ISO 639-1 code, an ISO 639-2/T
//! or 639-2/B code, or the English name itself.

use anyhow::{anyhow, Result};
use isolang::Language;
use log::warn;

/// Map an ISO 639-2/B code to its ISO 639-2/T equivalent
fn part2b_to_part2t(code: &str) -> Option<&'static str> {
    let part2t = match code {
        "fre" => "fra",
        "ger" => "deu",
        "dut" => "nld",
        "gre" => "ell",
        "chi" => "zho",
        "cze" => "ces",
        "ice" => "isl",
        "alb" => "sqi",
        "arm" => "hye",
        "baq" => "eus",
        "bur" => "mya",
        "per" => "fas",
        "geo" => "kat",
        "may" => "msa",
        "mac" => "mkd",
        "rum" => "ron",
        "slo" => "slk",
        "wel" => "cym",
        _ => return None,
    };
    Some(part2t)
}

/// Look up a language by ISO 639-1 or ISO 639-2 code
pub fn language_from_code(code: &str) -> Option<Language> {
    let code = code.trim().to_lowercase();
    match code.len() {
        2 => Language::from_639_1(&code),
        3 => Language::from_639_3(part2b_to_part2t(&code).unwrap_or(&code)),
        _ => None,
    }
}

fn capitalize(name: &str) -> String {
    let lower = name.to_lowercase();
    let mut chars = lower.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Resolve a target language to the English name stored on a job
///
/// Codes must be valid ISO codes. Anything longer is treated as a name: known
/// English names are normalized ("french" -> "French"), unknown names such as
/// "Brazilian Portuguese" are kept verbatim since the model understands them.
pub fn resolve_language_name(input: &str) -> Result<String> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(anyhow!("Target language cannot be empty"));
    }

    if trimmed.len() <= 3 {
        return language_from_code(trimmed)
            .map(|lang| lang.to_name().to_string())
            .ok_or_else(|| anyhow!("Invalid language code: {}", trimmed));
    }

    if let Some(lang) = Language::from_name(trimmed).or_else(|| Language::from_name(&capitalize(trimmed))) {
        return Ok(lang.to_name().to_string());
    }

    warn!("Unrecognized language name '{}', using it as given", trimmed);
    Ok(trimmed.to_string())
}

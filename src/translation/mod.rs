/*!
 * Keyword translation capability.
 *
 * The worker only sees the `Translator` trait. This module provides:
 *
 * - `service`: `LlmTranslator`, a translator backed by one of the LLM providers
 * - `prompts`: the SEO keyword prompt template
 * - `parser`: extraction of the two variants from a model reply
 * - `retry`: per-item retry policy and the `ItemOutcome` it produces
 * - `pacing`: the shared inter-call delay
 */

use async_trait::async_trait;
use std::fmt;

use crate::database::models::ItemRecord;
use crate::errors::TranslationError;

// Re-export main types for easier usage
pub use self::pacing::Pacer;
pub use self::parser::parse_variants;
pub use self::prompts::{KeywordPrompt, PromptTemplate};
pub use self::retry::{translate_with_retry, ItemOutcome, RetryPolicy};
pub use self::service::LlmTranslator;

// Submodules
pub mod pacing;
pub mod parser;
pub mod prompts;
pub mod retry;
pub mod service;

/// One keyword to translate, with its optional category context
#[derive(Debug, Clone, PartialEq)]
pub struct TranslationRequest {
    /// Source keyword
    pub keyword: String,
    /// Optional category
    pub category: Option<String>,
    /// Optional subcategory
    pub subcategory: Option<String>,
    /// Optional product category
    pub product_category: Option<String>,
    /// English name of the target language
    pub target_language: String,
}

impl TranslationRequest {
    /// Create a request without category context
    pub fn new(keyword: impl Into<String>, target_language: impl Into<String>) -> Self {
        Self {
            keyword: keyword.into(),
            category: None,
            subcategory: None,
            product_category: None,
            target_language: target_language.into(),
        }
    }

    /// Build the request for a stored item
    pub fn from_item(item: &ItemRecord, target_language: &str) -> Self {
        Self {
            keyword: item.keyword.clone(),
            category: item.category.clone(),
            subcategory: item.subcategory.clone(),
            product_category: item.product_category.clone(),
            target_language: target_language.to_string(),
        }
    }
}

/// The two translated variants of a keyword
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariantPair {
    /// Primary translation
    pub first: String,
    /// Alternative phrasing
    pub second: String,
}

impl VariantPair {
    /// Create a pair; returns `None` if either variant is blank after trimming
    pub fn new(first: impl Into<String>, second: impl Into<String>) -> Option<Self> {
        let first = first.into().trim().to_string();
        let second = second.into().trim().to_string();
        if first.is_empty() || second.is_empty() {
            return None;
        }
        Some(Self { first, second })
    }

    /// The fallback pair: the source keyword twice
    pub fn fallback(keyword: &str) -> Self {
        Self {
            first: keyword.to_string(),
            second: keyword.to_string(),
        }
    }
}

impl fmt::Display for VariantPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} | {}", self.first, self.second)
    }
}

/// Anything that can turn a keyword into two translated variants
///
/// Implementations make a single attempt; retrying and pacing are the
/// caller's responsibility.
#[async_trait]
pub trait Translator: Send + Sync {
    /// Translate one keyword
    async fn translate(&self, request: &TranslationRequest) -> Result<VariantPair, TranslationError>;

    /// Short description for logs, e.g. `openai/gpt-4`
    fn describe(&self) -> String {
        "translator".to_string()
    }
}

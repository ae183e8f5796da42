/*!
 * Per-item retry policy.
 *
 * Every attempt waits on the shared `Pacer`, runs under the request timeout,
 * and a failed attempt is followed by `retry_delay`, or by `rate_limit_delay`
 * when the provider reported a rate limit. An item never fails: once attempts
 * are exhausted the outcome is a fallback to the source keyword.
 */

use log::{debug, warn};
use std::time::Duration;

use super::{Pacer, TranslationRequest, Translator, VariantPair};
use crate::errors::TranslationError;

/// Limits and delays for translating one item
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    /// Total number of calls per item, at least one
    pub max_attempts: u32,
    /// Wait after an ordinary failure
    pub retry_delay: Duration,
    /// Wait after a rate-limit failure
    pub rate_limit_delay: Duration,
    /// Upper bound on a single call
    pub request_timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            retry_delay: Duration::from_millis(1500),
            rate_limit_delay: Duration::from_secs(10),
            request_timeout: Duration::from_secs(60),
        }
    }
}

impl RetryPolicy {
    /// Delay before the next attempt after `error`
    pub fn delay_after(&self, error: &TranslationError) -> Duration {
        if error.is_rate_limited() {
            self.rate_limit_delay
        } else {
            self.retry_delay
        }
    }
}

/// Final result for one item
#[derive(Debug, Clone, PartialEq)]
pub enum ItemOutcome {
    /// The model produced two usable variants
    Translated(VariantPair),
    /// Every attempt failed; the keyword itself is stored instead
    Fallback {
        /// Last error, for logs
        reason: String,
    },
}

impl ItemOutcome {
    /// Whether this outcome is a fallback
    pub fn is_fallback(&self) -> bool {
        matches!(self, Self::Fallback { .. })
    }

    /// The pair to persist for an item with the given keyword
    pub fn into_variants(self, keyword: &str) -> VariantPair {
        match self {
            Self::Translated(pair) => pair,
            Self::Fallback { .. } => VariantPair::fallback(keyword),
        }
    }
}

/// Translate one keyword, retrying within the policy, never returning an error
pub async fn translate_with_retry(
    translator: &dyn Translator,
    request: &TranslationRequest,
    policy: &RetryPolicy,
    pacer: &Pacer,
) -> ItemOutcome {
    let max_attempts = policy.max_attempts.max(1);
    let mut last_error = String::new();

    for attempt in 1..=max_attempts {
        pacer.wait().await;

        let result = match tokio::time::timeout(policy.request_timeout, translator.translate(request)).await {
            Ok(result) => result,
            Err(_) => Err(TranslationError::Timeout(policy.request_timeout.as_secs())),
        };

        match result {
            Ok(pair) => {
                debug!("Translated '{}' on attempt {}: {}", request.keyword, attempt, pair);
                return ItemOutcome::Translated(pair);
            }
            Err(e) => {
                warn!(
                    "Attempt {}/{} for '{}' failed: {}",
                    attempt, max_attempts, request.keyword, e
                );
                last_error = e.to_string();

                if !e.is_retryable() {
                    break;
                }
                if attempt < max_attempts {
                    tokio::time::sleep(policy.delay_after(&e)).await;
                }
            }
        }
    }

    ItemOutcome::Fallback { reason: last_error }
}

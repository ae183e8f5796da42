/*!
 * Provider implementations for different language model services.
 *
 * This module contains client implementations for various LLM providers:
 * - OpenAI: chat completions API (also used for OpenAI-compatible servers)
 * - Anthropic: messages API
 * - Ollama: local chat API
 * - Mock: scripted responses for tests
 *
 * Clients perform a single HTTP attempt; retry and pacing policy belong to
 * the worker, which sees failures through `ProviderError`.
 */

use async_trait::async_trait;
use log::warn;
use std::fmt::Debug;

use crate::errors::ProviderError;

/// Common trait for all LLM providers
///
/// This trait defines the interface that all provider implementations must follow,
/// allowing them to be used interchangeably by the translator.
#[async_trait]
pub trait Provider: Send + Sync + Debug {
    /// The request type for this provider
    type Request: Send + Sync;

    /// The response type for this provider
    type Response: Send + Sync;

    /// Complete a request using this provider
    async fn complete(&self, request: Self::Request) -> Result<Self::Response, ProviderError>;

    /// Extract text from the provider response
    fn extract_text(response: &Self::Response) -> String;
}

/// Map a transport failure from reqwest onto the provider error taxonomy
pub(crate) fn transport_error(provider: &str, error: reqwest::Error) -> ProviderError {
    warn!("{} request failed: {}", provider, error);
    if error.is_timeout() || error.is_connect() {
        ProviderError::ConnectionError(format!("{}: {}", provider, error))
    } else {
        ProviderError::RequestFailed(format!("{}: {}", provider, error))
    }
}

/// Turn a non-success HTTP response into a provider error
pub(crate) async fn status_error(provider: &str, response: reqwest::Response) -> ProviderError {
    let status = response.status();
    let error_text = response
        .text()
        .await
        .unwrap_or_else(|_| "Failed to get error response text".to_string());
    warn!("{} API error ({}): {}", provider, status, error_text);
    ProviderError::from_status(status.as_u16(), error_text)
}

pub mod openai;
pub mod anthropic;
pub mod ollama;
pub mod mock;

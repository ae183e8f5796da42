/*!
 * LLM-backed translator.
 *
 * `LlmTranslator` renders the keyword prompt, sends it to the configured
 * provider in a single call and parses the reply into a `VariantPair`.
 */

use anyhow::Result;
use async_trait::async_trait;
use log::debug;

use super::parser::parse_variants;
use super::prompts::{KeywordPrompt, PromptTemplate};
use super::{TranslationRequest, Translator, VariantPair};
use crate::app_config::{TranslationConfig, TranslationProvider};
use crate::errors::TranslationError;
use crate::providers::anthropic::{Anthropic, AnthropicRequest};
use crate::providers::mock::{MockProvider, MockRequest};
use crate::providers::ollama::{ChatMessage, ChatRequest, Ollama};
use crate::providers::openai::{OpenAI, OpenAIRequest};
use crate::providers::Provider;

/// Enough room for two short phrases wrapped in JSON
const MAX_RESPONSE_TOKENS: u32 = 200;

/// Provider client variants
#[derive(Debug)]
enum ProviderClient {
    /// OpenAI API service
    OpenAI(OpenAI),
    /// LM Studio local server (OpenAI-compatible)
    LMStudio(OpenAI),
    /// Anthropic API service
    Anthropic(Anthropic),
    /// Ollama LLM service
    Ollama(Ollama),
    /// Scripted responses
    Mock(MockProvider),
}

impl ProviderClient {
    fn name(&self) -> &'static str {
        match self {
            Self::OpenAI(_) => "openai",
            Self::LMStudio(_) => "lmstudio",
            Self::Anthropic(_) => "anthropic",
            Self::Ollama(_) => "ollama",
            Self::Mock(_) => "mock",
        }
    }
}

/// Translator that asks a language model for two keyword variants
#[derive(Debug)]
pub struct LlmTranslator {
    client: ProviderClient,
    model: String,
    temperature: f32,
    system_prompt: String,
    template: PromptTemplate,
}

impl LlmTranslator {
    /// Create a translator for the active provider of the configuration
    pub fn from_config(config: &TranslationConfig) -> Result<Self> {
        let timeout_secs = config.get_timeout_secs();
        let endpoint = config.get_endpoint();

        let client = match config.provider {
            TranslationProvider::OpenAI => {
                ProviderClient::OpenAI(OpenAI::new(config.get_api_key(), endpoint, timeout_secs))
            }
            TranslationProvider::LMStudio => {
                // LM Studio often doesn't require an API key; use a default if empty
                let api_key = {
                    let k = config.get_api_key();
                    if k.is_empty() { "lm-studio".to_string() } else { k }
                };
                ProviderClient::LMStudio(OpenAI::new(api_key, endpoint, timeout_secs))
            }
            TranslationProvider::Anthropic => {
                ProviderClient::Anthropic(Anthropic::new(config.get_api_key(), endpoint, timeout_secs))
            }
            TranslationProvider::Ollama => ProviderClient::Ollama(Ollama::from_url(endpoint, timeout_secs)),
        };

        Ok(Self {
            client,
            model: config.get_model(),
            temperature: config.common.temperature,
            system_prompt: config.common.system_prompt.clone(),
            template: PromptTemplate::default(),
        })
    }

    /// Create a translator backed by a mock provider
    pub fn mock(provider: MockProvider) -> Self {
        Self {
            client: ProviderClient::Mock(provider),
            model: "mock".to_string(),
            temperature: 0.0,
            system_prompt: PromptTemplate::JSON_ONLY.to_string(),
            template: PromptTemplate::default(),
        }
    }

    /// Replace the user prompt template
    pub fn with_template(mut self, template: PromptTemplate) -> Self {
        self.template = template;
        self
    }

    /// Send the prompt and return the raw reply text
    async fn complete(&self, request: &TranslationRequest, prompt: KeywordPrompt) -> Result<String, TranslationError> {
        let text = match &self.client {
            ProviderClient::OpenAI(client) | ProviderClient::LMStudio(client) => {
                let req = OpenAIRequest::new(&self.model)
                    .add_message("system", prompt.system)
                    .add_message("user", prompt.user)
                    .temperature(self.temperature)
                    .max_tokens(MAX_RESPONSE_TOKENS);
                OpenAI::extract_text(&client.complete(req).await?)
            }
            ProviderClient::Anthropic(client) => {
                let req = AnthropicRequest::new(&self.model, MAX_RESPONSE_TOKENS)
                    .system(prompt.system)
                    .add_message("user", prompt.user)
                    .temperature(self.temperature);
                Anthropic::extract_text(&client.complete(req).await?)
            }
            ProviderClient::Ollama(client) => {
                let messages = vec![
                    ChatMessage { role: "system".to_string(), content: prompt.system },
                    ChatMessage { role: "user".to_string(), content: prompt.user },
                ];
                let req = ChatRequest::new(&self.model, messages)
                    .temperature(self.temperature)
                    .json_format();
                Ollama::extract_text(&client.complete(req).await?)
            }
            ProviderClient::Mock(client) => {
                let req = MockRequest {
                    keyword: request.keyword.clone(),
                    target_language: request.target_language.clone(),
                    prompt: prompt.user,
                };
                MockProvider::extract_text(&client.complete(req).await?)
            }
        };

        Ok(text)
    }
}

#[async_trait]
impl Translator for LlmTranslator {
    async fn translate(&self, request: &TranslationRequest) -> Result<VariantPair, TranslationError> {
        let prompt = KeywordPrompt::build(request, &self.system_prompt, &self.template);
        let raw = self.complete(request, prompt).await?;
        debug!("Model reply for '{}': {}", request.keyword, raw.trim());
        parse_variants(&raw)
    }

    fn describe(&self) -> String {
        format!("{}/{}", self.client.name(), self.model)
    }
}

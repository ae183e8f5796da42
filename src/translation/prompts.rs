/*!
 * Prompt templates for keyword translation.
 *
 * The model is asked to act as a native-speaking SEO specialist and to answer
 * with a two-key JSON object, which `parser::parse_variants` reads back.
 */

use super::TranslationRequest;

/// User prompt template rendered for every keyword.
#[derive(Debug, Clone)]
pub struct PromptTemplate {
    /// The template string with placeholders
    template: String,
}

impl PromptTemplate {
    /// The default system prompt
    pub const JSON_ONLY: &'static str = "Only respond in valid JSON format.";

    /// The default user prompt for one keyword.
    pub const SEO_KEYWORD: &'static str = r#"You are an SEO expert and a native {target_language} speaker. Translate the following keyword into {target_language} the way a native speaker would type it into a search engine.

Keyword: {keyword}
{context}
Give two different natural phrasings. Respond only with valid JSON:
{
  "translated_keyword": "...",
  "translated_variant": "..."
}"#;

    /// Create a new prompt template.
    pub fn new(template: &str) -> Self {
        Self {
            template: template.to_string(),
        }
    }

    /// Create the default SEO keyword template.
    pub fn seo_keyword() -> Self {
        Self::new(Self::SEO_KEYWORD)
    }

    /// Render the template with the given variables.
    pub fn render(&self, keyword: &str, target_language: &str, context: &str) -> String {
        self.template
            .replace("{target_language}", target_language)
            .replace("{keyword}", keyword)
            .replace("{context}", context)
    }
}

impl Default for PromptTemplate {
    fn default() -> Self {
        Self::seo_keyword()
    }
}

/// The rendered system and user messages for one keyword
#[derive(Debug, Clone, PartialEq)]
pub struct KeywordPrompt {
    /// System message
    pub system: String,
    /// User message
    pub user: String,
}

impl KeywordPrompt {
    /// Build the prompt for a request.
    ///
    /// Category lines are only included when the value is present.
    pub fn build(request: &TranslationRequest, system_prompt: &str, template: &PromptTemplate) -> Self {
        let context = [
            ("Category", &request.category),
            ("Subcategory", &request.subcategory),
            ("Product category", &request.product_category),
        ]
        .iter()
        .filter_map(|(label, value)| {
            value
                .as_deref()
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(|v| format!("{}: {}\n", label, v))
        })
        .collect::<String>();

        let system = if system_prompt.trim().is_empty() {
            PromptTemplate::JSON_ONLY.to_string()
        } else {
            system_prompt.to_string()
        };

        Self {
            system,
            user: template.render(&request.keyword, &request.target_language, &context),
        }
    }
}

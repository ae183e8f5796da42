/*!
 * Prompt, reply parsing and LLM translator tests
 */

use std::time::Duration;

use kwtrans::app_config::{TranslationConfig, TranslationProvider};
use kwtrans::errors::{ProviderError, TranslationError};
use kwtrans::providers::mock::MockProvider;
use kwtrans::translation::{
    parse_variants, translate_with_retry, ItemOutcome, KeywordPrompt, Pacer, PromptTemplate,
    RetryPolicy,
};
use kwtrans::{LlmTranslator, TranslationRequest, Translator, VariantPair};

fn quick_policy() -> RetryPolicy {
    RetryPolicy {
        max_attempts: 3,
        retry_delay: Duration::ZERO,
        rate_limit_delay: Duration::ZERO,
        request_timeout: Duration::from_secs(5),
    }
}

fn request() -> TranslationRequest {
    let mut request = TranslationRequest::new("running shoes", "French");
    request.category = Some("footwear".to_string());
    request.product_category = Some("  ".to_string());
    request
}

#[test]
fn test_keywordPrompt_shouldCarryKeywordLanguageAndContext() {
    let prompt = KeywordPrompt::build(&request(), "", &PromptTemplate::default());

    assert_eq!(prompt.system, PromptTemplate::JSON_ONLY);
    assert!(prompt.user.contains("Keyword: running shoes"));
    assert!(prompt.user.contains("native French speaker"));
    assert!(prompt.user.contains("Category: footwear\n"));
    assert!(!prompt.user.contains("Product category"));
    assert!(prompt.user.contains("translated_variant"));
}

#[test]
fn test_customTemplate_shouldReplaceAllPlaceholders() {
    let template = PromptTemplate::new("{keyword} -> {target_language}\n{context}");
    let prompt = KeywordPrompt::build(&request(), "Be brief.", &template);

    assert_eq!(prompt.system, "Be brief.");
    assert_eq!(prompt.user, "running shoes -> French\nCategory: footwear\n");
}

#[test]
fn test_parseVariants_realisticReplies() {
    let replies = [
        r#"{"translated_keyword": "chaussures de course", "translated_variant": "chaussures running"}"#,
        "Sure! Here you go:\n```json\n{\"translated_keyword\": \"chaussures de course\", \"translated_variant\": \"chaussures running\"}\n```",
        r#"{"translation_1": "\"chaussures de course\"", "translation_2": "'chaussures running'"}"#,
        r#"["chaussures de course", "chaussures running"]"#,
    ];

    for reply in replies {
        let pair = parse_variants(reply).unwrap_or_else(|e| panic!("{}: {}", reply, e));
        assert_eq!(pair, VariantPair::new("chaussures de course", "chaussures running").unwrap());
    }
}

#[test]
fn test_parseVariants_unusableReplies_shouldBeMalformed() {
    for reply in ["", "I cannot translate this.", r#"{"translated_keyword": "only one"}"#, r#"["a"]"#] {
        assert!(matches!(parse_variants(reply), Err(TranslationError::MalformedResponse(_))));
    }
}

#[tokio::test]
async fn test_llmTranslator_withFlakyProvider_shouldSucceedOnThirdAttempt() {
    let provider = MockProvider::fail_first(2);
    let translator = LlmTranslator::mock(provider.clone());

    let outcome = translate_with_retry(&translator, &request(), &quick_policy(), &Pacer::new(Duration::ZERO)).await;

    assert_eq!(
        outcome,
        ItemOutcome::Translated(
            VariantPair::new("running shoes [French]", "running shoes [French alt]").unwrap()
        )
    );
    assert_eq!(provider.request_count(), 3);
}

#[tokio::test]
async fn test_llmTranslator_unauthorized_shouldFallBackAfterOneCall() {
    let provider = MockProvider::unauthorized();
    let translator = LlmTranslator::mock(provider.clone());

    let outcome = translate_with_retry(&translator, &request(), &quick_policy(), &Pacer::new(Duration::ZERO)).await;

    assert!(outcome.is_fallback());
    assert_eq!(provider.request_count(), 1);
    assert_eq!(
        outcome.into_variants("running shoes"),
        VariantPair::fallback("running shoes")
    );
}

#[tokio::test]
async fn test_llmTranslator_malformedEveryTime_shouldExhaustAttempts() {
    let provider = MockProvider::malformed();
    let translator = LlmTranslator::mock(provider.clone());

    let outcome = translate_with_retry(&translator, &request(), &quick_policy(), &Pacer::new(Duration::ZERO)).await;

    match outcome {
        ItemOutcome::Fallback { reason } => assert!(reason.contains("Malformed")),
        other => panic!("expected fallback, got {:?}", other),
    }
    assert_eq!(provider.request_count(), 3);
}

#[tokio::test]
async fn test_llmTranslator_connectionDown_shouldRetryThenFallBack() {
    let provider = MockProvider::failing();
    let translator = LlmTranslator::mock(provider.clone());

    let outcome = translate_with_retry(&translator, &request(), &quick_policy(), &Pacer::new(Duration::ZERO)).await;

    match &outcome {
        ItemOutcome::Fallback { reason } => assert!(reason.contains("Simulated connection failure")),
        other => panic!("expected fallback, got {:?}", other),
    }
    assert_eq!(provider.request_count(), 3);
    assert_eq!(
        outcome.into_variants("running shoes"),
        VariantPair::fallback("running shoes")
    );
}

#[tokio::test(start_paused = true)]
async fn test_llmTranslator_slowProvider_shouldTimeOut() {
    let provider = MockProvider::slow(10_000);
    let translator = LlmTranslator::mock(provider.clone());
    let policy = RetryPolicy {
        max_attempts: 2,
        request_timeout: Duration::from_secs(1),
        ..quick_policy()
    };

    let outcome = translate_with_retry(&translator, &request(), &policy, &Pacer::new(Duration::ZERO)).await;

    match outcome {
        ItemOutcome::Fallback { reason } => assert!(reason.contains("timed out")),
        other => panic!("expected fallback, got {:?}", other),
    }
    assert_eq!(provider.request_count(), 2);
}

#[tokio::test]
async fn test_llmTranslator_intermittent_shouldTranslateEveryItem() {
    let provider = MockProvider::intermittent(2);
    let translator = LlmTranslator::mock(provider.clone());
    let pacer = Pacer::new(Duration::ZERO);

    for keyword in ["tent", "stove", "lantern"] {
        let request = TranslationRequest::new(keyword, "German");
        let outcome = translate_with_retry(&translator, &request, &quick_policy(), &pacer).await;
        assert!(!outcome.is_fallback(), "{} fell back", keyword);
    }
    assert!(provider.request_count() > 3);
}

#[test]
fn test_retryPolicy_delayAfter_shouldDistinguishRateLimits() {
    let policy = RetryPolicy::default();
    let limited: TranslationError = ProviderError::RateLimitExceeded("slow down".into()).into();
    let broken: TranslationError = ProviderError::ConnectionError("reset".into()).into();

    assert_eq!(policy.delay_after(&limited), Duration::from_secs(10));
    assert_eq!(policy.delay_after(&broken), Duration::from_millis(1500));
}

#[test]
fn test_fromConfig_eachProvider_shouldDescribeItself() {
    for (provider, expected) in [
        (TranslationProvider::OpenAI, "openai/gpt-4"),
        (TranslationProvider::Anthropic, "anthropic/claude-3-haiku-20240307"),
        (TranslationProvider::LMStudio, "lmstudio/local-model"),
        (TranslationProvider::Ollama, "ollama/llama3.2:3b"),
    ] {
        let mut config = TranslationConfig::default();
        config.provider = provider;
        let translator = LlmTranslator::from_config(&config).unwrap();
        assert_eq!(translator.describe(), expected);
    }
}

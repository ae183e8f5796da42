/*!
 * Scripted `Translator` implementations for worker tests
 *
 * These avoid any provider or prompt machinery: each call either returns a
 * predetermined pair or a predetermined error, and every call is recorded.
 */

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use kwtrans::errors::{ProviderError, TranslationError};
use kwtrans::{TranslationRequest, Translator, VariantPair};

/// What a scripted translator answers
#[derive(Debug, Clone)]
pub enum Script {
    /// The same pair for every keyword
    Fixed(String, String),
    /// `<keyword> (<language> 1)` / `<keyword> (<language> 2)`
    Echo,
    /// A transient server error on every call
    AlwaysFail,
    /// Fail only for the listed keywords, echo the rest
    FailFor(Vec<String>),
}

/// Translator with a fixed script and a call log
#[derive(Debug)]
pub struct ScriptedTranslator {
    script: Script,
    delay: Duration,
    calls: AtomicUsize,
    keywords: Mutex<Vec<String>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl ScriptedTranslator {
    pub fn new(script: Script) -> Self {
        Self {
            script,
            delay: Duration::ZERO,
            calls: AtomicUsize::new(0),
            keywords: Mutex::new(Vec::new()),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }

    pub fn fixed(first: &str, second: &str) -> Self {
        Self::new(Script::Fixed(first.to_string(), second.to_string()))
    }

    pub fn echo() -> Self {
        Self::new(Script::Echo)
    }

    pub fn always_fail() -> Self {
        Self::new(Script::AlwaysFail)
    }

    pub fn fail_for(keywords: &[&str]) -> Self {
        Self::new(Script::FailFor(keywords.iter().map(|k| k.to_string()).collect()))
    }

    /// Sleep this long inside every call
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Calls per keyword
    pub fn calls_by_keyword(&self) -> HashMap<String, usize> {
        let mut counts = HashMap::new();
        for keyword in self.keywords.lock().unwrap().iter() {
            *counts.entry(keyword.clone()).or_insert(0) += 1;
        }
        counts
    }

    /// Highest number of calls observed running at once
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    fn transient_error() -> TranslationError {
        ProviderError::ApiError {
            status_code: 503,
            message: "service unavailable".to_string(),
        }
        .into()
    }

    fn echo_pair(request: &TranslationRequest) -> VariantPair {
        VariantPair::new(
            format!("{} ({} 1)", request.keyword, request.target_language),
            format!("{} ({} 2)", request.keyword, request.target_language),
        )
        .unwrap()
    }
}

#[async_trait]
impl Translator for ScriptedTranslator {
    async fn translate(&self, request: &TranslationRequest) -> Result<VariantPair, TranslationError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.keywords.lock().unwrap().push(request.keyword.clone());

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        match &self.script {
            Script::Fixed(first, second) => Ok(VariantPair::new(first.clone(), second.clone()).unwrap()),
            Script::Echo => Ok(Self::echo_pair(request)),
            Script::AlwaysFail => Err(Self::transient_error()),
            Script::FailFor(keywords) if keywords.contains(&request.keyword) => Err(Self::transient_error()),
            Script::FailFor(_) => Ok(Self::echo_pair(request)),
        }
    }

    fn describe(&self) -> String {
        "scripted".to_string()
    }
}

/// Translator that hands the job's lease to another worker on its first call
///
/// Every call still answers with the echo pair.
pub struct LeaseStealingTranslator {
    store: kwtrans::JobStore,
    job_id: String,
    calls: AtomicUsize,
}

impl LeaseStealingTranslator {
    pub fn new(store: &kwtrans::JobStore, job_id: &str) -> Self {
        Self {
            store: store.clone(),
            job_id: job_id.to_string(),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Translator for LeaseStealingTranslator {
    async fn translate(&self, request: &TranslationRequest) -> Result<VariantPair, TranslationError> {
        if self.calls.fetch_add(1, Ordering::SeqCst) == 0 {
            // Let the current lease age past a zero staleness window
            tokio::time::sleep(Duration::from_millis(5)).await;
            let stolen = self
                .store
                .claim_job(&self.job_id, "other-worker", Duration::ZERO)
                .await
                .unwrap();
            assert!(stolen, "lease takeover failed");
        }
        Ok(ScriptedTranslator::echo_pair(request))
    }

    fn describe(&self) -> String {
        "lease-stealing".to_string()
    }
}

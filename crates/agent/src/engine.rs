//! Proposal engine — the retry and concurrency envelope around the
//! completion backend.
//!
//! Every backend call holds a permit of a process-wide semaphore, sized by
//! the first engine that asks for a limit (16 by default). `propose`
//! retries up to `max_attempts` times: the first attempt runs at
//! `first_temperature`, every later one at `retry_temperature`. A reply that does not parse into a [`Proposal`] counts as a failed attempt.

use crate::dialogue::Dialogue;
use ambit_core::error::{BackendError, ProviderError};
use ambit_core::message::Message;
use ambit_core::proposal::Proposal;
use ambit_core::provider::{Provider, ProviderRequest};
use std::sync::{Arc, OnceLock};
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

/// Default ceiling on in-flight backend calls.
pub const DEFAULT_MAX_CONCURRENCY: usize = 16;

/// The process-wide semaphore and the ceiling it was created with.
static GLOBAL_SEMAPHORE: OnceLock<(Arc<Semaphore>, usize)> = OnceLock::new();

/// The semaphore shared by every engine in the process, created with the
/// default ceiling if nothing sized it first.
pub fn global_semaphore() -> Arc<Semaphore> {
    init_global_semaphore(DEFAULT_MAX_CONCURRENCY)
}

/// Size the process-wide semaphore with `limit` permits. The first call
/// wins; a later call with another limit gets the existing semaphore.
pub fn init_global_semaphore(limit: usize) -> Arc<Semaphore> {
    let limit = limit.max(1);
    let (semaphore, ceiling) =
        GLOBAL_SEMAPHORE.get_or_init(|| (Arc::new(Semaphore::new(limit)), limit));
    if *ceiling != limit {
        warn!(
            requested = limit,
            ceiling = *ceiling,
            "Backend concurrency limit already set, keeping the first one"
        );
    }
    semaphore.clone()
}

/// How many times to call the backend and at which temperatures.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub first_temperature: f32,
    pub retry_temperature: f32,
}

impl RetryPolicy {
    /// Temperature of the 1-based `attempt`.
    pub fn temperature_for(&self, attempt: u32) -> f32 {
        if attempt <= 1 {
            self.first_temperature
        } else {
            self.retry_temperature
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            first_temperature: 0.0,
            retry_temperature: 0.5,
        }
    }
}

impl From<&ambit_config::AgentConfig> for RetryPolicy {
    fn from(config: &ambit_config::AgentConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            first_temperature: config.first_temperature,
            retry_temperature: config.retry_temperature,
        }
    }
}

enum AttemptFailure {
    Provider(ProviderError),
    NonConforming(String),
}

pub struct ProposalEngine {
    provider: Arc<dyn Provider>,
    model: String,
    max_tokens: Option<u32>,
    /// `None` uses the process-wide semaphore
    semaphore: Option<Arc<Semaphore>>,
    policy: RetryPolicy,
}

impl ProposalEngine {
    /// Create an engine on the process-wide semaphore.
    pub fn new(provider: Arc<dyn Provider>, model: impl Into<String>) -> Self {
        Self {
            provider,
            model: model.into(),
            max_tokens: None,
            semaphore: None,
            policy: RetryPolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Use a dedicated semaphore instead of the process-wide one.
    pub fn with_semaphore(mut self, semaphore: Arc<Semaphore>) -> Self {
        self.semaphore = Some(semaphore);
        self
    }

    /// Use the process-wide semaphore, sizing it with `limit` if no engine
    /// has used it yet.
    pub fn with_max_concurrency(mut self, limit: usize) -> Self {
        self.semaphore = Some(init_global_semaphore(limit));
        self
    }

    /// The semaphore this engine's calls hold a permit of.
    pub fn semaphore(&self) -> Arc<Semaphore> {
        self.semaphore.clone().unwrap_or_else(global_semaphore)
    }

    pub fn with_max_tokens(mut self, max_tokens: Option<u32>) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// One backend call under a semaphore permit.
    async fn call(
        &self,
        messages: Vec<Message>,
        temperature: f32,
        json_mode: bool,
    ) -> Result<String, ProviderError> {
        let semaphore = self.semaphore();
        let _permit = semaphore.acquire().await.map_err(|_| {
            ProviderError::NotConfigured("backend concurrency limiter closed".into())
        })?;

        let mut request = ProviderRequest::new(&self.model, messages)
            .with_temperature(temperature)
            .with_json_mode(json_mode);
        request.max_tokens = self.max_tokens;

        let response = self.provider.complete(request).await?;
        if let Some(usage) = &response.usage {
            debug!(
                prompt_tokens = usage.prompt_tokens,
                completion_tokens = usage.completion_tokens,
                "Backend usage"
            );
        }
        Ok(response.content)
    }

    /// Ask the backend for a proposal, retrying per the policy.
    pub async fn propose(&self, dialogue: &Dialogue) -> Result<Proposal, BackendError> {
        let messages = dialogue.to_request_messages();
        let mut last = None;

        for attempt in 1..=self.policy.max_attempts {
            let temperature = self.policy.temperature_for(attempt);
            debug!(attempt, temperature, "Requesting proposal");

            match self.call(messages.clone(), temperature, true).await {
                Ok(text) => match Proposal::parse(&text) {
                    Ok(proposal) => {
                        info!(attempt, purpose = %proposal.purpose, "Proposal received");
                        return Ok(proposal);
                    }
                    Err(e) => {
                        warn!(attempt, error = %e, "Backend reply is not a proposal");
                        last = Some(AttemptFailure::NonConforming(e.to_string()));
                    }
                },
                Err(e) => {
                    warn!(attempt, error = %e, "Backend call failed");
                    last = Some(AttemptFailure::Provider(e));
                }
            }
        }

        Err(match last {
            Some(AttemptFailure::NonConforming(reason)) => BackendError::NonConforming(reason),
            Some(AttemptFailure::Provider(e)) => BackendError::Exhausted {
                attempts: self.policy.max_attempts,
                last: e,
            },
            None => BackendError::Exhausted {
                attempts: 0,
                last: ProviderError::NotConfigured("no attempts allowed".into()),
            },
        })
    }

    /// Single-shot free-text completion of `prompt`.
    pub async fn complete(&self, prompt: &str) -> Result<String, BackendError> {
        self.call(
            vec![Message::user(prompt)],
            self.policy.first_temperature,
            false,
        )
        .await
        .map_err(|e| BackendError::Exhausted {
            attempts: 1,
            last: e,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ambit_core::provider::ProviderResponse;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    const VALID: &str = r#"{"Purpose":"p","Thoughts":"t","Proactive_Task":null,"Response":null,"Operation":"null"}"#;

    /// Replies from a script; records the temperature of each call.
    struct ScriptedProvider {
        script: Mutex<Vec<Result<String, ProviderError>>>,
        temperatures: Mutex<Vec<f32>>,
        json_modes: Mutex<Vec<bool>>,
    }

    impl ScriptedProvider {
        fn new(mut script: Vec<Result<String, ProviderError>>) -> Self {
            script.reverse();
            Self {
                script: Mutex::new(script),
                temperatures: Mutex::new(Vec::new()),
                json_modes: Mutex::new(Vec::new()),
            }
        }

        fn temperatures(&self) -> Vec<f32> {
            self.temperatures.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Provider for ScriptedProvider {
        fn name(&self) -> &str {
            "scripted"
        }

        async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
            self.temperatures.lock().unwrap().push(request.temperature);
            self.json_modes.lock().unwrap().push(request.json_mode);
            let next = self
                .script
                .lock()
                .unwrap()
                .pop()
                .unwrap_or_else(|| Err(ProviderError::Network("script exhausted".into())));
            next.map(|content| ProviderResponse {
                content,
                usage: None,
                model: "scripted".into(),
            })
        }
    }

    /// Sleeps inside every call and records the peak number of concurrent calls.
    struct SlowProvider {
        active: AtomicUsize,
        peak: AtomicUsize,
    }

    #[async_trait]
    impl Provider for SlowProvider {
        fn name(&self) -> &str {
            "slow"
        }

        async fn complete(&self, _request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
            let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(20)).await;
            self.active.fetch_sub(1, Ordering::SeqCst);
            Ok(ProviderResponse {
                content: VALID.into(),
                usage: None,
                model: "slow".into(),
            })
        }
    }

    fn dialogue() -> Dialogue {
        Dialogue {
            system: "sys".into(),
            messages: vec![Message::user("obs")],
        }
    }

    fn network() -> Result<String, ProviderError> {
        Err(ProviderError::Network("reset".into()))
    }

    fn engine(provider: Arc<dyn Provider>) -> ProposalEngine {
        ProposalEngine::new(provider, "test-model").with_semaphore(Arc::new(Semaphore::new(16)))
    }

    #[tokio::test]
    async fn first_attempt_success_uses_zero_temperature() {
        let provider = Arc::new(ScriptedProvider::new(vec![Ok(VALID.into())]));
        let proposal = engine(provider.clone()).propose(&dialogue()).await.unwrap();
        assert_eq!(proposal.purpose, "p");
        assert_eq!(provider.temperatures(), vec![0.0]);
        assert_eq!(*provider.json_modes.lock().unwrap(), vec![true]);
    }

    #[tokio::test]
    async fn retries_use_higher_temperature() {
        let provider = Arc::new(ScriptedProvider::new(vec![
            network(),
            network(),
            Ok(VALID.into()),
        ]));
        engine(provider.clone()).propose(&dialogue()).await.unwrap();
        assert_eq!(provider.temperatures(), vec![0.0, 0.5, 0.5]);
    }

    #[tokio::test]
    async fn gives_up_after_five_attempts_with_last_error() {
        let provider = Arc::new(ScriptedProvider::new(vec![
            network(),
            network(),
            network(),
            network(),
            Err(ProviderError::RateLimited { retry_after_secs: 5 }),
            Ok(VALID.into()),
        ]));
        let err = engine(provider.clone()).propose(&dialogue()).await.unwrap_err();
        assert_eq!(provider.temperatures().len(), 5);
        assert!(matches!(
            err,
            BackendError::Exhausted {
                attempts: 5,
                last: ProviderError::RateLimited { .. }
            }
        ));
    }

    #[tokio::test]
    async fn unparseable_reply_is_retried() {
        let provider = Arc::new(ScriptedProvider::new(vec![
            Ok("I think the user is fine.".into()),
            Ok(format!("```json\n{VALID}\n```")),
        ]));
        let proposal = engine(provider.clone()).propose(&dialogue()).await.unwrap();
        assert!(proposal.operation().is_none());
        assert_eq!(provider.temperatures(), vec![0.0, 0.5]);
    }

    #[tokio::test]
    async fn final_non_conforming_reply_fails_the_cycle() {
        let provider = Arc::new(ScriptedProvider::new(vec![
            network(),
            Ok("nope".into()),
            Ok("nope".into()),
            Ok("nope".into()),
            Ok(r#"{"Thoughts":"missing purpose"}"#.into()),
        ]));
        let err = engine(provider.clone()).propose(&dialogue()).await.unwrap_err();
        assert!(matches!(err, BackendError::NonConforming(_)));
        assert_eq!(provider.temperatures().len(), 5);
    }

    #[tokio::test]
    async fn policy_from_config() {
        let config = ambit_config::AgentConfig {
            max_attempts: 2,
            retry_temperature: 0.9,
            ..Default::default()
        };
        let provider = Arc::new(ScriptedProvider::new(vec![network(), network(), network()]));
        let err = engine(provider.clone())
            .with_policy(RetryPolicy::from(&config))
            .propose(&dialogue())
            .await
            .unwrap_err();
        assert!(matches!(err, BackendError::Exhausted { attempts: 2, .. }));
        assert_eq!(provider.temperatures(), vec![0.0, 0.9]);
    }

    #[tokio::test]
    async fn complete_is_a_single_plain_call() {
        let provider = Arc::new(ScriptedProvider::new(vec![Ok("summary".into()), network()]));
        let text = engine(provider.clone()).complete("summarize").await.unwrap();
        assert_eq!(text, "summary");
        assert_eq!(provider.temperatures(), vec![0.0]);
        assert_eq!(*provider.json_modes.lock().unwrap(), vec![false]);

        let err = engine(provider.clone()).complete("again").await.unwrap_err();
        assert!(matches!(err, BackendError::Exhausted { attempts: 1, .. }));
    }

    #[tokio::test]
    async fn concurrent_calls_never_exceed_the_semaphore() {
        let provider = Arc::new(SlowProvider {
            active: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        });
        let engine = Arc::new(engine(provider.clone()));

        let handles: Vec<_> = (0..40)
            .map(|_| {
                let engine = engine.clone();
                tokio::spawn(async move { engine.propose(&dialogue()).await })
            })
            .collect();
        for h in handles {
            h.await.unwrap().unwrap();
        }

        let peak = provider.peak.load(Ordering::SeqCst);
        assert!(peak <= DEFAULT_MAX_CONCURRENCY, "peak was {peak}");
        assert!(peak > 1);
    }

    #[test]
    fn global_semaphore_is_shared() {
        let a = global_semaphore();
        let b = global_semaphore();
        assert!(Arc::ptr_eq(&a, &b));
        assert!(a.available_permits() <= DEFAULT_MAX_CONCURRENCY);
    }

    #[test]
    fn every_concurrency_limit_uses_the_global_semaphore() {
        let provider = Arc::new(ScriptedProvider::new(vec![]));
        let global = global_semaphore();
        for limit in [2, 16, 64] {
            let engine = ProposalEngine::new(provider.clone(), "m").with_max_concurrency(limit);
            assert!(Arc::ptr_eq(&engine.semaphore(), &global));
        }
        let engine = ProposalEngine::new(provider, "m");
        assert!(Arc::ptr_eq(&engine.semaphore(), &global));
    }
}

//! The proactive control loop.
//!
//! One cycle per published observation: append the turn, assemble the
//! dialogue, ask the backend for a proposal, publish the decision, dispatch
//! the operation if there is one, and record the proposal as the turn's
//! response. Cycles that arrive while another is in flight are dropped.

use crate::dialogue::DialogueBuilder;
use crate::engine::ProposalEngine;
use crate::gate::ProposalGate;
use crate::transcript::Transcript;
use ambit_core::bus::{Tag, TagBus};
use ambit_core::context::ContextLog;
use ambit_core::error::{Result, StateError};
use ambit_core::proposal::Proposal;
use ambit_core::tool::DispatchContext;
use ambit_tools::{ActionDispatcher, DispatchOutcome};
use std::sync::Arc;
use tokio::sync::{Mutex, broadcast};
use tracing::{Instrument, debug, error, info, info_span, warn};

/// Source name used when publishing proposals and decisions.
pub const SOURCE: &str = "agent";

/// Published on `agent.execute` when the proposal asks for nothing.
pub const NOP: &str = "nop";

/// How one cycle ended.
#[derive(Debug)]
pub enum CycleOutcome {
    /// Another cycle held the gate; nothing was recorded.
    Dropped,
    /// The backend proposed no operation.
    NoAction { proposal: Proposal },
    /// The proposed operation went through the dispatcher.
    Dispatched {
        proposal: Proposal,
        outcome: DispatchOutcome,
    },
}

pub struct AgentLoop {
    context: Mutex<ContextLog>,
    builder: DialogueBuilder,
    engine: ProposalEngine,
    dispatcher: ActionDispatcher,
    gate: ProposalGate,
    bus: Arc<TagBus>,
    operations: serde_json::Value,
    transcript: Option<Transcript>,
}

impl AgentLoop {
    /// Create the loop and publish the operations catalogue.
    pub fn new(
        bus: Arc<TagBus>,
        engine: ProposalEngine,
        dispatcher: ActionDispatcher,
        builder: DialogueBuilder,
    ) -> Self {
        let operations = dispatcher.operations_json();
        bus.publish_silent(Tag::Operations, "environment", operations.to_string());

        Self {
            context: Mutex::new(ContextLog::new()),
            builder,
            engine,
            dispatcher,
            gate: ProposalGate::new(bus.clone()),
            bus,
            operations,
            transcript: None,
        }
    }

    /// Append every assembled dialogue to `transcript`.
    pub fn with_transcript(mut self, transcript: Option<Transcript>) -> Self {
        self.transcript = transcript;
        self
    }

    pub fn operations(&self) -> &serde_json::Value {
        &self.operations
    }

    /// A snapshot of the context log.
    pub async fn context(&self) -> ContextLog {
        self.context.lock().await.clone()
    }

    /// Record user feedback on the latest turn.
    pub async fn record_feedback(&self, text: impl Into<String>) -> std::result::Result<(), StateError> {
        self.context.lock().await.set_feedback(text)
    }

    /// Run one cycle for a serialized observation.
    pub async fn run_cycle(&self, observation: &str) -> Result<CycleOutcome> {
        let Some(_permit) = self.gate.try_enter().await else {
            warn!("Another proposal is in flight, dropping observation");
            return Ok(CycleOutcome::Dropped);
        };

        let dialogue = {
            let mut context = self.context.lock().await;
            context.append_event(observation);
            self.builder.build(&context, &self.operations)?
        };
        debug!(messages = dialogue.messages.len(), "Dialogue assembled");

        if let Some(transcript) = &self.transcript {
            // Fire and forget; failures are logged by the task.
            drop(transcript.record(&dialogue));
        }

        let proposal = self.engine.propose(&dialogue).await?;
        let response = serde_json::to_string(&proposal)?;

        self.bus.publish(Tag::Propose, SOURCE, response.clone());
        let operation = proposal.operation().map(str::to_string);
        self.bus
            .publish(Tag::Execute, SOURCE, operation.as_deref().unwrap_or(NOP));

        let result: Result<CycleOutcome> = match operation {
            None => {
                info!(purpose = %proposal.purpose, "No action proposed");
                Ok(CycleOutcome::NoAction { proposal })
            }
            Some(operation) => {
                info!(operation = %operation, "Executing proposed operation");
                let ctx = DispatchContext {
                    event: observation.to_string(),
                    proposal: proposal.clone(),
                    operation: operation.clone(),
                };
                self.dispatcher
                    .execute(&operation, &ctx)
                    .await
                    .map(|outcome| CycleOutcome::Dispatched { proposal, outcome })
                    .map_err(Into::into)
            }
        };

        // The proposal is recorded even when dispatch failed.
        self.context.lock().await.set_response(response)?;
        result
    }

    /// Spawn the loop: one cycle per observation published on the bus.
    ///
    /// Each cycle runs on its own task so that observations arriving during
    /// a cycle reach the gate and are dropped instead of queueing.
    pub fn start(self: Arc<Self>) -> tokio::task::JoinHandle<()> {
        let mut rx = self.bus.subscribe(Tag::Observation);
        info!("Agent loop started");

        tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(published) => {
                        let agent = self.clone();
                        let span = info_span!("cycle", cycle_id = %uuid::Uuid::new_v4());
                        tokio::spawn(
                            async move {
                                match agent.run_cycle(&published.content).await {
                                    Ok(CycleOutcome::Dropped) => debug!("Cycle dropped"),
                                    Ok(CycleOutcome::NoAction { .. }) => {
                                        debug!("Cycle finished without action")
                                    }
                                    Ok(CycleOutcome::Dispatched { outcome, .. }) => {
                                        info!(tool = outcome.name(), "Cycle finished")
                                    }
                                    Err(e) => error!(error = %e, "Cycle failed"),
                                }
                            }
                            .instrument(span),
                        );
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!(skipped, "Agent loop lagged behind observations");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::RetryPolicy;
    use ambit_core::error::{Error, ProviderError, ToolError};
    use ambit_core::provider::{Provider, ProviderRequest, ProviderResponse};
    use ambit_core::tool::{ToolResponse, ToolService};
    use ambit_tools::BackendCredentials;
    use async_trait::async_trait;
    use std::collections::BTreeMap;
    use std::sync::Mutex as StdMutex;
    use tokio::sync::Semaphore;

    fn proposal_json(operation: &str) -> String {
        serde_json::json!({
            "Purpose": "writing",
            "Thoughts": "could help",
            "Proactive_Task": "help",
            "Response": "I can help",
            "Operation": operation,
        })
        .to_string()
    }

    struct FixedProvider {
        reply: String,
        calls: StdMutex<usize>,
    }

    impl FixedProvider {
        fn new(reply: String) -> Self {
            Self {
                reply,
                calls: StdMutex::new(0),
            }
        }
    }

    #[async_trait]
    impl Provider for FixedProvider {
        fn name(&self) -> &str {
            "fixed"
        }

        async fn complete(&self, _request: ProviderRequest) -> std::result::Result<ProviderResponse, ProviderError> {
            *self.calls.lock().unwrap() += 1;
            Ok(ProviderResponse {
                content: self.reply.clone(),
                usage: None,
                model: "fixed".into(),
            })
        }
    }

    #[derive(Default)]
    struct CountingService {
        calls: StdMutex<Vec<String>>,
    }

    #[async_trait]
    impl ToolService for CountingService {
        async fn call(
            &self,
            endpoint: &str,
            _params: &BTreeMap<String, String>,
        ) -> std::result::Result<ToolResponse, ToolError> {
            self.calls.lock().unwrap().push(endpoint.to_string());
            Ok(ToolResponse(serde_json::json!({"status": "success"})))
        }
    }

    fn agent(reply: String, service: Arc<CountingService>) -> (AgentLoop, Arc<FixedProvider>, Arc<TagBus>) {
        let provider = Arc::new(FixedProvider::new(reply));
        let bus = Arc::new(TagBus::default());
        let engine = ProposalEngine::new(provider.clone(), "m")
            .with_semaphore(Arc::new(Semaphore::new(16)))
            .with_policy(RetryPolicy::default());
        let dispatcher =
            ambit_tools::default_dispatcher(service, BackendCredentials::default(), &[]);
        let agent = AgentLoop::new(bus.clone(), engine, dispatcher, DialogueBuilder::new());
        (agent, provider, bus)
    }

    #[tokio::test]
    async fn null_operation_records_response_without_dispatch() {
        let service = Arc::new(CountingService::default());
        let (agent, _, bus) = agent(proposal_json("null"), service.clone());

        let outcome = agent.run_cycle("{\"user_input\":\"hi\"}").await.unwrap();

        assert!(matches!(outcome, CycleOutcome::NoAction { .. }));
        assert!(service.calls.lock().unwrap().is_empty());
        assert_eq!(bus.latest(Tag::Execute).unwrap().content, NOP);
        let context = agent.context().await;
        assert_eq!(context.len(), 1);
        let response = context.last().unwrap().response.clone().unwrap();
        assert_eq!(response, bus.latest(Tag::Propose).unwrap().content);
    }

    #[tokio::test]
    async fn operation_is_dispatched_and_published() {
        let service = Arc::new(CountingService::default());
        let (agent, _, bus) = agent(proposal_json("search&query=cats"), service.clone());

        let outcome = agent.run_cycle("{}").await.unwrap();

        assert!(matches!(outcome, CycleOutcome::Dispatched { .. }));
        assert_eq!(*service.calls.lock().unwrap(), vec!["search".to_string()]);
        assert_eq!(bus.latest(Tag::Execute).unwrap().content, "search&query=cats");
    }

    #[tokio::test]
    async fn operations_catalogue_is_published() {
        let (agent, _, bus) = agent(proposal_json("null"), Arc::new(CountingService::default()));
        let published: serde_json::Value =
            serde_json::from_str(&bus.latest(Tag::Operations).unwrap().content).unwrap();
        assert_eq!(&published, agent.operations());
        assert_eq!(published.as_array().unwrap().len(), 4);
    }

    #[tokio::test]
    async fn busy_gate_drops_the_cycle() {
        let (agent, provider, bus) =
            agent(proposal_json("null"), Arc::new(CountingService::default()));
        let held = bus.try_lock(Tag::Propose).unwrap();

        let outcome = agent.run_cycle("{}").await.unwrap();

        assert!(matches!(outcome, CycleOutcome::Dropped));
        assert_eq!(*provider.calls.lock().unwrap(), 0);
        assert!(agent.context().await.is_empty());
        drop(held);
    }

    #[tokio::test]
    async fn failed_dispatch_still_records_response() {
        let service = Arc::new(CountingService::default());
        let (agent, _, _) = agent(proposal_json("search&query"), service);

        let err = agent.run_cycle("{}").await.unwrap_err();

        assert!(matches!(err, Error::Tool(ToolError::InvalidOperation(_))));
        assert!(agent.context().await.last().unwrap().response.is_some());
    }

    #[tokio::test]
    async fn backend_failure_leaves_turn_without_response() {
        let (agent, provider, _) = agent("not json".into(), Arc::new(CountingService::default()));

        let err = agent.run_cycle("{}").await.unwrap_err();

        assert!(matches!(err, Error::Backend(_)));
        assert_eq!(*provider.calls.lock().unwrap(), 5);
        let context = agent.context().await;
        assert_eq!(context.len(), 1);
        assert!(context.last().unwrap().response.is_none());
    }

    #[tokio::test]
    async fn feedback_lands_on_latest_turn() {
        let (agent, _, _) = agent(proposal_json("null"), Arc::new(CountingService::default()));
        assert_eq!(agent.record_feedback("x").await, Err(StateError::NoTurn));

        agent.run_cycle("{}").await.unwrap();
        agent.record_feedback("thanks").await.unwrap();
        assert_eq!(
            agent.context().await.last().unwrap().user_feedback.as_deref(),
            Some("thanks")
        );
    }

    #[tokio::test]
    async fn started_loop_reacts_to_observations() {
        let (agent, _, bus) = agent(proposal_json("null"), Arc::new(CountingService::default()));
        let agent = Arc::new(agent);
        let mut decisions = bus.subscribe(Tag::Execute);
        let handle = agent.clone().start();

        bus.publish(Tag::Observation, "test", "{\"user_input\":\"x\"}");

        let decision = decisions.recv().await.unwrap();
        assert_eq!(decision.content, NOP);
        handle.abort();
    }
}

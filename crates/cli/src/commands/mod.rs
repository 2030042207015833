pub mod complete;
pub mod dispatch;
pub mod init;
pub mod parse;
pub mod run;

use ambit_agent::{ProposalEngine, RetryPolicy};
use ambit_config::AppConfig;
use ambit_tools::{ActionDispatcher, BackendCredentials, HttpToolService};
use std::sync::Arc;

/// The proposal engine described by `config`.
pub fn build_engine(config: &AppConfig) -> Result<ProposalEngine, Box<dyn std::error::Error>> {
    let provider = ambit_providers::build_from_config(config)?;
    Ok(ProposalEngine::new(provider, &config.model)
        .with_policy(RetryPolicy::from(&config.agent))
        .with_max_concurrency(config.agent.max_concurrency)
        .with_max_tokens((config.max_tokens > 0).then_some(config.max_tokens)))
}

/// The built-in handlers, minus any disabled in config.
pub fn build_dispatcher(config: &AppConfig) -> ActionDispatcher {
    let service = Arc::new(HttpToolService::new(&config.tool_service.base_url));
    ambit_tools::default_dispatcher(
        service,
        BackendCredentials::from_config(config),
        &config.tool_service.disabled,
    )
    .with_strict(config.agent.strict_operations)
}

//! Completion backend implementations for Ambit.
//!
//! All backends implement the `ambit_core::Provider` trait.
//! `build_from_config` selects and constructs the configured one.

pub mod openai_compat;

pub use openai_compat::OpenAiCompatProvider;

use ambit_core::error::ProviderError;
use ambit_core::provider::Provider;
use std::sync::Arc;

/// Build the completion backend described by the configuration.
///
/// A missing API key is only accepted for loop-back endpoints
/// (Ollama, vLLM, llama.cpp running locally).
pub fn build_from_config(
    config: &ambit_config::AppConfig,
) -> Result<Arc<dyn Provider>, ProviderError> {
    let api_key = match &config.api_key {
        Some(key) => key.clone(),
        None if is_loopback(&config.base_url) => String::new(),
        None => {
            return Err(ProviderError::NotConfigured(
                "no API key; set api_key in config.toml or AMBIT_API_KEY".into(),
            ));
        }
    };

    tracing::debug!(base_url = %config.base_url, model = %config.model, "Building completion backend");
    Ok(Arc::new(OpenAiCompatProvider::new(
        "openai-compat",
        &config.base_url,
        api_key,
    )))
}

fn is_loopback(base_url: &str) -> bool {
    let rest = base_url
        .strip_prefix("http://")
        .or_else(|| base_url.strip_prefix("https://"))
        .unwrap_or(base_url);
    rest.starts_with("localhost") || rest.starts_with("127.0.0.1") || rest.starts_with("[::1]")
}

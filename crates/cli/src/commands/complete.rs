//! `ambit complete` — one-shot completion against the configured backend.

use ambit_config::AppConfig;

pub async fn run(config: AppConfig, prompt: &str) -> Result<(), Box<dyn std::error::Error>> {
    let engine = super::build_engine(&config)?;
    let reply = engine.complete(prompt).await?;
    println!("{reply}");
    Ok(())
}

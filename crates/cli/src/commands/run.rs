//! `ambit run` — batcher, proactive loop and dispatcher over stdin activity.

use ambit_activity::{ActivityBatcher, InputLine};
use ambit_agent::{AgentLoop, DialogueBuilder, Transcript};
use ambit_config::AppConfig;
use ambit_core::bus::TagBus;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{info, warn};

pub async fn run(
    config: AppConfig,
    interval: Option<u64>,
) -> Result<(), Box<dyn std::error::Error>> {
    let interval = Duration::from_secs(interval.unwrap_or(config.agent.interval_secs).max(1));

    println!("🧭 Ambit — proactive loop");
    println!("   Model:        {}", config.model);
    println!("   Tool service: {}", config.tool_service.base_url);
    println!("   Interval:     {}s", interval.as_secs());
    if let Some(path) = config.agent.transcript() {
        println!("   Transcript:   {}", path.display());
    }

    let engine = super::build_engine(&config)?;
    let dispatcher = super::build_dispatcher(&config);
    println!("   Operations:   {}", dispatcher.names().join(", "));
    println!();

    let bus = Arc::new(TagBus::default());
    let agent = Arc::new(
        AgentLoop::new(
            bus.clone(),
            engine,
            dispatcher,
            DialogueBuilder::from_config(&config.agent),
        )
        .with_transcript(config.agent.transcript().map(Transcript::new)),
    );
    let agent_handle = agent.clone().start();

    let batcher = Arc::new(Mutex::new(ActivityBatcher::new()));
    let batcher_handle = ambit_activity::spawn_batcher(batcher.clone(), bus, interval);

    let (mut input, reader_handle) = ambit_activity::spawn_stdin_reader();
    let mut input_open = true;

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = &mut shutdown => {
                info!("Shutting down");
                break;
            }
            line = input.recv(), if input_open => match line {
                Some(line) => route(line, &batcher, &agent).await,
                None => {
                    info!("Input closed, observations continue on the timer");
                    input_open = false;
                }
            },
        }
    }

    reader_handle.abort();
    batcher_handle.abort();
    agent_handle.abort();
    Ok(())
}

/// Hand one input line to the batcher or the loop.
async fn route(line: InputLine, batcher: &Mutex<ActivityBatcher>, agent: &AgentLoop) {
    match line {
        InputLine::Text(text) => match batcher.lock() {
            Ok(mut b) => b.push_text(&text),
            Err(_) => warn!("Activity buffer poisoned, dropping text"),
        },
        InputLine::Event(event) => match batcher.lock() {
            Ok(mut b) => b.push(event),
            Err(_) => warn!("Activity buffer poisoned, dropping event"),
        },
        InputLine::Feedback(text) => {
            if let Err(e) = agent.record_feedback(text).await {
                warn!(error = %e, "Feedback ignored");
            }
        }
    }
}

//! `ambit dispatch` — execute one operation string against the tool service.

use ambit_config::AppConfig;
use ambit_core::proposal::Proposal;
use ambit_core::tool::DispatchContext;
use ambit_tools::DispatchOutcome;

pub async fn run(
    config: AppConfig,
    operation: &str,
    event: String,
) -> Result<(), Box<dyn std::error::Error>> {
    let dispatcher = super::build_dispatcher(&config);
    let ctx = DispatchContext {
        event,
        proposal: manual_proposal(operation),
        operation: operation.to_string(),
    };

    match dispatcher.execute(operation, &ctx).await? {
        DispatchOutcome::Ignored { name } => {
            println!("⚠️  No handler for '{name}'");
            println!("   Available: {}", dispatcher.names().join(", "));
        }
        DispatchOutcome::Completed { name, output } => {
            let status = if output.response.is_success() { "✅" } else { "❌" };
            println!("{status} {name}");
            println!("{}", serde_json::to_string_pretty(&output.response.0)?);

            if let Some(chained) = output.chained {
                println!("\n↪ Follow-up chat:");
                match chained.await {
                    Ok(Ok(response)) => println!("{}", serde_json::to_string_pretty(&response.0)?),
                    Ok(Err(e)) => println!("❌ {e}"),
                    Err(e) => println!("❌ Follow-up task failed: {e}"),
                }
            }
        }
    }

    Ok(())
}

/// The proposal handed to handlers when no backend was asked.
fn manual_proposal(operation: &str) -> Proposal {
    Proposal {
        purpose: "Manual dispatch".into(),
        thoughts: String::new(),
        proactive_task: None,
        response: None,
        operation: Some(operation.to_string()),
    }
}

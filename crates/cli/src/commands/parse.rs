//! `ambit parse` — show how an operation string is understood.

use ambit_core::tool::ToolCall;

pub fn run(operation: &str) -> Result<(), Box<dyn std::error::Error>> {
    let call = ToolCall::parse(operation)?;
    println!("Operation: {}", call.name);
    if call.params.is_empty() {
        println!("Params:    (none)");
    } else {
        println!("Params:");
        for (key, value) in &call.params {
            println!("  {key} = {value}");
        }
    }
    println!("Canonical: {}", call.to_operation_string());
    Ok(())
}

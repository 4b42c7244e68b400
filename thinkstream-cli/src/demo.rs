// thinkstream-cli/src/demo.rs
//
// A mock agent that knows nothing about any UI: it only prints. Used by
// `thinkstream demo` to show the protocol end to end without a child process.

use std::time::Duration;
use thinkstream_core::{agent_println, flush_thinking};

/// Runs inside a capture scope; everything it prints becomes events.
pub fn weather_agent(user_input: &str, pause: Duration) {
    agent_println!("PHASE: Analysis");
    agent_println!("Log: interpreting '{}'", user_input);
    std::thread::sleep(pause);
    agent_println!("Log: checking context window...");
    std::thread::sleep(pause);

    agent_println!("SAY: I'm checking that for you...");

    agent_println!("PHASE: Tool Execution");
    agent_println!("Log: Tool 'weather_api' selected");
    std::thread::sleep(pause);
    agent_println!("Log: Calling API endpoint...");
    std::thread::sleep(pause);

    // close the block explicitly before the final answer
    let _ = flush_thinking();
    agent_println!("SAY: The weather is 22°C and sunny.");
}

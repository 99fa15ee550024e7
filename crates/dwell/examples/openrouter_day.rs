//! One real day against OpenRouter, with transcripts written to disk.
//!
//! Reads the API key from the `OPENROUTER_KEY` environment variable and
//! writes the session under `./transcripts`.
//!
//! # Usage
//!
//! ```bash
//! OPENROUTER_KEY=sk-... cargo run --example openrouter_day
//! ```

use dwell::prelude::*;
use serde_json::json;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let api_key = std::env::var("OPENROUTER_KEY")?;
    let model = "anthropic/claude-sonnet-4";
    let client = OpenRouterClient::new(api_key, model)?;
    let store = FileStore::new("transcripts")?;

    let sleep = FnTool::new(
        ToolDef::new("go_to_sleep", "End the day.", json!({"type": "object", "properties": {}})),
        |_args: serde_json::Value, _ctx: &ToolContext<'_>| {
            ToolOutcome::ok("You fall asleep.").with_command(Command::Sleep)
        },
    );
    let mut rooms = RoomRegistry::new()
        .with_room(
            Room::new("bedroom", "Bedroom")
                .with_description("A quiet room with a bed.")
                .with_tool(sleep),
        )
        .with_room(Room::new("porch", "Porch").with_description("A chair facing the street."));

    let config = SessionConfig::new(model, "You live in a small house. Look around, then rest.")
        .with_budget(60_000, 10_000)
        .with_max_tokens(1024);

    let outcome = SessionRunner::new(&client, &store, &mut rooms, config)
        .with_event_handler(&LoggingHandler)
        .run("visitor")
        .await?;

    println!("{} after {} turns", outcome.end_reason, outcome.turns);
    if let Some(id) = outcome.session_id {
        println!("Transcript: {}", store.root().join(id).display());
    }
    Ok(())
}

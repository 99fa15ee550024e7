//! A whole day in a two-room house, offline.
//!
//! The model is a [`ScriptedClient`], so this runs without an API key. It
//! shows room tools with typed arguments and room state, a move between
//! rooms, and observing the loop with a [`CompositeEventHandler`].
//!
//! # Usage
//!
//! ```bash
//! cargo run --example scripted_day
//! ```

use dwell::prelude::*;
use dwell::schemars::{self, JsonSchema};
use serde::Deserialize;
use serde_json::json;

/// Arguments for the `bake` tool.
#[derive(Deserialize, JsonSchema)]
struct BakeArgs {
    /// What to put in the oven.
    what: String,
}

fn kitchen() -> Room {
    let bake = FnTool::new(
        ToolDef::new("bake", "Bake something.", json_schema_for::<BakeArgs>()),
        |args: BakeArgs, ctx: &ToolContext<'_>| {
            let batches = ctx
                .room_state()
                .and_then(|s| s.get("batches"))
                .and_then(|v| v.as_u64())
                .unwrap_or(0)
                + 1;
            let mut patch = RoomState::new();
            patch.insert("batches".into(), json!(batches));
            ToolOutcome::ok(format!("The {} comes out golden. Batch #{batches}.", args.what))
                .with_state_update(patch)
        },
    );

    Room::new("kitchen", "Kitchen")
        .with_description("Flour on every surface.")
        .with_state_schema(json!({"type": "object"}))
        .with_tool(bake)
}

fn bedroom() -> Room {
    let sleep = FnTool::new(
        ToolDef::new("go_to_sleep", "End the day.", json!({"type": "object", "properties": {}})),
        |_args: serde_json::Value, _ctx: &ToolContext<'_>| {
            ToolOutcome::ok("Goodnight.").with_command(Command::Sleep)
        },
    );
    Room::new("bedroom", "Bedroom")
        .with_description("A bed and a window.")
        .with_tool(sleep)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let client = ScriptedClient::new()
        .with_turn(ScriptedClient::call(
            "c1",
            "move_to",
            json!({"room": "kitchen"}),
            LlmUsage::new(800, 40),
        ))
        .with_turn(ScriptedClient::call(
            "c2",
            "bake",
            json!({"what": "sourdough"}),
            LlmUsage::new(1_100, 30),
        ))
        .with_turn(ScriptedClient::call(
            "c3",
            "move_to",
            json!({"room": "bedroom"}),
            LlmUsage::new(1_300, 20),
        ))
        .with_turn(ScriptedClient::call("c4", "go_to_sleep", json!({}), LlmUsage::new(1_500, 10)))
        .with_completion("You baked sourdough. Try rye tomorrow.", LlmUsage::new(1_600, 15));

    let store = MemoryStore::new();
    let mut rooms = RoomRegistry::new().with_room(bedroom()).with_room(kitchen());
    let config = SessionConfig::new("mock/scripted", "You live in a tiny house.")
        .with_budget(20_000, 2_000);

    let printer = FnEventHandler::new(|event: &SessionEvent<'_>| match event {
        SessionEvent::ToolResult { name, result, .. } => println!("  {name}: {result}"),
        SessionEvent::RoomChanged { to, .. } => println!("-> {to}"),
        _ => {}
    });
    let handler = CompositeEventHandler::new().with(LoggingHandler).with(printer);

    let outcome = SessionRunner::new(&client, &store, &mut rooms, config)
        .with_event_handler(&handler)
        .run("baker")
        .await?;

    println!(
        "\n{} after {} turns, {} tokens spent",
        outcome.end_reason, outcome.turns, outcome.budget.spent
    );
    if let Some(summary) = outcome.summary {
        println!("Note for tomorrow: {summary}");
    }
    println!("Kitchen state: {:?}", rooms.room_state("kitchen"));
    Ok(())
}

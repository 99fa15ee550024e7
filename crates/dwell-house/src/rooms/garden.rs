//! Raised beds behind the house. Plants remember when they were last watered.

use dwell::rooms::{Room, RoomState};
use dwell::tools::{FnTool, ToolContext, ToolOutcome};
use dwell::{ToolDef, json_schema_for};
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::{Value, json};

use super::{GARDEN, HALLWAY};

pub const TEND_PLANTS: &str = "tend_plants";

pub const PLANTS: [&str; 4] = ["basil", "tomatoes", "mint", "sunflowers"];

#[derive(Deserialize, JsonSchema, Clone, Copy, PartialEq, Eq, Debug)]
#[serde(rename_all = "lowercase")]
pub enum Plant {
    Basil,
    Tomatoes,
    Mint,
    Sunflowers,
}

impl Plant {
    fn key(self) -> &'static str {
        match self {
            Plant::Basil => PLANTS[0],
            Plant::Tomatoes => PLANTS[1],
            Plant::Mint => PLANTS[2],
            Plant::Sunflowers => PLANTS[3],
        }
    }
}

#[derive(Deserialize, JsonSchema)]
pub struct TendArgs {
    /// Which bed to water and weed.
    pub plant: Plant,
}

pub fn garden() -> Room {
    Room::new(GARDEN, "Garden")
        .with_description(
            "Four raised beds: basil, tomatoes, mint, and a row of sunflowers along the fence.",
        )
        .with_state_schema(json!({
            "type": "object",
            "properties": {
                "visits": {"type": "integer"},
                "last_tended": {"type": "object"}
            }
        }))
        .with_tool(tend_plants())
        .with_transitions([HALLWAY])
        .on_enter(|state| {
            let state = state?;
            let visits = state.get("visits").and_then(Value::as_u64).unwrap_or(0) + 1;
            state.insert("visits".into(), json!(visits));
            (visits == 1).then(|| "The gate creaks. You have not been out here before.".to_string())
        })
}

fn tend_plants() -> FnTool {
    FnTool::new(
        ToolDef::new(
            TEND_PLANTS,
            "Water and weed one of the beds.",
            json_schema_for::<TendArgs>(),
        ),
        |args: TendArgs, ctx: &ToolContext<'_>| {
            let key = args.plant.key();
            let day = ctx.session_number;
            let mut tended = ctx
                .room_state()
                .and_then(|s| s.get("last_tended"))
                .and_then(Value::as_object)
                .cloned()
                .unwrap_or_default();

            let reply = match tended.get(key).and_then(Value::as_u64) {
                Some(last) if last == u64::from(day) => {
                    format!("The {key} are already soaked. You tended them earlier today.")
                }
                Some(last) => format!(
                    "You water the {key}. They were last tended on day {last} and look grateful."
                ),
                None => format!("You water the {key} for the first time."),
            };

            tended.insert(key.to_string(), json!(day));
            let mut patch = RoomState::new();
            patch.insert("last_tended".into(), Value::Object(tended));
            ToolOutcome::ok(reply).with_state_update(patch)
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use dwell::context::BudgetTracker;
    use dwell::rooms::RoomRegistry;

    #[test]
    fn first_visit_has_an_atmosphere_later_ones_do_not() {
        let mut rooms = RoomRegistry::new().with_room(garden());
        assert!(rooms.enter(GARDEN).is_some());
        assert!(rooms.enter(GARDEN).is_none());
        assert_eq!(rooms.room_state(GARDEN).unwrap()["visits"], 2);
    }

    #[tokio::test]
    async fn tending_records_the_day() {
        let mut rooms = RoomRegistry::new().with_room(garden());
        let budget = BudgetTracker::default().state();

        let mut replies = Vec::new();
        for _ in 0..2 {
            let outcome = {
                let ctx = ToolContext {
                    agent_id: "resident",
                    session_id: None,
                    session_number: 3,
                    current_room: GARDEN,
                    turn: 1,
                    budget: &budget,
                    rooms: &rooms,
                };
                let tool = rooms.tool(GARDEN, TEND_PLANTS).unwrap();
                tool.execute(json!({"plant": "mint"}), &ctx).await
            };
            rooms.update_room_state(GARDEN, outcome.state_update.unwrap());
            replies.push(outcome.output);
        }

        assert_eq!(replies[0], "You water the mint for the first time.");
        assert!(replies[1].contains("already soaked"));
        assert_eq!(rooms.room_state(GARDEN).unwrap()["last_tended"]["mint"], 3);
    }
}

//! Where the resident wakes and where the day ends.

use chrono::{Local, Timelike};
use dwell::rooms::Room;
use dwell::tools::{Command, FnTool, ToolContext, ToolOutcome};
use dwell::{ToolDef, json_schema_for};
use schemars::JsonSchema;
use serde::Deserialize;

use super::{BEDROOM, HALLWAY};

pub const GO_TO_SLEEP: &str = "go_to_sleep";

/// Arguments for [`GO_TO_SLEEP`].
#[derive(Deserialize, JsonSchema)]
pub struct SleepArgs {
    /// A last thought before drifting off.
    #[serde(default)]
    pub thought: Option<String>,
}

pub fn bedroom() -> Room {
    Room::new(BEDROOM, "Bedroom")
        .with_dynamic_description(|| describe_at(Local::now().hour()))
        .with_tool(go_to_sleep())
        .with_transitions([HALLWAY])
}

fn go_to_sleep() -> FnTool {
    FnTool::new(
        ToolDef::new(
            GO_TO_SLEEP,
            "Lie down and end the day. Do this when you have done what you wanted to do.",
            json_schema_for::<SleepArgs>(),
        ),
        |args: SleepArgs, ctx: &ToolContext<'_>| {
            let day = ctx.session_number;
            let text = match args.thought.as_deref().map(str::trim) {
                Some(thought) if !thought.is_empty() => {
                    format!("You lie down thinking: \"{thought}\". Day {day} is over.")
                }
                _ => format!("You lie down and close your eyes. Day {day} is over."),
            };
            ToolOutcome::ok(text).with_command(Command::Sleep)
        },
    )
}

fn describe_at(hour: u32) -> String {
    let light = match hour {
        5..=10 => "Morning light comes through the curtains.",
        11..=16 => "The room is bright and warm.",
        17..=20 => "Evening light slants across the floor.",
        _ => "It is dark apart from the small lamp by the bed.",
    };
    format!("A narrow bed, a lamp, a window onto the garden. {light}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn description_follows_the_clock() {
        assert!(describe_at(7).contains("Morning"));
        assert!(describe_at(13).contains("bright"));
        assert!(describe_at(19).contains("Evening"));
        assert!(describe_at(2).contains("dark"));
    }

    #[test]
    fn bedroom_only_leads_to_the_hallway() {
        let room = bedroom();
        assert!(room.transitions().allows(HALLWAY));
        assert!(!room.transitions().allows("garden"));
        assert_eq!(room.tools().len(), 1);
    }
}

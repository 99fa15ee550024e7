//! A desk and a corkboard. Notes pinned here survive between days.

use dwell::rooms::{Room, RoomState};
use dwell::tools::{FnTool, ToolContext, ToolOutcome};
use dwell::{ToolDef, json_schema_for};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use super::{HALLWAY, STUDY};

pub const WRITE_NOTE: &str = "write_note";
pub const READ_NOTES: &str = "read_notes";

/// Most notes the corkboard holds; the oldest fall off.
pub const MAX_NOTES: usize = 20;

/// Persistent state of the study.
#[derive(Serialize, Deserialize, JsonSchema, Default)]
pub struct StudyState {
    #[serde(default)]
    pub notes: Vec<Note>,
}

#[derive(Serialize, Deserialize, JsonSchema, Clone)]
pub struct Note {
    pub day: u32,
    pub text: String,
}

#[derive(Deserialize, JsonSchema)]
pub struct WriteNoteArgs {
    /// What to write. Keep it short; it goes on an index card.
    pub text: String,
}

#[derive(Deserialize, JsonSchema)]
pub struct ReadNotesArgs {}

pub fn study() -> Room {
    Room::new(STUDY, "Study")
        .with_description(
            "A desk under the window, a chair, and a corkboard covered in index cards.",
        )
        .with_state::<StudyState>()
        .with_tool(write_note())
        .with_tool(read_notes())
        .with_transitions([HALLWAY])
        .on_enter(|state| {
            let count = state.map_or(0, |s| notes_in(s).len());
            Some(match count {
                0 => "The corkboard is bare.".to_string(),
                1 => "One card is pinned to the corkboard.".to_string(),
                n => format!("{n} cards are pinned to the corkboard."),
            })
        })
}

fn notes_in(state: &RoomState) -> Vec<Note> {
    state
        .get("notes")
        .cloned()
        .and_then(|v| serde_json::from_value(v).ok())
        .unwrap_or_default()
}

fn write_note() -> FnTool {
    FnTool::new(
        ToolDef::new(
            WRITE_NOTE,
            "Pin a note to the corkboard. Notes stay up between days.",
            json_schema_for::<WriteNoteArgs>(),
        ),
        |args: WriteNoteArgs, ctx: &ToolContext<'_>| {
            let text = args.text.trim();
            if text.is_empty() {
                return ToolOutcome::failure("The card is blank. Write something first.");
            }
            let mut notes = ctx.room_state().map(notes_in).unwrap_or_default();
            notes.push(Note {
                day: ctx.session_number,
                text: text.to_string(),
            });
            let dropped = notes.len().saturating_sub(MAX_NOTES);
            notes.drain(..dropped);

            let mut patch = RoomState::new();
            patch.insert("notes".into(), json!(notes));
            let mut reply = format!("You pin the card up. There are {} now.", notes.len());
            if dropped > 0 {
                reply.push_str(" The oldest card falls behind the desk.");
            }
            ToolOutcome::ok(reply).with_state_update(patch)
        },
    )
}

fn read_notes() -> FnTool {
    FnTool::new(
        ToolDef::new(
            READ_NOTES,
            "Read the notes pinned to the corkboard.",
            json_schema_for::<ReadNotesArgs>(),
        ),
        |_args: Value, ctx: &ToolContext<'_>| {
            let notes = ctx.room_state().map(notes_in).unwrap_or_default();
            if notes.is_empty() {
                return ToolOutcome::ok("The corkboard is empty.");
            }
            let lines: Vec<String> = notes
                .iter()
                .map(|n| format!("- (day {}) {}", n.day, n.text))
                .collect();
            ToolOutcome::ok(lines.join("\n"))
        },
    )
}

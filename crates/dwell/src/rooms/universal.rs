//! Tools offered in every room.

use crate::tools::names::{CHECK_BUDGET, MOVE_TO};
use crate::tools::{Command, Tool, ToolContext, ToolFuture, ToolOutcome};
use crate::{ToolDef, json_schema_for};
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::Value;

/// Arguments for [`MoveTo`].
#[derive(Deserialize, JsonSchema)]
pub struct MoveToArgs {
    /// Id of the room to go to.
    pub room: String,
}

/// Asks the turn loop to move the agent at the end of this turn.
///
/// The tool only validates and emits [`Command::MoveTo`]; the room pointer
/// changes after every tool in the turn has run.
pub struct MoveTo;

impl MoveTo {
    fn decide(args: MoveToArgs, ctx: &ToolContext<'_>) -> ToolOutcome {
        let rooms = ctx.rooms;
        let target = args.room.trim();
        let here = rooms.display_name(ctx.current_room);

        let Some(room) = rooms.get(target) else {
            return ToolOutcome::failure(format!(
                "There is no room called '{target}'. Rooms in the house: {}.",
                rooms.room_ids().join(", ")
            ));
        };
        if target == ctx.current_room {
            return ToolOutcome::failure(format!("You are already in the {here}."));
        }
        if !rooms.can_transition(ctx.current_room, target) {
            let reachable = rooms.reachable_from(ctx.current_room);
            let options = if reachable.is_empty() {
                "nowhere".to_string()
            } else {
                reachable.join(", ")
            };
            return ToolOutcome::failure(format!(
                "You can't get to the {} from the {here}. From here you can reach: {options}.",
                room.name()
            ));
        }

        ToolOutcome::ok(format!("You head for the {}.", room.name()))
            .with_command(Command::MoveTo(target.to_string()))
    }
}

impl Tool for MoveTo {
    fn definition(&self) -> ToolDef {
        ToolDef::new(
            MOVE_TO,
            "Walk to another room. You arrive once you finish what you are doing this turn.",
            json_schema_for::<MoveToArgs>(),
        )
    }

    fn name(&self) -> &str {
        MOVE_TO
    }

    fn execute<'a>(&'a self, args: Value, ctx: &'a ToolContext<'a>) -> ToolFuture<'a> {
        let outcome = match serde_json::from_value::<MoveToArgs>(args) {
            Ok(args) => Self::decide(args, ctx),
            Err(e) => ToolOutcome::failure(format!("invalid tool arguments: {e}")),
        };
        Box::pin(std::future::ready(outcome))
    }
}

/// Reports how much of the session's token budget is left.
pub struct CheckBudget;

impl Tool for CheckBudget {
    fn definition(&self) -> ToolDef {
        ToolDef::new(
            CHECK_BUDGET,
            "Check how much energy (token budget) you have left today.",
            serde_json::json!({"type": "object", "properties": {}}),
        )
    }

    fn name(&self) -> &str {
        CHECK_BUDGET
    }

    fn execute<'a>(&'a self, _args: Value, ctx: &'a ToolContext<'a>) -> ToolFuture<'a> {
        let b = ctx.budget;
        let mut text = format!(
            "Spent {} of {} tokens ({:.1}% used). {} remaining.",
            b.spent,
            b.total,
            b.used_pct(),
            b.remaining.max(0),
        );
        if b.remaining <= i64::try_from(b.warning_threshold).unwrap_or(i64::MAX) {
            text.push_str(" You are running low; consider wrapping up.");
        }
        Box::pin(std::future::ready(ToolOutcome::ok(text)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::budget::{BudgetState, BudgetTracker};
    use crate::rooms::{Room, RoomRegistry};
    use serde_json::json;

    fn house() -> RoomRegistry {
        RoomRegistry::new()
            .with_room(Room::new("bedroom", "Bedroom").with_transitions(["hallway"]))
            .with_room(Room::new("hallway", "Hallway"))
            .with_room(Room::new("garden", "Garden"))
    }

    fn ctx<'a>(rooms: &'a RoomRegistry, budget: &'a BudgetState, room: &'a str) -> ToolContext<'a> {
        ToolContext {
            agent_id: "resident",
            session_id: Some("s-1"),
            session_number: 1,
            current_room: room,
            turn: 1,
            budget,
            rooms,
        }
    }

    #[tokio::test]
    async fn move_emits_command_without_moving() {
        let rooms = house();
        let budget = BudgetTracker::new(1000, 100).state();
        let ctx = ctx(&rooms, &budget, "bedroom");

        let outcome = MoveTo.execute(json!({"room": "hallway"}), &ctx).await;

        assert!(outcome.success);
        assert_eq!(outcome.commands, vec![Command::MoveTo("hallway".into())]);
        assert!(outcome.state_update.is_none());
    }

    #[tokio::test]
    async fn move_rejects_unknown_room() {
        let rooms = house();
        let budget = BudgetTracker::new(1000, 100).state();
        let ctx = ctx(&rooms, &budget, "hallway");

        let outcome = MoveTo.execute(json!({"room": "attic"}), &ctx).await;

        assert!(!outcome.success);
        assert!(outcome.commands.is_empty());
        assert!(outcome.output.contains("no room called 'attic'"));
    }

    #[tokio::test]
    async fn move_rejects_current_room() {
        let rooms = house();
        let budget = BudgetTracker::new(1000, 100).state();
        let ctx = ctx(&rooms, &budget, "hallway");

        let outcome = MoveTo.execute(json!({"room": "hallway"}), &ctx).await;

        assert!(!outcome.success);
        assert!(outcome.commands.is_empty());
        assert_eq!(outcome.output, "You are already in the Hallway.");
    }

    #[tokio::test]
    async fn move_rejects_forbidden_transition() {
        let rooms = house();
        let budget = BudgetTracker::new(1000, 100).state();
        let ctx = ctx(&rooms, &budget, "bedroom");

        let outcome = MoveTo.execute(json!({"room": "garden"}), &ctx).await;

        assert!(!outcome.success);
        assert!(outcome.commands.is_empty());
        assert_eq!(
            outcome.to_content(),
            "Error: You can't get to the Garden from the Bedroom. From here you can reach: hallway."
        );
    }

    #[tokio::test]
    async fn check_budget_reports_spend() {
        let rooms = house();
        let mut tracker = BudgetTracker::new(1000, 100);
        tracker.record_usage(200, 50, None);
        let budget = tracker.state();
        let ctx = ctx(&rooms, &budget, "garden");

        let outcome = CheckBudget.execute(json!({}), &ctx).await;

        assert!(outcome.success);
        assert_eq!(outcome.output, "Spent 250 of 1000 tokens (25.0% used). 750 remaining.");
    }

    #[tokio::test]
    async fn check_budget_mentions_low_budget() {
        let rooms = house();
        let mut tracker = BudgetTracker::new(1000, 100);
        tracker.record_usage(950, 0, None);
        let budget = tracker.state();
        let ctx = ctx(&rooms, &budget, "garden");

        let outcome = CheckBudget.execute(json!({}), &ctx).await;
        assert!(outcome.output.contains("running low"));
    }
}

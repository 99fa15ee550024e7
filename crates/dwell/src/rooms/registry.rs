//! The room registry: one per agent.
//!
//! Holds room definitions, per-room state, the universal tools, and an
//! optional [`RoomDecorator`]. State lives as long as the registry, so it
//! carries over from one session to the next.

use super::room::{Room, RoomState};
use super::universal::{CheckBudget, MoveTo};
use crate::ToolDef;
use crate::tools::Tool;
use std::collections::HashMap;
use tracing::{debug, warn};

/// Supplies live room descriptions that take precedence over a room's own.
///
/// Typical use is mentioning things the room itself doesn't know about,
/// such as unread letters on the hall table.
pub trait RoomDecorator: Send + Sync {
    /// A replacement description, or `None` to use the room's own.
    fn decorated_description(&self, room_id: &str) -> Option<String>;
}

/// Room definitions, per-room state, and tool lookup.
pub struct RoomRegistry {
    rooms: HashMap<String, Room>,
    /// Registration order, for stable listings.
    order: Vec<String>,
    states: HashMap<String, RoomState>,
    universal: Vec<Box<dyn Tool>>,
    decorator: Option<Box<dyn RoomDecorator>>,
}

impl Default for RoomRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl RoomRegistry {
    /// An empty registry with the universal tools installed.
    pub fn new() -> Self {
        Self {
            rooms: HashMap::new(),
            order: Vec::new(),
            states: HashMap::new(),
            universal: vec![Box::new(MoveTo), Box::new(CheckBudget)],
            decorator: None,
        }
    }

    /// Register a room (builder form of [`register`](Self::register)).
    pub fn with_room(mut self, room: Room) -> Self {
        self.register(room);
        self
    }

    pub fn with_decorator(mut self, decorator: impl RoomDecorator + 'static) -> Self {
        self.set_decorator(decorator);
        self
    }

    pub fn set_decorator(&mut self, decorator: impl RoomDecorator + 'static) {
        self.decorator = Some(Box::new(decorator));
    }

    /// Add a room. State is initialized to `{}` iff the room declares a
    /// schema. Registering an existing id replaces the definition and keeps
    /// its state.
    pub fn register(&mut self, room: Room) {
        let id = room.id.clone();
        if room.has_state() {
            self.states.entry(id.clone()).or_default();
        } else if self.states.remove(&id).is_some() {
            debug!("Room {id} re-registered without a state schema; state dropped");
        }
        if self.rooms.insert(id.clone(), room).is_some() {
            debug!("Room {id} re-registered");
        } else {
            self.order.push(id);
        }
    }

    pub fn get(&self, id: &str) -> Option<&Room> {
        self.rooms.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.rooms.contains_key(id)
    }

    /// Room ids in registration order.
    pub fn room_ids(&self) -> Vec<&str> {
        self.order.iter().map(String::as_str).collect()
    }

    pub fn len(&self) -> usize {
        self.rooms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rooms.is_empty()
    }

    /// Whether the agent may move from `from` to `to`. Unknown rooms on
    /// either side never allow a transition.
    pub fn can_transition(&self, from: &str, to: &str) -> bool {
        match (self.rooms.get(from), self.rooms.contains_key(to)) {
            (Some(room), true) => room.transitions.allows(to),
            _ => false,
        }
    }

    /// Rooms reachable from `from`, in registration order.
    pub fn reachable_from(&self, from: &str) -> Vec<&str> {
        self.order
            .iter()
            .map(String::as_str)
            .filter(|to| *to != from && self.can_transition(from, to))
            .collect()
    }

    /// State of a room, `None` for unknown or stateless rooms.
    pub fn room_state(&self, id: &str) -> Option<&RoomState> {
        self.states.get(id)
    }

    /// Shallow-merge `patch` into a room's state. Top-level keys in the
    /// patch overwrite; everything else is kept.
    pub fn update_room_state(&mut self, id: &str, patch: RoomState) {
        match self.states.get_mut(id) {
            Some(state) => {
                debug!("Room {id} state update: {} key(s)", patch.len());
                state.extend(patch);
            }
            None => warn!("Ignoring state update for room {id}: it keeps no state"),
        }
    }

    /// Tool definitions offered in a room: the room's own tools first, then
    /// the universal ones.
    pub fn tool_definitions(&self, id: &str) -> Vec<ToolDef> {
        self.rooms
            .get(id)
            .map(|room| room.tools.as_slice())
            .unwrap_or_default()
            .iter()
            .chain(self.universal.iter())
            .map(|t| t.definition())
            .collect()
    }

    /// Names of the tools available in a room, in definition order.
    pub fn tool_names(&self, id: &str) -> Vec<&str> {
        self.rooms
            .get(id)
            .map(|room| room.tools.as_slice())
            .unwrap_or_default()
            .iter()
            .chain(self.universal.iter())
            .map(|t| t.name())
            .collect()
    }

    /// Look up a tool available in a room. Room tools shadow universal ones.
    pub fn tool(&self, room_id: &str, name: &str) -> Option<&dyn Tool> {
        self.rooms
            .get(room_id)
            .map(|room| room.tools.as_slice())
            .unwrap_or_default()
            .iter()
            .chain(self.universal.iter())
            .find(|t| t.name() == name)
            .map(|t| t.as_ref())
    }

    /// Run a room's enter hook, returning its atmosphere text.
    pub fn enter(&mut self, id: &str) -> Option<String> {
        let hook = self.rooms.get(id)?.on_enter.as_ref()?;
        hook(self.states.get_mut(id))
    }

    /// Run a room's exit hook.
    pub fn exit(&mut self, id: &str) {
        if let Some(hook) = self.rooms.get(id).and_then(|r| r.on_exit.as_ref()) {
            hook(self.states.get_mut(id));
        }
    }

    /// Current description: the decorator's if it has one, otherwise the
    /// room's own. `None` for unknown rooms.
    pub fn describe(&self, id: &str) -> Option<String> {
        let room = self.rooms.get(id)?;
        self.decorator
            .as_ref()
            .and_then(|d| d.decorated_description(id))
            .or_else(|| Some(room.description()))
    }

    /// Display name of a room, falling back to its id.
    pub fn display_name<'a>(&'a self, id: &'a str) -> &'a str {
        self.rooms.get(id).map_or(id, |r| r.name.as_str())
    }
}

impl std::fmt::Debug for RoomRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RoomRegistry")
            .field("rooms", &self.order)
            .field("states", &self.states)
            .field("decorated", &self.decorator.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::names::{CHECK_BUDGET, MOVE_TO};
    use crate::tools::{FnTool, ToolOutcome};
    use serde_json::json;
    use std::sync::{Arc, Mutex};

    fn house() -> RoomRegistry {
        RoomRegistry::new()
            .with_room(
                Room::new("bedroom", "Bedroom")
                    .with_description("Curtains drawn.")
                    .with_transitions(["hallway"]),
            )
            .with_room(Room::new("hallway", "Hallway").with_description("A long corridor."))
            .with_room(
                Room::new("study", "Study")
                    .with_state_schema(json!({"type": "object"}))
                    .with_transitions(["hallway"]),
            )
    }

    fn patch(pairs: &[(&str, serde_json::Value)]) -> RoomState {
        pairs.iter().map(|(k, v)| ((*k).to_string(), v.clone())).collect()
    }

    #[test]
    fn can_transition_follows_allow_lists() {
        let rooms = house();
        assert!(rooms.can_transition("bedroom", "hallway"));
        assert!(!rooms.can_transition("bedroom", "study"));
        assert!(rooms.can_transition("hallway", "bedroom"));
        assert!(rooms.can_transition("hallway", "study"));
    }

    #[test]
    fn can_transition_rejects_unknown_rooms() {
        let rooms = house();
        assert!(!rooms.can_transition("attic", "hallway"));
        assert!(!rooms.can_transition("hallway", "attic"));
    }

    #[test]
    fn reachable_excludes_self_and_forbidden() {
        let rooms = house();
        assert_eq!(rooms.reachable_from("hallway"), vec!["bedroom", "study"]);
        assert_eq!(rooms.reachable_from("bedroom"), vec!["hallway"]);
    }

    #[test]
    fn state_only_for_rooms_with_schema() {
        let rooms = house();
        assert!(rooms.room_state("bedroom").is_none());
        assert_eq!(rooms.room_state("study"), Some(&RoomState::new()));
    }

    #[test]
    fn state_update_is_shallow_merge() {
        let mut rooms = house();
        rooms.update_room_state("study", patch(&[("lamp", json!("on")), ("notes", json!([1]))]));
        rooms.update_room_state("study", patch(&[("notes", json!([1, 2]))]));

        let state = rooms.room_state("study").unwrap();
        assert_eq!(state["lamp"], "on");
        assert_eq!(state["notes"], json!([1, 2]));
    }

    #[test]
    fn state_update_ignored_for_stateless_room() {
        let mut rooms = house();
        rooms.update_room_state("bedroom", patch(&[("x", json!(1))]));
        assert!(rooms.room_state("bedroom").is_none());
    }

    #[test]
    fn reregistering_keeps_state() {
        let mut rooms = house();
        rooms.update_room_state("study", patch(&[("lamp", json!("on"))]));
        rooms.register(
            Room::new("study", "Quiet Study").with_state_schema(json!({"type": "object"})),
        );

        assert_eq!(rooms.len(), 3);
        assert_eq!(rooms.display_name("study"), "Quiet Study");
        assert_eq!(rooms.room_state("study").unwrap()["lamp"], "on");
    }

    #[test]
    fn tool_definitions_put_room_tools_first() {
        let rooms = RoomRegistry::new().with_room(Room::new("garden", "Garden").with_tool(
            FnTool::new(
                ToolDef::new("water", "Water plants.", json!({"type": "object"})),
                |_: serde_json::Value, _| ToolOutcome::ok("splash"),
            ),
        ));

        let names: Vec<String> = rooms
            .tool_definitions("garden")
            .into_iter()
            .map(|d| d.function.name)
            .collect();
        assert_eq!(names, vec!["water", MOVE_TO, CHECK_BUDGET]);
        assert_eq!(rooms.tool_names("garden"), names);

        assert!(rooms.tool("garden", "water").is_some());
        assert_eq!(rooms.tool("garden", MOVE_TO).map(|t| t.name()), Some(MOVE_TO));
        assert!(rooms.tool("bedroom", "water").is_none());
        assert!(rooms.tool("garden", "dig").is_none());
    }

    #[test]
    fn hooks_see_state_only_when_declared() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let enter_log = Arc::clone(&seen);
        let exit_log = Arc::clone(&seen);

        let mut rooms = RoomRegistry::new()
            .with_room(
                Room::new("study", "Study")
                    .with_state_schema(json!({"type": "object"}))
                    .on_enter(move |state| {
                        let state = state?;
                        let visits = state.get("visits").and_then(|v| v.as_u64()).unwrap_or(0) + 1;
                        state.insert("visits".into(), json!(visits));
                        enter_log.lock().unwrap().push(format!("enter:{visits}"));
                        Some(format!("Visit number {visits}."))
                    }),
            )
            .with_room(Room::new("porch", "Porch").on_exit(move |state| {
                exit_log.lock().unwrap().push(format!("exit:{}", state.is_some()));
            }));

        assert_eq!(rooms.enter("study").as_deref(), Some("Visit number 1."));
        assert_eq!(rooms.enter("study").as_deref(), Some("Visit number 2."));
        assert_eq!(rooms.enter("porch"), None);
        rooms.exit("porch");
        rooms.exit("study");

        assert_eq!(*seen.lock().unwrap(), vec!["enter:1", "enter:2", "exit:false"]);
        assert_eq!(rooms.room_state("study").unwrap()["visits"], 2);
    }

    struct Letters;

    impl RoomDecorator for Letters {
        fn decorated_description(&self, room_id: &str) -> Option<String> {
            (room_id == "hallway").then(|| "A long corridor. Two letters wait on the table.".into())
        }
    }

    #[test]
    fn decorator_takes_precedence() {
        let rooms = house().with_decorator(Letters);
        assert_eq!(
            rooms.describe("hallway").as_deref(),
            Some("A long corridor. Two letters wait on the table.")
        );
        assert_eq!(rooms.describe("bedroom").as_deref(), Some("Curtains drawn."));
        assert_eq!(rooms.describe("attic"), None);
    }
}

//! Room definitions.

use crate::json_schema_for;
use crate::tools::Tool;
use schemars::JsonSchema;
use serde_json::Value;
use std::fmt;

/// Per-room key/value state. Updates are shallow merges.
pub type RoomState = serde_json::Map<String, Value>;

/// Runs after the agent arrives. A returned string is shown to the model
/// as atmosphere alongside the room description.
pub type EnterHook = Box<dyn Fn(Option<&mut RoomState>) -> Option<String> + Send + Sync>;

/// Runs before the agent leaves.
pub type ExitHook = Box<dyn Fn(Option<&mut RoomState>) + Send + Sync>;

/// How a room describes itself.
pub enum RoomDescription {
    Static(String),
    /// Recomputed on every read, e.g. to mention the time of day.
    Dynamic(Box<dyn Fn() -> String + Send + Sync>),
}

impl RoomDescription {
    pub fn render(&self) -> String {
        match self {
            RoomDescription::Static(text) => text.clone(),
            RoomDescription::Dynamic(f) => f(),
        }
    }
}

impl fmt::Debug for RoomDescription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RoomDescription::Static(text) => f.debug_tuple("Static").field(text).finish(),
            RoomDescription::Dynamic(_) => f.write_str("Dynamic(..)"),
        }
    }
}

/// Which rooms can be reached from a room. Transitions are one-way: a
/// room listed here need not list this one back.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Transitions {
    #[default]
    Any,
    Only(Vec<String>),
}

impl Transitions {
    pub fn allows(&self, to: &str) -> bool {
        match self {
            Transitions::Any => true,
            Transitions::Only(ids) => ids.iter().any(|id| id == to),
        }
    }
}

/// A place the agent can be, with the tools available there.
///
/// ```ignore
/// let study = Room::new("study", "Study")
///     .with_description("A desk under the window, a shelf of notebooks.")
///     .with_transitions(["hallway"])
///     .with_state_schema(json!({"type": "object"}))
///     .with_tool(WriteNote)
///     .on_enter(|state| {
///         let notes = state?.get("notes")?.as_array()?.len();
///         Some(format!("{notes} notes are stacked on the desk."))
///     });
/// ```
pub struct Room {
    pub(crate) id: String,
    pub(crate) name: String,
    pub(crate) description: RoomDescription,
    pub(crate) tools: Vec<Box<dyn Tool>>,
    pub(crate) transitions: Transitions,
    pub(crate) state_schema: Option<Value>,
    pub(crate) on_enter: Option<EnterHook>,
    pub(crate) on_exit: Option<ExitHook>,
}

impl Room {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: RoomDescription::Static(String::new()),
            tools: Vec::new(),
            transitions: Transitions::Any,
            state_schema: None,
            on_enter: None,
            on_exit: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = RoomDescription::Static(description.into());
        self
    }

    pub fn with_dynamic_description<F>(mut self, describe: F) -> Self
    where
        F: Fn() -> String + Send + Sync + 'static,
    {
        self.description = RoomDescription::Dynamic(Box::new(describe));
        self
    }

    pub fn with_tool(mut self, tool: impl Tool + 'static) -> Self {
        self.tools.push(Box::new(tool));
        self
    }

    /// Restrict exits to the listed room ids.
    pub fn with_transitions<I, S>(mut self, to: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.transitions = Transitions::Only(to.into_iter().map(Into::into).collect());
        self
    }

    /// Declare that the room keeps state. Rooms without a schema have none.
    pub fn with_state_schema(mut self, schema: Value) -> Self {
        self.state_schema = Some(schema);
        self
    }

    /// Declare room state shaped like `T`.
    pub fn with_state<T: JsonSchema>(self) -> Self {
        self.with_state_schema(json_schema_for::<T>())
    }

    pub fn on_enter<F>(mut self, hook: F) -> Self
    where
        F: Fn(Option<&mut RoomState>) -> Option<String> + Send + Sync + 'static,
    {
        self.on_enter = Some(Box::new(hook));
        self
    }

    pub fn on_exit<F>(mut self, hook: F) -> Self
    where
        F: Fn(Option<&mut RoomState>) + Send + Sync + 'static,
    {
        self.on_exit = Some(Box::new(hook));
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The room's own description, without decoration.
    pub fn description(&self) -> String {
        self.description.render()
    }

    pub fn tools(&self) -> &[Box<dyn Tool>] {
        &self.tools
    }

    pub fn transitions(&self) -> &Transitions {
        &self.transitions
    }

    pub fn state_schema(&self) -> Option<&Value> {
        self.state_schema.as_ref()
    }

    pub fn has_state(&self) -> bool {
        self.state_schema.is_some()
    }
}

impl fmt::Debug for Room {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Room")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("tools", &self.tools.iter().map(|t| t.name()).collect::<Vec<_>>())
            .field("transitions", &self.transitions)
            .field("has_state", &self.has_state())
            .finish()
    }
}

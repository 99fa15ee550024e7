//! Rooms and the transition state machine.
//!
//! A [`Room`] bundles a description, the tools available there, the rooms
//! reachable from it, optional state, and enter/exit hooks. The
//! [`RoomRegistry`] owns all rooms for one agent and answers the questions
//! the turn loop asks: which tools are offered here, may the agent move
//! there, what does the room look like right now.
//!
//! Moving is a two-step protocol. The universal `move_to` tool validates
//! the request and returns [`Command::MoveTo`](crate::tools::Command); the
//! turn loop re-checks the transition after all tools have run, then calls
//! [`RoomRegistry::exit`], switches rooms, and calls [`RoomRegistry::enter`].

pub mod registry;
pub mod room;
pub mod universal;

pub use registry::{RoomDecorator, RoomRegistry};
pub use room::{EnterHook, ExitHook, Room, RoomDescription, RoomState, Transitions};
pub use universal::{CheckBudget, MoveTo};

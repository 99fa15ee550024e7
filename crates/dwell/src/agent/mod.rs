//! Agent runtime: the session turn loop and what surrounds it.
//!
//! - [`runner::SessionRunner`]: one session from wake to sleep. Start here.
//! - [`host::AgentHost`]: owns an agent's collaborators and refuses a second
//!   wake while a session is in flight.
//! - [`config::SessionConfig`]: model, budget, start room, and the optional
//!   modules (compaction settings, decay, end-of-session summary).
//! - [`events`]: [`EventHandler`] and [`SessionEvent`] for observing the loop.
//! - [`notify`]: wake message, end-of-turn notifications, the optional
//!   [`Inbox`].

pub mod config;
pub mod events;
pub mod host;
pub mod notify;
pub mod runner;

pub use config::{SessionConfig, SessionSummaryConfig, Toggle};
pub use events::{
    CompositeEventHandler, EventHandler, FnEventHandler, LoggingHandler, NoopHandler,
    SessionEvent,
};
pub use host::AgentHost;
pub use notify::{Inbox, InboxFuture, Notification};
pub use runner::{SessionOutcome, SessionRunner, Signals};

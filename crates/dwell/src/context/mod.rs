//! Context management: the token budget and the transcript it pays for.
//!
//! Four cooperating pieces, all driven by the
//! [`SessionRunner`](crate::agent::runner::SessionRunner):
//!
//! 1. **[`budget`]**: [`BudgetTracker`] accounts for token spend and decides
//!    when the session is over or running low.
//! 2. **[`decay`]**: replaces old, large tool results with one-line stubs.
//!    Synchronous and free; runs at the end of every turn.
//! 3. **[`compaction`]**: asks the model to summarize older turns once the
//!    input size nears the context window.
//! 4. **[`sequence`]**: maps transcript positions to durable sequence
//!    numbers so compactions can be recorded against the store.

pub mod budget;
pub mod compaction;
pub mod decay;
pub mod sequence;

pub use budget::{BudgetState, BudgetTracker};
pub use compaction::{CompactionConfig, CompactionEngine, CompactionResult};
pub use decay::{DecayConfig, DecayMeta, DecayReport, decay};
pub use sequence::{SeqRange, SequenceMap};

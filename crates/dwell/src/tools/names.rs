//! Canonical names of the tools every room offers.
//!
//! Room tool names are owned by the rooms that define them; only the
//! universal tools are referenced from the core.

pub const MOVE_TO: &str = "move_to";
pub const CHECK_BUDGET: &str = "check_budget";

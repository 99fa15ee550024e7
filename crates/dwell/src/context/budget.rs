//! Session token budget: how long the agent may keep talking before it is
//! put to bed.
//!
//! The tracker is pure accounting. The turn loop records each model call's
//! usage, stops when [`BudgetTracker::is_exhausted`] turns true, and asks
//! [`BudgetTracker::should_warn`] once per turn whether to tell the model
//! it is running low. The warning is edge-triggered: it fires on the first
//! check at or below the threshold and never again in the same session.

use serde::{Deserialize, Serialize};

/// Default session allowance in tokens (input + output).
pub const DEFAULT_TOTAL_TOKENS: u64 = 500_000;

/// Default remaining-token level at which the agent is warned.
pub const DEFAULT_WARNING_THRESHOLD: u64 = 50_000;

/// Point-in-time view of a [`BudgetTracker`].
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct BudgetState {
    pub total: u64,
    pub spent: u64,
    /// `total - spent`. Negative once the last call overshot the allowance.
    pub remaining: i64,
    pub warning_threshold: u64,
    pub warning_issued: bool,
    /// Cumulative USD cost, when the client reports or estimates one.
    pub total_cost: f64,
}

impl BudgetState {
    /// Percentage of the allowance spent, clamped to `0..=100`.
    pub fn used_pct(&self) -> f64 {
        if self.total == 0 {
            return 100.0;
        }
        ((self.spent as f64 / self.total as f64) * 100.0).min(100.0)
    }

    /// One-line rendering for logs and the budget-check tool.
    pub fn to_log_string(&self) -> String {
        format!(
            "Budget: {}/{} tokens ({:.1}%), {} remaining, ${:.4}",
            self.spent,
            self.total,
            self.used_pct(),
            self.remaining.max(0),
            self.total_cost,
        )
    }
}

/// Token budget for a single session.
///
/// # Example
///
/// ```
/// use dwell::context::budget::BudgetTracker;
///
/// let mut budget = BudgetTracker::new(1000, 200);
/// budget.record_usage(800, 0, None);
/// assert_eq!(budget.remaining(), 200);
/// assert!(budget.should_warn());
/// assert!(!budget.should_warn());
/// assert!(budget.is_low());
/// ```
#[derive(Debug, Clone)]
pub struct BudgetTracker {
    total: u64,
    spent: u64,
    warning_threshold: u64,
    warning_issued: bool,
    total_cost: f64,
    warning_message: Option<String>,
}

impl Default for BudgetTracker {
    fn default() -> Self {
        Self::new(DEFAULT_TOTAL_TOKENS, DEFAULT_WARNING_THRESHOLD)
    }
}

impl BudgetTracker {
    pub fn new(total: u64, warning_threshold: u64) -> Self {
        Self {
            total,
            spent: 0,
            warning_threshold,
            warning_issued: false,
            total_cost: 0.0,
            warning_message: None,
        }
    }

    /// Replace the default low-budget notice shown to the model.
    pub fn with_warning_message(mut self, msg: impl Into<String>) -> Self {
        self.warning_message = Some(msg.into());
        self
    }

    /// Add one model call's usage. No validation: zero counts are no-ops
    /// and spend past the allowance is recorded as-is.
    pub fn record_usage(&mut self, input_tokens: u64, output_tokens: u64, cost: Option<f64>) {
        self.spent = self
            .spent
            .saturating_add(input_tokens)
            .saturating_add(output_tokens);
        if let Some(cost) = cost {
            self.total_cost += cost;
        }
    }

    pub fn total(&self) -> u64 {
        self.total
    }

    pub fn spent(&self) -> u64 {
        self.spent
    }

    /// Tokens left, negative once a call overshoots the allowance.
    /// Clamped to the `i64` range.
    pub fn remaining(&self) -> i64 {
        if self.spent <= self.total {
            i64::try_from(self.total - self.spent).unwrap_or(i64::MAX)
        } else {
            i64::try_from(self.spent - self.total).map_or(i64::MIN, |over| -over)
        }
    }

    pub fn total_cost(&self) -> f64 {
        self.total_cost
    }

    pub fn warning_issued(&self) -> bool {
        self.warning_issued
    }

    /// Share of the allowance spent, `0.0..=1.0`. A zero budget counts as
    /// fully used.
    pub fn used_fraction(&self) -> f64 {
        if self.total == 0 {
            return 1.0;
        }
        (self.spent as f64 / self.total as f64).min(1.0)
    }

    pub fn is_exhausted(&self) -> bool {
        self.spent >= self.total
    }

    /// Edge-triggered low-budget check. True on the first call where
    /// `remaining <= warning_threshold`, false on every call after that.
    pub fn should_warn(&mut self) -> bool {
        if self.warning_issued || !self.is_low() {
            return false;
        }
        self.warning_issued = true;
        true
    }

    /// Level-triggered low-budget check, safe to call repeatedly.
    pub fn is_low(&self) -> bool {
        self.total.saturating_sub(self.spent) <= self.warning_threshold
    }

    pub fn state(&self) -> BudgetState {
        BudgetState {
            total: self.total,
            spent: self.spent,
            remaining: self.remaining(),
            warning_threshold: self.warning_threshold,
            warning_issued: self.warning_issued,
            total_cost: self.total_cost,
        }
    }

    /// Notice appended to the turn's notification when [`should_warn`](Self::should_warn) fires.
    pub fn warning_notice(&self) -> String {
        let remaining = self.remaining().max(0);
        match self.warning_message {
            Some(ref msg) => format!("[Budget notice: {remaining} tokens left] {msg}"),
            None => format!(
                "[Budget notice: {remaining} of {} tokens left. The day is winding down; \
                 finish what you are doing and head to bed soon.]",
                self.total
            ),
        }
    }
}

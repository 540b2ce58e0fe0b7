//! In-process event bus for platform notifications.
//!
//! Generation and ledger activity publishes [`PlatformEvent`]s here so
//! dependent surfaces (credits badge, gallery refresh) can react without
//! the pipeline knowing about them.

pub mod bus;

pub use bus::{EventBus, PlatformEvent};

/// A user's balance changed (debit, refund, or purchase credit).
pub const EVENT_CREDITS_CHANGED: &str = "credits.changed";
/// One generation job reached a terminal state.
pub const EVENT_GENERATION_COMPLETED: &str = "generation.completed";
/// Every item of a batch reached a terminal state.
pub const EVENT_BATCH_FINISHED: &str = "batch.finished";

//! Local reminder reconciliation.
//!
//! Keeps the device's recurring daily notifications pointed at the current
//! incomplete day of the active plan.
//!
//! - [`TriggerScheduler`]: capability over the platform notification API
//! - [`ReminderStore`]: persisted schedules and the active selection
//! - [`Reconciler`]: enable / disable / advance state machine
//! - [`SelectionCoordinator`]: at most one plan with live reminders
//! - [`ReminderEngine`]: the calls the UI makes

pub mod content;
pub mod engine;
pub mod ledger;
pub mod locks;
pub mod memory;
pub mod reconciler;
pub mod scheduler;
pub mod selection;
pub mod store;

pub use engine::{ReminderEngine, ReminderStatus};
pub use ledger::LocalTriggerLedger;
pub use memory::{MemoryScheduler, SchedulerCall};
pub use reconciler::{Advance, Reconciler};
pub use scheduler::{SchedulerError, TimeOfDay, TriggerId, TriggerRequest, TriggerScheduler};
pub use selection::{SelectionChange, SelectionCoordinator};
pub use store::{MemoryReminderStore, ReminderSchedule, ReminderStore, SqliteReminderStore};

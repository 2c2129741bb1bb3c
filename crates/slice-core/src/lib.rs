//! # Slice Core Library
//!
//! Core logic behind the Slice plan app's local reminders. A plan is a
//! multi-day goal served by a remote plan service; this library keeps the
//! device's recurring daily notifications in step with the plan's current
//! incomplete day across creation, day completion, plan switching and
//! deletion, and across restarts.
//!
//! ## Architecture
//!
//! - **Plan**: read-only plan model and the HTTP plan service client
//! - **Reminders**: scheduler capability, schedule store, reconciler and
//!   selection coordinator, fronted by [`ReminderEngine`]
//! - **Storage**: SQLite key-value state and TOML configuration
//!
//! ## Key Components
//!
//! - [`ReminderEngine`]: the calls the UI makes after plan service updates
//! - [`TriggerScheduler`]: trait implemented per notification platform
//! - [`Database`]: local persistence
//! - [`Config`]: application configuration

pub mod error;
pub mod events;
pub mod plan;
pub mod reminders;
pub mod storage;

pub use error::{ConfigError, CoreError, DatabaseError, PlanError, ReminderError};
pub use events::ReminderEvent;
pub use plan::{HttpPlanClient, MemoryPlanSource, Plan, PlanDay, PlanSource, PlanStep, PlanSummary};
pub use reminders::{
    LocalTriggerLedger, MemoryReminderStore, MemoryScheduler, ReminderEngine, ReminderSchedule,
    ReminderStatus, ReminderStore, SqliteReminderStore, TimeOfDay, TriggerId, TriggerRequest,
    TriggerScheduler,
};
pub use storage::{Config, Database, PlanServiceConfig, RemindersConfig};

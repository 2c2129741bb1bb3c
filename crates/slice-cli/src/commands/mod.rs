pub mod auth;
pub mod config;
pub mod plan;
pub mod reminders;

use std::error::Error;
use std::sync::Arc;

use slice_core::plan::credentials;
use slice_core::{
    Config, Database, HttpPlanClient, LocalTriggerLedger, ReminderEngine, ReminderEvent,
    SqliteReminderStore,
};
use tracing::warn;

pub type CliResult = Result<(), Box<dyn Error>>;

/// Everything a command needs, wired against the local database and the
/// configured plan service.
pub struct Context {
    pub client: Arc<HttpPlanClient>,
    pub ledger: Arc<LocalTriggerLedger>,
    pub engine: ReminderEngine,
}

impl Context {
    pub fn open() -> Result<Self, Box<dyn Error>> {
        let config = Config::load()?;
        let db = Arc::new(Database::open()?);

        // Commands that never reach the service must work without a keyring.
        let user_id = credentials::user_id().unwrap_or_else(|e| {
            warn!("could not read user id: {e}");
            None
        });
        let client = Arc::new(HttpPlanClient::new(
            &config.plan_service.api_base,
            config.plan_service.request_timeout(),
            user_id,
        )?);
        let ledger = Arc::new(LocalTriggerLedger::new(
            db.clone(),
            config.reminders.auto_grant_permission,
        ));
        let engine = ReminderEngine::new(
            client.clone(),
            ledger.clone(),
            Arc::new(SqliteReminderStore::new(db)),
            config.reminders,
        );
        Ok(Self {
            client,
            ledger,
            engine,
        })
    }
}

pub fn print_event(event: &ReminderEvent, json: bool) -> CliResult {
    if json {
        println!("{}", serde_json::to_string_pretty(event)?);
        return Ok(());
    }
    match event {
        ReminderEvent::RemindersEnabled {
            plan_id,
            day_number,
            trigger_count,
            ..
        } => println!("{plan_id}: {trigger_count} reminders set for day {day_number}"),
        ReminderEvent::RemindersDisabled {
            plan_id,
            had_reminders,
            ..
        } => {
            if *had_reminders {
                println!("{plan_id}: reminders off");
            } else {
                println!("{plan_id}: no reminders were set");
            }
        }
        ReminderEvent::RemindersAdvanced {
            plan_id,
            from_day,
            to_day,
            ..
        } => println!("{plan_id}: reminders moved from day {from_day} to day {to_day}"),
        ReminderEvent::RemindersUnchanged { plan_id, .. } => {
            println!("{plan_id}: reminders unchanged")
        }
        ReminderEvent::PlanCompleted { plan_id, .. } => {
            println!("{plan_id}: plan complete, reminders off")
        }
        ReminderEvent::PlanSelected {
            plan_id,
            day_number,
            ..
        } => match day_number {
            Some(day) => println!("{plan_id}: active, reminders set for day {day}"),
            None => println!("{plan_id}: active"),
        },
        ReminderEvent::PlanRemoved { plan_id, .. } => {
            println!("{plan_id}: removed, reminders off")
        }
        ReminderEvent::SelectionCleared { plan_id, .. } => {
            println!("{plan_id}: no longer active")
        }
    }
    if let Some(notice) = event.notice() {
        eprintln!("note: {notice}");
    }
    Ok(())
}

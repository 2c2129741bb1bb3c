//! SQLite-backed trigger ledger used by the desktop CLI.
//!
//! Desktop platforms have no portable "repeat daily" notification API, so
//! triggers are only recorded as rows in `local_triggers`; nothing in this
//! crate delivers them. `slice-cli reminders triggers` lists what a
//! platform notifier would fire. The permission decision is persisted like
//! an OS would.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use super::scheduler::{SchedulerError, TriggerId, TriggerRequest, TriggerScheduler};
use crate::storage::database::{Database, TriggerRow};

const PERMISSION_KEY: &str = "slice:notifPermission";

/// Scheduler that records triggers in the local database.
pub struct LocalTriggerLedger {
    db: Arc<Database>,
    auto_grant: bool,
}

impl LocalTriggerLedger {
    /// `auto_grant` answers the first permission prompt when no decision
    /// has been recorded yet.
    pub fn new(db: Arc<Database>, auto_grant: bool) -> Self {
        Self { db, auto_grant }
    }

    /// Recorded permission decision, if any.
    pub fn permission(&self) -> Result<Option<bool>, SchedulerError> {
        let value = self
            .db
            .kv_get(PERMISSION_KEY)
            .map_err(|e| SchedulerError::new(e.to_string()))?;
        Ok(value.map(|v| v == "granted"))
    }

    /// Record (or with `None`, forget) a permission decision.
    pub fn set_permission(&self, granted: Option<bool>) -> Result<(), SchedulerError> {
        let result = match granted {
            Some(true) => self.db.kv_set(PERMISSION_KEY, "granted"),
            Some(false) => self.db.kv_set(PERMISSION_KEY, "denied"),
            None => self.db.kv_delete(PERMISSION_KEY),
        };
        result.map_err(|e| SchedulerError::new(e.to_string()))
    }

    pub fn triggers(&self) -> Result<Vec<TriggerRow>, SchedulerError> {
        self.db
            .list_triggers()
            .map_err(|e| SchedulerError::new(e.to_string()))
    }
}

#[async_trait]
impl TriggerScheduler for LocalTriggerLedger {
    async fn request_permission(&self) -> Result<bool, SchedulerError> {
        if let Some(decided) = self.permission()? {
            return Ok(decided);
        }
        if self.auto_grant {
            self.set_permission(Some(true))?;
            return Ok(true);
        }
        Ok(false)
    }

    async fn schedule_daily(&self, request: &TriggerRequest) -> Result<TriggerId, SchedulerError> {
        let row = TriggerRow {
            id: Uuid::new_v4().to_string(),
            hour: request.time.hour(),
            minute: request.time.minute(),
            title: request.title.clone(),
            body: request.body.clone(),
            created_at: Utc::now(),
        };
        self.db
            .insert_trigger(&row)
            .map_err(|e| SchedulerError::new(e.to_string()))?;
        Ok(TriggerId::new(row.id))
    }

    async fn cancel(&self, id: &TriggerId) -> Result<(), SchedulerError> {
        let existed = self
            .db
            .delete_trigger(id.as_str())
            .map_err(|e| SchedulerError::new(e.to_string()))?;
        if !existed {
            tracing::debug!(trigger_id = %id, "cancel of unknown trigger ignored");
        }
        Ok(())
    }
}

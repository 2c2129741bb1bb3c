//! Reminder schedule persistence.
//!
//! One [`ReminderSchedule`] record per plan that currently has reminders,
//! plus the single active-plan selection. Records live under
//! `plan_notif_state:{plan_id}`; the selection lives under
//! `slice:selectedPlanId` so the two never collide.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::scheduler::TriggerId;
use crate::error::ReminderError;
use crate::storage::Database;

const SCHEDULE_PREFIX: &str = "plan_notif_state:";
const SELECTION_KEY: &str = "slice:selectedPlanId";

/// Triggers currently scheduled for one plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReminderSchedule {
    pub plan_id: String,
    /// 1-based day the triggers refer to.
    pub day_number: u32,
    /// Task reminders in time-of-day order.
    pub task_trigger_ids: Vec<TriggerId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grace_trigger_id: Option<TriggerId>,
    pub updated_at: DateTime<Utc>,
}

impl ReminderSchedule {
    pub fn new(plan_id: impl Into<String>, day_number: u32) -> Self {
        Self {
            plan_id: plan_id.into(),
            day_number,
            task_trigger_ids: Vec::new(),
            grace_trigger_id: None,
            updated_at: Utc::now(),
        }
    }

    /// Every trigger id the record holds, task reminders first.
    pub fn all_trigger_ids(&self) -> Vec<TriggerId> {
        self.task_trigger_ids
            .iter()
            .chain(self.grace_trigger_id.iter())
            .cloned()
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.task_trigger_ids.is_empty() && self.grace_trigger_id.is_none()
    }
}

/// Durable storage for reminder schedules and the active selection.
///
/// Each method touches exactly one key, so no partially written record is
/// ever observable.
#[async_trait]
pub trait ReminderStore: Send + Sync {
    async fn load(&self, plan_id: &str) -> Result<Option<ReminderSchedule>, ReminderError>;
    async fn save(&self, schedule: &ReminderSchedule) -> Result<(), ReminderError>;
    async fn clear(&self, plan_id: &str) -> Result<(), ReminderError>;
    async fn list(&self) -> Result<Vec<ReminderSchedule>, ReminderError>;

    async fn load_selection(&self) -> Result<Option<String>, ReminderError>;
    async fn save_selection(&self, plan_id: &str) -> Result<(), ReminderError>;
    async fn clear_selection(&self) -> Result<(), ReminderError>;
}

fn key_for(plan_id: &str) -> String {
    format!("{SCHEDULE_PREFIX}{plan_id}")
}

/// [`ReminderStore`] over the SQLite `kv` table.
pub struct SqliteReminderStore {
    db: Arc<Database>,
}

impl SqliteReminderStore {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl ReminderStore for SqliteReminderStore {
    /// An unreadable record is logged and treated as absent so the next
    /// enable or disable can overwrite it. Its trigger ids are lost.
    async fn load(&self, plan_id: &str) -> Result<Option<ReminderSchedule>, ReminderError> {
        let Some(raw) = self.db.kv_get(&key_for(plan_id))? else {
            return Ok(None);
        };
        match serde_json::from_str(&raw) {
            Ok(schedule) => Ok(Some(schedule)),
            Err(e) => {
                tracing::warn!(plan_id, "discarding unreadable reminder record: {e}");
                Ok(None)
            }
        }
    }

    async fn save(&self, schedule: &ReminderSchedule) -> Result<(), ReminderError> {
        let raw = serde_json::to_string(schedule)?;
        self.db.kv_set(&key_for(&schedule.plan_id), &raw)?;
        Ok(())
    }

    async fn clear(&self, plan_id: &str) -> Result<(), ReminderError> {
        self.db.kv_delete(&key_for(plan_id))?;
        Ok(())
    }

    async fn list(&self) -> Result<Vec<ReminderSchedule>, ReminderError> {
        let mut out = Vec::new();
        for (key, raw) in self.db.kv_scan_prefix(SCHEDULE_PREFIX)? {
            match serde_json::from_str(&raw) {
                Ok(schedule) => out.push(schedule),
                Err(e) => tracing::warn!(%key, "skipping unreadable reminder record: {e}"),
            }
        }
        Ok(out)
    }

    async fn load_selection(&self) -> Result<Option<String>, ReminderError> {
        Ok(self.db.kv_get(SELECTION_KEY)?)
    }

    async fn save_selection(&self, plan_id: &str) -> Result<(), ReminderError> {
        self.db.kv_set(SELECTION_KEY, plan_id)?;
        Ok(())
    }

    async fn clear_selection(&self) -> Result<(), ReminderError> {
        self.db.kv_delete(SELECTION_KEY)?;
        Ok(())
    }
}

#[derive(Default)]
struct MemoryInner {
    schedules: BTreeMap<String, ReminderSchedule>,
    selection: Option<String>,
    fail_reads: bool,
    fail_writes: bool,
}

/// In-memory [`ReminderStore`] with failure injection.
#[derive(Default)]
pub struct MemoryReminderStore {
    inner: Mutex<MemoryInner>,
}

impl MemoryReminderStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, MemoryInner> {
        match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    pub fn set_fail_reads(&self, fail: bool) {
        self.lock().fail_reads = fail;
    }

    pub fn set_fail_writes(&self, fail: bool) {
        self.lock().fail_writes = fail;
    }

    fn read(&self) -> Result<MutexGuard<'_, MemoryInner>, ReminderError> {
        let inner = self.lock();
        if inner.fail_reads {
            return Err(ReminderError::StoreUnavailable("read refused".into()));
        }
        Ok(inner)
    }

    fn write(&self) -> Result<MutexGuard<'_, MemoryInner>, ReminderError> {
        let inner = self.lock();
        if inner.fail_writes {
            return Err(ReminderError::StoreUnavailable("write refused".into()));
        }
        Ok(inner)
    }
}

#[async_trait]
impl ReminderStore for MemoryReminderStore {
    async fn load(&self, plan_id: &str) -> Result<Option<ReminderSchedule>, ReminderError> {
        Ok(self.read()?.schedules.get(plan_id).cloned())
    }

    async fn save(&self, schedule: &ReminderSchedule) -> Result<(), ReminderError> {
        self.write()?
            .schedules
            .insert(schedule.plan_id.clone(), schedule.clone());
        Ok(())
    }

    async fn clear(&self, plan_id: &str) -> Result<(), ReminderError> {
        self.write()?.schedules.remove(plan_id);
        Ok(())
    }

    async fn list(&self) -> Result<Vec<ReminderSchedule>, ReminderError> {
        Ok(self.read()?.schedules.values().cloned().collect())
    }

    async fn load_selection(&self) -> Result<Option<String>, ReminderError> {
        Ok(self.read()?.selection.clone())
    }

    async fn save_selection(&self, plan_id: &str) -> Result<(), ReminderError> {
        self.write()?.selection = Some(plan_id.to_string());
        Ok(())
    }

    async fn clear_selection(&self) -> Result<(), ReminderError> {
        self.write()?.selection = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(plan_id: &str) -> ReminderSchedule {
        ReminderSchedule {
            plan_id: plan_id.into(),
            day_number: 2,
            task_trigger_ids: vec![TriggerId::new("a"), TriggerId::new("b"), TriggerId::new("c")],
            grace_trigger_id: Some(TriggerId::new("g")),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn all_trigger_ids_lists_grace_last() {
        let ids = sample("p").all_trigger_ids();
        assert_eq!(ids.len(), 4);
        assert_eq!(ids[3], TriggerId::new("g"));
    }

    #[tokio::test]
    async fn sqlite_store_roundtrip_and_clear() {
        let store = SqliteReminderStore::new(Arc::new(Database::open_memory().unwrap()));
        assert!(store.load("p").await.unwrap().is_none());

        store.save(&sample("p")).await.unwrap();
        let loaded = store.load("p").await.unwrap().unwrap();
        assert_eq!(loaded.day_number, 2);
        assert_eq!(loaded.all_trigger_ids().len(), 4);

        store.clear("p").await.unwrap();
        assert!(store.load("p").await.unwrap().is_none());
        store.clear("p").await.unwrap();
    }

    #[tokio::test]
    async fn selection_does_not_collide_with_schedules() {
        let store = SqliteReminderStore::new(Arc::new(Database::open_memory().unwrap()));
        store.save(&sample("p")).await.unwrap();
        store.save_selection("p").await.unwrap();

        assert_eq!(store.list().await.unwrap().len(), 1);
        assert_eq!(store.load_selection().await.unwrap().as_deref(), Some("p"));

        store.clear_selection().await.unwrap();
        assert!(store.load_selection().await.unwrap().is_none());
        assert!(store.load("p").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn corrupt_record_reads_as_absent_and_can_be_replaced() {
        let db = Arc::new(Database::open_memory().unwrap());
        db.kv_set("plan_notif_state:p", "{not json").unwrap();
        let store = SqliteReminderStore::new(db.clone());

        assert!(store.load("p").await.unwrap().is_none());
        assert!(store.list().await.unwrap().is_empty());

        store.save(&sample("p")).await.unwrap();
        assert_eq!(store.load("p").await.unwrap().unwrap().day_number, 2);
    }

    #[tokio::test]
    async fn memory_store_failure_injection() {
        let store = MemoryReminderStore::new();
        store.set_fail_writes(true);
        assert!(store.save(&sample("p")).await.is_err());
        store.set_fail_writes(false);
        store.save(&sample("p")).await.unwrap();

        store.set_fail_reads(true);
        assert!(store.load("p").await.is_err());
    }
}

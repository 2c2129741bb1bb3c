//! Active plan selection.
//!
//! At most one plan receives reminders. Selecting a plan turns the previous
//! plan's reminders off, records the new selection and then tries to turn
//! the new plan's reminders on. The three steps fail independently: a
//! denied permission prompt does not undo the selection.
//!
//! Lock order is always selection, then plan.

use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{info, warn};

use super::reconciler::Reconciler;
use super::store::ReminderSchedule;
use crate::error::ReminderError;

/// What [`SelectionCoordinator::select_as_active`] did.
#[derive(Debug)]
pub struct SelectionChange {
    pub plan_id: String,
    /// Selection before the change.
    pub previous: Option<String>,
    /// Failure while disabling the previous plan's reminders, if any.
    pub previous_error: Option<ReminderError>,
    /// Outcome of enabling reminders for the new plan.
    pub reminders: Result<ReminderSchedule, ReminderError>,
}

pub struct SelectionCoordinator {
    reconciler: Arc<Reconciler>,
    lock: Mutex<()>,
}

impl SelectionCoordinator {
    pub fn new(reconciler: Arc<Reconciler>) -> Self {
        Self {
            reconciler,
            lock: Mutex::new(()),
        }
    }

    /// Currently selected plan.
    pub async fn active(&self) -> Result<Option<String>, ReminderError> {
        self.reconciler.store().load_selection().await
    }

    /// Make `plan_id` the plan reminders follow.
    ///
    /// Only a failure to read or write the selection itself is returned as
    /// `Err`; reminder failures are reported inside [`SelectionChange`].
    pub async fn select_as_active(&self, plan_id: &str) -> Result<SelectionChange, ReminderError> {
        let _guard = self.lock.lock().await;
        let store = self.reconciler.store();

        let previous = store.load_selection().await?;

        let mut previous_error = None;
        if let Some(prev) = previous.as_deref().filter(|p| *p != plan_id) {
            if let Err(e) = self.reconciler.disable(prev).await {
                warn!(plan_id = prev, "could not disable previous plan's reminders: {e}");
                previous_error = Some(e);
            }
        }

        store.save_selection(plan_id).await?;
        info!(plan_id, previous = ?previous, "active plan selected");

        let reminders = self.reconciler.enable(plan_id).await;
        if let Err(e) = &reminders {
            warn!(plan_id, "selected plan has no live reminders: {e}");
        }

        Ok(SelectionChange {
            plan_id: plan_id.to_string(),
            previous,
            previous_error,
            reminders,
        })
    }

    /// Clear the selection if it points at `plan_id`, disabling any
    /// reminders the plan still has. Returns whether the selection changed.
    ///
    /// Called once a fresh read shows the plan completed or gone.
    pub async fn deselect_if_completed_or_deleted(
        &self,
        plan_id: &str,
    ) -> Result<bool, ReminderError> {
        let _guard = self.lock.lock().await;
        let store = self.reconciler.store();

        if store.load_selection().await?.as_deref() != Some(plan_id) {
            return Ok(false);
        }
        store.clear_selection().await?;
        info!(plan_id, "active plan cleared");

        self.reconciler.disable(plan_id).await?;
        Ok(true)
    }
}

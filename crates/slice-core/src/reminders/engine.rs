//! Entry points for the UI layer.
//!
//! Screens call these after the corresponding plan service call has
//! succeeded; they never touch the scheduler or the store themselves.

use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::warn;

use super::reconciler::{Advance, Reconciler};
use super::scheduler::TriggerScheduler;
use super::selection::SelectionCoordinator;
use super::store::{ReminderSchedule, ReminderStore};
use crate::error::ReminderError;
use crate::events::ReminderEvent;
use crate::plan::PlanSource;
use crate::storage::RemindersConfig;

/// Reminder state of one plan as persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReminderStatus {
    pub plan_id: String,
    pub active: bool,
    pub schedule: Option<ReminderSchedule>,
}

/// The reminder engine.
pub struct ReminderEngine {
    reconciler: Arc<Reconciler>,
    selection: SelectionCoordinator,
}

impl ReminderEngine {
    pub fn new(
        plans: Arc<dyn PlanSource>,
        scheduler: Arc<dyn TriggerScheduler>,
        store: Arc<dyn ReminderStore>,
        config: RemindersConfig,
    ) -> Self {
        let reconciler = Arc::new(Reconciler::new(plans, scheduler, store, config));
        Self {
            selection: SelectionCoordinator::new(reconciler.clone()),
            reconciler,
        }
    }

    /// Turn reminders on for a plan's current day.
    ///
    /// Only the active plan may have live reminders, so enabling any other
    /// plan makes it the active plan first and turns the previous one off.
    pub async fn enable_reminders(&self, plan_id: &str) -> Result<ReminderEvent, ReminderError> {
        let change = self.selection.select_as_active(plan_id).await?;
        if let Some(err) = &change.previous_error {
            warn!(plan_id, "previous plan kept some reminders: {err}");
        }
        match change.reminders {
            Ok(schedule) => Ok(ReminderEvent::RemindersEnabled {
                plan_id: plan_id.to_string(),
                day_number: schedule.day_number,
                trigger_count: schedule.all_trigger_ids().len(),
                at: Utc::now(),
            }),
            Err(err) => Err(self.after_failure(plan_id, err).await),
        }
    }

    /// Turn reminders off. Idempotent.
    pub async fn disable_reminders(&self, plan_id: &str) -> Result<ReminderEvent, ReminderError> {
        let had_reminders = self.reconciler.disable(plan_id).await?;
        Ok(ReminderEvent::RemindersDisabled {
            plan_id: plan_id.to_string(),
            had_reminders,
            at: Utc::now(),
        })
    }

    /// Call after the plan service confirmed `day_number` as done.
    pub async fn on_day_marked_done(
        &self,
        plan_id: &str,
        day_number: u32,
    ) -> Result<ReminderEvent, ReminderError> {
        let advance = match self.reconciler.advance_if_needed(plan_id, day_number).await {
            Ok(advance) => advance,
            Err(err) => return Err(self.after_failure(plan_id, err).await),
        };

        let at = Utc::now();
        match advance {
            Advance::Unchanged => self.settle_untracked(plan_id).await,
            Advance::Advanced(schedule) => Ok(ReminderEvent::RemindersAdvanced {
                plan_id: plan_id.to_string(),
                from_day: day_number,
                to_day: schedule.day_number,
                at,
            }),
            Advance::Completed => {
                let deselected = self
                    .selection
                    .deselect_if_completed_or_deleted(plan_id)
                    .await?;
                Ok(ReminderEvent::PlanCompleted {
                    plan_id: plan_id.to_string(),
                    deselected,
                    at,
                })
            }
        }
    }

    /// Make a plan the one reminders follow.
    pub async fn on_plan_selected(&self, plan_id: &str) -> Result<ReminderEvent, ReminderError> {
        let change = self.selection.select_as_active(plan_id).await?;

        let (day_number, notice) = match change.reminders {
            Ok(schedule) => (Some(schedule.day_number), None),
            Err(err) => {
                let err = self.after_failure(plan_id, err).await;
                (None, Some(err.user_message()))
            }
        };
        if let Some(err) = &change.previous_error {
            warn!(plan_id, "previous plan kept some reminders: {err}");
        }

        Ok(ReminderEvent::PlanSelected {
            plan_id: change.plan_id,
            previous: change.previous,
            day_number,
            notice,
            at: Utc::now(),
        })
    }

    /// A freshly created plan becomes the active plan, starting at day 1.
    pub async fn on_plan_created(&self, plan_id: &str) -> Result<ReminderEvent, ReminderError> {
        self.on_plan_selected(plan_id).await
    }

    /// Call after the plan service confirmed the deletion.
    pub async fn on_plan_deleted(&self, plan_id: &str) -> Result<ReminderEvent, ReminderError> {
        self.reconciler.disable(plan_id).await?;
        let deselected = self
            .selection
            .deselect_if_completed_or_deleted(plan_id)
            .await?;
        Ok(ReminderEvent::PlanRemoved {
            plan_id: plan_id.to_string(),
            deselected,
            at: Utc::now(),
        })
    }

    /// Re-check the active plan, e.g. at launch. Clears the selection if the
    /// plan is completed or gone. Returns `None` when nothing is selected.
    pub async fn refresh_active(&self) -> Result<Option<ReminderEvent>, ReminderError> {
        let Some(plan_id) = self.selection.active().await? else {
            return Ok(None);
        };

        let finished = match self.reconciler.fetch_plan(&plan_id).await {
            Ok(plan) => plan.is_complete(),
            Err(ReminderError::StalePlanState { .. }) => true,
            Err(err) => return Err(err),
        };

        let at = Utc::now();
        if finished && self.selection.deselect_if_completed_or_deleted(&plan_id).await? {
            return Ok(Some(ReminderEvent::SelectionCleared { plan_id, at }));
        }
        Ok(Some(ReminderEvent::RemindersUnchanged { plan_id, at }))
    }

    pub async fn active_plan(&self) -> Result<Option<String>, ReminderError> {
        self.selection.active().await
    }

    pub async fn status(&self, plan_id: &str) -> Result<ReminderStatus, ReminderError> {
        let active = self.selection.active().await?.as_deref() == Some(plan_id);
        Ok(ReminderStatus {
            plan_id: plan_id.to_string(),
            active,
            schedule: self.reconciler.schedule(plan_id).await?,
        })
    }

    /// Every stored schedule.
    pub async fn schedules(&self) -> Result<Vec<ReminderSchedule>, ReminderError> {
        self.reconciler.store().list().await
    }

    /// Nothing moved, but the active plan may have no stored schedule (an
    /// earlier enable failed) and still have just finished.
    async fn settle_untracked(&self, plan_id: &str) -> Result<ReminderEvent, ReminderError> {
        let at = Utc::now();
        let unchanged = ReminderEvent::RemindersUnchanged {
            plan_id: plan_id.to_string(),
            at,
        };
        if self.selection.active().await?.as_deref() != Some(plan_id) {
            return Ok(unchanged);
        }

        let finished = match self.reconciler.fetch_plan(plan_id).await {
            Ok(plan) => plan.is_complete(),
            Err(ReminderError::StalePlanState { .. }) => true,
            Err(err) => {
                warn!(plan_id, "could not re-check active plan: {err}");
                false
            }
        };
        if !finished {
            return Ok(unchanged);
        }

        let deselected = self
            .selection
            .deselect_if_completed_or_deleted(plan_id)
            .await?;
        Ok(ReminderEvent::PlanCompleted {
            plan_id: plan_id.to_string(),
            deselected,
            at,
        })
    }

    /// A stale or completed plan found on a failure path no longer belongs
    /// in the selection.
    async fn after_failure(&self, plan_id: &str, err: ReminderError) -> ReminderError {
        if matches!(
            err,
            ReminderError::StalePlanState { .. } | ReminderError::PlanCompleted { .. }
        ) {
            if let Err(e) = self.selection.deselect_if_completed_or_deleted(plan_id).await {
                warn!(plan_id, "could not clear selection: {e}");
            }
        }
        err
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::{MemoryPlanSource, Plan, PlanDay};
    use crate::reminders::memory::MemoryScheduler;
    use crate::reminders::store::MemoryReminderStore;

    fn plan(id: &str, days: u32) -> Plan {
        Plan {
            id: id.into(),
            title: "Plan".into(),
            days,
            daily_minutes: 10,
            created_at: None,
            items: (1..=days)
                .map(|n| PlanDay {
                    day_number: n,
                    focus: format!("step {n}"),
                    steps: vec![],
                    is_done: false,
                })
                .collect(),
        }
    }

    fn engine() -> (Arc<MemoryPlanSource>, Arc<MemoryScheduler>, ReminderEngine) {
        let plans = Arc::new(MemoryPlanSource::new());
        let scheduler = Arc::new(MemoryScheduler::new());
        let engine = ReminderEngine::new(
            plans.clone(),
            scheduler.clone(),
            Arc::new(MemoryReminderStore::new()),
            RemindersConfig::default(),
        );
        (plans, scheduler, engine)
    }

    #[tokio::test]
    async fn enabling_completed_plan_clears_its_selection() {
        let (plans, _scheduler, engine) = engine();
        plans.insert(plan("p", 2));
        engine.on_plan_selected("p").await.unwrap();

        plans.set_done("p", 1, true);
        plans.set_done("p", 2, true);
        let err = engine.enable_reminders("p").await.unwrap_err();
        assert!(matches!(err, ReminderError::PlanCompleted { .. }));
        assert!(engine.active_plan().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn selection_with_denied_permission_carries_notice() {
        let (plans, scheduler, engine) = engine();
        plans.insert(plan("p", 2));
        scheduler.set_permission(false);

        let event = engine.on_plan_selected("p").await.unwrap();
        assert!(event.notice().unwrap().contains("permission"));
        assert_eq!(engine.active_plan().await.unwrap().as_deref(), Some("p"));
    }

    #[tokio::test]
    async fn refresh_active_clears_deleted_plan() {
        let (plans, _scheduler, engine) = engine();
        plans.insert(plan("p", 2));
        engine.on_plan_selected("p").await.unwrap();
        plans.remove("p");

        let event = engine.refresh_active().await.unwrap().unwrap();
        assert!(matches!(event, ReminderEvent::SelectionCleared { .. }));
        assert!(engine.status("p").await.unwrap().schedule.is_none());
    }

    #[tokio::test]
    async fn refresh_active_keeps_plan_in_progress() {
        let (plans, _scheduler, engine) = engine();
        plans.insert(plan("p", 2));
        engine.on_plan_selected("p").await.unwrap();

        let event = engine.refresh_active().await.unwrap().unwrap();
        assert!(matches!(event, ReminderEvent::RemindersUnchanged { .. }));
        assert!(engine.status("p").await.unwrap().active);
    }

    #[tokio::test]
    async fn enabling_another_plan_moves_the_selection() {
        let (plans, scheduler, engine) = engine();
        plans.insert(plan("a", 3));
        plans.insert(plan("b", 3));
        engine.on_plan_selected("a").await.unwrap();

        let event = engine.enable_reminders("b").await.unwrap();

        assert!(matches!(event, ReminderEvent::RemindersEnabled { day_number: 1, .. }));
        assert_eq!(scheduler.live().len(), 4);
        assert_eq!(engine.active_plan().await.unwrap().as_deref(), Some("b"));
        assert!(engine.status("a").await.unwrap().schedule.is_none());
        assert_eq!(engine.schedules().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn finishing_selected_plan_without_reminders_clears_selection() {
        let (plans, scheduler, engine) = engine();
        plans.insert(plan("b", 1));
        scheduler.set_permission(false);
        let selected = engine.on_plan_selected("b").await.unwrap();
        assert!(selected.notice().is_some());

        plans.set_done("b", 1, true);
        let event = engine.on_day_marked_done("b", 1).await.unwrap();

        assert!(matches!(event, ReminderEvent::PlanCompleted { deselected: true, .. }));
        assert!(engine.active_plan().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn untracked_day_on_unfinished_active_plan_keeps_selection() {
        let (plans, scheduler, engine) = engine();
        plans.insert(plan("b", 2));
        scheduler.set_permission(false);
        engine.on_plan_selected("b").await.unwrap();

        plans.set_done("b", 1, true);
        let event = engine.on_day_marked_done("b", 1).await.unwrap();

        assert!(matches!(event, ReminderEvent::RemindersUnchanged { .. }));
        assert_eq!(engine.active_plan().await.unwrap().as_deref(), Some("b"));
    }

    #[tokio::test]
    async fn refresh_without_selection_is_none() {
        let (_plans, _scheduler, engine) = engine();
        assert!(engine.refresh_active().await.unwrap().is_none());
    }
}

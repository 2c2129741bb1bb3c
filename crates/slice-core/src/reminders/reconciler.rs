//! Reminder reconciliation.
//!
//! Per plan the engine is either disabled (no stored record) or
//! `Scheduled(day, ids)`. Every transition is cancel-then-recreate: live
//! triggers are never edited in place, and old triggers are always gone
//! before new ones are registered.
//!
//! Each public operation holds the plan's lock from the first store read
//! to the last store write, so concurrent callers observe either the state
//! before or after the sequence.

use std::future::Future;
use std::sync::Arc;

use tracing::{debug, info, warn};

use super::content;
use super::locks::PlanLocks;
use super::scheduler::{SchedulerError, TriggerId, TriggerRequest, TriggerScheduler};
use super::store::{ReminderSchedule, ReminderStore};
use crate::error::ReminderError;
use crate::plan::{Plan, PlanSource};
use crate::storage::RemindersConfig;

/// Result of [`Reconciler::advance_if_needed`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Advance {
    /// The completed day was not the tracked day, nothing is tracked, or
    /// the plan service does not confirm the completion yet.
    Unchanged,
    /// Triggers now refer to the next incomplete day.
    Advanced(ReminderSchedule),
    /// No incomplete day remains; reminders were disabled.
    Completed,
}

enum OsCallError {
    Refused(String),
    TimedOut { operation: &'static str, secs: u64 },
}

impl OsCallError {
    fn message(&self) -> String {
        match self {
            OsCallError::Refused(msg) => msg.clone(),
            OsCallError::TimedOut { operation, secs } => format!("{operation} timed out after {secs}s"),
        }
    }
}

/// Keeps OS triggers and stored schedules in line with plan progress.
pub struct Reconciler {
    plans: Arc<dyn PlanSource>,
    scheduler: Arc<dyn TriggerScheduler>,
    store: Arc<dyn ReminderStore>,
    config: RemindersConfig,
    locks: PlanLocks,
}

impl Reconciler {
    pub fn new(
        plans: Arc<dyn PlanSource>,
        scheduler: Arc<dyn TriggerScheduler>,
        store: Arc<dyn ReminderStore>,
        config: RemindersConfig,
    ) -> Self {
        Self {
            plans,
            scheduler,
            store,
            config,
            locks: PlanLocks::new(),
        }
    }

    pub fn store(&self) -> &Arc<dyn ReminderStore> {
        &self.store
    }

    /// Fresh read of a plan, mapped into reminder terms.
    pub async fn fetch_plan(&self, plan_id: &str) -> Result<Plan, ReminderError> {
        let plan = self
            .plans
            .get_plan(plan_id)
            .await
            .map_err(|e| ReminderError::PlanFetchFailed(e.to_string()))?
            .ok_or_else(|| ReminderError::StalePlanState {
                plan_id: plan_id.to_string(),
                reason: "plan not found".into(),
            })?;
        plan.validate()
            .map_err(|reason| ReminderError::StalePlanState {
                plan_id: plan_id.to_string(),
                reason,
            })?;
        Ok(plan)
    }

    /// Stored schedule for a plan, if any.
    pub async fn schedule(&self, plan_id: &str) -> Result<Option<ReminderSchedule>, ReminderError> {
        self.store.load(plan_id).await
    }

    /// Turn reminders on for the plan's current day, replacing any
    /// previous set.
    pub async fn enable(&self, plan_id: &str) -> Result<ReminderSchedule, ReminderError> {
        let _guard = self.locks.acquire(plan_id).await;
        self.enable_locked(plan_id).await
    }

    /// Cancel and forget a plan's reminders. Returns whether a record
    /// existed. A plan without a record is left alone; no OS calls are made.
    pub async fn disable(&self, plan_id: &str) -> Result<bool, ReminderError> {
        let _guard = self.locks.acquire(plan_id).await;
        self.disable_locked(plan_id).await
    }

    /// Move reminders on after `completed_day` was marked done.
    pub async fn advance_if_needed(
        &self,
        plan_id: &str,
        completed_day: u32,
    ) -> Result<Advance, ReminderError> {
        let _guard = self.locks.acquire(plan_id).await;
        self.advance_locked(plan_id, completed_day).await
    }

    async fn enable_locked(&self, plan_id: &str) -> Result<ReminderSchedule, ReminderError> {
        if let Some(existing) = self.store.load(plan_id).await? {
            debug!(plan_id, day_number = existing.day_number, "replacing existing reminders");
            self.retire(&existing).await?;
        }

        self.ensure_permission().await?;

        let plan = self.fetch_plan(plan_id).await?;
        let day = plan.current_day().ok_or_else(|| ReminderError::PlanCompleted {
            plan_id: plan_id.to_string(),
        })?;

        let schedule = self.schedule_day(&plan, day.day_number).await?;
        info!(
            plan_id,
            day_number = schedule.day_number,
            triggers = schedule.all_trigger_ids().len(),
            "reminders enabled"
        );
        Ok(schedule)
    }

    async fn disable_locked(&self, plan_id: &str) -> Result<bool, ReminderError> {
        let Some(existing) = self.store.load(plan_id).await? else {
            return Ok(false);
        };
        self.retire(&existing).await?;
        info!(plan_id, day_number = existing.day_number, "reminders disabled");
        Ok(true)
    }

    async fn advance_locked(
        &self,
        plan_id: &str,
        completed_day: u32,
    ) -> Result<Advance, ReminderError> {
        let Some(existing) = self.store.load(plan_id).await? else {
            debug!(plan_id, completed_day, "no reminders tracked; nothing to advance");
            return Ok(Advance::Unchanged);
        };
        if existing.day_number != completed_day {
            debug!(
                plan_id,
                completed_day,
                tracked_day = existing.day_number,
                "completed day is not the tracked day; leaving reminders alone"
            );
            return Ok(Advance::Unchanged);
        }

        let plan = match self.fetch_plan(plan_id).await {
            Ok(plan) => plan,
            Err(err @ ReminderError::StalePlanState { .. }) => {
                warn!(plan_id, "plan vanished or is malformed; disabling reminders");
                self.retire(&existing).await?;
                return Err(err);
            }
            Err(err) => return Err(err),
        };

        let Some(next) = plan.current_day() else {
            self.retire(&existing).await?;
            info!(plan_id, "plan completed; reminders disabled");
            return Ok(Advance::Completed);
        };

        if next.day_number == existing.day_number {
            warn!(
                plan_id,
                day_number = next.day_number,
                "plan service does not report the day as done; keeping reminders"
            );
            return Ok(Advance::Unchanged);
        }

        self.retire(&existing).await?;
        let schedule = self.schedule_day(&plan, next.day_number).await?;
        info!(
            plan_id,
            from_day = existing.day_number,
            to_day = schedule.day_number,
            "reminders advanced"
        );
        Ok(Advance::Advanced(schedule))
    }

    /// Cancel every trigger of `existing` and drop its record.
    ///
    /// Ids that could not be cancelled stay recorded so a later call can
    /// retry them.
    async fn retire(&self, existing: &ReminderSchedule) -> Result<(), ReminderError> {
        let mut failed: Vec<TriggerId> = Vec::new();
        let mut last_error = String::new();

        for id in existing.all_trigger_ids() {
            if let Err(e) = self.os_call("cancel", self.scheduler.cancel(&id)).await {
                warn!(plan_id = %existing.plan_id, trigger_id = %id, "cancel failed: {}", e.message());
                last_error = e.message();
                failed.push(id);
            }
        }

        if failed.is_empty() {
            return self.store.clear(&existing.plan_id).await;
        }

        let remaining = ReminderSchedule {
            task_trigger_ids: existing
                .task_trigger_ids
                .iter()
                .filter(|id| failed.contains(id))
                .cloned()
                .collect(),
            grace_trigger_id: existing
                .grace_trigger_id
                .clone()
                .filter(|id| failed.contains(id)),
            updated_at: chrono::Utc::now(),
            ..existing.clone()
        };
        self.store.save(&remaining).await?;
        Err(ReminderError::CancelFailed {
            remaining: failed.len(),
            message: last_error,
        })
    }

    async fn ensure_permission(&self) -> Result<(), ReminderError> {
        match self
            .os_call("permission request", self.scheduler.request_permission())
            .await
        {
            Ok(true) => Ok(()),
            Ok(false) => Err(ReminderError::PermissionDenied),
            Err(OsCallError::TimedOut { operation, secs }) => Err(ReminderError::Timeout {
                operation: operation.to_string(),
                secs,
            }),
            Err(OsCallError::Refused(msg)) => {
                warn!("permission request failed: {msg}");
                Err(ReminderError::PermissionDenied)
            }
        }
    }

    /// Register the triggers for `day_number` and persist them.
    ///
    /// Scheduling stops at the first refusal. Whatever was obtained is
    /// still recorded so it can be cancelled later. If the record cannot be
    /// written the new triggers are cancelled again, so nothing is left
    /// live that the store does not know about.
    async fn schedule_day(
        &self,
        plan: &Plan,
        day_number: u32,
    ) -> Result<ReminderSchedule, ReminderError> {
        let day = plan.day(day_number).ok_or_else(|| ReminderError::StalePlanState {
            plan_id: plan.id.clone(),
            reason: format!("day {day_number} missing"),
        })?;
        let (tasks, grace) = content::desired_triggers(plan, day, &self.config);
        let requested = tasks.len() + 1;

        let mut schedule = ReminderSchedule::new(plan.id.clone(), day_number);
        let mut failure: Option<OsCallError> = None;

        for request in &tasks {
            match self.schedule_one(request).await {
                Ok(id) => schedule.task_trigger_ids.push(id),
                Err(e) => {
                    failure = Some(e);
                    break;
                }
            }
        }
        if failure.is_none() {
            match self.schedule_one(&grace).await {
                Ok(id) => schedule.grace_trigger_id = Some(id),
                Err(e) => failure = Some(e),
            }
        }

        if !schedule.is_empty() {
            if let Err(store_err) = self.store.save(&schedule).await {
                warn!(plan_id = %plan.id, "could not record new reminders; rolling back");
                for id in schedule.all_trigger_ids() {
                    if let Err(e) = self.os_call("cancel", self.scheduler.cancel(&id)).await {
                        warn!(plan_id = %plan.id, trigger_id = %id, "rollback cancel failed: {}", e.message());
                    }
                }
                return Err(store_err);
            }
        }

        match failure {
            None => Ok(schedule),
            Some(e) => {
                let scheduled = schedule.all_trigger_ids().len();
                warn!(plan_id = %plan.id, scheduled, requested, "partial scheduling: {}", e.message());
                Err(match e {
                    OsCallError::TimedOut { operation, secs } if scheduled == 0 => {
                        ReminderError::Timeout {
                            operation: operation.to_string(),
                            secs,
                        }
                    }
                    other => ReminderError::SchedulingFailed {
                        scheduled,
                        requested,
                        message: other.message(),
                    },
                })
            }
        }
    }

    async fn schedule_one(&self, request: &TriggerRequest) -> Result<TriggerId, OsCallError> {
        self.os_call("schedule", self.scheduler.schedule_daily(request))
            .await
    }

    async fn os_call<T>(
        &self,
        operation: &'static str,
        fut: impl Future<Output = Result<T, SchedulerError>>,
    ) -> Result<T, OsCallError> {
        let bound = self.config.os_timeout();
        match tokio::time::timeout(bound, fut).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => Err(OsCallError::Refused(e.to_string())),
            Err(_) => Err(OsCallError::TimedOut {
                operation,
                secs: bound.as_secs(),
            }),
        }
    }
}

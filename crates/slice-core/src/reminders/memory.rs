//! In-process scheduler.
//!
//! Keeps triggers in memory and records every call. Used by tests and by
//! embedders that deliver notifications themselves. Failure injection
//! knobs let callers reproduce OS refusals, slow calls, and denied
//! permission.

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;

use super::scheduler::{SchedulerError, TriggerId, TriggerRequest, TriggerScheduler};

/// A call observed by [`MemoryScheduler`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchedulerCall {
    RequestPermission,
    Schedule(TriggerRequest),
    Cancel(TriggerId),
}

#[derive(Default)]
struct Inner {
    granted: bool,
    next_id: u64,
    live: BTreeMap<u64, (TriggerId, TriggerRequest)>,
    calls: Vec<SchedulerCall>,
    schedule_budget: Option<usize>,
    fail_cancel: bool,
    latency: Option<Duration>,
}

/// Scheduler that keeps triggers in memory.
#[derive(Default)]
pub struct MemoryScheduler {
    inner: Mutex<Inner>,
}

impl MemoryScheduler {
    /// A scheduler whose permission prompt is granted.
    pub fn new() -> Self {
        let scheduler = Self::default();
        scheduler.set_permission(true);
        scheduler
    }

    /// A scheduler whose permission prompt is denied.
    pub fn denying() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        // A panic while holding this lock only happens inside a failing test.
        match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    pub fn set_permission(&self, granted: bool) {
        self.lock().granted = granted;
    }

    /// Allow `n` more successful schedules, then refuse every further one.
    /// `None` removes the limit.
    pub fn set_schedule_budget(&self, n: Option<usize>) {
        self.lock().schedule_budget = n;
    }

    pub fn set_cancel_failure(&self, fail: bool) {
        self.lock().fail_cancel = fail;
    }

    /// Delay every call by `latency` before answering.
    pub fn set_latency(&self, latency: Option<Duration>) {
        self.lock().latency = latency;
    }

    /// Currently live triggers in scheduling order.
    pub fn live(&self) -> Vec<(TriggerId, TriggerRequest)> {
        self.lock().live.values().cloned().collect()
    }

    pub fn live_ids(&self) -> Vec<TriggerId> {
        self.lock().live.values().map(|(id, _)| id.clone()).collect()
    }

    pub fn is_live(&self, id: &TriggerId) -> bool {
        self.lock().live.values().any(|(live, _)| live == id)
    }

    pub fn calls(&self) -> Vec<SchedulerCall> {
        self.lock().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.lock().calls.clear();
    }

    async fn simulate_latency(&self) {
        let latency = self.lock().latency;
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
    }
}

#[async_trait]
impl TriggerScheduler for MemoryScheduler {
    async fn request_permission(&self) -> Result<bool, SchedulerError> {
        self.simulate_latency().await;
        let mut inner = self.lock();
        inner.calls.push(SchedulerCall::RequestPermission);
        Ok(inner.granted)
    }

    async fn schedule_daily(&self, request: &TriggerRequest) -> Result<TriggerId, SchedulerError> {
        self.simulate_latency().await;
        let mut inner = self.lock();
        inner.calls.push(SchedulerCall::Schedule(request.clone()));

        if let Some(budget) = inner.schedule_budget.as_mut() {
            if *budget == 0 {
                return Err(SchedulerError::new("scheduler refused trigger"));
            }
            *budget -= 1;
        }

        inner.next_id += 1;
        let seq = inner.next_id;
        let id = TriggerId::new(format!("mem-{seq}"));
        inner.live.insert(seq, (id.clone(), request.clone()));
        Ok(id)
    }

    async fn cancel(&self, id: &TriggerId) -> Result<(), SchedulerError> {
        self.simulate_latency().await;
        let mut inner = self.lock();
        inner.calls.push(SchedulerCall::Cancel(id.clone()));
        if inner.fail_cancel {
            return Err(SchedulerError::new("scheduler refused cancel"));
        }
        inner.live.retain(|_, (live, _)| live != id);
        Ok(())
    }
}

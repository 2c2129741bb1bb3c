//! Per-plan mutual exclusion.
//!
//! Every read-schedule / cancel / schedule / persist sequence for a plan
//! runs while holding that plan's guard. Different plans never contend.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

#[derive(Default)]
pub struct PlanLocks {
    locks: Mutex<HashMap<String, Arc<AsyncMutex<()>>>>,
}

impl PlanLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to `plan_id`.
    pub async fn acquire(&self, plan_id: &str) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = match self.locks.lock() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            // Drop entries nobody holds or waits on.
            locks.retain(|_, l| Arc::strong_count(l) > 1);
            locks
                .entry(plan_id.to_string())
                .or_insert_with(|| Arc::new(AsyncMutex::new(())))
                .clone()
        };
        lock.lock_owned().await
    }
}

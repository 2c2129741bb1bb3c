//! Plans as served by the remote plan service.
//!
//! The engine only reads plans. Day completion, creation and deletion are
//! performed by the UI through [`HttpPlanClient`]; the engine is told
//! afterwards and re-reads the plan through a [`PlanSource`].

pub mod client;
pub mod credentials;

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::PlanError;

pub use client::{HttpPlanClient, PlanSummary};

/// One step of a day's work.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanStep {
    pub title: String,
    #[serde(default)]
    pub minutes: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deliverable: Option<String>,
    #[serde(default)]
    pub done_definition: String,
}

/// One numbered day of a plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanDay {
    pub day_number: u32,
    #[serde(default)]
    pub focus: String,
    #[serde(default)]
    pub steps: Vec<PlanStep>,
    #[serde(default)]
    pub is_done: bool,
}

impl PlanDay {
    /// Short label for the day: its focus, else its first step's title.
    pub fn label(&self) -> Option<&str> {
        let focus = self.focus.trim();
        if !focus.is_empty() {
            return Some(focus);
        }
        self.steps
            .first()
            .map(|s| s.title.trim())
            .filter(|t| !t.is_empty())
    }
}

/// A multi-day plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Plan {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub days: u32,
    #[serde(default)]
    pub daily_minutes: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub items: Vec<PlanDay>,
}

impl Plan {
    pub fn day(&self, day_number: u32) -> Option<&PlanDay> {
        self.items.iter().find(|d| d.day_number == day_number)
    }

    /// The lowest-numbered incomplete day.
    pub fn current_day(&self) -> Option<&PlanDay> {
        self.items
            .iter()
            .filter(|d| !d.is_done)
            .min_by_key(|d| d.day_number)
    }

    pub fn is_complete(&self) -> bool {
        self.current_day().is_none()
    }

    pub fn done_count(&self) -> usize {
        self.items.iter().filter(|d| d.is_done).count()
    }

    /// Check that day numbers run 1..=n without gaps or repeats.
    pub fn validate(&self) -> Result<(), String> {
        if self.items.is_empty() {
            return Err("plan has no days".into());
        }
        let mut numbers: Vec<u32> = self.items.iter().map(|d| d.day_number).collect();
        numbers.sort_unstable();
        for (i, n) in numbers.iter().enumerate() {
            let expected = i as u32 + 1;
            if *n != expected {
                return Err(format!("expected day {expected}, found day {n}"));
            }
        }
        Ok(())
    }
}

/// Read access to authoritative plan state.
#[async_trait]
pub trait PlanSource: Send + Sync {
    /// Fetch a plan. `Ok(None)` means the plan no longer exists.
    async fn get_plan(&self, plan_id: &str) -> Result<Option<Plan>, PlanError>;
}

#[async_trait]
impl PlanSource for HttpPlanClient {
    async fn get_plan(&self, plan_id: &str) -> Result<Option<Plan>, PlanError> {
        self.fetch_plan(plan_id).await
    }
}

#[derive(Default)]
struct MemoryPlans {
    plans: HashMap<String, Plan>,
    offline: bool,
}

/// In-process plan source for tests and embedders that already hold plans.
#[derive(Default)]
pub struct MemoryPlanSource {
    inner: Mutex<MemoryPlans>,
}

impl MemoryPlanSource {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, MemoryPlans> {
        match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    pub fn insert(&self, plan: Plan) {
        self.lock().plans.insert(plan.id.clone(), plan);
    }

    pub fn remove(&self, plan_id: &str) -> Option<Plan> {
        self.lock().plans.remove(plan_id)
    }

    /// Set a day's completion flag. Returns false if plan or day is unknown.
    pub fn set_done(&self, plan_id: &str, day_number: u32, is_done: bool) -> bool {
        let mut inner = self.lock();
        let Some(plan) = inner.plans.get_mut(plan_id) else {
            return false;
        };
        match plan.items.iter_mut().find(|d| d.day_number == day_number) {
            Some(day) => {
                day.is_done = is_done;
                true
            }
            None => false,
        }
    }

    /// Simulate the service being unreachable.
    pub fn set_offline(&self, offline: bool) {
        self.lock().offline = offline;
    }
}

#[async_trait]
impl PlanSource for MemoryPlanSource {
    async fn get_plan(&self, plan_id: &str) -> Result<Option<Plan>, PlanError> {
        let inner = self.lock();
        if inner.offline {
            return Err(PlanError::Status {
                method: "GET".into(),
                url: format!("memory://plans/{plan_id}"),
                status: 503,
                body: "offline".into(),
            });
        }
        Ok(inner.plans.get(plan_id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(n: u32, done: bool, focus: &str) -> PlanDay {
        PlanDay {
            day_number: n,
            focus: focus.into(),
            steps: vec![],
            is_done: done,
        }
    }

    fn plan(items: Vec<PlanDay>) -> Plan {
        Plan {
            id: "p".into(),
            title: "Learn Rust".into(),
            days: items.len() as u32,
            daily_minutes: 30,
            created_at: None,
            items,
        }
    }

    #[test]
    fn current_day_is_lowest_incomplete() {
        let p = plan(vec![day(3, false, ""), day(1, true, ""), day(2, false, "")]);
        assert_eq!(p.current_day().unwrap().day_number, 2);
        assert!(!p.is_complete());
        assert_eq!(p.done_count(), 1);
    }

    #[test]
    fn all_done_is_complete() {
        let p = plan(vec![day(1, true, ""), day(2, true, "")]);
        assert!(p.current_day().is_none());
        assert!(p.is_complete());
    }

    #[test]
    fn label_prefers_focus_then_first_step() {
        let mut d = day(1, false, "  ");
        assert_eq!(d.label(), None);
        d.steps.push(PlanStep {
            title: "Install toolchain".into(),
            minutes: 10,
            deliverable: None,
            done_definition: String::new(),
        });
        assert_eq!(d.label(), Some("Install toolchain"));
        d.focus = "Setup".into();
        assert_eq!(d.label(), Some("Setup"));
    }

    #[test]
    fn validate_rejects_gaps_and_empty() {
        assert!(plan(vec![day(1, false, ""), day(2, false, "")]).validate().is_ok());
        assert!(plan(vec![day(1, false, ""), day(3, false, "")]).validate().is_err());
        assert!(plan(vec![day(2, false, "")]).validate().is_err());
        assert!(plan(vec![]).validate().is_err());
    }

    #[test]
    fn deserializes_service_payload() {
        let json = r#"{
            "id": "6c1f",
            "title": "Write a novella",
            "days": 2,
            "daily_minutes": 45,
            "created_at": "2026-01-02T03:04:05Z",
            "items": [
                {"day_number": 1, "focus": "Premise", "steps": [
                    {"title": "Brainstorm", "minutes": 15, "done_definition": "10 ideas"}
                ], "is_done": true},
                {"day_number": 2, "focus": "", "steps": [], "is_done": false}
            ]
        }"#;
        let p: Plan = serde_json::from_str(json).unwrap();
        assert_eq!(p.items.len(), 2);
        assert_eq!(p.current_day().unwrap().day_number, 2);
        assert!(p.created_at.is_some());
    }

    #[tokio::test]
    async fn memory_source_tracks_updates() {
        let src = MemoryPlanSource::new();
        src.insert(plan(vec![day(1, false, "")]));
        assert!(src.set_done("p", 1, true));
        assert!(!src.set_done("p", 9, true));
        let p = src.get_plan("p").await.unwrap().unwrap();
        assert!(p.is_complete());

        src.remove("p");
        assert!(src.get_plan("p").await.unwrap().is_none());

        src.set_offline(true);
        assert!(src.get_plan("p").await.is_err());
    }
}

//! End-to-end reminder flows through the engine.
//!
//! The plan service is an in-memory source; the scheduler is either the
//! in-memory fake or the SQLite-backed ledger.

use std::sync::Arc;

use slice_core::reminders::SchedulerCall;
use slice_core::{
    Database, LocalTriggerLedger, MemoryPlanSource, MemoryReminderStore, MemoryScheduler, Plan,
    PlanDay, PlanStep, ReminderEngine, ReminderError, ReminderEvent, ReminderStore,
    RemindersConfig, SqliteReminderStore,
};

fn plan(id: &str, days: u32) -> Plan {
    Plan {
        id: id.to_string(),
        title: format!("Plan {id}"),
        days,
        daily_minutes: 20,
        created_at: None,
        items: (1..=days)
            .map(|n| PlanDay {
                day_number: n,
                focus: format!("Focus {n}"),
                steps: vec![PlanStep {
                    title: format!("Step {n}"),
                    minutes: 20,
                    deliverable: None,
                    done_definition: "done".into(),
                }],
                is_done: false,
            })
            .collect(),
    }
}

struct Harness {
    plans: Arc<MemoryPlanSource>,
    scheduler: Arc<MemoryScheduler>,
    store: Arc<MemoryReminderStore>,
    engine: ReminderEngine,
}

fn harness() -> Harness {
    let plans = Arc::new(MemoryPlanSource::new());
    let scheduler = Arc::new(MemoryScheduler::new());
    let store = Arc::new(MemoryReminderStore::new());
    let engine = ReminderEngine::new(
        plans.clone(),
        scheduler.clone(),
        store.clone(),
        RemindersConfig::default(),
    );
    Harness {
        plans,
        scheduler,
        store,
        engine,
    }
}

#[tokio::test]
async fn seven_day_plan_walks_to_completion() {
    let h = harness();
    h.plans.insert(plan("p", 7));

    let created = h.engine.on_plan_created("p").await.unwrap();
    match created {
        ReminderEvent::PlanSelected { day_number, notice, .. } => {
            assert_eq!(day_number, Some(1));
            assert!(notice.is_none());
        }
        other => panic!("unexpected event: {other:?}"),
    }
    assert_eq!(h.scheduler.live().len(), 4);

    for day in 1..7 {
        let before = h.scheduler.live_ids();
        h.plans.set_done("p", day, true);
        let event = h.engine.on_day_marked_done("p", day).await.unwrap();
        match event {
            ReminderEvent::RemindersAdvanced { from_day, to_day, .. } => {
                assert_eq!(from_day, day);
                assert_eq!(to_day, day + 1);
            }
            other => panic!("unexpected event on day {day}: {other:?}"),
        }
        assert!(before.iter().all(|id| !h.scheduler.is_live(id)));
        assert_eq!(h.scheduler.live().len(), 4);
        assert!(h
            .scheduler
            .live()
            .iter()
            .any(|(_, req)| req.title.starts_with(&format!("Day {}", day + 1))));
    }

    h.plans.set_done("p", 7, true);
    let done = h.engine.on_day_marked_done("p", 7).await.unwrap();
    assert!(matches!(done, ReminderEvent::PlanCompleted { deselected: true, .. }));
    assert!(h.scheduler.live().is_empty());
    assert!(h.store.load("p").await.unwrap().is_none());
    assert!(h.engine.active_plan().await.unwrap().is_none());
}

#[tokio::test]
async fn single_day_plan_completion_clears_selection() {
    let h = harness();
    h.plans.insert(plan("one", 1));
    h.engine.on_plan_created("one").await.unwrap();

    h.plans.set_done("one", 1, true);
    let event = h.engine.on_day_marked_done("one", 1).await.unwrap();

    assert!(matches!(event, ReminderEvent::PlanCompleted { deselected: true, .. }));
    assert!(h.scheduler.live().is_empty());
    assert!(h.engine.active_plan().await.unwrap().is_none());
}

#[tokio::test]
async fn out_of_order_completion_makes_no_os_calls() {
    let h = harness();
    h.plans.insert(plan("p", 5));
    h.engine.enable_reminders("p").await.unwrap();
    let before = h.store.load("p").await.unwrap();
    h.scheduler.clear_calls();

    h.plans.set_done("p", 3, true);
    let event = h.engine.on_day_marked_done("p", 3).await.unwrap();

    assert!(matches!(event, ReminderEvent::RemindersUnchanged { .. }));
    assert!(h.scheduler.calls().is_empty());
    assert_eq!(h.store.load("p").await.unwrap(), before);
}

#[tokio::test]
async fn switching_with_denied_permission_keeps_selection() {
    let h = harness();
    h.plans.insert(plan("a", 3));
    h.plans.insert(plan("b", 3));
    h.engine.on_plan_selected("a").await.unwrap();

    h.scheduler.set_permission(false);
    let event = h.engine.on_plan_selected("b").await.unwrap();

    match &event {
        ReminderEvent::PlanSelected { previous, day_number, .. } => {
            assert_eq!(previous.as_deref(), Some("a"));
            assert!(day_number.is_none());
        }
        other => panic!("unexpected event: {other:?}"),
    }
    assert!(event.notice().is_some());
    assert_eq!(h.engine.active_plan().await.unwrap().as_deref(), Some("b"));
    assert!(h.scheduler.live().is_empty());
    assert!(h.store.load("a").await.unwrap().is_none());
}

#[tokio::test]
async fn disabling_untracked_plan_touches_nothing() {
    let h = harness();
    h.plans.insert(plan("p", 3));

    let event = h.engine.disable_reminders("p").await.unwrap();

    assert!(matches!(event, ReminderEvent::RemindersDisabled { had_reminders: false, .. }));
    assert!(h.scheduler.calls().is_empty());
}

#[tokio::test]
async fn enabling_twice_replaces_triggers() {
    let h = harness();
    h.plans.insert(plan("p", 3));

    h.engine.enable_reminders("p").await.unwrap();
    let first = h.scheduler.live_ids();
    h.engine.enable_reminders("p").await.unwrap();
    let second = h.scheduler.live_ids();

    assert_eq!(second.len(), 4);
    assert!(first.iter().all(|id| !second.contains(id)));
    let cancels = h
        .scheduler
        .calls()
        .iter()
        .filter(|c| matches!(c, SchedulerCall::Cancel(_)))
        .count();
    assert_eq!(cancels, 4);
}

#[tokio::test]
async fn deleting_active_plan_clears_everything() {
    let h = harness();
    h.plans.insert(plan("p", 3));
    h.engine.on_plan_selected("p").await.unwrap();

    h.plans.remove("p");
    let event = h.engine.on_plan_deleted("p").await.unwrap();

    assert!(matches!(event, ReminderEvent::PlanRemoved { deselected: true, .. }));
    assert!(h.scheduler.live().is_empty());
    assert!(h.store.list().await.unwrap().is_empty());
}

#[tokio::test]
async fn vanished_plan_is_cleaned_up_on_advance() {
    let h = harness();
    h.plans.insert(plan("p", 3));
    h.engine.on_plan_selected("p").await.unwrap();

    h.plans.remove("p");
    let err = h.engine.on_day_marked_done("p", 1).await.unwrap_err();

    assert!(matches!(err, ReminderError::StalePlanState { .. }));
    assert!(h.scheduler.live().is_empty());
    assert!(h.engine.active_plan().await.unwrap().is_none());
}

#[tokio::test]
async fn unreachable_service_keeps_current_reminders() {
    let h = harness();
    h.plans.insert(plan("p", 3));
    h.engine.enable_reminders("p").await.unwrap();
    let live = h.scheduler.live_ids();

    h.plans.set_offline(true);
    let err = h.engine.on_day_marked_done("p", 1).await.unwrap_err();

    assert!(matches!(err, ReminderError::PlanFetchFailed(_)));
    assert_eq!(h.scheduler.live_ids(), live);
    assert_eq!(h.store.load("p").await.unwrap().unwrap().day_number, 1);
}

#[tokio::test]
async fn schedules_survive_restart() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("slice.db");
    let plans = Arc::new(MemoryPlanSource::new());
    plans.insert(plan("p", 3));

    {
        let db = Arc::new(Database::open_at(&db_path).unwrap());
        let engine = ReminderEngine::new(
            plans.clone(),
            Arc::new(LocalTriggerLedger::new(db.clone(), true)),
            Arc::new(SqliteReminderStore::new(db)),
            RemindersConfig::default(),
        );
        engine.on_plan_created("p").await.unwrap();
    }

    let db = Arc::new(Database::open_at(&db_path).unwrap());
    let ledger = Arc::new(LocalTriggerLedger::new(db.clone(), true));
    let engine = ReminderEngine::new(
        plans.clone(),
        ledger.clone(),
        Arc::new(SqliteReminderStore::new(db)),
        RemindersConfig::default(),
    );

    let status = engine.status("p").await.unwrap();
    assert!(status.active);
    let schedule = status.schedule.unwrap();
    assert_eq!(schedule.day_number, 1);
    assert_eq!(ledger.triggers().unwrap().len(), 4);

    plans.set_done("p", 1, true);
    engine.on_day_marked_done("p", 1).await.unwrap();

    let rows = ledger.triggers().unwrap();
    assert_eq!(rows.len(), 4);
    assert!(rows.iter().all(|r| !schedule.all_trigger_ids().iter().any(|id| id.as_str() == r.id)));
    assert!(rows.iter().any(|r| r.title.starts_with("Day 2")));
}

#[tokio::test]
async fn enabling_second_plan_keeps_one_live_set() {
    let h = harness();
    h.plans.insert(plan("a", 3));
    h.plans.insert(plan("b", 3));
    h.engine.on_plan_selected("a").await.unwrap();

    h.engine.enable_reminders("b").await.unwrap();

    assert_eq!(h.scheduler.live().len(), 4);
    assert_eq!(h.store.list().await.unwrap().len(), 1);
    assert_eq!(h.engine.active_plan().await.unwrap().as_deref(), Some("b"));
}

#[tokio::test]
async fn denied_plan_finishing_still_clears_selection() {
    let h = harness();
    h.plans.insert(plan("a", 3));
    h.plans.insert(plan("b", 1));
    h.engine.on_plan_selected("a").await.unwrap();

    h.scheduler.set_permission(false);
    h.engine.on_plan_selected("b").await.unwrap();
    h.plans.set_done("b", 1, true);
    let event = h.engine.on_day_marked_done("b", 1).await.unwrap();

    assert!(matches!(event, ReminderEvent::PlanCompleted { deselected: true, .. }));
    assert!(h.engine.active_plan().await.unwrap().is_none());
    assert!(h.scheduler.live().is_empty());
}

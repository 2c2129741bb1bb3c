//! Property tests for day advancement.

use std::sync::Arc;

use proptest::prelude::*;
use slice_core::{
    MemoryPlanSource, MemoryReminderStore, MemoryScheduler, Plan, PlanDay, ReminderEngine,
    ReminderEvent, ReminderStore, RemindersConfig,
};

fn plan(days: u32, done_before: u32) -> Plan {
    Plan {
        id: "p".into(),
        title: "Property plan".into(),
        days,
        daily_minutes: 10,
        created_at: None,
        items: (1..=days)
            .map(|n| PlanDay {
                day_number: n,
                focus: format!("focus {n}"),
                steps: vec![],
                is_done: n < done_before,
            })
            .collect(),
    }
}

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap()
}

proptest! {
    #[test]
    fn completing_untracked_day_changes_nothing(
        days in 2u32..=10,
        tracked_seed in 0u32..10,
        completed_seed in 0u32..10,
    ) {
        let tracked = tracked_seed % days + 1;
        let completed = completed_seed % days + 1;
        prop_assume!(tracked != completed);

        runtime().block_on(async {
            let plans = Arc::new(MemoryPlanSource::new());
            let scheduler = Arc::new(MemoryScheduler::new());
            let store = Arc::new(MemoryReminderStore::new());
            let engine = ReminderEngine::new(
                plans.clone(),
                scheduler.clone(),
                store.clone(),
                RemindersConfig::default(),
            );
            plans.insert(plan(days, tracked));
            engine.enable_reminders("p").await.unwrap();

            let before = store.load("p").await.unwrap().unwrap();
            assert_eq!(before.day_number, tracked);
            scheduler.clear_calls();

            plans.set_done("p", completed, true);
            let event = engine.on_day_marked_done("p", completed).await.unwrap();

            assert!(matches!(event, ReminderEvent::RemindersUnchanged { .. }));
            assert!(scheduler.calls().is_empty());
            assert_eq!(store.load("p").await.unwrap().unwrap(), before);
        });
    }

    #[test]
    fn live_triggers_always_match_the_record(
        days in 1u32..=6,
        completions in proptest::collection::vec(1u32..=6, 0..12),
    ) {
        runtime().block_on(async {
            let plans = Arc::new(MemoryPlanSource::new());
            let scheduler = Arc::new(MemoryScheduler::new());
            let store = Arc::new(MemoryReminderStore::new());
            let engine = ReminderEngine::new(
                plans.clone(),
                scheduler.clone(),
                store.clone(),
                RemindersConfig::default(),
            );
            plans.insert(plan(days, 1));
            engine.enable_reminders("p").await.unwrap();

            for day in completions.into_iter().filter(|d| *d <= days) {
                plans.set_done("p", day, true);
                engine.on_day_marked_done("p", day).await.unwrap();

                let mut live = scheduler.live_ids();
                live.sort_by(|a, b| a.as_str().cmp(b.as_str()));
                let mut recorded = store
                    .load("p")
                    .await
                    .unwrap()
                    .map(|s| s.all_trigger_ids())
                    .unwrap_or_default();
                recorded.sort_by(|a, b| a.as_str().cmp(b.as_str()));
                assert_eq!(live, recorded);
            }
        });
    }
}

//! Notification text for a plan day.

use super::scheduler::{TimeOfDay, TriggerRequest};
use crate::plan::{Plan, PlanDay};
use crate::storage::RemindersConfig;

/// Body of the task reminders for `day`.
///
/// Uses the day's focus or first step, falling back to the plan title.
pub fn task_body(plan: &Plan, day: &PlanDay) -> String {
    match day.label() {
        Some(label) => label.to_string(),
        None => format!("Work on: {}", plan.title),
    }
}

pub fn task_title(day_number: u32) -> String {
    format!("Day {day_number} — time to slice")
}

pub fn grace_title(day_number: u32) -> String {
    format!("Day {day_number} — it's okay")
}

/// The full set of triggers wanted for `day`: task reminders first, then
/// the grace reminder.
pub fn desired_triggers(
    plan: &Plan,
    day: &PlanDay,
    config: &RemindersConfig,
) -> (Vec<TriggerRequest>, TriggerRequest) {
    let body = task_body(plan, day);
    let title = task_title(day.day_number);

    let mut times: Vec<TimeOfDay> = config.task_times.clone();
    times.sort();
    times.dedup();

    let tasks = times
        .into_iter()
        .map(|time| TriggerRequest {
            time,
            title: title.clone(),
            body: body.clone(),
        })
        .collect();

    let grace = TriggerRequest {
        time: config.grace_time,
        title: grace_title(day.day_number),
        body: config.grace_body.clone(),
    };

    (tasks, grace)
}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Every successful engine call produces an event describing the state
/// change. The UI renders it or shows the attached notice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ReminderEvent {
    RemindersEnabled {
        plan_id: String,
        day_number: u32,
        trigger_count: usize,
        at: DateTime<Utc>,
    },
    RemindersDisabled {
        plan_id: String,
        /// False when there was nothing to disable.
        had_reminders: bool,
        at: DateTime<Utc>,
    },
    RemindersAdvanced {
        plan_id: String,
        from_day: u32,
        to_day: u32,
        at: DateTime<Utc>,
    },
    /// The call was valid but did not change any reminder.
    RemindersUnchanged {
        plan_id: String,
        at: DateTime<Utc>,
    },
    PlanCompleted {
        plan_id: String,
        deselected: bool,
        at: DateTime<Utc>,
    },
    PlanSelected {
        plan_id: String,
        previous: Option<String>,
        /// Day the new reminders refer to, if they could be enabled.
        day_number: Option<u32>,
        /// Non-blocking notice when the selection took effect but
        /// reminders did not.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        notice: Option<String>,
        at: DateTime<Utc>,
    },
    PlanRemoved {
        plan_id: String,
        deselected: bool,
        at: DateTime<Utc>,
    },
    /// The active plan was found completed or missing and was cleared.
    SelectionCleared {
        plan_id: String,
        at: DateTime<Utc>,
    },
}

impl ReminderEvent {
    pub fn plan_id(&self) -> &str {
        match self {
            ReminderEvent::RemindersEnabled { plan_id, .. }
            | ReminderEvent::RemindersDisabled { plan_id, .. }
            | ReminderEvent::RemindersAdvanced { plan_id, .. }
            | ReminderEvent::RemindersUnchanged { plan_id, .. }
            | ReminderEvent::PlanCompleted { plan_id, .. }
            | ReminderEvent::PlanSelected { plan_id, .. }
            | ReminderEvent::PlanRemoved { plan_id, .. }
            | ReminderEvent::SelectionCleared { plan_id, .. } => plan_id,
        }
    }

    /// Notice the UI should surface, if any.
    pub fn notice(&self) -> Option<&str> {
        match self {
            ReminderEvent::PlanSelected { notice, .. } => notice.as_deref(),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_with_type_tag() {
        let event = ReminderEvent::RemindersAdvanced {
            plan_id: "p".into(),
            from_day: 1,
            to_day: 2,
            at: Utc::now(),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "RemindersAdvanced");
        assert_eq!(json["to_day"], 2);
        assert_eq!(event.plan_id(), "p");
    }

    #[test]
    fn selected_without_notice_omits_field() {
        let event = ReminderEvent::PlanSelected {
            plan_id: "p".into(),
            previous: None,
            day_number: Some(1),
            notice: None,
            at: Utc::now(),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert!(json.get("notice").is_none());
        assert!(event.notice().is_none());
    }
}

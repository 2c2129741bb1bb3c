//! OS notification scheduler capability.
//!
//! The engine only ever asks three things of the platform: permission,
//! "schedule a recurring daily trigger at this time of day", and "cancel
//! this trigger". Implementations wrap whatever the platform offers.

use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Local wall-clock time of day, minute precision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TimeOfDay {
    hour: u8,
    minute: u8,
}

impl TimeOfDay {
    /// Build a time of day, rejecting out-of-range values.
    pub fn new(hour: u8, minute: u8) -> Option<Self> {
        (hour < 24 && minute < 60).then_some(Self { hour, minute })
    }

    pub(crate) const fn new_unchecked(hour: u8, minute: u8) -> Self {
        Self { hour, minute }
    }

    pub fn hour(&self) -> u8 {
        self.hour
    }

    pub fn minute(&self) -> u8 {
        self.minute
    }
}

impl fmt::Display for TimeOfDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hour, self.minute)
    }
}

impl FromStr for TimeOfDay {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (h, m) = s
            .trim()
            .split_once(':')
            .ok_or_else(|| format!("expected HH:MM, got '{s}'"))?;
        let hour = h.parse::<u8>().map_err(|e| format!("bad hour '{h}': {e}"))?;
        let minute = m.parse::<u8>().map_err(|e| format!("bad minute '{m}': {e}"))?;
        TimeOfDay::new(hour, minute).ok_or_else(|| format!("time out of range: '{s}'"))
    }
}

impl TryFrom<String> for TimeOfDay {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<TimeOfDay> for String {
    fn from(value: TimeOfDay) -> Self {
        value.to_string()
    }
}

/// Opaque handle returned by the platform for a scheduled trigger.
///
/// Only equality is meaningful.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TriggerId(String);

impl TriggerId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TriggerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One recurring daily notification to register.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriggerRequest {
    pub time: TimeOfDay,
    pub title: String,
    pub body: String,
}

/// Platform failure while talking to the scheduler.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{0}")]
pub struct SchedulerError(pub String);

impl SchedulerError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// Capability wrapper around the platform notification scheduler.
#[async_trait]
pub trait TriggerScheduler: Send + Sync {
    /// Ask for permission to post notifications.
    ///
    /// Safe to call repeatedly; re-prompt policy belongs to the platform.
    async fn request_permission(&self) -> Result<bool, SchedulerError>;

    /// Register a trigger firing every day at `request.time`, local time,
    /// until cancelled.
    async fn schedule_daily(&self, request: &TriggerRequest) -> Result<TriggerId, SchedulerError>;

    /// Remove a trigger. Unknown or already-cancelled ids are a no-op.
    async fn cancel(&self, id: &TriggerId) -> Result<(), SchedulerError>;
}

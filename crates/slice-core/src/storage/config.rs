//! TOML-based application configuration.
//!
//! Stores user preferences including:
//! - Reminder times of day (three task reminders and one grace reminder)
//! - The bound applied to OS notification calls
//! - Plan service endpoint and request timeout
//!
//! Configuration is stored at `~/.config/slice/config.toml`.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::data_dir;
use crate::error::ConfigError;
use crate::reminders::TimeOfDay;

/// Reminder scheduling configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemindersConfig {
    /// Times of the daily task reminders.
    #[serde(default = "default_task_times")]
    pub task_times: Vec<TimeOfDay>,
    /// Time of the daily grace reminder.
    #[serde(default = "default_grace_time")]
    pub grace_time: TimeOfDay,
    /// Body of the grace reminder. Independent of plan content.
    #[serde(default = "default_grace_body")]
    pub grace_body: String,
    /// Upper bound for a single permission or scheduling call.
    #[serde(default = "default_os_timeout_secs")]
    pub os_timeout_secs: u64,
    /// Answer given by the local trigger ledger when no permission
    /// decision has been recorded yet.
    #[serde(default = "default_true")]
    pub auto_grant_permission: bool,
}

/// Remote plan service configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanServiceConfig {
    #[serde(default = "default_api_base")]
    pub api_base: String,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

/// Application configuration.
///
/// Serialized to/from TOML at `~/.config/slice/config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub reminders: RemindersConfig,
    #[serde(default)]
    pub plan_service: PlanServiceConfig,
}

fn default_task_times() -> Vec<TimeOfDay> {
    vec![
        TimeOfDay::new_unchecked(9, 0),
        TimeOfDay::new_unchecked(13, 0),
        TimeOfDay::new_unchecked(19, 0),
    ]
}
fn default_grace_time() -> TimeOfDay {
    TimeOfDay::new_unchecked(21, 30)
}
fn default_grace_body() -> String {
    "Didn't finish today? It's fine. Tomorrow we continue, same day until it's done.".into()
}
fn default_os_timeout_secs() -> u64 {
    30
}
fn default_true() -> bool {
    true
}
fn default_api_base() -> String {
    "http://localhost:8080".into()
}
fn default_request_timeout_secs() -> u64 {
    60
}

impl Default for RemindersConfig {
    fn default() -> Self {
        Self {
            task_times: default_task_times(),
            grace_time: default_grace_time(),
            grace_body: default_grace_body(),
            os_timeout_secs: default_os_timeout_secs(),
            auto_grant_permission: true,
        }
    }
}

impl Default for PlanServiceConfig {
    fn default() -> Self {
        Self {
            api_base: default_api_base(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

impl RemindersConfig {
    pub fn os_timeout(&self) -> Duration {
        Duration::from_secs(self.os_timeout_secs)
    }
}

impl PlanServiceConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl Config {
    fn get_json_value_by_path<'a>(
        root: &'a serde_json::Value,
        key: &str,
    ) -> Option<&'a serde_json::Value> {
        if key.is_empty() {
            return None;
        }

        let mut current = root;
        for part in key.split('.') {
            current = current.get(part)?;
        }
        Some(current)
    }

    fn set_json_value_by_path(
        root: &mut serde_json::Value,
        key: &str,
        value: &str,
    ) -> Result<(), ConfigError> {
        let unknown = || ConfigError::UnknownKey(key.to_string());
        let invalid = |message: String| ConfigError::InvalidValue {
            key: key.to_string(),
            message,
        };

        let mut parts = key.split('.').peekable();
        if parts.peek().is_none() || key.is_empty() {
            return Err(unknown());
        }

        let mut current = root;
        while let Some(part) = parts.next() {
            if parts.peek().is_none() {
                let obj = current.as_object_mut().ok_or_else(unknown)?;
                let existing = obj.get(part).ok_or_else(unknown)?;

                let new_value = match existing {
                    serde_json::Value::Bool(_) => serde_json::Value::Bool(
                        value.parse::<bool>().map_err(|e| invalid(e.to_string()))?,
                    ),
                    serde_json::Value::Number(_) => serde_json::Value::Number(
                        value
                            .parse::<u64>()
                            .map_err(|e| invalid(e.to_string()))?
                            .into(),
                    ),
                    serde_json::Value::Object(_) | serde_json::Value::Array(_) => {
                        serde_json::from_str(value).map_err(|e| invalid(e.to_string()))?
                    }
                    _ => serde_json::Value::String(value.into()),
                };

                obj.insert(part.to_string(), new_value);
                return Ok(());
            }

            current = current.get_mut(part).ok_or_else(unknown)?;
        }

        Err(unknown())
    }

    /// Location of the config file in the data directory.
    pub fn file_path() -> Result<PathBuf, ConfigError> {
        Ok(data_dir()?.join("config.toml"))
    }

    /// Load from disk or return (and write) the default.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be parsed,
    /// or if the default config cannot be written to disk.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::file_path()?)
    }

    /// Load from an explicit path, writing defaults if the file is missing.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(content) => toml::from_str(&content).map_err(|e| ConfigError::LoadFailed {
                path: path.to_path_buf(),
                message: e.to_string(),
            }),
            Err(_) => {
                let cfg = Self::default();
                cfg.save_to(path)?;
                Ok(cfg)
            }
        }
    }

    /// Persist to disk.
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&Self::file_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let save_failed = |message: String| ConfigError::SaveFailed {
            path: path.to_path_buf(),
            message,
        };
        let content = self.to_toml().map_err(|e| save_failed(e.to_string()))?;
        std::fs::write(path, content).map_err(|e| save_failed(e.to_string()))?;
        Ok(())
    }

    /// Render as the TOML written to disk.
    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }

    /// Get a config value as string by dot-separated key.
    pub fn get(&self, key: &str) -> Option<String> {
        let json = serde_json::to_value(self).ok()?;
        let val = Self::get_json_value_by_path(&json, key)?;
        match val {
            serde_json::Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    /// Set a config value by key in memory, validating the result.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is unknown or the value does not parse.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let mut json = serde_json::to_value(&*self).map_err(|e| ConfigError::InvalidValue {
            key: key.to_string(),
            message: e.to_string(),
        })?;
        Self::set_json_value_by_path(&mut json, key, value)?;
        let updated: Config =
            serde_json::from_value(json).map_err(|e| ConfigError::InvalidValue {
                key: key.to_string(),
                message: e.to_string(),
            })?;
        updated.validate()?;
        *self = updated;
        Ok(())
    }

    /// Reject configurations the reminder engine cannot work with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.reminders.task_times.is_empty() {
            return Err(ConfigError::InvalidValue {
                key: "reminders.task_times".into(),
                message: "at least one reminder time is required".into(),
            });
        }
        if self.reminders.os_timeout_secs == 0 {
            return Err(ConfigError::InvalidValue {
                key: "reminders.os_timeout_secs".into(),
                message: "must be greater than zero".into(),
            });
        }
        url::Url::parse(&self.plan_service.api_base).map_err(|e| ConfigError::InvalidValue {
            key: "plan_service.api_base".into(),
            message: e.to_string(),
        })?;
        Ok(())
    }

    /// Load from disk, returning default on error.
    /// This is a convenience method that never fails.
    pub fn load_or_default() -> Self {
        Self::load().unwrap_or_default()
    }
}

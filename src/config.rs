//! Engine configuration

use std::path::Path;

use chrono::Duration;
use serde::{Deserialize, Serialize};

use crate::agent::AgentId;
use crate::error::{EngineError, EngineResult};
use crate::message_log::DEFAULT_LOG_CAPACITY;

/// Longest accepted workload alert deadline, one week
pub const MAX_ALERT_DEADLINE_MINUTES: i64 = 7 * 24 * 60;

/// Tunables and well-known agent ids
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EngineConfig {
    /// Load ratio at which an agent counts as overloaded
    pub overload_threshold: f64,
    /// Fraction of overloaded working agents that triggers a workload alert
    pub emergency_threshold: f64,
    /// Messages retained by the log
    pub log_capacity: usize,
    /// Receives task planning requests
    pub sprint_manager_id: AgentId,
    /// Receives progress tracking requests
    pub project_tracker_id: AgentId,
    /// Domain-level agent included in every emergency broadcast
    pub master_control_id: AgentId,
    /// Sender of system-generated messages
    pub system_sender_id: AgentId,
    pub workload_alert_deadline_minutes: i64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            overload_threshold: 0.8,
            emergency_threshold: 0.5,
            log_capacity: DEFAULT_LOG_CAPACITY,
            sprint_manager_id: AgentId::from("sprint-manager"),
            project_tracker_id: AgentId::from("project-tracker"),
            master_control_id: AgentId::from("master-control"),
            system_sender_id: AgentId::from("workload-monitor"),
            workload_alert_deadline_minutes: 120,
        }
    }
}

impl EngineConfig {
    pub fn from_json_str(json: &str) -> EngineResult<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| EngineError::ConfigError(format!("invalid config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> EngineResult<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .map_err(|e| EngineError::ConfigError(format!("{}: {e}", path.display())))?;
        Self::from_json_str(&json)
    }

    pub fn validate(&self) -> EngineResult<()> {
        for (name, value) in [
            ("overloadThreshold", self.overload_threshold),
            ("emergencyThreshold", self.emergency_threshold),
        ] {
            if !(value > 0.0 && value <= 1.0) {
                return Err(EngineError::ConfigError(format!(
                    "{name} must be in (0, 1], got {value}"
                )));
            }
        }
        if self.log_capacity == 0 {
            return Err(EngineError::ConfigError("logCapacity must be positive".to_string()));
        }
        if !(1..=MAX_ALERT_DEADLINE_MINUTES).contains(&self.workload_alert_deadline_minutes) {
            return Err(EngineError::ConfigError(format!(
                "workloadAlertDeadlineMinutes must be in 1..={MAX_ALERT_DEADLINE_MINUTES}, got {}",
                self.workload_alert_deadline_minutes
            )));
        }
        Ok(())
    }

    /// Respond-by window for workload alerts
    pub fn workload_alert_window(&self) -> EngineResult<Duration> {
        Duration::try_minutes(self.workload_alert_deadline_minutes)
            .filter(|window| *window > Duration::zero())
            .ok_or_else(|| {
                EngineError::ConfigError(format!(
                    "workloadAlertDeadlineMinutes out of range: {}",
                    self.workload_alert_deadline_minutes
                ))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.overload_threshold, 0.8);
        assert_eq!(config.emergency_threshold, 0.5);
        assert_eq!(config.log_capacity, 1000);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config = EngineConfig::from_json_str(r#"{"overloadThreshold": 0.9}"#).unwrap();
        assert_eq!(config.overload_threshold, 0.9);
        assert_eq!(config.emergency_threshold, 0.5);
        assert_eq!(config.sprint_manager_id, AgentId::from("sprint-manager"));
    }

    #[test]
    fn test_rejects_bad_thresholds() {
        assert!(EngineConfig::from_json_str(r#"{"emergencyThreshold": 1.5}"#).is_err());
        assert!(EngineConfig::from_json_str(r#"{"overloadThreshold": 0}"#).is_err());
        assert!(EngineConfig::from_json_str(r#"{"logCapacity": 0}"#).is_err());
        assert!(EngineConfig::from_json_str("not json").is_err());
    }

    #[test]
    fn test_rejects_out_of_range_alert_deadline() {
        assert!(EngineConfig::from_json_str(r#"{"workloadAlertDeadlineMinutes": 0}"#).is_err());
        assert!(EngineConfig::from_json_str(r#"{"workloadAlertDeadlineMinutes": 10081}"#).is_err());
        let huge = format!(r#"{{"workloadAlertDeadlineMinutes": {}}}"#, i64::MAX);
        assert!(matches!(
            EngineConfig::from_json_str(&huge),
            Err(EngineError::ConfigError(_))
        ));

        let week = EngineConfig::from_json_str(r#"{"workloadAlertDeadlineMinutes": 10080}"#).unwrap();
        assert_eq!(week.workload_alert_deadline_minutes, MAX_ALERT_DEADLINE_MINUTES);
    }

    #[test]
    fn test_alert_window_never_panics() {
        let config = EngineConfig { workload_alert_deadline_minutes: i64::MAX, ..EngineConfig::default() };
        assert!(config.workload_alert_window().is_err());

        let config = EngineConfig { workload_alert_deadline_minutes: -5, ..EngineConfig::default() };
        assert!(config.workload_alert_window().is_err());

        assert_eq!(EngineConfig::default().workload_alert_window().unwrap(), Duration::minutes(120));
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"logCapacity": 50}}"#).unwrap();
        let config = EngineConfig::from_file(file.path()).unwrap();
        assert_eq!(config.log_capacity, 50);

        assert!(EngineConfig::from_file("/nonexistent/engine.json").is_err());
    }
}

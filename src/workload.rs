//! Workload monitor - overload detection over the working tiers

use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{info, instrument, warn};

use crate::agent::{AgentId, AgentLevel};
use crate::engine::Engine;
use crate::error::EngineResult;
use crate::message::{MessageBuilder, MessageType, Priority};

/// Outcome of one workload scan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkloadReport {
    pub overloaded_agents: Vec<AgentId>,
    /// Share of scanned agents that are overloaded, 0-100
    pub percentage: f64,
    pub emergency_required: bool,
}

impl Engine {
    /// Scan Layer and Expert agents; raise a workload alert to the CEO when
    /// the overloaded share reaches the emergency threshold.
    ///
    /// Agents without metrics are scanned but never count as overloaded.
    #[instrument(skip(self))]
    pub fn check_workload_balance(&mut self) -> EngineResult<WorkloadReport> {
        let overload = self.config.overload_threshold;
        let emergency = self.config.emergency_threshold;

        let scanned: Vec<_> = [AgentLevel::Layer, AgentLevel::Expert]
            .into_iter()
            .flat_map(|level| self.directory.by_level(level))
            .collect();
        let overloaded_agents: Vec<AgentId> = scanned
            .iter()
            .filter(|a| a.is_overloaded(overload))
            .map(|a| a.id.clone())
            .collect();

        let fraction = if scanned.is_empty() {
            0.0
        } else {
            overloaded_agents.len() as f64 / scanned.len() as f64
        };
        let percentage = fraction * 100.0;
        let emergency_required = !scanned.is_empty() && fraction >= emergency;

        info!(
            scanned = scanned.len(),
            overloaded = overloaded_agents.len(),
            percentage,
            "Workload scan complete"
        );

        if emergency_required {
            warn!(percentage, threshold = emergency, "Workload emergency");

            let ceo = self.ceo_id()?;
            let deadline = self.now() + self.config.workload_alert_window()?;
            let builder = MessageBuilder::new(
                MessageType::WorkloadAlert,
                self.config.system_sender_id.clone(),
                format!("Workload emergency: {percentage:.0}% of agents overloaded"),
            )
            .to([ceo])
            .priority(Priority::Critical)
            .body(format!(
                "{} of {} working agents are at or above {:.0}% capacity",
                overloaded_agents.len(),
                scanned.len(),
                overload * 100.0
            ))
            .context("overloadedAgents", json!(overloaded_agents))
            .context("percentage", json!(percentage))
            .context("threshold", json!(emergency))
            .respond_by(deadline);

            self.commit(builder)?;
        }

        Ok(WorkloadReport {
            overloaded_agents,
            percentage,
            emergency_required,
        })
    }
}

//! Escalation, collaboration and consultation flows

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{instrument, warn};

use crate::agent::{AgentId, AgentLevel, AgentMetrics};
use crate::authority::Action;
use crate::deadline::deadline;
use crate::engine::Engine;
use crate::error::{EngineError, EngineResult};
use crate::knowledge::KnowledgeEntry;
use crate::message::{Message, MessageBuilder, MessageType, Priority};

/// Fallback response windows (minutes) used for `Low` priority
pub(crate) const CHIEF_ESCALATION_MINUTES: i64 = 60;
pub(crate) const PEER_MINUTES: i64 = 30;
pub(crate) const CONSULTATION_MINUTES: i64 = 60;
pub(crate) const PLANNING_MINUTES: i64 = 60;
pub(crate) const DIRECTIVE_MINUTES: i64 = 120;
pub(crate) const EMERGENCY_MINUTES: i64 = 5;

/// A blocked agent asking its chief for help
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EscalationRequest {
    pub agent_id: AgentId,
    pub issue: String,
    #[serde(default)]
    pub attempted_solutions: Vec<String>,
    pub blocking_issue: String,
    pub impact: String,
    #[serde(default)]
    pub priority: Priority,
}

/// A Chief or Domain coordinator escalating to the CEO
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CeoEscalation {
    pub agent_id: AgentId,
    pub issue: String,
    pub business_impact: String,
    #[serde(default)]
    pub recommendation: Option<String>,
    pub deadline: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PeerRequest {
    pub from: AgentId,
    pub to: AgentId,
    pub request: String,
    #[serde(default)]
    pub details: String,
    #[serde(default)]
    pub priority: Priority,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsultationRequest {
    pub agent_id: AgentId,
    pub question: String,
    pub expertise: Vec<String>,
    #[serde(default)]
    pub background: String,
    #[serde(default)]
    pub priority: Priority,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskPlanningRequest {
    pub agent_id: AgentId,
    pub objective: String,
    #[serde(default)]
    pub tasks: Vec<String>,
    #[serde(default)]
    pub constraints: Vec<String>,
    #[serde(default)]
    pub target_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressTrackingRequest {
    pub agent_id: AgentId,
    pub project: String,
    #[serde(default)]
    pub milestones: Vec<String>,
    #[serde(default)]
    pub status: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DirectiveRequest {
    pub from: AgentId,
    pub subject: String,
    pub body: String,
    #[serde(default)]
    pub priority: Priority,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmergencyRequest {
    pub triggered_by: AgentId,
    pub reason: String,
    pub severity: Severity,
    pub action: String,
    /// Agents whose sub-trees are affected; empty means the whole organisation
    #[serde(default)]
    pub affected_scope: Vec<AgentId>,
}

/// Record of one emergency intervention, paired with its message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmergencyProtocol {
    pub triggered: bool,
    pub reason: String,
    pub affected_agents: BTreeSet<AgentId>,
    pub severity: Severity,
    pub action: String,
    pub coordinator: AgentId,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EmergencyResponse {
    pub message: Message,
    pub protocol: EmergencyProtocol,
}

impl Engine {
    /// Route a blocked agent's request to its chief
    #[instrument(skip(self, request), fields(agent_id = %request.agent_id))]
    pub fn escalate_to_chief(&mut self, request: EscalationRequest) -> EngineResult<Message> {
        let sender = self.authority.authorize(
            &self.directory,
            Action::EscalateToChief,
            &request.agent_id,
            None,
        )?;
        let navigator = self.navigator();
        let chief = navigator.find_chief(&sender.id)?;
        let path = match navigator.hierarchy_path(&sender.id) {
            Ok(path) => path,
            Err(error) => {
                warn!(
                    agent_id = %sender.id,
                    chief = %chief.id,
                    %error,
                    "Reporting chain broken above chief"
                );
                Vec::new()
            }
        };

        let builder = MessageBuilder::new(
            MessageType::Escalation,
            sender.id.clone(),
            format!("Escalation: {}", request.issue),
        )
        .to([chief.id.clone()])
        .priority(request.priority)
        .body(format!(
            "{} is blocked by: {}\nAttempted: {}\nImpact: {}",
            sender.name,
            request.blocking_issue,
            request.attempted_solutions.join(", "),
            request.impact
        ))
        .context("escalationLevel", json!("chief"))
        .context("issue", json!(request.issue))
        .context("attemptedSolutions", json!(request.attempted_solutions))
        .context("blockingIssue", json!(request.blocking_issue))
        .context("impact", json!(request.impact))
        .context("hierarchyPath", json!(path))
        .respond_by(deadline(request.priority, CHIEF_ESCALATION_MINUTES, self.now()));

        self.commit(builder)
    }

    /// Escalate a division-level issue to the CEO
    #[instrument(skip(self, data), fields(agent_id = %data.agent_id))]
    pub fn escalate_to_ceo(&mut self, data: CeoEscalation) -> EngineResult<Message> {
        let sender = self.authority.authorize(
            &self.directory,
            Action::EscalateToCeo,
            &data.agent_id,
            None,
        )?;
        let ceo = self.ceo_id()?;

        let builder = MessageBuilder::new(
            MessageType::Escalation,
            sender.id.clone(),
            format!("CEO escalation: {}", data.issue),
        )
        .to([ceo])
        .priority(Priority::Critical)
        .body(format!("{}\nBusiness impact: {}", data.issue, data.business_impact))
        .context("escalationLevel", json!("ceo"))
        .context("senderLevel", json!(sender.level))
        .context("issue", json!(data.issue))
        .context("businessImpact", json!(data.business_impact))
        .context("recommendation", json!(data.recommendation))
        .respond_by(data.deadline);

        self.commit(builder)
    }

    /// Ask a peer for help
    #[instrument(skip(self, request), fields(from = %request.from, to = %request.to))]
    pub fn peer_collaboration(&mut self, request: PeerRequest) -> EngineResult<Message> {
        if request.from == request.to {
            return Err(EngineError::InvalidPeerRelationship {
                from: request.from,
                to: request.to,
            });
        }
        let sender = self.authority.authorize(
            &self.directory,
            Action::PeerCollaborate,
            &request.from,
            Some(&request.to),
        )?;

        let builder = MessageBuilder::new(
            MessageType::PeerCollaboration,
            sender.id.clone(),
            format!("Collaboration request: {}", request.request),
        )
        .to([request.to.clone()])
        .priority(request.priority)
        .body(request.details.clone())
        .context("request", json!(request.request))
        .respond_by(deadline(request.priority, PEER_MINUTES, self.now()));

        self.commit(builder)
    }

    /// Ask every expert whose expertise matches the requested tags
    #[instrument(skip(self, request), fields(agent_id = %request.agent_id))]
    pub fn consult_expert(&mut self, request: ConsultationRequest) -> EngineResult<Message> {
        let sender = self.authority.authorize(
            &self.directory,
            Action::ConsultExpert,
            &request.agent_id,
            None,
        )?;
        let experts = self.matching_experts(&request.expertise, &sender.id)?;

        let builder = MessageBuilder::new(
            MessageType::Consultation,
            sender.id.clone(),
            format!("Consultation: {}", request.question),
        )
        .to(experts.iter().cloned())
        .priority(request.priority)
        .body(request.background.clone())
        .context("question", json!(request.question))
        .context("expertise", json!(request.expertise))
        .context("matchedExperts", json!(experts))
        .respond_by(deadline(request.priority, CONSULTATION_MINUTES, self.now()));

        self.commit(builder)
    }

    /// Broadcast a knowledge entry and index it
    #[instrument(skip(self, entry), fields(from = %entry.from, kind = %entry.knowledge_type))]
    pub fn share_knowledge(&mut self, entry: KnowledgeEntry) -> EngineResult<Message> {
        let sender = self.authority.authorize(
            &self.directory,
            Action::ShareKnowledge,
            &entry.from,
            None,
        )?;
        let recipients =
            self.knowledge_recipients(&sender.id, entry.relevant_agents.as_deref(), entry.tags())?;

        let builder = MessageBuilder::new(
            MessageType::KnowledgeShare,
            sender.id.clone(),
            format!("Knowledge: {}", entry.title),
        )
        .to(recipients)
        .priority(Priority::Low)
        .body(entry.content.clone())
        .context("knowledgeType", json!(entry.knowledge_type))
        .context("title", json!(entry.title))
        .context("tags", json!(entry.tags()));

        let message = self.commit(builder)?;
        self.knowledge.insert(entry);
        Ok(message)
    }

    /// Hand an objective to the sprint manager for breakdown
    #[instrument(skip(self, request), fields(agent_id = %request.agent_id))]
    pub fn request_task_planning(&mut self, request: TaskPlanningRequest) -> EngineResult<Message> {
        let sender = self.authority.authorize(
            &self.directory,
            Action::RequestTaskPlanning,
            &request.agent_id,
            None,
        )?;
        let planner = self.specialist(&self.config.sprint_manager_id, "sprint manager")?;

        let builder = MessageBuilder::new(
            MessageType::TaskPlanning,
            sender.id.clone(),
            format!("Task planning: {}", request.objective),
        )
        .to([planner])
        .priority(Priority::High)
        .body(request.tasks.join("\n"))
        .context("objective", json!(request.objective))
        .context("tasks", json!(request.tasks))
        .context("constraints", json!(request.constraints))
        .context("targetDate", json!(request.target_date))
        .respond_by(deadline(Priority::High, PLANNING_MINUTES, self.now()));

        self.commit(builder)
    }

    /// Ask the project tracker to follow a project
    #[instrument(skip(self, request), fields(agent_id = %request.agent_id))]
    pub fn request_progress_tracking(
        &mut self,
        request: ProgressTrackingRequest,
    ) -> EngineResult<Message> {
        let sender = self.directory.get(&request.agent_id)?;
        let tracker = self.specialist(&self.config.project_tracker_id, "project tracker")?;

        let builder = MessageBuilder::new(
            MessageType::ProgressTracking,
            sender.id.clone(),
            format!("Progress tracking: {}", request.project),
        )
        .to([tracker])
        .priority(Priority::Medium)
        .body(request.milestones.join("\n"))
        .context("project", json!(request.project))
        .context("milestones", json!(request.milestones))
        .context("status", json!(request.status))
        .respond_by(deadline(Priority::Medium, PLANNING_MINUTES, self.now()));

        self.commit(builder)
    }

    /// Issue a directive to everyone the sender manages
    #[instrument(skip(self, request), fields(from = %request.from))]
    pub fn issue_directive(&mut self, request: DirectiveRequest) -> EngineResult<Message> {
        let sender = self.authority.authorize(
            &self.directory,
            Action::IssueDirective,
            &request.from,
            None,
        )?;
        if sender.manages.is_empty() {
            return Err(EngineError::NoRecipients(format!("{} manages nobody", sender.id)));
        }

        let builder = MessageBuilder::new(MessageType::Directive, sender.id.clone(), request.subject)
            .to(sender.manages.iter().cloned())
            .priority(request.priority)
            .body(request.body)
            .respond_by(deadline(request.priority, DIRECTIVE_MINUTES, self.now()));

        self.commit(builder)
    }

    /// Record fresh metrics and report them to the agent's superior
    #[instrument(skip(self, metrics))]
    pub fn report_performance(
        &mut self,
        agent_id: &AgentId,
        metrics: AgentMetrics,
    ) -> EngineResult<Message> {
        let superior = self.superior_of(agent_id)?;
        let payload = serde_json::to_value(&metrics)
            .map_err(|e| EngineError::ConfigError(format!("unserializable metrics: {e}")))?;

        let builder = MessageBuilder::new(
            MessageType::PerformanceUpdate,
            agent_id.clone(),
            format!("Performance update from {agent_id}"),
        )
        .to([superior])
        .priority(Priority::Low)
        .metrics(payload);

        self.directory.update_metrics(agent_id, metrics)?;
        self.commit(builder)
    }

    /// Broadcast an emergency to the CEO, master control and every Chief.
    ///
    /// Never gated by authority: any caller may raise an emergency.
    #[instrument(skip(self, request), fields(triggered_by = %request.triggered_by))]
    pub fn emergency_intervention(&mut self, request: EmergencyRequest) -> EngineResult<EmergencyResponse> {
        let coordinator = self.ceo_id()?;
        let recipients = self.emergency_recipients()?;
        let affected_agents = self.affected_agents(&request.affected_scope);

        let protocol = EmergencyProtocol {
            triggered: true,
            reason: request.reason.clone(),
            affected_agents,
            severity: request.severity,
            action: request.action.clone(),
            coordinator,
        };

        warn!(
            reason = %protocol.reason,
            severity = ?protocol.severity,
            affected = protocol.affected_agents.len(),
            "Emergency protocol triggered"
        );

        let builder = MessageBuilder::new(
            MessageType::Emergency,
            request.triggered_by.clone(),
            format!("EMERGENCY: {}", request.reason),
        )
        .to(recipients)
        .priority(Priority::Emergency)
        .body(format!("Required action: {}", request.action))
        .context("protocol", json!(protocol))
        .respond_by(deadline(Priority::Emergency, EMERGENCY_MINUTES, self.now()));

        let message = self.commit(builder)?;
        self.protocols.push(protocol.clone());
        Ok(EmergencyResponse { message, protocol })
    }

    pub(crate) fn ceo_id(&self) -> EngineResult<AgentId> {
        self.directory
            .ceo()
            .map(|a| a.id.clone())
            .ok_or_else(|| EngineError::NoRecipients("no CEO registered".to_string()))
    }

    pub(crate) fn emergency_recipients(&self) -> EngineResult<BTreeSet<AgentId>> {
        let mut recipients = BTreeSet::from([self.ceo_id()?]);
        if self.directory.contains(&self.config.master_control_id) {
            recipients.insert(self.config.master_control_id.clone());
        } else {
            warn!(
                master_control = %self.config.master_control_id,
                "Master control not registered, emergency goes to CEO and chiefs only"
            );
        }
        recipients.extend(
            self.directory
                .by_level(AgentLevel::Chief)
                .into_iter()
                .map(|a| a.id.clone()),
        );
        Ok(recipients)
    }

    pub(crate) fn matching_experts(&self, tags: &[String], sender: &AgentId) -> EngineResult<Vec<AgentId>> {
        let experts: Vec<AgentId> = self
            .directory
            .by_level(AgentLevel::Expert)
            .into_iter()
            .filter(|e| &e.id != sender && e.has_expertise_in(tags))
            .map(|e| e.id.clone())
            .collect();

        if experts.is_empty() {
            return Err(EngineError::NoRecipients(format!(
                "no expert covers {}",
                tags.join(", ")
            )));
        }
        Ok(experts)
    }

    /// Explicit recipients, else agents matching the tags, else every Chief
    pub(crate) fn knowledge_recipients(
        &self,
        sender: &AgentId,
        explicit: Option<&[AgentId]>,
        tags: &[String],
    ) -> EngineResult<Vec<AgentId>> {
        if let Some(explicit) = explicit.filter(|e| !e.is_empty()) {
            for id in explicit {
                self.directory.get(id)?;
            }
            return Ok(explicit.to_vec());
        }

        let by_tags: Vec<AgentId> = self
            .directory
            .all()
            .into_iter()
            .filter(|a| &a.id != sender && (a.has_expertise_in(tags) || a.domain_matches(tags)))
            .map(|a| a.id.clone())
            .collect();
        if !by_tags.is_empty() {
            return Ok(by_tags);
        }

        let chiefs: Vec<AgentId> = self
            .directory
            .by_level(AgentLevel::Chief)
            .into_iter()
            .filter(|a| &a.id != sender)
            .map(|a| a.id.clone())
            .collect();
        if chiefs.is_empty() {
            return Err(EngineError::NoRecipients("no agent to share knowledge with".to_string()));
        }
        Ok(chiefs)
    }

    pub(crate) fn specialist(&self, id: &AgentId, role: &str) -> EngineResult<AgentId> {
        if self.directory.contains(id) {
            Ok(id.clone())
        } else {
            Err(EngineError::NoRecipients(format!("{role} {id} is not registered")))
        }
    }

    pub(crate) fn superior_of(&self, id: &AgentId) -> EngineResult<AgentId> {
        let agent = self.directory.get(id)?;
        agent
            .reports_to
            .as_ref()
            .filter(|s| self.directory.contains(s))
            .cloned()
            .ok_or_else(|| EngineError::NoRecipients(format!("{id} has no superior")))
    }

    /// Scope plus everyone below it; the whole organisation for an empty scope
    fn affected_agents(&self, scope: &[AgentId]) -> BTreeSet<AgentId> {
        if scope.is_empty() {
            return self.directory.all().into_iter().map(|a| a.id.clone()).collect();
        }

        let mut affected = BTreeSet::new();
        let mut pending: Vec<AgentId> = scope.to_vec();
        while let Some(id) = pending.pop() {
            let Some(agent) = self.directory.find(&id) else {
                continue;
            };
            if affected.insert(id) {
                pending.extend(agent.manages.iter().cloned());
            }
        }
        affected
    }
}

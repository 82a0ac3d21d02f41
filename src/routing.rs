//! Generic dispatcher: derive recipients for a loosely-addressed intent

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, instrument};

use crate::agent::{AgentId, AgentLevel};
use crate::authority::Action;
use crate::deadline::deadline;
use crate::engine::Engine;
use crate::error::{EngineError, EngineResult};
use crate::escalation::{
    CHIEF_ESCALATION_MINUTES, CONSULTATION_MINUTES, DIRECTIVE_MINUTES, EMERGENCY_MINUTES,
    PEER_MINUTES, PLANNING_MINUTES,
};
use crate::knowledge::{KnowledgeEntry, KnowledgeType};
use crate::message::{Message, MessageBuilder, MessageType, Priority};

/// A message whose type and sender are known but whose addressing is not.
///
/// `to` is only honoured for peer collaboration and knowledge sharing; every
/// other type re-derives its recipients.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageIntent {
    #[serde(rename = "type")]
    pub message_type: MessageType,
    pub from: AgentId,
    #[serde(default)]
    pub to: Vec<AgentId>,
    pub subject: String,
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub priority: Option<Priority>,
    #[serde(default)]
    pub context: Map<String, Value>,
}

impl MessageIntent {
    pub fn new(message_type: MessageType, from: impl Into<AgentId>, subject: impl Into<String>) -> Self {
        Self {
            message_type,
            from: from.into(),
            to: Vec::new(),
            subject: subject.into(),
            body: String::new(),
            priority: None,
            context: Map::new(),
        }
    }

    pub fn to(mut self, recipient: impl Into<AgentId>) -> Self {
        self.to.push(recipient.into());
        self
    }

    pub fn priority(mut self, priority: Priority) -> Self {
        self.priority = Some(priority);
        self
    }

    pub fn context(mut self, key: impl Into<String>, value: Value) -> Self {
        self.context.insert(key.into(), value);
        self
    }

    /// String array under `key` in the context
    fn context_tags(&self, key: &str) -> Vec<String> {
        self.context
            .get(key)
            .and_then(Value::as_array)
            .map(|values| {
                values
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Knowledge base record for a routed knowledge share
    fn knowledge_entry(&self) -> KnowledgeEntry {
        let knowledge_type = self
            .context
            .get("knowledgeType")
            .and_then(|value| serde_json::from_value(value.clone()).ok())
            .unwrap_or(KnowledgeType::BestPractice);
        let title = self
            .context
            .get("title")
            .and_then(Value::as_str)
            .unwrap_or(&self.subject);

        let entry = KnowledgeEntry::new(self.from.clone(), knowledge_type, title, self.body.clone())
            .with_tags(self.context_tags("tags"));
        if self.to.is_empty() {
            entry
        } else {
            entry.with_relevant_agents(self.to.clone())
        }
    }
}

/// Resolved addressing for an intent
struct Route {
    recipients: Vec<AgentId>,
    priority: Priority,
    deadline: Option<DateTime<Utc>>,
}

impl Engine {
    /// Address and commit an intent using the same rules as the dedicated
    /// operations
    #[instrument(skip(self, intent), fields(message_type = %intent.message_type, from = %intent.from))]
    pub fn route_message(&mut self, intent: MessageIntent) -> EngineResult<Message> {
        let route = self.resolve_route(&intent)?;
        debug!(recipients = route.recipients.len(), priority = %route.priority, "Routed intent");
        let entry = matches!(intent.message_type, MessageType::KnowledgeShare)
            .then(|| intent.knowledge_entry());

        let mut builder = MessageBuilder::new(intent.message_type, intent.from, intent.subject)
            .to(route.recipients)
            .priority(route.priority)
            .body(intent.body)
            .context_map(intent.context);
        if let Some(deadline) = route.deadline {
            builder = builder.respond_by(deadline);
        }

        let message = self.commit(builder)?;
        if let Some(entry) = entry {
            self.knowledge.insert(entry);
        }
        Ok(message)
    }

    fn resolve_route(&self, intent: &MessageIntent) -> EngineResult<Route> {
        let now = self.now();
        let from = &intent.from;
        let requested = intent.priority.unwrap_or_default();

        let route = match intent.message_type {
            MessageType::Escalation => {
                let sender = self.directory.get(from)?;
                if matches!(sender.level, AgentLevel::Chief | AgentLevel::Domain) {
                    self.authority.authorize(&self.directory, Action::EscalateToCeo, from, None)?;
                    Route {
                        recipients: vec![self.ceo_id()?],
                        priority: Priority::Critical,
                        deadline: Some(deadline(Priority::Critical, CHIEF_ESCALATION_MINUTES, now)),
                    }
                } else {
                    self.authority.authorize(&self.directory, Action::EscalateToChief, from, None)?;
                    let chief = self.navigator().find_chief(from)?;
                    Route {
                        recipients: vec![chief.id.clone()],
                        priority: requested,
                        deadline: Some(deadline(requested, CHIEF_ESCALATION_MINUTES, now)),
                    }
                }
            }
            MessageType::PeerCollaboration => {
                if intent.to.is_empty() {
                    return Err(EngineError::NoRecipients(
                        "peer collaboration needs an explicit recipient".to_string(),
                    ));
                }
                for peer in &intent.to {
                    if peer == from {
                        return Err(EngineError::InvalidPeerRelationship {
                            from: from.clone(),
                            to: peer.clone(),
                        });
                    }
                    self.authority
                        .authorize(&self.directory, Action::PeerCollaborate, from, Some(peer))?;
                }
                Route {
                    recipients: intent.to.clone(),
                    priority: requested,
                    deadline: Some(deadline(requested, PEER_MINUTES, now)),
                }
            }
            MessageType::Directive => {
                let sender = self
                    .authority
                    .authorize(&self.directory, Action::IssueDirective, from, None)?;
                Route {
                    recipients: sender.manages.iter().cloned().collect(),
                    priority: requested,
                    deadline: Some(deadline(requested, DIRECTIVE_MINUTES, now)),
                }
            }
            MessageType::Consultation => {
                self.authority.authorize(&self.directory, Action::ConsultExpert, from, None)?;
                Route {
                    recipients: self.matching_experts(&intent.context_tags("expertise"), from)?,
                    priority: requested,
                    deadline: Some(deadline(requested, CONSULTATION_MINUTES, now)),
                }
            }
            MessageType::KnowledgeShare => {
                self.authority.authorize(&self.directory, Action::ShareKnowledge, from, None)?;
                let explicit = (!intent.to.is_empty()).then_some(intent.to.as_slice());
                Route {
                    recipients: self.knowledge_recipients(from, explicit, &intent.context_tags("tags"))?,
                    priority: Priority::Low,
                    deadline: None,
                }
            }
            MessageType::TaskPlanning => {
                self.authority
                    .authorize(&self.directory, Action::RequestTaskPlanning, from, None)?;
                Route {
                    recipients: vec![self.specialist(&self.config.sprint_manager_id, "sprint manager")?],
                    priority: Priority::High,
                    deadline: Some(deadline(Priority::High, PLANNING_MINUTES, now)),
                }
            }
            MessageType::ProgressTracking => {
                self.directory.get(from)?;
                Route {
                    recipients: vec![self.specialist(&self.config.project_tracker_id, "project tracker")?],
                    priority: Priority::Medium,
                    deadline: Some(deadline(Priority::Medium, PLANNING_MINUTES, now)),
                }
            }
            MessageType::Emergency => Route {
                recipients: self.emergency_recipients()?.into_iter().collect(),
                priority: Priority::Emergency,
                deadline: Some(deadline(Priority::Emergency, EMERGENCY_MINUTES, now)),
            },
            MessageType::WorkloadAlert => Route {
                recipients: vec![self.ceo_id()?],
                priority: Priority::Critical,
                deadline: Some(now + self.config.workload_alert_window()?),
            },
            MessageType::PerformanceUpdate => Route {
                recipients: vec![self.superior_of(from)?],
                priority: Priority::Low,
                deadline: None,
            },
        };

        if route.recipients.is_empty() {
            return Err(EngineError::NoRecipients(format!(
                "no recipients for {} from {}",
                intent.message_type, from
            )));
        }
        Ok(route)
    }
}

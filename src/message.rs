//! Message model - the structured unit exchanged between agents

use std::collections::BTreeSet;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::agent::AgentId;
use crate::error::{EngineError, EngineResult};

/// Unique message identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageId(Uuid);

impl MessageId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for MessageId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "msg_{}", self.0.simple())
    }
}

/// Kind of protocol message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageType {
    Escalation,
    PeerCollaboration,
    Directive,
    Consultation,
    PerformanceUpdate,
    Emergency,
    WorkloadAlert,
    KnowledgeShare,
    TaskPlanning,
    ProgressTracking,
}

impl MessageType {
    pub const ALL: [MessageType; 10] = [
        MessageType::Escalation,
        MessageType::PeerCollaboration,
        MessageType::Directive,
        MessageType::Consultation,
        MessageType::PerformanceUpdate,
        MessageType::Emergency,
        MessageType::WorkloadAlert,
        MessageType::KnowledgeShare,
        MessageType::TaskPlanning,
        MessageType::ProgressTracking,
    ];
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MessageType::Escalation => "escalation",
            MessageType::PeerCollaboration => "peer_collaboration",
            MessageType::Directive => "directive",
            MessageType::Consultation => "consultation",
            MessageType::PerformanceUpdate => "performance_update",
            MessageType::Emergency => "emergency",
            MessageType::WorkloadAlert => "workload_alert",
            MessageType::KnowledgeShare => "knowledge_share",
            MessageType::TaskPlanning => "task_planning",
            MessageType::ProgressTracking => "progress_tracking",
        };
        f.write_str(name)
    }
}

/// Message urgency, lowest first
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
    Critical,
    Emergency,
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Priority::Low => "low",
            Priority::Medium => "medium",
            Priority::High => "high",
            Priority::Critical => "critical",
            Priority::Emergency => "emergency",
        };
        f.write_str(name)
    }
}

/// An immutable, fully-addressed message.
///
/// Only [`MessageBuilder`] creates messages, which guarantees a non-empty
/// recipient set and a deadline exactly when a response is required.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    message_id: MessageId,
    #[serde(rename = "type")]
    message_type: MessageType,
    priority: Priority,
    from: AgentId,
    to: BTreeSet<AgentId>,
    subject: String,
    body: String,
    context: Map<String, Value>,
    metrics: Option<Value>,
    timestamp: DateTime<Utc>,
    response_required: bool,
    response_deadline: Option<DateTime<Utc>>,
}

impl Message {
    pub fn id(&self) -> MessageId {
        self.message_id
    }

    pub fn message_type(&self) -> MessageType {
        self.message_type
    }

    pub fn priority(&self) -> Priority {
        self.priority
    }

    pub fn from(&self) -> &AgentId {
        &self.from
    }

    pub fn to(&self) -> &BTreeSet<AgentId> {
        &self.to
    }

    pub fn subject(&self) -> &str {
        &self.subject
    }

    pub fn body(&self) -> &str {
        &self.body
    }

    pub fn context(&self) -> &Map<String, Value> {
        &self.context
    }

    pub fn metrics(&self) -> Option<&Value> {
        self.metrics.as_ref()
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn response_required(&self) -> bool {
        self.response_required
    }

    pub fn response_deadline(&self) -> Option<DateTime<Utc>> {
        self.response_deadline
    }

    /// Whether the agent sent or receives this message
    pub fn involves(&self, agent: &AgentId) -> bool {
        &self.from == agent || self.to.contains(agent)
    }
}

/// Builder for [`Message`]
#[derive(Debug, Clone)]
pub struct MessageBuilder {
    message_type: MessageType,
    priority: Priority,
    from: AgentId,
    to: BTreeSet<AgentId>,
    subject: String,
    body: String,
    context: Map<String, Value>,
    metrics: Option<Value>,
    response_deadline: Option<DateTime<Utc>>,
}

impl MessageBuilder {
    pub fn new(message_type: MessageType, from: AgentId, subject: impl Into<String>) -> Self {
        Self {
            message_type,
            priority: Priority::default(),
            from,
            to: BTreeSet::new(),
            subject: subject.into(),
            body: String::new(),
            context: Map::new(),
            metrics: None,
            response_deadline: None,
        }
    }

    pub fn to<I>(mut self, recipients: I) -> Self
    where
        I: IntoIterator<Item = AgentId>,
    {
        self.to.extend(recipients);
        self
    }

    pub fn body(mut self, body: impl Into<String>) -> Self {
        self.body = body.into();
        self
    }

    pub fn priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    pub fn context(mut self, key: impl Into<String>, value: Value) -> Self {
        self.context.insert(key.into(), value);
        self
    }

    pub fn context_map(mut self, context: Map<String, Value>) -> Self {
        self.context.extend(context);
        self
    }

    pub fn metrics(mut self, metrics: Value) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Require a response by `deadline`
    pub fn respond_by(mut self, deadline: DateTime<Utc>) -> Self {
        self.response_deadline = Some(deadline);
        self
    }

    /// Finish the message, stamped at `now`
    pub fn build(self, now: DateTime<Utc>) -> EngineResult<Message> {
        if self.to.is_empty() {
            return Err(EngineError::NoRecipients(format!(
                "{} message from {} has no recipients",
                self.message_type, self.from
            )));
        }

        Ok(Message {
            message_id: MessageId::new(),
            message_type: self.message_type,
            priority: self.priority,
            from: self.from,
            to: self.to,
            subject: self.subject,
            body: self.body,
            context: self.context,
            metrics: self.metrics,
            timestamp: now,
            response_required: self.response_deadline.is_some(),
            response_deadline: self.response_deadline,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::now;
    use chrono::Duration;
    use serde_json::json;

    #[test]
    fn test_priority_ordering() {
        assert!(Priority::Low < Priority::Medium);
        assert!(Priority::Critical < Priority::Emergency);
        assert_eq!(Priority::default(), Priority::Medium);
    }

    #[test]
    fn test_build_with_deadline() {
        let at = now();
        let message = MessageBuilder::new(MessageType::Escalation, "l1".into(), "Blocked")
            .to([AgentId::from("c1")])
            .priority(Priority::High)
            .context("impact", json!("checkout down"))
            .respond_by(at + Duration::minutes(60))
            .build(at)
            .unwrap();

        assert_eq!(message.message_type(), MessageType::Escalation);
        assert!(message.response_required());
        assert_eq!(message.response_deadline(), Some(at + Duration::minutes(60)));
        assert_eq!(message.context()["impact"], json!("checkout down"));
        assert_eq!(message.timestamp(), at);
        assert!(message.involves(&"l1".into()));
        assert!(message.involves(&"c1".into()));
        assert!(!message.involves(&"c2".into()));
    }

    #[test]
    fn test_build_without_deadline() {
        let message = MessageBuilder::new(MessageType::KnowledgeShare, "l1".into(), "Tip")
            .to([AgentId::from("c1")])
            .build(now())
            .unwrap();
        assert!(!message.response_required());
        assert!(message.response_deadline().is_none());
    }

    #[test]
    fn test_build_without_recipients_fails() {
        let result = MessageBuilder::new(MessageType::Directive, "c1".into(), "Go").build(now());
        assert!(matches!(result, Err(EngineError::NoRecipients(_))));
    }

    #[test]
    fn test_message_ids_are_unique() {
        let build = || {
            MessageBuilder::new(MessageType::Directive, "c1".into(), "Go")
                .to([AgentId::from("l1")])
                .build(now())
                .unwrap()
        };
        assert_ne!(build().id(), build().id());
    }

    #[test]
    fn test_message_serializes_with_type_field() {
        let message = MessageBuilder::new(MessageType::WorkloadAlert, "monitor".into(), "Load")
            .to([AgentId::from("ceo")])
            .priority(Priority::Critical)
            .build(now())
            .unwrap();
        let value = serde_json::to_value(&message).unwrap();
        assert_eq!(value["type"], json!("workload_alert"));
        assert_eq!(value["priority"], json!("critical"));
        assert_eq!(value["responseRequired"], json!(false));
    }
}

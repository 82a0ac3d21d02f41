//! Authority validation - which levels may perform which protocol actions

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::agent::{Agent, AgentId, AgentLevel};
use crate::directory::AgentDirectory;
use crate::error::{EngineError, EngineResult};
use crate::hierarchy::Navigator;

/// Protocol actions subject to authority checks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Action {
    EscalateToChief,
    EscalateToCeo,
    IssueDirective,
    PeerCollaborate,
    EmergencyProtocol,
    ConsultExpert,
    ShareKnowledge,
    RequestTaskPlanning,
}

impl Action {
    fn as_str(self) -> &'static str {
        match self {
            Action::EscalateToChief => "ESCALATE_TO_CHIEF",
            Action::EscalateToCeo => "ESCALATE_TO_CEO",
            Action::IssueDirective => "ISSUE_DIRECTIVE",
            Action::PeerCollaborate => "PEER_COLLABORATE",
            Action::EmergencyProtocol => "EMERGENCY_PROTOCOL",
            Action::ConsultExpert => "CONSULT_EXPERT",
            Action::ShareKnowledge => "SHARE_KNOWLEDGE",
            Action::RequestTaskPlanning => "REQUEST_TASK_PLANNING",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Action {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        [
            Action::EscalateToChief,
            Action::EscalateToCeo,
            Action::IssueDirective,
            Action::PeerCollaborate,
            Action::EmergencyProtocol,
            Action::ConsultExpert,
            Action::ShareKnowledge,
            Action::RequestTaskPlanning,
        ]
        .into_iter()
        .find(|a| a.as_str() == s)
        .ok_or_else(|| EngineError::ConfigError(format!("unknown action {s}")))
    }
}

/// How an action is gated
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rule {
    /// Sender level must be one of these
    Levels(Vec<AgentLevel>),
    /// Any registered sender
    AnyLevel,
    /// Sender and target must be peers
    PeerRelationship,
}

/// Decision table keyed by action
#[derive(Debug, Clone)]
pub struct AuthorityValidator {
    rules: HashMap<Action, Rule>,
}

impl Default for AuthorityValidator {
    fn default() -> Self {
        use AgentLevel::*;

        let rules = HashMap::from([
            (Action::EscalateToChief, Rule::Levels(vec![Layer, Expert, LifeCeoSubagent])),
            (Action::EscalateToCeo, Rule::Levels(vec![Chief, Domain])),
            (Action::IssueDirective, Rule::Levels(vec![Ceo, Chief])),
            (Action::PeerCollaborate, Rule::PeerRelationship),
            (Action::EmergencyProtocol, Rule::AnyLevel),
            (Action::ConsultExpert, Rule::Levels(vec![Layer, Domain])),
            (Action::ShareKnowledge, Rule::AnyLevel),
            (Action::RequestTaskPlanning, Rule::Levels(vec![Layer, Domain])),
        ]);

        Self { rules }
    }
}

impl AuthorityValidator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the rule for one action
    pub fn with_rule(mut self, action: Action, rule: Rule) -> Self {
        self.rules.insert(action, rule);
        self
    }

    /// Pure decision: unknown senders, unknown targets of a peer rule, and
    /// actions without a rule are all denied.
    pub fn is_allowed(
        &self,
        directory: &AgentDirectory,
        action: Action,
        sender: &AgentId,
        target: Option<&AgentId>,
    ) -> bool {
        let Some(agent) = directory.find(sender) else {
            return false;
        };

        match self.rules.get(&action) {
            None => false,
            Some(Rule::AnyLevel) => true,
            Some(Rule::Levels(levels)) => levels.contains(&agent.level),
            Some(Rule::PeerRelationship) => target.is_some_and(|t| {
                Navigator::new(directory).validate_peer_relationship(sender, t)
            }),
        }
    }

    /// Decision for an action named by string, as received from a host
    pub fn is_allowed_by_name(
        &self,
        directory: &AgentDirectory,
        action: &str,
        sender: &AgentId,
        target: Option<&AgentId>,
    ) -> bool {
        action
            .parse::<Action>()
            .is_ok_and(|a| self.is_allowed(directory, a, sender, target))
    }

    /// Resolve the sender and enforce the rule, returning the sender on success
    pub fn authorize<'a>(
        &self,
        directory: &'a AgentDirectory,
        action: Action,
        sender: &AgentId,
        target: Option<&AgentId>,
    ) -> EngineResult<&'a Agent> {
        let agent = directory.get(sender)?;
        if let Some(t) = target {
            directory.get(t)?;
        }

        if self.is_allowed(directory, action, sender, target) {
            return Ok(agent);
        }

        warn!(agent_id = %sender, level = %agent.level, action = %action, "Authority denied");

        match (action, target) {
            (Action::PeerCollaborate, Some(t)) => Err(EngineError::InvalidPeerRelationship {
                from: sender.clone(),
                to: t.clone(),
            }),
            _ => Err(EngineError::Unauthorized {
                agent: sender.clone(),
                action,
            }),
        }
    }
}

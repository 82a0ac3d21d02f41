//! Hierarchy navigation over the agent directory

use serde::{Deserialize, Serialize};

use crate::agent::{Agent, AgentId, AgentLevel};
use crate::directory::{AgentDirectory, MAX_DEPTH};
use crate::error::{EngineError, EngineResult};

/// One hop of an escalation path
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EscalationStep {
    pub level: AgentLevel,
    pub agent_id: AgentId,
    pub name: String,
}

impl From<&Agent> for EscalationStep {
    fn from(agent: &Agent) -> Self {
        Self {
            level: agent.level,
            agent_id: agent.id.clone(),
            name: agent.name.clone(),
        }
    }
}

/// Read-only queries answering "who is above / beside this agent"
#[derive(Debug, Clone, Copy)]
pub struct Navigator<'a> {
    directory: &'a AgentDirectory,
}

impl<'a> Navigator<'a> {
    pub fn new(directory: &'a AgentDirectory) -> Self {
        Self { directory }
    }

    /// Nearest Chief at or above the agent
    pub fn find_chief(&self, id: &AgentId) -> EngineResult<&'a Agent> {
        self.find_ancestor(id, AgentLevel::Chief)
            .ok_or_else(|| EngineError::NoRecipients(format!("no Chief above {id}")))
    }

    /// Nearest Domain coordinator at or above the agent.
    ///
    /// Falls back to any Domain whose `manages` set lists the agent.
    pub fn find_domain(&self, id: &AgentId) -> EngineResult<&'a Agent> {
        if let Some(domain) = self.find_ancestor(id, AgentLevel::Domain) {
            return Ok(domain);
        }

        self.directory
            .by_level(AgentLevel::Domain)
            .into_iter()
            .find(|d| d.manages.contains(id))
            .ok_or_else(|| EngineError::NoRecipients(format!("no Domain above {id}")))
    }

    /// The agent followed by each superior, ending at the CEO
    pub fn hierarchy_path(&self, id: &AgentId) -> EngineResult<Vec<AgentId>> {
        let mut current = self.directory.get(id)?;
        let mut path = vec![current.id.clone()];

        while current.level != AgentLevel::Ceo {
            let superior = current.reports_to.as_ref().ok_or_else(|| {
                EngineError::InvalidHierarchy(format!("{} has no superior", current.id))
            })?;
            current = self.directory.get(superior)?;
            path.push(current.id.clone());

            if path.len() > MAX_DEPTH + 1 {
                return Err(EngineError::InvalidHierarchy(format!(
                    "reporting chain from {id} does not reach the CEO"
                )));
            }
        }

        Ok(path)
    }

    /// Peer, chief, domain, CEO - always ending at the CEO
    pub fn escalation_path(&self, id: &AgentId) -> EngineResult<Vec<EscalationStep>> {
        let agent = self.directory.get(id)?;
        let mut path: Vec<EscalationStep> = Vec::new();
        let mut push = |candidate: &Agent| {
            if candidate.id != agent.id && !path.iter().any(|s| s.agent_id == candidate.id) {
                path.push(EscalationStep::from(candidate));
            }
        };

        if let Some(peer) = agent
            .coordinates_with
            .first()
            .and_then(|p| self.directory.find(p))
        {
            push(peer);
        }

        let chief = self.find_chief(id).ok();
        if let Some(chief) = chief {
            push(chief);
        }

        if let Ok(domain) = self.find_domain(id) {
            if chief.map(|c| &c.id) != Some(&domain.id) {
                push(domain);
            }
        }

        let ceo = self
            .directory
            .ceo()
            .ok_or_else(|| EngineError::NoRecipients("no CEO registered".to_string()))?;
        // The CEO always closes the path, even if a peer entry already named it
        path.retain(|s| s.agent_id != ceo.id);
        path.push(EscalationStep::from(ceo));

        Ok(path)
    }

    /// Whether two agents count as peers.
    ///
    /// Any of: same level within the same division, a declared
    /// coordinatesWith link in either direction, the same superior, or the
    /// same Domain ancestor.
    pub fn validate_peer_relationship(&self, a: &AgentId, b: &AgentId) -> bool {
        let (Some(first), Some(second)) = (self.directory.find(a), self.directory.find(b)) else {
            return false;
        };

        let same_level_and_division = first.level == second.level
            && first.division.is_some()
            && first.division == second.division;
        let declared = first.coordinates_with.contains(b) || second.coordinates_with.contains(a);
        let same_superior = first.reports_to.is_some() && first.reports_to == second.reports_to;

        same_level_and_division || declared || same_superior || self.same_domain(a, b)
    }

    fn same_domain(&self, a: &AgentId, b: &AgentId) -> bool {
        match (self.find_domain(a), self.find_domain(b)) {
            (Ok(x), Ok(y)) => x.id == y.id,
            _ => false,
        }
    }

    /// Walk reportsTo from the agent itself until `level` is reached
    fn find_ancestor(&self, id: &AgentId, level: AgentLevel) -> Option<&'a Agent> {
        let mut current = self.directory.find(id);
        let mut hops = 0;

        while let Some(agent) = current {
            if agent.level == level {
                return Some(agent);
            }
            hops += 1;
            if hops > MAX_DEPTH {
                return None;
            }
            current = agent.reports_to.as_ref().and_then(|s| self.directory.find(s));
        }

        None
    }
}

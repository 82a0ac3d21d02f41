//! Agent directory - registry of every agent and its reporting links

use std::collections::{HashMap, HashSet};

use tracing::{debug, info};

use crate::agent::{Agent, AgentId, AgentLevel, AgentMetrics};
use crate::error::{EngineError, EngineResult};

/// Longest legal reportsTo chain (six levels)
pub const MAX_DEPTH: usize = 5;

/// Registry of agents keyed by id.
///
/// `reports_to` and `manages` are kept as duals: registering an agent adds it
/// to its superior's `manages` set, and registering a superior picks up every
/// agent already reporting to it, so registration order does not matter.
#[derive(Debug, Clone, Default)]
pub struct AgentDirectory {
    agents: HashMap<AgentId, Agent>,
}

impl AgentDirectory {
    /// Create a new empty directory
    pub fn new() -> Self {
        Self::default()
    }

    /// Register every agent, then validate the resulting hierarchy
    pub fn from_agents<I>(agents: I) -> EngineResult<Self>
    where
        I: IntoIterator<Item = Agent>,
    {
        let mut directory = Self::new();
        for agent in agents {
            directory.upsert(agent);
        }
        directory.validate()?;
        Ok(directory)
    }

    /// Look up an agent
    pub fn get(&self, id: &AgentId) -> EngineResult<&Agent> {
        self.agents
            .get(id)
            .ok_or_else(|| EngineError::NotFound(id.clone()))
    }

    pub fn find(&self, id: &AgentId) -> Option<&Agent> {
        self.agents.get(id)
    }

    pub fn contains(&self, id: &AgentId) -> bool {
        self.agents.contains_key(id)
    }

    /// Insert or replace an agent, maintaining the manages dual
    pub fn upsert(&mut self, mut agent: Agent) {
        let id = agent.id.clone();

        // Detach from a previous superior if the reporting line moved
        let previous_superior = self
            .agents
            .get(&id)
            .and_then(|existing| existing.reports_to.clone())
            .filter(|prev| agent.reports_to.as_ref() != Some(prev));
        if let Some(prev) = previous_superior {
            if let Some(superior) = self.agents.get_mut(&prev) {
                superior.manages.remove(&id);
            }
        }

        // Pick up subordinates registered before this agent
        for other in self.agents.values() {
            if other.id != id && other.reports_to.as_ref() == Some(&id) {
                agent.manages.insert(other.id.clone());
            }
        }

        if let Some(superior_id) = &agent.reports_to {
            if let Some(superior) = self.agents.get_mut(superior_id) {
                superior.manages.insert(id.clone());
            }
        }

        info!(
            agent_id = %id,
            level = %agent.level,
            reports_to = ?agent.reports_to.as_ref().map(AgentId::as_str),
            "Registered agent"
        );

        self.agents.insert(id, agent);
    }

    /// Remove an agent and detach it from its superior
    pub fn remove(&mut self, id: &AgentId) -> Option<Agent> {
        let agent = self.agents.remove(id)?;
        if let Some(superior_id) = &agent.reports_to {
            if let Some(superior) = self.agents.get_mut(superior_id) {
                superior.manages.remove(id);
            }
        }
        debug!(agent_id = %id, "Removed agent");
        Some(agent)
    }

    /// Replace an agent's live metrics
    pub fn update_metrics(&mut self, id: &AgentId, metrics: AgentMetrics) -> EngineResult<()> {
        let agent = self
            .agents
            .get_mut(id)
            .ok_or_else(|| EngineError::NotFound(id.clone()))?;
        agent.metrics = Some(metrics);
        Ok(())
    }

    /// Agents at a level, sorted by id
    pub fn by_level(&self, level: AgentLevel) -> Vec<&Agent> {
        self.select(|a| a.level == level)
    }

    pub fn by_division(&self, division: &str) -> Vec<&Agent> {
        self.select(|a| a.division.as_deref() == Some(division))
    }

    pub fn by_domain(&self, domain: &str) -> Vec<&Agent> {
        self.select(|a| a.domain.as_deref() == Some(domain))
    }

    /// All agents, sorted by id
    pub fn all(&self) -> Vec<&Agent> {
        self.select(|_| true)
    }

    /// The root of the organisation
    pub fn ceo(&self) -> Option<&Agent> {
        self.by_level(AgentLevel::Ceo).into_iter().next()
    }

    pub fn len(&self) -> usize {
        self.agents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }

    /// Number of reportsTo hops from an agent to the root
    pub fn depth(&self, id: &AgentId) -> usize {
        let mut depth = 0;
        let mut current = self.agents.get(id).and_then(|a| a.reports_to.as_ref());

        while let Some(superior) = current {
            depth += 1;
            if depth > MAX_DEPTH + 1 {
                break;
            }
            current = self.agents.get(superior).and_then(|a| a.reports_to.as_ref());
        }

        depth
    }

    /// Fail on the first batch of hierarchy problems found
    pub fn validate(&self) -> EngineResult<()> {
        let issues = self.validation_issues();
        if issues.is_empty() {
            Ok(())
        } else {
            Err(EngineError::InvalidHierarchy(issues.join("; ")))
        }
    }

    /// Every structural problem in the directory, sorted for stable output
    pub fn validation_issues(&self) -> Vec<String> {
        let mut issues = Vec::new();

        let ceos = self.by_level(AgentLevel::Ceo);
        match ceos.len() {
            0 => issues.push("no CEO registered".to_string()),
            1 => {}
            n => issues.push(format!("{n} CEO agents registered")),
        }

        for agent in self.agents.values() {
            match (&agent.reports_to, agent.level) {
                (Some(superior), AgentLevel::Ceo) => {
                    issues.push(format!("CEO {} reports to {}", agent.id, superior));
                }
                (None, AgentLevel::Ceo) => {}
                (None, _) => issues.push(format!("{} has no superior", agent.id)),
                (Some(superior), _) => match self.agents.get(superior) {
                    None => issues.push(format!("{} reports to unknown agent {}", agent.id, superior)),
                    Some(s) if !s.manages.contains(&agent.id) => issues.push(format!(
                        "{} reports to {} but is missing from its manages set",
                        agent.id, superior
                    )),
                    Some(_) => {}
                },
            }

            for managed in &agent.manages {
                match self.agents.get(managed) {
                    None => issues.push(format!("{} manages unknown agent {}", agent.id, managed)),
                    Some(m) if m.reports_to.as_ref() != Some(&agent.id) => issues.push(format!(
                        "{} manages {} but {} reports to {}",
                        agent.id,
                        managed,
                        managed,
                        m.reports_to.as_ref().map_or("nobody", AgentId::as_str)
                    )),
                    Some(_) => {}
                }
            }

            if agent.level != AgentLevel::Ceo {
                if let Some(problem) = self.chain_problem(&agent.id) {
                    issues.push(problem);
                }
            }
        }

        issues.sort();
        issues
    }

    /// Walk reportsTo from `id`, reporting a cycle or an over-long chain
    fn chain_problem(&self, id: &AgentId) -> Option<String> {
        let mut seen = HashSet::new();
        let mut current = self.agents.get(id);
        let mut hops = 0;

        while let Some(agent) = current {
            if !seen.insert(agent.id.clone()) {
                return Some(format!("reporting cycle through {}", id));
            }
            if agent.level == AgentLevel::Ceo {
                return (hops > MAX_DEPTH)
                    .then(|| format!("{} is {} hops from the CEO", id, hops));
            }
            hops += 1;
            current = agent.reports_to.as_ref().and_then(|s| self.agents.get(s));
        }

        // Dangling chains are reported by the reportsTo check
        None
    }

    fn select(&self, predicate: impl Fn(&Agent) -> bool) -> Vec<&Agent> {
        let mut selected: Vec<&Agent> = self.agents.values().filter(|a| predicate(a)).collect();
        selected.sort_by(|a, b| a.id.cmp(&b.id));
        selected
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::sample_directory;

    fn id(s: &str) -> AgentId {
        AgentId::from(s)
    }

    // === Registration Tests ===

    #[test]
    fn test_directory_creation() {
        let directory = AgentDirectory::new();
        assert!(directory.is_empty());
        assert!(directory.ceo().is_none());
    }

    #[test]
    fn test_upsert_adds_to_superior_manages() {
        let mut directory = AgentDirectory::new();
        directory.upsert(Agent::new("ceo", AgentLevel::Ceo, "CEO"));
        directory.upsert(Agent::new("c1", AgentLevel::Chief, "Chief").reporting_to("ceo"));

        assert!(directory.get(&id("ceo")).unwrap().manages.contains(&id("c1")));
        assert!(directory.validate().is_ok());
    }

    #[test]
    fn test_registration_order_is_irrelevant() {
        let mut directory = AgentDirectory::new();
        directory.upsert(Agent::new("l1", AgentLevel::Layer, "Layer").reporting_to("c1"));
        directory.upsert(Agent::new("c1", AgentLevel::Chief, "Chief").reporting_to("ceo"));
        directory.upsert(Agent::new("ceo", AgentLevel::Ceo, "CEO"));

        assert!(directory.get(&id("c1")).unwrap().manages.contains(&id("l1")));
        assert!(directory.get(&id("ceo")).unwrap().manages.contains(&id("c1")));
        assert!(directory.validate().is_ok());
    }

    #[test]
    fn test_upsert_moves_reporting_line() {
        let mut directory = sample_directory();
        let moved = directory.get(&id("l1")).unwrap().clone().reporting_to("d-biz");
        directory.upsert(moved);

        assert!(!directory.get(&id("d-infra")).unwrap().manages.contains(&id("l1")));
        assert!(directory.get(&id("d-biz")).unwrap().manages.contains(&id("l1")));
        assert!(directory.validate().is_ok());
    }

    #[test]
    fn test_duplicate_names_allowed() {
        let mut directory = AgentDirectory::new();
        directory.upsert(Agent::new("a", AgentLevel::Layer, "Same"));
        directory.upsert(Agent::new("b", AgentLevel::Layer, "Same"));
        assert_eq!(directory.len(), 2);
    }

    // === Remove Tests ===

    #[test]
    fn test_remove_detaches_from_superior() {
        let mut directory = sample_directory();
        assert!(directory.remove(&id("l2")).is_some());
        assert!(!directory.get(&id("d-infra")).unwrap().manages.contains(&id("l2")));
        assert!(directory.remove(&id("l2")).is_none());
    }

    // === Lookup Tests ===

    #[test]
    fn test_get_unknown_is_not_found() {
        let directory = sample_directory();
        assert_eq!(
            directory.get(&id("ghost")).unwrap_err(),
            EngineError::NotFound(id("ghost"))
        );
    }

    #[test]
    fn test_secondary_indexes() {
        let directory = sample_directory();
        let chiefs: Vec<_> = directory.by_level(AgentLevel::Chief).iter().map(|a| a.id.clone()).collect();
        assert_eq!(chiefs, vec![id("c1"), id("c2"), id("c3")]);
        assert!(directory.by_division("Business").iter().any(|a| a.id == id("l3")));
        assert_eq!(directory.by_domain("Infra").len(), 4);
        assert_eq!(directory.ceo().map(|a| a.id.clone()), Some(id("ceo")));
    }

    #[test]
    fn test_update_metrics() {
        let mut directory = sample_directory();
        directory.update_metrics(&id("l1"), AgentMetrics::with_load(9, 10)).unwrap();
        assert!(directory.get(&id("l1")).unwrap().is_overloaded(0.8));
        assert!(directory.update_metrics(&id("ghost"), AgentMetrics::with_load(1, 1)).is_err());
    }

    #[test]
    fn test_depth() {
        let directory = sample_directory();
        assert_eq!(directory.depth(&id("ceo")), 0);
        assert_eq!(directory.depth(&id("c1")), 1);
        assert_eq!(directory.depth(&id("l1")), 3);
        assert_eq!(directory.depth(&id("ghost")), 0);
    }

    // === Validation Tests ===

    #[test]
    fn test_sample_directory_is_valid() {
        assert!(sample_directory().validate().is_ok());
    }

    #[test]
    fn test_missing_ceo_is_invalid() {
        let mut directory = AgentDirectory::new();
        directory.upsert(Agent::new("c1", AgentLevel::Chief, "Chief"));
        let issues = directory.validation_issues();
        assert!(issues.iter().any(|i| i.contains("no CEO")));
        assert!(issues.iter().any(|i| i.contains("c1 has no superior")));
    }

    #[test]
    fn test_dangling_superior_is_invalid() {
        let mut directory = sample_directory();
        directory.upsert(Agent::new("l9", AgentLevel::Layer, "Orphan").reporting_to("nobody"));
        assert!(matches!(directory.validate(), Err(EngineError::InvalidHierarchy(_))));
    }

    #[test]
    fn test_conflicting_manages_is_invalid() {
        let mut directory = sample_directory();
        // d-biz claims l1, which reports to d-infra
        let mut claimant = directory.get(&id("d-biz")).unwrap().clone();
        claimant.manages.insert(id("l1"));
        directory.upsert(claimant);

        let issues = directory.validation_issues();
        assert!(issues.iter().any(|i| i.contains("d-biz manages l1 but l1 reports to d-infra")));
        assert!(directory.validate().is_err());
    }

    #[test]
    fn test_reporting_cycle_is_invalid() {
        let mut directory = sample_directory();
        directory.upsert(Agent::new("x", AgentLevel::Layer, "X").reporting_to("y"));
        directory.upsert(Agent::new("y", AgentLevel::Layer, "Y").reporting_to("x"));
        let issues = directory.validation_issues();
        assert!(issues.iter().any(|i| i.contains("cycle")));
    }

    #[test]
    fn test_from_agents_validates() {
        let result = AgentDirectory::from_agents(vec![
            Agent::new("ceo", AgentLevel::Ceo, "CEO"),
            Agent::new("c1", AgentLevel::Chief, "Chief").reporting_to("ceo"),
        ]);
        assert_eq!(result.unwrap().len(), 2);

        let result = AgentDirectory::from_agents(vec![Agent::new("c1", AgentLevel::Chief, "Chief")]);
        assert!(result.is_err());
    }
}

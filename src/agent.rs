//! Agent model - a single node in the six-level organisation

use std::collections::BTreeSet;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Stable agent identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AgentId(String);

impl AgentId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AgentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for AgentId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for AgentId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Tier of an agent in the hierarchy, root first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentLevel {
    /// Unique root of the organisation
    Ceo,
    /// Division head
    Chief,
    /// Domain coordinator grouping layer agents
    Domain,
    /// Leaf worker
    Layer,
    /// Cross-cutting specialist
    Expert,
    /// Personal-assistant sub-agent of the Life CEO division
    LifeCeoSubagent,
}

impl AgentLevel {
    pub const ALL: [AgentLevel; 6] = [
        AgentLevel::Ceo,
        AgentLevel::Chief,
        AgentLevel::Domain,
        AgentLevel::Layer,
        AgentLevel::Expert,
        AgentLevel::LifeCeoSubagent,
    ];

    /// Working tiers scanned by the workload monitor
    pub fn is_working_tier(self) -> bool {
        matches!(self, AgentLevel::Layer | AgentLevel::Expert)
    }
}

impl fmt::Display for AgentLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AgentLevel::Ceo => "CEO",
            AgentLevel::Chief => "Chief",
            AgentLevel::Domain => "Domain",
            AgentLevel::Layer => "Layer",
            AgentLevel::Expert => "Expert",
            AgentLevel::LifeCeoSubagent => "LifeCEO-subagent",
        };
        f.write_str(name)
    }
}

/// Live performance metrics, pushed by an external telemetry system.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentMetrics {
    pub tasks_completed: u64,
    /// Average task duration in milliseconds
    pub avg_task_duration: f64,
    pub error_rate: f64,
    pub current_workload: u32,
    pub max_capacity: u32,
    pub last_active: DateTime<Utc>,
    pub cache_hit_rate: f64,
}

impl AgentMetrics {
    /// Metrics with only the workload fields set
    pub fn with_load(current_workload: u32, max_capacity: u32) -> Self {
        Self {
            tasks_completed: 0,
            avg_task_duration: 0.0,
            error_rate: 0.0,
            current_workload,
            max_capacity,
            last_active: Utc::now(),
            cache_hit_rate: 0.0,
        }
    }

    /// `current_workload / max_capacity`, `None` when capacity is zero
    pub fn load_ratio(&self) -> Option<f64> {
        if self.max_capacity == 0 {
            return None;
        }
        Some(f64::from(self.current_workload) / f64::from(self.max_capacity))
    }
}

/// An agent in the organisation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Agent {
    pub id: AgentId,
    pub level: AgentLevel,
    pub name: String,
    #[serde(default)]
    pub division: Option<String>,
    #[serde(default)]
    pub domain: Option<String>,
    /// Immediate superior (None only for the CEO)
    #[serde(default)]
    pub reports_to: Option<AgentId>,
    #[serde(default)]
    pub manages: BTreeSet<AgentId>,
    /// Declared collaborators, in declaration order
    #[serde(default)]
    pub coordinates_with: Vec<AgentId>,
    #[serde(default)]
    pub consults: BTreeSet<AgentId>,
    #[serde(default)]
    pub expertise: Vec<String>,
    #[serde(default)]
    pub metrics: Option<AgentMetrics>,
}

impl Agent {
    pub fn new(id: impl Into<AgentId>, level: AgentLevel, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            level,
            name: name.into(),
            division: None,
            domain: None,
            reports_to: None,
            manages: BTreeSet::new(),
            coordinates_with: Vec::new(),
            consults: BTreeSet::new(),
            expertise: Vec::new(),
            metrics: None,
        }
    }

    pub fn with_division(mut self, division: impl Into<String>) -> Self {
        self.division = Some(division.into());
        self
    }

    pub fn with_domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = Some(domain.into());
        self
    }

    pub fn reporting_to(mut self, superior: impl Into<AgentId>) -> Self {
        self.reports_to = Some(superior.into());
        self
    }

    pub fn coordinating_with(mut self, peer: impl Into<AgentId>) -> Self {
        let peer = peer.into();
        if !self.coordinates_with.contains(&peer) {
            self.coordinates_with.push(peer);
        }
        self
    }

    pub fn consulting(mut self, expert: impl Into<AgentId>) -> Self {
        self.consults.insert(expert.into());
        self
    }

    pub fn with_expertise<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.expertise.extend(tags.into_iter().map(Into::into));
        self
    }

    pub fn with_metrics(mut self, metrics: AgentMetrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Case-insensitive match of any tag against expertise
    pub fn has_expertise_in(&self, tags: &[String]) -> bool {
        self.expertise
            .iter()
            .any(|e| tags.iter().any(|t| t.eq_ignore_ascii_case(e)))
    }

    /// Whether the agent's domain matches any tag (case-insensitive)
    pub fn domain_matches(&self, tags: &[String]) -> bool {
        self.domain
            .as_deref()
            .is_some_and(|d| tags.iter().any(|t| t.eq_ignore_ascii_case(d)))
    }

    pub fn is_overloaded(&self, threshold: f64) -> bool {
        self.metrics
            .as_ref()
            .and_then(AgentMetrics::load_ratio)
            .is_some_and(|ratio| ratio >= threshold)
    }
}

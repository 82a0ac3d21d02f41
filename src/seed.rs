//! Agent sources - where the organisation comes from at startup

use std::path::PathBuf;

use async_trait::async_trait;
use tracing::{debug, info};

use crate::agent::Agent;
use crate::error::{EngineError, EngineResult};

const BUILTIN_ORGANIZATION: &str = include_str!("../seed/organization.json");

/// Supplies the agent records an engine is bootstrapped from
#[async_trait]
pub trait AgentSource: Send + Sync {
    async fn load(&self) -> EngineResult<Vec<Agent>>;
}

/// The built-in organisation: CEO, five Chiefs, their domains, layers,
/// experts and the Life CEO sub-agents
#[derive(Debug, Clone, Copy, Default)]
pub struct BuiltinSeed;

impl BuiltinSeed {
    pub fn agents() -> EngineResult<Vec<Agent>> {
        parse_agents(BUILTIN_ORGANIZATION, "builtin organization")
    }
}

#[async_trait]
impl AgentSource for BuiltinSeed {
    async fn load(&self) -> EngineResult<Vec<Agent>> {
        Self::agents()
    }
}

/// Reads a JSON array of agent records from disk
#[derive(Debug, Clone)]
pub struct JsonFileSource {
    path: PathBuf,
}

impl JsonFileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl AgentSource for JsonFileSource {
    async fn load(&self) -> EngineResult<Vec<Agent>> {
        debug!(path = %self.path.display(), "Reading agent records");
        let json = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|e| EngineError::SeedError(format!("{}: {e}", self.path.display())))?;
        parse_agents(&json, &self.path.display().to_string())
    }
}

/// Agents already in memory, mostly for embedding hosts and tests
#[derive(Debug, Clone, Default)]
pub struct StaticSource {
    agents: Vec<Agent>,
}

impl StaticSource {
    pub fn new(agents: Vec<Agent>) -> Self {
        Self { agents }
    }
}

#[async_trait]
impl AgentSource for StaticSource {
    async fn load(&self) -> EngineResult<Vec<Agent>> {
        Ok(self.agents.clone())
    }
}

fn parse_agents(json: &str, origin: &str) -> EngineResult<Vec<Agent>> {
    let agents: Vec<Agent> = serde_json::from_str(json)
        .map_err(|e| EngineError::SeedError(format!("{origin}: {e}")))?;
    info!(origin, agents = agents.len(), "Loaded agent records");
    Ok(agents)
}

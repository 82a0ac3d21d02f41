//! Synthetic organisation shared by unit tests
//!
//! ```text
//! ceo
//! ├── c1 (Foundation)
//! │   ├── d-infra (Infra) ── l1, l2, l5 (l5 coordinates with l3)
//! │   ├── master-control
//! │   └── e-db (database, postgresql)
//! ├── c2 (Business)
//! │   ├── d-biz (Commerce) ── l3, l4
//! │   ├── e-sec (security)
//! │   ├── sprint-manager
//! │   └── project-tracker
//! └── c3 (Life)
//!     └── life-health
//! ```

use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};

use crate::agent::{Agent, AgentLevel};
use crate::clock::FixedClock;
use crate::config::EngineConfig;
use crate::directory::AgentDirectory;
use crate::engine::Engine;

pub(crate) fn sample_agents() -> Vec<Agent> {
    vec![
        Agent::new("ceo", AgentLevel::Ceo, "Chief Executive"),
        Agent::new("c1", AgentLevel::Chief, "Foundation Chief")
            .with_division("Foundation")
            .reporting_to("ceo"),
        Agent::new("c2", AgentLevel::Chief, "Business Chief")
            .with_division("Business")
            .reporting_to("ceo"),
        Agent::new("c3", AgentLevel::Chief, "Life Chief")
            .with_division("Life")
            .reporting_to("ceo"),
        Agent::new("d-infra", AgentLevel::Domain, "Infrastructure Domain")
            .with_division("Foundation")
            .with_domain("Infra")
            .reporting_to("c1"),
        Agent::new("master-control", AgentLevel::Domain, "Master Control")
            .with_division("Foundation")
            .reporting_to("c1"),
        Agent::new("d-biz", AgentLevel::Domain, "Commerce Domain")
            .with_division("Business")
            .with_domain("Commerce")
            .reporting_to("c2"),
        Agent::new("l1", AgentLevel::Layer, "Database Layer")
            .with_division("Foundation")
            .with_domain("Infra")
            .reporting_to("d-infra")
            .with_expertise(["sql"]),
        Agent::new("l2", AgentLevel::Layer, "Cache Layer")
            .with_division("Foundation")
            .with_domain("Infra")
            .reporting_to("d-infra"),
        Agent::new("l5", AgentLevel::Layer, "Queue Layer")
            .with_division("Foundation")
            .with_domain("Infra")
            .reporting_to("d-infra")
            .coordinating_with("l3"),
        Agent::new("l3", AgentLevel::Layer, "Payments Layer")
            .with_division("Business")
            .with_domain("Commerce")
            .reporting_to("d-biz"),
        Agent::new("l4", AgentLevel::Layer, "Checkout Layer")
            .with_division("Business")
            .with_domain("Commerce")
            .reporting_to("d-biz"),
        Agent::new("e-db", AgentLevel::Expert, "Database Expert")
            .reporting_to("c1")
            .with_expertise(["database", "postgresql"]),
        Agent::new("e-sec", AgentLevel::Expert, "Security Expert")
            .reporting_to("c2")
            .with_expertise(["security", "compliance"]),
        Agent::new("sprint-manager", AgentLevel::Expert, "Sprint Manager")
            .reporting_to("c2")
            .with_expertise(["planning"]),
        Agent::new("project-tracker", AgentLevel::Expert, "Project Tracker")
            .reporting_to("c2")
            .with_expertise(["tracking"]),
        Agent::new("life-health", AgentLevel::LifeCeoSubagent, "Health Assistant")
            .with_division("Life")
            .reporting_to("c3")
            .with_expertise(["health"]),
    ]
}

pub(crate) fn sample_directory() -> AgentDirectory {
    let mut directory = AgentDirectory::new();
    for agent in sample_agents() {
        directory.upsert(agent);
    }
    directory
}

pub(crate) fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap()
}

/// Engine over the sample organisation with a frozen clock
pub(crate) fn sample_engine() -> Engine {
    Engine::new(sample_directory(), EngineConfig::default())
        .unwrap()
        .with_clock(Arc::new(FixedClock::new(now())))
}

//! # Chain of Command
//!
//! Hierarchical agent communication and escalation engine.
//!
//! Agents sit in a fixed six-tier organisation. The engine decides who may
//! talk to whom, routes each message up, across or down the hierarchy,
//! attaches priority-based deadlines, broadcasts emergencies and watches
//! the workload of the working tiers.
//!
//! ## Architecture
//!
//! ```text
//!                        ┌──────────────────┐
//!                        │   CEO (Level 0)  │
//!                        └────────┬─────────┘
//!          ┌──────────────┬───────┴───────┬──────────────┐
//!          ▼              ▼               ▼              ▼
//!   ┌─────────────┐┌─────────────┐┌─────────────┐┌─────────────┐
//!   │    Chief    ││    Chief    ││    Chief    ││  Life CEO   │
//!   └──────┬──────┘└──────┬──────┘└──────┬──────┘└──────┬──────┘
//!          │              │              │              │
//!     ┌────┴────┐    ┌────┴────┐    ┌────┴────┐    ┌────┴────┐
//!     ▼         ▼    ▼         ▼    ▼         ▼    ▼         ▼
//!  ┌──────┐ ┌──────┐ ┌──────┐ ┌──────┐ ┌──────┐ ┌──────┐ ┌──────┐
//!  │Domain│ │Expert│ │Domain│ │Expert│ │Domain│ │Expert│ │ Sub- │
//!  └──┬───┘ └──────┘ └──┬───┘ └──────┘ └──┬───┘ └──────┘ │agents│
//!     ▼                 ▼                 ▼              └──────┘
//!  ┌──────┐          ┌──────┐          ┌──────┐
//!  │Layers│          │Layers│          │Layers│
//!  └──────┘          └──────┘          └──────┘
//! ```
//!
//! ## Key Concepts
//!
//! - **Directory**: every agent record, with `reportsTo` / `manages` kept dual
//! - **Navigator**: chief and domain lookup, hierarchy and escalation paths
//! - **Authority**: which levels may initiate which actions
//! - **Engine**: protocol operations that validate, build, log and publish messages
//! - **Service**: actor and lock hosts for concurrent callers

pub mod agent;
pub mod authority;
pub mod channel;
pub mod clock;
pub mod config;
pub mod deadline;
pub mod directory;
pub mod engine;
pub mod error;
pub mod escalation;
pub mod hierarchy;
pub mod knowledge;
pub mod message;
pub mod message_log;
pub mod notifier;
pub mod routing;
pub mod seed;
pub mod service;
pub mod workload;

#[cfg(test)]
mod fixtures;

pub use agent::{Agent, AgentId, AgentLevel, AgentMetrics};
pub use authority::{Action, AuthorityValidator, Rule};
pub use channel::{subscribe_stream, MessageStream};
pub use clock::{Clock, FixedClock, SystemClock};
pub use config::EngineConfig;
pub use directory::AgentDirectory;
pub use engine::{Engine, EngineStats};
pub use error::{EngineError, EngineResult};
pub use escalation::{
    CeoEscalation, ConsultationRequest, DirectiveRequest, EmergencyProtocol, EmergencyRequest,
    EmergencyResponse, EscalationRequest, PeerRequest, ProgressTrackingRequest, Severity,
    TaskPlanningRequest,
};
pub use hierarchy::{EscalationStep, Navigator};
pub use knowledge::{KnowledgeBase, KnowledgeEntry, KnowledgeType};
pub use message::{Message, MessageBuilder, MessageId, MessageType, Priority};
pub use message_log::MessageLog;
pub use notifier::{EventFilter, Notifier, Subscriber, SubscriptionId};
pub use routing::MessageIntent;
pub use seed::{AgentSource, BuiltinSeed, JsonFileSource, StaticSource};
pub use service::{EngineHandle, EngineService, SharedEngine};
pub use workload::WorkloadReport;

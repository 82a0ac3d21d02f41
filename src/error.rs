//! Engine error types

use thiserror::Error;

use crate::agent::AgentId;
use crate::authority::Action;

/// Errors raised by engine operations.
///
/// Every failure is reported to the immediate caller. Nothing is logged or
/// emitted when an operation fails.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum EngineError {
    /// Referenced agent does not exist in the directory
    #[error("Agent not found: {0}")]
    NotFound(AgentId),

    /// Authority validator denied the action for the sender's level
    #[error("Agent {agent} is not authorized to {action}")]
    Unauthorized { agent: AgentId, action: Action },

    /// A routing rule found zero candidates
    #[error("No recipients: {0}")]
    NoRecipients(String),

    /// Peer collaboration requested between agents that are not peers
    #[error("{from} and {to} are not peers")]
    InvalidPeerRelationship { from: AgentId, to: AgentId },

    /// reportsTo / manages links are inconsistent, cyclic or dangling
    #[error("Invalid hierarchy: {0}")]
    InvalidHierarchy(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Agent source could not be read or parsed
    #[error("Seed error: {0}")]
    SeedError(String),

    /// Engine host is no longer running
    #[error("Channel error: {0}")]
    ChannelError(String),
}

/// Result alias used throughout the crate
pub type EngineResult<T> = Result<T, EngineError>;

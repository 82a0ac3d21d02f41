//! The engine context: directory, log, notifier and knowledge in one place

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Serialize;
use tracing::info;

use crate::agent::{AgentId, AgentMetrics};
use crate::authority::AuthorityValidator;
use crate::clock::{Clock, SystemClock};
use crate::config::EngineConfig;
use crate::directory::AgentDirectory;
use crate::error::EngineResult;
use crate::escalation::EmergencyProtocol;
use crate::hierarchy::Navigator;
use crate::knowledge::KnowledgeBase;
use crate::message::{Message, MessageBuilder, MessageType, Priority};
use crate::message_log::MessageLog;
use crate::notifier::{EventFilter, Notifier, Subscriber, SubscriptionId};
use crate::seed::AgentSource;

/// Snapshot of engine activity
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineStats {
    pub total_messages: usize,
    pub by_type: BTreeMap<MessageType, usize>,
    pub by_priority: BTreeMap<Priority, usize>,
    pub agents: usize,
    pub knowledge_entries: usize,
    pub emergencies: usize,
}

/// Coordination engine for one organisation.
///
/// Every operation runs to completion before returning. Hosts serving
/// concurrent callers wrap the engine in one lock or one actor, see
/// [`crate::service`].
#[derive(Debug)]
pub struct Engine {
    pub(crate) directory: AgentDirectory,
    pub(crate) config: EngineConfig,
    pub(crate) authority: AuthorityValidator,
    pub(crate) log: MessageLog,
    pub(crate) notifier: Notifier,
    pub(crate) knowledge: KnowledgeBase,
    pub(crate) protocols: Vec<EmergencyProtocol>,
    pub(crate) clock: Arc<dyn Clock>,
}

impl Engine {
    /// Build an engine over a directory, rejecting an invalid config
    pub fn new(directory: AgentDirectory, config: EngineConfig) -> EngineResult<Self> {
        config.validate()?;
        info!(agents = directory.len(), "Creating engine");
        Ok(Self {
            log: MessageLog::new(config.log_capacity),
            directory,
            config,
            authority: AuthorityValidator::default(),
            notifier: Notifier::new(),
            knowledge: KnowledgeBase::new(),
            protocols: Vec::new(),
            clock: Arc::new(SystemClock),
        })
    }

    /// Load agents from a source, validate the hierarchy and build the engine
    pub async fn bootstrap(source: &dyn AgentSource, config: EngineConfig) -> EngineResult<Self> {
        config.validate()?;
        let agents = source.load().await?;
        let directory = AgentDirectory::from_agents(agents)?;
        Self::new(directory, config)
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_authority(mut self, authority: AuthorityValidator) -> Self {
        self.authority = authority;
        self
    }

    pub fn directory(&self) -> &AgentDirectory {
        &self.directory
    }

    /// Mutable access for registration and repair by the owning host
    pub fn directory_mut(&mut self) -> &mut AgentDirectory {
        &mut self.directory
    }

    pub fn navigator(&self) -> Navigator<'_> {
        Navigator::new(&self.directory)
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn log(&self) -> &MessageLog {
        &self.log
    }

    pub fn knowledge(&self) -> &KnowledgeBase {
        &self.knowledge
    }

    pub fn emergency_protocols(&self) -> &[EmergencyProtocol] {
        &self.protocols
    }

    /// Replace an agent's live metrics
    pub fn update_metrics(&mut self, agent: &AgentId, metrics: AgentMetrics) -> EngineResult<()> {
        self.directory.update_metrics(agent, metrics)
    }

    pub fn subscribe(
        &mut self,
        filter: impl Into<EventFilter>,
        subscriber: impl Subscriber + 'static,
    ) -> SubscriptionId {
        self.notifier.subscribe(filter, subscriber)
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.notifier.unsubscribe(id)
    }

    pub fn notifier_mut(&mut self) -> &mut Notifier {
        &mut self.notifier
    }

    pub fn stats(&self) -> EngineStats {
        let mut by_type = BTreeMap::new();
        let mut by_priority = BTreeMap::new();
        for message in self.log.all() {
            *by_type.entry(message.message_type()).or_insert(0) += 1;
            *by_priority.entry(message.priority()).or_insert(0) += 1;
        }

        EngineStats {
            total_messages: self.log.len(),
            by_type,
            by_priority,
            agents: self.directory.len(),
            knowledge_entries: self.knowledge.len(),
            emergencies: self.protocols.len(),
        }
    }

    pub(crate) fn now(&self) -> chrono::DateTime<chrono::Utc> {
        self.clock.now()
    }

    /// Build, log and publish. All validation happens before this point, so
    /// a build failure here still leaves the log untouched.
    pub(crate) fn commit(&mut self, builder: MessageBuilder) -> EngineResult<Message> {
        let message = builder.build(self.now())?;

        self.log.append(message.clone());
        info!(
            message_id = %message.id(),
            message_type = %message.message_type(),
            priority = %message.priority(),
            from = %message.from(),
            recipients = message.to().len(),
            "Message committed"
        );
        self.notifier.publish(&message);

        Ok(message)
    }
}

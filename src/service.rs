//! Hosting the engine for concurrent callers
//!
//! Two hosts are provided: [`EngineService`], an actor that owns the engine
//! and applies operations one at a time from a channel, and [`SharedEngine`],
//! a cloneable handle around a single lock. Either way every operation runs
//! against the engine exclusively, so ordering of log appends and
//! notifications matches the order operations were applied.

use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};

use crate::agent::{AgentId, AgentMetrics};
use crate::channel::{subscribe_stream, MessageStream};
use crate::engine::{Engine, EngineStats};
use crate::error::{EngineError, EngineResult};
use crate::escalation::{
    CeoEscalation, ConsultationRequest, DirectiveRequest, EmergencyRequest, EmergencyResponse,
    EscalationRequest, PeerRequest, ProgressTrackingRequest, TaskPlanningRequest,
};
use crate::knowledge::KnowledgeEntry;
use crate::message::Message;
use crate::notifier::EventFilter;
use crate::routing::MessageIntent;
use crate::workload::WorkloadReport;

type Reply<T> = oneshot::Sender<EngineResult<T>>;

/// Operations accepted by the engine service
#[derive(Debug)]
pub enum Op {
    EscalateToChief { request: EscalationRequest, reply: Reply<Message> },
    EscalateToCeo { request: CeoEscalation, reply: Reply<Message> },
    PeerCollaboration { request: PeerRequest, reply: Reply<Message> },
    ConsultExpert { request: ConsultationRequest, reply: Reply<Message> },
    ShareKnowledge { entry: KnowledgeEntry, reply: Reply<Message> },
    RequestTaskPlanning { request: TaskPlanningRequest, reply: Reply<Message> },
    RequestProgressTracking { request: ProgressTrackingRequest, reply: Reply<Message> },
    IssueDirective { request: DirectiveRequest, reply: Reply<Message> },
    ReportPerformance { agent_id: AgentId, metrics: AgentMetrics, reply: Reply<Message> },
    EmergencyIntervention { request: EmergencyRequest, reply: Reply<EmergencyResponse> },
    RouteMessage { intent: MessageIntent, reply: Reply<Message> },
    CheckWorkload { reply: Reply<WorkloadReport> },
    UpdateMetrics { agent_id: AgentId, metrics: AgentMetrics, reply: Reply<()> },
    Subscribe { filter: EventFilter, reply: oneshot::Sender<MessageStream> },
    RecentMessages { count: usize, reply: oneshot::Sender<Vec<Message>> },
    Stats { reply: oneshot::Sender<EngineStats> },
}

impl Op {
    fn name(&self) -> &'static str {
        match self {
            Op::EscalateToChief { .. } => "escalate_to_chief",
            Op::EscalateToCeo { .. } => "escalate_to_ceo",
            Op::PeerCollaboration { .. } => "peer_collaboration",
            Op::ConsultExpert { .. } => "consult_expert",
            Op::ShareKnowledge { .. } => "share_knowledge",
            Op::RequestTaskPlanning { .. } => "request_task_planning",
            Op::RequestProgressTracking { .. } => "request_progress_tracking",
            Op::IssueDirective { .. } => "issue_directive",
            Op::ReportPerformance { .. } => "report_performance",
            Op::EmergencyIntervention { .. } => "emergency_intervention",
            Op::RouteMessage { .. } => "route_message",
            Op::CheckWorkload { .. } => "check_workload_balance",
            Op::UpdateMetrics { .. } => "update_metrics",
            Op::Subscribe { .. } => "subscribe",
            Op::RecentMessages { .. } => "recent_messages",
            Op::Stats { .. } => "stats",
        }
    }
}

/// Actor owning the engine
pub struct EngineService {
    engine: Engine,
    op_rx: mpsc::UnboundedReceiver<Op>,
}

impl EngineService {
    /// Create a service and the handle used to talk to it
    pub fn new(engine: Engine) -> (Self, EngineHandle) {
        let (op_tx, op_rx) = mpsc::unbounded_channel();
        (Self { engine, op_rx }, EngineHandle { op_tx })
    }

    /// Create a service and run it on the current tokio runtime
    pub fn spawn(engine: Engine) -> (EngineHandle, JoinHandle<Engine>) {
        let (service, handle) = Self::new(engine);
        (handle, tokio::spawn(service.run()))
    }

    /// Apply operations until every handle is dropped, then hand the engine back
    #[instrument(skip(self))]
    pub async fn run(mut self) -> Engine {
        info!("Starting engine service");

        while let Some(op) = self.op_rx.recv().await {
            self.handle_op(op);
        }

        info!(messages = self.engine.log().len(), "Engine service stopped");
        self.engine
    }

    fn handle_op(&mut self, op: Op) {
        let name = op.name();
        debug!(op = name, "Handling operation");
        let engine = &mut self.engine;

        let delivered = match op {
            Op::EscalateToChief { request, reply } => respond(name, reply, engine.escalate_to_chief(request)),
            Op::EscalateToCeo { request, reply } => respond(name, reply, engine.escalate_to_ceo(request)),
            Op::PeerCollaboration { request, reply } => respond(name, reply, engine.peer_collaboration(request)),
            Op::ConsultExpert { request, reply } => respond(name, reply, engine.consult_expert(request)),
            Op::ShareKnowledge { entry, reply } => respond(name, reply, engine.share_knowledge(entry)),
            Op::RequestTaskPlanning { request, reply } => {
                respond(name, reply, engine.request_task_planning(request))
            }
            Op::RequestProgressTracking { request, reply } => {
                respond(name, reply, engine.request_progress_tracking(request))
            }
            Op::IssueDirective { request, reply } => respond(name, reply, engine.issue_directive(request)),
            Op::ReportPerformance { agent_id, metrics, reply } => {
                respond(name, reply, engine.report_performance(&agent_id, metrics))
            }
            Op::EmergencyIntervention { request, reply } => {
                respond(name, reply, engine.emergency_intervention(request))
            }
            Op::RouteMessage { intent, reply } => respond(name, reply, engine.route_message(intent)),
            Op::CheckWorkload { reply } => respond(name, reply, engine.check_workload_balance()),
            Op::UpdateMetrics { agent_id, metrics, reply } => {
                respond(name, reply, engine.update_metrics(&agent_id, metrics))
            }
            Op::Subscribe { filter, reply } => {
                let stream = subscribe_stream(engine.notifier_mut(), filter);
                reply.send(stream).is_ok()
            }
            Op::RecentMessages { count, reply } => {
                let recent = engine.log().recent(count).into_iter().cloned().collect();
                reply.send(recent).is_ok()
            }
            Op::Stats { reply } => reply.send(engine.stats()).is_ok(),
        };

        if !delivered {
            debug!(op = name, "Caller went away before the reply");
        }
    }
}

fn respond<T>(name: &'static str, reply: Reply<T>, result: EngineResult<T>) -> bool {
    if let Err(e) = &result {
        warn!(op = name, error = %e, "Operation failed");
    }
    reply.send(result).is_ok()
}

/// Cloneable async client for an [`EngineService`]
#[derive(Debug, Clone)]
pub struct EngineHandle {
    op_tx: mpsc::UnboundedSender<Op>,
}

impl EngineHandle {
    async fn call<T>(&self, make: impl FnOnce(oneshot::Sender<T>) -> Op) -> EngineResult<T> {
        let (reply, rx) = oneshot::channel();
        self.op_tx
            .send(make(reply))
            .map_err(|_| EngineError::ChannelError("engine service is not running".to_string()))?;
        rx.await
            .map_err(|_| EngineError::ChannelError("engine service dropped the reply".to_string()))
    }

    pub async fn escalate_to_chief(&self, request: EscalationRequest) -> EngineResult<Message> {
        self.call(|reply| Op::EscalateToChief { request, reply }).await?
    }

    pub async fn escalate_to_ceo(&self, request: CeoEscalation) -> EngineResult<Message> {
        self.call(|reply| Op::EscalateToCeo { request, reply }).await?
    }

    pub async fn peer_collaboration(&self, request: PeerRequest) -> EngineResult<Message> {
        self.call(|reply| Op::PeerCollaboration { request, reply }).await?
    }

    pub async fn consult_expert(&self, request: ConsultationRequest) -> EngineResult<Message> {
        self.call(|reply| Op::ConsultExpert { request, reply }).await?
    }

    pub async fn share_knowledge(&self, entry: KnowledgeEntry) -> EngineResult<Message> {
        self.call(|reply| Op::ShareKnowledge { entry, reply }).await?
    }

    pub async fn request_task_planning(&self, request: TaskPlanningRequest) -> EngineResult<Message> {
        self.call(|reply| Op::RequestTaskPlanning { request, reply }).await?
    }

    pub async fn request_progress_tracking(
        &self,
        request: ProgressTrackingRequest,
    ) -> EngineResult<Message> {
        self.call(|reply| Op::RequestProgressTracking { request, reply }).await?
    }

    pub async fn issue_directive(&self, request: DirectiveRequest) -> EngineResult<Message> {
        self.call(|reply| Op::IssueDirective { request, reply }).await?
    }

    pub async fn report_performance(
        &self,
        agent_id: AgentId,
        metrics: AgentMetrics,
    ) -> EngineResult<Message> {
        self.call(|reply| Op::ReportPerformance { agent_id, metrics, reply }).await?
    }

    pub async fn emergency_intervention(&self, request: EmergencyRequest) -> EngineResult<EmergencyResponse> {
        self.call(|reply| Op::EmergencyIntervention { request, reply }).await?
    }

    pub async fn route_message(&self, intent: MessageIntent) -> EngineResult<Message> {
        self.call(|reply| Op::RouteMessage { intent, reply }).await?
    }

    pub async fn check_workload_balance(&self) -> EngineResult<WorkloadReport> {
        self.call(|reply| Op::CheckWorkload { reply }).await?
    }

    pub async fn update_metrics(&self, agent_id: AgentId, metrics: AgentMetrics) -> EngineResult<()> {
        self.call(|reply| Op::UpdateMetrics { agent_id, metrics, reply }).await?
    }

    /// Stream committed messages matching the filter
    pub async fn subscribe(&self, filter: impl Into<EventFilter>) -> EngineResult<MessageStream> {
        let filter = filter.into();
        self.call(|reply| Op::Subscribe { filter, reply }).await
    }

    /// The last `count` logged messages, oldest first
    pub async fn recent_messages(&self, count: usize) -> EngineResult<Vec<Message>> {
        self.call(|reply| Op::RecentMessages { count, reply }).await
    }

    pub async fn stats(&self) -> EngineResult<EngineStats> {
        self.call(|reply| Op::Stats { reply }).await
    }

    /// Check if the service has stopped
    pub fn is_closed(&self) -> bool {
        self.op_tx.is_closed()
    }
}

/// Engine behind one lock, shareable across threads
#[derive(Debug, Clone)]
pub struct SharedEngine {
    inner: Arc<parking_lot::Mutex<Engine>>,
}

impl SharedEngine {
    pub fn new(engine: Engine) -> Self {
        Self {
            inner: Arc::new(parking_lot::Mutex::new(engine)),
        }
    }

    /// Run a closure with exclusive access to the engine
    pub fn with<R>(&self, f: impl FnOnce(&mut Engine) -> R) -> R {
        let mut engine = self.inner.lock();
        f(&mut engine)
    }
}

impl std::ops::Deref for SharedEngine {
    type Target = parking_lot::Mutex<Engine>;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

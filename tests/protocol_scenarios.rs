use std::sync::Arc;

use chain_of_command::{
    Agent, AgentDirectory, AgentId, AgentLevel, AgentMetrics, BuiltinSeed, CeoEscalation,
    ConsultationRequest, EmergencyRequest, Engine, EngineConfig, EngineError, EscalationRequest,
    EventFilter, FixedClock, KnowledgeEntry, KnowledgeType, Message, MessageIntent, MessageType,
    PeerRequest, Priority, Severity,
};
use chrono::{DateTime, Duration, TimeZone, Utc};

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 4, 1, 12, 0, 0).unwrap()
}

fn id(s: &str) -> AgentId {
    AgentId::from(s)
}

fn organisation() -> AgentDirectory {
    AgentDirectory::from_agents(vec![
        Agent::new("CEO", AgentLevel::Ceo, "Chief Executive"),
        Agent::new("C1", AgentLevel::Chief, "Foundation Chief")
            .reporting_to("CEO")
            .with_division("Foundation"),
        Agent::new("C2", AgentLevel::Chief, "Business Chief")
            .reporting_to("CEO")
            .with_division("Business"),
        Agent::new("D1", AgentLevel::Domain, "Infra Orchestrator")
            .reporting_to("C1")
            .with_division("Foundation")
            .with_domain("Infra"),
        Agent::new("master-control", AgentLevel::Domain, "Master Control")
            .reporting_to("C1")
            .with_division("Foundation"),
        Agent::new("D2", AgentLevel::Domain, "Commerce Orchestrator")
            .reporting_to("C2")
            .with_division("Business")
            .with_domain("Commerce"),
        Agent::new("L1", AgentLevel::Layer, "Database Layer")
            .reporting_to("D1")
            .with_division("Foundation")
            .with_domain("Infra"),
        Agent::new("L2", AgentLevel::Layer, "Payments Layer")
            .reporting_to("D2")
            .with_division("Business")
            .with_domain("Commerce"),
        Agent::new("E1", AgentLevel::Expert, "Security Expert")
            .reporting_to("C2")
            .with_expertise(["security", "compliance"]),
    ])
    .unwrap()
}

fn engine() -> Engine {
    Engine::new(organisation(), EngineConfig::default())
        .unwrap()
        .with_clock(Arc::new(FixedClock::new(now())))
}

#[test]
fn layer_escalates_to_its_chief() {
    let mut engine = engine();
    let before = engine.log().len();

    let message = engine
        .escalate_to_chief(EscalationRequest {
            agent_id: id("L1"),
            issue: "blocked".to_string(),
            attempted_solutions: vec!["x".to_string()],
            blocking_issue: "y".to_string(),
            impact: "z".to_string(),
            priority: Priority::High,
        })
        .unwrap();

    assert_eq!(message.to().iter().collect::<Vec<_>>(), vec![&id("C1")]);
    assert_eq!(message.message_type(), MessageType::Escalation);
    assert_eq!(message.response_deadline(), Some(now() + Duration::minutes(60)));
    assert!(message.response_required());
    assert_eq!(engine.log().len(), before + 1);
}

#[test]
fn cross_domain_layers_are_not_peers() {
    let mut engine = engine();

    let result = engine.peer_collaboration(PeerRequest {
        from: id("L1"),
        to: id("L2"),
        request: "review my schema".to_string(),
        details: String::new(),
        priority: Priority::Medium,
    });

    assert_eq!(
        result.unwrap_err(),
        EngineError::InvalidPeerRelationship { from: id("L1"), to: id("L2") }
    );
    assert!(engine.log().is_empty());
}

#[test]
fn layer_cannot_reach_the_ceo_directly() {
    let mut engine = engine();
    let result = engine.escalate_to_ceo(CeoEscalation {
        agent_id: id("L1"),
        issue: "outage".to_string(),
        business_impact: "revenue".to_string(),
        recommendation: None,
        deadline: now() + Duration::hours(4),
    });

    assert!(matches!(result, Err(EngineError::Unauthorized { .. })));
    assert!(engine.log().is_empty());
}

#[test]
fn unknown_sender_is_not_found() {
    let mut engine = engine();
    let result = engine.consult_expert(ConsultationRequest {
        agent_id: id("nobody"),
        question: "?".to_string(),
        expertise: vec!["security".to_string()],
        background: String::new(),
        priority: Priority::Medium,
    });
    assert_eq!(result.unwrap_err(), EngineError::NotFound(id("nobody")));
}

#[test]
fn consultation_without_matching_expert_fails() {
    let mut engine = engine();
    let result = engine.consult_expert(ConsultationRequest {
        agent_id: id("L1"),
        question: "How do we shard?".to_string(),
        expertise: vec!["sharding".to_string()],
        background: String::new(),
        priority: Priority::Medium,
    });
    assert!(matches!(result, Err(EngineError::NoRecipients(_))));
    assert!(engine.log().is_empty());
}

#[test]
fn emergency_reaches_ceo_master_control_and_chiefs() {
    let mut engine = engine();
    let received = Arc::new(parking_lot::Mutex::new(Vec::<Message>::new()));
    let sink = Arc::clone(&received);
    engine.subscribe(MessageType::Emergency, move |m: &Message| -> anyhow::Result<()> {
        sink.lock().push(m.clone());
        Ok(())
    });

    let response = engine
        .emergency_intervention(EmergencyRequest {
            triggered_by: id("L2"),
            reason: "payment outage".to_string(),
            severity: Severity::Critical,
            action: "freeze deployments".to_string(),
            affected_scope: vec![id("D2")],
        })
        .unwrap();

    let to: Vec<_> = response.message.to().iter().map(AgentId::as_str).collect();
    assert_eq!(to, ["C1", "C2", "CEO", "master-control"]);
    assert_eq!(response.message.priority(), Priority::Emergency);
    assert_eq!(response.message.response_deadline(), Some(now() + Duration::minutes(5)));
    assert!(response.protocol.affected_agents.contains(&id("L2")));
    assert_eq!(received.lock().len(), 1);
    assert_eq!(engine.emergency_protocols().len(), 1);
}

#[test]
fn knowledge_falls_back_to_chiefs() {
    let mut engine = engine();
    let message = engine
        .share_knowledge(
            KnowledgeEntry::new(id("L1"), KnowledgeType::LessonLearned, "Retry budgets", "Cap them")
                .with_tags(["unmatched-tag"]),
        )
        .unwrap();

    let to: Vec<_> = message.to().iter().map(AgentId::as_str).collect();
    assert_eq!(to, ["C1", "C2"]);
    assert_eq!(message.priority(), Priority::Low);
    assert!(!message.response_required());
    assert_eq!(engine.knowledge().len(), 1);
}

#[test]
fn routed_directive_goes_to_managed_agents() {
    let mut engine = engine();
    let message = engine
        .route_message(MessageIntent::new(MessageType::Directive, "C1", "Freeze schema").to("L2"))
        .unwrap();

    let to: Vec<_> = message.to().iter().map(AgentId::as_str).collect();
    assert_eq!(to, ["D1", "master-control"]);
}

#[test]
fn workload_alert_goes_to_ceo() {
    let mut engine = engine();
    engine.update_metrics(&id("L1"), AgentMetrics::with_load(9, 10)).unwrap();
    engine.update_metrics(&id("E1"), AgentMetrics::with_load(10, 10)).unwrap();

    let mut stream = chain_of_command::subscribe_stream(engine.notifier_mut(), EventFilter::Any);
    let report = engine.check_workload_balance().unwrap();

    assert!(report.emergency_required);
    let alert = stream.try_recv().unwrap();
    assert_eq!(alert.message_type(), MessageType::WorkloadAlert);
    assert_eq!(alert.to().iter().collect::<Vec<_>>(), vec![&id("CEO")]);
}

#[tokio::test]
async fn builtin_organisation_bootstraps() {
    let mut engine = Engine::bootstrap(&BuiltinSeed, EngineConfig::default()).await.unwrap();

    let message = engine
        .escalate_to_chief(EscalationRequest {
            agent_id: id("layer-payments"),
            issue: "Card processor timeouts".to_string(),
            attempted_solutions: vec!["raised timeout".to_string()],
            blocking_issue: "provider throttling".to_string(),
            impact: "checkout failures".to_string(),
            priority: Priority::Critical,
        })
        .unwrap();

    assert_eq!(message.to().iter().collect::<Vec<_>>(), vec![&id("chief-business")]);
}

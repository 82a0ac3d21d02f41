//! Shared knowledge entries indexed by kind

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::agent::AgentId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KnowledgeType {
    LessonLearned,
    BestPractice,
    Optimization,
    IncidentReport,
    IntegrationGuide,
}

impl fmt::Display for KnowledgeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            KnowledgeType::LessonLearned => "lesson_learned",
            KnowledgeType::BestPractice => "best_practice",
            KnowledgeType::Optimization => "optimization",
            KnowledgeType::IncidentReport => "incident_report",
            KnowledgeType::IntegrationGuide => "integration_guide",
        };
        f.write_str(name)
    }
}

/// A piece of knowledge one agent shares with others
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KnowledgeEntry {
    pub from: AgentId,
    pub knowledge_type: KnowledgeType,
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub relevant_agents: Option<Vec<AgentId>>,
    #[serde(default)]
    pub tags: Option<Vec<String>>,
}

impl KnowledgeEntry {
    pub fn new(
        from: impl Into<AgentId>,
        knowledge_type: KnowledgeType,
        title: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            from: from.into(),
            knowledge_type,
            title: title.into(),
            content: content.into(),
            relevant_agents: None,
            tags: None,
        }
    }

    pub fn with_relevant_agents(mut self, agents: Vec<AgentId>) -> Self {
        self.relevant_agents = Some(agents);
        self
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = Some(tags.into_iter().map(Into::into).collect());
        self
    }

    pub fn tags(&self) -> &[String] {
        self.tags.as_deref().unwrap_or_default()
    }
}

/// In-memory knowledge index. Entries never expire here.
#[derive(Debug, Clone, Default)]
pub struct KnowledgeBase {
    entries: HashMap<KnowledgeType, Vec<KnowledgeEntry>>,
}

impl KnowledgeBase {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, entry: KnowledgeEntry) {
        self.entries.entry(entry.knowledge_type).or_default().push(entry);
    }

    /// Entries of one kind, oldest first
    pub fn by_type(&self, knowledge_type: KnowledgeType) -> &[KnowledgeEntry] {
        self.entries
            .get(&knowledge_type)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Entries carrying any of the tags (case-insensitive)
    pub fn search_tags(&self, tags: &[String]) -> Vec<&KnowledgeEntry> {
        self.entries
            .values()
            .flatten()
            .filter(|e| e.tags().iter().any(|t| tags.iter().any(|q| q.eq_ignore_ascii_case(t))))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

//! Category to adapter registry.

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::sync::Arc;

use crate::domain::{Category, DomainError, Result};

use super::AgentAdapter;

/// Maps each category to the adapters registered for it.
///
/// Several adapters may serve one category; agent ids must be unique.
#[derive(Default, Clone)]
pub struct AgentRegistry {
    by_category: BTreeMap<Category, Vec<Arc<dyn AgentAdapter>>>,
    ids: HashSet<String>,
}

impl AgentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an adapter under its own category.
    pub fn register(&mut self, agent: Arc<dyn AgentAdapter>) -> Result<()> {
        if !self.ids.insert(agent.id().to_string()) {
            return Err(DomainError::DuplicateAgent(agent.id().to_string()));
        }
        self.by_category
            .entry(agent.category())
            .or_default()
            .push(agent);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Adapters serving `categories`, by category name then registration order.
    pub fn select(&self, categories: &BTreeSet<Category>) -> Vec<Arc<dyn AgentAdapter>> {
        self.by_category
            .iter()
            .filter(|(category, _)| categories.contains(category))
            .flat_map(|(_, agents)| agents.iter().cloned())
            .collect()
    }

    /// Ids of every registered adapter, sorted.
    pub fn agent_ids(&self) -> BTreeSet<String> {
        self.ids.iter().cloned().collect()
    }
}

impl std::fmt::Debug for AgentRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AgentRegistry")
            .field("agents", &self.agent_ids())
            .finish()
    }
}

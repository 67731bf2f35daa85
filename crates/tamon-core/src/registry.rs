use std::collections::BTreeSet;

use serde::Serialize;
use tamon_models::agent::{AgentCatalog, AgentStatus, AnalystKind};
use tamon_models::feed::StatusChange;

/// One agent's run-time entry.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct AgentEntry {
    pub name: String,
    pub team: String,
    pub status: AgentStatus,
}

/// Per-run status of every catalog agent.
///
/// Statuses only move forward. Analysts that were not selected for the run
/// are never advanced.
#[derive(Debug, Clone)]
pub struct AgentRegistry {
    agents: Vec<AgentEntry>,
    selected: BTreeSet<AnalystKind>,
}

impl AgentRegistry {
    pub fn new(catalog: &AgentCatalog, analysts: &[AnalystKind]) -> Self {
        let agents = catalog
            .agents()
            .map(|(team, name)| AgentEntry {
                name: name.to_string(),
                team: team.to_string(),
                status: AgentStatus::Pending,
            })
            .collect();

        Self {
            agents,
            selected: analysts.iter().copied().collect(),
        }
    }

    pub fn is_selected(&self, analyst: AnalystKind) -> bool {
        self.selected.contains(&analyst)
    }

    /// Selected analysts in pipeline order.
    pub fn selected(&self) -> impl Iterator<Item = AnalystKind> + '_ {
        self.selected.iter().copied()
    }

    pub fn status(&self, agent: &str) -> Option<AgentStatus> {
        self.agents
            .iter()
            .find(|e| e.name == agent)
            .map(|e| e.status)
    }

    pub fn entries(&self) -> &[AgentEntry] {
        &self.agents
    }

    /// Move `agent` to `status` if that is a forward move. Returns the change when one happened.
    pub fn advance(&mut self, agent: &str, status: AgentStatus) -> Option<StatusChange> {
        if let Some(kind) = AnalystKind::from_agent_name(agent) {
            if !self.is_selected(kind) {
                return None;
            }
        }

        let entry = self.agents.iter_mut().find(|e| e.name == agent)?;
        if status <= entry.status {
            return None;
        }
        entry.status = status;

        Some(StatusChange {
            agent: entry.name.clone(),
            status,
        })
    }
}

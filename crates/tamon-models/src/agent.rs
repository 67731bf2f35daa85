use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

pub const MARKET_ANALYST: &str = "Market Analyst";
pub const SOCIAL_ANALYST: &str = "Social Analyst";
pub const NEWS_ANALYST: &str = "News Analyst";
pub const FUNDAMENTALS_ANALYST: &str = "Fundamentals Analyst";
pub const BULL_RESEARCHER: &str = "Bull Researcher";
pub const BEAR_RESEARCHER: &str = "Bear Researcher";
pub const RESEARCH_MANAGER: &str = "Research Manager";
pub const TRADER: &str = "Trader";
pub const RISKY_ANALYST: &str = "Risky Analyst";
pub const NEUTRAL_ANALYST: &str = "Neutral Analyst";
pub const SAFE_ANALYST: &str = "Safe Analyst";
pub const PORTFOLIO_MANAGER: &str = "Portfolio Manager";

/// Lifecycle of a single agent within one run.
///
/// Variants are declared in pipeline order so the derived `Ord` gives
/// `Pending < InProgress < Completed`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum AgentStatus {
    Pending,
    InProgress,
    Completed,
}

impl fmt::Display for AgentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            AgentStatus::Pending => "pending",
            AgentStatus::InProgress => "in_progress",
            AgentStatus::Completed => "completed",
        };
        f.write_str(s)
    }
}

/// The analyst families a run can be configured with.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "lowercase")]
pub enum AnalystKind {
    Market,
    Social,
    News,
    Fundamentals,
}

impl AnalystKind {
    /// All analyst families in pipeline order.
    pub const ALL: [AnalystKind; 4] = [
        AnalystKind::Market,
        AnalystKind::Social,
        AnalystKind::News,
        AnalystKind::Fundamentals,
    ];

    /// Name of the agent that implements this analyst family.
    pub fn agent_name(self) -> &'static str {
        match self {
            AnalystKind::Market => MARKET_ANALYST,
            AnalystKind::Social => SOCIAL_ANALYST,
            AnalystKind::News => NEWS_ANALYST,
            AnalystKind::Fundamentals => FUNDAMENTALS_ANALYST,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            AnalystKind::Market => "market",
            AnalystKind::Social => "social",
            AnalystKind::News => "news",
            AnalystKind::Fundamentals => "fundamentals",
        }
    }

    /// Reverse of [`AnalystKind::agent_name`].
    pub fn from_agent_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.agent_name() == name)
    }
}

impl fmt::Display for AnalystKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AnalystKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "market" => Ok(AnalystKind::Market),
            "social" => Ok(AnalystKind::Social),
            "news" => Ok(AnalystKind::News),
            "fundamentals" => Ok(AnalystKind::Fundamentals),
            other => Err(format!("unknown analyst: {other}")),
        }
    }
}

/// An ordered, named group of agents. Display order only.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Team {
    pub name: String,
    pub agents: Vec<String>,
}

/// Static catalog of every agent the pipeline can run, grouped by team.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AgentCatalog {
    pub teams: Vec<Team>,
}

impl AgentCatalog {
    /// Iterate `(team, agent)` pairs in pipeline order.
    pub fn agents(&self) -> impl Iterator<Item = (&str, &str)> {
        self.teams.iter().flat_map(|team| {
            team.agents
                .iter()
                .map(move |agent| (team.name.as_str(), agent.as_str()))
        })
    }

    pub fn contains(&self, agent: &str) -> bool {
        self.agents().any(|(_, a)| a == agent)
    }
}

impl Default for AgentCatalog {
    fn default() -> Self {
        let team = |name: &str, agents: &[&str]| Team {
            name: name.to_string(),
            agents: agents.iter().map(|a| a.to_string()).collect(),
        };

        Self {
            teams: vec![
                team(
                    "Analyst Team",
                    &[
                        MARKET_ANALYST,
                        SOCIAL_ANALYST,
                        NEWS_ANALYST,
                        FUNDAMENTALS_ANALYST,
                    ],
                ),
                team(
                    "Research Team",
                    &[BULL_RESEARCHER, BEAR_RESEARCHER, RESEARCH_MANAGER],
                ),
                team("Trading Team", &[TRADER]),
                team(
                    "Risk Management",
                    &[RISKY_ANALYST, NEUTRAL_ANALYST, SAFE_ANALYST],
                ),
                team("Portfolio Management", &[PORTFOLIO_MANAGER]),
            ],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_orders_forward() {
        assert!(AgentStatus::Pending < AgentStatus::InProgress);
        assert!(AgentStatus::InProgress < AgentStatus::Completed);
    }

    #[test]
    fn status_serialization() {
        assert_eq!(
            serde_json::to_string(&AgentStatus::InProgress).unwrap(),
            "\"in_progress\""
        );
    }

    #[test]
    fn analyst_kind_parses_case_insensitively() {
        assert_eq!("Market".parse::<AnalystKind>(), Ok(AnalystKind::Market));
        assert_eq!(
            " fundamentals ".parse::<AnalystKind>(),
            Ok(AnalystKind::Fundamentals)
        );
        assert!("quant".parse::<AnalystKind>().is_err());
    }

    #[test]
    fn default_catalog_is_in_pipeline_order() {
        let catalog = AgentCatalog::default();
        let names: Vec<&str> = catalog.agents().map(|(_, a)| a).collect();
        assert_eq!(names.len(), 12);
        assert_eq!(names.first(), Some(&MARKET_ANALYST));
        assert_eq!(names.last(), Some(&PORTFOLIO_MANAGER));
        assert_eq!(catalog.teams.len(), 5);
    }

    #[test]
    fn analyst_agent_names_are_in_catalog() {
        let catalog = AgentCatalog::default();
        for kind in AnalystKind::ALL {
            assert!(catalog.contains(kind.agent_name()));
            assert_eq!(AnalystKind::from_agent_name(kind.agent_name()), Some(kind));
        }
    }
}

//! Infers agent progress and run counters from the engine's snapshot stream.

use std::collections::BTreeSet;

use tamon_models::agent::*;
use tamon_models::feed::StatusChange;
use tamon_models::run::RunCounters;
use tamon_models::snapshot::{SectionKey, Snapshot};

use crate::registry::AgentRegistry;

/// What a report field's first appearance means for the pipeline.
struct Rule {
    section: SectionKey,
    completes: &'static [&'static str],
    starts: Option<&'static str>,
}

/// Applied in this order; every matching rule fires.
const RULES: [Rule; 7] = [
    Rule {
        section: SectionKey::Market,
        completes: &[MARKET_ANALYST],
        starts: Some(SOCIAL_ANALYST),
    },
    Rule {
        section: SectionKey::Sentiment,
        completes: &[SOCIAL_ANALYST],
        starts: Some(NEWS_ANALYST),
    },
    Rule {
        section: SectionKey::News,
        completes: &[NEWS_ANALYST],
        starts: Some(FUNDAMENTALS_ANALYST),
    },
    Rule {
        section: SectionKey::Fundamentals,
        completes: &[FUNDAMENTALS_ANALYST],
        starts: None,
    },
    Rule {
        section: SectionKey::InvestmentPlan,
        completes: &[BULL_RESEARCHER, BEAR_RESEARCHER, RESEARCH_MANAGER],
        starts: Some(TRADER),
    },
    Rule {
        section: SectionKey::TraderPlan,
        completes: &[TRADER],
        starts: Some(RISKY_ANALYST),
    },
    Rule {
        section: SectionKey::FinalDecision,
        completes: &[RISKY_ANALYST, SAFE_ANALYST, NEUTRAL_ANALYST, PORTFOLIO_MANAGER],
        starts: None,
    },
];

/// Everything one snapshot changed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Observation {
    pub changes: Vec<StatusChange>,
    /// Counters after this snapshot, only when they moved.
    pub counters: Option<RunCounters>,
    /// Sections seen non-empty for the first time in this run.
    pub new_sections: Vec<SectionKey>,
    pub progress: Option<String>,
}

impl Observation {
    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
            && self.counters.is_none()
            && self.new_sections.is_empty()
            && self.progress.is_none()
    }
}

/// Per-run status tracker. Create a fresh one for every run.
pub struct StatusTracker {
    registry: AgentRegistry,
    counters: RunCounters,
    seen_sections: BTreeSet<SectionKey>,
    last_message_id: Option<String>,
    last_progress: Option<String>,
    progress_max_chars: usize,
}

impl StatusTracker {
    pub fn new(catalog: &AgentCatalog, analysts: &[AnalystKind], progress_max_chars: usize) -> Self {
        Self {
            registry: AgentRegistry::new(catalog, analysts),
            counters: RunCounters::default(),
            seen_sections: BTreeSet::new(),
            last_message_id: None,
            last_progress: None,
            progress_max_chars,
        }
    }

    pub fn registry(&self) -> &AgentRegistry {
        &self.registry
    }

    pub fn counters(&self) -> RunCounters {
        self.counters
    }

    /// Put the first selected analyst to work.
    pub fn kickoff(&mut self) -> Vec<StatusChange> {
        let first = self.registry.selected().next();
        first
            .and_then(|kind| {
                self.registry
                    .advance(kind.agent_name(), AgentStatus::InProgress)
            })
            .into_iter()
            .collect()
    }

    /// Fold one snapshot into the run state.
    pub fn observe(&mut self, snapshot: &Snapshot) -> Observation {
        let mut observation = Observation::default();
        let before = self.counters;

        for rule in &RULES {
            if snapshot.filled_section(rule.section).is_none() {
                continue;
            }

            for agent in rule.completes {
                observation
                    .changes
                    .extend(self.registry.advance(agent, AgentStatus::Completed));
            }
            if let Some(agent) = rule.starts {
                observation
                    .changes
                    .extend(self.registry.advance(agent, AgentStatus::InProgress));
            }

            if self.seen_sections.insert(rule.section) {
                self.counters.reports += 1;
                observation.new_sections.push(rule.section);
            }
        }

        if let Some(message) = snapshot.latest_message() {
            let repeated = message.id.is_some() && message.id == self.last_message_id;
            if !repeated {
                self.counters.llm_calls += 1;
                self.counters.tool_calls += message.tool_calls.len() as u64;
                self.last_message_id = message.id.clone();
            }

            if let Some(line) = progress_line(&message.content, self.progress_max_chars) {
                if self.last_progress.as_deref() != Some(line.as_str()) {
                    self.last_progress = Some(line.clone());
                    observation.progress = Some(line);
                }
            }
        }

        if self.counters != before {
            observation.counters = Some(self.counters);
        }

        observation
    }
}

/// First non-blank line of `content`, cut to `max_chars`.
fn progress_line(content: &str, max_chars: usize) -> Option<String> {
    let line = content.lines().map(str::trim).find(|l| !l.is_empty())?;
    if line.chars().count() <= max_chars {
        return Some(line.to_string());
    }
    let cut: String = line.chars().take(max_chars).collect();
    Some(format!("{cut}..."))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tamon_models::snapshot::{Message, ToolCall};

    fn tracker(analysts: &[AnalystKind]) -> StatusTracker {
        StatusTracker::new(&AgentCatalog::default(), analysts, 120)
    }

    fn tool(name: &str) -> ToolCall {
        ToolCall {
            name: name.to_string(),
            args: serde_json::Value::Null,
        }
    }

    fn message(id: Option<&str>, content: &str, tools: &[&str]) -> Message {
        Message {
            id: id.map(str::to_string),
            content: content.to_string(),
            tool_calls: tools.iter().map(|t| tool(t)).collect(),
            ..Default::default()
        }
    }

    #[test]
    fn kickoff_starts_first_selected_analyst() {
        let mut t = tracker(&[AnalystKind::News, AnalystKind::Fundamentals]);
        let changes = t.kickoff();
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].agent, NEWS_ANALYST);
        assert_eq!(changes[0].status, AgentStatus::InProgress);
    }

    #[test]
    fn market_report_completes_market_and_starts_social() {
        let mut t = tracker(&AnalystKind::ALL);
        let obs = t.observe(&Snapshot::default().with_section(SectionKey::Market, "M"));

        assert_eq!(t.registry().status(MARKET_ANALYST), Some(AgentStatus::Completed));
        assert_eq!(t.registry().status(SOCIAL_ANALYST), Some(AgentStatus::InProgress));
        assert_eq!(obs.changes.len(), 2);
        assert_eq!(obs.new_sections, vec![SectionKey::Market]);
        assert_eq!(obs.counters.map(|c| c.reports), Some(1));
    }

    #[test]
    fn unselected_social_analyst_is_not_started() {
        let mut t = tracker(&[AnalystKind::Market, AnalystKind::News]);
        t.observe(&Snapshot::default().with_section(SectionKey::Market, "M"));

        assert_eq!(t.registry().status(MARKET_ANALYST), Some(AgentStatus::Completed));
        assert_eq!(t.registry().status(SOCIAL_ANALYST), Some(AgentStatus::Pending));
    }

    #[test]
    fn messages_count_model_and_tool_calls() {
        let mut t = tracker(&AnalystKind::ALL);
        let snapshot = Snapshot::default().with_messages(vec![message(None, "x", &["a", "b"])]);
        let obs = t.observe(&snapshot);

        let counters = obs.counters.unwrap();
        assert_eq!(counters.llm_calls, 1);
        assert_eq!(counters.tool_calls, 2);
        assert_eq!(counters.reports, 0);
    }

    #[test]
    fn resent_message_with_same_id_is_not_recounted() {
        let mut t = tracker(&AnalystKind::ALL);
        let snapshot = Snapshot::default().with_messages(vec![message(Some("m1"), "x", &["a"])]);
        t.observe(&snapshot);
        let obs = t.observe(&snapshot);

        assert!(obs.counters.is_none());
        assert_eq!(t.counters().llm_calls, 1);
        assert_eq!(t.counters().tool_calls, 1);
    }

    #[test]
    fn messages_without_id_count_every_time() {
        let mut t = tracker(&AnalystKind::ALL);
        let snapshot = Snapshot::default().with_messages(vec![message(None, "x", &[])]);
        t.observe(&snapshot);
        t.observe(&snapshot);
        assert_eq!(t.counters().llm_calls, 2);
    }

    #[test]
    fn reemitted_section_counts_once() {
        let mut t = tracker(&AnalystKind::ALL);
        t.observe(&Snapshot::default().with_section(SectionKey::News, "first"));
        let obs = t.observe(&Snapshot::default().with_section(SectionKey::News, "refined"));

        assert_eq!(t.counters().reports, 1);
        assert!(obs.new_sections.is_empty());
        assert!(obs.changes.is_empty());
    }

    #[test]
    fn blank_section_does_not_fire() {
        let mut t = tracker(&AnalystKind::ALL);
        let obs = t.observe(&Snapshot::default().with_section(SectionKey::Market, "  "));
        assert!(obs.is_empty());
        assert_eq!(t.registry().status(MARKET_ANALYST), Some(AgentStatus::Pending));
    }

    #[test]
    fn several_rules_fire_in_one_snapshot() {
        let mut t = tracker(&AnalystKind::ALL);
        let snapshot = Snapshot::default()
            .with_section(SectionKey::InvestmentPlan, "plan")
            .with_section(SectionKey::TraderPlan, "trade")
            .with_messages(vec![message(None, "working", &["x"])]);
        let obs = t.observe(&snapshot);

        assert_eq!(t.registry().status(RESEARCH_MANAGER), Some(AgentStatus::Completed));
        assert_eq!(t.registry().status(TRADER), Some(AgentStatus::Completed));
        assert_eq!(t.registry().status(RISKY_ANALYST), Some(AgentStatus::InProgress));
        assert_eq!(obs.new_sections.len(), 2);
        let counters = obs.counters.unwrap();
        assert_eq!(counters.reports, 2);
        assert_eq!(counters.llm_calls, 1);
        assert_eq!(counters.tool_calls, 1);
    }

    #[test]
    fn out_of_order_fields_never_move_status_backward() {
        let mut t = tracker(&AnalystKind::ALL);
        t.observe(&Snapshot::default().with_section(SectionKey::TraderPlan, "T"));
        assert_eq!(t.registry().status(TRADER), Some(AgentStatus::Completed));

        // investment_plan arriving late would otherwise start the trader again
        let obs = t.observe(
            &Snapshot::default()
                .with_section(SectionKey::TraderPlan, "T")
                .with_section(SectionKey::InvestmentPlan, "I"),
        );
        assert_eq!(t.registry().status(TRADER), Some(AgentStatus::Completed));
        assert!(obs.changes.iter().all(|c| c.agent != TRADER));
    }

    #[test]
    fn final_decision_completes_risk_team_and_manager() {
        let mut t = tracker(&AnalystKind::ALL);
        t.observe(&Snapshot::default().with_section(SectionKey::FinalDecision, "BUY"));
        for agent in [RISKY_ANALYST, SAFE_ANALYST, NEUTRAL_ANALYST, PORTFOLIO_MANAGER] {
            assert_eq!(t.registry().status(agent), Some(AgentStatus::Completed));
        }
    }

    #[test]
    fn progress_line_is_emitted_once_per_distinct_text() {
        let mut t = tracker(&AnalystKind::ALL);
        let snapshot =
            Snapshot::default().with_messages(vec![message(None, "\n  Fetching prices\nmore", &[])]);
        let first = t.observe(&snapshot);
        let second = t.observe(&snapshot);

        assert_eq!(first.progress.as_deref(), Some("Fetching prices"));
        assert_eq!(second.progress, None);
    }

    #[test]
    fn progress_line_is_truncated() {
        assert_eq!(progress_line("abcdef", 3).as_deref(), Some("abc..."));
        assert_eq!(progress_line("abc", 3).as_deref(), Some("abc"));
        assert_eq!(progress_line("  \n ", 3), None);
    }

    #[test]
    fn status_and_counters_are_monotone_over_a_cumulative_stream() {
        let mut t = tracker(&AnalystKind::ALL);
        let m1 = message(Some("m1"), "fetching prices", &["get_stock_data", "get_indicators"]);
        let m2 = message(Some("m2"), "reading headlines", &["get_news"]);
        let stream = [
            Snapshot::default()
                .with_section(SectionKey::Market, "M")
                .with_messages(vec![m1.clone()]),
            Snapshot::default()
                .with_section(SectionKey::Market, "M")
                .with_section(SectionKey::Sentiment, "S")
                .with_messages(vec![m1.clone()]),
            Snapshot::default()
                .with_section(SectionKey::Fundamentals, "F")
                .with_messages(vec![m1.clone(), m2.clone()]),
            Snapshot::default().with_messages(vec![]),
            Snapshot::default()
                .with_section(SectionKey::Market, "M2")
                .with_section(SectionKey::News, "N")
                .with_messages(vec![m1, m2, message(None, "drafting", &[])]),
        ];

        let mut previous: Vec<AgentStatus> =
            t.registry().entries().iter().map(|e| e.status).collect();
        let mut previous_counters = t.counters();
        for snapshot in &stream {
            t.observe(snapshot);
            let current: Vec<AgentStatus> =
                t.registry().entries().iter().map(|e| e.status).collect();
            for (before, after) in previous.iter().zip(&current) {
                assert!(after >= before);
            }
            let counters = t.counters();
            assert!(counters.reports >= previous_counters.reports);
            assert!(counters.llm_calls >= previous_counters.llm_calls);
            assert!(counters.tool_calls >= previous_counters.tool_calls);
            previous = current;
            previous_counters = counters;
        }
        assert_eq!(
            t.counters(),
            RunCounters {
                tool_calls: 3,
                llm_calls: 3,
                reports: 4,
            }
        );
    }

    #[test]
    fn empty_message_list_counts_nothing() {
        let mut t = tracker(&AnalystKind::ALL);
        let obs = t.observe(&Snapshot::default().with_messages(vec![]));

        assert!(obs.counters.is_none());
        assert!(obs.progress.is_none());
        assert_eq!(t.counters(), RunCounters::default());
    }
}

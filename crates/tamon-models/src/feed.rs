use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::agent::AgentStatus;
use crate::run::RunCounters;
use crate::snapshot::SectionKey;

/// A forward move of one agent's status.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StatusChange {
    pub agent: String,
    pub status: AgentStatus,
}

/// A captured report section.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReportSection {
    pub key: SectionKey,
    pub heading: String,
    pub body: String,
}

/// The final document of a run: captured sections in canonical order, then the decision.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CompositeReport {
    pub sections: Vec<ReportSection>,
    pub decision: String,
}

impl fmt::Display for CompositeReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for section in &self.sections {
            write!(f, "## {}\n{}\n\n", section.heading, section.body)?;
        }
        write!(f, "Final Decision:\n{}", self.decision)
    }
}

/// One observable change, as seen by the presentation layer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum FeedEvent {
    RunStarted {
        run_id: Uuid,
        symbol: String,
        analysis_date: NaiveDate,
    },
    AgentStatusChanged {
        agent: String,
        status: AgentStatus,
    },
    CountersChanged(RunCounters),
    ProgressLine {
        text: String,
    },
    RunCompleted {
        report: CompositeReport,
        decision: String,
    },
    RunFailed {
        error: String,
    },
}

impl From<StatusChange> for FeedEvent {
    fn from(change: StatusChange) -> Self {
        FeedEvent::AgentStatusChanged {
            agent: change.agent,
            status: change.status,
        }
    }
}

/// The unit of delivery across the dispatch boundary.
///
/// Everything derived from one snapshot travels in one envelope, so a consumer
/// never sees counters from a snapshot without that snapshot's status changes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Envelope {
    pub run_id: Uuid,
    pub seq: u64,
    pub events: Vec<FeedEvent>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn section(key: SectionKey, body: &str) -> ReportSection {
        ReportSection {
            key,
            heading: key.heading().to_string(),
            body: body.to_string(),
        }
    }

    #[test]
    fn composite_report_renders_sections_then_decision() {
        let report = CompositeReport {
            sections: vec![
                section(SectionKey::Market, "M"),
                section(SectionKey::Fundamentals, "F"),
            ],
            decision: "BUY".to_string(),
        };

        assert_eq!(
            report.to_string(),
            "## Market Analysis\nM\n\n## Fundamentals Analysis\nF\n\nFinal Decision:\nBUY"
        );
    }

    #[test]
    fn composite_report_without_sections() {
        let report = CompositeReport {
            sections: vec![],
            decision: "HOLD".to_string(),
        };
        assert_eq!(report.to_string(), "Final Decision:\nHOLD");
    }

    #[test]
    fn feed_event_json_is_tagged() {
        let event = FeedEvent::AgentStatusChanged {
            agent: "Trader".to_string(),
            status: AgentStatus::InProgress,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["event"], "agent_status_changed");
        assert_eq!(json["agent"], "Trader");
        assert_eq!(json["status"], "in_progress");
    }

    #[test]
    fn counters_event_json_carries_fields() {
        let event = FeedEvent::CountersChanged(RunCounters {
            tool_calls: 2,
            llm_calls: 1,
            reports: 0,
        });
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["event"], "counters_changed");
        assert_eq!(json["tool_calls"], 2);
        assert_eq!(json["llm_calls"], 1);
    }
}

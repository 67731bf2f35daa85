use std::io::{self, Write};

use tamon_core::{DashboardView, FeedReceiver};
use tamon_models::agent::AgentStatus;
use tamon_models::feed::{Envelope, FeedEvent};

/// Writes the run feed to a terminal, as human-readable lines or JSON lines.
pub struct Presenter<W: Write> {
    out: W,
    json: bool,
}

impl<W: Write> Presenter<W> {
    pub fn new(out: W, json: bool) -> Self {
        Self { out, json }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    /// Render one envelope that has already been applied to `view`.
    pub fn render(&mut self, view: &DashboardView, envelope: &Envelope) -> io::Result<()> {
        for event in &envelope.events {
            if self.json {
                let line = serde_json::to_string(event).map_err(io::Error::other)?;
                writeln!(self.out, "{line}")?;
                continue;
            }

            match event {
                FeedEvent::RunStarted {
                    run_id,
                    symbol,
                    analysis_date,
                } => writeln!(self.out, "Run {run_id}: {symbol} as of {analysis_date}")?,
                FeedEvent::AgentStatusChanged { agent, status } => {
                    writeln!(self.out, "  [{status}] {agent}")?
                }
                FeedEvent::CountersChanged(c) => writeln!(
                    self.out,
                    "  Tool calls: {} | LLM calls: {} | Reports: {}",
                    c.tool_calls, c.llm_calls, c.reports
                )?,
                FeedEvent::ProgressLine { text } => writeln!(self.out, "> {text}")?,
                FeedEvent::RunCompleted { report, .. } => {
                    writeln!(self.out)?;
                    self.write_summary(view)?;
                    writeln!(self.out, "\n{report}")?;
                }
                FeedEvent::RunFailed { error } => {
                    writeln!(self.out)?;
                    self.write_summary(view)?;
                    writeln!(self.out, "\nError: {error}")?;
                }
            }
        }
        self.out.flush()
    }

    /// Team-by-team status table.
    fn write_summary(&mut self, view: &DashboardView) -> io::Result<()> {
        let mut current_team = "";
        for agent in view.agents() {
            if agent.team != current_team {
                writeln!(self.out, "{}", agent.team)?;
                current_team = &agent.team;
            }
            let mark = match agent.status {
                AgentStatus::Pending => " ",
                AgentStatus::InProgress => "~",
                AgentStatus::Completed => "x",
            };
            writeln!(self.out, "  [{mark}] {}", agent.name)?;
        }
        Ok(())
    }
}

/// Apply and render envelopes until the current run completes or fails.
pub async fn present_run<W: Write>(
    receiver: &mut FeedReceiver,
    view: &mut DashboardView,
    presenter: &mut Presenter<W>,
) -> io::Result<()> {
    while let Some(envelope) = receiver.next_applied(view).await {
        presenter.render(view, &envelope)?;
        if view.is_finished() {
            break;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tamon_models::agent::{AgentCatalog, TRADER};
    use tamon_models::feed::CompositeReport;
    use tamon_models::run::RunCounters;
    use uuid::Uuid;

    fn envelope(events: Vec<FeedEvent>) -> Envelope {
        Envelope {
            run_id: Uuid::nil(),
            seq: 0,
            events,
        }
    }

    fn render(json: bool, envelope: &Envelope) -> String {
        let mut view = DashboardView::new(&AgentCatalog::default(), 10);
        view.apply(envelope);
        let mut presenter = Presenter::new(Vec::new(), json);
        presenter.render(&view, envelope).unwrap();
        String::from_utf8(presenter.into_inner()).unwrap()
    }

    #[test]
    fn renders_human_lines() {
        let out = render(
            false,
            &envelope(vec![
                FeedEvent::AgentStatusChanged {
                    agent: TRADER.to_string(),
                    status: AgentStatus::InProgress,
                },
                FeedEvent::CountersChanged(RunCounters {
                    tool_calls: 3,
                    llm_calls: 2,
                    reports: 1,
                }),
                FeedEvent::ProgressLine {
                    text: "Drafting plan".to_string(),
                },
            ]),
        );
        assert_eq!(
            out,
            "  [in_progress] Trader\n  Tool calls: 3 | LLM calls: 2 | Reports: 1\n> Drafting plan\n"
        );
    }

    #[test]
    fn completion_prints_summary_and_report() {
        let out = render(
            false,
            &envelope(vec![FeedEvent::RunCompleted {
                report: CompositeReport {
                    sections: vec![],
                    decision: "BUY".to_string(),
                },
                decision: "BUY".to_string(),
            }]),
        );
        assert!(out.contains("Analyst Team\n  [ ] Market Analyst\n"));
        assert!(out.ends_with("Final Decision:\nBUY\n"));
    }

    #[test]
    fn renders_json_lines() {
        let out = render(
            true,
            &envelope(vec![
                FeedEvent::ProgressLine {
                    text: "a".to_string(),
                },
                FeedEvent::RunFailed {
                    error: "boom".to_string(),
                },
            ]),
        );
        let lines: Vec<serde_json::Value> = out
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["event"], "progress_line");
        assert_eq!(lines[1]["error"], "boom");
    }
}

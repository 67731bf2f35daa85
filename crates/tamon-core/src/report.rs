use std::collections::BTreeMap;

use tamon_models::feed::{CompositeReport, ReportSection};
use tamon_models::snapshot::{SectionKey, Snapshot};

/// Collects report section bodies as they appear in the stream.
///
/// A re-emitted section replaces the earlier body. Sections are kept keyed by
/// [`SectionKey`], whose ordering is the canonical report order.
#[derive(Debug, Default)]
pub struct ReportAccumulator {
    sections: BTreeMap<SectionKey, String>,
}

impl ReportAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn capture(&mut self, snapshot: &Snapshot) {
        for key in SectionKey::CANONICAL {
            if let Some(body) = snapshot.filled_section(key) {
                self.sections.insert(key, body.to_string());
            }
        }
    }

    pub fn section(&self, key: SectionKey) -> Option<&str> {
        self.sections.get(&key).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.sections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }

    /// Assemble the composite report. Consumes the accumulator, so a run finalizes once.
    pub fn finalize(self, decision: impl Into<String>) -> CompositeReport {
        let sections = self
            .sections
            .into_iter()
            .map(|(key, body)| ReportSection {
                key,
                heading: key.heading().to_string(),
                body,
            })
            .collect();

        CompositeReport {
            sections,
            decision: decision.into(),
        }
    }
}

use std::fmt;

use serde::{Deserialize, Serialize};

/// The closed set of report sections, in canonical report order.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum SectionKey {
    Market,
    Sentiment,
    News,
    Fundamentals,
    InvestmentPlan,
    TraderPlan,
    FinalDecision,
}

impl SectionKey {
    /// Every section, in the order the composite report emits them.
    pub const CANONICAL: [SectionKey; 7] = [
        SectionKey::Market,
        SectionKey::Sentiment,
        SectionKey::News,
        SectionKey::Fundamentals,
        SectionKey::InvestmentPlan,
        SectionKey::TraderPlan,
        SectionKey::FinalDecision,
    ];

    /// Snapshot field that carries this section's body.
    pub fn field_name(self) -> &'static str {
        match self {
            SectionKey::Market => "market_report",
            SectionKey::Sentiment => "sentiment_report",
            SectionKey::News => "news_report",
            SectionKey::Fundamentals => "fundamentals_report",
            SectionKey::InvestmentPlan => "investment_plan",
            SectionKey::TraderPlan => "trader_investment_plan",
            SectionKey::FinalDecision => "final_trade_decision",
        }
    }

    pub fn heading(self) -> &'static str {
        match self {
            SectionKey::Market => "Market Analysis",
            SectionKey::Sentiment => "Social Sentiment Analysis",
            SectionKey::News => "News Analysis",
            SectionKey::Fundamentals => "Fundamentals Analysis",
            SectionKey::InvestmentPlan => "Research Team Decision",
            SectionKey::TraderPlan => "Trading Team Plan",
            SectionKey::FinalDecision => "Portfolio Management Decision",
        }
    }
}

impl fmt::Display for SectionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.field_name())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum MessageKind {
    Human,
    #[default]
    Ai,
    Tool,
    System,
}

/// A tool invocation requested by a message.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolCall {
    pub name: String,
    #[serde(default)]
    pub args: serde_json::Value,
}

/// One record of the engine's message log.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct Message {
    /// Engine-assigned identifier. Used to avoid recounting a re-sent message.
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default, rename = "type")]
    pub kind: MessageKind,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub tool_calls: Vec<ToolCall>,
}

/// Everything the engine knows about pipeline state at one point in the stream.
///
/// Absent fields deserialize to `None`; unknown fields are ignored.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct Snapshot {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub market_report: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sentiment_report: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub news_report: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fundamentals_report: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub investment_plan: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trader_investment_plan: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub final_trade_decision: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub messages: Option<Vec<Message>>,
}

impl Snapshot {
    /// Raw field value for a section, whether or not it is blank.
    pub fn section(&self, key: SectionKey) -> Option<&str> {
        let field = match key {
            SectionKey::Market => &self.market_report,
            SectionKey::Sentiment => &self.sentiment_report,
            SectionKey::News => &self.news_report,
            SectionKey::Fundamentals => &self.fundamentals_report,
            SectionKey::InvestmentPlan => &self.investment_plan,
            SectionKey::TraderPlan => &self.trader_investment_plan,
            SectionKey::FinalDecision => &self.final_trade_decision,
        };
        field.as_deref()
    }

    /// Section body if present and not blank.
    pub fn filled_section(&self, key: SectionKey) -> Option<&str> {
        self.section(key).filter(|body| !body.trim().is_empty())
    }

    /// Builder used mostly by tests and replay fixtures.
    pub fn with_section(mut self, key: SectionKey, body: impl Into<String>) -> Self {
        let body = Some(body.into());
        match key {
            SectionKey::Market => self.market_report = body,
            SectionKey::Sentiment => self.sentiment_report = body,
            SectionKey::News => self.news_report = body,
            SectionKey::Fundamentals => self.fundamentals_report = body,
            SectionKey::InvestmentPlan => self.investment_plan = body,
            SectionKey::TraderPlan => self.trader_investment_plan = body,
            SectionKey::FinalDecision => self.final_trade_decision = body,
        }
        self
    }

    pub fn with_messages(mut self, messages: Vec<Message>) -> Self {
        self.messages = Some(messages);
        self
    }

    /// The most recent message, if the snapshot carries a message log.
    pub fn latest_message(&self) -> Option<&Message> {
        self.messages.as_ref().and_then(|m| m.last())
    }
}

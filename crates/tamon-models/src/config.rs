use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::agent::AnalystKind;

/// Top-level configuration for the monitor.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MonitorConfig {
    #[serde(default)]
    pub defaults: RunDefaults,
    #[serde(default)]
    pub monitor: MonitorSettings,
    #[serde(default = "default_providers")]
    pub providers: BTreeMap<String, ProviderModels>,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            defaults: RunDefaults::default(),
            monitor: MonitorSettings::default(),
            providers: default_providers(),
        }
    }
}

impl MonitorConfig {
    pub fn provider(&self, name: &str) -> Option<&ProviderModels> {
        self.providers.get(name)
    }
}

/// Defaults used when a start request leaves a parameter unset.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RunDefaults {
    #[serde(default = "default_ticker")]
    pub ticker: String,
    #[serde(default = "default_research_depth")]
    pub research_depth: u32,
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default = "default_analysts")]
    pub analysts: Vec<AnalystKind>,
}

impl Default for RunDefaults {
    fn default() -> Self {
        Self {
            ticker: default_ticker(),
            research_depth: default_research_depth(),
            provider: default_provider(),
            analysts: default_analysts(),
        }
    }
}

/// Tuning for the run controller and the dispatch channel.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MonitorSettings {
    /// Number of envelopes buffered between the run and the presenter.
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,
    /// Fail the run when no snapshot arrives within this many seconds. Unset or 0 = wait forever.
    #[serde(default)]
    pub snapshot_timeout_seconds: Option<u64>,
    /// Progress lines longer than this are truncated.
    #[serde(default = "default_progress_max_chars")]
    pub progress_max_chars: usize,
    /// How many progress lines a dashboard view keeps.
    #[serde(default = "default_progress_history")]
    pub progress_history: usize,
}

impl Default for MonitorSettings {
    fn default() -> Self {
        Self {
            channel_capacity: default_channel_capacity(),
            snapshot_timeout_seconds: None,
            progress_max_chars: default_progress_max_chars(),
            progress_history: default_progress_history(),
        }
    }
}

impl MonitorSettings {
    /// Per-snapshot wait limit, if one is configured. Zero means no limit.
    pub fn snapshot_timeout(&self) -> Option<Duration> {
        self.snapshot_timeout_seconds
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
    }
}

/// Models offered by a provider, split by tier. The first entry is the default.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProviderModels {
    pub quick: Vec<String>,
    pub deep: Vec<String>,
}

impl ProviderModels {
    pub fn default_quick(&self) -> Option<&str> {
        self.quick.first().map(String::as_str)
    }

    pub fn default_deep(&self) -> Option<&str> {
        self.deep.first().map(String::as_str)
    }
}

fn default_ticker() -> String {
    "SPY".to_string()
}
fn default_research_depth() -> u32 {
    1
}
fn default_provider() -> String {
    "openai".to_string()
}
fn default_analysts() -> Vec<AnalystKind> {
    AnalystKind::ALL.to_vec()
}
fn default_channel_capacity() -> usize {
    64
}
fn default_progress_max_chars() -> usize {
    120
}
fn default_progress_history() -> usize {
    200
}

/// Built-in provider catalog. Quick and deep tiers share the same lists.
pub fn default_providers() -> BTreeMap<String, ProviderModels> {
    let catalog: [(&str, &[&str]); 5] = [
        (
            "openai",
            &["gpt-4o-mini", "gpt-4.1-nano", "gpt-4.1-mini", "gpt-4o"],
        ),
        (
            "anthropic",
            &[
                "claude-3-5-haiku-latest",
                "claude-3-5-sonnet-latest",
                "claude-3-7-sonnet-latest",
                "claude-sonnet-4-0",
            ],
        ),
        (
            "google",
            &[
                "gemini-2.0-flash-lite",
                "gemini-2.0-flash",
                "gemini-2.5-flash-preview-05-20",
            ],
        ),
        (
            "openrouter",
            &[
                "meta-llama/llama-4-scout:free",
                "meta-llama/llama-3.3-8b-instruct:free",
                "google/gemini-2.0-flash-exp:free",
            ],
        ),
        ("ollama", &["llama3.1", "llama3.2"]),
    ];

    catalog
        .into_iter()
        .map(|(provider, models)| {
            let models: Vec<String> = models.iter().map(|m| m.to_string()).collect();
            (
                provider.to_string(),
                ProviderModels {
                    quick: models.clone(),
                    deep: models,
                },
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_toml_yields_defaults() {
        let config: MonitorConfig = toml::from_str("").unwrap();
        assert_eq!(config.defaults.ticker, "SPY");
        assert_eq!(config.defaults.analysts.len(), 4);
        assert_eq!(config.monitor.channel_capacity, 64);
        assert_eq!(config.monitor.snapshot_timeout_seconds, None);
        assert_eq!(config.providers.len(), 5);
        assert_eq!(
            config.provider("openai").and_then(|p| p.default_quick()),
            Some("gpt-4o-mini")
        );
    }

    #[test]
    fn config_from_toml() {
        let toml_str = r#"
[defaults]
ticker = "NVDA"
research_depth = 3
provider = "ollama"
analysts = ["market", "news"]

[monitor]
channel_capacity = 8
snapshot_timeout_seconds = 600

[providers.ollama]
quick = ["llama3.2"]
deep = ["llama3.1"]
"#;

        let config: MonitorConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.defaults.ticker, "NVDA");
        assert_eq!(
            config.defaults.analysts,
            vec![AnalystKind::Market, AnalystKind::News]
        );
        assert_eq!(config.monitor.channel_capacity, 8);
        assert_eq!(config.monitor.snapshot_timeout_seconds, Some(600));
        assert_eq!(config.monitor.progress_max_chars, 120);
        // An explicit providers table replaces the built-in catalog.
        assert_eq!(config.providers.len(), 1);
        assert_eq!(
            config.provider("ollama").and_then(|p| p.default_deep()),
            Some("llama3.1")
        );
    }

    #[test]
    fn default_catalog_shares_tiers() {
        let providers = default_providers();
        for models in providers.values() {
            assert_eq!(models.quick, models.deep);
            assert!(!models.quick.is_empty());
        }
    }

    #[test]
    fn zero_snapshot_timeout_means_no_limit() {
        let config: MonitorConfig =
            toml::from_str("[monitor]\nsnapshot_timeout_seconds = 0\n").unwrap();
        assert_eq!(config.monitor.snapshot_timeout_seconds, Some(0));
        assert_eq!(config.monitor.snapshot_timeout(), None);

        let config: MonitorConfig =
            toml::from_str("[monitor]\nsnapshot_timeout_seconds = 30\n").unwrap();
        assert_eq!(
            config.monitor.snapshot_timeout(),
            Some(Duration::from_secs(30))
        );
        assert_eq!(MonitorSettings::default().snapshot_timeout(), None);
    }
}

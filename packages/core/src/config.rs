//! Pipeline configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Configuration for pipeline behavior.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// How long shutdown waits for the dispatcher to exit (milliseconds).
    pub join_timeout_ms: u64,
    /// Longest accepted question, in characters.
    pub max_question_len: usize,
    /// Period of the `time_update` broadcast; 0 disables it.
    pub clock_interval_secs: u64,
    /// Hard limit on a single agent execution.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub execution_timeout_secs: Option<u64>,
    /// Verbose logging.
    pub debug: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            join_timeout_ms: 5_000,
            max_question_len: 4_096,
            clock_interval_secs: 60,
            execution_timeout_secs: None,
            debug: false,
        }
    }
}

impl PipelineConfig {
    /// Defaults overlaid with `PIPELINE_*` environment variables. Unparseable
    /// values keep the default.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            join_timeout_ms: env_parse("PIPELINE_JOIN_TIMEOUT_MS")
                .unwrap_or(defaults.join_timeout_ms),
            max_question_len: env_parse("PIPELINE_MAX_QUESTION_LEN")
                .unwrap_or(defaults.max_question_len),
            clock_interval_secs: env_parse("PIPELINE_CLOCK_INTERVAL_SECS")
                .unwrap_or(defaults.clock_interval_secs),
            execution_timeout_secs: env_parse("PIPELINE_EXECUTION_TIMEOUT_SECS")
                .or(defaults.execution_timeout_secs),
            debug: std::env::var("PIPELINE_DEBUG")
                .ok()
                .and_then(|raw| parse_flag(&raw))
                .unwrap_or(defaults.debug),
        }
    }

    pub fn join_timeout(&self) -> Duration {
        Duration::from_millis(self.join_timeout_ms)
    }

    pub fn clock_interval(&self) -> Option<Duration> {
        (self.clock_interval_secs > 0).then(|| Duration::from_secs(self.clock_interval_secs))
    }

    pub fn execution_timeout(&self) -> Option<Duration> {
        self.execution_timeout_secs.map(Duration::from_secs)
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok()?.trim().parse().ok()
}

/// `1`/`0`, `true`/`false`, `yes`/`no` and `on`/`off`, in any case.
fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

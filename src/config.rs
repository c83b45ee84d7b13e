//! Runtime configuration.
//!
//! Loaded from an optional TOML file, then overridden by environment
//! variables prefixed `HELMSMAN__` (double underscore for nesting, e.g.
//! `HELMSMAN__RETRY__MAX_ATTEMPTS=3`).

use std::path::Path;
use std::time::Duration;

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

use helmsman_session::{RetryPolicy, SessionConfig};

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct RuntimeConfig {
    pub log: LogSection,
    pub browser: BrowserSection,
    pub orchestrator: OrchestratorSection,
    pub retry: RetrySection,
    pub store: StoreSection,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LogSection {
    /// Default tracing filter when `RUST_LOG` is unset.
    pub filter: String,
}

impl Default for LogSection {
    fn default() -> Self {
        Self {
            filter: "info".into(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BrowserSection {
    pub headless: bool,
    pub vision: bool,
}

impl Default for BrowserSection {
    fn default() -> Self {
        Self {
            headless: true,
            vision: false,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OrchestratorSection {
    pub replan_budget: u32,
    pub max_plan_steps: usize,
    pub planner_timeout_ms: u64,
    pub session_budget_ms: u64,
}

impl Default for OrchestratorSection {
    fn default() -> Self {
        Self {
            replan_budget: 3,
            max_plan_steps: 100,
            planner_timeout_ms: 60_000,
            session_budget_ms: 3_600_000,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RetrySection {
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
    pub step_timeout_ms: u64,
}

impl Default for RetrySection {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_delay_ms: 1_000,
            max_delay_ms: 15_000,
            step_timeout_ms: 30_000,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StoreSection {
    /// Timeout applied to every store operation.
    pub op_timeout_ms: u64,
}

impl Default for StoreSection {
    fn default() -> Self {
        Self {
            op_timeout_ms: 5_000,
        }
    }
}

impl RuntimeConfig {
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut builder = Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(File::from(path));
        }
        builder
            .add_source(Environment::with_prefix("HELMSMAN").separator("__"))
            .build()?
            .try_deserialize()
    }

    /// Session defaults derived from this runtime configuration.
    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            headless: self.browser.headless,
            vision: self.browser.vision,
            step_timeout_ms: self.retry.step_timeout_ms,
            planner_timeout_ms: self.orchestrator.planner_timeout_ms,
            session_budget_ms: self.orchestrator.session_budget_ms,
            max_plan_steps: self.orchestrator.max_plan_steps,
            replan_budget: self.orchestrator.replan_budget,
            retry: RetryPolicy {
                max_attempts: self.retry.max_attempts,
                base_delay_ms: self.retry.base_delay_ms,
                max_delay_ms: self.retry.max_delay_ms,
            },
        }
    }

    pub fn store_op_timeout(&self) -> Duration {
        Duration::from_millis(self.store.op_timeout_ms)
    }
}

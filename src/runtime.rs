use std::sync::Arc;

use anyhow::Context;
use tracing::info;

use helmsman_action_executor::BrowserCapability;
use helmsman_orchestrator::{OrchestratorRegistry, Planner};
use helmsman_session::SessionConfig;
use helmsman_session_store::{MemorySessionStore, SessionStore, TimedSessionStore};

use crate::config::RuntimeConfig;

/// Wires a registry from configuration plus injected capabilities.
///
/// The planner and browser are the external collaborators; the store
/// defaults to the in-process tier and is always bounded by the
/// configured per-operation timeout.
pub struct RuntimeBuilder {
    config: RuntimeConfig,
    planner: Option<Arc<dyn Planner>>,
    browser: Option<Arc<dyn BrowserCapability>>,
    store: Option<Arc<dyn SessionStore>>,
}

impl RuntimeBuilder {
    pub fn new(config: RuntimeConfig) -> Self {
        Self {
            config,
            planner: None,
            browser: None,
            store: None,
        }
    }

    pub fn with_planner(mut self, planner: Arc<dyn Planner>) -> Self {
        self.planner = Some(planner);
        self
    }

    pub fn with_browser(mut self, browser: Arc<dyn BrowserCapability>) -> Self {
        self.browser = Some(browser);
        self
    }

    pub fn with_store(mut self, store: Arc<dyn SessionStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn build(self) -> anyhow::Result<Runtime> {
        let planner = self.planner.context("a planner capability is required")?;
        let browser = self.browser.context("a browser capability is required")?;
        let backing = self
            .store
            .unwrap_or_else(|| Arc::new(MemorySessionStore::new()));
        let store: Arc<dyn SessionStore> = Arc::new(TimedSessionStore::new(
            backing,
            self.config.store_op_timeout(),
        ));

        let registry = Arc::new(OrchestratorRegistry::new(planner, browser, store));
        info!(
            target: "runtime",
            replan_budget = self.config.orchestrator.replan_budget,
            max_attempts = self.config.retry.max_attempts,
            "runtime assembled"
        );
        Ok(Runtime {
            registry,
            session_defaults: self.config.session_config(),
        })
    }
}

pub struct Runtime {
    registry: Arc<OrchestratorRegistry>,
    session_defaults: SessionConfig,
}

impl Runtime {
    pub fn registry(&self) -> &Arc<OrchestratorRegistry> {
        &self.registry
    }

    /// Per-session configuration derived from the runtime config; a
    /// caller may tweak it before `start`.
    pub fn session_defaults(&self) -> SessionConfig {
        self.session_defaults.clone()
    }
}

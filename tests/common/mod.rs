#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{json, Value};

use helmsman::{
    ActionFault, ActionStep, BrowserCapability, MemorySessionStore, OrchestratorRegistry, Plan,
    PlanContext, Planner, PlanningFailure, RetryPolicy, Session, SessionConfig, SessionId,
    SessionStatus, SessionStore, StoreError, StoreResult,
};

/// Planner that replays a queue of scripted outcomes and remembers the
/// context it was called with.
#[derive(Default)]
pub struct ScriptedPlanner {
    plans: Mutex<VecDeque<Result<Vec<ActionStep>, PlanningFailure>>>,
    pub contexts: Mutex<Vec<PlanContext>>,
}

impl ScriptedPlanner {
    pub fn with_plans(plans: Vec<Result<Vec<ActionStep>, PlanningFailure>>) -> Self {
        Self {
            plans: Mutex::new(plans.into()),
            contexts: Mutex::new(Vec::new()),
        }
    }

    pub fn single_step_plans() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> usize {
        self.contexts.lock().len()
    }
}

#[async_trait]
impl Planner for ScriptedPlanner {
    async fn plan(&self, _goal: &str, context: &PlanContext) -> Result<Plan, PlanningFailure> {
        self.contexts.lock().push(context.clone());
        match self.plans.lock().pop_front() {
            Some(Ok(steps)) => Ok(Plan::new(0, steps)),
            Some(Err(failure)) => Err(failure),
            // Script exhausted: fall back to a trivial one-step plan.
            None => Ok(Plan::new(0, vec![ActionStep::new("navigate", json!({}))])),
        }
    }
}

/// Browser that replays a queue of outcomes, succeeding with `{}` once
/// the script runs dry.
#[derive(Default)]
pub struct ScriptedBrowser {
    outcomes: Mutex<VecDeque<Result<Value, ActionFault>>>,
    pub calls: Mutex<Vec<String>>,
}

impl ScriptedBrowser {
    pub fn with_outcomes(outcomes: Vec<Result<Value, ActionFault>>) -> Self {
        Self {
            outcomes: Mutex::new(outcomes.into()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn always_ok() -> Self {
        Self::default()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }
}

#[async_trait]
impl BrowserCapability for ScriptedBrowser {
    async fn perform(&self, action: &str, _params: &Value) -> Result<Value, ActionFault> {
        self.calls.lock().push(action.to_string());
        self.outcomes.lock().pop_front().unwrap_or(Ok(json!({})))
    }
}

/// Store wrapper that records every persisted snapshot and can be armed
/// to reject the next put carrying a given status.
#[derive(Default)]
pub struct RecordingStore {
    inner: MemorySessionStore,
    pub puts: Mutex<Vec<Session>>,
    fail_next_with_status: Mutex<Option<SessionStatus>>,
}

impl RecordingStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_next_put_with_status(&self, status: SessionStatus) {
        *self.fail_next_with_status.lock() = Some(status);
    }

    pub fn recorded_statuses(&self) -> Vec<SessionStatus> {
        self.puts.lock().iter().map(|s| s.status).collect()
    }
}

#[async_trait]
impl SessionStore for RecordingStore {
    async fn get(&self, id: &SessionId) -> StoreResult<Option<Session>> {
        self.inner.get(id).await
    }

    async fn put(&self, session: &Session) -> StoreResult<()> {
        let armed = {
            let mut slot = self.fail_next_with_status.lock();
            if *slot == Some(session.status) {
                slot.take()
            } else {
                None
            }
        };
        if armed.is_some() {
            return Err(StoreError::Unavailable("injected outage".into()));
        }
        self.inner.put(session).await?;
        self.puts.lock().push(session.clone());
        Ok(())
    }

    async fn delete(&self, id: &SessionId) -> StoreResult<bool> {
        self.inner.delete(id).await
    }

    async fn list(&self) -> StoreResult<Vec<SessionId>> {
        self.inner.list().await
    }
}

/// Session config tuned so failure paths do not sleep through real
/// backoff delays.
pub fn quick_config() -> SessionConfig {
    SessionConfig {
        retry: RetryPolicy {
            max_attempts: 1,
            base_delay_ms: 0,
            max_delay_ms: 0,
        },
        replan_budget: 2,
        ..SessionConfig::default()
    }
}

pub async fn wait_until_idle(registry: &Arc<OrchestratorRegistry>, id: &SessionId) {
    for _ in 0..1000 {
        if !registry.is_active(id) {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("run for {id} did not settle");
}

pub async fn wait_for_status(
    registry: &Arc<OrchestratorRegistry>,
    id: &SessionId,
    status: SessionStatus,
) -> Session {
    for _ in 0..1000 {
        if let Ok(report) = registry.get_status(id).await {
            if report.session.status == status {
                return report.session;
            }
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("session {id} never reached {status:?}");
}

use std::collections::BTreeMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use helmsman_core_types::{PlanId, SessionId};

use crate::errors::InvalidTransition;
use crate::event::{SessionEvent, SessionEventKind};
use crate::machine::{advance, Trigger};

/// Lifecycle status of one automation session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    /// Created but orchestration has not started yet.
    Created,
    /// Waiting on the planning capability.
    Planning,
    /// Stepping through the active plan.
    Executing,
    /// Suspended until the user answers a pending question.
    AwaitingUserInput,
    /// Goal reached.
    Completed,
    /// Gave up; `last_error` carries the reason.
    Failed,
    /// Cancelled on request.
    Cancelled,
}

impl SessionStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }
}

/// Retry behaviour for a single action step.
///
/// Delays grow as `base * 2^(attempt-1)` up to the cap.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Attempts per step before the failure is surfaced.
    /// Default: 5
    pub max_attempts: u32,
    /// Delay before the second attempt, in milliseconds.
    /// Default: 1000
    pub base_delay_ms: u64,
    /// Upper bound on any single backoff delay, in milliseconds.
    /// Default: 15000
    pub max_delay_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_delay_ms: 1_000,
            max_delay_ms: 15_000,
        }
    }
}

impl RetryPolicy {
    /// Backoff delay after the given 1-based failed attempt.
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(20);
        let raw = self.base_delay_ms.saturating_mul(1u64 << exponent);
        Duration::from_millis(raw.min(self.max_delay_ms))
    }
}

/// Per-session configuration persisted with the snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Run the browser headless.
    /// Default: true
    pub headless: bool,
    /// Feed screenshots to the planner (vision mode).
    /// Default: false
    pub vision: bool,
    /// Timeout per action attempt in milliseconds.
    /// Default: 30000
    pub step_timeout_ms: u64,
    /// Timeout for one planning call in milliseconds.
    /// Default: 60000
    pub planner_timeout_ms: u64,
    /// Wall-clock budget for the whole session in milliseconds.
    /// Default: 3600000 (1 hour)
    pub session_budget_ms: u64,
    /// Longest plan accepted from the planner.
    /// Default: 100
    pub max_plan_steps: usize,
    /// Re-plan cycles allowed before the session fails.
    /// Default: 3
    pub replan_budget: u32,
    /// Session-level retry policy; steps may override `max_attempts`.
    pub retry: RetryPolicy,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            headless: true,
            vision: false,
            step_timeout_ms: 30_000,
            planner_timeout_ms: 60_000,
            session_budget_ms: 3_600_000,
            max_plan_steps: 100,
            replan_budget: 3,
            retry: RetryPolicy::default(),
        }
    }
}

impl SessionConfig {
    pub fn step_timeout(&self) -> Duration {
        Duration::from_millis(self.step_timeout_ms)
    }

    pub fn planner_timeout(&self) -> Duration {
        Duration::from_millis(self.planner_timeout_ms)
    }

    pub fn session_budget(&self) -> Duration {
        Duration::from_millis(self.session_budget_ms)
    }
}

/// One unit of browser interaction within a plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionStep {
    /// Position within the issuing plan.
    pub index: u32,
    /// Capability name, e.g. `navigate` or `click`.
    pub action: String,
    /// Opaque parameters forwarded to the capability.
    pub params: Value,
    /// Expected-outcome hint from the planner.
    pub note: Option<String>,
    /// Session variable that receives this step's observation.
    pub capture_as: Option<String>,
    /// Overrides the session retry policy's attempt count.
    pub max_attempts: Option<u32>,
}

impl ActionStep {
    pub fn new(action: impl Into<String>, params: Value) -> Self {
        Self {
            index: 0,
            action: action.into(),
            params,
            note: None,
            capture_as: None,
            max_attempts: None,
        }
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }

    pub fn with_capture(mut self, variable: impl Into<String>) -> Self {
        self.capture_as = Some(variable.into());
        self
    }

    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = Some(attempts);
        self
    }
}

/// Ordered batch of steps issued atomically by one planning call.
///
/// Immutable once issued; a re-plan replaces the whole value and bumps
/// the revision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Plan {
    pub id: PlanId,
    pub revision: u32,
    pub steps: Vec<ActionStep>,
}

impl Plan {
    /// Builds a plan, stamping each step with its position.
    pub fn new(revision: u32, mut steps: Vec<ActionStep>) -> Self {
        for (index, step) in steps.iter_mut().enumerate() {
            step.index = index as u32;
        }
        Self {
            id: PlanId::new(),
            revision,
            steps,
        }
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn step(&self, index: usize) -> Option<&ActionStep> {
        self.steps.get(index)
    }
}

/// Outcome of executing one action step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ActionResult {
    Succeeded(Value),
    Failed { reason: String, retryable: bool },
    RequiresUserInput { question: String },
}

/// One end-to-end automation task instance.
///
/// Owned exclusively by its orchestrator while a run is live; at rest it
/// is owned by the session store. The event log is append-only and is
/// the sole basis for history reconstruction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub id: SessionId,
    pub status: SessionStatus,
    pub goal: String,
    pub config: SessionConfig,
    pub plan: Option<Plan>,
    pub current_step: usize,
    pub replans_used: u32,
    pub pending_question: Option<String>,
    pub last_error: Option<String>,
    pub final_result: Option<String>,
    pub variables: BTreeMap<String, Value>,
    pub events: Vec<SessionEvent>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Session {
    pub fn new(id: SessionId, goal: impl Into<String>, config: SessionConfig) -> Self {
        let now = Utc::now();
        Self {
            id,
            status: SessionStatus::Created,
            goal: goal.into(),
            config,
            plan: None,
            current_step: 0,
            replans_used: 0,
            pending_question: None,
            last_error: None,
            final_result: None,
            variables: BTreeMap::new(),
            events: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Appends an event stamped with the current time.
    pub fn record(&mut self, kind: SessionEventKind) {
        self.events.push(SessionEvent::now(kind));
    }

    /// Applies a trigger through the transition table, recording the
    /// status change. An undefined pair leaves the session untouched.
    pub fn apply(&mut self, trigger: &Trigger) -> Result<SessionStatus, InvalidTransition> {
        let from = self.status;
        let to = advance(from, trigger)?;
        self.status = to;
        self.record(SessionEventKind::StatusChanged { from, to });
        self.updated_at = Utc::now();
        Ok(to)
    }

    /// Installs a freshly issued plan, superseding any prior one.
    pub fn install_plan(&mut self, plan: Plan) {
        self.record(SessionEventKind::PlanIssued {
            plan_id: plan.id.clone(),
            revision: plan.revision,
            steps: plan.len(),
        });
        self.current_step = 0;
        self.plan = Some(plan);
    }

    pub fn next_revision(&self) -> u32 {
        self.plan.as_ref().map(|p| p.revision + 1).unwrap_or(0)
    }

    /// The step the orchestrator would execute next, if any remain.
    pub fn pending_step(&self) -> Option<&ActionStep> {
        self.plan.as_ref().and_then(|p| p.step(self.current_step))
    }

    pub fn remaining_steps(&self) -> usize {
        self.plan
            .as_ref()
            .map(|p| p.len().saturating_sub(self.current_step))
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn backoff_doubles_and_caps() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay_after(1), Duration::from_secs(1));
        assert_eq!(policy.delay_after(2), Duration::from_secs(2));
        assert_eq!(policy.delay_after(3), Duration::from_secs(4));
        assert_eq!(policy.delay_after(4), Duration::from_secs(8));
        assert_eq!(policy.delay_after(5), Duration::from_secs(15));
        assert_eq!(policy.delay_after(9), Duration::from_secs(15));
    }

    #[test]
    fn plan_stamps_step_indices() {
        let plan = Plan::new(
            0,
            vec![
                ActionStep::new("navigate", json!({"url": "https://example.com"})),
                ActionStep::new("extract_text", json!({"selector": "h1"})),
            ],
        );
        assert_eq!(plan.steps[0].index, 0);
        assert_eq!(plan.steps[1].index, 1);
    }

    #[test]
    fn session_snapshot_round_trips() {
        let mut session = Session::new(SessionId::new(), "read the title", SessionConfig::default());
        session.install_plan(Plan::new(
            0,
            vec![ActionStep::new("navigate", json!({"url": "https://example.com"}))
                .with_capture("page")],
        ));
        session
            .variables
            .insert("page".into(), json!({"title": "Example"}));

        let encoded = serde_json::to_string(&session).unwrap();
        let decoded: Session = serde_json::from_str(&encoded).unwrap();
        assert_eq!(decoded, session);
    }

    #[test]
    fn pending_step_tracks_cursor() {
        let mut session = Session::new(SessionId::new(), "goal", SessionConfig::default());
        assert!(session.pending_step().is_none());

        session.install_plan(Plan::new(
            0,
            vec![
                ActionStep::new("navigate", json!({})),
                ActionStep::new("click", json!({})),
            ],
        ));
        assert_eq!(session.pending_step().unwrap().action, "navigate");
        assert_eq!(session.remaining_steps(), 2);

        session.current_step = 1;
        assert_eq!(session.pending_step().unwrap().action, "click");
        session.current_step = 2;
        assert!(session.pending_step().is_none());
        assert_eq!(session.remaining_steps(), 0);
    }
}

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use helmsman_session::{Plan, Session, SessionEvent, SessionEventKind};

/// The consumed planning capability: goal plus observation history in,
/// ordered plan out. Safe to call repeatedly on re-plan; no side
/// effects are assumed. Concrete adapters (LLM backends, rule engines)
/// are injected by the embedding application.
#[async_trait]
pub trait Planner: Send + Sync {
    async fn plan(&self, goal: &str, context: &PlanContext) -> Result<Plan, PlanningFailure>;
}

/// The planner cannot produce a usable plan. Terminal for the session
/// unless the caller supplies new input.
#[derive(Debug, Clone, Error)]
#[error("planning failed: {reason}")]
pub struct PlanningFailure {
    pub reason: String,
}

impl PlanningFailure {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

/// Observation history handed to the planner on every planning call,
/// reconstructed from the session's event log.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct PlanContext {
    pub entries: Vec<ContextEntry>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ContextEntry {
    Observation { step_index: u32, observation: Value },
    Failure { step_index: u32, reason: String },
    UserResponse { response: String },
}

impl PlanContext {
    pub fn from_events(events: &[SessionEvent]) -> Self {
        let entries = events
            .iter()
            .filter_map(|event| match &event.kind {
                SessionEventKind::StepSucceeded {
                    step_index,
                    observation,
                } => Some(ContextEntry::Observation {
                    step_index: *step_index,
                    observation: observation.clone(),
                }),
                SessionEventKind::StepFailed {
                    step_index, reason, ..
                } => Some(ContextEntry::Failure {
                    step_index: *step_index,
                    reason: reason.clone(),
                }),
                SessionEventKind::UserResponded { response } => {
                    Some(ContextEntry::UserResponse {
                        response: response.clone(),
                    })
                }
                _ => None,
            })
            .collect();
        Self { entries }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Most recent user answer, if the session was resumed with one.
    pub fn last_user_response(&self) -> Option<&str> {
        self.entries.iter().rev().find_map(|entry| match entry {
            ContextEntry::UserResponse { response } => Some(response.as_str()),
            _ => None,
        })
    }
}

/// Snapshot plus run health returned by `get_status`.
#[derive(Clone, Debug)]
pub struct StatusReport {
    pub session: Session,
    pub run: RunHealth,
}

/// Whether a run is live for the session, and whether the last run
/// aborted on a store outage. `StoreDegraded` is distinct from a
/// `Failed` session: the task is not abandoned, the caller should
/// retry once the store is healthy.
#[derive(Clone, Debug, PartialEq)]
pub enum RunHealth {
    Active,
    Idle,
    StoreDegraded(String),
}

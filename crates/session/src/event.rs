use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use helmsman_core_types::PlanId;

use crate::model::SessionStatus;

/// Immutable audit record appended on every state transition, step
/// outcome or plan issuance. Never deleted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionEvent {
    pub at: DateTime<Utc>,
    pub kind: SessionEventKind,
}

impl SessionEvent {
    pub fn now(kind: SessionEventKind) -> Self {
        Self {
            at: Utc::now(),
            kind,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionEventKind {
    StatusChanged {
        from: SessionStatus,
        to: SessionStatus,
    },
    PlanIssued {
        plan_id: PlanId,
        revision: u32,
        steps: usize,
    },
    /// One per executor attempt, including the attempt that succeeds.
    StepAttempted {
        step_index: u32,
        attempt: u32,
        outcome: AttemptOutcome,
    },
    StepSucceeded {
        step_index: u32,
        observation: Value,
    },
    StepFailed {
        step_index: u32,
        reason: String,
        retryable: bool,
    },
    UserPromptRaised {
        question: String,
    },
    UserResponded {
        response: String,
    },
    ReplanTriggered {
        reason: String,
        replans_used: u32,
    },
}

/// Outcome of a single executor attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttemptOutcome {
    Succeeded,
    Failed { reason: String, retryable: bool },
    TimedOut,
}

/// Receives events emitted outside the session's own append path, e.g.
/// per-attempt records from the action executor.
#[async_trait]
pub trait EventSink: Send + Sync {
    async fn record(&self, event: SessionEvent);
}

/// Buffering sink; the orchestrator drains it into the session log
/// before committing a transition.
#[derive(Default)]
pub struct MemoryEventSink {
    events: Mutex<Vec<SessionEvent>>,
}

impl MemoryEventSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn drain(&self) -> Vec<SessionEvent> {
        std::mem::take(&mut *self.events.lock())
    }

    pub fn snapshot(&self) -> Vec<SessionEvent> {
        self.events.lock().clone()
    }
}

#[async_trait]
impl EventSink for MemoryEventSink {
    async fn record(&self, event: SessionEvent) {
        self.events.lock().push(event);
    }
}

#[derive(Clone, Copy, Default, Debug)]
pub struct NoopEventSink;

#[async_trait]
impl EventSink for NoopEventSink {
    async fn record(&self, _event: SessionEvent) {}
}

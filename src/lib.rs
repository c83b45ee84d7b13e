//! Helmsman: session orchestration core for LLM-guided web automation.
//!
//! Turns a natural-language goal into a supervised sequence of browser
//! actions: a per-session state machine interleaves planning, step
//! execution with retry and re-plan recovery, user-interjection points
//! and durable write-through snapshots, with many isolated sessions in
//! flight at once. Planning, browser actions and storage are consumed
//! as narrow injected capabilities.

pub mod config;
pub mod runtime;
pub mod telemetry;

pub use config::RuntimeConfig;
pub use runtime::{Runtime, RuntimeBuilder};

// Re-export the component surface for embedders.
pub use helmsman_action_executor::{
    ActionExecutor, ActionFault, BrowserCapability, NoopBrowser, ASK_USER_ACTION,
};
pub use helmsman_core_types::{HelmError, PlanId, SessionId};
pub use helmsman_orchestrator::{
    ContextEntry, OrchestratorError, OrchestratorRegistry, PlanContext, Planner, PlanningFailure,
    RunHealth, SessionOrchestrator, StatusReport,
};
pub use helmsman_session::{
    ActionResult, ActionStep, AttemptOutcome, EventSink, InvalidTransition, MemoryEventSink,
    NoopEventSink, Plan, RetryPolicy, Session, SessionConfig, SessionEvent, SessionEventKind,
    SessionStatus, Trigger,
};
pub use helmsman_session_store::{
    MemorySessionStore, SessionStore, StoreError, StoreResult, TieredSessionStore,
    TimedSessionStore,
};

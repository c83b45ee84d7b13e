pub mod errors;
pub mod event;
pub mod machine;
pub mod model;

pub use errors::InvalidTransition;
pub use event::{
    AttemptOutcome, EventSink, MemoryEventSink, NoopEventSink, SessionEvent, SessionEventKind,
};
pub use machine::{advance, Trigger};
pub use model::{ActionResult, ActionStep, Plan, RetryPolicy, Session, SessionConfig, SessionStatus};

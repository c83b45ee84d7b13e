pub mod api;
pub mod errors;
pub mod registry;
pub mod run;

pub use api::{ContextEntry, PlanContext, Planner, PlanningFailure, RunHealth, StatusReport};
pub use errors::OrchestratorError;
pub use registry::OrchestratorRegistry;
pub use run::SessionOrchestrator;

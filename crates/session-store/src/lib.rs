pub mod api;
pub mod errors;
pub mod tiered;
pub mod timed;

pub use api::{MemorySessionStore, SessionStore, StoreResult};
pub use errors::StoreError;
pub use tiered::TieredSessionStore;
pub use timed::TimedSessionStore;

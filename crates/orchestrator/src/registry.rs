use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use helmsman_action_executor::BrowserCapability;
use helmsman_core_types::SessionId;
use helmsman_session::{Session, SessionConfig, SessionStatus, Trigger};
use helmsman_session_store::SessionStore;

use crate::api::{Planner, RunHealth, StatusReport};
use crate::errors::OrchestratorError;
use crate::run::SessionOrchestrator;

struct ActiveRun {
    cancel: CancellationToken,
}

/// Owns the set of live in-memory session runs.
///
/// At most one run per session id exists process-wide: registration
/// goes through the map's entry API, and the guard is never held across
/// an await. Worker tasks clone the shared handles they need before
/// they start; no other in-memory state crosses session boundaries.
pub struct OrchestratorRegistry {
    planner: Arc<dyn Planner>,
    browser: Arc<dyn BrowserCapability>,
    store: Arc<dyn SessionStore>,
    active: Arc<DashMap<SessionId, ActiveRun>>,
    degraded: Arc<DashMap<SessionId, String>>,
}

impl OrchestratorRegistry {
    pub fn new(
        planner: Arc<dyn Planner>,
        browser: Arc<dyn BrowserCapability>,
        store: Arc<dyn SessionStore>,
    ) -> Self {
        Self {
            planner,
            browser,
            store,
            active: Arc::new(DashMap::new()),
            degraded: Arc::new(DashMap::new()),
        }
    }

    /// Creates a new session and starts driving it in the background.
    pub async fn start(
        &self,
        id: SessionId,
        goal: impl Into<String>,
        config: SessionConfig,
    ) -> Result<(), OrchestratorError> {
        let cancel = self.register(&id)?;
        let prepared = async {
            if self.store.get(&id).await?.is_some() {
                return Err(OrchestratorError::Conflict);
            }
            let session = Session::new(id.clone(), goal, config);
            self.store.put(&session).await?;
            Ok(session)
        }
        .await;

        match prepared {
            Ok(session) => {
                info!(target: "orchestrator", session = %id, "session accepted");
                self.spawn_run(id, cancel, session, None);
                Ok(())
            }
            Err(err) => {
                self.active.remove(&id);
                Err(err)
            }
        }
    }

    /// Picks a persisted session back up, e.g. after a process restart.
    /// A session waiting on the user stays suspended; terminal sessions
    /// are reported, not re-driven.
    pub async fn resume(&self, id: SessionId) -> Result<(), OrchestratorError> {
        let cancel = self.register(&id)?;
        let loaded = async {
            let session = self
                .store
                .get(&id)
                .await?
                .ok_or(OrchestratorError::NotFound)?;
            if session.is_terminal() {
                return Err(OrchestratorError::InvalidState(format!(
                    "session already {:?}",
                    session.status
                )));
            }
            Ok(session)
        }
        .await;

        match loaded {
            Ok(session) if session.status == SessionStatus::AwaitingUserInput => {
                self.active.remove(&id);
                Ok(())
            }
            Ok(session) => {
                info!(target: "orchestrator", session = %id, status = ?session.status, "resuming from snapshot");
                self.spawn_run(id, cancel, session, None);
                Ok(())
            }
            Err(err) => {
                self.active.remove(&id);
                Err(err)
            }
        }
    }

    /// Feeds a user's answer into a suspended session and resumes it.
    pub async fn submit_user_response(
        &self,
        id: SessionId,
        response: impl Into<String>,
    ) -> Result<(), OrchestratorError> {
        let cancel = self.register(&id)?;
        let loaded = async {
            let session = self
                .store
                .get(&id)
                .await?
                .ok_or(OrchestratorError::NotFound)?;
            if session.status != SessionStatus::AwaitingUserInput {
                return Err(OrchestratorError::InvalidState(format!(
                    "session is {:?}, not awaiting user input",
                    session.status
                )));
            }
            Ok(session)
        }
        .await;

        match loaded {
            Ok(session) => {
                self.spawn_run(id, cancel, session, Some(response.into()));
                Ok(())
            }
            Err(err) => {
                self.active.remove(&id);
                Err(err)
            }
        }
    }

    /// Latest durable snapshot plus run health.
    pub async fn get_status(&self, id: &SessionId) -> Result<StatusReport, OrchestratorError> {
        let session = self
            .store
            .get(id)
            .await?
            .ok_or(OrchestratorError::NotFound)?;
        let run = if self.active.contains_key(id) {
            RunHealth::Active
        } else if let Some(entry) = self.degraded.get(id) {
            RunHealth::StoreDegraded(entry.value().clone())
        } else {
            RunHealth::Idle
        };
        Ok(StatusReport { session, run })
    }

    /// Advisory cancellation. A live run is signalled and winds down at
    /// its next step boundary; a suspended session is cancelled
    /// directly. A late cancel against a terminated session is logged
    /// and ignored.
    pub async fn cancel(&self, id: &SessionId) -> Result<(), OrchestratorError> {
        if let Some(run) = self.active.get(id) {
            run.cancel.cancel();
            info!(target: "orchestrator", session = %id, "cancellation signalled");
            return Ok(());
        }

        let session = self
            .store
            .get(id)
            .await?
            .ok_or(OrchestratorError::NotFound)?;
        if session.is_terminal() {
            warn!(target: "orchestrator", session = %id, status = ?session.status, "cancel ignored for terminated session");
            return Ok(());
        }

        let mut next = session;
        next.apply(&Trigger::CancelRequested)?;
        self.store.put(&next).await?;
        info!(target: "orchestrator", session = %id, "suspended session cancelled");
        Ok(())
    }

    pub async fn list_sessions(&self) -> Result<Vec<SessionId>, OrchestratorError> {
        Ok(self.store.list().await?)
    }

    /// Removes a session's snapshot. Refused while a run is live.
    pub async fn delete_session(&self, id: &SessionId) -> Result<bool, OrchestratorError> {
        if self.active.contains_key(id) {
            return Err(OrchestratorError::Conflict);
        }
        self.degraded.remove(id);
        Ok(self.store.delete(id).await?)
    }

    pub fn is_active(&self, id: &SessionId) -> bool {
        self.active.contains_key(id)
    }

    /// Atomically claims the single-run slot for this id.
    fn register(&self, id: &SessionId) -> Result<CancellationToken, OrchestratorError> {
        match self.active.entry(id.clone()) {
            Entry::Occupied(_) => Err(OrchestratorError::Conflict),
            Entry::Vacant(slot) => {
                let cancel = CancellationToken::new();
                slot.insert(ActiveRun {
                    cancel: cancel.clone(),
                });
                Ok(cancel)
            }
        }
    }

    fn spawn_run(
        &self,
        id: SessionId,
        cancel: CancellationToken,
        session: Session,
        user_response: Option<String>,
    ) {
        let orchestrator = SessionOrchestrator::new(
            Arc::clone(&self.planner),
            Arc::clone(&self.browser),
            Arc::clone(&self.store),
            cancel,
        );
        let active = Arc::clone(&self.active);
        let degraded = Arc::clone(&self.degraded);
        tokio::spawn(async move {
            let outcome = match user_response {
                Some(response) => orchestrator.resume_with_user_response(session, response).await,
                None => orchestrator.drive(session).await,
            };
            match outcome {
                Ok(session) => {
                    degraded.remove(&id);
                    info!(target: "orchestrator", session = %id, status = ?session.status, "run settled");
                }
                Err(err) if err.is_transient() => {
                    warn!(target: "orchestrator", session = %id, error = %err, "run aborted on store outage");
                    degraded.insert(id.clone(), err.to_string());
                }
                Err(err) => {
                    // InvalidTransition and friends: fail loudly.
                    warn!(target: "orchestrator", session = %id, error = %err, "run aborted on internal fault");
                }
            }
            active.remove(&id);
        });
    }
}

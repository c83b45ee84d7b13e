use std::sync::Arc;

use chrono::Utc;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use helmsman_action_executor::{ActionExecutor, BrowserCapability};
use helmsman_session::{
    ActionResult, MemoryEventSink, Plan, Session, SessionEventKind, SessionStatus, Trigger,
};
use helmsman_session_store::SessionStore;

use crate::api::{PlanContext, Planner};
use crate::errors::OrchestratorError;

const DEFAULT_FINAL_RESULT: &str = "Task completed successfully.";

/// Drives exactly one session through the state machine.
///
/// Each transition is committed by writing the snapshot through the
/// store before the new state is adopted; a failed write leaves the
/// session at its last durable state and aborts the run with a
/// transient error. The loop holds no resources across the
/// `AwaitingUserInput` suspension: it returns, and a later call picks
/// the session back up from its snapshot.
pub struct SessionOrchestrator {
    planner: Arc<dyn Planner>,
    browser: Arc<dyn BrowserCapability>,
    store: Arc<dyn SessionStore>,
    cancel: CancellationToken,
}

impl SessionOrchestrator {
    pub fn new(
        planner: Arc<dyn Planner>,
        browser: Arc<dyn BrowserCapability>,
        store: Arc<dyn SessionStore>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            planner,
            browser,
            store,
            cancel,
        }
    }

    /// Runs the session until it terminates or suspends for user input.
    pub async fn drive(&self, mut session: Session) -> Result<Session, OrchestratorError> {
        let executor = ActionExecutor::new(
            Arc::clone(&self.browser),
            session.config.retry.clone(),
            session.config.step_timeout(),
        );

        loop {
            if session.is_terminal() {
                return Ok(session);
            }

            if self.cancel.is_cancelled() {
                info!(target: "orchestrator", session = %session.id, "cancel requested, stopping run");
                return self.commit(&session, Trigger::CancelRequested, |_| {}).await;
            }

            if self.over_budget(&session) {
                warn!(target: "orchestrator", session = %session.id, "session budget exhausted");
                session = self
                    .commit(&session, Trigger::BudgetExhausted, |s| {
                        s.last_error = Some("session time budget exhausted".into());
                    })
                    .await?;
                continue;
            }

            session = match session.status {
                SessionStatus::Created => {
                    self.commit(&session, Trigger::OrchestrationRequested, |_| {})
                        .await?
                }
                SessionStatus::Planning => self.plan(&session).await?,
                SessionStatus::Executing => self.execute_next(&executor, &session).await?,
                SessionStatus::AwaitingUserInput => {
                    debug!(target: "orchestrator", session = %session.id, "suspended awaiting user input");
                    return Ok(session);
                }
                // Terminal statuses are handled at the top of the loop.
                SessionStatus::Completed | SessionStatus::Failed | SessionStatus::Cancelled => {
                    return Ok(session)
                }
            };
        }
    }

    /// Resume entry point for a session suspended on a user question.
    pub async fn resume_with_user_response(
        &self,
        session: Session,
        response: String,
    ) -> Result<Session, OrchestratorError> {
        if session.status != SessionStatus::AwaitingUserInput {
            return Err(OrchestratorError::InvalidState(format!(
                "session is {:?}, not awaiting user input",
                session.status
            )));
        }

        info!(target: "orchestrator", session = %session.id, "user responded, resuming");
        let session = self
            .commit(&session, Trigger::UserResponded, |s| {
                s.record(SessionEventKind::UserResponded {
                    response: response.clone(),
                });
                s.pending_question = None;
            })
            .await?;
        self.drive(session).await
    }

    /// Applies extra mutations and a trigger to a copy of the session,
    /// persists the copy, and only then adopts it. The transition is
    /// not committed unless the snapshot is durable.
    async fn commit(
        &self,
        session: &Session,
        trigger: Trigger,
        mutate: impl FnOnce(&mut Session),
    ) -> Result<Session, OrchestratorError> {
        let mut next = session.clone();
        mutate(&mut next);
        let to = next.apply(&trigger)?;
        self.store.put(&next).await?;
        debug!(target: "orchestrator", session = %next.id, from = ?session.status, to = ?to, "transition committed");
        Ok(next)
    }

    async fn plan(&self, session: &Session) -> Result<Session, OrchestratorError> {
        let context = PlanContext::from_events(&session.events);
        let outcome = timeout(
            session.config.planner_timeout(),
            self.planner.plan(&session.goal, &context),
        )
        .await;

        let refusal = match outcome {
            Ok(Ok(plan)) if plan.len() > session.config.max_plan_steps => format!(
                "planner returned {} steps, limit is {}",
                plan.len(),
                session.config.max_plan_steps
            ),
            Ok(Ok(plan)) => {
                let plan = Plan::new(session.next_revision(), plan.steps);
                info!(
                    target: "orchestrator",
                    session = %session.id,
                    revision = plan.revision,
                    steps = plan.len(),
                    "plan received"
                );
                return self
                    .commit(session, Trigger::PlanReceived, move |s| s.install_plan(plan))
                    .await;
            }
            Ok(Err(failure)) => failure.reason,
            Err(_) => format!(
                "planner timed out after {:?}",
                session.config.planner_timeout()
            ),
        };

        warn!(target: "orchestrator", session = %session.id, reason = %refusal, "planning refused");
        self.commit(session, Trigger::PlanningRefused, |s| {
            s.last_error = Some(refusal.clone());
        })
        .await
    }

    async fn execute_next(
        &self,
        executor: &ActionExecutor,
        session: &Session,
    ) -> Result<Session, OrchestratorError> {
        let Some(step) = session.pending_step().cloned() else {
            // Plan exhausted; an empty plan lands here immediately.
            return self
                .commit(session, Trigger::StepSucceeded { more_steps: false }, |s| {
                    if s.final_result.is_none() {
                        s.final_result = Some(DEFAULT_FINAL_RESULT.into());
                    }
                })
                .await;
        };

        let sink = MemoryEventSink::new();
        let result = executor.execute(&step, &self.cancel, &sink).await;
        let attempts = sink.drain();

        if self.cancel.is_cancelled() {
            return self
                .commit(session, Trigger::CancelRequested, |s| {
                    s.events.extend(attempts);
                })
                .await;
        }

        match result {
            ActionResult::Succeeded(observation) => {
                let next_index = session.current_step + 1;
                let more_steps = next_index < session.plan.as_ref().map(Plan::len).unwrap_or(0);
                self.commit(session, Trigger::StepSucceeded { more_steps }, |s| {
                    s.events.extend(attempts);
                    s.record(SessionEventKind::StepSucceeded {
                        step_index: step.index,
                        observation: observation.clone(),
                    });
                    if let Some(variable) = &step.capture_as {
                        s.variables.insert(variable.clone(), observation.clone());
                    }
                    s.current_step = next_index;
                    if !more_steps {
                        s.final_result = observation
                            .as_str()
                            .map(str::to_string)
                            .or_else(|| step.note.clone())
                            .or_else(|| Some(DEFAULT_FINAL_RESULT.into()));
                    }
                })
                .await
            }
            ActionResult::Failed { reason, retryable } => {
                let replan_allowed = session.replans_used < session.config.replan_budget;
                warn!(
                    target: "orchestrator",
                    session = %session.id,
                    step = step.index,
                    retryable,
                    replan_allowed,
                    error = %reason,
                    "step failed"
                );
                self.commit(session, Trigger::StepFailed { replan_allowed }, |s| {
                    s.events.extend(attempts);
                    s.record(SessionEventKind::StepFailed {
                        step_index: step.index,
                        reason: reason.clone(),
                        retryable,
                    });
                    s.last_error = Some(reason.clone());
                    if replan_allowed {
                        s.replans_used += 1;
                        s.record(SessionEventKind::ReplanTriggered {
                            reason: reason.clone(),
                            replans_used: s.replans_used,
                        });
                    }
                })
                .await
            }
            ActionResult::RequiresUserInput { question } => {
                info!(target: "orchestrator", session = %session.id, step = step.index, "step requires user input");
                self.commit(session, Trigger::UserInputRequired, |s| {
                    s.events.extend(attempts);
                    s.record(SessionEventKind::UserPromptRaised {
                        question: question.clone(),
                    });
                    s.pending_question = Some(question.clone());
                })
                .await
            }
        }
    }

    fn over_budget(&self, session: &Session) -> bool {
        let elapsed_ms = Utc::now()
            .signed_duration_since(session.created_at)
            .num_milliseconds();
        elapsed_ms >= 0 && elapsed_ms as u64 >= session.config.session_budget_ms
    }
}

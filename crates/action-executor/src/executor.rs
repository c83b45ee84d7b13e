use std::sync::Arc;
use std::time::Duration;

use tokio::time::{sleep, timeout};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use helmsman_session::{
    ActionResult, ActionStep, AttemptOutcome, EventSink, RetryPolicy, SessionEvent,
    SessionEventKind,
};

use crate::api::BrowserCapability;

/// Capability name that suspends the session for user input instead of
/// touching the browser.
pub const ASK_USER_ACTION: &str = "ask_user";

const DEFAULT_USER_PROMPT: &str = "Agent needs input.";

/// Executes one action step against the browser capability under the
/// session's retry policy: a timeout per attempt, capped exponential
/// backoff between attempts, and cooperative cancellation honored
/// before each attempt and during backoff sleeps. An attempt already
/// dispatched runs to its own timeout; it is never force-killed.
pub struct ActionExecutor {
    capability: Arc<dyn BrowserCapability>,
    policy: RetryPolicy,
    step_timeout: Duration,
}

impl ActionExecutor {
    pub fn new(
        capability: Arc<dyn BrowserCapability>,
        policy: RetryPolicy,
        step_timeout: Duration,
    ) -> Self {
        Self {
            capability,
            policy,
            step_timeout,
        }
    }

    pub async fn execute(
        &self,
        step: &ActionStep,
        cancel: &CancellationToken,
        events: &dyn EventSink,
    ) -> ActionResult {
        if step.action == ASK_USER_ACTION {
            let question = step
                .params
                .get("prompt")
                .and_then(|value| value.as_str())
                .unwrap_or(DEFAULT_USER_PROMPT)
                .to_string();
            return ActionResult::RequiresUserInput { question };
        }

        let max_attempts = step.max_attempts.unwrap_or(self.policy.max_attempts).max(1);
        let mut attempt: u32 = 1;
        loop {
            if cancel.is_cancelled() {
                return ActionResult::Failed {
                    reason: "cancelled before attempt".into(),
                    retryable: false,
                };
            }

            let outcome = timeout(
                self.step_timeout,
                self.capability.perform(&step.action, &step.params),
            )
            .await;

            let reason = match outcome {
                Ok(Ok(observation)) => {
                    debug!(
                        target: "action_executor",
                        action = %step.action,
                        step = step.index,
                        attempt,
                        "action succeeded"
                    );
                    events
                        .record(SessionEvent::now(SessionEventKind::StepAttempted {
                            step_index: step.index,
                            attempt,
                            outcome: AttemptOutcome::Succeeded,
                        }))
                        .await;
                    return ActionResult::Succeeded(observation);
                }
                Ok(Err(fault)) => {
                    events
                        .record(SessionEvent::now(SessionEventKind::StepAttempted {
                            step_index: step.index,
                            attempt,
                            outcome: AttemptOutcome::Failed {
                                reason: fault.reason.clone(),
                                retryable: fault.retryable,
                            },
                        }))
                        .await;
                    if !fault.retryable {
                        warn!(
                            target: "action_executor",
                            action = %step.action,
                            step = step.index,
                            attempt,
                            error = %fault,
                            "permanent fault, not retrying"
                        );
                        return ActionResult::Failed {
                            reason: fault.reason,
                            retryable: false,
                        };
                    }
                    fault.reason
                }
                Err(_) => {
                    events
                        .record(SessionEvent::now(SessionEventKind::StepAttempted {
                            step_index: step.index,
                            attempt,
                            outcome: AttemptOutcome::TimedOut,
                        }))
                        .await;
                    format!(
                        "action {} timed out after {:?}",
                        step.action, self.step_timeout
                    )
                }
            };

            if attempt >= max_attempts {
                warn!(
                    target: "action_executor",
                    action = %step.action,
                    step = step.index,
                    attempts = attempt,
                    error = %reason,
                    "retries exhausted"
                );
                return ActionResult::Failed {
                    reason,
                    retryable: true,
                };
            }

            let delay = self.policy.delay_after(attempt);
            debug!(
                target: "action_executor",
                action = %step.action,
                step = step.index,
                attempt,
                delay_ms = delay.as_millis() as u64,
                error = %reason,
                "retrying after backoff"
            );
            tokio::select! {
                _ = cancel.cancelled() => {
                    return ActionResult::Failed {
                        reason: "cancelled during backoff".into(),
                        retryable: false,
                    };
                }
                _ = sleep(delay) => {}
            }
            attempt += 1;
        }
    }
}

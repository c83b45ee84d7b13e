//! Transition table for the session lifecycle.
//!
//! `advance` is a pure total function of (status, trigger): every
//! defined pair maps to exactly one next status, and every undefined
//! pair is an [`InvalidTransition`] fault.

use serde::{Deserialize, Serialize};

use crate::errors::InvalidTransition;
use crate::model::SessionStatus;

/// Events that move a session between states.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Trigger {
    /// Caller asked the orchestrator to drive this session.
    OrchestrationRequested,
    /// Planner produced a usable plan.
    PlanReceived,
    /// Planner signalled it cannot plan.
    PlanningRefused,
    /// A step succeeded; `more_steps` tells whether any remain.
    StepSucceeded { more_steps: bool },
    /// A step failed past its retry budget; `replan_allowed` tells
    /// whether the re-plan budget still has room.
    StepFailed { replan_allowed: bool },
    /// A step asked for user input.
    UserInputRequired,
    /// The user answered the pending question.
    UserResponded,
    /// Cooperative cancellation was requested.
    CancelRequested,
    /// The session's wall-clock budget ran out.
    BudgetExhausted,
}

pub fn advance(status: SessionStatus, trigger: &Trigger) -> Result<SessionStatus, InvalidTransition> {
    use SessionStatus::*;

    let next = match (status, trigger) {
        (Created, Trigger::OrchestrationRequested) => Planning,
        (Planning, Trigger::PlanReceived) => Executing,
        (Planning, Trigger::PlanningRefused) => Failed,
        (Executing, Trigger::StepSucceeded { more_steps: true }) => Executing,
        (Executing, Trigger::StepSucceeded { more_steps: false }) => Completed,
        (Executing, Trigger::StepFailed { replan_allowed: true }) => Planning,
        (Executing, Trigger::StepFailed { replan_allowed: false }) => Failed,
        (Executing, Trigger::UserInputRequired) => AwaitingUserInput,
        (AwaitingUserInput, Trigger::UserResponded) => Planning,
        (status, Trigger::CancelRequested) if !status.is_terminal() => Cancelled,
        (status, Trigger::BudgetExhausted) if !status.is_terminal() => Failed,
        (status, trigger) => {
            return Err(InvalidTransition {
                status,
                trigger: trigger.clone(),
            })
        }
    };
    Ok(next)
}

#[cfg(test)]
mod tests {
    use super::*;
    use SessionStatus::*;

    const ALL_STATUSES: [SessionStatus; 7] = [
        Created,
        Planning,
        Executing,
        AwaitingUserInput,
        Completed,
        Failed,
        Cancelled,
    ];

    fn all_triggers() -> Vec<Trigger> {
        vec![
            Trigger::OrchestrationRequested,
            Trigger::PlanReceived,
            Trigger::PlanningRefused,
            Trigger::StepSucceeded { more_steps: true },
            Trigger::StepSucceeded { more_steps: false },
            Trigger::StepFailed { replan_allowed: true },
            Trigger::StepFailed { replan_allowed: false },
            Trigger::UserInputRequired,
            Trigger::UserResponded,
            Trigger::CancelRequested,
            Trigger::BudgetExhausted,
        ]
    }

    /// The full table: every defined pair and its destination.
    fn expected(status: SessionStatus, trigger: &Trigger) -> Option<SessionStatus> {
        match (status, trigger) {
            (Created, Trigger::OrchestrationRequested) => Some(Planning),
            (Planning, Trigger::PlanReceived) => Some(Executing),
            (Planning, Trigger::PlanningRefused) => Some(Failed),
            (Executing, Trigger::StepSucceeded { more_steps: true }) => Some(Executing),
            (Executing, Trigger::StepSucceeded { more_steps: false }) => Some(Completed),
            (Executing, Trigger::StepFailed { replan_allowed: true }) => Some(Planning),
            (Executing, Trigger::StepFailed { replan_allowed: false }) => Some(Failed),
            (Executing, Trigger::UserInputRequired) => Some(AwaitingUserInput),
            (AwaitingUserInput, Trigger::UserResponded) => Some(Planning),
            (status, Trigger::CancelRequested) if !status.is_terminal() => Some(Cancelled),
            (status, Trigger::BudgetExhausted) if !status.is_terminal() => Some(Failed),
            _ => None,
        }
    }

    #[test]
    fn table_is_exhaustive_over_all_pairs() {
        for status in ALL_STATUSES {
            for trigger in all_triggers() {
                let outcome = advance(status, &trigger);
                match expected(status, &trigger) {
                    Some(next) => assert_eq!(
                        outcome.as_ref().copied().ok(),
                        Some(next),
                        "{status:?} + {trigger:?}"
                    ),
                    None => {
                        let err = outcome.expect_err(&format!(
                            "{status:?} + {trigger:?} should be undefined"
                        ));
                        assert_eq!(err.status, status);
                        assert_eq!(err.trigger, trigger);
                    }
                }
            }
        }
    }

    #[test]
    fn terminal_states_accept_no_triggers() {
        for status in [Completed, Failed, Cancelled] {
            for trigger in all_triggers() {
                assert!(
                    advance(status, &trigger).is_err(),
                    "{status:?} must reject {trigger:?}"
                );
            }
        }
    }

    #[test]
    fn cancel_reaches_cancelled_from_every_live_state() {
        for status in [Created, Planning, Executing, AwaitingUserInput] {
            assert_eq!(
                advance(status, &Trigger::CancelRequested).unwrap(),
                Cancelled
            );
        }
    }
}

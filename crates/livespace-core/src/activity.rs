// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Live activity states, statuses and lifecycle transitions.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Observable state of a live activity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActivityState {
    /// State has never been determined.
    Unknown,
    /// The activity is not installed on the controller.
    DoesntExist,
    /// The activity is being deployed.
    DeployAttempt,
    /// Deployment of the activity failed.
    DeployFailure,
    /// Installed and not running.
    Ready,
    /// Startup has been requested.
    StartupAttempt,
    /// Startup failed.
    StartupFailure,
    /// Started and not active.
    Running,
    /// Activation has been requested.
    ActivateAttempt,
    /// Activation failed. The activity is still running.
    ActivateFailure,
    /// Started and active.
    Active,
    /// Deactivation has been requested.
    DeactivateAttempt,
    /// Deactivation failed. The activity is still running.
    DeactivateFailure,
    /// Shutdown has been requested.
    ShutdownAttempt,
    /// Shutdown failed. The activity may still be running.
    ShutdownFailure,
    /// The activity stopped without being asked to.
    Crashed,
}

impl ActivityState {
    /// Whether an activity in this state has a live instance that may be using
    /// its resources.
    pub fn is_running(&self) -> bool {
        matches!(
            self,
            ActivityState::Running
                | ActivityState::ActivateAttempt
                | ActivityState::ActivateFailure
                | ActivityState::Active
                | ActivityState::DeactivateAttempt
                | ActivityState::DeactivateFailure
                | ActivityState::ShutdownAttempt
                | ActivityState::ShutdownFailure
        )
    }

    /// Whether this state reports a failure.
    pub fn is_error(&self) -> bool {
        matches!(
            self,
            ActivityState::DeployFailure
                | ActivityState::StartupFailure
                | ActivityState::ActivateFailure
                | ActivityState::DeactivateFailure
                | ActivityState::ShutdownFailure
                | ActivityState::Crashed
        )
    }

    /// Get the state string
    pub fn as_str(&self) -> &'static str {
        match self {
            ActivityState::Unknown => "UNKNOWN",
            ActivityState::DoesntExist => "DOESNT_EXIST",
            ActivityState::DeployAttempt => "DEPLOY_ATTEMPT",
            ActivityState::DeployFailure => "DEPLOY_FAILURE",
            ActivityState::Ready => "READY",
            ActivityState::StartupAttempt => "STARTUP_ATTEMPT",
            ActivityState::StartupFailure => "STARTUP_FAILURE",
            ActivityState::Running => "RUNNING",
            ActivityState::ActivateAttempt => "ACTIVATE_ATTEMPT",
            ActivityState::ActivateFailure => "ACTIVATE_FAILURE",
            ActivityState::Active => "ACTIVE",
            ActivityState::DeactivateAttempt => "DEACTIVATE_ATTEMPT",
            ActivityState::DeactivateFailure => "DEACTIVATE_FAILURE",
            ActivityState::ShutdownAttempt => "SHUTDOWN_ATTEMPT",
            ActivityState::ShutdownFailure => "SHUTDOWN_FAILURE",
            ActivityState::Crashed => "CRASHED",
        }
    }
}

impl fmt::Display for ActivityState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Snapshot of an activity's state with an optional human-readable detail.
///
/// Statuses are never mutated. Every transition produces a new status that
/// replaces the previous one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityStatus {
    state: ActivityState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    detail: Option<String>,
}

impl ActivityStatus {
    /// Create a status with no detail.
    pub fn new(state: ActivityState) -> Self {
        Self {
            state,
            detail: None,
        }
    }

    /// Create a status with a detail message.
    pub fn with_detail(state: ActivityState, detail: impl Into<String>) -> Self {
        Self {
            state,
            detail: Some(detail.into()),
        }
    }

    /// Status of an installed activity that is not running.
    pub fn ready() -> Self {
        Self::new(ActivityState::Ready)
    }

    /// The state.
    pub fn state(&self) -> ActivityState {
        self.state
    }

    /// The detail message, if any.
    pub fn detail(&self) -> Option<&str> {
        self.detail.as_deref()
    }
}

impl fmt::Display for ActivityStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.detail {
            Some(detail) => write!(f, "{} ({})", self.state, detail),
            None => write!(f, "{}", self.state),
        }
    }
}

/// Outcome of checking a transition against the current state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransitionResult {
    /// The transition can happen.
    Ok,
    /// The activity is already where the transition would take it.
    Noop,
    /// The transition is not allowed from the current state.
    Illegal,
}

/// A lifecycle transition that can be requested of a live activity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityStateTransition {
    /// Start the activity.
    Startup,
    /// Activate a running activity.
    Activate,
    /// Deactivate an active activity.
    Deactivate,
    /// Shut the activity down.
    Shutdown,
}

impl ActivityStateTransition {
    /// Check whether the transition can happen from the given state.
    pub fn can_transition(&self, state: ActivityState) -> TransitionResult {
        use ActivityState::*;

        match self {
            ActivityStateTransition::Startup => match state {
                s if s.is_running() => TransitionResult::Noop,
                Ready | StartupFailure | Crashed => TransitionResult::Ok,
                _ => TransitionResult::Illegal,
            },
            ActivityStateTransition::Activate => match state {
                Running | ActivateFailure => TransitionResult::Ok,
                Active => TransitionResult::Noop,
                _ => TransitionResult::Illegal,
            },
            ActivityStateTransition::Deactivate => match state {
                Active | ActivateFailure | DeactivateFailure => TransitionResult::Ok,
                Running => TransitionResult::Noop,
                _ => TransitionResult::Illegal,
            },
            ActivityStateTransition::Shutdown => match state {
                Ready => TransitionResult::Noop,
                Unknown | DoesntExist | DeployAttempt | DeployFailure => TransitionResult::Illegal,
                _ => TransitionResult::Ok,
            },
        }
    }

    /// Get the transition name
    pub fn as_str(&self) -> &'static str {
        match self {
            ActivityStateTransition::Startup => "startup",
            ActivityStateTransition::Activate => "activate",
            ActivityStateTransition::Deactivate => "deactivate",
            ActivityStateTransition::Shutdown => "shutdown",
        }
    }
}

impl fmt::Display for ActivityStateTransition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

//! Session State Machine
//!
//! ```text
//! Initializing ──validated / logged in──▶ Authenticated
//!      │                                    │    ▲
//!      │ validation failed      logout /    │    │ refreshed / logged in
//!      ▼                        refresh     ▼    │
//!  Unauthenticated ◀─────────── failed ─────┘────┘
//!
//! any ──restart (init)──▶ Initializing
//! ```
//!
//! A refresh during the mount check leaves the phase at `Initializing`; only
//! the validation that follows decides it.
//!
//! There is no terminal state; the manager lives as long as the console.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::user::User;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionPhase {
    /// Initial validation has not resolved yet
    Initializing,
    /// Token considered valid
    Authenticated,
    /// Logged out, expired, or the check failed
    Unauthenticated,
}

/// What happened to the session
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    /// Fresh mount: start over
    Restarted,
    /// Validation succeeded with this identity
    Validated(User),
    /// Validation failed (any reason, including network)
    ValidationFailed,
    /// Refresh succeeded; identity is not part of the refresh payload
    Refreshed,
    /// A wrapped request hit 401 and the refresh failed
    Expired,
    /// Explicit login succeeded
    LoggedIn(User),
    LoggedOut,
}

impl SessionPhase {
    /// Phase reached from `self` when `event` happens
    pub fn next(self, event: &SessionEvent) -> SessionPhase {
        match event {
            SessionEvent::Restarted => SessionPhase::Initializing,
            SessionEvent::Refreshed if self == SessionPhase::Initializing => SessionPhase::Initializing,
            SessionEvent::Validated(_) | SessionEvent::Refreshed | SessionEvent::LoggedIn(_) => {
                SessionPhase::Authenticated
            }
            SessionEvent::ValidationFailed | SessionEvent::Expired | SessionEvent::LoggedOut => {
                SessionPhase::Unauthenticated
            }
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SessionPhase::Initializing => "initializing",
            SessionPhase::Authenticated => "authenticated",
            SessionPhase::Unauthenticated => "unauthenticated",
        }
    }
}

impl std::fmt::Display for SessionPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Read-only view of the session handed to consumers
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionSnapshot {
    pub phase: SessionPhase,
    pub is_authenticated: bool,
    pub user: Option<User>,
    /// True only while the initial validation runs
    pub loading: bool,
    /// Last successful validation or login
    pub validated_at: Option<DateTime<Utc>>,
}

impl SessionSnapshot {
    pub fn initializing() -> Self {
        Self {
            phase: SessionPhase::Initializing,
            is_authenticated: false,
            user: None,
            loading: true,
            validated_at: None,
        }
    }

    /// Authenticated but without an identity, which happens when a refresh
    /// succeeds from a logged-out state.
    pub fn needs_identity(&self) -> bool {
        self.is_authenticated && self.user.is_none()
    }

    pub(crate) fn apply(&mut self, event: SessionEvent) {
        let next = self.phase.next(&event);

        tracing::debug!(from = %self.phase, to = %next, "Session state transition");

        match event {
            SessionEvent::Restarted => {
                *self = Self::initializing();
                return;
            }
            SessionEvent::Validated(user) | SessionEvent::LoggedIn(user) => {
                self.user = Some(user);
                self.validated_at = Some(Utc::now());
            }
            SessionEvent::Refreshed => {}
            SessionEvent::ValidationFailed | SessionEvent::Expired | SessionEvent::LoggedOut => {
                self.user = None;
            }
        }

        self.phase = next;
        self.is_authenticated = next == SessionPhase::Authenticated;
    }

    pub(crate) fn finish_loading(&mut self) {
        self.loading = false;
    }
}

impl Default for SessionSnapshot {
    fn default() -> Self {
        Self::initializing()
    }
}

//! Session state machine
//!
//! Pure transition table. Applying the credential side effect of a
//! transition is the job of the session dispatcher in the infra crate, which
//! owns the only mutable copy of the state.

use serde::{Deserialize, Serialize};

use crate::credentials::CredentialPair;

/// Application-visible session state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    /// Nothing is known yet (fresh install, or credentials awaiting a refresh)
    Initial,
    /// Signed in with usable credentials
    Active,
    /// A credential refresh is in flight
    Refreshing,
    /// Credentials are gone; the user must sign in again
    Expired,
}

/// Closed set of events accepted by the session dispatcher
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// Sign-in, sign-up or social sign-in produced fresh credentials
    SessionBecameActive(CredentialPair),
    /// A credential refresh has started
    RefreshStarted,
    /// The refresh endpoint returned a new pair
    RefreshSucceeded(CredentialPair),
    /// The refresh endpoint rejected the refresh credential
    RefreshFailed,
    /// The backend declared the session unrecoverable
    SessionExpired,
    /// The user signed out
    LoggedOut,
}

impl SessionEvent {
    /// Short name used in logs; never includes credentials
    pub fn name(&self) -> &'static str {
        match self {
            Self::SessionBecameActive(_) => "session_became_active",
            Self::RefreshStarted => "refresh_started",
            Self::RefreshSucceeded(_) => "refresh_succeeded",
            Self::RefreshFailed => "refresh_failed",
            Self::SessionExpired => "session_expired",
            Self::LoggedOut => "logged_out",
        }
    }
}

/// Credential side effect that belongs to a transition
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CredentialEffect {
    /// Leave the credential store untouched
    None,
    /// Persist the pair carried by the event
    Save(CredentialPair),
    /// Wipe the credential store
    Clear,
}

/// Result of applying an event to a state
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    /// Successor state
    pub next: SessionState,
    /// Side effect to apply together with the state change
    pub effect: CredentialEffect,
}

impl SessionState {
    /// All states, for exhaustive checks
    pub const ALL: [SessionState; 4] =
        [Self::Initial, Self::Active, Self::Refreshing, Self::Expired];

    /// Compute the successor state and its credential effect
    ///
    /// Every (state, event) pair maps to exactly one transition. A refresh
    /// result (`RefreshSucceeded` or `RefreshFailed`) outside `Refreshing` is
    /// stale (the session moved on while the refresh was in flight) and
    /// leaves state and credentials as they are.
    pub fn transition(self, event: &SessionEvent) -> Transition {
        use CredentialEffect as Effect;
        use SessionState::{Active, Expired, Refreshing};

        let (next, effect) = match (self, event) {
            (_, SessionEvent::SessionBecameActive(pair)) => (Active, Effect::Save(pair.clone())),
            (Expired, SessionEvent::RefreshStarted) => (Expired, Effect::None),
            (_, SessionEvent::RefreshStarted) => (Refreshing, Effect::None),
            (Refreshing, SessionEvent::RefreshSucceeded(pair)) => {
                (Active, Effect::Save(pair.clone()))
            }
            (state, SessionEvent::RefreshSucceeded(_)) => (state, Effect::None),
            (Refreshing, SessionEvent::RefreshFailed) => (Expired, Effect::Clear),
            (state, SessionEvent::RefreshFailed) => (state, Effect::None),
            (_, SessionEvent::SessionExpired | SessionEvent::LoggedOut) => (Expired, Effect::Clear),
        };

        Transition { next, effect }
    }

    /// `true` for states in which authenticated requests can be made
    pub fn is_authenticated(self) -> bool {
        matches!(self, Self::Active | Self::Refreshing)
    }
}

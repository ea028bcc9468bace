//! Session dispatcher
//!
//! Owns the only mutable [`SessionState`]. Every transition runs under one
//! lock together with its credential effect, so observers never see a state
//! that disagrees with the credential store.

use std::sync::Arc;

use eatsorder_domain::{CredentialEffect, SessionEvent, SessionState};
use parking_lot::{Mutex, RwLock};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use super::credentials::CredentialStore;

/// Receives the session-expired signal
pub trait SessionObserver: Send + Sync {
    /// Called once when the session is lost without the user signing out
    fn on_session_expired(&self);
}

impl<F> SessionObserver for F
where
    F: Fn() + Send + Sync,
{
    fn on_session_expired(&self) {
        self()
    }
}

/// Hook through which authentication failures reach the session
pub trait SessionExpiryHandler: Send + Sync {
    /// Report that the server declared the session unrecoverable
    fn handle_session_expired(&self);
}

/// Ties a refresh result to the session episode that started the refresh
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefreshTicket(u64);

#[derive(Debug, Clone, Copy)]
struct SessionCell {
    state: SessionState,
    /// Bumped whenever sign-in, logout or session loss replaces the session
    generation: u64,
}

/// Serialized session state machine
pub struct Session {
    store: Arc<CredentialStore>,
    cell: Mutex<SessionCell>,
    sender: watch::Sender<SessionState>,
    observers: RwLock<Vec<Arc<dyn SessionObserver>>>,
}

impl Session {
    /// Session over `store`
    ///
    /// Starts `Active` when the store holds a complete pair whose access
    /// credential has not expired, `Initial` otherwise.
    pub fn new(store: Arc<CredentialStore>) -> Self {
        let initial = if store.is_logged_in() && !store.is_access_expired() {
            SessionState::Active
        } else {
            SessionState::Initial
        };
        let (sender, _) = watch::channel(initial);
        debug!(state = ?initial, "Session created");

        Self {
            store,
            cell: Mutex::new(SessionCell { state: initial, generation: 0 }),
            sender,
            observers: RwLock::new(Vec::new()),
        }
    }

    /// Register an observer of the session-expired signal
    pub fn add_observer(&self, observer: Arc<dyn SessionObserver>) {
        self.observers.write().push(observer);
    }

    /// Current state
    pub fn state(&self) -> SessionState {
        self.cell.lock().state
    }

    /// Receiver that sees every state published after a transition
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.sender.subscribe()
    }

    /// Credential store the transitions write to
    pub fn credentials(&self) -> &Arc<CredentialStore> {
        &self.store
    }

    /// Apply `event` and return the resulting state
    pub fn dispatch(&self, event: SessionEvent) -> SessionState {
        let (previous, next) = self.apply_locked(&mut self.cell.lock(), &event);
        self.announce(&event, previous, next);
        next
    }

    /// Dispatch `RefreshStarted`
    ///
    /// Returns a ticket for [`Session::finish_refresh`] when the session is
    /// now `Refreshing`, `None` when it cannot be refreshed.
    pub fn begin_refresh(&self) -> Option<RefreshTicket> {
        let event = SessionEvent::RefreshStarted;
        let (previous, next, ticket) = {
            let mut cell = self.cell.lock();
            let (previous, next) = self.apply_locked(&mut cell, &event);
            let ticket = (next == SessionState::Refreshing).then_some(RefreshTicket(cell.generation));
            (previous, next, ticket)
        };
        self.announce(&event, previous, next);
        ticket
    }

    /// Dispatch the result of the refresh identified by `ticket`
    ///
    /// `event` is `RefreshSucceeded` or `RefreshFailed`. Returns `None`
    /// without touching state or credentials when the session was replaced
    /// or left `Refreshing` after the ticket was issued.
    pub fn finish_refresh(&self, ticket: RefreshTicket, event: SessionEvent) -> Option<SessionState> {
        let (previous, next) = {
            let mut cell = self.cell.lock();
            if cell.generation != ticket.0 || cell.state != SessionState::Refreshing {
                debug!(event = event.name(), state = ?cell.state, "Discarding superseded refresh result");
                return None;
            }
            self.apply_locked(&mut cell, &event)
        };
        self.announce(&event, previous, next);
        Some(next)
    }

    /// Transition plus credential effect; the caller holds the cell lock
    fn apply_locked(
        &self,
        cell: &mut SessionCell,
        event: &SessionEvent,
    ) -> (SessionState, SessionState) {
        let previous = cell.state;
        let transition = previous.transition(event);

        match &transition.effect {
            CredentialEffect::None => {}
            CredentialEffect::Save(pair) => {
                if let Err(e) = self.store.save_pair(pair) {
                    warn!(event = event.name(), error = %e, "Credentials kept in memory only");
                }
            }
            CredentialEffect::Clear => {
                if let Err(e) = self.store.clear() {
                    warn!(event = event.name(), error = %e, "Persisted credentials not erased");
                }
            }
        }

        if matches!(
            event,
            SessionEvent::SessionBecameActive(_)
                | SessionEvent::SessionExpired
                | SessionEvent::LoggedOut
        ) {
            cell.generation = cell.generation.wrapping_add(1);
        }

        cell.state = transition.next;
        self.sender.send_modify(|published| *published = transition.next);
        (previous, transition.next)
    }

    fn announce(&self, event: &SessionEvent, previous: SessionState, next: SessionState) {
        if previous == next {
            debug!(event = event.name(), state = ?next, "Session event applied");
        } else {
            info!(event = event.name(), from = ?previous, to = ?next, "Session transition");
        }

        let lost_session = matches!(event, SessionEvent::RefreshFailed | SessionEvent::SessionExpired);
        if lost_session && previous != SessionState::Expired && next == SessionState::Expired {
            self.notify_expired();
        }
    }

    fn notify_expired(&self) {
        let observers = self.observers.read().clone();
        info!(observers = observers.len(), "Session expired");
        for observer in observers {
            observer.on_session_expired();
        }
    }
}

impl SessionExpiryHandler for Session {
    fn handle_session_expired(&self) {
        self.dispatch(SessionEvent::SessionExpired);
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("state", &self.state())
            .field("store", &self.store)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use eatsorder_domain::CredentialPair;

    use super::*;
    use crate::auth::jwt::test_support::token_expiring_in;

    fn pair() -> CredentialPair {
        CredentialPair::new(token_expiring_in(3600), "refresh")
    }

    fn counting_session(store: Arc<CredentialStore>) -> (Session, Arc<AtomicUsize>) {
        let session = Session::new(store);
        let count = Arc::new(AtomicUsize::new(0));
        let counter = count.clone();
        session.add_observer(Arc::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        }));
        (session, count)
    }

    #[test]
    fn test_initial_state_follows_store() {
        let empty = Arc::new(CredentialStore::in_memory());
        assert_eq!(Session::new(empty).state(), SessionState::Initial);

        let valid = Arc::new(CredentialStore::in_memory());
        valid.save_pair(&pair()).unwrap();
        assert_eq!(Session::new(valid).state(), SessionState::Active);

        let expired = Arc::new(CredentialStore::in_memory());
        expired.save(token_expiring_in(-60), "refresh").unwrap();
        assert_eq!(Session::new(expired).state(), SessionState::Initial);
    }

    #[test]
    fn test_sign_in_saves_and_logout_clears() {
        let store = Arc::new(CredentialStore::in_memory());
        let (session, expired) = counting_session(store.clone());

        assert_eq!(session.dispatch(SessionEvent::SessionBecameActive(pair())), SessionState::Active);
        assert!(store.is_logged_in());

        assert_eq!(session.dispatch(SessionEvent::LoggedOut), SessionState::Expired);
        assert!(!store.is_logged_in());
        assert_eq!(expired.load(Ordering::SeqCst), 0, "logout is not a session loss");
    }

    #[test]
    fn test_refresh_failure_signals_once() {
        let store = Arc::new(CredentialStore::in_memory());
        let (session, expired) = counting_session(store.clone());
        session.dispatch(SessionEvent::SessionBecameActive(pair()));

        session.dispatch(SessionEvent::RefreshStarted);
        session.dispatch(SessionEvent::RefreshFailed);
        session.handle_session_expired();
        session.dispatch(SessionEvent::RefreshFailed);

        assert_eq!(session.state(), SessionState::Expired);
        assert_eq!(expired.load(Ordering::SeqCst), 1);
        assert!(!store.is_logged_in());
    }

    #[test]
    fn test_new_episode_signals_again() {
        let (session, expired) = counting_session(Arc::new(CredentialStore::in_memory()));

        session.dispatch(SessionEvent::SessionBecameActive(pair()));
        session.handle_session_expired();
        session.dispatch(SessionEvent::SessionBecameActive(pair()));
        session.handle_session_expired();

        assert_eq!(expired.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_stale_refresh_success_does_not_restore_credentials() {
        let store = Arc::new(CredentialStore::in_memory());
        let session = Session::new(store.clone());
        session.dispatch(SessionEvent::SessionBecameActive(pair()));

        session.dispatch(SessionEvent::RefreshStarted);
        session.dispatch(SessionEvent::LoggedOut);
        let state = session.dispatch(SessionEvent::RefreshSucceeded(pair()));

        assert_eq!(state, SessionState::Expired);
        assert!(!store.is_logged_in());
    }

    #[test]
    fn test_refresh_success_replaces_pair() {
        let store = Arc::new(CredentialStore::in_memory());
        let session = Session::new(store.clone());
        session.dispatch(SessionEvent::SessionBecameActive(pair()));

        let rotated = CredentialPair::new(token_expiring_in(7200), "refresh-2");
        session.dispatch(SessionEvent::RefreshStarted);
        assert_eq!(session.dispatch(SessionEvent::RefreshSucceeded(rotated.clone())), SessionState::Active);
        assert_eq!(store.credentials(), Some(rotated));
    }

    #[test]
    fn test_refresh_ticket_applies_result() {
        let store = Arc::new(CredentialStore::in_memory());
        let (session, expired) = counting_session(store.clone());
        session.dispatch(SessionEvent::SessionBecameActive(pair()));

        let ticket = session.begin_refresh().unwrap();
        assert_eq!(session.state(), SessionState::Refreshing);
        assert_eq!(
            session.finish_refresh(ticket, SessionEvent::RefreshFailed),
            Some(SessionState::Expired)
        );
        assert!(!store.is_logged_in());
        assert_eq!(expired.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_no_ticket_once_expired() {
        let session = Session::new(Arc::new(CredentialStore::in_memory()));
        session.dispatch(SessionEvent::LoggedOut);
        assert_eq!(session.begin_refresh(), None);
        assert_eq!(session.state(), SessionState::Expired);
    }

    #[test]
    fn test_refresh_result_after_relogin_is_discarded() {
        let store = Arc::new(CredentialStore::in_memory());
        let (session, expired) = counting_session(store.clone());
        session.dispatch(SessionEvent::SessionBecameActive(pair()));

        let stale = session.begin_refresh().unwrap();
        session.dispatch(SessionEvent::LoggedOut);
        let fresh = CredentialPair::new(token_expiring_in(3600), "refresh-fresh");
        session.dispatch(SessionEvent::SessionBecameActive(fresh.clone()));

        assert_eq!(session.finish_refresh(stale, SessionEvent::RefreshFailed), None);
        assert_eq!(session.state(), SessionState::Active);
        assert_eq!(store.credentials(), Some(fresh.clone()));
        assert_eq!(expired.load(Ordering::SeqCst), 0);

        // A newer refresh cycle does not revive the old ticket
        let current = session.begin_refresh().unwrap();
        assert_ne!(current, stale);
        assert_eq!(
            session.finish_refresh(stale, SessionEvent::RefreshSucceeded(pair())),
            None
        );
        assert_eq!(store.credentials(), Some(fresh));
        assert_eq!(session.state(), SessionState::Refreshing);
    }

    #[tokio::test]
    async fn test_watch_channel_publishes_transitions() {
        let session = Session::new(Arc::new(CredentialStore::in_memory()));
        let mut receiver = session.subscribe();
        assert_eq!(*receiver.borrow(), SessionState::Initial);

        session.dispatch(SessionEvent::SessionBecameActive(pair()));
        tokio::time::timeout(Duration::from_secs(1), receiver.changed()).await.unwrap().unwrap();
        assert_eq!(*receiver.borrow_and_update(), SessionState::Active);
    }
}

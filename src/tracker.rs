use crate::analytics::derive_stats;
use crate::coordinator::{IncrementCoordinator, PendingWrite};
use crate::errors::{CounterError, StoreError};
use crate::models::{DerivedStats, UserId};
use crate::snapshot::{CounterSnapshot, RawDocument};
use crate::sync::DailyCounterState;
use chrono::NaiveDate;
use tracing::debug;

/// Sign-in state reported by the authentication collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum AuthState {
    /// The collaborator has not reported yet.
    #[default]
    Unknown,
    SignedOut,
    SignedIn(UserId),
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Session {
    user: UserId,
    key: String,
}

/// Everything owned by the current session. All mutation goes through here,
/// one caller at a time.
#[derive(Debug, Default)]
pub struct Tracker {
    auth: AuthState,
    session: Option<Session>,
    epoch: u64,
    counters: DailyCounterState,
    coordinator: IncrementCoordinator,
    last_sync_error: Option<String>,
}

impl Tracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts a fresh, empty session and returns its epoch.
    pub fn begin_session(&mut self, user: UserId, key: String) -> u64 {
        self.end_session();
        self.epoch += 1;
        self.auth = AuthState::SignedIn(user.clone());
        self.session = Some(Session { user, key });
        self.epoch
    }

    pub fn end_session(&mut self) {
        if self.session.take().is_some() {
            self.epoch += 1;
        }
        self.auth = AuthState::SignedOut;
        self.counters.on_sign_out();
        self.coordinator.reset();
        self.last_sync_error = None;
    }

    pub fn mark_unknown(&mut self) {
        self.end_session();
        self.auth = AuthState::Unknown;
    }

    pub fn is_current(&self, epoch: u64) -> bool {
        self.session.is_some() && self.epoch == epoch
    }

    /// Applies one notification from the subscription. Stale epochs are ignored.
    pub fn apply_remote(
        &mut self,
        epoch: u64,
        notification: Result<RawDocument, StoreError>,
    ) -> Result<(), CounterError> {
        if !self.is_current(epoch) {
            debug!(epoch, current = self.epoch, "dropping notification from ended session");
            return Ok(());
        }

        match notification {
            Ok(raw) => {
                self.counters.on_remote_snapshot(&raw);
                self.coordinator.reconcile(self.counters.confirmed());
                self.last_sync_error = None;
                Ok(())
            }
            Err(err) => {
                self.last_sync_error = Some(err.to_string());
                Err(CounterError::SyncRead(err))
            }
        }
    }

    pub fn increment(&mut self, today: NaiveDate) -> Result<PendingWrite, CounterError> {
        let Some(session) = &self.session else {
            return Err(CounterError::Unauthenticated);
        };

        Ok(self
            .coordinator
            .increment(&mut self.counters, &session.key, today, self.epoch))
    }

    /// Records the outcome of a write. A failure keeps the local value and is
    /// returned as [`CounterError::SyncWrite`].
    pub fn settle(
        &mut self,
        write: &PendingWrite,
        outcome: Result<(), StoreError>,
    ) -> Result<(), CounterError> {
        if !self.is_current(write.epoch) {
            return outcome.map_err(CounterError::SyncWrite);
        }
        self.coordinator.settle(write.seq, outcome.is_ok());
        outcome.map_err(CounterError::SyncWrite)
    }

    pub fn auth(&self) -> &AuthState {
        &self.auth
    }

    pub fn user(&self) -> Option<&UserId> {
        self.session.as_ref().map(|session| &session.user)
    }

    pub fn snapshot(&self) -> &CounterSnapshot {
        self.counters.current()
    }

    pub fn stats(&self, today: NaiveDate) -> DerivedStats {
        derive_stats(self.counters.current(), today)
    }

    pub fn pending_writes(&self) -> usize {
        self.coordinator.in_flight()
    }

    pub fn unconfirmed_writes(&self) -> usize {
        self.coordinator.unconfirmed()
    }

    pub fn failed_writes(&self) -> u64 {
        self.coordinator.failed_writes()
    }

    pub fn last_sync_error(&self) -> Option<&str> {
        self.last_sync_error.as_deref()
    }
}

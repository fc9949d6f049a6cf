use crate::coordinator::PendingWrite;
use crate::errors::{CounterError, StoreError};
use crate::models::UserId;
use crate::store::{RemoteCounterStore, document_path};
use crate::tracker::{AuthState, Tracker};
use chrono::NaiveDate;
use futures::StreamExt;
use std::sync::Arc;
use tokio::{
    sync::{Mutex, mpsc, watch},
    task::JoinHandle,
};
use tracing::{debug, error, info, warn};

/// Connects a [`Tracker`] to a remote store: one subscription task per
/// session and one writer task that sends writes in the order they were
/// issued.
#[derive(Clone)]
pub struct CounterService {
    tracker: Arc<Mutex<Tracker>>,
    store: Arc<dyn RemoteCounterStore>,
    app_id: String,
    writes: mpsc::UnboundedSender<PendingWrite>,
    subscription: Arc<Mutex<Option<JoinHandle<()>>>>,
}

impl CounterService {
    /// Must be called inside a tokio runtime; spawns the writer task.
    pub fn new(store: Arc<dyn RemoteCounterStore>, app_id: impl Into<String>) -> Self {
        let tracker = Arc::new(Mutex::new(Tracker::new()));
        let (writes, queue) = mpsc::unbounded_channel();
        tokio::spawn(run_writer(Arc::clone(&store), Arc::clone(&tracker), queue));

        Self {
            tracker,
            store,
            app_id: app_id.into(),
            writes,
            subscription: Arc::new(Mutex::new(None)),
        }
    }

    pub fn tracker(&self) -> &Arc<Mutex<Tracker>> {
        &self.tracker
    }

    pub async fn apply_auth(&self, state: AuthState) -> Result<(), CounterError> {
        match state {
            AuthState::SignedIn(user) => self.sign_in(user).await,
            AuthState::SignedOut => {
                self.sign_out().await;
                Ok(())
            }
            AuthState::Unknown => {
                self.stop_subscription().await;
                self.tracker.lock().await.mark_unknown();
                Ok(())
            }
        }
    }

    pub async fn sign_in(&self, user: UserId) -> Result<(), CounterError> {
        let key = document_path(&self.app_id, &user);
        let mut subscription = self.subscription.lock().await;
        if let Some(task) = subscription.take() {
            task.abort();
        }

        let epoch = self.tracker.lock().await.begin_session(user.clone(), key.clone());
        let mut stream = match self.store.subscribe(&key).await {
            Ok(stream) => stream,
            Err(err) => {
                error!(user = %user, error = %err, "failed to subscribe to counters");
                return self.tracker.lock().await.apply_remote(epoch, Err(err));
            }
        };

        info!(user = %user, epoch, "session started");
        let tracker = Arc::clone(&self.tracker);
        *subscription = Some(tokio::spawn(async move {
            while let Some(notification) = stream.next().await {
                let mut tracker = tracker.lock().await;
                if !tracker.is_current(epoch) {
                    break;
                }
                if let Err(err) = tracker.apply_remote(epoch, notification) {
                    warn!(error = %err, "counter subscription reported an error");
                }
            }
            debug!(epoch, "counter subscription finished");
        }));
        Ok(())
    }

    pub async fn sign_out(&self) {
        self.stop_subscription().await;
        let mut tracker = self.tracker.lock().await;
        if let Some(user) = tracker.user() {
            info!(user = %user, "session ended");
        }
        tracker.end_session();
    }

    async fn stop_subscription(&self) {
        if let Some(task) = self.subscription.lock().await.take() {
            task.abort();
        }
    }

    /// Follows the authentication collaborator until its sender is dropped.
    pub async fn follow_auth(&self, mut auth: watch::Receiver<AuthState>) {
        loop {
            let state = auth.borrow_and_update().clone();
            if let Err(err) = self.apply_auth(state).await {
                warn!(error = %err, "failed to apply sign-in state");
            }
            if auth.changed().await.is_err() {
                break;
            }
        }
    }

    /// Adds one unit to `today` without waiting for the store.
    pub async fn increment(&self, today: NaiveDate) -> Result<u64, CounterError> {
        let mut tracker = self.tracker.lock().await;
        let write = tracker.increment(today)?;
        let count = write.count;

        if let Err(mpsc::error::SendError(write)) = self.writes.send(write) {
            let err = StoreError::Unavailable("writer stopped".into());
            if let Err(err) = tracker.settle(&write, Err(err)) {
                error!(error = %err, "counter write was not queued");
            }
        }
        Ok(count)
    }
}

async fn run_writer(
    store: Arc<dyn RemoteCounterStore>,
    tracker: Arc<Mutex<Tracker>>,
    mut queue: mpsc::UnboundedReceiver<PendingWrite>,
) {
    while let Some(write) = queue.recv().await {
        let outcome = store.write(&write.key, write.patch(), true).await;
        match tracker.lock().await.settle(&write, outcome) {
            Ok(()) => debug!(date = %write.date, count = write.count, "counter write stored"),
            Err(err) => warn!(
                date = %write.date,
                count = write.count,
                error = %err,
                "keeping local count after failed write"
            ),
        }
    }
}

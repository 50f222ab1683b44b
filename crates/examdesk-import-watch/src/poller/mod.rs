/*
[INPUT]:  Task ids from callers, TaskStatusService, PersistentStore, NotificationSink, TokenStore
[OUTPUT]: Tracking lifecycle for one import task with notifications and callbacks
[POS]:    Poller layer - timer-driven status polling state machine
[UPDATE]: When changing scheduling, cancellation or resume semantics
*/

//! Background import-task poller.
//!
//! A [`TaskPoller`] tracks at most one import task. The task id is mirrored
//! into a [`PersistentStore`] slot so a restarted process can [`resume`]
//! tracking, and every terminal status is turned into a notification plus the
//! caller's callbacks before the slot is cleared again.
//!
//! Each tracking session runs as one tokio task that sleeps, fetches, applies
//! the result and only then schedules the next tick, so fetches for one task
//! never overlap. Results are applied under the state lock after checking the
//! session generation; once [`stop`] returns no earlier fetch can produce side
//! effects.
//!
//! [`resume`]: TaskPoller::resume
//! [`stop`]: TaskPoller::stop

pub mod reconcile;

use examdesk_adapter::{ExamdeskError, ImportResult, ImportTaskStatus, TokenStore};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{Mutex, watch};
use tokio_util::sync::{CancellationToken, DropGuard};

use crate::notify::NotificationSink;
use crate::service::TaskStatusService;
use crate::store::{PersistentStore, StoreError};

use reconcile::Effects;

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(10);

pub type SuccessCallback = Arc<dyn Fn(&ImportResult) + Send + Sync>;
pub type ErrorCallback = Arc<dyn Fn(&[String]) + Send + Sync>;

#[derive(Error, Debug)]
pub enum PollerError {
    #[error("task id must not be empty")]
    EmptyTaskId,

    #[error("storage key must not be empty")]
    MissingStorageKey,

    #[error("poll interval must be greater than zero")]
    ZeroInterval,

    #[error("persistent store error: {0}")]
    Store(#[from] StoreError),
}

/// Result of [`TaskPoller::resume`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResumeOutcome {
    NothingToResume,
    AlreadyTracking,
    /// Tracking restarted with an immediate status check.
    Resumed(String),
    /// A task id is stored but no credential is available yet.
    Deferred(String),
}

/// Externally observable poller state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PollerSnapshot {
    pub is_polling: bool,
    pub task_id: Option<String>,
    pub current_status: Option<ImportTaskStatus>,
}

#[derive(Debug, Default)]
struct PollerState {
    generation: u64,
    session: Option<CancellationToken>,
    is_polling: bool,
    task_id: Option<String>,
    current_status: Option<ImportTaskStatus>,
}

impl PollerState {
    fn end_session(&mut self) {
        self.generation += 1;
        if let Some(session) = self.session.take() {
            session.cancel();
        }
    }

    fn begin_session(&mut self, root: &CancellationToken) -> (u64, CancellationToken) {
        self.end_session();
        let session = root.child_token();
        self.session = Some(session.clone());
        (self.generation, session)
    }

    fn reset(&mut self) {
        self.end_session();
        self.is_polling = false;
        self.task_id = None;
        self.current_status = None;
    }

    fn snapshot(&self) -> PollerSnapshot {
        PollerSnapshot {
            is_polling: self.is_polling,
            task_id: self.task_id.clone(),
            current_status: self.current_status.clone(),
        }
    }
}

struct Inner {
    service: Arc<dyn TaskStatusService>,
    store: Arc<dyn PersistentStore>,
    notifier: Arc<dyn NotificationSink>,
    tokens: TokenStore,
    storage_key: String,
    poll_interval: Duration,
    on_success: Option<SuccessCallback>,
    on_error: Option<ErrorCallback>,
    root: CancellationToken,
    state: Mutex<PollerState>,
    snapshot: watch::Sender<PollerSnapshot>,
}

/// Tracks one background import task at a time.
///
/// Cheap to clone; clones drive the same poller. Sessions are cancelled once
/// the last clone is dropped.
#[derive(Clone)]
pub struct TaskPoller {
    inner: Arc<Inner>,
    _guard: Arc<DropGuard>,
}

impl fmt::Debug for TaskPoller {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskPoller")
            .field("storage_key", &self.inner.storage_key)
            .field("poll_interval", &self.inner.poll_interval)
            .field("snapshot", &*self.inner.snapshot.borrow())
            .finish()
    }
}

impl TaskPoller {
    pub fn builder(
        service: Arc<dyn TaskStatusService>,
        store: Arc<dyn PersistentStore>,
        notifier: Arc<dyn NotificationSink>,
        tokens: TokenStore,
    ) -> TaskPollerBuilder {
        TaskPollerBuilder {
            service,
            store,
            notifier,
            tokens,
            storage_key: String::new(),
            poll_interval: DEFAULT_POLL_INTERVAL,
            on_success: None,
            on_error: None,
        }
    }

    pub fn storage_key(&self) -> &str {
        &self.inner.storage_key
    }

    pub fn poll_interval(&self) -> Duration {
        self.inner.poll_interval
    }

    pub fn snapshot(&self) -> PollerSnapshot {
        self.inner.snapshot.borrow().clone()
    }

    pub fn is_polling(&self) -> bool {
        self.inner.snapshot.borrow().is_polling
    }

    pub fn current_status(&self) -> Option<ImportTaskStatus> {
        self.inner.snapshot.borrow().current_status.clone()
    }

    /// Follow snapshot changes.
    pub fn subscribe(&self) -> watch::Receiver<PollerSnapshot> {
        self.inner.snapshot.subscribe()
    }

    /// Start tracking `task_id`, replacing any task tracked so far.
    ///
    /// The id is persisted before polling begins. The first status check
    /// happens one full interval later.
    pub async fn start(&self, task_id: impl Into<String>) -> Result<(), PollerError> {
        let task_id = task_id.into();
        if task_id.trim().is_empty() {
            return Err(PollerError::EmptyTaskId);
        }

        let inner = &self.inner;
        let mut state = inner.state.lock().await;
        state.reset();

        if let Err(err) = inner.store.set(&inner.storage_key, &task_id).await {
            // the replaced task must not come back through resume()
            inner.teardown(&mut state).await;
            tracing::error!(
                storage_key = %inner.storage_key,
                task_id = %task_id,
                error = %err,
                "persist task id failed; not tracking"
            );
            return Err(err.into());
        }

        let (generation, session) = state.begin_session(&inner.root);
        state.is_polling = true;
        state.task_id = Some(task_id.clone());
        inner.publish(&state);
        drop(state);

        tracing::info!(
            storage_key = %inner.storage_key,
            task_id = %task_id,
            generation,
            "import tracking started"
        );
        tokio::spawn(Arc::clone(inner).drive(task_id, generation, session, false));
        Ok(())
    }

    /// Stop tracking and clear the persisted task id. Idempotent.
    pub async fn stop(&self) {
        let mut state = self.inner.state.lock().await;
        let was_polling = state.is_polling;
        self.inner.teardown(&mut state).await;
        if was_polling {
            tracing::info!(storage_key = %self.inner.storage_key, "import tracking stopped");
        }
    }

    /// Stop polling but keep the persisted id, so the next process resumes it.
    pub async fn detach(&self) {
        let mut state = self.inner.state.lock().await;
        if state.is_polling {
            tracing::info!(
                storage_key = %self.inner.storage_key,
                task_id = ?state.task_id,
                "import tracking detached"
            );
        }
        state.reset();
        self.inner.publish(&state);
    }

    /// Pick up a task id persisted by an earlier run.
    ///
    /// With a valid credential the first status check is issued right away;
    /// without one, tracking resumes as soon as the token store receives one.
    pub async fn resume(&self) -> Result<ResumeOutcome, PollerError> {
        let inner = &self.inner;
        let mut state = inner.state.lock().await;
        if state.is_polling {
            return Ok(ResumeOutcome::AlreadyTracking);
        }

        let saved = inner.store.get(&inner.storage_key).await?;
        let Some(task_id) = saved.filter(|id| !id.trim().is_empty()) else {
            tracing::debug!(storage_key = %inner.storage_key, "no persisted import task");
            return Ok(ResumeOutcome::NothingToResume);
        };

        let (generation, session) = state.begin_session(&inner.root);

        if inner.tokens.valid_token().is_some() {
            state.is_polling = true;
            state.task_id = Some(task_id.clone());
            inner.publish(&state);
            drop(state);

            tracing::info!(
                storage_key = %inner.storage_key,
                task_id = %task_id,
                generation,
                "resuming persisted import task"
            );
            tokio::spawn(Arc::clone(inner).drive(task_id.clone(), generation, session, true));
            Ok(ResumeOutcome::Resumed(task_id))
        } else {
            drop(state);

            tracing::info!(
                storage_key = %inner.storage_key,
                task_id = %task_id,
                "persisted import task waits for a credential"
            );
            tokio::spawn(Arc::clone(inner).resume_when_authenticated(
                task_id.clone(),
                generation,
                session,
            ));
            Ok(ResumeOutcome::Deferred(task_id))
        }
    }
}

impl Inner {
    fn publish(&self, state: &PollerState) {
        self.snapshot.send_replace(state.snapshot());
    }

    async fn teardown(&self, state: &mut PollerState) {
        state.reset();
        if let Err(err) = self.store.remove(&self.storage_key).await {
            tracing::warn!(
                storage_key = %self.storage_key,
                error = %err,
                "clear persisted task id failed"
            );
        }
        self.publish(state);
    }

    async fn resume_when_authenticated(
        self: Arc<Self>,
        task_id: String,
        generation: u64,
        session: CancellationToken,
    ) {
        let mut credentials = self.tokens.subscribe();
        let ready = tokio::select! {
            _ = session.cancelled() => return,
            res = credentials.wait_for(|data| data.as_ref().is_some_and(|d| !d.is_expired())) => res.is_ok(),
        };
        if !ready {
            return;
        }

        {
            let mut state = self.state.lock().await;
            if state.generation != generation {
                return;
            }
            state.is_polling = true;
            state.task_id = Some(task_id.clone());
            self.publish(&state);
        }

        tracing::info!(
            storage_key = %self.storage_key,
            task_id = %task_id,
            generation,
            "credential available; resuming persisted import task"
        );
        self.drive(task_id, generation, session, true).await;
    }

    /// Session loop: wait, fetch, apply. The next wait starts after the
    /// previous fetch settled.
    async fn drive(
        self: Arc<Self>,
        task_id: String,
        generation: u64,
        session: CancellationToken,
        immediate: bool,
    ) {
        let mut wait_first = !immediate;
        loop {
            if wait_first {
                tokio::select! {
                    _ = session.cancelled() => return,
                    _ = tokio::time::sleep(self.poll_interval) => {}
                }
            }
            wait_first = true;

            let Some(token) = self.tokens.valid_token() else {
                tracing::debug!(task_id = %task_id, "no valid credential; skipping status check");
                continue;
            };

            let fetched = tokio::select! {
                _ = session.cancelled() => return,
                fetched = self.service.fetch_status(&token, &task_id) => fetched,
            };

            if !self.apply(&task_id, generation, fetched).await {
                return;
            }
        }
    }

    /// Apply one fetch result. Returns whether the session keeps polling.
    async fn apply(
        &self,
        task_id: &str,
        generation: u64,
        fetched: Result<ImportTaskStatus, ExamdeskError>,
    ) -> bool {
        let mut state = self.state.lock().await;
        if state.generation != generation {
            tracing::debug!(task_id, generation, "discarding stale status result");
            return false;
        }

        let effects = match fetched {
            Ok(status) => {
                tracing::debug!(task_id, status = %status.status, "import status observed");
                let effects = reconcile::reconcile(&status);
                state.current_status = Some(status);
                effects
            }
            Err(err) => {
                tracing::warn!(
                    task_id,
                    error = %err,
                    http_status = ?err.status_code(),
                    "import status check failed; aborting"
                );
                reconcile::transport_failure()
            }
        };

        if effects.terminal {
            self.teardown(&mut state).await;
            tracing::info!(
                storage_key = %self.storage_key,
                task_id,
                "import tracking finished"
            );
        } else {
            self.publish(&state);
        }

        // Still under the lock: a concurrent stop() cannot slip in between.
        self.emit(&effects);
        !effects.terminal
    }

    fn emit(&self, effects: &Effects) {
        if let Some(notice) = &effects.notice {
            self.notifier.notify(notice.kind, &notice.message);
        }
        if let (Some(errors), Some(on_error)) = (&effects.errors, &self.on_error) {
            on_error(errors);
        }
        if let (Some(result), Some(on_success)) = (&effects.success, &self.on_success) {
            on_success(result);
        }
    }
}

/// Builder for constructing a [`TaskPoller`].
pub struct TaskPollerBuilder {
    service: Arc<dyn TaskStatusService>,
    store: Arc<dyn PersistentStore>,
    notifier: Arc<dyn NotificationSink>,
    tokens: TokenStore,
    storage_key: String,
    poll_interval: Duration,
    on_success: Option<SuccessCallback>,
    on_error: Option<ErrorCallback>,
}

impl TaskPollerBuilder {
    /// Slot in the persistent store holding the tracked task id (required).
    pub fn storage_key(mut self, key: impl Into<String>) -> Self {
        self.storage_key = key.into();
        self
    }

    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Called once per terminal SUCCESS that carries a result.
    pub fn on_success(mut self, callback: impl Fn(&ImportResult) + Send + Sync + 'static) -> Self {
        self.on_success = Some(Arc::new(callback));
        self
    }

    /// Called once per terminal FAILED and once per SUCCESS with failed rows.
    pub fn on_error(mut self, callback: impl Fn(&[String]) + Send + Sync + 'static) -> Self {
        self.on_error = Some(Arc::new(callback));
        self
    }

    pub fn build(self) -> Result<TaskPoller, PollerError> {
        if self.storage_key.trim().is_empty() {
            return Err(PollerError::MissingStorageKey);
        }
        if self.poll_interval.is_zero() {
            return Err(PollerError::ZeroInterval);
        }

        let root = CancellationToken::new();
        let (snapshot, _rx) = watch::channel(PollerSnapshot::default());
        let guard = root.clone().drop_guard();

        Ok(TaskPoller {
            inner: Arc::new(Inner {
                service: self.service,
                store: self.store,
                notifier: self.notifier,
                tokens: self.tokens,
                storage_key: self.storage_key,
                poll_interval: self.poll_interval,
                on_success: self.on_success,
                on_error: self.on_error,
                root,
                state: Mutex::new(PollerState::default()),
                snapshot,
            }),
            _guard: Arc::new(guard),
        })
    }
}

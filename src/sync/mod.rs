mod outbox;

#[cfg(test)]
pub(crate) mod fake;

pub use outbox::{Outbox, OutboxStats, OutboxWorker};

use crate::error::SyncError;
use crate::models::{Envelope, PartialEnvelope};
use crate::remote::RemoteTransport;
use crate::storage::{load_json, save_json, LocalMirror};
use crate::util::with_timeout;
use std::cell::{Cell, RefCell};
use std::future::Future;
use std::rc::Rc;
use std::time::Duration;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SyncPhase {
    Uninitialized,
    Loaded,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LocalOutcome {
    Missing,
    Applied,
    Unreadable(SyncError),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RemoteOutcome {
    /// No endpoint configured; nothing was sent.
    Disabled,
    Empty,
    Applied,
    Failed(SyncError),
}

/// What the startup sequence did, step by step.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LoadReport {
    pub local: LocalOutcome,
    pub remote: RemoteOutcome,
}

/// Keeps the local mirror and the remote sheet loosely in step with the
/// in-memory planner.
///
/// Startup reads local, then remote, overlaying each onto the state field by
/// field (remote wins). After that, every `persist` writes the full envelope
/// locally and queues it for the remote. No error leaves this type: failures
/// are logged and the state that is already in hand is kept.
pub struct SyncOrchestrator<M, T> {
    key: String,
    mirror: M,
    remote: Option<Rc<T>>,
    read_timeout: Duration,
    outbox: Outbox,
    worker: RefCell<Option<OutboxWorker>>,
    phase: Cell<SyncPhase>,
}

impl<M, T> SyncOrchestrator<M, T>
where
    M: LocalMirror,
    T: RemoteTransport + 'static,
{
    pub fn new(
        key: impl Into<String>,
        mirror: M,
        remote: Option<T>,
        read_timeout: Duration,
        outbox_capacity: usize,
    ) -> Self {
        let (outbox, worker) = Outbox::new(outbox_capacity);
        Self {
            key: key.into(),
            mirror,
            remote: remote.map(Rc::new),
            read_timeout,
            outbox,
            worker: RefCell::new(Some(worker)),
            phase: Cell::new(SyncPhase::Uninitialized),
        }
    }

    pub fn phase(&self) -> SyncPhase {
        self.phase.get()
    }

    pub fn is_loaded(&self) -> bool {
        self.phase.get() == SyncPhase::Loaded
    }

    pub fn remote_enabled(&self) -> bool {
        self.remote.is_some()
    }

    pub fn outbox_stats(&self) -> OutboxStats {
        self.outbox.stats()
    }

    /// The future that delivers queued remote writes. Returns `None` when
    /// remote sync is off, or when the task was already taken.
    pub fn take_outbox_task(&self) -> Option<impl Future<Output = ()> + 'static> {
        let remote = self.remote.clone()?;
        let worker = self.worker.borrow_mut().take()?;
        Some(worker.run(remote, self.key.clone()))
    }

    async fn load_local(&self, state: &mut Envelope) -> LocalOutcome {
        match load_json::<PartialEnvelope>(&self.mirror, &self.key).await {
            Ok(None) => LocalOutcome::Missing,
            Ok(Some(partial)) => {
                state.overlay(partial);
                LocalOutcome::Applied
            }
            Err(e) => {
                log::warn!("ignoring local planner data: {e}");
                LocalOutcome::Unreadable(e)
            }
        }
    }

    async fn load_remote(&self, state: &mut Envelope) -> RemoteOutcome {
        let Some(remote) = self.remote.as_ref() else {
            return RemoteOutcome::Disabled;
        };

        let result = with_timeout(self.read_timeout, remote.fetch(&self.key))
            .await
            .unwrap_or_else(|d| Err(SyncError::RemoteTimeout(d)));

        match result {
            Ok(Some(partial)) => {
                state.overlay(partial);
                RemoteOutcome::Applied
            }
            Ok(None) => RemoteOutcome::Empty,
            Err(e) => {
                log::warn!("remote read failed, keeping local data: {e}");
                RemoteOutcome::Failed(e)
            }
        }
    }

    /// Runs the startup sequence and moves to [`SyncPhase::Loaded`]
    /// whatever happens along the way.
    pub async fn load(&self, initial: Envelope) -> (Envelope, LoadReport) {
        let mut state = initial;
        let local = self.load_local(&mut state).await;
        let remote = self.load_remote(&mut state).await;

        self.phase.set(SyncPhase::Loaded);
        log::info!(
            "planner loaded: {} ideas, {} wins (local: {local:?}, remote: {remote:?})",
            state.ideas.len(),
            state.wins.len()
        );

        (state, LoadReport { local, remote })
    }

    /// Writes `envelope` to the local mirror, then queues it for the remote.
    /// Returns the outbox sequence number when a remote write was queued.
    pub fn persist(&self, envelope: &Envelope) -> Option<u64> {
        if !self.is_loaded() {
            log::debug!("persist before load finished; skipped");
            return None;
        }

        if let Err(e) = save_json(&self.mirror, &self.key, envelope) {
            log::warn!("local mirror write failed: {e}");
        }

        self.remote.as_ref()?;
        Some(self.outbox.enqueue(envelope.clone()))
    }
}

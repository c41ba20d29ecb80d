//! Render surfaces ("tabs") and their load-state machine.

use std::path::Path;
use std::sync::{Arc, Condvar, Mutex};
use std::time::{Duration, Instant};

use tempfile::TempDir;
use uuid::Uuid;

use crate::backend::LoadRequest;
use crate::errors::DisplayError;
use crate::fingerprint::Fingerprint;

/// A unique identifier for a render surface, represented as a UUID. Stable
/// for the lifetime of the process, even across recycling.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SurfaceId(Uuid);

impl SurfaceId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SurfaceId {
    fn default() -> Self {
        Self::new()
    }
}

/// Current state of a surface's load worker.
#[derive(Default, Debug, Clone, PartialEq, Eq)]
pub enum LoadState {
    /// Surface has no load in flight and nothing pending.
    #[default]
    Ready,
    /// Surface is loading content.
    Loading,
    /// The most recent load attempt completed.
    Succeeded,
    /// The most recent load attempt failed.
    Failed(String),
}

struct MonitorInner {
    /// Monotonically increasing attempt counter. A completion carrying an
    /// older attempt number is stale and must be ignored.
    attempt: u64,
    state: LoadState,
}

/// Synchronization point between the presentation thread (which starts loads),
/// the backend (which reports completion from an arbitrary thread) and caller
/// threads blocked until their content is ready.
///
/// Waiters are woken only by the outcome of the attempt they initiated; a
/// superseded waiter runs into its deadline instead.
pub struct LoadMonitor {
    inner: Mutex<MonitorInner>,
    done: Condvar,
}

impl LoadMonitor {
    fn new() -> Self {
        Self {
            inner: Mutex::new(MonitorInner {
                attempt: 0,
                state: LoadState::Ready,
            }),
            done: Condvar::new(),
        }
    }

    /// Registers a new load attempt, invalidating all previous ones.
    fn begin(&self) -> u64 {
        let mut inner = self.inner.lock().unwrap();
        inner.attempt += 1;
        inner.state = LoadState::Loading;
        inner.attempt
    }

    /// Records the outcome of `attempt`. Returns false if the attempt was
    /// superseded in the meantime; no waiter is woken in that case.
    fn complete(&self, attempt: u64, result: Result<(), String>) -> bool {
        let mut inner = self.inner.lock().unwrap();
        if inner.attempt != attempt {
            log::debug!("discarding stale completion of load attempt {attempt}");
            return false;
        }
        inner.state = match result {
            Ok(()) => LoadState::Succeeded,
            Err(reason) => LoadState::Failed(reason),
        };
        self.done.notify_all();
        true
    }

    /// Drops interest in any in-flight attempt and returns to `Ready`.
    fn reset(&self) {
        let mut inner = self.inner.lock().unwrap();
        inner.attempt += 1;
        inner.state = LoadState::Ready;
    }

    pub fn state(&self) -> LoadState {
        self.inner.lock().unwrap().state.clone()
    }

    /// Blocks until `attempt` reaches a terminal state or `timeout` expires.
    fn wait(&self, attempt: u64, timeout: Duration) -> Result<(), DisplayError> {
        let deadline = Instant::now() + timeout;
        let mut inner = self.inner.lock().unwrap();
        loop {
            if inner.attempt == attempt {
                match &inner.state {
                    LoadState::Succeeded => return Ok(()),
                    LoadState::Failed(reason) => {
                        return Err(DisplayError::LoadFailed(reason.clone()))
                    }
                    LoadState::Ready | LoadState::Loading => {}
                }
            }
            let remaining = deadline
                .checked_duration_since(Instant::now())
                .ok_or(DisplayError::WaitTimeout)?;
            let (guard, _timeout_result) = self.done.wait_timeout(inner, remaining).unwrap();
            inner = guard;
        }
    }
}

/// One-shot completion handle for a load attempt, handed to the backend when
/// the load is actually started. The backend reports the outcome from
/// whatever thread its loader runs on; a ticket belonging to a superseded
/// attempt is silently discarded.
pub struct LoadTicket {
    monitor: Arc<LoadMonitor>,
    attempt: u64,
}

impl LoadTicket {
    pub fn succeed(self) {
        self.monitor.complete(self.attempt, Ok(()));
    }

    pub fn fail(self, reason: impl Into<String>) {
        self.monitor.complete(self.attempt, Err(reason.into()));
    }
}

/// Caller-side handle for awaiting content readiness. Detached from the
/// surface itself so callers never touch presentation-thread state.
pub struct LoadHandle {
    monitor: Arc<LoadMonitor>,
    /// `None` when the load short-circuited (content already current).
    attempt: Option<u64>,
}

impl LoadHandle {
    /// Blocks the calling thread until the load this handle belongs to
    /// finishes, fails, or `timeout` expires. The surface keeps loading
    /// independently after a timeout.
    pub fn wait(&self, timeout: Duration) -> Result<(), DisplayError> {
        match self.attempt {
            None => Ok(()),
            Some(attempt) => self.monitor.wait(attempt, timeout),
        }
    }

    pub fn state(&self) -> LoadState {
        self.monitor.state()
    }
}

/// A reusable sandboxed rendering context. Surfaces are created by the pool,
/// recycled by re-tagging with a new fingerprint, and only torn down at
/// process shutdown.
pub struct RenderSurface {
    id: SurfaceId,
    fingerprint: Option<Fingerprint>,
    /// The payload last registered for loading, kept for the idempotent
    /// short-circuit on repeated identical loads.
    payload: Option<String>,
    profile_dir: TempDir,
    monitor: Arc<LoadMonitor>,
}

impl RenderSurface {
    /// Creates a surface with a private profile directory below
    /// `profile_root`.
    pub fn new(fingerprint: Fingerprint, profile_root: &Path) -> Result<Self, DisplayError> {
        let profile_dir = tempfile::Builder::new()
            .prefix("surface-")
            .tempdir_in(profile_root)?;
        log::info!("init new render surface in {:?}", profile_dir.path());
        Ok(Self {
            id: SurfaceId::new(),
            fingerprint: Some(fingerprint),
            payload: None,
            profile_dir,
            monitor: Arc::new(LoadMonitor::new()),
        })
    }

    pub fn id(&self) -> SurfaceId {
        self.id
    }

    pub fn fingerprint(&self) -> Option<Fingerprint> {
        self.fingerprint
    }

    pub fn profile_dir(&self) -> &Path {
        self.profile_dir.path()
    }

    pub fn load_state(&self) -> LoadState {
        self.monitor.state()
    }

    /// Re-tags the surface during recycling or reset. Clearing the
    /// fingerprint also forgets the current payload so a later identical
    /// payload is loaded again.
    pub(crate) fn retag(&mut self, fingerprint: Option<Fingerprint>) {
        self.fingerprint = fingerprint;
        if fingerprint.is_none() {
            self.payload = None;
        }
    }

    /// Registers a load of `request` into this surface. If the payload is
    /// already current and `force_reload` is false this is a no-op: the
    /// returned handle is immediately ready and no ticket is issued.
    /// Otherwise any in-flight load is superseded, the new payload becomes
    /// current, and the returned [`LoadTicket`] must be handed to the
    /// backend to actually begin the load.
    pub fn load(
        &mut self,
        request: &LoadRequest,
        force_reload: bool,
    ) -> (LoadHandle, Option<LoadTicket>) {
        if !force_reload && self.payload.as_deref() == Some(request.payload()) {
            log::debug!("surface {:?} already holds requested content", self.id);
            return (
                LoadHandle {
                    monitor: self.monitor.clone(),
                    attempt: None,
                },
                None,
            );
        }

        let attempt = self.monitor.begin();
        self.payload = Some(request.payload().to_owned());
        (
            LoadHandle {
                monitor: self.monitor.clone(),
                attempt: Some(attempt),
            },
            Some(LoadTicket {
                monitor: self.monitor.clone(),
                attempt,
            }),
        )
    }

    /// Drops interest in any in-flight load and marks the surface empty.
    pub(crate) fn reset(&mut self) {
        self.monitor.reset();
        self.retag(None);
    }

    /// Best-effort removal of the private profile directory.
    pub(crate) fn shutdown(self) {
        let path = self.profile_dir.path().to_owned();
        if let Err(e) = self.profile_dir.close() {
            log::warn!("could not clean up profile directory {path:?}: {e}");
        }
    }
}

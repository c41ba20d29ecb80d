//! A backend that renders nothing. Used for headless runs and as the test
//! double for the pool, surface and facade tests.

use std::sync::{Arc, Mutex};

use crate::backend::{DisplayBackend, LoadRequest, PayloadKind};
use crate::surface::{LoadTicket, SurfaceId};

/// Everything the null backend observed, inspectable from outside.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendEvent {
    LoadStarted {
        surface: SurfaceId,
        kind: PayloadKind,
        payload: String,
    },
    LoadCancelled(SurfaceId),
    Presented(SurfaceId),
    VisibilityChanged(bool),
}

#[derive(Default)]
pub struct NullBackendState {
    events: Mutex<Vec<BackendEvent>>,
    pending: Mutex<Vec<LoadTicket>>,
}

impl NullBackendState {
    pub fn events(&self) -> Vec<BackendEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn load_count(&self) -> usize {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter(|e| matches!(e, BackendEvent::LoadStarted { .. }))
            .count()
    }

    pub fn visible(&self) -> Option<bool> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find_map(|e| match e {
                BackendEvent::VisibilityChanged(v) => Some(*v),
                _ => None,
            })
    }

    pub fn presented(&self) -> Option<SurfaceId> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find_map(|e| match e {
                BackendEvent::Presented(id) => Some(*id),
                _ => None,
            })
    }

    /// Takes all tickets held back in manual mode, in load order.
    pub fn take_tickets(&self) -> Vec<LoadTicket> {
        std::mem::take(&mut *self.pending.lock().unwrap())
    }
}

/// Null backend. In the default mode every load succeeds immediately; in
/// manual mode tickets are held until the test completes them explicitly.
pub struct NullBackend {
    shared: Arc<NullBackendState>,
    auto_complete: bool,
}

impl NullBackend {
    pub fn new() -> Self {
        Self {
            shared: Arc::new(NullBackendState::default()),
            auto_complete: true,
        }
    }

    /// A backend whose loads never complete until the held tickets are
    /// completed by hand.
    pub fn manual() -> Self {
        Self {
            shared: Arc::new(NullBackendState::default()),
            auto_complete: false,
        }
    }

    pub fn handle(&self) -> Arc<NullBackendState> {
        self.shared.clone()
    }
}

impl Default for NullBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl DisplayBackend for NullBackend {
    fn name(&self) -> &'static str {
        "null"
    }

    fn begin_load(&mut self, surface: SurfaceId, request: &LoadRequest, ticket: LoadTicket) {
        self.shared.events.lock().unwrap().push(BackendEvent::LoadStarted {
            surface,
            kind: request.kind(),
            payload: request.payload().to_owned(),
        });
        if self.auto_complete {
            ticket.succeed();
        } else {
            self.shared.pending.lock().unwrap().push(ticket);
        }
    }

    fn cancel_load(&mut self, surface: SurfaceId) {
        self.shared
            .events
            .lock()
            .unwrap()
            .push(BackendEvent::LoadCancelled(surface));
    }

    fn present(&mut self, surface: SurfaceId) {
        self.shared
            .events
            .lock()
            .unwrap()
            .push(BackendEvent::Presented(surface));
    }

    fn set_visible(&mut self, visible: bool) {
        self.shared
            .events
            .lock()
            .unwrap()
            .push(BackendEvent::VisibilityChanged(visible));
    }
}

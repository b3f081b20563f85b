//! Abort state machine and the host listeners that drive it
//!
//! The first reason wins, except that a non-blocking `scroll` may be replaced
//! once by any later reason. Entering a blocking state detaches every
//! abort-trigger listener so no further transition can happen.

use host_bridge::{
    AbortEventHost, AbortEventKind, HostEvent, ListenerControl, ListenerId, ViewportReader,
};
use parking_lot::Mutex;
use std::sync::{Arc, Weak};
use tracing::{debug, info};
use vc_types::{AbortReason, AbortState, Viewport};

/// Session abort record plus the listeners that can change it
pub struct AbortStateMachine {
    events: Arc<dyn AbortEventHost>,
    state: Mutex<AbortState>,
    bound: Mutex<Vec<ListenerId>>,
}

impl AbortStateMachine {
    pub fn new(events: Arc<dyn AbortEventHost>) -> Self {
        Self {
            events,
            state: Mutex::new(AbortState::default()),
            bound: Mutex::new(Vec::new()),
        }
    }

    /// Current abort record
    pub fn state(&self) -> AbortState {
        self.state.lock().clone()
    }

    /// Whether collection has stopped
    pub fn is_blocking(&self) -> bool {
        !self.state.lock().accepts_data()
    }

    /// Record an abort reason
    ///
    /// Returns `true` when the reason was accepted.
    pub fn set_abort(&self, reason: AbortReason, timestamp: f64, info: &str) -> bool {
        let blocking = reason.is_blocking();
        {
            let mut state = self.state.lock();
            if !state.accepts_data() {
                debug!("Ignoring abort reason {} after {:?}", reason, state.reason);
                return false;
            }
            *state = AbortState {
                reason: Some(reason),
                info: info.to_string(),
                timestamp,
                blocking,
            };
        }

        info!("Measurement aborted: {} at {}", reason, timestamp);
        if blocking {
            self.detach_listeners();
        }
        true
    }

    /// Bind wheel, keydown, and resize listeners
    ///
    /// `captured` is the viewport recorded at session start; a resize only
    /// aborts once the host reports different dimensions.
    pub fn attach_listeners(
        self: &Arc<Self>,
        viewport: Arc<dyn ViewportReader>,
        captured: Viewport,
    ) {
        self.detach_listeners();

        let weak = Arc::downgrade(self);
        let wheel = self.events.bind(
            AbortEventKind::Wheel,
            Arc::new(move |event: &HostEvent| {
                abort_via(&weak, AbortReason::Scroll, event);
                ListenerControl::Remove
            }),
        );

        let weak = Arc::downgrade(self);
        let keydown = self.events.bind(
            AbortEventKind::Keydown,
            Arc::new(move |event: &HostEvent| {
                abort_via(&weak, AbortReason::Keypress, event);
                ListenerControl::Remove
            }),
        );

        let weak = Arc::downgrade(self);
        let resize = self.events.bind(
            AbortEventKind::Resize,
            Arc::new(move |event: &HostEvent| {
                if viewport.viewport() == captured {
                    return ListenerControl::Keep;
                }
                abort_via(&weak, AbortReason::Resize, event);
                ListenerControl::Remove
            }),
        );

        self.bound.lock().extend([wheel, keydown, resize]);
    }

    /// Unbind every abort-trigger listener; idempotent
    pub fn detach_listeners(&self) {
        let ids: Vec<ListenerId> = std::mem::take(&mut *self.bound.lock());
        for id in ids {
            self.events.unbind(id);
        }
    }

    /// Detach listeners and return to the clean state
    pub fn reset(&self) {
        self.detach_listeners();
        *self.state.lock() = AbortState::default();
    }
}

fn abort_via(weak: &Weak<AbortStateMachine>, reason: AbortReason, event: &HostEvent) {
    if let Some(machine) = weak.upgrade() {
        machine.set_abort(reason, event.timestamp, "");
    }
}

impl Drop for AbortStateMachine {
    fn drop(&mut self) {
        self.detach_listeners();
    }
}

impl std::fmt::Debug for AbortStateMachine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AbortStateMachine")
            .field("state", &*self.state.lock())
            .field("bound", &self.bound.lock().len())
            .finish()
    }
}

//! Self-timing instrumentation
//!
//! Tallies the engine's own processing time so reports can surface it.

use host_bridge::Clock;
use parking_lot::Mutex;
use std::sync::Arc;

#[derive(Debug, Default)]
struct TimerState {
    started_at: Option<f64>,
    total: f64,
}

/// Accumulating stopwatch over the host clock
pub struct SelfTimer {
    clock: Arc<dyn Clock>,
    state: Mutex<TimerState>,
}

impl SelfTimer {
    /// Create a stopped timer with a zero total
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            state: Mutex::new(TimerState::default()),
        }
    }

    /// Start timing; returns `false` and leaves the running measurement alone
    /// if the timer is already running
    pub fn start(&self) -> bool {
        let mut state = self.state.lock();
        if state.started_at.is_some() {
            return false;
        }
        state.started_at = Some(self.clock.now());
        true
    }

    /// Stop timing and add the elapsed time to the total; no-op when stopped
    pub fn stop(&self) {
        let mut state = self.state.lock();
        if let Some(started_at) = state.started_at.take() {
            state.total += self.clock.now() - started_at;
        }
    }

    /// Time the enclosing block; stops when the returned guard drops
    ///
    /// A scope opened while the timer already runs does not stop it.
    pub fn scope(&self) -> TimingScope<'_> {
        let owns = self.start();
        TimingScope { timer: self, owns }
    }

    /// Accumulated time in ms
    pub fn total(&self) -> f64 {
        self.state.lock().total
    }

    /// Whether a measurement is in progress
    pub fn is_running(&self) -> bool {
        self.state.lock().started_at.is_some()
    }

    /// Zero the total and cancel any running measurement
    pub fn reset(&self) {
        *self.state.lock() = TimerState::default();
    }
}

impl std::fmt::Debug for SelfTimer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SelfTimer")
            .field("state", &*self.state.lock())
            .finish()
    }
}

/// Guard returned by [`SelfTimer::scope`]
pub struct TimingScope<'a> {
    timer: &'a SelfTimer,
    owns: bool,
}

impl Drop for TimingScope<'_> {
    fn drop(&mut self) {
        if self.owns {
            self.timer.stop();
        }
    }
}

//! Host capability interfaces
//!
//! The measurement engine never touches a real document. Everything it needs from
//! its environment (clock, viewport, DOM queries, change and visibility
//! notifications, abort-trigger events, diagnostics sinks) is reached through the
//! traits in this crate.
//!
//! # Features
//!
//! - **Capabilities**: `Clock`, `ViewportReader`, `DomTree`, `ObservationHost`,
//!   `AbortEventHost`, `MarkSink`, `DebugPublisher`
//! - **Records**: mutation batches, intersection entries, abort-trigger events
//! - **HostEnvironment**: the bundle handed to the engine
//! - **MockHost**: in-memory host with scripted event delivery for tests

mod capabilities;
mod environment;
mod mock_host;
mod records;

pub use capabilities::{
    AbortEventHost, Clock, DebugPublisher, DomTree, EventListener, IntersectionCallback,
    MarkSink, MutationCallback, MutationObserverHandle, ObservationHost, ViewportReader,
    VisibilityObserverHandle,
};
pub use environment::HostEnvironment;
pub use mock_host::{ManualClock, MockHost, RecordedMark};
pub use records::{
    AbortEventKind, HostEvent, IntersectionEntry, ListenerControl, ListenerId,
    MutationKind, MutationObserveOptions, MutationRecord,
};

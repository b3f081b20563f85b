//! Bundle of host capabilities handed to the measurement engine

use std::sync::Arc;

use crate::capabilities::{
    AbortEventHost, Clock, DebugPublisher, DomTree, MarkSink, ObservationHost, ViewportReader,
};

/// Host capabilities used by one observer
#[derive(Clone)]
pub struct HostEnvironment {
    pub clock: Arc<dyn Clock>,
    pub viewport: Arc<dyn ViewportReader>,
    pub dom: Arc<dyn DomTree>,
    pub observation: Arc<dyn ObservationHost>,
    pub events: Arc<dyn AbortEventHost>,
    pub marks: Option<Arc<dyn MarkSink>>,
    pub debug: Option<Arc<dyn DebugPublisher>>,
}

impl HostEnvironment {
    /// Attach a performance-marking sink
    pub fn with_marks(mut self, marks: Arc<dyn MarkSink>) -> Self {
        self.marks = Some(marks);
        self
    }

    /// Attach a debug publisher
    pub fn with_debug(mut self, debug: Arc<dyn DebugPublisher>) -> Self {
        self.debug = Some(debug);
        self
    }
}

impl std::fmt::Debug for HostEnvironment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HostEnvironment")
            .field("marks", &self.marks.is_some())
            .field("debug", &self.debug.is_some())
            .finish_non_exhaustive()
    }
}

//! Capability traits implemented by the host environment

use std::sync::Arc;

use vc_types::{DebugSnapshot, HostError, NodeId, NodeType, Viewport};

use crate::records::{
    AbortEventKind, HostEvent, IntersectionEntry, ListenerControl, ListenerId,
    MutationObserveOptions, MutationRecord,
};

/// Receives batches of DOM changes
pub type MutationCallback = Arc<dyn Fn(Vec<MutationRecord>) + Send + Sync>;

/// Receives batches of visibility changes
pub type IntersectionCallback = Arc<dyn Fn(Vec<IntersectionEntry>) + Send + Sync>;

/// Abort-trigger event listener
pub type EventListener = Arc<dyn Fn(&HostEvent) -> ListenerControl + Send + Sync>;

/// Monotonic high-resolution clock in milliseconds
pub trait Clock: Send + Sync {
    fn now(&self) -> f64;
}

/// Reads the current viewport dimensions
pub trait ViewportReader: Send + Sync {
    fn viewport(&self) -> Viewport;
}

/// Read-only queries against the host document
///
/// Every query may fail, e.g. for a node the host already released.
pub trait DomTree: Send + Sync {
    /// Type of the node
    fn node_type(&self, node: NodeId) -> Result<NodeType, HostError>;

    /// Lower-case tag name of an element
    fn local_name(&self, node: NodeId) -> Result<String, HostError>;

    /// Attribute value, `None` when absent
    fn attribute(&self, node: NodeId, name: &str) -> Result<Option<String>, HostError>;

    /// Class names in document order
    fn class_list(&self, node: NodeId) -> Result<Vec<String>, HostError>;

    /// Parent element, `None` at the root or for detached nodes
    fn parent_element(&self, node: NodeId) -> Result<Option<NodeId>, HostError>;

    /// Element id attribute
    fn element_id(&self, node: NodeId) -> Result<Option<String>, HostError> {
        self.attribute(node, "id")
    }
}

/// Live subscription to DOM changes under the document body
pub trait MutationObserverHandle: Send + Sync {
    fn observe(&self, options: &MutationObserveOptions);
    fn disconnect(&self);
}

/// Live subscription to visibility changes of individual elements
pub trait VisibilityObserverHandle: Send + Sync {
    fn observe(&self, node: NodeId);
    fn unobserve(&self, node: NodeId);
    fn disconnect(&self);
}

/// Factory for the two observation primitives
///
/// Returning `None` means the host does not provide that primitive.
pub trait ObservationHost: Send + Sync {
    fn create_mutation_observer(
        &self,
        callback: MutationCallback,
    ) -> Option<Box<dyn MutationObserverHandle>>;

    fn create_visibility_observer(
        &self,
        callback: IntersectionCallback,
    ) -> Option<Box<dyn VisibilityObserverHandle>>;
}

/// Binds listeners for the events that abort a measurement
pub trait AbortEventHost: Send + Sync {
    fn bind(&self, kind: AbortEventKind, listener: EventListener) -> ListenerId;

    /// Unbinding an unknown or already-removed listener is a no-op
    fn unbind(&self, id: ListenerId);
}

/// Optional performance-marking sink
pub trait MarkSink: Send + Sync {
    fn mark(&self, name: &str, start: f64, duration: f64) -> Result<(), HostError>;
}

/// Optional process-wide debug publication
pub trait DebugPublisher: Send + Sync {
    fn publish(&self, snapshot: &DebugSnapshot) -> Result<(), HostError>;

    fn publish_unavailable(&self, reason: &str) -> Result<(), HostError>;
}

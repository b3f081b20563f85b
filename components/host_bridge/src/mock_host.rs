//! Mock host implementation for testing the measurement engine
//!
//! Provides an in-memory document, a manual clock, and scripted delivery of
//! mutation, visibility, and abort-trigger events. Listeners and callbacks are
//! always invoked with no internal lock held, so they may call back into the host.

use dashmap::{DashMap, DashSet};
use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;
use tracing::debug;
use vc_types::{DebugSnapshot, HostError, NodeId, NodeType, Viewport};

use crate::capabilities::{
    AbortEventHost, Clock, DebugPublisher, DomTree, EventListener, IntersectionCallback,
    MarkSink, MutationCallback, MutationObserverHandle, ObservationHost, ViewportReader,
    VisibilityObserverHandle,
};
use crate::environment::HostEnvironment;
use crate::records::{
    AbortEventKind, HostEvent, IntersectionEntry, ListenerControl, ListenerId, MutationKind,
    MutationObserveOptions, MutationRecord,
};

/// Settable clock
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<f64>,
}

impl ManualClock {
    /// Create a clock reading `start`
    pub fn new(start: f64) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    /// Jump to an absolute time
    pub fn set(&self, now: f64) {
        *self.now.lock() = now;
    }

    /// Move forward by `delta` ms
    pub fn advance(&self, delta: f64) {
        *self.now.lock() += delta;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> f64 {
        *self.now.lock()
    }
}

/// A performance mark written to the mock host
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedMark {
    pub name: String,
    pub start: f64,
    pub duration: f64,
}

#[derive(Debug, Clone)]
struct MockNode {
    node_type: NodeType,
    local_name: Option<String>,
    attributes: Vec<(String, String)>,
    parent: Option<NodeId>,
}

struct MutationSubscription {
    callback: MutationCallback,
    options: Arc<Mutex<Option<MutationObserveOptions>>>,
}

struct VisibilitySubscription {
    callback: IntersectionCallback,
    observed: Arc<Mutex<HashSet<NodeId>>>,
}

struct MockMutationObserver {
    options: Arc<Mutex<Option<MutationObserveOptions>>>,
}

impl MutationObserverHandle for MockMutationObserver {
    fn observe(&self, options: &MutationObserveOptions) {
        *self.options.lock() = Some(options.clone());
    }

    fn disconnect(&self) {
        *self.options.lock() = None;
    }
}

struct MockVisibilityObserver {
    observed: Arc<Mutex<HashSet<NodeId>>>,
}

impl VisibilityObserverHandle for MockVisibilityObserver {
    fn observe(&self, node: NodeId) {
        self.observed.lock().insert(node);
    }

    fn unobserve(&self, node: NodeId) {
        self.observed.lock().remove(&node);
    }

    fn disconnect(&self) {
        self.observed.lock().clear();
    }
}

/// In-memory host environment
pub struct MockHost {
    /// Map of node IDs to nodes
    nodes: Arc<DashMap<NodeId, MockNode>>,
    /// Nodes whose queries fail
    poisoned: DashSet<NodeId>,
    /// Counter for generating unique node IDs
    next_node_id: AtomicU32,
    clock: Arc<ManualClock>,
    viewport: Mutex<Viewport>,
    mutation_supported: AtomicBool,
    visibility_supported: AtomicBool,
    mutation_observers: Mutex<Vec<MutationSubscription>>,
    visibility_observers: Mutex<Vec<VisibilitySubscription>>,
    listeners: Mutex<Vec<(ListenerId, AbortEventKind, EventListener)>>,
    next_listener_id: AtomicU64,
    marks: Mutex<Vec<RecordedMark>>,
    fail_marks: AtomicBool,
    snapshots: Mutex<Vec<DebugSnapshot>>,
    unavailable_reasons: Mutex<Vec<String>>,
    fail_debug: AtomicBool,
}

impl MockHost {
    /// Body element of the initial document
    pub const BODY: NodeId = NodeId(3);

    /// Create a mock host with a `html > body` document and the given viewport
    pub fn new(viewport: Viewport) -> Self {
        let host = Self {
            nodes: Arc::new(DashMap::new()),
            poisoned: DashSet::new(),
            next_node_id: AtomicU32::new(1),
            clock: Arc::new(ManualClock::new(0.0)),
            viewport: Mutex::new(viewport),
            mutation_supported: AtomicBool::new(true),
            visibility_supported: AtomicBool::new(true),
            mutation_observers: Mutex::new(Vec::new()),
            visibility_observers: Mutex::new(Vec::new()),
            listeners: Mutex::new(Vec::new()),
            next_listener_id: AtomicU64::new(1),
            marks: Mutex::new(Vec::new()),
            fail_marks: AtomicBool::new(false),
            snapshots: Mutex::new(Vec::new()),
            unavailable_reasons: Mutex::new(Vec::new()),
            fail_debug: AtomicBool::new(false),
        };

        host.initialize_document();
        host
    }

    /// Initialize the document structure
    fn initialize_document(&self) {
        self.insert_node(MockNode {
            node_type: NodeType::Document,
            local_name: None,
            attributes: Vec::new(),
            parent: None,
        });
        let html = self.insert_node(MockNode {
            node_type: NodeType::Element,
            local_name: Some("html".to_string()),
            attributes: vec![("lang".to_string(), "en".to_string())],
            parent: Some(NodeId(1)),
        });
        self.insert_node(MockNode {
            node_type: NodeType::Element,
            local_name: Some("body".to_string()),
            attributes: Vec::new(),
            parent: Some(html),
        });
    }

    fn insert_node(&self, node: MockNode) -> NodeId {
        let id = NodeId(self.next_node_id.fetch_add(1, Ordering::SeqCst));
        self.nodes.insert(id, node);
        id
    }

    /// Bundle this host as a full environment, including mark and debug sinks
    pub fn environment(self: &Arc<Self>) -> HostEnvironment {
        HostEnvironment {
            clock: self.clock.clone(),
            viewport: self.clone(),
            dom: self.clone(),
            observation: self.clone(),
            events: self.clone(),
            marks: Some(self.clone()),
            debug: Some(self.clone()),
        }
    }

    /// The host clock
    pub fn clock(&self) -> &ManualClock {
        &self.clock
    }

    // ------------------------------------------------------------------
    // Document
    // ------------------------------------------------------------------

    /// Create an element under `parent` (detached when `None`)
    pub fn create_element(&self, tag: &str, parent: Option<NodeId>) -> NodeId {
        self.insert_node(MockNode {
            node_type: NodeType::Element,
            local_name: Some(tag.to_ascii_lowercase()),
            attributes: Vec::new(),
            parent,
        })
    }

    /// Create a text node under `parent`
    pub fn create_text(&self, parent: Option<NodeId>) -> NodeId {
        self.insert_node(MockNode {
            node_type: NodeType::Text,
            local_name: None,
            attributes: Vec::new(),
            parent,
        })
    }

    /// Create a comment node under `parent`
    pub fn create_comment(&self, parent: Option<NodeId>) -> NodeId {
        self.insert_node(MockNode {
            node_type: NodeType::Comment,
            local_name: None,
            attributes: Vec::new(),
            parent,
        })
    }

    /// Set an attribute value on an element
    pub fn set_attribute(&self, node: NodeId, name: &str, value: &str) -> Result<(), HostError> {
        let mut entry = self
            .nodes
            .get_mut(&node)
            .ok_or(HostError::NodeNotFound(node))?;
        let node_ref = entry.value_mut();

        if node_ref.node_type != NodeType::Element {
            return Err(HostError::NotAnElement(node));
        }

        match node_ref.attributes.iter_mut().find(|(n, _)| n == name) {
            Some((_, v)) => *v = value.to_string(),
            None => node_ref
                .attributes
                .push((name.to_string(), value.to_string())),
        }
        Ok(())
    }

    /// Re-parent a node; no structural validation is performed
    pub fn set_parent(&self, node: NodeId, parent: Option<NodeId>) -> Result<(), HostError> {
        let mut entry = self
            .nodes
            .get_mut(&node)
            .ok_or(HostError::NodeNotFound(node))?;
        entry.value_mut().parent = parent;
        Ok(())
    }

    /// Make every query about `node` fail
    pub fn poison(&self, node: NodeId) {
        self.poisoned.insert(node);
    }

    fn lookup(&self, node: NodeId) -> Result<MockNode, HostError> {
        if self.poisoned.contains(&node) {
            return Err(HostError::Unavailable(format!("{} is not accessible", node)));
        }
        self.nodes
            .get(&node)
            .map(|n| n.value().clone())
            .ok_or(HostError::NodeNotFound(node))
    }

    // ------------------------------------------------------------------
    // Capabilities
    // ------------------------------------------------------------------

    /// Toggle availability of the mutation primitive
    pub fn set_mutation_supported(&self, supported: bool) {
        self.mutation_supported.store(supported, Ordering::SeqCst);
    }

    /// Toggle availability of the visibility primitive
    pub fn set_visibility_supported(&self, supported: bool) {
        self.visibility_supported.store(supported, Ordering::SeqCst);
    }

    /// Make mark writes fail
    pub fn set_fail_marks(&self, fail: bool) {
        self.fail_marks.store(fail, Ordering::SeqCst);
    }

    /// Make debug publication fail
    pub fn set_fail_debug(&self, fail: bool) {
        self.fail_debug.store(fail, Ordering::SeqCst);
    }

    // ------------------------------------------------------------------
    // Scripted delivery
    // ------------------------------------------------------------------

    /// Deliver a mutation batch to every observing subscription
    ///
    /// Records are filtered per subscription by its observe options.
    pub fn deliver_mutations(&self, records: Vec<MutationRecord>) {
        let targets: Vec<(MutationCallback, MutationObserveOptions)> = self
            .mutation_observers
            .lock()
            .iter()
            .filter_map(|s| s.options.lock().clone().map(|o| (s.callback.clone(), o)))
            .collect();

        for (callback, options) in targets {
            let batch: Vec<MutationRecord> = records
                .iter()
                .filter(|r| match r.kind {
                    MutationKind::ChildList => options.child_list,
                    MutationKind::Attributes => r
                        .attribute_name
                        .as_deref()
                        .map_or(false, |name| options.reports_attribute(name)),
                })
                .cloned()
                .collect();

            if !batch.is_empty() {
                callback(batch);
            }
        }
    }

    /// Deliver a visibility batch; each subscription sees only entries it observes
    pub fn deliver_intersections(&self, entries: Vec<IntersectionEntry>) {
        let targets: Vec<(IntersectionCallback, HashSet<NodeId>)> = self
            .visibility_observers
            .lock()
            .iter()
            .map(|s| (s.callback.clone(), s.observed.lock().clone()))
            .collect();

        for (callback, observed) in targets {
            let batch: Vec<IntersectionEntry> = entries
                .iter()
                .filter(|e| observed.contains(&e.target))
                .copied()
                .collect();

            if !batch.is_empty() {
                callback(batch);
            }
        }
    }

    /// Whether any visibility subscription currently observes `node`
    pub fn is_observing_visibility(&self, node: NodeId) -> bool {
        self.visibility_observers
            .lock()
            .iter()
            .any(|s| s.observed.lock().contains(&node))
    }

    /// Whether any mutation subscription is currently observing
    pub fn is_observing_mutations(&self) -> bool {
        self.mutation_observers
            .lock()
            .iter()
            .any(|s| s.options.lock().is_some())
    }

    /// Dispatch an abort-trigger event to bound listeners
    pub fn dispatch(&self, kind: AbortEventKind, timestamp: f64) {
        let matching: Vec<(ListenerId, EventListener)> = self
            .listeners
            .lock()
            .iter()
            .filter(|(_, k, _)| *k == kind)
            .map(|(id, _, l)| (*id, l.clone()))
            .collect();

        let event = HostEvent { kind, timestamp };
        for (id, listener) in matching {
            // An earlier listener in this dispatch may have unbound it
            if !self.is_bound(id) {
                continue;
            }
            if listener(&event) == ListenerControl::Remove {
                self.unbind(id);
            }
        }
    }

    /// Dispatch a wheel event
    pub fn wheel(&self, timestamp: f64) {
        self.dispatch(AbortEventKind::Wheel, timestamp);
    }

    /// Dispatch a keydown event
    pub fn keydown(&self, timestamp: f64) {
        self.dispatch(AbortEventKind::Keydown, timestamp);
    }

    /// Change the viewport and dispatch a resize event
    pub fn resize(&self, viewport: Viewport, timestamp: f64) {
        *self.viewport.lock() = viewport;
        self.dispatch(AbortEventKind::Resize, timestamp);
    }

    fn is_bound(&self, id: ListenerId) -> bool {
        self.listeners.lock().iter().any(|(i, _, _)| *i == id)
    }

    /// Number of listeners bound for `kind`
    pub fn listener_count(&self, kind: AbortEventKind) -> usize {
        self.listeners
            .lock()
            .iter()
            .filter(|(_, k, _)| *k == kind)
            .count()
    }

    // ------------------------------------------------------------------
    // Recorded diagnostics
    // ------------------------------------------------------------------

    /// Marks written so far
    pub fn marks(&self) -> Vec<RecordedMark> {
        self.marks.lock().clone()
    }

    /// Debug snapshots published so far
    pub fn debug_snapshots(&self) -> Vec<DebugSnapshot> {
        self.snapshots.lock().clone()
    }

    /// Unavailable reasons published so far
    pub fn unavailable_reasons(&self) -> Vec<String> {
        self.unavailable_reasons.lock().clone()
    }
}

impl Default for MockHost {
    fn default() -> Self {
        Self::new(Viewport::new(1000.0, 800.0))
    }
}

impl ViewportReader for MockHost {
    fn viewport(&self) -> Viewport {
        *self.viewport.lock()
    }
}

impl DomTree for MockHost {
    fn node_type(&self, node: NodeId) -> Result<NodeType, HostError> {
        self.lookup(node).map(|n| n.node_type)
    }

    fn local_name(&self, node: NodeId) -> Result<String, HostError> {
        self.lookup(node)?
            .local_name
            .ok_or(HostError::NotAnElement(node))
    }

    fn attribute(&self, node: NodeId, name: &str) -> Result<Option<String>, HostError> {
        let node_ref = self.lookup(node)?;
        Ok(node_ref
            .attributes
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.clone()))
    }

    fn class_list(&self, node: NodeId) -> Result<Vec<String>, HostError> {
        Ok(self
            .attribute(node, "class")?
            .map(|classes| classes.split_whitespace().map(str::to_string).collect())
            .unwrap_or_default())
    }

    fn parent_element(&self, node: NodeId) -> Result<Option<NodeId>, HostError> {
        let Some(parent) = self.lookup(node)?.parent else {
            return Ok(None);
        };
        match self.nodes.get(&parent) {
            Some(p) if p.node_type == NodeType::Element => Ok(Some(parent)),
            _ => Ok(None),
        }
    }
}

impl ObservationHost for MockHost {
    fn create_mutation_observer(
        &self,
        callback: MutationCallback,
    ) -> Option<Box<dyn MutationObserverHandle>> {
        if !self.mutation_supported.load(Ordering::SeqCst) {
            return None;
        }
        let options = Arc::new(Mutex::new(None));
        self.mutation_observers.lock().push(MutationSubscription {
            callback,
            options: options.clone(),
        });
        Some(Box::new(MockMutationObserver { options }))
    }

    fn create_visibility_observer(
        &self,
        callback: IntersectionCallback,
    ) -> Option<Box<dyn VisibilityObserverHandle>> {
        if !self.visibility_supported.load(Ordering::SeqCst) {
            return None;
        }
        let observed = Arc::new(Mutex::new(HashSet::new()));
        self.visibility_observers.lock().push(VisibilitySubscription {
            callback,
            observed: observed.clone(),
        });
        Some(Box::new(MockVisibilityObserver { observed }))
    }
}

impl AbortEventHost for MockHost {
    fn bind(&self, kind: AbortEventKind, listener: EventListener) -> ListenerId {
        let id = ListenerId(self.next_listener_id.fetch_add(1, Ordering::SeqCst));
        self.listeners.lock().push((id, kind, listener));
        id
    }

    fn unbind(&self, id: ListenerId) {
        self.listeners.lock().retain(|(i, _, _)| *i != id);
    }
}

impl MarkSink for MockHost {
    fn mark(&self, name: &str, start: f64, duration: f64) -> Result<(), HostError> {
        if self.fail_marks.load(Ordering::SeqCst) {
            return Err(HostError::SinkFailed(format!("mark {} rejected", name)));
        }
        self.marks.lock().push(RecordedMark {
            name: name.to_string(),
            start,
            duration,
        });
        Ok(())
    }
}

impl DebugPublisher for MockHost {
    fn publish(&self, snapshot: &DebugSnapshot) -> Result<(), HostError> {
        if self.fail_debug.load(Ordering::SeqCst) {
            return Err(HostError::SinkFailed("debug snapshot rejected".to_string()));
        }
        debug!("Mock host received debug snapshot");
        self.snapshots.lock().push(snapshot.clone());
        Ok(())
    }

    fn publish_unavailable(&self, reason: &str) -> Result<(), HostError> {
        if self.fail_debug.load(Ordering::SeqCst) {
            return Err(HostError::SinkFailed("debug reason rejected".to_string()));
        }
        self.unavailable_reasons.lock().push(reason.to_string());
        Ok(())
    }
}

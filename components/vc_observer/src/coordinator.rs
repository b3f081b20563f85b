//! Mutation-intersection coordinator
//!
//! Correlates two independently batched host streams: DOM changes and element
//! visibility. An element changed by a mutation is parked in a pending map and
//! handed to the visibility primitive; the first time it is then reported
//! visible with a non-empty rectangle, exactly one paint event carrying the
//! mutation's timestamp is published. Visibility reports with no pending
//! mutation describe content that was already on screen and are dropped.

use host_bridge::{
    Clock, DomTree, HostEnvironment, IntersectionEntry, MutationKind, MutationObserveOptions,
    MutationObserverHandle, MutationRecord, VisibilityObserverHandle,
};
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, OnceLock, Weak};
use tracing::debug;
use vc_types::{NodeId, NodeType, PaintEvent};

use crate::config::SelectorConfig;
use crate::identity::IdentityResolver;
use crate::self_timing::SelfTimer;

/// Receives paint events
pub type PaintSink = Arc<dyn Fn(&PaintEvent) + Send + Sync>;

#[derive(Debug, Clone, Copy)]
struct PendingMutation {
    timestamp: f64,
    ignored: bool,
}

#[derive(Default)]
struct CoordinatorState {
    /// Changed elements awaiting a visibility confirmation
    pending: HashMap<NodeId, PendingMutation>,
    /// Elements last reported visible
    in_view: HashSet<NodeId>,
    sinks: Vec<PaintSink>,
}

struct CoordinatorCore {
    clock: Arc<dyn Clock>,
    dom: Arc<dyn DomTree>,
    resolver: IdentityResolver,
    state: Mutex<CoordinatorState>,
    timer: SelfTimer,
    mutations: OnceLock<Box<dyn MutationObserverHandle>>,
    visibility: OnceLock<Box<dyn VisibilityObserverHandle>>,
}

/// Turns host notifications into paint events
pub struct Coordinator {
    core: Arc<CoordinatorCore>,
}

impl Coordinator {
    /// Create a coordinator and its host observers
    ///
    /// Observers are only kept when the host provides both primitives; check
    /// [`Coordinator::is_supported`] before calling [`Coordinator::observe`].
    pub fn new(selector_config: SelectorConfig, env: &HostEnvironment) -> Self {
        let core = Arc::new(CoordinatorCore {
            clock: env.clock.clone(),
            dom: env.dom.clone(),
            resolver: IdentityResolver::new(selector_config, env.dom.clone()),
            state: Mutex::new(CoordinatorState::default()),
            timer: SelfTimer::new(env.clock.clone()),
            mutations: OnceLock::new(),
            visibility: OnceLock::new(),
        });

        let weak: Weak<CoordinatorCore> = Arc::downgrade(&core);
        let visibility = env.observation.create_visibility_observer(Arc::new(
            move |entries: Vec<IntersectionEntry>| {
                if let Some(core) = weak.upgrade() {
                    core.handle_intersections(entries);
                }
            },
        ));

        let weak: Weak<CoordinatorCore> = Arc::downgrade(&core);
        let mutations = env.observation.create_mutation_observer(Arc::new(
            move |records: Vec<MutationRecord>| {
                if let Some(core) = weak.upgrade() {
                    core.handle_mutations(records);
                }
            },
        ));

        match (mutations, visibility) {
            (Some(mutations), Some(visibility)) => {
                let _ = core.mutations.set(mutations);
                let _ = core.visibility.set(visibility);
            }
            _ => debug!("Host lacks an observation primitive; coordinator is inert"),
        }

        Self { core }
    }

    /// Whether both observation primitives are available
    pub fn is_supported(&self) -> bool {
        self.core.mutations.get().is_some() && self.core.visibility.get().is_some()
    }

    /// Start listening for DOM changes; resets the self-timing total
    pub fn observe(&self) {
        self.core.timer.reset();
        if let Some(mutations) = self.core.mutations.get() {
            mutations.observe(&MutationObserveOptions::default());
            debug!("Coordinator observing DOM changes");
        }
    }

    /// Stop listening and release all tracked elements and sinks
    ///
    /// Idempotent.
    pub fn disconnect(&self) {
        if let Some(mutations) = self.core.mutations.get() {
            mutations.disconnect();
        }
        if let Some(visibility) = self.core.visibility.get() {
            visibility.disconnect();
        }
        *self.core.state.lock() = CoordinatorState::default();
    }

    /// Register a paint-event sink
    pub fn subscribe_results(&self, sink: PaintSink) {
        self.core.state.lock().sinks.push(sink);
    }

    /// Time spent handling host batches since the last `observe`
    pub fn total_time(&self) -> f64 {
        self.core.timer.total()
    }

    /// Process a DOM change batch
    pub fn handle_mutations(&self, records: Vec<MutationRecord>) {
        self.core.handle_mutations(records);
    }

    /// Process a visibility batch
    pub fn handle_intersections(&self, entries: Vec<IntersectionEntry>) {
        self.core.handle_intersections(entries);
    }

    /// Number of elements awaiting visibility confirmation
    pub fn pending_count(&self) -> usize {
        self.core.state.lock().pending.len()
    }

    /// Whether `node` was last reported visible
    pub fn is_in_view(&self, node: NodeId) -> bool {
        self.core.state.lock().in_view.contains(&node)
    }
}

impl CoordinatorCore {
    fn handle_mutations(&self, records: Vec<MutationRecord>) {
        let _timing = self.timer.scope();

        for record in records {
            let timestamp = record.timestamp.unwrap_or_else(|| self.clock.now());
            // No trigger sets this yet; it is carried through to the log.
            let ignored = false;

            match record.kind {
                MutationKind::ChildList => {
                    for &node in &record.added_nodes {
                        match self.dom.node_type(node) {
                            Ok(NodeType::Element) => self.track(node, timestamp, ignored),
                            Ok(NodeType::Text) => {
                                if let Ok(Some(parent)) = self.dom.parent_element(node) {
                                    self.track(parent, timestamp, ignored);
                                }
                            }
                            Ok(_) => {}
                            Err(err) => debug!("Skipping added node {}: {}", node, err),
                        }
                    }
                    for &node in &record.removed_nodes {
                        self.untrack(node);
                    }
                }
                MutationKind::Attributes => {
                    if matches!(self.dom.node_type(record.target), Ok(NodeType::Element)) {
                        self.track(record.target, timestamp, ignored);
                    }
                }
            }
        }
    }

    fn track(&self, element: NodeId, timestamp: f64, ignored: bool) {
        if let Some(visibility) = self.visibility.get() {
            visibility.observe(element);
        }
        self.state
            .lock()
            .pending
            .insert(element, PendingMutation { timestamp, ignored });
    }

    fn untrack(&self, node: NodeId) {
        if let Some(visibility) = self.visibility.get() {
            visibility.unobserve(node);
        }
        let mut state = self.state.lock();
        state.in_view.remove(&node);
        state.pending.remove(&node);
    }

    fn handle_intersections(&self, entries: Vec<IntersectionEntry>) {
        let mut events = Vec::new();
        {
            let _timing = self.timer.scope();

            for entry in entries {
                let target = entry.target;
                if !(entry.is_intersecting && entry.intersection_rect.has_area()) {
                    self.state.lock().in_view.remove(&target);
                    continue;
                }

                let Some(pending) = self.state.lock().pending.remove(&target) else {
                    debug!("Ignoring visibility of {} without a recent mutation", target);
                    continue;
                };

                if !matches!(self.dom.node_type(target), Ok(NodeType::Element)) {
                    continue;
                }

                events.push(PaintEvent {
                    timestamp: pending.timestamp,
                    rect: entry.intersection_rect,
                    label: self.resolver.resolve(target),
                    element: target,
                    ignored: pending.ignored,
                });
                self.state.lock().in_view.insert(target);
            }
        }

        if events.is_empty() {
            return;
        }
        let sinks = self.state.lock().sinks.clone();
        for event in &events {
            for sink in &sinks {
                sink(event);
            }
        }
    }
}

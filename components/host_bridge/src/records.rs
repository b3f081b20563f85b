//! Notification records delivered by the host

use serde::{Deserialize, Serialize};
use vc_types::{NodeId, Rect};

/// Kind of DOM change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MutationKind {
    /// Nodes were added to or removed from `target`
    ChildList,
    /// An attribute of `target` changed
    Attributes,
}

/// One DOM change as reported by the host
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MutationRecord {
    /// Kind of change
    #[serde(rename = "type")]
    pub kind: MutationKind,
    /// Node whose children or attributes changed
    pub target: NodeId,
    /// Nodes added (child list changes)
    #[serde(default)]
    pub added_nodes: Vec<NodeId>,
    /// Nodes removed (child list changes)
    #[serde(default)]
    pub removed_nodes: Vec<NodeId>,
    /// Changed attribute name (attribute changes)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attribute_name: Option<String>,
    /// Host timestamp, when the host supplies one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<f64>,
}

impl MutationRecord {
    /// Child list change on `target`
    pub fn child_list(target: NodeId, added_nodes: Vec<NodeId>, removed_nodes: Vec<NodeId>) -> Self {
        Self {
            kind: MutationKind::ChildList,
            target,
            added_nodes,
            removed_nodes,
            attribute_name: None,
            timestamp: None,
        }
    }

    /// Attribute change on `target`
    pub fn attributes(target: NodeId, attribute_name: impl Into<String>) -> Self {
        Self {
            kind: MutationKind::Attributes,
            target,
            added_nodes: Vec::new(),
            removed_nodes: Vec::new(),
            attribute_name: Some(attribute_name.into()),
            timestamp: None,
        }
    }

    /// Attach a host timestamp
    pub fn with_timestamp(mut self, timestamp: f64) -> Self {
        self.timestamp = Some(timestamp);
        self
    }
}

/// Options for a mutation subscription
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MutationObserveOptions {
    pub child_list: bool,
    pub subtree: bool,
    pub attributes: bool,
    pub attribute_old_value: bool,
    /// Attribute names to report; empty reports all
    pub attribute_filter: Vec<String>,
}

impl Default for MutationObserveOptions {
    fn default() -> Self {
        Self {
            child_list: true,
            subtree: true,
            attributes: true,
            attribute_old_value: true,
            attribute_filter: vec!["hidden".to_string(), "style".to_string(), "src".to_string()],
        }
    }
}

impl MutationObserveOptions {
    /// Whether a change to `name` is reported under these options
    pub fn reports_attribute(&self, name: &str) -> bool {
        self.attributes
            && (self.attribute_filter.is_empty() || self.attribute_filter.iter().any(|a| a == name))
    }
}

/// Visibility change of one observed element
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IntersectionEntry {
    /// Observed element
    pub target: NodeId,
    /// Whether the element intersects the viewport
    pub is_intersecting: bool,
    /// Visible portion of the element
    pub intersection_rect: Rect,
}

impl IntersectionEntry {
    /// Element entered (or is in) the viewport
    pub fn visible(target: NodeId, intersection_rect: Rect) -> Self {
        Self {
            target,
            is_intersecting: true,
            intersection_rect,
        }
    }

    /// Element left the viewport
    pub fn hidden(target: NodeId) -> Self {
        Self {
            target,
            is_intersecting: false,
            intersection_rect: Rect::default(),
        }
    }
}

/// Host events that disqualify a measurement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AbortEventKind {
    Wheel,
    Keydown,
    Resize,
}

/// An abort-trigger event
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HostEvent {
    pub kind: AbortEventKind,
    /// Host event timestamp (ms)
    pub timestamp: f64,
}

/// Listener verdict after handling an event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListenerControl {
    /// Stay bound
    Keep,
    /// Unbind after this call
    Remove,
}

/// Handle of a bound event listener
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(pub u64);

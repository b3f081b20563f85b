//! Reporting labels for painted elements
//!
//! Labels group log entries for humans; nothing in the engine relies on them
//! being unique.

use host_bridge::DomTree;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::debug;
use vc_types::{HostError, NodeId};

use crate::config::SelectorConfig;

/// Label used when the host fails while describing an element
pub const ERROR_LABEL: &str = "error";

/// Stand-in for a missing ancestor
pub const UNKNOWN_LABEL: &str = "unknown";

/// Ancestor walks stop after this many levels
const MAX_ANCESTOR_DEPTH: usize = 256;

/// Derives a selector-like label for an element
pub struct IdentityResolver {
    config: SelectorConfig,
    dom: Arc<dyn DomTree>,
}

impl IdentityResolver {
    /// Create a resolver over the given document
    pub fn new(config: SelectorConfig, dom: Arc<dyn DomTree>) -> Self {
        Self { config, dom }
    }

    /// Label for `element`; never fails
    ///
    /// Format is `tag` followed by the instrumentation attribute, else
    /// `#id[testid=..][role=..]`, else `.class.list`. With none of these,
    /// `"<parent label> > tag"`.
    pub fn resolve(&self, element: NodeId) -> String {
        let mut visited = HashSet::new();
        self.resolve_guarded(element, &mut visited)
    }

    fn resolve_guarded(&self, element: NodeId, visited: &mut HashSet<NodeId>) -> String {
        visited.insert(element);
        match self.try_resolve(element, visited) {
            Ok(label) => label,
            Err(err) => {
                debug!("Label resolution failed for {}: {}", element, err);
                ERROR_LABEL.to_string()
            }
        }
    }

    fn try_resolve(
        &self,
        element: NodeId,
        visited: &mut HashSet<NodeId>,
    ) -> Result<String, HostError> {
        let tag = self.dom.local_name(element)?;

        let data_vc = if self.config.data_vc {
            non_empty(self.dom.attribute(element, "data-vc")?)
                .map(|v| format!("[data-vc=\"{}\"]", v))
                .unwrap_or_default()
        } else {
            String::new()
        };

        let id = if self.config.id {
            non_empty(self.dom.element_id(element)?)
                .map(|v| format!("#{}", v))
                .unwrap_or_default()
        } else {
            String::new()
        };

        let test_id = if self.config.test_id {
            let primary = non_empty(self.dom.attribute(element, "data-testid")?);
            let value = match primary {
                Some(v) => Some(v),
                None => non_empty(self.dom.attribute(element, "data-test-id")?),
            };
            value.map(|v| format!("[testid={}]", v)).unwrap_or_default()
        } else {
            String::new()
        };

        let role = if self.config.role {
            non_empty(self.dom.attribute(element, "role")?)
                .map(|v| format!("[role={}]", v))
                .unwrap_or_default()
        } else {
            String::new()
        };

        let classes = if self.config.class_name {
            let list = self.dom.class_list(element)?;
            if list.is_empty() {
                String::new()
            } else {
                format!(".{}", list.join("."))
            }
        } else {
            String::new()
        };

        let attrs = if data_vc.is_empty() {
            format!("{}{}{}", id, test_id, role)
        } else {
            data_vc
        };

        if !attrs.is_empty() {
            return Ok(format!("{}{}", tag, attrs));
        }
        if !classes.is_empty() {
            return Ok(format!("{}{}", tag, classes));
        }

        let parent_label = match self.dom.parent_element(element)? {
            Some(parent) if !visited.contains(&parent) && visited.len() < MAX_ANCESTOR_DEPTH => {
                self.resolve_guarded(parent, visited)
            }
            _ => UNKNOWN_LABEL.to_string(),
        };
        Ok(format!("{} > {}", parent_label, tag))
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

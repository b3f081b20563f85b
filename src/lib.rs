//! Visual completeness measurement for CortenBrowser
//!
//! Measures how much of the viewport has been painted over time and reports
//! percentile timestamps (VC25 .. VC99), a coarse heatmap, and a per-element
//! timeline. The engine lives in `vc_observer`; this crate bundles it with
//! the protocol surface.
//!
//! # Example
//!
//! ```
//! use corten_vc::{MockHost, VcObserverConfig, VcService};
//! use std::sync::Arc;
//!
//! # tokio_test::block_on(async {
//! let host = Arc::new(MockHost::default());
//! let service = VcService::new(VcObserverConfig::default(), host.environment());
//!
//! let response = service
//!     .handle_message(r#"{"id": 1, "method": "VisualCompleteness.enable"}"#)
//!     .await;
//! assert_eq!(response, r#"{"id":1,"result":{}}"#);
//! # });
//! ```

#![warn(missing_docs)]

use std::sync::Arc;

pub use host_bridge::{
    AbortEventHost, Clock, DebugPublisher, DomTree, HostEnvironment, IntersectionEntry,
    ManualClock, MarkSink, MockHost, MutationRecord, ObservationHost, ViewportReader,
};
pub use vc_domain::{VisualCompletenessDomain, DOMAIN_NAME};
pub use vc_observer::{
    calculate_vc, Heatmap, SelectorConfig, VcCalculation, VcObserver, VcObserverConfig,
    VcObserverConfigBuilder, VcRawData,
};
pub use vc_protocol::{DomainHandler, ProtocolHandler, ProtocolRequest, ProtocolResponse};
pub use vc_types::{
    AbortReason, AbortState, NodeId, ProtocolError, Rect, Result, VcError, Viewport, VC_THRESHOLDS,
};

/// Protocol endpoint serving one visual completeness observer
///
/// Routes `VisualCompleteness.*` messages to a [`VisualCompletenessDomain`].
pub struct VcService {
    handler: ProtocolHandler,
    domain: Arc<VisualCompletenessDomain>,
}

impl VcService {
    /// Create a service whose domain starts disabled
    pub fn new(config: VcObserverConfig, env: HostEnvironment) -> Self {
        let domain = Arc::new(VisualCompletenessDomain::new(config, env));
        let handler = ProtocolHandler::new();
        handler.register_domain(domain.clone());
        Self { handler, domain }
    }

    /// The registered domain
    pub fn domain(&self) -> Arc<VisualCompletenessDomain> {
        self.domain.clone()
    }

    /// The observer currently backing the domain
    pub fn observer(&self) -> Arc<VcObserver> {
        self.domain.observer()
    }

    /// Handle one JSON message and return the JSON response
    pub async fn handle_message(&self, message: &str) -> String {
        self.handler.handle_message(message).await
    }
}

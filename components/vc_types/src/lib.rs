// Visual completeness data model, shared events, and error definitions
//
// This module is part of the CortenBrowser visual completeness implementation.

pub mod abort;
pub mod errors;
pub mod geometry;
pub mod node;
pub mod paint;

// Re-export commonly used types
pub use abort::{AbortReason, AbortState};
pub use errors::{HostError, ProtocolError, VcError};
pub use geometry::{GridBounds, Rect, Viewport};
pub use node::{NodeId, NodeType};
pub use paint::{
    ComponentsLog, DebugMetrics, DebugSnapshot, ElementRatios, PaintEvent, PaintLogEntry,
    TimelineEntry, PercentileTable, VC_THRESHOLDS,
};

/// Result type for visual completeness operations
pub type Result<T> = std::result::Result<T, VcError>;

//! Visual completeness measurement engine
//!
//! This crate turns host DOM-change and visibility notifications into
//! visual completeness metrics for a single view.
//!
//! # Features
//!
//! - **Coordinator**: correlates mutations with visibility and emits paint events
//! - **IdentityResolver**: human-readable element labels for reports
//! - **Heatmap**: fixed-size spatial accumulator of last-paint timestamps
//! - **calculate_vc**: percentile table, contributing elements, and timeline
//! - **AbortStateMachine**: scroll / keypress / resize / error / not-supported handling
//! - **SelfTimer**: tallies the engine's own processing time
//! - **VcObserver**: session lifecycle and report assembly

mod abort;
mod config;
mod coordinator;
mod heatmap;
mod identity;
mod percentile;
mod self_timing;
mod session;

pub use abort::AbortStateMachine;
pub use config::{
    SelectorConfig, VcObserverConfig, VcObserverConfigBuilder, DEFAULT_HEATMAP_SIZE,
    MAX_HEATMAP_SIZE,
};
pub use coordinator::{Coordinator, PaintSink};
pub use heatmap::{relative_time, round_ms, GridWriteError, Heatmap, RaggedHeatmap, UNUSED_SECTOR};
pub use identity::{IdentityResolver, ERROR_LABEL, UNKNOWN_LABEL};
pub use percentile::{calculate_vc, PercentileElements, VcCalculation, MAX_EXPOSED_TIMELINE};
pub use self_timing::{SelfTimer, TimingScope};
pub use session::{VcObserver, VcRawData};

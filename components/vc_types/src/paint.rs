// Paint events, the per-timestamp components log, and timeline samples

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::geometry::Rect;
use crate::node::NodeId;

/// Percentile thresholds reported by the engine, in ascending order
pub const VC_THRESHOLDS: [u8; 9] = [25, 50, 75, 80, 85, 90, 95, 98, 99];

/// Threshold -> earliest relative timestamp (ms) at which it was reached
pub type PercentileTable = BTreeMap<u8, Option<i64>>;

/// Element label -> fraction of the grid covered by its last-seen rectangle
pub type ElementRatios = BTreeMap<String, f64>;

/// Rounded relative timestamp -> paint entries logged at that millisecond
pub type ComponentsLog = BTreeMap<i64, Vec<PaintLogEntry>>;

/// An element became visible after a correlated DOM change
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaintEvent {
    /// Host timestamp of the triggering mutation (absolute, ms)
    pub timestamp: f64,
    /// Visible portion of the element
    pub rect: Rect,
    /// Reporting label of the element
    pub label: String,
    /// Element handle
    pub element: NodeId,
    /// Reserved filter flag; no trigger currently sets it
    pub ignored: bool,
}

/// One entry of the components log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaintLogEntry {
    /// Reporting label of the element
    pub label: String,
    /// Visible portion of the element
    pub rect: Rect,
    /// Whether the entry was excluded from the heatmap
    pub ignored: bool,
    /// Element handle, retained only in debug sessions
    #[serde(skip_serializing_if = "Option::is_none")]
    pub debug_element: Option<NodeId>,
}

/// One cumulative coverage sample of the timeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimelineEntry {
    /// Relative timestamp (ms)
    pub time: i64,
    /// Cumulative painted percentage, one decimal
    pub vc: f64,
    /// Labels logged at exactly this timestamp
    pub elements: Vec<String>,
}

/// Subset of percentiles published for debugging
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DebugMetrics {
    #[serde(rename = "75")]
    pub vc75: Option<i64>,
    #[serde(rename = "80")]
    pub vc80: Option<i64>,
    #[serde(rename = "85")]
    pub vc85: Option<i64>,
    #[serde(rename = "90")]
    pub vc90: Option<i64>,
    #[serde(rename = "95")]
    pub vc95: Option<i64>,
    #[serde(rename = "98")]
    pub vc98: Option<i64>,
    #[serde(rename = "99")]
    pub vc99: Option<i64>,
}

impl DebugMetrics {
    /// Pick the published subset out of a full percentile table
    pub fn from_table(table: &PercentileTable) -> Self {
        let get = |threshold: u8| table.get(&threshold).copied().flatten();
        Self {
            vc75: get(75),
            vc80: get(80),
            vc85: get(85),
            vc90: get(90),
            vc95: get(95),
            vc98: get(98),
            vc99: get(99),
        }
    }
}

/// Snapshot handed to the optional debug publisher
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DebugSnapshot {
    /// Full, uncapped timeline
    pub entries: Vec<TimelineEntry>,
    /// Components log
    pub log: ComponentsLog,
    /// Selected percentiles
    pub metrics: DebugMetrics,
    /// Heatmap rows
    pub heatmap: Vec<Vec<i64>>,
    /// Element ratios
    pub ratios: ElementRatios,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_thresholds_are_ascending() {
        assert!(VC_THRESHOLDS.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_log_entry_hides_missing_debug_element() {
        let entry = PaintLogEntry {
            label: "div.card".to_string(),
            rect: Rect::new(0.0, 0.0, 10.0, 10.0),
            ignored: false,
            debug_element: None,
        };
        let json = serde_json::to_value(&entry).unwrap();
        assert!(json.get("debugElement").is_none());
        assert_eq!(json["label"], "div.card");
    }

    #[test]
    fn test_debug_metrics_from_table() {
        let mut table = PercentileTable::new();
        for threshold in VC_THRESHOLDS {
            table.insert(threshold, Some(i64::from(threshold)));
        }
        table.insert(99, None);

        let metrics = DebugMetrics::from_table(&table);
        assert_eq!(metrics.vc75, Some(75));
        assert_eq!(metrics.vc98, Some(98));
        assert_eq!(metrics.vc99, None);

        let json = serde_json::to_value(&metrics).unwrap();
        assert_eq!(json["80"], 80);
        assert!(json.get("25").is_none());
    }
}

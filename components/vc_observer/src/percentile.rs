//! Percentile and timeline calculation
//!
//! A pure function of a frozen heatmap and components log. Thresholds are
//! compared in integer arithmetic (`painted * 100 >= threshold * total`) so a
//! cumulative ratio that lands exactly on a threshold always meets it.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use vc_types::{ComponentsLog, PercentileTable, TimelineEntry, VC_THRESHOLDS};

use crate::heatmap::{Heatmap, UNUSED_SECTOR};

/// Timeline entries exposed in reports
pub const MAX_EXPOSED_TIMELINE: usize = 50;

/// Threshold -> labels logged at the timestamp that reached it
pub type PercentileElements = BTreeMap<u8, Option<Vec<String>>>;

/// Result of a visual completeness calculation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VcCalculation {
    /// Threshold -> relative timestamp
    pub percentiles: PercentileTable,
    /// Threshold -> contributing labels
    pub elements: PercentileElements,
    /// Cumulative coverage per distinct timestamp, uncapped
    pub timeline: Vec<TimelineEntry>,
    /// Number of painted cells
    pub total_painted: u64,
}

impl VcCalculation {
    /// The timeline as exposed at the report boundary
    pub fn exposed_timeline(&self) -> &[TimelineEntry] {
        let end = self.timeline.len().min(MAX_EXPOSED_TIMELINE);
        &self.timeline[..end]
    }
}

/// Compute percentiles, contributing elements, and the coverage timeline
pub fn calculate_vc(heatmap: &Heatmap, components_log: &ComponentsLog) -> VcCalculation {
    let mut histogram: BTreeMap<i64, u64> = BTreeMap::new();
    let mut total_painted = 0u64;

    for &cell in heatmap.cells() {
        if cell != UNUSED_SECTOR {
            total_painted += 1;
            *histogram.entry(cell).or_insert(0) += 1;
        }
    }

    let mut percentiles: PercentileTable = VC_THRESHOLDS.iter().map(|&t| (t, None)).collect();
    let mut elements: PercentileElements = VC_THRESHOLDS.iter().map(|&t| (t, None)).collect();
    let mut timeline = Vec::with_capacity(histogram.len());

    if total_painted == 0 {
        return VcCalculation {
            percentiles,
            elements,
            timeline,
            total_painted,
        };
    }

    let mut painted_so_far = 0u64;
    for (&time, &count) in &histogram {
        painted_so_far += count;

        for threshold in VC_THRESHOLDS {
            let reached = painted_so_far * 100 >= u64::from(threshold) * total_painted;
            let slot = percentiles.entry(threshold).or_insert(None);
            if slot.is_none() && reached {
                *slot = Some(time);
                elements.insert(threshold, Some(labels_at(components_log, time)));
            }
        }

        timeline.push(TimelineEntry {
            time,
            vc: percent_one_decimal(painted_so_far, total_painted),
            elements: labels_at(components_log, time),
        });
    }

    VcCalculation {
        percentiles,
        elements,
        timeline,
        total_painted,
    }
}

fn labels_at(components_log: &ComponentsLog, time: i64) -> Vec<String> {
    components_log
        .get(&time)
        .map(|entries| entries.iter().map(|e| e.label.clone()).collect())
        .unwrap_or_default()
}

fn percent_one_decimal(part: u64, total: u64) -> f64 {
    ((part as f64 / total as f64) * 1000.0 + 0.5).floor() / 10.0
}

//! Session-level tests for vc_observer
//!
//! These drive a `VcObserver` end to end through a `MockHost`: DOM changes and
//! visibility reports go in, report mappings come out.

use host_bridge::{AbortEventKind, IntersectionEntry, MockHost, MutationRecord};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use std::sync::Arc;
use vc_observer::{VcObserver, VcObserverConfig};
use vc_types::{AbortReason, NodeId, Rect, Viewport, VC_THRESHOLDS};

fn host() -> Arc<MockHost> {
    Arc::new(MockHost::new(Viewport::new(100.0, 100.0)))
}

fn observer(host: &Arc<MockHost>) -> VcObserver {
    let config = VcObserverConfig::builder().heatmap_size(10).build();
    VcObserver::new(config, host.environment())
}

fn debug_observer(host: &Arc<MockHost>) -> VcObserver {
    let config = VcObserverConfig::builder()
        .heatmap_size(10)
        .debug(true)
        .build();
    VcObserver::new(config, host.environment())
}

/// Insert an element under body and report it visible at `rect`
fn paint_element(host: &MockHost, tag: &str, class: &str, timestamp: f64, rect: Rect) -> NodeId {
    let element = host.create_element(tag, Some(MockHost::BODY));
    host.set_attribute(element, "class", class).unwrap();
    host.deliver_mutations(vec![
        MutationRecord::child_list(MockHost::BODY, vec![element], vec![]).with_timestamp(timestamp),
    ]);
    host.deliver_intersections(vec![IntersectionEntry::visible(element, rect)]);
    element
}

fn all_thresholds(value: Value) -> Value {
    let map: serde_json::Map<String, Value> = VC_THRESHOLDS
        .iter()
        .map(|t| (t.to_string(), value.clone()))
        .collect();
    Value::Object(map)
}

#[test]
fn test_two_paints_full_report() {
    let host = host();
    let vc = observer(&host);
    vc.start(0.0);

    paint_element(&host, "div", "hero", 30.0, Rect::new(0.0, 0.0, 50.0, 50.0));
    paint_element(&host, "section", "page", 60.0, Rect::new(0.0, 0.0, 100.0, 100.0));

    let report = vc.get_result(Some("ufo")).unwrap();
    assert_eq!(
        Value::Object(report),
        json!({
            "metrics:vc": all_thresholds(json!(60)),
            "ufo:vc:state": true,
            "ufo:vc:clean": true,
            "ufo:vc:dom": all_thresholds(json!(["section.page"])),
            "ufo:vc:updates": [
                { "time": 60, "vc": 100.0, "elements": ["section.page"] }
            ],
            "ufo:vc:size": { "width": 100.0, "height": 100.0 },
            "ufo:vc:time": 0,
            "ufo:vc:total": 100,
            "ufo:vc:ratios": { "div.hero": 0.25, "section.page": 1.0 },
        })
    );
}

#[test]
fn test_keypress_before_paint_yields_abort_form() {
    let host = host();
    let vc = observer(&host);
    vc.start(0.0);

    host.keydown(40.0);
    paint_element(&host, "div", "late", 50.0, Rect::new(0.0, 0.0, 100.0, 100.0));

    let report = vc.get_result(Some("ufo")).unwrap();
    assert_eq!(
        Value::Object(report),
        json!({
            "ufo:vc:state": false,
            "ufo:vc:abort:reason": "keypress",
            "ufo:vc:abort:timestamp": 40.0,
        })
    );
}

#[test]
fn test_scroll_marks_report_unclean() {
    let host = host();
    let vc = observer(&host);
    vc.start(0.0);

    host.wheel(5.0);
    paint_element(&host, "main", "content", 20.0, Rect::new(0.0, 0.0, 100.0, 100.0));

    let report = vc.get_result(None).unwrap();
    assert_eq!(report["vc:state"], json!(true));
    assert_eq!(report["vc:clean"], json!(false));
    assert_eq!(report["vc:total"], json!(100));
    assert_eq!(report["metrics:vc"]["90"], json!(20));
}

#[test]
fn test_abort_precedence_through_host_events() {
    let host = host();
    let vc = observer(&host);
    vc.start(0.0);

    host.wheel(1.0);
    host.keydown(2.0);
    host.resize(Viewport::new(50.0, 50.0), 3.0);

    let state = vc.abort_state();
    assert_eq!(state.reason, Some(AbortReason::Keypress));
    assert_eq!(state.timestamp, 2.0);
    assert!(state.blocking);
    assert_eq!(host.listener_count(AbortEventKind::Resize), 0);
}

#[test]
fn test_resize_with_unchanged_dimensions_is_ignored() {
    let host = host();
    let vc = observer(&host);
    vc.start(0.0);

    host.resize(Viewport::new(100.0, 100.0), 4.0);
    assert_eq!(vc.abort_state().reason, None);

    host.resize(Viewport::new(120.0, 100.0), 9.0);
    let report = vc.get_result(None).unwrap();
    assert_eq!(report["vc:abort:reason"], json!("resize"));
    assert_eq!(report["vc:abort:timestamp"], json!(9.0));
}

#[test]
fn test_not_supported_host() {
    let host = host();
    host.set_visibility_supported(false);
    let vc = observer(&host);
    assert!(!vc.is_supported());

    vc.start(12.0);
    assert!(!host.is_observing_mutations());
    assert_eq!(host.listener_count(AbortEventKind::Keydown), 0);

    let report = vc.get_result(None).unwrap();
    assert_eq!(
        Value::Object(report),
        json!({
            "vc:state": false,
            "vc:abort:reason": "not-supported",
            "vc:abort:timestamp": 12.0,
        })
    );
}

#[test]
fn test_repeat_visibility_without_mutation_is_ignored() {
    let host = host();
    let vc = observer(&host);
    vc.start(0.0);

    let hero = paint_element(&host, "div", "hero", 10.0, Rect::new(0.0, 0.0, 100.0, 50.0));
    host.deliver_intersections(vec![IntersectionEntry::hidden(hero)]);
    host.deliver_intersections(vec![IntersectionEntry::visible(
        hero,
        Rect::new(0.0, 0.0, 100.0, 100.0),
    )]);

    let report = vc.get_result(None).unwrap();
    assert_eq!(report["vc:total"], json!(50));
    assert_eq!(report["vc:ratios"], json!({ "div.hero": 0.5 }));
}

#[test]
fn test_session_without_paints_reports_nulls() {
    let host = host();
    let vc = observer(&host);
    vc.start(0.0);

    let report = vc.get_result(None).unwrap();
    assert_eq!(report["vc:state"], json!(true));
    assert_eq!(report["vc:clean"], json!(true));
    assert_eq!(report["vc:total"], json!(0));
    assert_eq!(report["metrics:vc"], all_thresholds(Value::Null));
    assert_eq!(report["vc:dom"], all_thresholds(Value::Null));
    assert_eq!(report["vc:updates"], json!([]));
}

#[test]
fn test_exposed_timeline_is_capped_at_fifty() {
    let host = Arc::new(MockHost::new(Viewport::new(100.0, 100.0)));
    let config = VcObserverConfig::builder().heatmap_size(100).build();
    let vc = VcObserver::new(config, host.environment());
    vc.start(0.0);

    for i in 0..60 {
        let x = i as f64;
        paint_element(&host, "span", "dot", x + 1.0, Rect::new(x, 0.0, 1.0, 1.0));
    }

    let report = vc.get_result(None).unwrap();
    assert_eq!(report["vc:total"], json!(60));
    let updates = report["vc:updates"].as_array().unwrap();
    assert_eq!(updates.len(), 50);
    assert_eq!(updates[49]["time"], json!(50));
}

#[test]
fn test_empty_prefix_is_unprefixed() {
    let host = host();
    let vc = observer(&host);
    vc.start(0.0);

    let report = vc.get_result(Some("")).unwrap();
    assert!(report.contains_key("vc:state"));
    assert!(report.contains_key("metrics:vc"));
}

#[test]
fn test_marks_written_for_resolved_thresholds() {
    let host = host();
    let vc = observer(&host);
    vc.start(100.0);

    paint_element(&host, "div", "half", 125.0, Rect::new(0.0, 0.0, 100.0, 50.0));
    paint_element(&host, "div", "rest", 175.0, Rect::new(0.0, 50.0, 100.0, 50.0));
    vc.get_result(None).unwrap();

    let marks: Vec<(String, f64, f64)> = host
        .marks()
        .into_iter()
        .map(|m| (m.name, m.start, m.duration))
        .collect();
    assert_eq!(marks[0], ("VC25".to_string(), 100.0, 25.0));
    assert_eq!(marks[1], ("VC50".to_string(), 100.0, 25.0));
    assert_eq!(marks[2], ("VC75".to_string(), 100.0, 75.0));
    assert_eq!(marks.len(), VC_THRESHOLDS.len());
}

#[test]
fn test_failing_sinks_do_not_affect_report() {
    let host = host();
    host.set_fail_marks(true);
    host.set_fail_debug(true);
    let vc = debug_observer(&host);
    vc.start(0.0);

    paint_element(&host, "div", "hero", 10.0, Rect::new(0.0, 0.0, 100.0, 100.0));

    let report = vc.get_result(None).unwrap();
    assert_eq!(report["vc:state"], json!(true));
    assert!(host.marks().is_empty());
    assert!(host.debug_snapshots().is_empty());
}

#[test]
fn test_debug_publishes_snapshot() {
    let host = host();
    let vc = debug_observer(&host);
    vc.start(0.0);

    paint_element(&host, "div", "hero", 10.0, Rect::new(0.0, 0.0, 100.0, 100.0));
    vc.get_result(None).unwrap();

    let snapshots = host.debug_snapshots();
    assert_eq!(snapshots.len(), 1);
    let snapshot = &snapshots[0];
    assert_eq!(snapshot.metrics.vc75, Some(10));
    assert_eq!(snapshot.metrics.vc99, Some(10));
    assert_eq!(snapshot.entries.len(), 1);
    assert_eq!(snapshot.heatmap.len(), 10);
    assert_eq!(snapshot.ratios.get("div.hero"), Some(&1.0));
    assert!(snapshot.log[&10][0].debug_element.is_some());
}

#[test]
fn test_debug_publishes_unavailable_reason_on_abort() {
    let host = host();
    let vc = debug_observer(&host);
    vc.start(0.0);

    host.keydown(3.0);
    vc.get_result(None).unwrap();

    assert_eq!(host.unavailable_reasons(), vec!["keypress".to_string()]);
    assert!(host.debug_snapshots().is_empty());
}

#[test]
fn test_no_debug_publication_without_debug() {
    let host = host();
    let vc = observer(&host);
    vc.start(0.0);

    paint_element(&host, "div", "hero", 10.0, Rect::new(0.0, 0.0, 100.0, 100.0));
    vc.get_result(None).unwrap();

    assert!(host.debug_snapshots().is_empty());
}

#[test]
fn test_result_from_raw_data() {
    let host = host();
    let vc = observer(&host);
    let session_id = vc.start(0.0);

    paint_element(&host, "div", "hero", 45.0, Rect::new(0.0, 0.0, 100.0, 100.0));
    let raw = vc.get_raw_data().unwrap();
    assert_eq!(raw.session_id, session_id);
    assert_eq!(raw.abort_reason_info, None);

    let report = vc.result_from_raw(Some("page"), &raw).unwrap();
    assert_eq!(report["page:vc:total"], json!(100));
    assert_eq!(report["metrics:vc"]["25"], json!(45));
}

#[test]
fn test_report_stops_observation() {
    let host = host();
    let vc = observer(&host);
    vc.start(0.0);
    assert!(host.is_observing_mutations());

    vc.get_result(None).unwrap();
    assert!(!host.is_observing_mutations());
    assert_eq!(host.listener_count(AbortEventKind::Wheel), 0);

    // Changes after the report do not reach the session
    paint_element(&host, "div", "late", 5.0, Rect::new(0.0, 0.0, 100.0, 100.0));
    let raw = vc.get_raw_data().unwrap();
    assert!(raw.components_log.is_empty());
}

#[test]
fn test_raw_data_serializes_camel_case() {
    let host = host();
    let vc = observer(&host);
    vc.start(0.0);
    host.keydown(7.0);

    let raw = vc.get_raw_data().unwrap();
    let value = serde_json::to_value(&raw).unwrap();
    assert_eq!(value["abortReasonInfo"], json!("keypress"));
    assert_eq!(value["abortReason"]["blocking"], json!(true));
    assert_eq!(value["heatmap"].as_array().unwrap().len(), 10);
    assert_eq!(value["viewport"], json!({ "width": 100.0, "height": 100.0 }));

    let back: vc_observer::VcRawData = serde_json::from_value(value).unwrap();
    assert_eq!(back, raw);
}

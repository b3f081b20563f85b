//! Session controller
//!
//! Composes the coordinator, heatmap, abort state machine, and self-timing
//! into the start / stop / report lifecycle of one measurement session.

use host_bridge::HostEnvironment;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::{Arc, Weak};
use tracing::{debug, info};
use uuid::Uuid;
use vc_types::{
    AbortReason, AbortState, ComponentsLog, DebugMetrics, DebugSnapshot, ElementRatios, GridBounds,
    PaintEvent, PaintLogEntry, PercentileTable, Result, Viewport, VC_THRESHOLDS,
};

use crate::abort::AbortStateMachine;
use crate::config::VcObserverConfig;
use crate::coordinator::Coordinator;
use crate::heatmap::{relative_time, round_ms, Heatmap};
use crate::percentile::{calculate_vc, VcCalculation};
use crate::self_timing::SelfTimer;

/// Frozen copy of a session's measurement data
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VcRawData {
    pub session_id: Uuid,
    /// `reason` or `"reason info"`; `None` while clean
    pub abort_reason_info: Option<String>,
    pub abort_reason: AbortState,
    pub heatmap: Heatmap,
    /// Engine self-time in ms
    pub total_time: i64,
    pub components_log: ComponentsLog,
    pub viewport: Viewport,
    pub debug: bool,
    pub ratios: ElementRatios,
}

struct SessionData {
    /// Set by the first `start`; `None` means never started
    session_id: Option<Uuid>,
    start_time: f64,
    viewport: Viewport,
    heatmap: Heatmap,
    components_log: ComponentsLog,
    ratios: ElementRatios,
}

struct SessionCore {
    config: VcObserverConfig,
    env: HostEnvironment,
    coordinator: Coordinator,
    abort: Arc<AbortStateMachine>,
    timer: SelfTimer,
    data: Mutex<SessionData>,
}

/// Visual completeness observer for one view
pub struct VcObserver {
    core: Arc<SessionCore>,
}

impl VcObserver {
    /// Create an idle observer bound to `env`
    pub fn new(config: VcObserverConfig, env: HostEnvironment) -> Self {
        let coordinator = Coordinator::new(config.selector_config(), &env);
        let abort = Arc::new(AbortStateMachine::new(env.events.clone()));
        let data = SessionData {
            session_id: None,
            start_time: 0.0,
            viewport: Viewport::default(),
            heatmap: Heatmap::new(config.heatmap_size()),
            components_log: ComponentsLog::new(),
            ratios: ElementRatios::new(),
        };

        Self {
            core: Arc::new(SessionCore {
                timer: SelfTimer::new(env.clock.clone()),
                config,
                env,
                coordinator,
                abort,
                data: Mutex::new(data),
            }),
        }
    }

    /// Whether the host provides the required observation primitives
    pub fn is_supported(&self) -> bool {
        self.core.coordinator.is_supported()
    }

    /// Begin a new session; all data of a previous session is replaced
    ///
    /// On a host without observation support the session records a blocking
    /// `not-supported` abort and observes nothing.
    pub fn start(&self, start_time: f64) -> Uuid {
        let core = &self.core;
        let session_id = Uuid::new_v4();

        core.coordinator.disconnect();
        core.abort.reset();
        core.timer.reset();
        {
            let mut data = core.data.lock();
            data.session_id = Some(session_id);
            data.start_time = start_time;
            data.heatmap = Heatmap::new(core.config.heatmap_size());
            data.components_log.clear();
            data.ratios.clear();
        }

        if !core.coordinator.is_supported() {
            core.abort.set_abort(AbortReason::NotSupported, start_time, "");
            info!("Session {} not supported by host", session_id);
            return session_id;
        }

        let viewport = core.env.viewport.viewport();
        core.data.lock().viewport = viewport;
        core.abort.attach_listeners(core.env.viewport.clone(), viewport);

        let weak: Weak<SessionCore> = Arc::downgrade(core);
        core.coordinator.subscribe_results(Arc::new(move |event: &PaintEvent| {
            if let Some(core) = weak.upgrade() {
                core.handle_paint_event(event);
            }
        }));
        core.coordinator.observe();

        info!(
            "Session {} started at {} ({}x{})",
            session_id, start_time, viewport.width, viewport.height
        );
        session_id
    }

    /// Stop observing and detach abort listeners; idempotent
    ///
    /// Collected data stays available for reporting.
    pub fn stop(&self) {
        self.core.stop();
    }

    /// Apply one paint event to the session data
    pub fn handle_paint_event(&self, event: &PaintEvent) {
        self.core.handle_paint_event(event);
    }

    /// Current abort record
    pub fn abort_state(&self) -> AbortState {
        self.core.abort.state()
    }

    /// Id of the current session, `None` before the first `start`
    pub fn session_id(&self) -> Option<Uuid> {
        self.core.data.lock().session_id
    }

    /// Whether a session was ever started
    pub fn is_active(&self) -> bool {
        self.session_id().is_some()
    }

    /// Accumulated self-time of the controller and coordinator in ms
    pub fn total_time(&self) -> f64 {
        self.core.timer.total() + self.core.coordinator.total_time()
    }

    /// Stop observing and copy out the session data
    ///
    /// Returns `None` when no session was ever started.
    pub fn get_raw_data(&self) -> Option<VcRawData> {
        let core = &self.core;
        let mut raw = {
            let _timing = core.timer.scope();
            let session_id = core.data.lock().session_id?;
            core.stop();

            let abort = core.abort.state();
            let data = core.data.lock();
            VcRawData {
                session_id,
                abort_reason_info: abort.reason_info(),
                abort_reason: abort,
                heatmap: data.heatmap.clone(),
                total_time: 0,
                components_log: data.components_log.clone(),
                viewport: data.viewport,
                debug: core.config.debug(),
                ratios: data.ratios.clone(),
            }
        };
        raw.total_time = round_ms(self.total_time());
        Some(raw)
    }

    /// Stop observing and build the report mapping
    ///
    /// Keys are namespaced as `"<prefix>:vc:..."` when `prefix` is non-empty.
    /// An observer that never started yields an empty mapping.
    pub fn get_result(&self, prefix: Option<&str>) -> Result<Map<String, Value>> {
        let started = self.core.env.clock.now();
        match self.get_raw_data() {
            Some(raw) => self.core.build_report(prefix, &raw, started),
            None => Ok(Map::new()),
        }
    }

    /// Build a report from previously captured raw data
    pub fn result_from_raw(
        &self,
        prefix: Option<&str>,
        raw: &VcRawData,
    ) -> Result<Map<String, Value>> {
        let started = self.core.env.clock.now();
        self.core.build_report(prefix, raw, started)
    }
}

impl SessionCore {
    fn stop(&self) {
        self.coordinator.disconnect();
        self.abort.detach_listeners();
        debug!("Session observation stopped");
    }

    fn handle_paint_event(&self, event: &PaintEvent) {
        let _timing = self.timer.scope();

        if self.abort.is_blocking() {
            return;
        }

        let mut data = self.data.lock();
        let bounds = data.heatmap.map_rect(&event.rect, &data.viewport);
        self.record_paint(&mut data, event, &bounds);
    }

    /// Write one mapped paint into the grid, ratio map, and log
    ///
    /// A failed grid write records a blocking `error` abort; cells written
    /// before the failure and the log entry are kept.
    fn record_paint(&self, data: &mut SessionData, event: &PaintEvent, bounds: &GridBounds) {
        let time = relative_time(event.timestamp, data.start_time);
        let ratio = data.heatmap.element_ratio(bounds);
        data.ratios.insert(event.label.clone(), ratio);

        if !event.ignored {
            if let Err(err) = data.heatmap.apply(bounds, time) {
                debug!("{} for {}", err, event.label);
                self.abort.set_abort(AbortReason::Error, time as f64, "");
            }
        }

        data.components_log.entry(time).or_default().push(PaintLogEntry {
            label: event.label.clone(),
            rect: event.rect,
            ignored: event.ignored,
            debug_element: self.config.debug().then_some(event.element),
        });
    }

    fn build_report(
        &self,
        prefix: Option<&str>,
        raw: &VcRawData,
        started: f64,
    ) -> Result<Map<String, Value>> {
        let key = |name: &str| match prefix {
            Some(p) if !p.is_empty() => format!("{}:vc:{}", p, name),
            _ => format!("vc:{}", name),
        };
        let mut report = Map::new();

        if let (Some(reason), true) = (&raw.abort_reason_info, raw.abort_reason.blocking) {
            if raw.debug {
                self.publish_unavailable(reason);
            }
            report.insert(key("state"), Value::Bool(false));
            report.insert(key("abort:reason"), Value::String(reason.clone()));
            report.insert(
                key("abort:timestamp"),
                serde_json::to_value(raw.abort_reason.timestamp)?,
            );
            return Ok(report);
        }

        let calculation = calculate_vc(&raw.heatmap, &raw.components_log);
        self.write_marks(&calculation.percentiles);
        let stopped = self.env.clock.now();

        if raw.debug {
            self.publish_snapshot(raw, &calculation);
        }

        report.insert(
            "metrics:vc".to_string(),
            serde_json::to_value(&calculation.percentiles)?,
        );
        report.insert(key("state"), Value::Bool(true));
        report.insert(key("clean"), Value::Bool(raw.abort_reason_info.is_none()));
        report.insert(key("dom"), serde_json::to_value(&calculation.elements)?);
        report.insert(
            key("updates"),
            serde_json::to_value(calculation.exposed_timeline())?,
        );
        report.insert(key("size"), serde_json::to_value(raw.viewport)?);
        report.insert(
            key("time"),
            Value::from(round_ms(raw.total_time as f64 + (stopped - started))),
        );
        report.insert(key("total"), Value::from(calculation.total_painted));
        report.insert(key("ratios"), serde_json::to_value(&raw.ratios)?);
        Ok(report)
    }

    fn write_marks(&self, percentiles: &PercentileTable) {
        let Some(marks) = &self.env.marks else {
            return;
        };
        let start = self.data.lock().start_time;
        for threshold in VC_THRESHOLDS {
            if let Some(Some(duration)) = percentiles.get(&threshold) {
                let name = format!("VC{}", threshold);
                if let Err(err) = marks.mark(&name, start, *duration as f64) {
                    debug!("Failed to write mark {}: {}", name, err);
                }
            }
        }
    }

    fn publish_snapshot(&self, raw: &VcRawData, calculation: &VcCalculation) {
        let Some(publisher) = &self.env.debug else {
            return;
        };
        let snapshot = DebugSnapshot {
            entries: calculation.timeline.clone(),
            log: raw.components_log.clone(),
            metrics: DebugMetrics::from_table(&calculation.percentiles),
            heatmap: raw.heatmap.rows(),
            ratios: raw.ratios.clone(),
        };
        if let Err(err) = publisher.publish(&snapshot) {
            debug!("Failed to publish debug snapshot: {}", err);
        }
    }

    fn publish_unavailable(&self, reason: &str) {
        if let Some(publisher) = &self.env.debug {
            if let Err(err) = publisher.publish_unavailable(reason) {
                debug!("Failed to publish unavailable reason: {}", err);
            }
        }
    }
}

impl std::fmt::Debug for VcObserver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VcObserver")
            .field("config", &self.core.config)
            .field("session_id", &self.session_id())
            .field("abort", &self.core.abort)
            .finish_non_exhaustive()
    }
}

//! VisualCompleteness protocol domain
//!
//! Exposes a [`VcObserver`] measurement session through protocol methods:
//! `enable`, `disable`, `start`, `stop`, `getResult`, `getRawData`, and
//! `getAbortState`.

mod params;

use async_trait::async_trait;
use host_bridge::HostEnvironment;
use parking_lot::RwLock;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};
use vc_observer::{VcObserver, VcObserverConfig};
use vc_protocol::DomainHandler;
use vc_types::{ProtocolError, VcError};

use crate::params::{parse_params, EnableParams, GetResultParams, StartParams};

/// Domain name used for routing
pub const DOMAIN_NAME: &str = "VisualCompleteness";

/// VisualCompleteness domain handler
pub struct VisualCompletenessDomain {
    /// Whether the domain is enabled
    enabled: Arc<AtomicBool>,
    /// Host capabilities, kept to rebuild the observer on reconfiguration
    env: HostEnvironment,
    /// Observer of the current configuration
    observer: Arc<RwLock<Arc<VcObserver>>>,
}

impl VisualCompletenessDomain {
    /// Create a disabled domain with an observer built from `config`
    pub fn new(config: VcObserverConfig, env: HostEnvironment) -> Self {
        let observer = Arc::new(VcObserver::new(config, env.clone()));
        Self {
            enabled: Arc::new(AtomicBool::new(false)),
            env,
            observer: Arc::new(RwLock::new(observer)),
        }
    }

    /// Check if the domain is enabled
    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }

    /// The observer currently backing the domain
    pub fn observer(&self) -> Arc<VcObserver> {
        self.observer.read().clone()
    }

    fn require_enabled(&self, method: &str) -> Result<Arc<VcObserver>, ProtocolError> {
        if !self.is_enabled() {
            debug!("VisualCompleteness.{} called while disabled", method);
            return Err(ProtocolError::invalid_request());
        }
        Ok(self.observer())
    }

    /// Handle the enable method
    ///
    /// `options` replaces the observer with one built from the given
    /// configuration; any running session of the old observer is stopped.
    fn handle_enable(&self, params: Option<Value>) -> Result<Value, ProtocolError> {
        let params: EnableParams = parse_params(params)?;

        if let Some(options) = params.options {
            let config = VcObserverConfig::from_json(options)?;
            let replacement = Arc::new(VcObserver::new(config, self.env.clone()));
            let previous = std::mem::replace(&mut *self.observer.write(), replacement);
            previous.stop();
            debug!("VisualCompleteness observer reconfigured");
        }

        self.enabled.store(true, Ordering::SeqCst);
        info!("VisualCompleteness domain enabled");
        Ok(json!({}))
    }

    /// Handle the disable method
    fn handle_disable(&self) -> Result<Value, ProtocolError> {
        self.enabled.store(false, Ordering::SeqCst);
        self.observer().stop();
        info!("VisualCompleteness domain disabled");
        Ok(json!({}))
    }

    /// Handle the start method
    fn handle_start(&self, params: Option<Value>) -> Result<Value, ProtocolError> {
        let observer = self.require_enabled("start")?;
        let params: StartParams = parse_params(params)?;

        let start_time = params.start_time.unwrap_or_else(|| self.env.clock.now());
        let session_id = observer.start(start_time);

        Ok(json!({
            "sessionId": session_id.to_string(),
            "supported": observer.is_supported(),
        }))
    }

    /// Handle the stop method
    fn handle_stop(&self) -> Result<Value, ProtocolError> {
        let observer = self.require_enabled("stop")?;
        observer.stop();
        Ok(json!({}))
    }

    /// Handle the getResult method
    fn handle_get_result(&self, params: Option<Value>) -> Result<Value, ProtocolError> {
        let observer = self.require_enabled("getResult")?;
        let params: GetResultParams = parse_params(params)?;

        let result = observer.get_result(params.prefix.as_deref())?;
        Ok(json!({ "result": result }))
    }

    /// Handle the getRawData method
    fn handle_get_raw_data(&self) -> Result<Value, ProtocolError> {
        let observer = self.require_enabled("getRawData")?;
        let raw = observer.get_raw_data();
        let raw = serde_json::to_value(raw).map_err(VcError::from)?;
        Ok(json!({ "rawData": raw }))
    }

    /// Handle the getAbortState method
    fn handle_get_abort_state(&self) -> Result<Value, ProtocolError> {
        let observer = self.require_enabled("getAbortState")?;
        if !observer.is_active() {
            return Err(VcError::SessionNotActive.into());
        }

        let state = observer.abort_state();
        Ok(json!({
            "abortReasonInfo": state.reason_info(),
            "abortState": state,
        }))
    }
}

#[async_trait]
impl DomainHandler for VisualCompletenessDomain {
    fn name(&self) -> &str {
        DOMAIN_NAME
    }

    async fn handle_method(
        &self,
        method: &str,
        params: Option<Value>,
    ) -> Result<Value, ProtocolError> {
        debug!("VisualCompleteness domain handling method: {}", method);

        match method {
            "enable" => self.handle_enable(params),
            "disable" => self.handle_disable(),
            "start" => self.handle_start(params),
            "stop" => self.handle_stop(),
            "getResult" => self.handle_get_result(params),
            "getRawData" => self.handle_get_raw_data(),
            "getAbortState" => self.handle_get_abort_state(),
            _ => {
                warn!("Unknown VisualCompleteness method: {}", method);
                Err(ProtocolError::method_not_found(format!(
                    "{}.{}",
                    DOMAIN_NAME, method
                )))
            }
        }
    }
}

impl std::fmt::Debug for VisualCompletenessDomain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VisualCompletenessDomain")
            .field("enabled", &self.is_enabled())
            .field("observer", &*self.observer.read())
            .finish()
    }
}

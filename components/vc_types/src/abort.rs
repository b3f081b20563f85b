// Abort reasons and the per-session abort record

use serde::{Deserialize, Serialize};

/// Why a measurement session stopped contributing data
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AbortReason {
    /// User scrolled with the wheel; measurement continues but is not clean
    Scroll,
    /// User pressed a key
    Keypress,
    /// Viewport dimensions changed after capture
    Resize,
    /// Internal invariant violation
    Error,
    /// Host lacks a required observation primitive
    NotSupported,
}

impl AbortReason {
    /// Whether this reason permanently stops data collection
    pub fn is_blocking(self) -> bool {
        !matches!(self, AbortReason::Scroll)
    }

    /// Stable string form used in reports
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Scroll => "scroll",
            Self::Keypress => "keypress",
            Self::Resize => "resize",
            Self::Error => "error",
            Self::NotSupported => "not-supported",
        }
    }
}

impl std::fmt::Display for AbortReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Current abort record of a session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AbortState {
    /// Accepted reason, `None` while measurement is clean
    pub reason: Option<AbortReason>,
    /// Free-form detail appended to the reason in reports
    pub info: String,
    /// Host timestamp of the triggering event, `-1` when unset
    pub timestamp: f64,
    /// Whether collection has stopped
    pub blocking: bool,
}

impl Default for AbortState {
    fn default() -> Self {
        Self {
            reason: None,
            info: String::new(),
            timestamp: -1.0,
            blocking: false,
        }
    }
}

impl AbortState {
    /// Whether paint events may still mutate session data
    pub fn accepts_data(&self) -> bool {
        self.reason.is_none() || !self.blocking
    }

    /// Reason plus optional info, e.g. `"resize"` or `"error grid write"`
    pub fn reason_info(&self) -> Option<String> {
        let reason = self.reason?;
        if self.info.is_empty() {
            Some(reason.to_string())
        } else {
            Some(format!("{} {}", reason, self.info))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_reason_blocking() {
        assert!(!AbortReason::Scroll.is_blocking());
        assert!(AbortReason::Keypress.is_blocking());
        assert!(AbortReason::Resize.is_blocking());
        assert!(AbortReason::Error.is_blocking());
        assert!(AbortReason::NotSupported.is_blocking());
    }

    #[test]
    fn test_reason_serialization() {
        let json = serde_json::to_string(&AbortReason::NotSupported).unwrap();
        assert_eq!(json, "\"not-supported\"");
        assert_eq!(AbortReason::Keypress.to_string(), "keypress");
    }

    #[test]
    fn test_default_state() {
        let state = AbortState::default();
        assert!(state.accepts_data());
        assert_eq!(state.timestamp, -1.0);
        assert_eq!(state.reason_info(), None);
    }

    #[test]
    fn test_reason_info() {
        let mut state = AbortState {
            reason: Some(AbortReason::Error),
            info: String::new(),
            timestamp: 10.0,
            blocking: true,
        };
        assert_eq!(state.reason_info().as_deref(), Some("error"));
        assert!(!state.accepts_data());

        state.info = "grid write".to_string();
        assert_eq!(state.reason_info().as_deref(), Some("error grid write"));
    }
}

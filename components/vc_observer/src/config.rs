//! Configuration for the visual completeness observer

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;
use vc_types::{Result, VcError};

/// Default side length of the heatmap grid
pub const DEFAULT_HEATMAP_SIZE: usize = 200;

/// Largest accepted heatmap side length
pub const MAX_HEATMAP_SIZE: usize = 1000;

/// Which element signals contribute to reporting labels
///
/// Missing keys take their defaults when deserialized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SelectorConfig {
    /// Use the element id (`#id`)
    pub id: bool,
    /// Use `data-testid` / `data-test-id`
    pub test_id: bool,
    /// Use the ARIA role
    pub role: bool,
    /// Use the class list
    pub class_name: bool,
    /// Use the `data-vc` instrumentation attribute
    #[serde(rename = "dataVC")]
    pub data_vc: bool,
}

impl Default for SelectorConfig {
    fn default() -> Self {
        Self {
            id: false,
            test_id: false,
            role: false,
            class_name: true,
            data_vc: true,
        }
    }
}

/// Configuration for a `VcObserver`
///
/// Deserialization validates `heatmapSize` the same way as
/// [`VcObserverConfig::from_json`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "ConfigOptions")]
pub struct VcObserverConfig {
    /// Heatmap side length in `1..=MAX_HEATMAP_SIZE`
    heatmap_size: usize,

    /// Publish debug snapshots and keep element handles in the log
    debug: bool,

    /// Label signal selection
    selector_config: SelectorConfig,
}

impl VcObserverConfig {
    /// Create a new builder for VcObserverConfig
    ///
    /// # Example
    ///
    /// ```
    /// use vc_observer::VcObserverConfig;
    ///
    /// let config = VcObserverConfig::builder()
    ///     .heatmap_size(100)
    ///     .debug(true)
    ///     .build();
    /// assert_eq!(config.heatmap_size(), 100);
    /// ```
    pub fn builder() -> VcObserverConfigBuilder {
        VcObserverConfigBuilder::default()
    }

    /// Parse a host-supplied options object
    ///
    /// Keys: `heatmapSize`, `debug`, `selectorConfig`. `null` selects the
    /// defaults. A `heatmapSize` above [`MAX_HEATMAP_SIZE`] is rejected with
    /// `VcError::InvalidConfiguration`.
    pub fn from_json(value: Value) -> Result<Self> {
        match value {
            Value::Null => Ok(Self::default()),
            Value::Object(_) => {
                let options: ConfigOptions = serde_json::from_value(value)?;
                Self::try_from(options)
            }
            other => Err(VcError::InvalidConfiguration(format!(
                "options must be an object, got {}",
                other
            ))),
        }
    }

    /// Get the heatmap side length
    pub fn heatmap_size(&self) -> usize {
        self.heatmap_size
    }

    /// Get whether debug mode is enabled
    pub fn debug(&self) -> bool {
        self.debug
    }

    /// Get the label signal selection
    pub fn selector_config(&self) -> SelectorConfig {
        self.selector_config
    }
}

impl Default for VcObserverConfig {
    /// Default values:
    /// - heatmap_size: 200
    /// - debug: false
    /// - selector_config: class names and `data-vc` only
    fn default() -> Self {
        Self {
            heatmap_size: DEFAULT_HEATMAP_SIZE,
            debug: false,
            selector_config: SelectorConfig::default(),
        }
    }
}

/// Unvalidated form of the configuration as it arrives from the host
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct ConfigOptions {
    heatmap_size: usize,
    debug: bool,
    selector_config: SelectorConfig,
}

impl Default for ConfigOptions {
    fn default() -> Self {
        let config = VcObserverConfig::default();
        Self {
            heatmap_size: config.heatmap_size,
            debug: config.debug,
            selector_config: config.selector_config,
        }
    }
}

impl TryFrom<ConfigOptions> for VcObserverConfig {
    type Error = VcError;

    fn try_from(options: ConfigOptions) -> Result<Self> {
        Ok(Self {
            heatmap_size: checked_heatmap_size(options.heatmap_size)?,
            debug: options.debug,
            selector_config: options.selector_config,
        })
    }
}

/// 0 selects the default; sizes above the maximum are rejected
fn checked_heatmap_size(size: usize) -> Result<usize> {
    match size {
        0 => Ok(DEFAULT_HEATMAP_SIZE),
        size if size > MAX_HEATMAP_SIZE => Err(VcError::InvalidConfiguration(format!(
            "heatmapSize {} exceeds the maximum of {}",
            size, MAX_HEATMAP_SIZE
        ))),
        size => Ok(size),
    }
}

/// Builder for VcObserverConfig
#[derive(Debug, Clone, Default)]
pub struct VcObserverConfigBuilder {
    heatmap_size: Option<usize>,
    debug: Option<bool>,
    selector_config: Option<SelectorConfig>,
}

impl VcObserverConfigBuilder {
    /// Set the heatmap side length (0 keeps the default)
    pub fn heatmap_size(mut self, size: usize) -> Self {
        self.heatmap_size = Some(size);
        self
    }

    /// Enable or disable debug mode
    pub fn debug(mut self, enabled: bool) -> Self {
        self.debug = Some(enabled);
        self
    }

    /// Set the label signal selection
    pub fn selector_config(mut self, selector_config: SelectorConfig) -> Self {
        self.selector_config = Some(selector_config);
        self
    }

    /// Build the VcObserverConfig
    ///
    /// Uses default values for any options not explicitly set. A heatmap size
    /// above [`MAX_HEATMAP_SIZE`] is capped; use
    /// [`VcObserverConfigBuilder::try_build`] to reject it instead.
    pub fn build(self) -> VcObserverConfig {
        let options = self.into_options();
        let heatmap_size = checked_heatmap_size(options.heatmap_size).unwrap_or_else(|err| {
            warn!("{}, using {}", err, MAX_HEATMAP_SIZE);
            MAX_HEATMAP_SIZE
        });

        VcObserverConfig {
            heatmap_size,
            debug: options.debug,
            selector_config: options.selector_config,
        }
    }

    /// Build the VcObserverConfig, rejecting an oversized heatmap
    pub fn try_build(self) -> Result<VcObserverConfig> {
        VcObserverConfig::try_from(self.into_options())
    }

    fn into_options(self) -> ConfigOptions {
        let default = ConfigOptions::default();
        ConfigOptions {
            heatmap_size: self.heatmap_size.unwrap_or(default.heatmap_size),
            debug: self.debug.unwrap_or(default.debug),
            selector_config: self.selector_config.unwrap_or(default.selector_config),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_default_config() {
        let config = VcObserverConfig::default();

        assert_eq!(config.heatmap_size(), 200);
        assert!(!config.debug());
        assert_eq!(config.selector_config(), SelectorConfig::default());
        assert!(config.selector_config().class_name);
        assert!(config.selector_config().data_vc);
        assert!(!config.selector_config().id);
    }

    #[test]
    fn test_builder_all_options() {
        let selectors = SelectorConfig {
            id: true,
            test_id: true,
            role: true,
            class_name: false,
            data_vc: false,
        };
        let config = VcObserverConfig::builder()
            .heatmap_size(50)
            .debug(true)
            .selector_config(selectors)
            .build();

        assert_eq!(config.heatmap_size(), 50);
        assert!(config.debug());
        assert_eq!(config.selector_config(), selectors);
    }

    #[test]
    fn test_zero_heatmap_size_falls_back() {
        let config = VcObserverConfig::builder().heatmap_size(0).build();
        assert_eq!(config.heatmap_size(), DEFAULT_HEATMAP_SIZE);
    }

    #[test]
    fn test_from_json_partial_selector_config() {
        let config = VcObserverConfig::from_json(json!({
            "heatmapSize": 10,
            "selectorConfig": { "id": true, "dataVC": false }
        }))
        .unwrap();

        assert_eq!(config.heatmap_size(), 10);
        assert!(!config.debug());
        let selectors = config.selector_config();
        assert!(selectors.id);
        assert!(!selectors.data_vc);
        // Unspecified keys keep their defaults
        assert!(selectors.class_name);
        assert!(!selectors.role);
    }

    #[test]
    fn test_from_json_rejects_malformed() {
        let result = VcObserverConfig::from_json(json!({ "heatmapSize": "large" }));
        assert!(matches!(result, Err(vc_types::VcError::Serialization(_))));
    }

    #[test]
    fn test_from_json_null_and_non_object() {
        assert_eq!(
            VcObserverConfig::from_json(Value::Null).unwrap(),
            VcObserverConfig::default()
        );
        let result = VcObserverConfig::from_json(json!([200]));
        assert!(matches!(result, Err(VcError::InvalidConfiguration(_))));
    }

    #[test]
    fn test_oversized_heatmap_rejected() {
        let result = VcObserverConfig::from_json(json!({ "heatmapSize": 4294967296u64 }));
        assert!(matches!(result, Err(VcError::InvalidConfiguration(_))));

        let result = VcObserverConfig::from_json(json!({ "heatmapSize": MAX_HEATMAP_SIZE + 1 }));
        assert!(matches!(result, Err(VcError::InvalidConfiguration(_))));

        let config = VcObserverConfig::from_json(json!({ "heatmapSize": MAX_HEATMAP_SIZE })).unwrap();
        assert_eq!(config.heatmap_size(), MAX_HEATMAP_SIZE);
    }

    #[test]
    fn test_deserialize_validates_heatmap_size() {
        let result = serde_json::from_value::<VcObserverConfig>(json!({ "heatmapSize": 100000 }));
        assert!(result.is_err());

        let config: VcObserverConfig = serde_json::from_value(json!({ "heatmapSize": 0 })).unwrap();
        assert_eq!(config.heatmap_size(), DEFAULT_HEATMAP_SIZE);
    }

    #[test]
    fn test_builder_oversized_heatmap() {
        let result = VcObserverConfig::builder().heatmap_size(100_000).try_build();
        assert!(matches!(result, Err(VcError::InvalidConfiguration(_))));

        let config = VcObserverConfig::builder().heatmap_size(100_000).build();
        assert_eq!(config.heatmap_size(), MAX_HEATMAP_SIZE);

        let config = VcObserverConfig::builder().heatmap_size(0).try_build().unwrap();
        assert_eq!(config.heatmap_size(), DEFAULT_HEATMAP_SIZE);
    }

    #[test]
    fn test_config_serde_round_trip() {
        let config = VcObserverConfig::builder().heatmap_size(64).debug(true).build();
        let value = serde_json::to_value(&config).unwrap();
        assert_eq!(value["heatmapSize"], json!(64));
        let back: VcObserverConfig = serde_json::from_value(value).unwrap();
        assert_eq!(back, config);
    }

    #[test]
    fn test_from_json_empty_object() {
        let config = VcObserverConfig::from_json(json!({})).unwrap();
        assert_eq!(config, VcObserverConfig::default());
    }
}

//! Method parameter shapes

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use vc_types::ProtocolError;

/// `enable` parameters
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnableParams {
    /// Observer options (`heatmapSize`, `debug`, `selectorConfig`)
    pub options: Option<Value>,
}

/// `start` parameters
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartParams {
    /// Session start on the host clock; defaults to now
    pub start_time: Option<f64>,
}

/// `getResult` parameters
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetResultParams {
    /// Report key namespace
    pub prefix: Option<String>,
}

/// Deserialize method parameters; absent or `null` params take defaults
pub fn parse_params<T: DeserializeOwned + Default>(
    params: Option<Value>,
) -> Result<T, ProtocolError> {
    match params {
        None | Some(Value::Null) => Ok(T::default()),
        Some(value) => {
            serde_json::from_value(value).map_err(|e| ProtocolError::invalid_params(e.to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_absent_params_default() {
        let params: StartParams = parse_params(None).unwrap();
        assert_eq!(params.start_time, None);

        let params: GetResultParams = parse_params(Some(Value::Null)).unwrap();
        assert_eq!(params.prefix, None);
    }

    #[test]
    fn test_camel_case_keys() {
        let params: StartParams = parse_params(Some(json!({"startTime": 12.5}))).unwrap();
        assert_eq!(params.start_time, Some(12.5));
    }

    #[test]
    fn test_wrong_type_is_invalid_params() {
        let err = parse_params::<GetResultParams>(Some(json!({"prefix": 3}))).unwrap_err();
        assert_eq!(err.code, -32602);
    }
}

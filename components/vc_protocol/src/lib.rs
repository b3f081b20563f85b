//! Message routing and domain registry
//!
//! Routes JSON method calls of the form `{"id", "method": "Domain.method", "params"}`
//! to registered domain handlers and serializes their replies.

mod message;

use async_trait::async_trait;
use dashmap::DashMap;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, error, warn};
use vc_types::ProtocolError;

pub use message::{ProtocolRequest, ProtocolResponse};

/// Trait that all domain handlers must implement
///
/// Each handler processes the methods of one domain, e.g. `VisualCompleteness`.
#[async_trait]
pub trait DomainHandler: Send + Sync {
    /// Returns the name of this domain
    fn name(&self) -> &str;

    /// Handle a method call for this domain
    ///
    /// # Arguments
    /// * `method` - The method name without domain prefix, e.g. "getResult"
    /// * `params` - Optional parameters for the method
    async fn handle_method(
        &self,
        method: &str,
        params: Option<Value>,
    ) -> Result<Value, ProtocolError>;
}

/// Routes protocol messages to domain handlers
pub struct ProtocolHandler {
    /// Registry of domain handlers, keyed by domain name
    domains: Arc<DashMap<String, Arc<dyn DomainHandler>>>,
}

impl ProtocolHandler {
    /// Create a handler with no domains
    ///
    /// # Example
    /// ```
    /// use vc_protocol::ProtocolHandler;
    ///
    /// let handler = ProtocolHandler::new();
    /// assert!(handler.domain_names().is_empty());
    /// ```
    pub fn new() -> Self {
        Self {
            domains: Arc::new(DashMap::new()),
        }
    }

    /// Register a domain handler, replacing any handler of the same name
    pub fn register_domain(&self, handler: Arc<dyn DomainHandler>) {
        let name = handler.name().to_string();
        debug!("Registering domain handler: {}", name);
        self.domains.insert(name, handler);
    }

    /// Unregister a domain handler
    ///
    /// # Returns
    /// The removed handler, if it existed
    pub fn unregister_domain(&self, domain_name: &str) -> Option<Arc<dyn DomainHandler>> {
        debug!("Unregistering domain handler: {}", domain_name);
        self.domains.remove(domain_name).map(|(_, v)| v)
    }

    /// Names of registered domains, sorted
    pub fn domain_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.domains.iter().map(|e| e.key().clone()).collect();
        names.sort();
        names
    }

    /// Handle an incoming message and return the JSON response
    ///
    /// # Example
    /// ```ignore
    /// let response = handler
    ///     .handle_message(r#"{"id": 1, "method": "VisualCompleteness.enable"}"#)
    ///     .await;
    /// ```
    pub async fn handle_message(&self, message: &str) -> String {
        let request = match self.parse_request(message) {
            Ok(req) => req,
            Err(error) => return self.serialize(ProtocolResponse::failure(0, error)),
        };

        let response = self.handle_request(&request).await;
        self.serialize(response)
    }

    /// Route an already parsed request
    pub async fn handle_request(&self, request: &ProtocolRequest) -> ProtocolResponse {
        match self.route_request(request).await {
            Ok(result) => ProtocolResponse::success(request.id, result),
            Err(error) => ProtocolResponse::failure(request.id, error),
        }
    }

    fn parse_request(&self, message: &str) -> Result<ProtocolRequest, ProtocolError> {
        // Distinguish malformed JSON from well-formed JSON of the wrong shape
        let _json_check: Value = serde_json::from_str(message).map_err(|e| {
            error!("Invalid JSON: {}", e);
            ProtocolError::parse_error()
        })?;

        serde_json::from_str::<ProtocolRequest>(message).map_err(|e| {
            error!("Invalid request structure: {}", e);
            ProtocolError::invalid_request()
        })
    }

    async fn route_request(&self, request: &ProtocolRequest) -> Result<Value, ProtocolError> {
        if request.method.is_empty() {
            warn!("Request missing method field");
            return Err(ProtocolError::invalid_request());
        }

        let (domain_name, method_name) = parse_method(&request.method)?;

        debug!(
            "Routing request {} to domain: {}, method: {}",
            request.id, domain_name, method_name
        );

        let handler = self
            .domains
            .get(domain_name)
            .ok_or_else(|| {
                warn!("Domain not found: {}", domain_name);
                ProtocolError::method_not_found(&request.method)
            })?
            .clone();

        handler
            .handle_method(method_name, request.params.clone())
            .await
    }

    fn serialize(&self, response: ProtocolResponse) -> String {
        let id = response.id;
        serde_json::to_string(&response).unwrap_or_else(|e| {
            error!("Failed to serialize response: {}", e);
            format!(
                r#"{{"id":{},"error":{{"code":-32603,"message":"Internal error"}}}}"#,
                id
            )
        })
    }
}

impl Default for ProtocolHandler {
    fn default() -> Self {
        Self::new()
    }
}

/// Split "Domain.method" into its two parts
fn parse_method(method: &str) -> Result<(&str, &str), ProtocolError> {
    match method.split_once('.') {
        Some((domain, name)) if !domain.is_empty() && !name.is_empty() => Ok((domain, name)),
        _ => {
            warn!("Invalid method format (expected Domain.method): {}", method);
            Err(ProtocolError::invalid_request())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct TestDomainHandler {
        name: String,
    }

    impl TestDomainHandler {
        fn new(name: &str) -> Self {
            Self {
                name: name.to_string(),
            }
        }
    }

    #[async_trait]
    impl DomainHandler for TestDomainHandler {
        fn name(&self) -> &str {
            &self.name
        }

        async fn handle_method(
            &self,
            method: &str,
            params: Option<Value>,
        ) -> Result<Value, ProtocolError> {
            match method {
                "test" => Ok(json!({"success": true})),
                "echo" => Ok(params.unwrap_or(json!(null))),
                _ => Err(ProtocolError::method_not_found(format!(
                    "{}.{}",
                    self.name, method
                ))),
            }
        }
    }

    #[tokio::test]
    async fn test_register_and_unregister_domain() {
        let handler = ProtocolHandler::new();
        handler.register_domain(Arc::new(TestDomainHandler::new("Test")));
        assert_eq!(handler.domain_names(), vec!["Test".to_string()]);

        let removed = handler.unregister_domain("Test");
        assert!(removed.is_some());
        assert!(handler.domain_names().is_empty());
        assert!(handler.unregister_domain("Test").is_none());
    }

    #[test]
    fn test_parse_method() {
        assert_eq!(
            parse_method("VisualCompleteness.getResult").unwrap(),
            ("VisualCompleteness", "getResult")
        );
        assert!(parse_method("NoDot").is_err());
        assert!(parse_method(".start").is_err());
        assert!(parse_method("Domain.").is_err());
    }

    #[tokio::test]
    async fn test_handle_message_success() {
        let handler = ProtocolHandler::new();
        handler.register_domain(Arc::new(TestDomainHandler::new("Test")));

        let request = json!({"id": 1, "method": "Test.test"});
        let response = handler.handle_message(&request.to_string()).await;
        let response_json: Value = serde_json::from_str(&response).unwrap();

        assert_eq!(response_json["id"], 1);
        assert_eq!(response_json["result"]["success"], true);
        assert!(response_json.get("error").is_none());
    }

    #[tokio::test]
    async fn test_handle_message_with_params() {
        let handler = ProtocolHandler::new();
        handler.register_domain(Arc::new(TestDomainHandler::new("Test")));

        let request = json!({"id": 2, "method": "Test.echo", "params": {"prefix": "ufo"}});
        let response = handler.handle_message(&request.to_string()).await;
        let response_json: Value = serde_json::from_str(&response).unwrap();

        assert_eq!(response_json["id"], 2);
        assert_eq!(response_json["result"]["prefix"], "ufo");
    }

    #[tokio::test]
    async fn test_handle_message_unknown_domain() {
        let handler = ProtocolHandler::new();

        let request = json!({"id": 3, "method": "Unknown.method"});
        let response = handler.handle_message(&request.to_string()).await;
        let response_json: Value = serde_json::from_str(&response).unwrap();

        assert_eq!(response_json["id"], 3);
        assert_eq!(response_json["error"]["code"], -32601);
        assert_eq!(response_json["error"]["data"]["method"], "Unknown.method");
    }

    #[tokio::test]
    async fn test_handle_message_parse_error() {
        let handler = ProtocolHandler::new();

        let response = handler.handle_message("invalid json {{{").await;
        let response_json: Value = serde_json::from_str(&response).unwrap();

        assert_eq!(response_json["id"], 0);
        assert_eq!(response_json["error"]["code"], -32700);
    }

    #[tokio::test]
    async fn test_handle_message_wrong_shape() {
        let handler = ProtocolHandler::new();

        let response = handler.handle_message(r#"{"method": "Test.test"}"#).await;
        let response_json: Value = serde_json::from_str(&response).unwrap();

        assert_eq!(response_json["error"]["code"], -32600);
    }

    #[tokio::test]
    async fn test_handle_message_invalid_method_format() {
        let handler = ProtocolHandler::new();

        let request = json!({"id": 4, "method": "InvalidMethodFormat"});
        let response = handler.handle_message(&request.to_string()).await;
        let response_json: Value = serde_json::from_str(&response).unwrap();

        assert_eq!(response_json["id"], 4);
        assert_eq!(response_json["error"]["code"], -32600);
    }
}

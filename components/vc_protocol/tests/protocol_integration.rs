//! Integration tests for vc_protocol
//!
//! These verify routing through the public API with a counting domain.

use async_trait::async_trait;
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use vc_protocol::{DomainHandler, ProtocolHandler, ProtocolRequest, ProtocolResponse};
use vc_types::ProtocolError;

#[derive(Default)]
struct CountingDomain {
    calls: AtomicUsize,
}

#[async_trait]
impl DomainHandler for CountingDomain {
    fn name(&self) -> &str {
        "Counter"
    }

    async fn handle_method(
        &self,
        method: &str,
        _params: Option<Value>,
    ) -> Result<Value, ProtocolError> {
        match method {
            "increment" => {
                let previous = self.calls.fetch_add(1, Ordering::SeqCst);
                Ok(json!({ "count": previous + 1 }))
            }
            _ => Err(ProtocolError::method_not_found(format!("Counter.{}", method))),
        }
    }
}

#[tokio::test]
async fn test_handle_request_round_trip() {
    let handler = ProtocolHandler::new();
    handler.register_domain(Arc::new(CountingDomain::default()));

    let response = handler
        .handle_request(&ProtocolRequest {
            id: 9,
            method: "Counter.increment".to_string(),
            params: None,
        })
        .await;

    assert_eq!(response, ProtocolResponse::success(9, json!({ "count": 1 })));
}

#[tokio::test]
async fn test_domain_level_method_not_found() {
    let handler = ProtocolHandler::new();
    handler.register_domain(Arc::new(CountingDomain::default()));

    let response = handler
        .handle_message(r#"{"id": 5, "method": "Counter.decrement"}"#)
        .await;
    let response_json: Value = serde_json::from_str(&response).unwrap();

    assert_eq!(response_json["id"], 5);
    assert_eq!(response_json["error"]["code"], -32601);
    assert_eq!(response_json["error"]["data"]["method"], "Counter.decrement");
}

#[tokio::test]
async fn test_concurrent_messages() {
    let handler = Arc::new(ProtocolHandler::new());
    let domain = Arc::new(CountingDomain::default());
    handler.register_domain(domain.clone());

    let tasks: Vec<_> = (0..16u64)
        .map(|id| {
            let handler = handler.clone();
            tokio::spawn(async move {
                let message = json!({ "id": id, "method": "Counter.increment" }).to_string();
                handler.handle_message(&message).await
            })
        })
        .collect();

    for task in tasks {
        let response: Value = serde_json::from_str(&task.await.unwrap()).unwrap();
        assert!(response["result"]["count"].is_u64());
    }
    assert_eq!(domain.calls.load(Ordering::SeqCst), 16);
}

//! Integration tests for mcd-core

use async_trait::async_trait;
use mcd_core::*;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

struct Counting {
    seen: AtomicUsize,
}

#[async_trait]
impl RequestHook for Counting {
    async fn on_request(&self, _request: &HttpRequest) -> Dispatch {
        self.seen.fetch_add(1, Ordering::SeqCst);
        Dispatch::Continue
    }
}

struct ClaimQuery;

#[async_trait]
impl RequestHook for ClaimQuery {
    async fn on_request(&self, request: &HttpRequest) -> Dispatch {
        match request.query("mcd") {
            Some(flag) if flag == "report" => Dispatch::Terminate(HttpResponse::ok()),
            _ => Dispatch::Continue,
        }
    }
}

#[tokio::test]
async fn test_hooks_run_in_order_until_claimed() {
    let first = Arc::new(Counting {
        seen: AtomicUsize::new(0),
    });
    let last = Arc::new(Counting {
        seen: AtomicUsize::new(0),
    });

    let server = Server::new()
        .hook(first.clone())
        .hook(Arc::new(ClaimQuery))
        .hook(last.clone());

    let claimed = server
        .dispatch(HttpRequest::from_target("POST", "/?mcd=report"))
        .await;
    assert_eq!(claimed.status, 200);

    let passed = server.dispatch(HttpRequest::from_target("GET", "/")).await;
    assert_eq!(passed.status, 404);

    assert_eq!(first.seen.load(Ordering::SeqCst), 2);
    assert_eq!(last.seen.load(Ordering::SeqCst), 1);
}

#[test]
fn test_parse_query_last_duplicate_wins() {
    let params = parse_query("a=1&a=2&b=x%20y");
    assert_eq!(params.get("a"), Some(&"2".to_string()));
    assert_eq!(params.get("b"), Some(&"x y".to_string()));
}

#[test]
fn test_json_response() {
    let response = HttpResponse::ok()
        .with_json(&serde_json::json!({"stored": true}))
        .unwrap();
    assert_eq!(
        response.headers.get("Content-Type"),
        Some(&"application/json".to_string())
    );
    assert_eq!(response.body, br#"{"stored":true}"#.to_vec());
}

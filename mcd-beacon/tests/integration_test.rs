//! Integration tests for mcd-beacon

use async_trait::async_trait;
use mcd_beacon::*;
use mcd_core::{Dispatch, HttpRequest};
use mcd_nonce::{NonceConfig, NonceService, SessionAuthenticator, UserId};
use mcd_policy::{CspPolicy, PolicySource, beacon_report_uri};
use serde_json::json;
use std::sync::Arc;

const SITE: &str = "https://example.com";
const SESSION: &str = "s3ss10n";
const USER: UserId = UserId(42);

fn policy() -> CspPolicy {
    CspPolicy::new()
        .default_src(vec!["'self'".to_string()])
        .script_src(vec!["'self'".to_string(), "https://cdn.example.com".to_string()])
        .img_src(vec!["'self'".to_string(), "data:".to_string()])
        .report_only(true)
}

struct Fixture {
    handler: ReportHandler,
    nonces: Arc<NonceService>,
    store: Arc<MemoryStore>,
}

impl Fixture {
    fn new() -> Self {
        let store = Arc::new(MemoryStore::new());
        Self::with_store(store.clone(), store)
    }

    fn with_store(store: Arc<MemoryStore>, backend: Arc<dyn ReportStore>) -> Self {
        let nonces = Arc::new(NonceService::new(&NonceConfig::default()).unwrap());
        let auth = SessionAuthenticator::from_sessions([(SESSION, USER)]);

        let handler = ReportHandler::new(
            BeaconConfig::new(SITE),
            Arc::new(auth),
            nonces.clone(),
            Arc::new(policy()),
            backend,
        );

        Self {
            handler,
            nonces,
            store,
        }
    }

    fn nonce(&self) -> String {
        self.nonces.create_nonce(NONCE_ACTION, USER)
    }

    fn request(&self, report: serde_json::Value) -> HttpRequest {
        beacon_request(&self.nonce(), report.to_string().into_bytes())
    }

    async fn post(&self, report: serde_json::Value) -> ReportRecord {
        let dispatch = self.handler.handle_report_uri(&self.request(report)).await;
        assert!(matches!(dispatch, Dispatch::Terminate(_)));

        let records = self.store.records().await;
        assert_eq!(records.len(), 1);
        records.into_iter().next().unwrap()
    }
}

fn beacon_request(nonce: &str, body: Vec<u8>) -> HttpRequest {
    HttpRequest::from_target("POST", &format!("/?mcd=report&nonce={}", nonce))
        .with_header("cookie", format!("mcd_session={}", SESSION))
        .with_header("content-type", "application/csp-report")
        .with_body(body)
}

fn report(fields: serde_json::Value) -> serde_json::Value {
    json!({ "csp-report": fields })
}

#[tokio::test]
async fn test_full_report_is_stored() {
    let fixture = Fixture::new();
    let full_policy = policy().get_full_policy(Some(&beacon_report_uri(SITE, &fixture.nonce())));

    let record = fixture
        .post(report(json!({
            "blocked-uri": "http://evil.example/x",
            "document-uri": "https://example.com/page",
            "referrer": "https://search.example/?q=a&b",
            "original-policy": full_policy,
            "status-code": 200,
            "violated-directive": "script-src 'self' https://cdn.example.com",
        })))
        .await;

    assert_eq!(record.post_type, POST_TYPE);
    assert_eq!(record.status, PostStatus::Publish);
    assert_eq!(record.title, "http://evil.example/x");
    assert!(record.meta("blocked-uri").is_none());
    assert_eq!(
        record.meta("document-uri"),
        Some(&FieldValue::from("https://example.com/page"))
    );
    assert_eq!(
        record.meta("referrer"),
        Some(&FieldValue::from("https://search.example/?q=a&#038;b"))
    );
    assert_eq!(record.meta("original-policy"), Some(&FieldValue::from(full_policy)));
    assert_eq!(record.meta("status-code"), Some(&FieldValue::Integer(200)));
    assert_eq!(
        record.meta("violated-directive"),
        Some(&FieldValue::from("script-src 'self' https://cdn.example.com"))
    );
}

#[tokio::test]
async fn test_unauthenticated_request_is_ignored() {
    let fixture = Fixture::new();
    let mut request = fixture.request(report(json!({ "blocked-uri": "data" })));
    request.headers.remove("cookie");

    assert_eq!(fixture.handler.handle_report_uri(&request).await, Dispatch::Continue);
    assert!(fixture.store.records().await.is_empty());
}

#[tokio::test]
async fn test_unknown_session_is_ignored() {
    let fixture = Fixture::new();
    let request = fixture
        .request(report(json!({ "blocked-uri": "data" })))
        .with_header("cookie", "mcd_session=stolen");

    assert_eq!(fixture.handler.handle_report_uri(&request).await, Dispatch::Continue);
    assert!(fixture.store.records().await.is_empty());
}

#[tokio::test]
async fn test_missing_or_wrong_beacon_flag_is_ignored() {
    let fixture = Fixture::new();
    let body = report(json!({ "blocked-uri": "data" })).to_string();

    for target in [
        format!("/?nonce={}", fixture.nonce()),
        format!("/?mcd=reports&nonce={}", fixture.nonce()),
        format!("/?mcd=REPORT&nonce={}", fixture.nonce()),
    ] {
        let request = HttpRequest::from_target("POST", &target)
            .with_header("cookie", format!("mcd_session={}", SESSION))
            .with_body(body.clone().into_bytes());
        assert_eq!(fixture.handler.handle_report_uri(&request).await, Dispatch::Continue);
    }

    assert!(fixture.store.records().await.is_empty());
}

#[tokio::test]
async fn test_invalid_nonce_is_ignored() {
    let fixture = Fixture::new();
    let body = report(json!({ "blocked-uri": "data" })).to_string().into_bytes();

    let other_user = fixture.nonces.create_nonce(NONCE_ACTION, UserId(7));
    let other_action = fixture.nonces.create_nonce("delete-post", USER);

    for nonce in ["", "bogus", other_user.as_str(), other_action.as_str()] {
        let request = beacon_request(nonce, body.clone());
        assert_eq!(fixture.handler.handle_report_uri(&request).await, Dispatch::Continue);
    }

    let request = HttpRequest::from_target("POST", "/?mcd=report")
        .with_header("cookie", format!("mcd_session={}", SESSION))
        .with_body(body);
    assert_eq!(fixture.handler.handle_report_uri(&request).await, Dispatch::Continue);

    assert!(fixture.store.records().await.is_empty());
}

#[tokio::test]
async fn test_bad_bodies_are_ignored() {
    let fixture = Fixture::new();

    for body in [
        b"".to_vec(),
        b"{not json".to_vec(),
        json!({ "report": { "blocked-uri": "data" } }).to_string().into_bytes(),
        json!({ "csp-report": "data" }).to_string().into_bytes(),
    ] {
        let request = beacon_request(&fixture.nonce(), body);
        assert_eq!(fixture.handler.handle_report_uri(&request).await, Dispatch::Continue);
    }

    assert!(fixture.store.records().await.is_empty());
}

#[tokio::test]
async fn test_data_blocked_uri_title() {
    let record = Fixture::new()
        .post(report(json!({ "blocked-uri": " data " })))
        .await;
    assert_eq!(record.title, "data");
}

#[tokio::test]
async fn test_blank_blocked_uri_uses_site_url() {
    for blocked in ["", "   "] {
        let record = Fixture::new()
            .post(report(json!({ "blocked-uri": blocked })))
            .await;
        assert_eq!(record.title, SITE);
    }
}

#[tokio::test]
async fn test_missing_blocked_uri_uses_site_url() {
    let record = Fixture::new()
        .post(report(json!({ "status-code": 0 })))
        .await;
    assert_eq!(record.title, SITE);
    assert_eq!(record.meta("status-code"), Some(&FieldValue::Integer(0)));
}

#[tokio::test]
async fn test_unsafe_blocked_uri_is_escaped() {
    let record = Fixture::new()
        .post(report(json!({ "blocked-uri": "javascript:alert(1)" })))
        .await;
    assert_eq!(record.title, "");
}

#[tokio::test]
async fn test_entity_encoded_script_urls_are_dropped() {
    let record = Fixture::new()
        .post(report(json!({
            "blocked-uri": "&#106;avascript:alert(1)",
            "document-uri": "jav&#x61;script:alert(document.domain)",
            "referrer": "java&#9;script:alert(1)",
        })))
        .await;

    assert_eq!(record.title, "");
    assert_eq!(record.meta("document-uri"), Some(&FieldValue::from("")));
    assert_eq!(record.meta("referrer"), Some(&FieldValue::from("")));
    assert_eq!(render_column("document-uri", &record), NOT_AVAILABLE);
}

#[tokio::test]
async fn test_mismatched_policy_and_directive_are_blanked() {
    let record = Fixture::new()
        .post(report(json!({
            "original-policy": "default-src *",
            "violated-directive": "script-src *",
        })))
        .await;

    assert_eq!(record.meta("original-policy"), Some(&FieldValue::from("")));
    assert_eq!(record.meta("violated-directive"), Some(&FieldValue::from("")));
}

#[tokio::test]
async fn test_policy_signed_for_another_nonce_is_blanked() {
    let fixture = Fixture::new();
    let stale = policy().get_full_policy(Some(&beacon_report_uri(SITE, "older")));

    let record = fixture
        .post(report(json!({ "original-policy": stale })))
        .await;
    assert_eq!(record.meta("original-policy"), Some(&FieldValue::from("")));
}

#[tokio::test]
async fn test_non_whitelisted_fields_are_not_stored() {
    let record = Fixture::new()
        .post(report(json!({
            "blocked-uri": "data",
            "script-sample": "alert(1)",
            "effective-directive": "img-src",
            "Document-URI": "https://example.com/",
        })))
        .await;

    assert!(record.meta.is_empty());
}

#[tokio::test]
async fn test_status_code_coercion() {
    for (input, expected) in [
        (json!("-5"), 0),
        (json!("abc"), 0),
        (json!(-5), 0),
        (json!("404"), 404),
    ] {
        let record = Fixture::new()
            .post(report(json!({ "status-code": input })))
            .await;
        assert_eq!(record.meta("status-code"), Some(&FieldValue::Integer(expected)));
    }
}

#[tokio::test]
async fn test_server_dispatch_with_handler_hook() {
    let fixture = Fixture::new();
    let server = mcd_core::Server::new().hook(Arc::new(fixture.handler.clone()));

    let response = server
        .dispatch(fixture.request(report(json!({ "blocked-uri": "data" }))))
        .await;
    assert_eq!(response.status, 204);
    assert!(response.body.is_empty());

    let response = server.dispatch(HttpRequest::new("GET", "/")).await;
    assert_eq!(response.status, 404);
    assert_eq!(fixture.store.records().await.len(), 1);
}

struct BrokenStore;

#[async_trait]
impl ReportStore for BrokenStore {
    async fn insert_report(&self, _report: NewReport) -> mcd_beacon::Result<RecordId> {
        Err(StoreError::Io(std::io::Error::other("disk full")))
    }

    async fn update_meta(
        &self,
        id: RecordId,
        _key: &str,
        _value: FieldValue,
    ) -> mcd_beacon::Result<()> {
        Err(StoreError::NotFound(id))
    }

    async fn get_report(&self, _id: RecordId) -> mcd_beacon::Result<Option<ReportRecord>> {
        Ok(None)
    }

    async fn list_reports(&self, _limit: usize) -> mcd_beacon::Result<Vec<ReportRecord>> {
        Ok(Vec::new())
    }

    async fn count(&self) -> mcd_beacon::Result<usize> {
        Ok(0)
    }
}

#[tokio::test]
async fn test_storage_failure_still_ends_request() {
    let fixture = Fixture::with_store(Arc::new(MemoryStore::new()), Arc::new(BrokenStore));
    let dispatch = fixture
        .handler
        .handle_report_uri(&fixture.request(report(json!({ "blocked-uri": "data" }))))
        .await;

    assert!(matches!(dispatch, Dispatch::Terminate(r) if r.status == 204));
}

#[tokio::test]
async fn test_file_store_replays_reports() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("reports.jsonl");

    {
        let store = Arc::new(FileStore::open(&path).await.unwrap());
        let fixture = Fixture::with_store(Arc::new(MemoryStore::new()), store.clone());
        fixture
            .handler
            .handle_report_uri(&fixture.request(report(json!({
                "blocked-uri": "https://tracker.example/p.gif",
                "status-code": 200,
            }))))
            .await;
        assert_eq!(store.count().await.unwrap(), 1);
    }

    let reopened = FileStore::open(&path).await.unwrap();
    let records = reopened.list_reports(10).await.unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].title, "https://tracker.example/p.gif");
    assert_eq!(records[0].meta("status-code"), Some(&FieldValue::Integer(200)));

    let next = reopened.insert_report(NewReport::published("data")).await.unwrap();
    assert_eq!(next, RecordId(2));
}

#[tokio::test]
async fn test_file_store_reports_corrupt_line() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("reports.jsonl");
    std::fs::write(&path, "{\"op\":\"insert\"}\n").unwrap();

    let err = FileStore::open(&path).await.unwrap_err();
    assert!(matches!(err, StoreError::Corrupt { line: 1, .. }));
}

#[tokio::test]
async fn test_list_view_from_stored_reports() {
    let fixture = Fixture::new();
    fixture
        .post(report(json!({
            "blocked-uri": "https://cdn.evil.example/a.js",
            "document-uri": "https://example.com/",
            "violated-directive": "<b>img-src 'self' data:</b>",
        })))
        .await;

    let records = fixture.store.list_reports(20).await.unwrap();
    let view = ReportListView::new(&ReportHandler::report_type(), &records);
    let cells = &view.rows[0].cells;

    let cell = |key: &str| {
        let index = view.columns.iter().position(|c| c.key == key).unwrap();
        cells[index].clone()
    };

    assert_eq!(cell("blocked-uri"), "https://cdn.evil.example/a.js");
    assert_eq!(cell("document-uri"), "https://example.com/");
    assert_eq!(cell("referrer"), NOT_AVAILABLE);
    // directive with markup does not match the policy, so it was blanked
    assert_eq!(cell("violated-directive"), NOT_AVAILABLE);
    assert_eq!(cell("original-policy"), NOT_AVAILABLE);
}

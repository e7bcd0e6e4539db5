//! # MCD Beacon
//!
//! Receives Content-Security-Policy violation reports posted by browsers to
//! the beacon URL, keeps only whitelisted and sanitized fields, and stores
//! each report as a `csp-report` record with its fields as metadata.
//!
//! A request is handled only when a user is logged in, the query carries
//! `mcd=report` and the `nonce` verifies for that user. Anything else passes
//! through to the rest of the server.
//!
//! ```rust
//! use mcd_beacon::{BeaconConfig, MemoryStore, ReportHandler};
//! use mcd_core::{Dispatch, HttpRequest};
//! use mcd_nonce::{NonceConfig, NonceService, SessionAuthenticator, UserId};
//! use mcd_policy::CspPolicy;
//! use std::sync::Arc;
//!
//! # tokio_test::block_on(async {
//! let nonces = Arc::new(NonceService::new(&NonceConfig::default()).unwrap());
//! let nonce = nonces.create_nonce("mcd-report-uri", UserId(1));
//! let store = Arc::new(MemoryStore::new());
//!
//! let handler = ReportHandler::new(
//!     BeaconConfig::new("https://example.com"),
//!     Arc::new(SessionAuthenticator::from_sessions([("s3ss10n", UserId(1))])),
//!     nonces,
//!     Arc::new(CspPolicy::new().default_src(vec!["'self'".to_string()])),
//!     store.clone(),
//! );
//!
//! let request = HttpRequest::from_target("POST", &format!("/?mcd=report&nonce={}", nonce))
//!     .with_header("cookie", "mcd_session=s3ss10n")
//!     .with_body(br#"{"csp-report":{"blocked-uri":"data"}}"#.to_vec());
//!
//! assert!(matches!(handler.handle_report_uri(&request).await, Dispatch::Terminate(_)));
//! assert_eq!(store.records().await[0].title, "data");
//! # });
//! ```

pub mod columns;
pub mod error;
pub mod escape;
pub mod fields;
pub mod handler;
pub mod post_type;
pub mod report;
pub mod store;

pub use columns::{Column, NOT_AVAILABLE, ReportListView, manage_columns, render_column};
pub use error::{BeaconError, Result, StoreError};
pub use escape::{esc_html, esc_url, strip_all_tags};
pub use fields::{
    FieldRule, SanitizeContext, Sanitizer, WHITELISTED_FIELDS, absint, sanitize_blocked_uri,
    sanitize_original_policy, sanitize_violated_directive,
};
pub use handler::{BeaconConfig, NONCE_ACTION, ReportHandler};
pub use post_type::{ReportLabels, ReportType};
pub use report::{
    FieldValue, NewReport, POST_TYPE, PostStatus, RecordId, ReportField, ReportRecord,
    SanitizedReport,
};
pub use store::{FileStore, MemoryStore, ReportStore};

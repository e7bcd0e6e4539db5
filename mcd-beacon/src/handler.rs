//! The beacon request handler.

use crate::error::BeaconError;
use crate::fields::{FieldRule, SanitizeContext, WHITELISTED_FIELDS, sanitize_report};
use crate::post_type::ReportType;
use crate::report::{NewReport, RecordId, SanitizedReport};
use crate::store::ReportStore;
use async_trait::async_trait;
use mcd_core::{Dispatch, HttpRequest, HttpResponse, RequestHook};
use mcd_nonce::{Authenticator, NonceVerifier, UserId};
use mcd_policy::{PolicySource, beacon_report_uri};
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Nonce action the beacon URL is signed for.
pub const NONCE_ACTION: &str = "mcd-report-uri";

/// Query parameter marking a beacon request, and its expected value.
pub const BEACON_PARAM: &str = "mcd";
pub const BEACON_VALUE: &str = "report";

pub const NONCE_PARAM: &str = "nonce";

/// Top-level body key holding the violation report.
pub const REPORT_KEY: &str = "csp-report";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BeaconConfig {
    /// Canonical site URL; blank blocked URIs are recorded as this.
    pub site_url: String,
}

impl BeaconConfig {
    pub fn new(site_url: impl Into<String>) -> Self {
        Self {
            site_url: site_url.into(),
        }
    }
}

/// Turns authenticated, nonce-signed CSP report posts into stored records.
///
/// Requests that are not beacon requests pass through untouched.
#[derive(Clone)]
pub struct ReportHandler {
    config: Arc<BeaconConfig>,
    authenticator: Arc<dyn Authenticator>,
    nonces: Arc<dyn NonceVerifier>,
    policy: Arc<dyn PolicySource>,
    store: Arc<dyn ReportStore>,
}

impl ReportHandler {
    pub fn new(
        config: BeaconConfig,
        authenticator: Arc<dyn Authenticator>,
        nonces: Arc<dyn NonceVerifier>,
        policy: Arc<dyn PolicySource>,
        store: Arc<dyn ReportStore>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            authenticator,
            nonces,
            policy,
            store,
        }
    }

    pub fn whitelisted_fields() -> &'static [FieldRule] {
        &WHITELISTED_FIELDS
    }

    pub fn report_type() -> ReportType {
        ReportType::csp_report()
    }

    pub fn config(&self) -> &BeaconConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<dyn ReportStore> {
        &self.store
    }

    /// Handle a request. Returns `Dispatch::Continue` unless the request was
    /// a valid beacon post, in which case the report is stored and an empty
    /// response ends the request.
    pub async fn handle_report_uri(&self, request: &HttpRequest) -> Dispatch {
        let nonce = match self.authorize(request) {
            Ok(nonce) => nonce,
            Err(reason) => {
                debug!(path = %request.path, %reason, "not a beacon request");
                return Dispatch::Continue;
            }
        };

        let report = match parse_report(&request.body) {
            Ok(report) => report,
            Err(reason) => {
                debug!(%reason, "ignoring beacon request");
                return Dispatch::Continue;
            }
        };

        let sanitized = self.sanitize(&report, nonce);

        match self.persist(&sanitized).await {
            Ok(id) => info!(
                id = %id,
                blocked_uri = %sanitized.title,
                fields = sanitized.fields.len(),
                "stored CSP report"
            ),
            Err(err) => warn!(error = %err, "failed to store CSP report"),
        }

        Dispatch::Terminate(HttpResponse::no_content())
    }

    /// Whitelist and sanitize one report. `nonce` is the one the request was
    /// signed with; it is part of the policy the browser echoes back.
    pub fn sanitize(&self, report: &Map<String, Value>, nonce: &str) -> SanitizedReport {
        sanitize_report(report, &self.context(nonce))
    }

    /// Canonical values for a request signed with `nonce`.
    pub fn context(&self, nonce: &str) -> SanitizeContext {
        let report_uri = beacon_report_uri(&self.config.site_url, nonce);

        SanitizeContext {
            site_url: self.config.site_url.clone(),
            full_policy: self.policy.get_full_policy(Some(&report_uri)),
            policies: self.policy.get_policies(),
        }
    }

    /// Create the record, then attach each non-title field as metadata.
    pub async fn persist(&self, report: &SanitizedReport) -> Result<RecordId, BeaconError> {
        let id = self
            .store
            .insert_report(NewReport::published(report.title.clone()))
            .await?;

        if !id.is_valid() {
            return Ok(id);
        }

        for (field, value) in report.meta() {
            self.store
                .update_meta(id, field.as_str(), value.clone())
                .await?;
        }

        Ok(id)
    }

    /// Checks the gate in order: logged-in user, `mcd=report`, then the
    /// nonce for that user. Returns the verified nonce.
    fn authorize<'r>(&self, request: &'r HttpRequest) -> Result<&'r str, BeaconError> {
        let user: UserId = self
            .authenticator
            .current_user(request)
            .ok_or(BeaconError::Unauthenticated)?;

        if request.query(BEACON_PARAM).map(String::as_str) != Some(BEACON_VALUE) {
            return Err(BeaconError::NotBeacon);
        }

        let nonce = request
            .query(NONCE_PARAM)
            .map(String::as_str)
            .ok_or(BeaconError::InvalidNonce)?;

        if !self.nonces.verify_nonce(nonce, NONCE_ACTION, user).is_valid() {
            return Err(BeaconError::InvalidNonce);
        }

        Ok(nonce)
    }
}

#[async_trait]
impl RequestHook for ReportHandler {
    async fn on_request(&self, request: &HttpRequest) -> Dispatch {
        self.handle_report_uri(request).await
    }
}

/// The `csp-report` object from a request body.
fn parse_report(body: &[u8]) -> Result<Map<String, Value>, BeaconError> {
    let mut contents: Value = serde_json::from_slice(body)?;

    match contents.get_mut(REPORT_KEY).map(Value::take) {
        Some(Value::Object(report)) => Ok(report),
        _ => Err(BeaconError::MissingReport),
    }
}

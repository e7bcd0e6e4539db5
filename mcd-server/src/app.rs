//! Wiring from settings to a running beacon.

use crate::error::CliResult;
use mcd_beacon::{
    BeaconConfig, FileStore, MemoryStore, NONCE_ACTION, ReportHandler, ReportStore,
};
use mcd_config::{BeaconSettings, ConfigError};
use mcd_core::logging::{LogConfig, LogFormat, LogTarget};
use mcd_core::{HttpResponse, Server};
use mcd_nonce::{Authenticator, NonceConfig, NonceService, SessionAuthenticator, UserId};
use mcd_policy::{CspPolicy, PolicyError, beacon_report_uri};
use std::sync::Arc;

/// Everything a command needs, built once from settings.
pub struct App {
    pub settings: BeaconSettings,
    pub policy: Arc<CspPolicy>,
    pub nonces: Arc<NonceService>,
    pub sessions: Arc<SessionAuthenticator>,
    pub store: Arc<dyn ReportStore>,
}

impl App {
    pub async fn from_settings(settings: BeaconSettings) -> CliResult<Self> {
        let policy = Arc::new(build_policy(&settings)?);
        let nonces = Arc::new(nonce_service(&settings)?);
        let sessions = Arc::new(SessionAuthenticator::from_sessions(
            settings
                .sessions
                .iter()
                .map(|(token, user)| (token.clone(), UserId(*user))),
        ));
        let store = open_store(&settings).await?;

        Ok(Self {
            settings,
            policy,
            nonces,
            sessions,
            store,
        })
    }

    pub fn handler(&self) -> ReportHandler {
        ReportHandler::new(
            BeaconConfig::new(self.settings.site_url.clone()),
            self.sessions.clone(),
            self.nonces.clone(),
            self.policy.clone(),
            self.store.clone(),
        )
    }

    /// The beacon URL signed for `user`.
    pub fn report_uri(&self, user: UserId) -> String {
        let nonce = self.nonces.create_nonce(NONCE_ACTION, user);
        beacon_report_uri(&self.settings.site_url, &nonce)
    }

    /// Server with the report handler hooked in. Everything else gets a 404
    /// carrying the policy header, signed for the caller when logged in.
    pub fn server(&self) -> Server {
        let policy = self.policy.clone();
        let sessions = self.sessions.clone();
        let nonces = self.nonces.clone();
        let site_url = self.settings.site_url.clone();

        Server::new()
            .hook(Arc::new(self.handler()))
            .fallback(move |request| {
                let report_uri = sessions.current_user(request).map(|user| {
                    beacon_report_uri(&site_url, &nonces.create_nonce(NONCE_ACTION, user))
                });
                let (name, value) = policy.header(report_uri.as_deref());
                HttpResponse::not_found().with_header(name, value)
            })
    }
}

pub fn build_policy(settings: &BeaconSettings) -> Result<CspPolicy, PolicyError> {
    if settings.policy.is_empty() {
        return Err(PolicyError::Empty);
    }

    let policy = settings
        .policy
        .iter()
        .fold(CspPolicy::new(), |policy, directive| {
            policy.directive(directive.name.clone(), directive.sources.clone())
        });

    Ok(policy.report_only(settings.report_only))
}

pub fn nonce_service(settings: &BeaconSettings) -> CliResult<NonceService> {
    let config = NonceConfig::new(settings.nonce_secret.as_bytes().to_vec())?
        .with_lifetime(settings.nonce_lifetime)?;
    Ok(NonceService::new(&config)?)
}

pub async fn open_store(settings: &BeaconSettings) -> CliResult<Arc<dyn ReportStore>> {
    match (settings.store_backend.as_str(), &settings.store_path) {
        ("file", Some(path)) => Ok(Arc::new(FileStore::open(path).await?)),
        _ => Ok(Arc::new(MemoryStore::new())),
    }
}

/// Logs go to stderr so command output on stdout stays clean.
pub fn log_config(settings: &BeaconSettings) -> CliResult<LogConfig> {
    let format: LogFormat = settings
        .log_format
        .parse()
        .map_err(|message: String| ConfigError::invalid("log_format", message))?;

    Ok(LogConfig::new(settings.log_level.clone())
        .format(format)
        .target(LogTarget::Stderr))
}

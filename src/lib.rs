// MCD - Content-Security-Policy report beacon
//
// Receives CSP violation reports from logged-in users' browsers, keeps the
// whitelisted fields after sanitizing them, and stores each report.

// Re-export core functionality
pub use mcd_core::*;

// Re-export optional crates
#[cfg(feature = "config")]
pub use mcd_config;

#[cfg(feature = "nonce")]
pub use mcd_nonce;

#[cfg(feature = "policy")]
pub use mcd_policy;

#[cfg(feature = "beacon")]
pub use mcd_beacon;

// Prelude for common imports
pub mod prelude {
    pub use crate::{Dispatch, Error, HttpRequest, HttpResponse, RequestHook, Server};

    #[cfg(feature = "beacon")]
    pub use mcd_beacon::{
        BeaconConfig, FileStore, MemoryStore, NOT_AVAILABLE, ReportHandler, ReportListView,
        ReportStore,
    };

    #[cfg(feature = "nonce")]
    pub use mcd_nonce::{NonceConfig, NonceService, SessionAuthenticator, UserId};

    #[cfg(feature = "policy")]
    pub use mcd_policy::{CspPolicy, PolicySource, beacon_report_uri};
}

//! # MCD Nonce
//!
//! One-time tokens ("nonces") and session authentication for the MCD beacon.
//!
//! A nonce is bound to an action name and a user, and stays valid for one
//! configured lifetime (two half-lifetime ticks). The beacon embeds one in
//! its report-uri so only pages rendered for a logged-in user can file
//! reports.
//!
//! ```rust
//! use mcd_nonce::{NonceConfig, NonceService, NonceVerifier, UserId};
//!
//! let service = NonceService::new(&NonceConfig::default()).unwrap();
//! let nonce = service.create_nonce("mcd-report-uri", UserId(1));
//!
//! assert!(service.verify_nonce(&nonce, "mcd-report-uri", UserId(1)).is_valid());
//! assert!(!service.verify_nonce(&nonce, "mcd-report-uri", UserId(2)).is_valid());
//! ```

pub mod config;
pub mod error;
pub mod nonce;
pub mod session;

pub use config::{MIN_SECRET_LEN, NonceConfig};
pub use error::{NonceError, Result};
pub use nonce::{NonceService, NonceVerdict, NonceVerifier};
pub use session::{Authenticator, SESSION_COOKIE, SESSION_HEADER, SessionAuthenticator, UserId};

use crate::config::NonceConfig;
use crate::error::{NonceError, Result};
use crate::session::UserId;
use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use chrono::Utc;
use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Bytes of the HMAC kept in a nonce.
const NONCE_BYTES: usize = 12;

/// Result of checking a nonce.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NonceVerdict {
    /// Not issued for this action and user within the last two ticks.
    Invalid,
    /// Issued during the current tick.
    Current,
    /// Issued during the previous tick.
    Previous,
}

impl NonceVerdict {
    pub fn is_valid(&self) -> bool {
        !matches!(self, NonceVerdict::Invalid)
    }
}

/// One-time token verification as seen by request handlers.
pub trait NonceVerifier: Send + Sync {
    fn verify_nonce(&self, nonce: &str, action: &str, user: UserId) -> NonceVerdict;
}

/// Issues and verifies time-limited nonces bound to an action and a user.
///
/// A nonce is the first 12 bytes of `HMAC-SHA256(secret, "{tick}|{action}|{user}")`,
/// base64url-encoded without padding. Ticks are half the configured lifetime,
/// and a nonce verifies during its own tick and the one after it.
#[derive(Clone)]
pub struct NonceService {
    mac: HmacSha256,
    tick_secs: i64,
}

impl NonceService {
    pub fn new(config: &NonceConfig) -> Result<Self> {
        let mac = HmacSha256::new_from_slice(&config.secret)
            .map_err(|e| NonceError::InvalidKey(e.to_string()))?;

        Ok(Self {
            mac,
            tick_secs: config.tick_secs(),
        })
    }

    /// Tick number for a unix timestamp (rounded up, like the host does)
    pub fn tick_at(&self, unix_secs: i64) -> i64 {
        unix_secs.div_euclid(self.tick_secs) + i64::from(unix_secs.rem_euclid(self.tick_secs) != 0)
    }

    pub fn create_nonce(&self, action: &str, user: UserId) -> String {
        self.create_nonce_at(action, user, Utc::now().timestamp())
    }

    pub fn create_nonce_at(&self, action: &str, user: UserId, unix_secs: i64) -> String {
        let digest = self.digest(self.tick_at(unix_secs), action, user);
        URL_SAFE_NO_PAD.encode(&digest[..NONCE_BYTES])
    }

    pub fn verify_nonce_at(
        &self,
        nonce: &str,
        action: &str,
        user: UserId,
        unix_secs: i64,
    ) -> NonceVerdict {
        let Ok(provided) = URL_SAFE_NO_PAD.decode(nonce) else {
            return NonceVerdict::Invalid;
        };
        if provided.len() != NONCE_BYTES {
            return NonceVerdict::Invalid;
        }

        let tick = self.tick_at(unix_secs);
        for (candidate, verdict) in [
            (tick, NonceVerdict::Current),
            (tick - 1, NonceVerdict::Previous),
        ] {
            let mut mac = self.mac.clone();
            mac.update(Self::message(candidate, action, user).as_bytes());
            if mac.verify_truncated_left(&provided).is_ok() {
                return verdict;
            }
        }

        NonceVerdict::Invalid
    }

    fn digest(&self, tick: i64, action: &str, user: UserId) -> Vec<u8> {
        let mut mac = self.mac.clone();
        mac.update(Self::message(tick, action, user).as_bytes());
        mac.finalize().into_bytes().to_vec()
    }

    fn message(tick: i64, action: &str, user: UserId) -> String {
        format!("{}|{}|{}", tick, action, user.0)
    }
}

impl NonceVerifier for NonceService {
    fn verify_nonce(&self, nonce: &str, action: &str, user: UserId) -> NonceVerdict {
        self.verify_nonce_at(nonce, action, user, Utc::now().timestamp())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service(lifetime: i64) -> NonceService {
        let config = NonceConfig::new(b"test_secret_key_32_bytes_long!!!".to_vec())
            .unwrap()
            .with_lifetime(lifetime)
            .unwrap();
        NonceService::new(&config).unwrap()
    }

    #[test]
    fn test_tick_rounds_up() {
        let svc = service(200);
        assert_eq!(svc.tick_at(0), 0);
        assert_eq!(svc.tick_at(1), 1);
        assert_eq!(svc.tick_at(100), 1);
        assert_eq!(svc.tick_at(101), 2);
    }

    #[test]
    fn test_nonce_shape() {
        let nonce = service(200).create_nonce_at("mcd-report-uri", UserId(1), 1_000);
        assert_eq!(nonce.len(), 16);
        assert!(!nonce.contains('='));
    }

    #[test]
    fn test_current_and_previous_tick() {
        let svc = service(200);
        let nonce = svc.create_nonce_at("act", UserId(1), 1_000);

        assert_eq!(
            svc.verify_nonce_at(&nonce, "act", UserId(1), 1_000),
            NonceVerdict::Current
        );
        assert_eq!(
            svc.verify_nonce_at(&nonce, "act", UserId(1), 1_100),
            NonceVerdict::Previous
        );
        assert_eq!(
            svc.verify_nonce_at(&nonce, "act", UserId(1), 1_200),
            NonceVerdict::Invalid
        );
    }

    #[test]
    fn test_bound_to_action_and_user() {
        let svc = service(200);
        let nonce = svc.create_nonce_at("act", UserId(1), 1_000);

        assert!(!svc.verify_nonce_at(&nonce, "other", UserId(1), 1_000).is_valid());
        assert!(!svc.verify_nonce_at(&nonce, "act", UserId(2), 1_000).is_valid());
    }

    #[test]
    fn test_garbage_is_invalid() {
        let svc = service(200);
        for nonce in ["", "!!!", "YWJj", "AAAAAAAAAAAAAAAAAAAAAAAA"] {
            assert_eq!(
                svc.verify_nonce_at(nonce, "act", UserId(1), 1_000),
                NonceVerdict::Invalid
            );
        }
    }

    #[test]
    fn test_different_secret_rejects() {
        let other = NonceService::new(
            &NonceConfig::new(b"wrong_secret_key_32_bytes_long!!".to_vec()).unwrap(),
        )
        .unwrap();
        let nonce = service(86_400).create_nonce_at("act", UserId(1), 1_000);
        assert!(!other.verify_nonce_at(&nonce, "act", UserId(1), 1_000).is_valid());
    }
}

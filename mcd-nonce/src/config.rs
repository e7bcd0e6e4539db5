use crate::error::{NonceError, Result};

/// Minimum secret length in bytes.
pub const MIN_SECRET_LEN: usize = 32;

/// Nonce signing configuration
#[derive(Debug, Clone)]
pub struct NonceConfig {
    /// Secret key for nonce signing (must be at least 32 bytes)
    pub secret: Vec<u8>,

    /// Full nonce lifetime in seconds; a nonce is accepted for two
    /// half-lifetime ticks
    pub lifetime_secs: i64,
}

impl NonceConfig {
    pub fn new(secret: Vec<u8>) -> Result<Self> {
        if secret.len() < MIN_SECRET_LEN {
            return Err(NonceError::SecretTooShort(MIN_SECRET_LEN));
        }

        Ok(Self {
            secret,
            lifetime_secs: 86_400, // 1 day
        })
    }

    /// Generate a random secret key
    pub fn generate_secret() -> Vec<u8> {
        use rand::Rng;
        let mut rng = rand::thread_rng();
        (0..MIN_SECRET_LEN).map(|_| rng.r#gen()).collect()
    }

    pub fn with_lifetime(mut self, lifetime_secs: i64) -> Result<Self> {
        if lifetime_secs < 2 {
            return Err(NonceError::InvalidLifetime(lifetime_secs));
        }
        self.lifetime_secs = lifetime_secs;
        Ok(self)
    }

    /// Length of one tick in seconds
    pub fn tick_secs(&self) -> i64 {
        (self.lifetime_secs / 2).max(1)
    }
}

impl Default for NonceConfig {
    fn default() -> Self {
        Self {
            secret: Self::generate_secret(),
            lifetime_secs: 86_400,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_creation() {
        let secret = NonceConfig::generate_secret();
        assert_eq!(secret.len(), 32);

        let config = NonceConfig::new(secret).unwrap();
        assert_eq!(config.lifetime_secs, 86_400);
        assert_eq!(config.tick_secs(), 43_200);
    }

    #[test]
    fn test_invalid_secret_length() {
        assert!(matches!(
            NonceConfig::new(vec![1, 2, 3]),
            Err(NonceError::SecretTooShort(32))
        ));
    }

    #[test]
    fn test_lifetime() {
        let config = NonceConfig::default().with_lifetime(600).unwrap();
        assert_eq!(config.tick_secs(), 300);
        assert!(NonceConfig::default().with_lifetime(1).is_err());
    }
}

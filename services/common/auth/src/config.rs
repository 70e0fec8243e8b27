use std::fmt;
use std::str::FromStr;

use chrono::{Duration, Utc};
use jsonwebtoken::Algorithm;

use crate::error::{AuthError, AuthResult};

pub const DEFAULT_ACCESS_TTL_MINUTES: i64 = 30;
pub const DEFAULT_REFRESH_TTL_DAYS: i64 = 7;

/// Runtime configuration for token issuance and verification.
#[derive(Clone)]
pub struct TokenConfig {
    /// Shared HMAC secret used for both signing and verification.
    pub secret: String,
    pub algorithm: Algorithm,
    pub access_ttl: Duration,
    pub refresh_ttl: Duration,
}

impl TokenConfig {
    /// Construct config with HS256 and the default lifetimes (30 minutes / 7 days).
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
            algorithm: Algorithm::HS256,
            access_ttl: Duration::minutes(DEFAULT_ACCESS_TTL_MINUTES),
            refresh_ttl: Duration::days(DEFAULT_REFRESH_TTL_DAYS),
        }
    }

    pub fn with_algorithm(mut self, algorithm: Algorithm) -> Self {
        self.algorithm = algorithm;
        self
    }

    /// Fails with [`AuthError::InvalidTtl`] when `minutes` does not fit a duration.
    pub fn with_access_ttl_minutes(mut self, minutes: i64) -> AuthResult<Self> {
        self.access_ttl = Duration::try_minutes(minutes).ok_or(AuthError::InvalidTtl(minutes))?;
        Ok(self)
    }

    /// Fails with [`AuthError::InvalidTtl`] when `days` does not fit a duration.
    pub fn with_refresh_ttl_days(mut self, days: i64) -> AuthResult<Self> {
        self.refresh_ttl = Duration::try_days(days).ok_or(AuthError::InvalidTtl(days))?;
        Ok(self)
    }

    /// Checks everything the codec and factory rely on.
    pub fn validate(&self) -> AuthResult<()> {
        if self.secret.is_empty() {
            return Err(AuthError::InvalidConfig("signing secret must not be empty".into()));
        }
        ensure_hmac(self.algorithm)?;
        ensure_ttl(self.access_ttl)?;
        ensure_ttl(self.refresh_ttl)?;
        Ok(())
    }
}

/// A ttl is usable when it is positive and `now + ttl` stays within the representable range.
fn ensure_ttl(ttl: Duration) -> AuthResult<()> {
    if ttl <= Duration::zero() || Utc::now().checked_add_signed(ttl).is_none() {
        return Err(AuthError::InvalidTtl(ttl.num_seconds()));
    }
    Ok(())
}

impl fmt::Debug for TokenConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenConfig")
            .field("secret", &"<redacted>")
            .field("algorithm", &self.algorithm)
            .field("access_ttl", &self.access_ttl)
            .field("refresh_ttl", &self.refresh_ttl)
            .finish()
    }
}

/// Parses an algorithm identifier such as `HS256`. Only the HMAC family is accepted.
pub fn parse_algorithm(value: &str) -> AuthResult<Algorithm> {
    let algorithm = Algorithm::from_str(value.trim())
        .map_err(|_| AuthError::UnsupportedAlgorithm(value.trim().to_string()))?;
    ensure_hmac(algorithm)?;
    Ok(algorithm)
}

fn ensure_hmac(algorithm: Algorithm) -> AuthResult<()> {
    match algorithm {
        Algorithm::HS256 | Algorithm::HS384 | Algorithm::HS512 => Ok(()),
        other => Err(AuthError::UnsupportedAlgorithm(format!("{other:?}"))),
    }
}

use std::fmt;

use chrono::{DateTime, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::claims::{Claims, ClaimsRepr};
use crate::config::TokenConfig;
use crate::error::{AuthError, AuthResult};

/// Compact `header.payload.signature` token as handed to clients.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SignedToken(String);

impl SignedToken {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl From<String> for SignedToken {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl AsRef<str> for SignedToken {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SignedToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// Token material stays out of logs even when a caller debug-prints a struct holding one.
impl fmt::Debug for SignedToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SignedToken(<{} bytes>)", self.0.len())
    }
}

/// HMAC signer and verifier bound to a single secret and algorithm.
#[derive(Clone)]
pub struct TokenCodec {
    algorithm: Algorithm,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
}

impl TokenCodec {
    pub fn new(secret: &str, algorithm: Algorithm) -> AuthResult<Self> {
        let config = TokenConfig::new(secret).with_algorithm(algorithm);
        Self::from_config(&config)
    }

    pub fn from_config(config: &TokenConfig) -> AuthResult<Self> {
        config.validate()?;

        // Only the configured algorithm is accepted, whatever the header claims.
        let mut validation = Validation::new(config.algorithm);
        validation.leeway = 0;
        validation.validate_exp = false;
        validation.validate_aud = false;
        validation.set_required_spec_claims(&["exp", "sub"]);

        Ok(Self {
            algorithm: config.algorithm,
            encoding_key: EncodingKey::from_secret(config.secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(config.secret.as_bytes()),
            validation,
        })
    }

    pub fn algorithm(&self) -> Algorithm {
        self.algorithm
    }

    pub fn sign(&self, claims: &Claims) -> AuthResult<SignedToken> {
        let header = Header::new(self.algorithm);
        let repr = ClaimsRepr::from(claims);
        encode(&header, &repr, &self.encoding_key)
            .map(SignedToken)
            .map_err(|err| AuthError::Signing(err.to_string()))
    }

    pub fn verify(&self, token: &str) -> AuthResult<Claims> {
        self.verify_at(token, Utc::now())
    }

    /// Verifies signature and structure, then checks expiry against `now`.
    pub fn verify_at(&self, token: &str, now: DateTime<Utc>) -> AuthResult<Claims> {
        let token = token.trim();
        if token.is_empty() {
            return Err(AuthError::Malformed("empty token".to_string()));
        }

        let data = decode::<ClaimsRepr>(token, &self.decoding_key, &self.validation)?;
        let claims = Claims::try_from(data.claims)?;

        if claims.is_expired_at(now) {
            debug!(subject = %claims.subject, token_type = %claims.token_type, "token expired");
            return Err(AuthError::Expired);
        }

        debug!(subject = %claims.subject, token_type = %claims.token_type, "verified token");
        Ok(claims)
    }
}

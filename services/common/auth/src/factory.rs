use std::collections::BTreeSet;

use chrono::{DateTime, Duration, SubsecRound, Utc};
use uuid::Uuid;

use crate::claims::{Claims, TokenType};
use crate::codec::{SignedToken, TokenCodec};
use crate::config::TokenConfig;
use crate::error::{AuthError, AuthResult};

/// A freshly minted token alongside the claims it encodes.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: SignedToken,
    pub claims: Claims,
}

impl IssuedToken {
    pub fn expires_at(&self) -> DateTime<Utc> {
        self.claims.expires_at
    }

    /// Lifetime granted at issuance, in seconds.
    pub fn expires_in(&self) -> i64 {
        (self.claims.expires_at - self.claims.issued_at).num_seconds()
    }
}

#[derive(Debug, Clone)]
pub struct TokenPair {
    pub access: IssuedToken,
    pub refresh: IssuedToken,
    pub token_type: &'static str,
}

/// Builds typed claims with configured lifetimes and signs them.
#[derive(Clone)]
pub struct TokenFactory {
    codec: TokenCodec,
    pub(crate) access_ttl: Duration,
    pub(crate) refresh_ttl: Duration,
}

impl TokenFactory {
    pub fn new(config: &TokenConfig) -> AuthResult<Self> {
        Ok(Self {
            codec: TokenCodec::from_config(config)?,
            access_ttl: config.access_ttl,
            refresh_ttl: config.refresh_ttl,
        })
    }

    pub fn codec(&self) -> &TokenCodec {
        &self.codec
    }

    pub fn access_ttl(&self) -> Duration {
        self.access_ttl
    }

    pub fn refresh_ttl(&self) -> Duration {
        self.refresh_ttl
    }

    pub fn issue_access_token<I, S>(&self, subject: &str, scopes: I) -> AuthResult<IssuedToken>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.issue_access_token_with_ttl(subject, scopes, self.access_ttl)
    }

    pub fn issue_access_token_with_ttl<I, S>(
        &self,
        subject: &str,
        scopes: I,
        ttl: Duration,
    ) -> AuthResult<IssuedToken>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let scopes = scopes.into_iter().map(Into::into).collect();
        self.issue(subject, TokenType::Access, scopes, ttl)
    }

    pub fn issue_refresh_token(&self, subject: &str) -> AuthResult<IssuedToken> {
        self.issue_refresh_token_with_ttl(subject, self.refresh_ttl)
    }

    pub fn issue_refresh_token_with_ttl(
        &self,
        subject: &str,
        ttl: Duration,
    ) -> AuthResult<IssuedToken> {
        self.issue(subject, TokenType::Refresh, BTreeSet::new(), ttl)
    }

    pub fn issue_pair<I, S>(&self, subject: &str, scopes: I) -> AuthResult<TokenPair>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Ok(TokenPair {
            access: self.issue_access_token(subject, scopes)?,
            refresh: self.issue_refresh_token(subject)?,
            token_type: "bearer",
        })
    }

    fn issue(
        &self,
        subject: &str,
        token_type: TokenType,
        scopes: BTreeSet<String>,
        ttl: Duration,
    ) -> AuthResult<IssuedToken> {
        // Whole seconds keep the in-memory claims identical to what verify() decodes.
        if ttl < Duration::seconds(1) {
            return Err(AuthError::InvalidTtl(ttl.num_seconds()));
        }
        if subject.is_empty() {
            return Err(AuthError::InvalidConfig("token subject must not be empty".into()));
        }

        let issued_at = Utc::now().trunc_subsecs(0);
        let expires_at = Duration::try_seconds(ttl.num_seconds())
            .and_then(|whole| issued_at.checked_add_signed(whole))
            .ok_or(AuthError::InvalidTtl(ttl.num_seconds()))?;
        let claims = Claims {
            subject: subject.to_string(),
            token_type,
            scopes,
            expires_at,
            issued_at,
            token_id: Uuid::new_v4(),
        };
        let token = self.codec.sign(&claims)?;

        Ok(IssuedToken { token, claims })
    }
}

use std::collections::BTreeSet;
use std::sync::Arc;

use tracing::{info, warn};

use crate::authorizer::authorize;
use crate::claims::{Claims, TokenType};
use crate::error::{AuthError, AuthResult};
use crate::factory::{TokenFactory, TokenPair};
use crate::rotation::RefreshTokenStore;

/// Identity as seen by the session layer: who it is and what it may do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub username: String,
    pub scopes: BTreeSet<String>,
}

/// Credential authority the facade delegates to. Password storage lives behind it.
pub trait PrincipalDirectory: Send + Sync {
    /// Returns the principal when `password` matches, [`AuthError::InvalidCredentials`] otherwise.
    fn authenticate(&self, username: &str, password: &str) -> AuthResult<Principal>;

    fn find(&self, username: &str) -> Option<Principal>;
}

/// Orchestrates login, refresh, logout and access verification.
#[derive(Clone)]
pub struct SessionService {
    factory: TokenFactory,
    store: Arc<dyn RefreshTokenStore>,
    directory: Arc<dyn PrincipalDirectory>,
}

impl SessionService {
    pub fn new(
        factory: TokenFactory,
        store: Arc<dyn RefreshTokenStore>,
        directory: Arc<dyn PrincipalDirectory>,
    ) -> Self {
        Self {
            factory,
            store,
            directory,
        }
    }

    pub fn factory(&self) -> &TokenFactory {
        &self.factory
    }

    /// Authenticates and issues a fresh pair. Any refresh token previously issued
    /// to the same subject stops working.
    pub fn login(&self, username: &str, password: &str) -> AuthResult<TokenPair> {
        let principal = self.directory.authenticate(username, password)?;
        let pair = self
            .factory
            .issue_pair(&principal.username, principal.scopes.iter().cloned())?;
        self.store.issue_initial(&principal.username, &pair.refresh.token);
        info!(subject = %principal.username, "session started");
        Ok(pair)
    }

    pub fn refresh_session(&self, presented: &str) -> AuthResult<TokenPair> {
        let claims = self.verify_refresh(presented)?;

        // Resolved before rotating so a removed principal leaves the store untouched.
        let principal = self.directory.find(&claims.subject).ok_or_else(|| {
            warn!(subject = %claims.subject, "refresh for unknown principal");
            AuthError::UnknownPrincipal(claims.subject.clone())
        })?;

        // Minted before rotating: once the store moves on, the caller must get the new pair.
        let access = self
            .factory
            .issue_access_token(&claims.subject, principal.scopes.iter().cloned())?;
        let refresh = self
            .store
            .rotate(&claims.subject, presented.trim(), &self.factory)?;

        info!(subject = %claims.subject, "session refreshed");
        Ok(TokenPair {
            access,
            refresh,
            token_type: "bearer",
        })
    }

    /// Ends the session owning `presented`; a superseded token cannot log anyone out.
    pub fn logout(&self, presented: &str) -> AuthResult<()> {
        let claims = self.verify_refresh(presented)?;
        self.store.revoke(&claims.subject, presented.trim())?;
        info!(subject = %claims.subject, "session ended");
        Ok(())
    }

    pub fn verify_access<I, S>(&self, token: &str, required_scopes: I) -> AuthResult<Claims>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let claims = self.factory.codec().verify(token)?;
        authorize(claims, required_scopes)
    }

    fn verify_refresh(&self, presented: &str) -> AuthResult<Claims> {
        let claims = self.factory.codec().verify(presented)?;
        if claims.token_type != TokenType::Refresh {
            return Err(AuthError::WrongTokenType {
                expected: TokenType::Refresh,
                found: claims.token_type,
            });
        }
        Ok(claims)
    }
}

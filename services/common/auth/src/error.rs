use thiserror::Error;

use crate::claims::TokenType;

pub type AuthResult<T> = Result<T, AuthError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    #[error("token is malformed: {0}")]
    Malformed(String),
    #[error("token signature is invalid")]
    InvalidSignature,
    #[error("token has expired")]
    Expired,
    #[error("expected {expected} token but received {found} token")]
    WrongTokenType { expected: TokenType, found: TokenType },
    #[error("missing required scopes: {}", missing.join(", "))]
    InsufficientScope { missing: Vec<String> },
    #[error("refresh token is no longer active")]
    StaleRefreshToken,
    #[error("invalid credentials")]
    InvalidCredentials,
    #[error("no principal registered for subject '{0}'")]
    UnknownPrincipal(String),
    #[error("token lifetime must be positive, got {0} seconds")]
    InvalidTtl(i64),
    #[error("unsupported signing algorithm '{0}'")]
    UnsupportedAlgorithm(String),
    #[error("invalid token configuration: {0}")]
    InvalidConfig(String),
    #[error("failed to sign token: {0}")]
    Signing(String),
}

impl AuthError {
    /// True for failures caused by the presented credential rather than by
    /// server-side configuration.
    pub fn is_client_error(&self) -> bool {
        !matches!(
            self,
            AuthError::InvalidTtl(_)
                | AuthError::UnsupportedAlgorithm(_)
                | AuthError::InvalidConfig(_)
                | AuthError::Signing(_)
        )
    }
}

impl From<jsonwebtoken::errors::Error> for AuthError {
    fn from(value: jsonwebtoken::errors::Error) -> Self {
        use jsonwebtoken::errors::ErrorKind;

        match value.kind() {
            ErrorKind::InvalidSignature | ErrorKind::InvalidAlgorithm => Self::InvalidSignature,
            ErrorKind::ExpiredSignature => Self::Expired,
            ErrorKind::InvalidKeyFormat
            | ErrorKind::InvalidAlgorithmName
            | ErrorKind::InvalidEcdsaKey
            | ErrorKind::InvalidRsaKey(_)
            | ErrorKind::RsaFailedSigning => Self::Signing(value.to_string()),
            _ => Self::Malformed(value.to_string()),
        }
    }
}

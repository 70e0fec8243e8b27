use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use common_auth::AuthError;
use serde::Serialize;
use thiserror::Error;
use tracing::error;

use crate::users::RegistrationError;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Auth(#[from] AuthError),
    #[error(transparent)]
    Registration(#[from] RegistrationError),
    #[error("authorization header missing")]
    MissingAuthorization,
    #[error("authorization header malformed")]
    InvalidAuthorization,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    code: &'static str,
    message: String,
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Auth(AuthError::InsufficientScope { .. }) => StatusCode::FORBIDDEN,
            ApiError::Auth(err) if !err.is_client_error() => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Auth(_) | ApiError::MissingAuthorization | ApiError::InvalidAuthorization => {
                StatusCode::UNAUTHORIZED
            }
            ApiError::Registration(RegistrationError::Hashing(_)) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            ApiError::Registration(_) => StatusCode::BAD_REQUEST,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            ApiError::Auth(err) => match err {
                AuthError::Malformed(_) => "TOKEN_MALFORMED",
                AuthError::InvalidSignature => "TOKEN_INVALID",
                AuthError::Expired => "TOKEN_EXPIRED",
                AuthError::WrongTokenType { .. } => "TOKEN_TYPE",
                AuthError::InsufficientScope { .. } => "INSUFFICIENT_SCOPE",
                AuthError::StaleRefreshToken => "REFRESH_TOKEN_STALE",
                AuthError::InvalidCredentials => "INVALID_CREDENTIALS",
                AuthError::UnknownPrincipal(_) => "UNKNOWN_PRINCIPAL",
                AuthError::InvalidTtl(_)
                | AuthError::UnsupportedAlgorithm(_)
                | AuthError::InvalidConfig(_)
                | AuthError::Signing(_) => "SERVER_ERROR",
            },
            ApiError::Registration(RegistrationError::UsernameTaken(_)) => "USERNAME_TAKEN",
            ApiError::Registration(RegistrationError::Hashing(_)) => "SERVER_ERROR",
            ApiError::Registration(_) => "INVALID_REGISTRATION",
            ApiError::MissingAuthorization | ApiError::InvalidAuthorization => "AUTH_HEADER",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = if status == StatusCode::INTERNAL_SERVER_ERROR {
            error!(error = %self, "request failed");
            "Unable to process authentication request.".to_string()
        } else {
            self.to_string()
        };

        let body = ErrorBody {
            code: self.code(),
            message,
        };
        (status, Json(body)).into_response()
    }
}

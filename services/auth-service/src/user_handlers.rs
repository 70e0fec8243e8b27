use axum::{extract::State, http::StatusCode, Json};
use chrono::SecondsFormat;
use common_auth::{AuthError, TokenPair};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::errors::ApiError;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RegisterResponse {
    pub username: String,
    pub scopes: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
    pub expires_in: i64,
    pub refresh_expires_in: i64,
    pub access_token_expires_at: String,
    pub refresh_token_expires_at: String,
}

impl From<TokenPair> for TokenResponse {
    fn from(pair: TokenPair) -> Self {
        Self {
            access_token_expires_at: pair
                .access
                .expires_at()
                .to_rfc3339_opts(SecondsFormat::Secs, true),
            refresh_token_expires_at: pair
                .refresh
                .expires_at()
                .to_rfc3339_opts(SecondsFormat::Secs, true),
            expires_in: pair.access.expires_in(),
            refresh_expires_in: pair.refresh.expires_in(),
            access_token: pair.access.token.into_string(),
            refresh_token: pair.refresh.token.into_string(),
            token_type: pair.token_type.to_string(),
        }
    }
}

pub async fn register_user(
    State(state): State<AppState>,
    Json(credentials): Json<Credentials>,
) -> Result<(StatusCode, Json<RegisterResponse>), ApiError> {
    let principal = state
        .users
        .register(&credentials.username, &credentials.password)?;

    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            username: principal.username,
            scopes: principal.scopes.into_iter().collect(),
        }),
    ))
}

pub async fn login_user(
    State(state): State<AppState>,
    Json(credentials): Json<Credentials>,
) -> Result<Json<TokenResponse>, ApiError> {
    match state
        .sessions
        .login(&credentials.username, &credentials.password)
    {
        Ok(pair) => {
            state.record_login_metric("success");
            Ok(Json(pair.into()))
        }
        Err(err) => {
            state.record_login_metric(outcome_label(&err));
            if matches!(err, AuthError::InvalidCredentials) {
                warn!(username = %credentials.username, "login rejected");
            }
            Err(err.into())
        }
    }
}

pub async fn refresh_session(
    State(state): State<AppState>,
    Json(request): Json<RefreshRequest>,
) -> Result<Json<TokenResponse>, ApiError> {
    match state.sessions.refresh_session(&request.refresh_token) {
        Ok(pair) => {
            state.record_refresh_metric("success");
            Ok(Json(pair.into()))
        }
        Err(err) => {
            state.record_refresh_metric(outcome_label(&err));
            Err(err.into())
        }
    }
}

pub async fn logout_user(
    State(state): State<AppState>,
    Json(request): Json<RefreshRequest>,
) -> Result<StatusCode, ApiError> {
    state.sessions.logout(&request.refresh_token)?;
    Ok(StatusCode::NO_CONTENT)
}

fn outcome_label(err: &AuthError) -> &'static str {
    match err {
        AuthError::InvalidCredentials => "invalid_credentials",
        AuthError::StaleRefreshToken => "stale",
        AuthError::Expired => "expired",
        AuthError::UnknownPrincipal(_) => "unknown_principal",
        AuthError::Malformed(_)
        | AuthError::InvalidSignature
        | AuthError::WrongTokenType { .. } => "invalid_token",
        _ => "error",
    }
}

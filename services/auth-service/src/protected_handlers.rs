use axum::{extract::State, Json};
use chrono::SecondsFormat;
use common_auth::{SCOPE_ADMIN, SCOPE_USER};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::errors::ApiError;
use crate::extractors::BearerToken;
use crate::AppState;

#[derive(Debug, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MeResponse {
    pub username: String,
    pub scopes: Vec<String>,
    pub token_type: String,
    pub expires_at: String,
}

pub async fn root() -> Json<Value> {
    Json(json!({
        "service": "auth-service",
        "endpoints": ["/register", "/login", "/refresh", "/logout", "/protected", "/admin", "/me"],
    }))
}

pub async fn protected(
    State(state): State<AppState>,
    BearerToken(token): BearerToken,
) -> Result<Json<MessageResponse>, ApiError> {
    let claims = state.sessions.verify_access(&token, [SCOPE_USER])?;
    Ok(Json(MessageResponse {
        message: format!("Hello {}, you have user access!", claims.subject),
    }))
}

pub async fn admin(
    State(state): State<AppState>,
    BearerToken(token): BearerToken,
) -> Result<Json<MessageResponse>, ApiError> {
    let claims = state.sessions.verify_access(&token, [SCOPE_ADMIN])?;
    Ok(Json(MessageResponse {
        message: format!("Welcome admin {}", claims.subject),
    }))
}

pub async fn me(
    State(state): State<AppState>,
    BearerToken(token): BearerToken,
) -> Result<Json<MeResponse>, ApiError> {
    let claims = state.sessions.verify_access(&token, [SCOPE_USER])?;
    Ok(Json(MeResponse {
        expires_at: claims
            .expires_at
            .to_rfc3339_opts(SecondsFormat::Secs, true),
        token_type: claims.token_type.to_string(),
        scopes: claims.scopes.into_iter().collect(),
        username: claims.subject,
    }))
}

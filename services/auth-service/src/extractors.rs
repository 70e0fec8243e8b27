use async_trait::async_trait;
use axum::extract::FromRequestParts;
use axum::http::{header::AUTHORIZATION, request::Parts, HeaderValue};

use crate::errors::ApiError;

/// Raw bearer credential from the `Authorization` header. Verification is left to the handler
/// so each route can state its own scope requirements.
#[derive(Debug, Clone)]
pub struct BearerToken(pub String);

#[async_trait]
impl<S> FromRequestParts<S> for BearerToken
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let header_value = parts
            .headers
            .get(AUTHORIZATION)
            .ok_or(ApiError::MissingAuthorization)?;

        parse_bearer(header_value).map(BearerToken)
    }
}

fn parse_bearer(value: &HeaderValue) -> Result<String, ApiError> {
    let raw = value
        .to_str()
        .map_err(|_| ApiError::InvalidAuthorization)?
        .trim();

    let (scheme, token) = raw
        .split_once(' ')
        .ok_or(ApiError::InvalidAuthorization)?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return Err(ApiError::InvalidAuthorization);
    }

    let token = token.trim();
    if token.is_empty() {
        return Err(ApiError::InvalidAuthorization);
    }

    Ok(token.to_owned())
}

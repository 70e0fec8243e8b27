#![allow(dead_code)]

use anyhow::{Context, Result};
use auth_service::{build_router, AppState};
use axum::body::Body;
use axum::http::{header::AUTHORIZATION, header::CONTENT_TYPE, Method, Request, StatusCode};
use axum::Router;
use common_auth::TokenConfig;
use http_body_util::BodyExt;
use serde_json::Value;
use tower::util::ServiceExt;

pub const TEST_SECRET: &str = "integration-test-secret";

pub struct TestApp {
    pub state: AppState,
    router: Router,
}

impl TestApp {
    pub fn new() -> Result<Self> {
        let state = AppState::new(&TokenConfig::new(TEST_SECRET))?;
        Ok(Self {
            router: build_router(state.clone()),
            state,
        })
    }

    pub fn with_demo_users() -> Result<Self> {
        let app = Self::new()?;
        app.state.users.seed_demo_users()?;
        Ok(app)
    }

    pub async fn post_json(&self, uri: &str, body: Value) -> Result<(StatusCode, Value)> {
        let request = Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header(CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))?;
        self.send(request).await
    }

    pub async fn get(&self, uri: &str, bearer: Option<&str>) -> Result<(StatusCode, Value)> {
        let mut builder = Request::builder().method(Method::GET).uri(uri);
        if let Some(token) = bearer {
            builder = builder.header(AUTHORIZATION, format!("Bearer {token}"));
        }
        self.send(builder.body(Body::empty())?).await
    }

    pub async fn send(&self, request: Request<Body>) -> Result<(StatusCode, Value)> {
        let response = self.router.clone().oneshot(request).await?;
        let status = response.status();
        let bytes = response.into_body().collect().await?.to_bytes();
        if bytes.is_empty() {
            return Ok((status, Value::Null));
        }
        // Plain-text routes (healthz, metrics) come back as a JSON string.
        let body = match serde_json::from_slice(&bytes) {
            Ok(value) => value,
            Err(_) => Value::String(String::from_utf8(bytes.to_vec()).context("response body")?),
        };
        Ok((status, body))
    }
}

pub fn field<'a>(body: &'a Value, key: &str) -> Result<&'a str> {
    body.get(key)
        .and_then(Value::as_str)
        .with_context(|| format!("missing string field '{key}' in {body}"))
}

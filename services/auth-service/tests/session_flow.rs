mod support;

use anyhow::Result;
use axum::http::StatusCode;
use serde_json::json;
use support::{field, TestApp};

#[tokio::test]
async fn register_login_refresh_and_logout() -> Result<()> {
    let app = TestApp::new()?;

    let (status, body) = app
        .post_json("/register", json!({ "username": "carol", "password": "hunter22" }))
        .await?;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["scopes"], json!(["user"]));

    let (status, body) = app
        .post_json("/login", json!({ "username": "carol", "password": "hunter22" }))
        .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(field(&body, "token_type")?, "bearer");
    assert_eq!(body["expires_in"], json!(30 * 60));
    let access = field(&body, "access_token")?.to_string();
    let refresh = field(&body, "refresh_token")?.to_string();

    let (status, body) = app.get("/protected", Some(access.as_str())).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(field(&body, "message")?, "Hello carol, you have user access!");

    let (status, body) = app.get("/admin", Some(access.as_str())).await?;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(field(&body, "code")?, "INSUFFICIENT_SCOPE");

    let (status, body) = app
        .post_json("/refresh", json!({ "refresh_token": refresh }))
        .await?;
    assert_eq!(status, StatusCode::OK);
    let rotated = field(&body, "refresh_token")?.to_string();
    assert_ne!(rotated, refresh);

    let (status, body) = app
        .post_json("/refresh", json!({ "refresh_token": refresh }))
        .await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(field(&body, "code")?, "REFRESH_TOKEN_STALE");

    let (status, _) = app
        .post_json("/logout", json!({ "refresh_token": rotated }))
        .await?;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = app
        .post_json("/refresh", json!({ "refresh_token": rotated }))
        .await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    assert_eq!(app.state.metrics.login_count("success"), 1);
    assert_eq!(app.state.metrics.refresh_count("success"), 1);
    assert_eq!(app.state.metrics.refresh_count("stale"), 2);
    Ok(())
}

#[tokio::test]
async fn second_login_invalidates_previous_refresh_token() -> Result<()> {
    let app = TestApp::with_demo_users()?;
    let credentials = json!({ "username": "maria", "password": "password456" });

    let (_, first) = app.post_json("/login", credentials.clone()).await?;
    let (_, second) = app.post_json("/login", credentials).await?;

    let (status, _) = app
        .post_json(
            "/refresh",
            json!({ "refresh_token": field(&first, "refresh_token")? }),
        )
        .await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = app
        .post_json(
            "/refresh",
            json!({ "refresh_token": field(&second, "refresh_token")? }),
        )
        .await?;
    assert_eq!(status, StatusCode::OK);
    Ok(())
}

#[tokio::test]
async fn admin_scope_reaches_admin_route() -> Result<()> {
    let app = TestApp::with_demo_users()?;
    let (_, body) = app
        .post_json(
            "/login",
            json!({ "username": "alejandro", "password": "password123" }),
        )
        .await?;
    let access = field(&body, "access_token")?;

    let (status, body) = app.get("/admin", Some(access)).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(field(&body, "message")?, "Welcome admin alejandro");

    let (status, body) = app.get("/me", Some(access)).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(field(&body, "username")?, "alejandro");
    assert_eq!(body["scopes"], json!(["admin", "user"]));
    assert_eq!(field(&body, "token_type")?, "access");
    Ok(())
}

#[tokio::test]
async fn token_types_are_not_interchangeable() -> Result<()> {
    let app = TestApp::with_demo_users()?;
    let (_, body) = app
        .post_json(
            "/login",
            json!({ "username": "maria", "password": "password456" }),
        )
        .await?;
    let access = field(&body, "access_token")?;
    let refresh = field(&body, "refresh_token")?;

    let (status, body) = app.get("/protected", Some(refresh)).await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(field(&body, "code")?, "TOKEN_TYPE");

    let (status, body) = app
        .post_json("/refresh", json!({ "refresh_token": access }))
        .await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(field(&body, "code")?, "TOKEN_TYPE");

    // The refresh token is still live after the rejected access-token attempt.
    let (status, _) = app
        .post_json("/refresh", json!({ "refresh_token": refresh }))
        .await?;
    assert_eq!(status, StatusCode::OK);
    Ok(())
}

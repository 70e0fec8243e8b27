use std::sync::Arc;

use axum::{
    extract::{FromRef, State},
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use common_auth::{InMemoryRefreshTokenStore, SessionService, TokenConfig, TokenFactory};
use tracing::error;

use crate::metrics::AuthMetrics;
use crate::protected_handlers::{admin, me, protected, root};
use crate::user_handlers::{login_user, logout_user, refresh_session, register_user};
use crate::users::UserDirectory;

#[derive(Clone)]
pub struct AppState {
    pub sessions: Arc<SessionService>,
    pub users: Arc<UserDirectory>,
    pub metrics: Arc<AuthMetrics>,
}

impl FromRef<AppState> for Arc<SessionService> {
    fn from_ref(state: &AppState) -> Self {
        state.sessions.clone()
    }
}

impl FromRef<AppState> for Arc<UserDirectory> {
    fn from_ref(state: &AppState) -> Self {
        state.users.clone()
    }
}

impl FromRef<AppState> for Arc<AuthMetrics> {
    fn from_ref(state: &AppState) -> Self {
        state.metrics.clone()
    }
}

impl AppState {
    /// Wires the session facade to an in-memory rotation store and user directory.
    pub fn new(config: &TokenConfig) -> anyhow::Result<Self> {
        let factory = TokenFactory::new(config)?;
        let users = Arc::new(UserDirectory::new());
        let sessions = SessionService::new(
            factory,
            Arc::new(InMemoryRefreshTokenStore::new()),
            users.clone(),
        );

        Ok(Self {
            sessions: Arc::new(sessions),
            users,
            metrics: Arc::new(AuthMetrics::new()?),
        })
    }

    pub fn record_login_metric(&self, outcome: &str) {
        self.metrics.login_attempt(outcome);
    }

    pub fn record_refresh_metric(&self, outcome: &str) {
        self.metrics.refresh_attempt(outcome);
    }
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/healthz", get(health))
        .route("/metrics", get(metrics))
        .route("/register", post(register_user))
        .route("/login", post(login_user))
        .route("/refresh", post(refresh_session))
        .route("/logout", post(logout_user))
        .route("/protected", get(protected))
        .route("/admin", get(admin))
        .route("/me", get(me))
        .with_state(state)
}

async fn health() -> &'static str {
    "ok"
}

async fn metrics(State(metrics): State<Arc<AuthMetrics>>) -> Response {
    match metrics.render() {
        Ok(response) => response,
        Err(err) => {
            error!(error = %err, "failed to render metrics");
            axum::http::StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

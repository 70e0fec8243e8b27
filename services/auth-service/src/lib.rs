pub mod app;
pub mod config;
pub mod errors;
pub mod extractors;
pub mod metrics;
pub mod protected_handlers;
pub mod user_handlers;
pub mod users;

pub use app::{build_router, AppState};

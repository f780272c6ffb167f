//! Admin-only endpoints. Every handler takes [`AdminUser`], so the token
//! check, the user re-read and the role check run before any of them.
//!
//! [`AdminUser`]: crate::auth::extractors::AdminUser

pub mod dto;
pub mod handlers;
pub mod services;

use crate::state::AppState;
use axum::Router;

pub fn router() -> Router<AppState> {
    handlers::admin_routes()
}

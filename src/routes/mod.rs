pub mod admin;
pub mod applications;
mod extract;
pub mod public;
pub mod trips;
pub mod user;

use axum::Router;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .merge(public::router())
        .merge(trips::router())
        .merge(applications::router())
        .nest("/me", user::router())
        .nest("/admin", admin::router())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

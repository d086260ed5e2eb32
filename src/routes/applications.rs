use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        Path, State,
    },
    routing::put,
    Json, Router,
};

use crate::{
    auth::CurrentUser,
    error::AppError,
    models::application::{Application, ApplicationDecision},
    routes::extract,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new().route("/applications/:id", put(decide))
}

async fn decide(
    State(state): State<AppState>,
    current: CurrentUser,
    id: Result<Path<i64>, PathRejection>,
    decision: Result<Json<ApplicationDecision>, JsonRejection>,
) -> Result<Json<Application>, AppError> {
    let user = current.require_user()?;
    let id = extract::path(id)?;
    let decision = extract::json(decision)?;
    let application = state
        .applications
        .decide(id, decision.status, user)
        .await?;
    Ok(Json(application))
}

use axum::{extract::State, routing::get, Json, Router};

use crate::{
    auth::{self, CurrentUser},
    error::AppError,
    models::{application::Application, user::UserProfile},
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(me))
        .route("/applications", get(my_applications))
}

async fn me(
    State(state): State<AppState>,
    current: CurrentUser,
) -> Result<Json<UserProfile>, AppError> {
    let user = current.require_user()?;
    Ok(Json(auth::load_profile(&state, user.id).await?))
}

async fn my_applications(
    State(state): State<AppState>,
    current: CurrentUser,
) -> Result<Json<Vec<Application>>, AppError> {
    let user = current.require_user()?;
    Ok(Json(state.applications.list_for_applicant(user).await?))
}

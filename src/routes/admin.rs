use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        Path, State,
    },
    routing::{get, put},
    Json, Router,
};
use serde::Deserialize;
use tracing::{info, warn};

use crate::{
    auth::CurrentUser,
    db::users,
    error::AppError,
    models::user::{UserProfile, UserRole},
    routes::extract,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/users", get(users_list))
        .route("/users/:id/role", put(update_user_role))
}

async fn users_list(
    State(state): State<AppState>,
    current: CurrentUser,
) -> Result<Json<Vec<UserProfile>>, AppError> {
    current.require_admin()?;
    let mut conn = state.db.acquire().await?;
    Ok(Json(users::list_profiles(&mut conn).await?))
}

#[derive(Deserialize)]
struct RoleForm {
    role: UserRole,
}

async fn update_user_role(
    State(state): State<AppState>,
    current: CurrentUser,
    user_id: Result<Path<i64>, PathRejection>,
    form: Result<Json<RoleForm>, JsonRejection>,
) -> Result<Json<UserProfile>, AppError> {
    let admin = current.require_admin()?;
    let user_id = extract::path(user_id)?;
    let form = extract::json(form)?;
    if admin.id == user_id && form.role != UserRole::Admin {
        warn!(user_id, "admin tried to drop their own admin role");
        return Err(AppError::forbidden("admins cannot demote themselves"));
    }

    let mut conn = state.db.acquire().await?;
    if !users::update_role(&mut conn, user_id, form.role).await? {
        return Err(AppError::not_found("user"));
    }
    let profile = users::profile(&mut conn, user_id)
        .await?
        .ok_or_else(|| AppError::not_found("user"))?;

    info!(user_id, role = %form.role, admin_id = admin.id, "user role updated");
    Ok(Json(profile))
}

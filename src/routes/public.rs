use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use axum_extra::extract::cookie::PrivateCookieJar;
use serde::Deserialize;
use tracing::info;

use crate::{
    auth,
    error::AppError,
    models::user::{NewUser, UserProfile},
    routes::extract,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/logout", post(logout))
}

async fn health() -> &'static str {
    "ok"
}

async fn register(
    State(state): State<AppState>,
    jar: PrivateCookieJar,
    form: Result<Json<NewUser>, JsonRejection>,
) -> Result<(StatusCode, PrivateCookieJar, Json<UserProfile>), AppError> {
    let form = extract::json(form)?;
    let profile = auth::register_user(&state, &form).await?;
    let session_id = auth::create_session(&state, profile.id).await?;
    Ok((
        StatusCode::CREATED,
        auth::apply_session_cookie(jar, &session_id),
        Json(profile),
    ))
}

#[derive(Deserialize)]
struct LoginForm {
    identifier: String,
    password: String,
}

async fn login(
    State(state): State<AppState>,
    jar: PrivateCookieJar,
    form: Result<Json<LoginForm>, JsonRejection>,
) -> Result<(PrivateCookieJar, Json<UserProfile>), AppError> {
    let form = extract::json(form)?;
    let user = auth::authenticate_user(&state, &form.identifier, &form.password).await?;
    let session_id = auth::create_session(&state, user.id).await?;
    let profile = auth::load_profile(&state, user.id).await?;
    info!(user_id = user.id, "user logged in");
    Ok((auth::apply_session_cookie(jar, &session_id), Json(profile)))
}

async fn logout(
    State(state): State<AppState>,
    jar: PrivateCookieJar,
) -> Result<(PrivateCookieJar, StatusCode), AppError> {
    if let Some(cookie) = jar.get(auth::SESSION_COOKIE) {
        auth::destroy_session(&state, cookie.value()).await?;
    }
    Ok((auth::clear_session_cookie(jar), StatusCode::NO_CONTENT))
}

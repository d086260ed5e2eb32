use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};

use crate::{
    auth::CurrentUser,
    error::AppError,
    models::{
        application::{Application, NewApplication},
        message::{NewMessage, TripMessage},
        trip::{NewTrip, Trip, TripFilter, TripPatch, TripWithParticipants},
        user::UserProfile,
    },
    routes::extract,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/trips", get(list_trips).post(create_trip))
        .route("/trips/:id", get(get_trip).put(update_trip))
        .route("/trips/:id/apply", post(apply))
        .route("/trips/:id/participants", get(participants))
        .route("/trips/:id/start", post(start_trip))
        .route("/trips/:id/applications", get(list_applications))
        .route("/trips/:id/messages", get(list_messages).post(post_message))
}

async fn create_trip(
    State(state): State<AppState>,
    current: CurrentUser,
    input: Result<Json<NewTrip>, JsonRejection>,
) -> Result<(StatusCode, Json<Trip>), AppError> {
    let user = current.require_user()?;
    let input = extract::json(input)?;
    let trip = state.trips.create_trip(user, &input).await?;
    Ok((StatusCode::CREATED, Json(trip)))
}

async fn list_trips(
    State(state): State<AppState>,
    filter: Result<Query<TripFilter>, QueryRejection>,
) -> Result<Json<Vec<Trip>>, AppError> {
    let filter = extract::query(filter)?;
    Ok(Json(state.trips.list_trips(&filter).await?))
}

async fn get_trip(
    State(state): State<AppState>,
    id: Result<Path<i64>, PathRejection>,
) -> Result<Json<TripWithParticipants>, AppError> {
    let id = extract::path(id)?;
    Ok(Json(state.trips.get_trip(id).await?))
}

async fn update_trip(
    State(state): State<AppState>,
    current: CurrentUser,
    id: Result<Path<i64>, PathRejection>,
    patch: Result<Json<TripPatch>, JsonRejection>,
) -> Result<Json<Trip>, AppError> {
    let user = current.require_user()?;
    let id = extract::path(id)?;
    let patch = extract::json(patch)?;
    Ok(Json(state.trips.update_trip(id, &patch, user).await?))
}

async fn apply(
    State(state): State<AppState>,
    current: CurrentUser,
    id: Result<Path<i64>, PathRejection>,
    input: Result<Json<NewApplication>, JsonRejection>,
) -> Result<Json<Application>, AppError> {
    let user = current.require_user()?;
    let id = extract::path(id)?;
    let input = extract::json(input)?;
    Ok(Json(state.applications.apply(id, user, &input).await?))
}

async fn participants(
    State(state): State<AppState>,
    id: Result<Path<i64>, PathRejection>,
) -> Result<Json<Vec<UserProfile>>, AppError> {
    let id = extract::path(id)?;
    Ok(Json(state.trips.participants(id).await?))
}

async fn start_trip(
    State(state): State<AppState>,
    current: CurrentUser,
    id: Result<Path<i64>, PathRejection>,
) -> Result<Json<Value>, AppError> {
    let user = current.require_user()?;
    let id = extract::path(id)?;
    state.trips.start_trip(id, user).await?;
    Ok(Json(json!({ "message": "Trip started successfully" })))
}

async fn list_applications(
    State(state): State<AppState>,
    current: CurrentUser,
    id: Result<Path<i64>, PathRejection>,
) -> Result<Json<Vec<Application>>, AppError> {
    let user = current.require_user()?;
    let id = extract::path(id)?;
    Ok(Json(state.applications.list_for_trip(id, user).await?))
}

async fn list_messages(
    State(state): State<AppState>,
    current: CurrentUser,
    id: Result<Path<i64>, PathRejection>,
) -> Result<Json<Vec<TripMessage>>, AppError> {
    let user = current.require_user()?;
    let id = extract::path(id)?;
    Ok(Json(state.log.list(id, user).await?))
}

async fn post_message(
    State(state): State<AppState>,
    current: CurrentUser,
    id: Result<Path<i64>, PathRejection>,
    input: Result<Json<NewMessage>, JsonRejection>,
) -> Result<(StatusCode, Json<TripMessage>), AppError> {
    let user = current.require_user()?;
    let id = extract::path(id)?;
    let input = extract::json(input)?;
    let message = state.log.post(id, user, &input).await?;
    Ok((StatusCode::CREATED, Json(message)))
}

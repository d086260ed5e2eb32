//! Trip lifecycle manager: creation, partial updates, status transitions
//! and participant lookups.

use chrono::Utc;
use sqlx::SqliteConnection;
use tracing::info;

use crate::{
    auth::AuthenticatedUser,
    db::{trips, users, DbPool, WriteTx},
    error::AppError,
    models::{
        trip::{NewTrip, Trip, TripFilter, TripPatch, TripStatus, TripWithParticipants},
        user::UserProfile,
    },
    services::trip_log::append_system,
};

pub(crate) async fn load_trip(conn: &mut SqliteConnection, id: i64) -> Result<Trip, AppError> {
    trips::find(conn, id)
        .await?
        .ok_or_else(|| AppError::not_found("trip"))
}

/// Organizers manage their own trips; admins manage every trip.
pub(crate) fn can_manage(trip: &Trip, actor: &AuthenticatedUser) -> bool {
    trip.is_organizer(actor.id) || actor.is_admin()
}

fn ensure_transition(from: TripStatus, to: TripStatus) -> Result<(), AppError> {
    if from.can_transition_to(to) {
        Ok(())
    } else {
        Err(AppError::invalid_state(format!(
            "trip cannot move from {from} to {to}"
        )))
    }
}

#[derive(Clone)]
pub struct TripService {
    db: DbPool,
}

impl TripService {
    pub fn new(db: DbPool) -> Self {
        Self { db }
    }

    pub async fn create_trip(
        &self,
        creator: &AuthenticatedUser,
        input: &NewTrip,
    ) -> Result<Trip, AppError> {
        let now = Utc::now();
        input.validate(now)?;

        let mut tx = WriteTx::begin(&self.db).await?;
        let id = trips::insert(&mut tx, input, creator.id, TripStatus::Recruiting, now).await?;
        trips::add_participant(&mut tx, id, creator.id, now).await?;
        append_system(
            &mut tx,
            id,
            creator.id,
            &format!("Trip '{}' created. Recruiting participants!", input.title),
        )
        .await?;
        let trip = load_trip(&mut tx, id).await?;
        tx.commit().await?;

        info!(trip_id = id, organizer_id = creator.id, destination = %trip.destination, "trip created");
        Ok(trip)
    }

    pub async fn get_trip(&self, id: i64) -> Result<TripWithParticipants, AppError> {
        let mut conn = self.db.acquire().await?;
        let trip = load_trip(&mut conn, id).await?;
        let organizer = users::profile(&mut conn, trip.organizer_id)
            .await?
            .ok_or_else(|| AppError::not_found("organizer"))?;
        let participants = trips::participants(&mut conn, id).await?;
        Ok(TripWithParticipants {
            trip,
            organizer,
            participants,
        })
    }

    pub async fn participants(&self, id: i64) -> Result<Vec<UserProfile>, AppError> {
        let mut conn = self.db.acquire().await?;
        load_trip(&mut conn, id).await?;
        let participants = trips::participants(&mut conn, id).await?;
        Ok(participants)
    }

    pub async fn list_trips(&self, filter: &TripFilter) -> Result<Vec<Trip>, AppError> {
        let (skip, limit) = filter.page()?;
        let mut conn = self.db.acquire().await?;
        let trips = trips::list(&mut conn, filter, skip, limit).await?;
        Ok(trips)
    }

    pub async fn update_trip(
        &self,
        id: i64,
        patch: &TripPatch,
        actor: &AuthenticatedUser,
    ) -> Result<Trip, AppError> {
        let mut tx = WriteTx::begin(&self.db).await?;
        let mut trip = load_trip(&mut tx, id).await?;
        if !can_manage(&trip, actor) {
            return Err(AppError::forbidden("only the trip organizer can update the trip"));
        }
        if trip.status.is_terminal() {
            return Err(AppError::invalid_state(format!(
                "trip is {} and can no longer be changed",
                trip.status
            )));
        }

        let participant_count = trips::participant_count(&mut tx, id).await?;
        patch.apply_fields(&mut trip, participant_count)?;

        let previous = trip.status;
        if let Some(next) = patch.status.filter(|next| *next != previous) {
            ensure_transition(previous, next)?;
            trip.status = next;
        }

        trips::update(&mut tx, &trip).await?;
        if trip.status != previous {
            append_system(
                &mut tx,
                id,
                actor.id,
                &format!("Trip status changed from {previous} to {}", trip.status),
            )
            .await?;
        }
        tx.commit().await?;

        info!(trip_id = id, actor_id = actor.id, status = %trip.status, "trip updated");
        Ok(trip)
    }

    pub async fn start_trip(&self, id: i64, actor: &AuthenticatedUser) -> Result<Trip, AppError> {
        let mut tx = WriteTx::begin(&self.db).await?;
        let mut trip = load_trip(&mut tx, id).await?;
        if !trip.is_organizer(actor.id) {
            return Err(AppError::forbidden("only the trip organizer can start the trip"));
        }
        if trip.status != TripStatus::Confirmed {
            return Err(AppError::invalid_state("trip must be confirmed before starting"));
        }
        ensure_transition(trip.status, TripStatus::InProgress)?;

        trips::set_status(&mut tx, id, TripStatus::InProgress).await?;
        trip.status = TripStatus::InProgress;
        append_system(
            &mut tx,
            id,
            actor.id,
            &format!("Trip '{}' has started", trip.title),
        )
        .await?;
        tx.commit().await?;

        info!(trip_id = id, organizer_id = actor.id, "trip started");
        Ok(trip)
    }
}

//! Join requests against a trip, and the organizer's decisions on them.

use chrono::Utc;
use tracing::info;

use crate::{
    auth::AuthenticatedUser,
    db::{applications, trips, users, DbPool, WriteTx},
    error::AppError,
    models::{
        application::{Application, ApplicationStatus, NewApplication},
        trip::TripStatus,
    },
    services::{
        trip_log::append_system,
        trips::{can_manage, load_trip},
    },
};

#[derive(Clone)]
pub struct ApplicationService {
    db: DbPool,
}

impl ApplicationService {
    pub fn new(db: DbPool) -> Self {
        Self { db }
    }

    pub async fn apply(
        &self,
        trip_id: i64,
        applicant: &AuthenticatedUser,
        input: &NewApplication,
    ) -> Result<Application, AppError> {
        let message = input.normalized_message()?;

        let mut tx = WriteTx::begin(&self.db).await?;
        let trip = load_trip(&mut tx, trip_id).await?;
        if trip.status != TripStatus::Recruiting {
            return Err(AppError::invalid_state("trip is not recruiting participants"));
        }
        if trip.is_organizer(applicant.id) {
            return Err(AppError::forbidden("organizer cannot apply to their own trip"));
        }
        if trips::is_participant(&mut tx, trip_id, applicant.id).await? {
            return Err(AppError::conflict("you are already a participant"));
        }
        if applications::find_live(&mut tx, trip_id, applicant.id)
            .await?
            .is_some()
        {
            return Err(AppError::conflict("you have already applied for this trip"));
        }

        let now = Utc::now();
        let id =
            applications::insert(&mut tx, trip_id, applicant.id, message.as_deref(), now).await?;
        append_system(
            &mut tx,
            trip_id,
            applicant.id,
            &format!("{} applied to join the trip", applicant.username),
        )
        .await?;
        let application = applications::find(&mut tx, id)
            .await?
            .ok_or_else(|| AppError::not_found("application"))?;
        tx.commit().await?;

        info!(trip_id, application_id = id, applicant_id = applicant.id, "application submitted");
        Ok(application)
    }

    /// Moves a pending application to approved, rejected or cancelled.
    /// Organizers (or admins) approve and reject; only the applicant cancels.
    pub async fn decide(
        &self,
        application_id: i64,
        decision: ApplicationStatus,
        actor: &AuthenticatedUser,
    ) -> Result<Application, AppError> {
        if decision == ApplicationStatus::Pending {
            return Err(AppError::validation(
                "decision must be approved, rejected or cancelled",
            ));
        }

        let mut tx = WriteTx::begin(&self.db).await?;
        let mut application = applications::find(&mut tx, application_id)
            .await?
            .ok_or_else(|| AppError::not_found("application"))?;
        let trip = load_trip(&mut tx, application.trip_id).await?;

        let by_organizer = decision != ApplicationStatus::Cancelled;
        if by_organizer && !can_manage(&trip, actor) {
            return Err(AppError::forbidden(
                "only the trip organizer can decide on applications",
            ));
        }
        if !by_organizer && application.applicant_id != actor.id {
            return Err(AppError::forbidden("only the applicant can cancel an application"));
        }
        if !application.status.can_transition_to(decision) {
            return Err(AppError::invalid_state(format!(
                "application is already {}",
                application.status
            )));
        }
        if by_organizer && trip.status != TripStatus::Recruiting {
            return Err(AppError::invalid_state("trip is not recruiting participants"));
        }

        let now = Utc::now();
        if decision == ApplicationStatus::Approved {
            let count = trips::participant_count(&mut tx, trip.id).await?;
            if count >= trip.max_participants {
                return Err(AppError::conflict("trip is full"));
            }
            trips::add_participant(&mut tx, trip.id, application.applicant_id, now).await?;
        }
        applications::set_status(&mut tx, application.id, decision, now).await?;

        let applicant = users::profile(&mut tx, application.applicant_id)
            .await?
            .map(|profile| profile.username)
            .unwrap_or_else(|| format!("user #{}", application.applicant_id));
        let entry = match decision {
            ApplicationStatus::Approved => format!("{applicant} joined the trip"),
            ApplicationStatus::Rejected => format!("Application from {applicant} was rejected"),
            _ => format!("{applicant} withdrew their application"),
        };
        append_system(&mut tx, trip.id, actor.id, &entry).await?;
        tx.commit().await?;

        application.status = decision;
        application.decided_at = Some(now);
        info!(
            trip_id = trip.id,
            application_id,
            actor_id = actor.id,
            decision = %decision,
            "application decided"
        );
        Ok(application)
    }

    pub async fn list_for_trip(
        &self,
        trip_id: i64,
        actor: &AuthenticatedUser,
    ) -> Result<Vec<Application>, AppError> {
        let mut conn = self.db.acquire().await?;
        let trip = load_trip(&mut conn, trip_id).await?;
        if !can_manage(&trip, actor) {
            return Err(AppError::forbidden(
                "only the trip organizer can view applications",
            ));
        }
        let items = applications::list_for_trip(&mut conn, trip_id).await?;
        Ok(items)
    }

    pub async fn list_for_applicant(
        &self,
        applicant: &AuthenticatedUser,
    ) -> Result<Vec<Application>, AppError> {
        let mut conn = self.db.acquire().await?;
        let items = applications::list_for_applicant(&mut conn, applicant.id).await?;
        Ok(items)
    }
}

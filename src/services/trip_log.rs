//! Append-only, trip-scoped message log. System entries are written by the
//! lifecycle services inside their own transactions via [`append_system`].

use chrono::Utc;
use sqlx::SqliteConnection;
use tracing::{debug, info};

use crate::{
    auth::AuthenticatedUser,
    db::{messages, trips, DbPool},
    error::AppError,
    models::message::{NewMessage, TripMessage},
    services::trips::load_trip,
};

/// Records a lifecycle event. Callers pass their open transaction so the
/// entry commits or rolls back together with the state change.
pub async fn append_system(
    conn: &mut SqliteConnection,
    trip_id: i64,
    author_id: i64,
    content: &str,
) -> Result<TripMessage, AppError> {
    let message = messages::insert(conn, trip_id, author_id, content, true, Utc::now()).await?;
    debug!(trip_id, message_id = message.id, "system message appended");
    Ok(message)
}

#[derive(Clone)]
pub struct TripLog {
    db: DbPool,
}

impl TripLog {
    pub fn new(db: DbPool) -> Self {
        Self { db }
    }

    pub async fn post(
        &self,
        trip_id: i64,
        author: &AuthenticatedUser,
        input: &NewMessage,
    ) -> Result<TripMessage, AppError> {
        input.validate()?;

        let mut conn = self.db.acquire().await?;
        load_trip(&mut conn, trip_id).await?;
        if !trips::is_participant(&mut conn, trip_id, author.id).await? {
            return Err(AppError::forbidden("only participants can post to this trip"));
        }

        let message =
            messages::insert(&mut conn, trip_id, author.id, &input.content, false, Utc::now())
                .await?;
        info!(trip_id, author_id = author.id, message_id = message.id, "message posted");
        Ok(message)
    }

    pub async fn list(
        &self,
        trip_id: i64,
        viewer: &AuthenticatedUser,
    ) -> Result<Vec<TripMessage>, AppError> {
        let mut conn = self.db.acquire().await?;
        load_trip(&mut conn, trip_id).await?;
        if !viewer.is_admin() && !trips::is_participant(&mut conn, trip_id, viewer.id).await? {
            return Err(AppError::forbidden("only participants can read this trip's messages"));
        }
        let items = messages::list_for_trip(&mut conn, trip_id).await?;
        Ok(items)
    }
}

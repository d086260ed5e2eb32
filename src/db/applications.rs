use chrono::{DateTime, Utc};
use sqlx::SqliteConnection;

use crate::models::application::{Application, ApplicationStatus};

const APPLICATION_COLUMNS: &str =
    "id, trip_id, applicant_id, message, status, created_at, decided_at";

pub async fn insert(
    conn: &mut SqliteConnection,
    trip_id: i64,
    applicant_id: i64,
    message: Option<&str>,
    now: DateTime<Utc>,
) -> Result<i64, sqlx::Error> {
    let result = sqlx::query(
        "INSERT INTO trip_applications (trip_id, applicant_id, message, status, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5)",
    )
    .bind(trip_id)
    .bind(applicant_id)
    .bind(message)
    .bind(ApplicationStatus::Pending)
    .bind(now)
    .execute(&mut *conn)
    .await?;
    Ok(result.last_insert_rowid())
}

pub async fn find(
    conn: &mut SqliteConnection,
    id: i64,
) -> Result<Option<Application>, sqlx::Error> {
    let application = sqlx::query_as::<_, Application>(&format!(
        "SELECT {APPLICATION_COLUMNS} FROM trip_applications WHERE id = ?1"
    ))
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?;
    Ok(application)
}

/// The applicant's non-cancelled application on this trip, if any.
pub async fn find_live(
    conn: &mut SqliteConnection,
    trip_id: i64,
    applicant_id: i64,
) -> Result<Option<Application>, sqlx::Error> {
    let application = sqlx::query_as::<_, Application>(&format!(
        "SELECT {APPLICATION_COLUMNS} FROM trip_applications
         WHERE trip_id = ?1 AND applicant_id = ?2 AND status != ?3"
    ))
    .bind(trip_id)
    .bind(applicant_id)
    .bind(ApplicationStatus::Cancelled)
    .fetch_optional(&mut *conn)
    .await?;
    Ok(application)
}

pub async fn set_status(
    conn: &mut SqliteConnection,
    id: i64,
    status: ApplicationStatus,
    decided_at: DateTime<Utc>,
) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE trip_applications SET status = ?1, decided_at = ?2 WHERE id = ?3")
        .bind(status)
        .bind(decided_at)
        .bind(id)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

pub async fn list_for_trip(
    conn: &mut SqliteConnection,
    trip_id: i64,
) -> Result<Vec<Application>, sqlx::Error> {
    let applications = sqlx::query_as::<_, Application>(&format!(
        "SELECT {APPLICATION_COLUMNS} FROM trip_applications WHERE trip_id = ?1 ORDER BY id ASC"
    ))
    .bind(trip_id)
    .fetch_all(&mut *conn)
    .await?;
    Ok(applications)
}

pub async fn list_for_applicant(
    conn: &mut SqliteConnection,
    applicant_id: i64,
) -> Result<Vec<Application>, sqlx::Error> {
    let applications = sqlx::query_as::<_, Application>(&format!(
        "SELECT {APPLICATION_COLUMNS} FROM trip_applications
         WHERE applicant_id = ?1 ORDER BY id DESC"
    ))
    .bind(applicant_id)
    .fetch_all(&mut *conn)
    .await?;
    Ok(applications)
}

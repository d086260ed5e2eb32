use chrono::{DateTime, Utc};
use sqlx::SqliteConnection;

use crate::models::message::TripMessage;

pub async fn insert(
    conn: &mut SqliteConnection,
    trip_id: i64,
    author_id: i64,
    content: &str,
    is_system: bool,
    now: DateTime<Utc>,
) -> Result<TripMessage, sqlx::Error> {
    let result = sqlx::query(
        "INSERT INTO trip_messages (trip_id, author_id, content, is_system, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5)",
    )
    .bind(trip_id)
    .bind(author_id)
    .bind(content)
    .bind(is_system)
    .bind(now)
    .execute(&mut *conn)
    .await?;

    Ok(TripMessage {
        id: result.last_insert_rowid(),
        trip_id,
        author_id,
        content: content.to_string(),
        is_system,
        created_at: now,
    })
}

pub async fn list_for_trip(
    conn: &mut SqliteConnection,
    trip_id: i64,
) -> Result<Vec<TripMessage>, sqlx::Error> {
    sqlx::query_as::<_, TripMessage>(
        "SELECT id, trip_id, author_id, content, is_system, created_at
         FROM trip_messages WHERE trip_id = ?1 ORDER BY id ASC",
    )
    .bind(trip_id)
    .fetch_all(&mut *conn)
    .await
}

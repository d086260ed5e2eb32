//! Queries over `trips` and the `trip_participants` association.

use chrono::{DateTime, Utc};
use futures_util::TryStreamExt;
use sqlx::{QueryBuilder, Sqlite, SqliteConnection};

use crate::models::{
    trip::{NewTrip, Trip, TripFilter, TripStatus},
    user::UserProfile,
};

const TRIP_COLUMNS: &str = "id, title, description, destination, start_date, end_date, \
     max_participants, cost_per_person, status, organizer_id, created_at";

pub async fn insert(
    conn: &mut SqliteConnection,
    input: &NewTrip,
    organizer_id: i64,
    status: TripStatus,
    now: DateTime<Utc>,
) -> Result<i64, sqlx::Error> {
    let result = sqlx::query(
        "INSERT INTO trips (title, description, destination, start_date, end_date,
                            max_participants, cost_per_person, status, organizer_id, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
    )
    .bind(&input.title)
    .bind(&input.description)
    .bind(&input.destination)
    .bind(input.start_date)
    .bind(input.end_date)
    .bind(input.max_participants)
    .bind(input.cost_per_person)
    .bind(status)
    .bind(organizer_id)
    .bind(now)
    .execute(&mut *conn)
    .await?;
    Ok(result.last_insert_rowid())
}

pub async fn find(conn: &mut SqliteConnection, id: i64) -> Result<Option<Trip>, sqlx::Error> {
    let trip = sqlx::query_as::<_, Trip>(&format!("SELECT {TRIP_COLUMNS} FROM trips WHERE id = ?1"))
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(trip)
}

/// Writes every mutable column of `trip` back.
pub async fn update(conn: &mut SqliteConnection, trip: &Trip) -> Result<(), sqlx::Error> {
    sqlx::query(
        "UPDATE trips SET title = ?1, description = ?2, destination = ?3, start_date = ?4,
                          end_date = ?5, max_participants = ?6, cost_per_person = ?7, status = ?8
         WHERE id = ?9",
    )
    .bind(&trip.title)
    .bind(&trip.description)
    .bind(&trip.destination)
    .bind(trip.start_date)
    .bind(trip.end_date)
    .bind(trip.max_participants)
    .bind(trip.cost_per_person)
    .bind(trip.status)
    .bind(trip.id)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

pub async fn set_status(
    conn: &mut SqliteConnection,
    id: i64,
    status: TripStatus,
) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE trips SET status = ?1 WHERE id = ?2")
        .bind(status)
        .bind(id)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

/// One page of trips ordered by start date. Status, date range and ASCII
/// destination filters run in SQL along with `LIMIT`/`OFFSET`. SQLite's
/// `lower` folds ASCII only, so a non-ASCII destination term streams the
/// filtered rows and matches here until the page is full.
pub async fn list(
    conn: &mut SqliteConnection,
    filter: &TripFilter,
    skip: i64,
    limit: i64,
) -> Result<Vec<Trip>, sqlx::Error> {
    let needle = filter.destination_needle();
    let in_sql = needle.map_or(true, |needle| needle.is_ascii());

    let mut query: QueryBuilder<Sqlite> =
        QueryBuilder::new(format!("SELECT {TRIP_COLUMNS} FROM trips WHERE 1 = 1"));
    if let Some(status) = filter.status {
        query.push(" AND status = ").push_bind(status);
    }
    if let Some(min_date) = filter.min_date {
        query.push(" AND start_date >= ").push_bind(min_date);
    }
    if let Some(max_date) = filter.max_date {
        query.push(" AND start_date <= ").push_bind(max_date);
    }
    if let Some(needle) = needle.filter(|_| in_sql) {
        query
            .push(" AND instr(lower(destination), ")
            .push_bind(needle.to_ascii_lowercase())
            .push(") > 0");
    }
    query.push(" ORDER BY start_date ASC, id ASC");

    if in_sql {
        query.push(" LIMIT ").push_bind(limit).push(" OFFSET ").push_bind(skip);
        let trips = query.build_query_as::<Trip>().fetch_all(&mut *conn).await?;
        return Ok(trips);
    }

    let mut rows = query.build_query_as::<Trip>().fetch(&mut *conn);
    let mut page = Vec::new();
    let mut skipped = 0;
    while let Some(trip) = rows.try_next().await? {
        if !filter.matches_destination(&trip.destination) {
            continue;
        }
        if skipped < skip {
            skipped += 1;
            continue;
        }
        page.push(trip);
        if page.len() as i64 >= limit {
            break;
        }
    }
    Ok(page)
}

pub async fn add_participant(
    conn: &mut SqliteConnection,
    trip_id: i64,
    user_id: i64,
    now: DateTime<Utc>,
) -> Result<(), sqlx::Error> {
    sqlx::query("INSERT INTO trip_participants (trip_id, user_id, joined_at) VALUES (?1, ?2, ?3)")
        .bind(trip_id)
        .bind(user_id)
        .bind(now)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

pub async fn is_participant(
    conn: &mut SqliteConnection,
    trip_id: i64,
    user_id: i64,
) -> Result<bool, sqlx::Error> {
    let found: Option<i64> = sqlx::query_scalar(
        "SELECT 1 FROM trip_participants WHERE trip_id = ?1 AND user_id = ?2",
    )
    .bind(trip_id)
    .bind(user_id)
    .fetch_optional(&mut *conn)
    .await?;
    Ok(found.is_some())
}

pub async fn participant_count(
    conn: &mut SqliteConnection,
    trip_id: i64,
) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar("SELECT COUNT(*) FROM trip_participants WHERE trip_id = ?1")
        .bind(trip_id)
        .fetch_one(&mut *conn)
        .await
}

/// Participants in join order.
pub async fn participants(
    conn: &mut SqliteConnection,
    trip_id: i64,
) -> Result<Vec<UserProfile>, sqlx::Error> {
    sqlx::query_as::<_, UserProfile>(
        "SELECT u.id, u.username, u.email, u.full_name, u.bio, u.rating, u.role,
                u.is_verified, u.created_at
         FROM trip_participants p
         JOIN users u ON u.id = p.user_id
         WHERE p.trip_id = ?1
         ORDER BY p.joined_at ASC, p.rowid ASC",
    )
    .bind(trip_id)
    .fetch_all(&mut *conn)
    .await
}

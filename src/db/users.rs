use chrono::{DateTime, Utc};
use sqlx::SqliteConnection;

use crate::models::user::{NewUser, User, UserProfile, UserRole};

const USER_COLUMNS: &str =
    "id, username, email, password_hash, full_name, bio, rating, role, is_verified, created_at";
const PROFILE_COLUMNS: &str =
    "id, username, email, full_name, bio, rating, role, is_verified, created_at";

pub async fn insert(
    conn: &mut SqliteConnection,
    input: &NewUser,
    password_hash: &str,
    role: UserRole,
    now: DateTime<Utc>,
) -> Result<i64, sqlx::Error> {
    let result = sqlx::query(
        "INSERT INTO users (username, email, password_hash, full_name, bio, role, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
    )
    .bind(input.username.trim())
    .bind(input.email.trim().to_lowercase())
    .bind(password_hash)
    .bind(&input.full_name)
    .bind(&input.bio)
    .bind(role)
    .bind(now)
    .execute(&mut *conn)
    .await?;
    Ok(result.last_insert_rowid())
}

pub async fn find_by_id(conn: &mut SqliteConnection, id: i64) -> Result<Option<User>, sqlx::Error> {
    let user = sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1"))
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(user)
}

/// Looks a user up by username or (case-insensitive) email.
pub async fn find_by_identifier(
    conn: &mut SqliteConnection,
    identifier: &str,
) -> Result<Option<User>, sqlx::Error> {
    let user = sqlx::query_as::<_, User>(&format!(
        "SELECT {USER_COLUMNS} FROM users WHERE username = ?1 OR email = lower(?1)"
    ))
    .bind(identifier.trim())
    .fetch_optional(&mut *conn)
    .await?;
    Ok(user)
}

pub async fn profile(
    conn: &mut SqliteConnection,
    id: i64,
) -> Result<Option<UserProfile>, sqlx::Error> {
    let profile = sqlx::query_as::<_, UserProfile>(&format!(
        "SELECT {PROFILE_COLUMNS} FROM users WHERE id = ?1"
    ))
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?;
    Ok(profile)
}

pub async fn list_profiles(conn: &mut SqliteConnection) -> Result<Vec<UserProfile>, sqlx::Error> {
    let profiles = sqlx::query_as::<_, UserProfile>(&format!(
        "SELECT {PROFILE_COLUMNS} FROM users ORDER BY created_at DESC, id DESC"
    ))
    .fetch_all(&mut *conn)
    .await?;
    Ok(profiles)
}

pub async fn update_role(
    conn: &mut SqliteConnection,
    id: i64,
    role: UserRole,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("UPDATE users SET role = ?1 WHERE id = ?2")
        .bind(role)
        .bind(id)
        .execute(&mut *conn)
        .await?;
    Ok(result.rows_affected() > 0)
}

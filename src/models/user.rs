use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;

use crate::error::AppError;

pub const USERNAME_MIN: usize = 3;
pub const USERNAME_MAX: usize = 50;
pub const PASSWORD_MIN: usize = 8;
pub const FULL_NAME_MAX: usize = 100;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum UserRole {
    #[default]
    Traveler,
    Organizer,
    Admin,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::Traveler => "traveler",
            UserRole::Organizer => "organizer",
            UserRole::Admin => "admin",
        }
    }

    pub fn is_elevated(&self) -> bool {
        matches!(self, UserRole::Admin)
    }
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub full_name: Option<String>,
    pub bio: Option<String>,
    pub rating: f64,
    pub role: UserRole,
    pub is_verified: bool,
    pub created_at: DateTime<Utc>,
}

/// Public projection of a user; never carries the password hash.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct UserProfile {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub full_name: Option<String>,
    pub bio: Option<String>,
    pub rating: f64,
    pub role: UserRole,
    pub is_verified: bool,
    pub created_at: DateTime<Utc>,
}

impl From<User> for UserProfile {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            email: user.email,
            full_name: user.full_name,
            bio: user.bio,
            rating: user.rating,
            role: user.role,
            is_verified: user.is_verified,
            created_at: user.created_at,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub bio: Option<String>,
}

impl NewUser {
    pub fn validate(&self) -> Result<(), AppError> {
        let username_len = self.username.trim().chars().count();
        if !(USERNAME_MIN..=USERNAME_MAX).contains(&username_len) {
            return Err(AppError::validation(format!(
                "username must be between {USERNAME_MIN} and {USERNAME_MAX} characters"
            )));
        }
        if !looks_like_email(&self.email) {
            return Err(AppError::validation("email address is not valid"));
        }
        if self.password.chars().count() < PASSWORD_MIN {
            return Err(AppError::validation(format!(
                "password must be at least {PASSWORD_MIN} characters"
            )));
        }
        if let Some(name) = &self.full_name {
            if name.chars().count() > FULL_NAME_MAX {
                return Err(AppError::validation(format!(
                    "full name must be at most {FULL_NAME_MAX} characters"
                )));
            }
        }
        Ok(())
    }
}

fn looks_like_email(raw: &str) -> bool {
    let raw = raw.trim();
    match raw.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && !raw.contains(char::is_whitespace)
        }
        None => false,
    }
}

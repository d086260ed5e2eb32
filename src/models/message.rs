use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::error::AppError;

pub const MESSAGE_MAX: usize = 1000;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct TripMessage {
    pub id: i64,
    pub trip_id: i64,
    pub author_id: i64,
    pub content: String,
    pub is_system: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewMessage {
    pub content: String,
}

impl NewMessage {
    pub fn validate(&self) -> Result<(), AppError> {
        let len = self.content.trim().chars().count();
        if len == 0 {
            return Err(AppError::validation("message must not be empty"));
        }
        if self.content.chars().count() > MESSAGE_MAX {
            return Err(AppError::validation(format!(
                "message must be at most {MESSAGE_MAX} characters"
            )));
        }
        Ok(())
    }
}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;

use crate::error::AppError;

pub const APPLICATION_MESSAGE_MAX: usize = 500;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum ApplicationStatus {
    Pending,
    Approved,
    Rejected,
    Cancelled,
}

impl ApplicationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ApplicationStatus::Pending => "pending",
            ApplicationStatus::Approved => "approved",
            ApplicationStatus::Rejected => "rejected",
            ApplicationStatus::Cancelled => "cancelled",
        }
    }

    /// Only pending applications move, and only once.
    pub fn can_transition_to(self, next: ApplicationStatus) -> bool {
        matches!(
            (self, next),
            (
                ApplicationStatus::Pending,
                ApplicationStatus::Approved | ApplicationStatus::Rejected | ApplicationStatus::Cancelled
            )
        )
    }
}

impl fmt::Display for ApplicationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Application {
    pub id: i64,
    pub trip_id: i64,
    pub applicant_id: i64,
    pub message: Option<String>,
    pub status: ApplicationStatus,
    pub created_at: DateTime<Utc>,
    pub decided_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewApplication {
    #[serde(default)]
    pub message: Option<String>,
}

impl NewApplication {
    /// Blank messages are stored as absent.
    pub fn normalized_message(&self) -> Result<Option<String>, AppError> {
        let message = self
            .message
            .as_deref()
            .map(str::trim)
            .filter(|text| !text.is_empty());
        if let Some(text) = message {
            if text.chars().count() > APPLICATION_MESSAGE_MAX {
                return Err(AppError::validation(format!(
                    "application message must be at most {APPLICATION_MESSAGE_MAX} characters"
                )));
            }
        }
        Ok(message.map(str::to_string))
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApplicationDecision {
    pub status: ApplicationStatus,
}

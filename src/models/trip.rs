use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;

use crate::{error::AppError, models::user::UserProfile};

pub const TITLE_MIN: usize = 5;
pub const TITLE_MAX: usize = 200;
pub const DESCRIPTION_MIN: usize = 20;
pub const DESTINATION_MIN: usize = 2;
pub const PARTICIPANTS_MIN: i64 = 2;
pub const PARTICIPANTS_MAX: i64 = 20;
pub const LIST_LIMIT_MAX: i64 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum TripStatus {
    Planning,
    Recruiting,
    Confirmed,
    InProgress,
    Completed,
    Cancelled,
}

impl TripStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TripStatus::Planning => "planning",
            TripStatus::Recruiting => "recruiting",
            TripStatus::Confirmed => "confirmed",
            TripStatus::InProgress => "in_progress",
            TripStatus::Completed => "completed",
            TripStatus::Cancelled => "cancelled",
        }
    }

    /// Transition table for the trip lifecycle.
    pub fn allowed_next(self) -> &'static [TripStatus] {
        use TripStatus::{Cancelled, Completed, Confirmed, InProgress, Planning, Recruiting};
        match self {
            Planning => &[Recruiting, Cancelled],
            Recruiting => &[Confirmed, Cancelled],
            Confirmed => &[InProgress, Recruiting, Cancelled],
            InProgress => &[Completed, Cancelled],
            Completed | Cancelled => &[],
        }
    }

    pub fn can_transition_to(self, next: TripStatus) -> bool {
        self.allowed_next().contains(&next)
    }

    pub fn is_terminal(self) -> bool {
        self.allowed_next().is_empty()
    }
}

impl fmt::Display for TripStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Trip {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub destination: String,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub max_participants: i64,
    pub cost_per_person: Option<f64>,
    pub status: TripStatus,
    pub organizer_id: i64,
    pub created_at: DateTime<Utc>,
}

impl Trip {
    pub fn is_organizer(&self, user_id: i64) -> bool {
        self.organizer_id == user_id
    }

    fn validate(&self) -> Result<(), AppError> {
        validate_fields(
            &self.title,
            &self.description,
            &self.destination,
            self.start_date,
            self.end_date,
            self.max_participants,
            self.cost_per_person,
        )
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TripWithParticipants {
    #[serde(flatten)]
    pub trip: Trip,
    pub organizer: UserProfile,
    pub participants: Vec<UserProfile>,
}

fn default_max_participants() -> i64 {
    PARTICIPANTS_MIN
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewTrip {
    pub title: String,
    pub description: String,
    pub destination: String,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    #[serde(default = "default_max_participants")]
    pub max_participants: i64,
    #[serde(default)]
    pub cost_per_person: Option<f64>,
}

impl NewTrip {
    /// Field constraints plus the rule that a trip must start after `now`.
    pub fn validate(&self, now: DateTime<Utc>) -> Result<(), AppError> {
        validate_fields(
            &self.title,
            &self.description,
            &self.destination,
            self.start_date,
            self.end_date,
            self.max_participants,
            self.cost_per_person,
        )?;
        if self.start_date <= now {
            return Err(AppError::validation("start date cannot be in the past"));
        }
        Ok(())
    }
}

/// Partial update; absent fields stay untouched. `cost_per_person` can be
/// cleared with an explicit `null`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TripPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub destination: Option<String>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub max_participants: Option<i64>,
    #[serde(default, with = "::serde_with::rust::double_option")]
    pub cost_per_person: Option<Option<f64>>,
    pub status: Option<TripStatus>,
}

impl TripPatch {
    /// Merges the patch into `trip` and re-validates the result. Status is
    /// left alone; the lifecycle manager applies it through the transition
    /// table.
    pub fn apply_fields(&self, trip: &mut Trip, participant_count: i64) -> Result<(), AppError> {
        let mut merged = trip.clone();
        if let Some(title) = &self.title {
            merged.title = title.clone();
        }
        if let Some(description) = &self.description {
            merged.description = description.clone();
        }
        if let Some(destination) = &self.destination {
            merged.destination = destination.clone();
        }
        if let Some(start) = self.start_date {
            merged.start_date = start;
        }
        if let Some(end) = self.end_date {
            merged.end_date = end;
        }
        if let Some(max) = self.max_participants {
            merged.max_participants = max;
        }
        if let Some(cost) = self.cost_per_person {
            merged.cost_per_person = cost;
        }

        merged.validate()?;
        if merged.max_participants < participant_count {
            return Err(AppError::validation(format!(
                "max participants cannot drop below the current {participant_count} participants"
            )));
        }

        *trip = merged;
        Ok(())
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TripFilter {
    pub skip: Option<i64>,
    pub limit: Option<i64>,
    pub destination: Option<String>,
    pub status: Option<TripStatus>,
    pub min_date: Option<DateTime<Utc>>,
    pub max_date: Option<DateTime<Utc>>,
}

impl TripFilter {
    /// Returns `(skip, limit)` after range checks.
    pub fn page(&self) -> Result<(i64, i64), AppError> {
        let skip = self.skip.unwrap_or(0);
        if skip < 0 {
            return Err(AppError::validation("skip must not be negative"));
        }
        let limit = self.limit.unwrap_or(LIST_LIMIT_MAX);
        if !(1..=LIST_LIMIT_MAX).contains(&limit) {
            return Err(AppError::validation(format!(
                "limit must be between 1 and {LIST_LIMIT_MAX}"
            )));
        }
        Ok((skip, limit))
    }

    /// Trimmed destination search term, if one was given.
    pub fn destination_needle(&self) -> Option<&str> {
        self.destination
            .as_deref()
            .map(str::trim)
            .filter(|needle| !needle.is_empty())
    }

    /// Case-insensitive substring match on the destination, with full
    /// Unicode case folding.
    pub fn matches_destination(&self, destination: &str) -> bool {
        match self.destination_needle() {
            Some(needle) => destination
                .to_lowercase()
                .contains(&needle.to_lowercase()),
            None => true,
        }
    }
}

fn validate_fields(
    title: &str,
    description: &str,
    destination: &str,
    start_date: DateTime<Utc>,
    end_date: DateTime<Utc>,
    max_participants: i64,
    cost_per_person: Option<f64>,
) -> Result<(), AppError> {
    let title_len = title.chars().count();
    if !(TITLE_MIN..=TITLE_MAX).contains(&title_len) {
        return Err(AppError::validation(format!(
            "title must be between {TITLE_MIN} and {TITLE_MAX} characters"
        )));
    }
    if description.chars().count() < DESCRIPTION_MIN {
        return Err(AppError::validation(format!(
            "description must be at least {DESCRIPTION_MIN} characters"
        )));
    }
    if destination.chars().count() < DESTINATION_MIN {
        return Err(AppError::validation(format!(
            "destination must be at least {DESTINATION_MIN} characters"
        )));
    }
    if end_date <= start_date {
        return Err(AppError::validation("end date must be after start date"));
    }
    if !(PARTICIPANTS_MIN..=PARTICIPANTS_MAX).contains(&max_participants) {
        return Err(AppError::validation(format!(
            "max participants must be between {PARTICIPANTS_MIN} and {PARTICIPANTS_MAX}"
        )));
    }
    if let Some(cost) = cost_per_person {
        if !cost.is_finite() || cost < 0.0 {
            return Err(AppError::validation("cost per person must be zero or more"));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn new_trip(now: DateTime<Utc>) -> NewTrip {
        NewTrip {
            title: "Alps hut tour".into(),
            description: "Five days hut to hut across the Stubai range.".into(),
            destination: "Innsbruck".into(),
            start_date: now + Duration::days(1),
            end_date: now + Duration::days(3),
            max_participants: 4,
            cost_per_person: Some(250.0),
        }
    }

    fn trip(now: DateTime<Utc>) -> Trip {
        let input = new_trip(now);
        Trip {
            id: 1,
            title: input.title,
            description: input.description,
            destination: input.destination,
            start_date: input.start_date,
            end_date: input.end_date,
            max_participants: input.max_participants,
            cost_per_person: input.cost_per_person,
            status: TripStatus::Recruiting,
            organizer_id: 7,
            created_at: now,
        }
    }

    #[test]
    fn terminal_states_have_no_exits() {
        assert!(TripStatus::Completed.is_terminal());
        assert!(TripStatus::Cancelled.is_terminal());
        assert!(!TripStatus::InProgress.is_terminal());
    }

    #[test]
    fn cancellation_reachable_from_every_live_state() {
        for status in [
            TripStatus::Planning,
            TripStatus::Recruiting,
            TripStatus::Confirmed,
            TripStatus::InProgress,
        ] {
            assert!(status.can_transition_to(TripStatus::Cancelled), "{status}");
        }
    }

    #[test]
    fn only_confirmed_trips_can_start() {
        for status in [
            TripStatus::Planning,
            TripStatus::Recruiting,
            TripStatus::Confirmed,
            TripStatus::InProgress,
            TripStatus::Completed,
            TripStatus::Cancelled,
        ] {
            assert_eq!(
                status.can_transition_to(TripStatus::InProgress),
                status == TripStatus::Confirmed,
                "{status}"
            );
        }
    }

    #[test]
    fn status_serializes_snake_case() {
        let json = serde_json::to_string(&TripStatus::InProgress).unwrap();
        assert_eq!(json, "\"in_progress\"");
        assert_eq!(TripStatus::InProgress.to_string(), "in_progress");
    }

    #[test]
    fn past_or_present_start_is_rejected() {
        let now = Utc::now();
        let mut input = new_trip(now);
        input.start_date = now - Duration::minutes(1);
        assert!(matches!(input.validate(now), Err(AppError::Validation(_))));
        input.start_date = now;
        assert!(matches!(input.validate(now), Err(AppError::Validation(_))));
    }

    #[test]
    fn end_must_follow_start() {
        let now = Utc::now();
        let mut input = new_trip(now);
        input.end_date = input.start_date;
        assert!(matches!(input.validate(now), Err(AppError::Validation(_))));
    }

    #[test]
    fn capacity_bounds_are_enforced() {
        let now = Utc::now();
        let mut input = new_trip(now);
        input.max_participants = 1;
        assert!(input.validate(now).is_err());
        input.max_participants = 21;
        assert!(input.validate(now).is_err());
        input.max_participants = 20;
        assert!(input.validate(now).is_ok());
    }

    #[test]
    fn max_participants_defaults_to_two() {
        let body = serde_json::json!({
            "title": "Weekend in Riga",
            "description": "Old town, markets and a day at Jurmala beach.",
            "destination": "Riga",
            "start_date": "2099-05-01T08:00:00Z",
            "end_date": "2099-05-03T20:00:00Z"
        });
        let input: NewTrip = serde_json::from_value(body).unwrap();
        assert_eq!(input.max_participants, 2);
        assert_eq!(input.cost_per_person, None);
    }

    #[test]
    fn patch_touches_only_present_fields() {
        let now = Utc::now();
        let mut current = trip(now);
        let patch: TripPatch =
            serde_json::from_value(serde_json::json!({ "title": "Alps hut tour II" })).unwrap();
        patch.apply_fields(&mut current, 1).unwrap();
        assert_eq!(current.title, "Alps hut tour II");
        assert_eq!(current.destination, "Innsbruck");
        assert_eq!(current.cost_per_person, Some(250.0));
    }

    #[test]
    fn patch_distinguishes_null_cost_from_absent_cost() {
        let absent: TripPatch = serde_json::from_value(serde_json::json!({})).unwrap();
        assert_eq!(absent.cost_per_person, None);

        let cleared: TripPatch =
            serde_json::from_value(serde_json::json!({ "cost_per_person": null })).unwrap();
        assert_eq!(cleared.cost_per_person, Some(None));

        let now = Utc::now();
        let mut current = trip(now);
        cleared.apply_fields(&mut current, 1).unwrap();
        assert_eq!(current.cost_per_person, None);
    }

    #[test]
    fn rejected_patch_leaves_trip_unchanged() {
        let now = Utc::now();
        let mut current = trip(now);
        let before = current.clone();
        let patch = TripPatch {
            title: Some("New title".into()),
            end_date: Some(current.start_date - Duration::hours(1)),
            ..TripPatch::default()
        };
        assert!(matches!(
            patch.apply_fields(&mut current, 1),
            Err(AppError::Validation(_))
        ));
        assert_eq!(current, before);
    }

    #[test]
    fn capacity_cannot_shrink_below_participants() {
        let now = Utc::now();
        let mut current = trip(now);
        let patch = TripPatch {
            max_participants: Some(3),
            ..TripPatch::default()
        };
        assert!(patch.apply_fields(&mut current, 4).is_err());
        assert!(patch.apply_fields(&mut current, 3).is_ok());
        assert_eq!(current.max_participants, 3);
    }

    #[test]
    fn page_defaults_and_bounds() {
        assert_eq!(TripFilter::default().page().unwrap(), (0, 100));
        let filter = TripFilter {
            skip: Some(-1),
            ..TripFilter::default()
        };
        assert!(filter.page().is_err());
        let filter = TripFilter {
            limit: Some(0),
            ..TripFilter::default()
        };
        assert!(filter.page().is_err());
        let filter = TripFilter {
            limit: Some(101),
            ..TripFilter::default()
        };
        assert!(filter.page().is_err());
    }

    #[test]
    fn destination_filter_is_case_insensitive_substring() {
        let filter = TripFilter {
            destination: Some("PARIS".into()),
            ..TripFilter::default()
        };
        assert!(filter.matches_destination("Paris, France"));
        assert!(filter.matches_destination("disneyland paris"));
        assert!(!filter.matches_destination("Rome"));

        let filter = TripFilter {
            destination: Some("санкт".into()),
            ..TripFilter::default()
        };
        assert!(filter.matches_destination("Санкт-Петербург"));

        assert!(TripFilter::default().matches_destination("anything"));
    }
}

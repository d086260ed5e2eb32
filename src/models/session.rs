use chrono::{DateTime, Utc};
use sqlx::FromRow;

#[derive(Debug, Clone, FromRow)]
pub struct Session {
    pub id: String,
    pub user_id: i64,
    pub created_at: DateTime<Utc>,
    pub last_seen_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
}

impl Session {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|expires| expires <= now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn session_without_expiry_never_expires() {
        let now = Utc::now();
        let mut session = Session {
            id: "s".into(),
            user_id: 1,
            created_at: now,
            last_seen_at: now,
            expires_at: None,
        };
        assert!(!session.is_expired(now + Duration::days(365)));

        session.expires_at = Some(now + Duration::hours(1));
        assert!(!session.is_expired(now));
        assert!(session.is_expired(now + Duration::hours(1)));
    }
}

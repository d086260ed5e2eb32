use std::{env, net::SocketAddr};

use chrono::Duration;

use crate::error::AppError;

const DEFAULT_SESSION_TTL_HOURS: i64 = 24 * 7;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub listen_addr: SocketAddr,
    pub cookie_secret: String,
    pub session_ttl: Duration,
    /// Accounts registered with one of these addresses get the admin role.
    pub admin_emails: Vec<String>,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, AppError> {
        let database_url =
            env::var("DATABASE_URL").unwrap_or_else(|_| "sqlite://travel.db".to_string());
        let listen_addr: SocketAddr = env::var("APP_LISTEN_ADDR")
            .unwrap_or_else(|_| "127.0.0.1:3000".to_string())
            .parse()
            .map_err(|err| AppError::Config(format!("invalid APP_LISTEN_ADDR: {err}")))?;

        let cookie_secret = env::var("COOKIE_SECRET")
            .unwrap_or_else(|_| "change-me-tripmates-cookie-secret".to_string());

        let session_ttl = match env::var("SESSION_TTL_HOURS") {
            Ok(raw) => parse_ttl_hours(&raw)?,
            Err(_) => Duration::hours(DEFAULT_SESSION_TTL_HOURS),
        };

        let admin_emails = env::var("ADMIN_EMAILS")
            .map(|raw| parse_email_list(&raw))
            .unwrap_or_default();

        Ok(Self {
            database_url,
            listen_addr,
            cookie_secret,
            session_ttl,
            admin_emails,
        })
    }

    pub fn is_admin_email(&self, email: &str) -> bool {
        let email = email.trim().to_lowercase();
        self.admin_emails.iter().any(|admin| *admin == email)
    }
}

fn parse_email_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|item| item.trim().to_lowercase())
        .filter(|item| !item.is_empty())
        .collect()
}

fn parse_ttl_hours(raw: &str) -> Result<Duration, AppError> {
    let hours: i64 = raw
        .trim()
        .parse()
        .map_err(|err| AppError::Config(format!("invalid SESSION_TTL_HOURS: {err}")))?;
    if hours <= 0 {
        return Err(AppError::Config(
            "SESSION_TTL_HOURS must be positive".to_string(),
        ));
    }
    Ok(Duration::hours(hours))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ttl_accepts_positive_hours() {
        assert_eq!(parse_ttl_hours(" 12 ").unwrap(), Duration::hours(12));
    }

    #[test]
    fn admin_emails_are_normalized() {
        let emails = parse_email_list(" Root@Example.org, ,ops@example.org ");
        assert_eq!(emails, vec!["root@example.org", "ops@example.org"]);
    }

    #[test]
    fn ttl_rejects_zero_and_garbage() {
        assert!(matches!(parse_ttl_hours("0"), Err(AppError::Config(_))));
        assert!(matches!(parse_ttl_hours("soon"), Err(AppError::Config(_))));
    }
}

//! Identity collaborator: password accounts, cookie sessions and the
//! `CurrentUser` extractor the handlers authorize against.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use async_trait::async_trait;
use axum::{extract::FromRequestParts, http::request::Parts};
use axum_extra::extract::cookie::{Cookie, Key, PrivateCookieJar, SameSite};
use chrono::Utc;
use tracing::{debug, info};
use uuid::Uuid;

use crate::{
    db::{sessions, users},
    error::AppError,
    models::{
        session::Session,
        user::{NewUser, UserProfile, UserRole},
    },
    state::AppState,
};

pub const SESSION_COOKIE: &str = "tripmates_session";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedUser {
    pub id: i64,
    pub username: String,
    pub role: UserRole,
}

impl AuthenticatedUser {
    pub fn is_admin(&self) -> bool {
        self.role.is_elevated()
    }
}

#[derive(Debug, Clone, Default)]
pub struct CurrentUser(pub Option<AuthenticatedUser>);

#[async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        if let Some(user) = parts.extensions.get::<AuthenticatedUser>() {
            return Ok(Self(Some(user.clone())));
        }

        let jar = match PrivateCookieJar::<Key>::from_request_parts(parts, state).await {
            Ok(jar) => jar,
            Err(never) => match never {},
        };
        let Some(cookie) = jar.get(SESSION_COOKIE) else {
            return Ok(Self(None));
        };

        let user = resolve_session(state, cookie.value()).await?;
        if let Some(user) = &user {
            parts.extensions.insert(user.clone());
        }
        Ok(Self(user))
    }
}

impl CurrentUser {
    pub fn require_user(&self) -> Result<&AuthenticatedUser, AppError> {
        self.0.as_ref().ok_or(AppError::Unauthorized)
    }

    pub fn require_admin(&self) -> Result<&AuthenticatedUser, AppError> {
        let user = self.require_user()?;
        if user.is_admin() {
            Ok(user)
        } else {
            Err(AppError::forbidden("admin role required"))
        }
    }
}

pub fn hash_password(password: &str) -> Result<String, AppError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|err| AppError::Other(anyhow::anyhow!("password hashing failed: {err}")))
}

pub fn verify_password(password: &str, stored_hash: &str) -> Result<bool, AppError> {
    let parsed = PasswordHash::new(stored_hash)
        .map_err(|err| AppError::Other(anyhow::anyhow!("stored password hash is invalid: {err}")))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}

pub async fn register_user(state: &AppState, input: &NewUser) -> Result<UserProfile, AppError> {
    input.validate()?;
    let password_hash = hash_password(&input.password)?;
    let role = if state.config.is_admin_email(&input.email) {
        UserRole::Admin
    } else {
        UserRole::Traveler
    };

    let mut conn = state.db.acquire().await?;
    let id = users::insert(&mut conn, input, &password_hash, role, Utc::now())
        .await
        .map_err(|err| match AppError::from(err) {
            AppError::Conflict(_) => AppError::conflict("username or email already taken"),
            other => other,
        })?;
    let profile = users::profile(&mut conn, id)
        .await?
        .ok_or_else(|| AppError::not_found("user"))?;

    info!(user_id = id, username = %profile.username, role = %role, "user registered");
    Ok(profile)
}

pub async fn authenticate_user(
    state: &AppState,
    identifier: &str,
    password: &str,
) -> Result<AuthenticatedUser, AppError> {
    if identifier.trim().is_empty() || password.is_empty() {
        return Err(AppError::validation("identifier and password are required"));
    }

    let mut conn = state.db.acquire().await?;
    let user = users::find_by_identifier(&mut conn, identifier)
        .await?
        .ok_or(AppError::Unauthorized)?;
    if !verify_password(password, &user.password_hash)? {
        debug!(user_id = user.id, "password mismatch");
        return Err(AppError::Unauthorized);
    }

    Ok(AuthenticatedUser {
        id: user.id,
        username: user.username,
        role: user.role,
    })
}

pub async fn load_profile(state: &AppState, user_id: i64) -> Result<UserProfile, AppError> {
    let mut conn = state.db.acquire().await?;
    users::profile(&mut conn, user_id)
        .await?
        .ok_or_else(|| AppError::not_found("user"))
}

pub async fn create_session(state: &AppState, user_id: i64) -> Result<String, AppError> {
    let now = Utc::now();
    let session = Session {
        id: Uuid::new_v4().to_string(),
        user_id,
        created_at: now,
        last_seen_at: now,
        expires_at: Some(now + state.config.session_ttl),
    };

    let mut conn = state.db.acquire().await?;
    let purged = sessions::delete_expired(&mut conn, now).await?;
    if purged > 0 {
        debug!(purged, "expired sessions removed");
    }
    sessions::insert(&mut conn, &session).await?;
    Ok(session.id)
}

pub async fn destroy_session(state: &AppState, session_id: &str) -> Result<(), AppError> {
    let mut conn = state.db.acquire().await?;
    sessions::delete(&mut conn, session_id).await?;
    Ok(())
}

async fn resolve_session(
    state: &AppState,
    session_id: &str,
) -> Result<Option<AuthenticatedUser>, AppError> {
    let now = Utc::now();
    let mut conn = state.db.acquire().await?;
    let Some(session) = sessions::find(&mut conn, session_id).await? else {
        return Ok(None);
    };
    if session.is_expired(now) {
        sessions::delete(&mut conn, &session.id).await?;
        return Ok(None);
    }

    let Some(user) = users::find_by_id(&mut conn, session.user_id).await? else {
        return Ok(None);
    };
    sessions::touch(&mut conn, &session.id, now).await?;

    Ok(Some(AuthenticatedUser {
        id: user.id,
        username: user.username,
        role: user.role,
    }))
}

pub fn apply_session_cookie(jar: PrivateCookieJar, session_id: &str) -> PrivateCookieJar {
    let cookie = Cookie::build((SESSION_COOKIE, session_id.to_string()))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .build();
    jar.add(cookie)
}

pub fn clear_session_cookie(jar: PrivateCookieJar) -> PrivateCookieJar {
    jar.remove(Cookie::build((SESSION_COOKIE, "")).path("/"))
}

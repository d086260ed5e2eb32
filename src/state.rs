use axum::extract::FromRef;
use axum_extra::extract::cookie::Key;
use sha2::{Digest, Sha512};

use crate::{
    config::AppConfig,
    db::DbPool,
    services::{applications::ApplicationService, trip_log::TripLog, trips::TripService},
};

#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub db: DbPool,
    pub trips: TripService,
    pub applications: ApplicationService,
    pub log: TripLog,
    pub cookie_key: Key,
}

impl AppState {
    pub fn new(config: AppConfig, db: DbPool) -> Self {
        let digest = Sha512::digest(config.cookie_secret.as_bytes());
        let cookie_key = Key::from(&digest[..]);
        Self {
            trips: TripService::new(db.clone()),
            applications: ApplicationService::new(db.clone()),
            log: TripLog::new(db.clone()),
            config,
            db,
            cookie_key,
        }
    }
}

impl FromRef<AppState> for Key {
    fn from_ref(state: &AppState) -> Self {
        state.cookie_key.clone()
    }
}

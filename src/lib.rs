//! Group-travel coordination service: trips with a status lifecycle,
//! join applications against a capacity-bounded participant set, and a
//! trip-scoped message log.

pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;

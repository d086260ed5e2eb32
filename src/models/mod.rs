pub mod application;
pub mod message;
pub mod session;
pub mod trip;
pub mod user;

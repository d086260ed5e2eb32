pub mod applications;
pub mod trip_log;
pub mod trips;

pub mod auth;
pub mod configuration;
pub mod error;
pub mod startup;
pub mod telemetry;

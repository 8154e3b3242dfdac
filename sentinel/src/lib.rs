pub mod config;
pub mod daemon;
pub mod exit_codes;
mod metrics;
pub mod router;
pub mod server;

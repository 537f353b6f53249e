//! Blocking client for the ZONT thermostat cloud API.

pub mod models {
    pub mod zont;
}

pub mod client;
pub mod config;
pub mod transport;
pub mod utils;

pub use client::{ZontClient, ZontClientError, ensure_ok};
pub use config::Config;
pub use models::zont::DeviceId;

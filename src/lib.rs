// Public API for integration tests and the headless client

pub mod client;
pub mod config;
pub mod protocol;
pub mod routes;
pub mod state;
pub mod store;
pub mod types;
pub mod ws;

//! Geocoding backend for wx
//!
//! Resolves one-line US addresses to coordinates through the Census Bureau
//! geocoder and serves the result as plain text over HTTP.

pub mod client;
pub mod retry;
pub mod server;
pub mod types;

pub use client::CensusGeocoder;
pub use retry::RetryConfig;
pub use server::{router, serve, BackendState};
pub use types::*;

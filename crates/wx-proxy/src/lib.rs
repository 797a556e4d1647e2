//! Development server for wx
//!
//! Activates the configured framework plugins and forwards requests matching
//! the proxy table to their upstream targets.

pub mod error;
pub mod forward;
pub mod plugin;
pub mod server;

pub use error::ProxyError;
pub use forward::{forward, proxy_middleware, ProxyState};
pub use plugin::{plugin_for, DevPlugin, SvelteKitAssets};
pub use server::DevServer;

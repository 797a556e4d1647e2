pub mod config;
pub mod define;
pub mod error;
pub mod plugin;
pub mod proxy;

pub use config::{BackendConfig, Config, RetrySettings, ServerConfig, ValidationResult};
pub use define::{define_config, ResolvedConfig};
pub use error::{ConfigError, NetworkError, ReqwestErrorExt};
pub use plugin::{PluginDescriptor, SVELTEKIT_PLUGIN};
pub use proxy::{ProxyRule, ProxyTable};

use anyhow::Result;

/// Initialize logging for the wx binaries
pub fn init() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    tracing::info!("wx core initialized");
    Ok(())
}

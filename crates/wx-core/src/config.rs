use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use url::Url;

use crate::define::{define_config, ResolvedConfig};
use crate::error::ConfigError;
use crate::plugin::PluginDescriptor;
use crate::proxy::{ProxyRule, ProxyTable};

/// File name looked up in the working directory before the user config dir
pub const LOCAL_CONFIG_FILE: &str = "wx.toml";

const DEFAULT_BACKEND_URL: &str = "http://localhost:8080";
const DEFAULT_GEOCODER_URL: &str =
    "https://geocoding.geo.census.gov/geocoder/locations/onelineaddress";

/// Configuration validation errors
#[derive(Debug, Clone)]
pub struct ConfigValidationError {
    pub field: String,
    pub message: String,
}

impl std::fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Result of config validation
#[derive(Debug, Clone, Default)]
pub struct ValidationResult {
    pub errors: Vec<ConfigValidationError>,
    pub warnings: Vec<ConfigValidationError>,
}

impl ValidationResult {
    /// Returns true if there are no errors (warnings are OK)
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn add_error(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.errors.push(ConfigValidationError {
            field: field.into(),
            message: message.into(),
        });
    }

    pub fn add_warning(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.warnings.push(ConfigValidationError {
            field: field.into(),
            message: message.into(),
        });
    }

    /// Get a message summarizing all errors
    pub fn error_summary(&self) -> String {
        self.errors
            .iter()
            .map(|e| e.to_string())
            .collect::<Vec<_>>()
            .join("; ")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Framework integrations, in activation order
    pub plugins: Vec<PluginDescriptor>,

    /// Development server settings
    pub server: ServerConfig,

    /// Geocoding backend settings
    pub backend: BackendConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Interface the dev server binds to
    pub host: String,

    /// Dev server port
    pub port: u16,

    /// Path-prefix forwarding rules
    pub proxy: ProxyTable,

    /// Upper bound on a forwarded request, in seconds
    pub proxy_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        let mut proxy = ProxyTable::new();
        if let Ok(target) = Url::parse(DEFAULT_BACKEND_URL) {
            proxy.insert("/weather", ProxyRule::new(target).with_change_origin(true));
        }

        Self {
            host: "localhost".to_string(),
            port: 5173,
            proxy,
            proxy_timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    /// Interface the backend binds to
    pub host: String,

    /// Backend port
    pub port: u16,

    /// Census one-line address geocoder endpoint
    pub geocoder_url: String,

    /// Benchmark used when the request leaves it empty
    pub default_benchmark: String,

    /// Response format used when the request leaves it empty
    pub default_format: String,

    /// Upstream request timeout in seconds
    pub timeout_secs: u64,

    /// Retry policy for upstream geocoder calls
    pub retry: RetrySettings,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            geocoder_url: DEFAULT_GEOCODER_URL.to_string(),
            default_benchmark: "2020".to_string(),
            default_format: "json".to_string(),
            timeout_secs: 10,
            retry: RetrySettings::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrySettings {
    /// Maximum number of retry attempts (0 disables retries)
    pub max_retries: u32,
    /// Delay before the first retry; doubles on each attempt
    pub initial_delay_ms: u64,
    /// Upper bound for the delay between attempts
    pub max_delay_ms: u64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay_ms: 100,
            max_delay_ms: 5000,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            plugins: vec![PluginDescriptor::sveltekit()],
            server: ServerConfig::default(),
            backend: BackendConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from `path`, falling back to defaults if it doesn't exist
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::info!(
                "No config file at {}, using built-in defaults",
                path.display()
            );
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;

        let config: Config = toml::from_str(&contents)
            .map_err(|e| ConfigError::ParseError(e.to_string()))
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;

        Ok(config)
    }

    /// Load configuration and resolve it into the immutable form the servers use
    ///
    /// Returns an error if validation fails with critical errors.
    pub fn load_resolved(path: &Path) -> Result<ResolvedConfig> {
        let config = Self::load_from(path)?;
        let resolved = define_config(config)?;
        Ok(resolved)
    }

    /// Validate the configuration
    pub fn validate(&self) -> ValidationResult {
        let mut result = ValidationResult::default();

        if self.plugins.is_empty() {
            result.add_warning("plugins", "No plugins configured; only proxy rules will be served");
        }
        for (i, plugin) in self.plugins.iter().enumerate() {
            if !plugin.is_builtin() {
                result.add_error(
                    format!("plugins[{}].name", i),
                    format!("Unknown plugin: {}", plugin.name),
                );
            }
        }

        if self.server.port == 0 {
            result.add_error("server.port", "Port cannot be 0");
        }

        if self.server.proxy.is_empty() {
            result.add_warning("server.proxy", "No proxy rules configured");
        }
        for (prefix, rule) in self.server.proxy.iter() {
            let field = format!("server.proxy.\"{}\"", prefix);
            if !prefix.starts_with('/') {
                result.add_error(&field, "Path prefix must start with '/'");
            }
            Self::check_url(&rule.target, &format!("{}.target", field), &mut result);
        }

        if self.backend.port == 0 {
            result.add_error("backend.port", "Port cannot be 0");
        } else if self.backend.port == self.server.port && self.backend.host == self.server.host {
            result.add_warning(
                "backend.port",
                "Backend and dev server share the same address",
            );
        }

        self.validate_url(&self.backend.geocoder_url, "backend.geocoder_url", &mut result);

        if self.server.proxy_timeout_secs == 0 {
            result.add_error("server.proxy_timeout_secs", "Timeout must be greater than 0");
        }

        if self.backend.timeout_secs == 0 {
            result.add_error("backend.timeout_secs", "Timeout must be greater than 0");
        }

        if self.backend.retry.initial_delay_ms > self.backend.retry.max_delay_ms {
            result.add_warning(
                "backend.retry.initial_delay_ms",
                "Initial delay exceeds max delay; every retry waits max_delay_ms",
            );
        }

        result
    }

    /// Validate a URL field
    fn validate_url(&self, url_str: &str, field_name: &str, result: &mut ValidationResult) {
        match Url::parse(url_str) {
            Ok(url) => Self::check_url(&url, field_name, result),
            Err(e) => {
                result.add_error(field_name, format!("Invalid URL: {}", e));
            }
        }
    }

    fn check_url(url: &Url, field_name: &str, result: &mut ValidationResult) {
        if url.scheme() != "http" && url.scheme() != "https" {
            result.add_error(
                field_name,
                format!("URL must use http or https scheme, got: {}", url.scheme()),
            );
        }

        if url.host().is_none() {
            result.add_error(field_name, "URL must have a host");
        }

        if url.port() == Some(0) {
            result.add_error(field_name, "Port cannot be 0");
        }
    }

    /// Save configuration to `path`, creating parent directories
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).context("Failed to create config directory")?;
        }

        let contents = toml::to_string_pretty(self).context("Failed to serialize config")?;

        std::fs::write(path, contents)
            .with_context(|| format!("Failed to write config file {}", path.display()))?;

        Ok(())
    }

    /// `./wx.toml` when present, otherwise `<user config dir>/wx/config.toml`
    pub fn default_path() -> Result<PathBuf> {
        let local = PathBuf::from(LOCAL_CONFIG_FILE);
        if local.exists() {
            return Ok(local);
        }

        let config_dir = dirs::config_dir()
            .context("Failed to get config directory")?
            .join("wx");

        Ok(config_dir.join("config.toml"))
    }
}

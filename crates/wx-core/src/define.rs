//! Resolution of a user [`Config`] into the frozen form the servers run on.

use crate::config::{BackendConfig, Config, ServerConfig};
use crate::error::ConfigError;
use crate::plugin::PluginDescriptor;
use crate::proxy::ProxyTable;

/// Validated, immutable configuration produced by [`define_config`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedConfig {
    plugins: Vec<PluginDescriptor>,
    server: ServerConfig,
    backend: BackendConfig,
}

impl ResolvedConfig {
    pub fn plugins(&self) -> &[PluginDescriptor] {
        &self.plugins
    }

    pub fn server(&self) -> &ServerConfig {
        &self.server
    }

    pub fn proxy(&self) -> &ProxyTable {
        &self.server.proxy
    }

    pub fn backend(&self) -> &BackendConfig {
        &self.backend
    }

    /// Back to the editable form, e.g. for printing or saving
    pub fn to_config(&self) -> Config {
        Config {
            plugins: self.plugins.clone(),
            server: self.server.clone(),
            backend: self.backend.clone(),
        }
    }
}

/// Validate `config` and freeze it.
///
/// Each plugin name is kept once, at its first position. The function has no
/// side effects beyond logging validation warnings, so equal inputs always
/// produce equal outputs.
///
/// # Errors
/// Returns [`ConfigError::UnknownPlugin`] for a plugin the dev server cannot
/// activate and [`ConfigError::Invalid`] for any other validation error.
pub fn define_config(config: Config) -> Result<ResolvedConfig, ConfigError> {
    if let Some(unknown) = config.plugins.iter().find(|p| !p.is_builtin()) {
        return Err(ConfigError::UnknownPlugin(unknown.name.clone()));
    }

    let validation = config.validate();
    if !validation.is_valid() {
        return Err(ConfigError::Invalid(validation.error_summary()));
    }
    for warning in &validation.warnings {
        tracing::warn!("Config warning: {}", warning);
    }

    let Config {
        plugins,
        server,
        backend,
    } = config;

    let mut unique: Vec<PluginDescriptor> = Vec::with_capacity(plugins.len());
    for plugin in plugins {
        if unique.iter().any(|p| p.name == plugin.name) {
            tracing::warn!("Plugin {} listed more than once, keeping the first", plugin.name);
            continue;
        }
        unique.push(plugin);
    }

    Ok(ResolvedConfig {
        plugins: unique,
        server,
        backend,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_resolves_to_single_weather_rule() {
        let resolved = define_config(Config::default()).unwrap();

        assert_eq!(resolved.proxy().len(), 1);
        let (prefix, rule) = resolved.proxy().iter().next().unwrap();
        assert_eq!(prefix, "/weather");
        assert_eq!(rule.target.as_str(), "http://localhost:8080/");
        assert!(rule.change_origin);
    }

    #[test]
    fn test_framework_plugin_present_once() {
        let mut config = Config::default();
        let mut custom = PluginDescriptor::sveltekit();
        custom.root = "dist".into();
        config.plugins.push(custom);

        let resolved = define_config(config).unwrap();
        let count = resolved
            .plugins()
            .iter()
            .filter(|p| p.name == crate::plugin::SVELTEKIT_PLUGIN)
            .count();
        assert_eq!(count, 1);
        // First occurrence wins
        assert_eq!(resolved.plugins()[0].root, std::path::PathBuf::from("build"));
    }

    #[test]
    fn test_define_config_is_idempotent() {
        let first = define_config(Config::default()).unwrap();
        let second = define_config(Config::default()).unwrap();
        assert_eq!(first, second);

        let again = define_config(first.to_config()).unwrap();
        assert_eq!(first, again);
    }

    #[test]
    fn test_unknown_plugin_rejected() {
        let mut config = Config::default();
        config.plugins = vec![PluginDescriptor::new("vue")];
        let err = define_config(config).unwrap_err();
        assert!(matches!(err, ConfigError::UnknownPlugin(name) if name == "vue"));
    }

    #[test]
    fn test_invalid_config_rejected() {
        let mut config = Config::default();
        config.backend.port = 0;
        let err = define_config(config).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(msg) if msg.contains("backend.port")));
    }
}

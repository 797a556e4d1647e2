use std::path::PathBuf;

use axum::Router;
use tower_http::services::{ServeDir, ServeFile};
use wx_core::{ConfigError, PluginDescriptor, SVELTEKIT_PLUGIN};

/// Framework integration that contributes routes to the dev server
pub trait DevPlugin: Send + Sync {
    /// Unique identifier for this plugin
    fn id(&self) -> &str;

    /// Human-readable name
    fn name(&self) -> &str;

    /// Add this plugin's routes or services to `router`
    fn configure(&self, router: Router) -> Router;
}

/// Instantiate the plugin a descriptor names.
///
/// # Errors
/// Returns [`ConfigError::UnknownPlugin`] for names with no implementation.
pub fn plugin_for(descriptor: &PluginDescriptor) -> Result<Box<dyn DevPlugin>, ConfigError> {
    match descriptor.name.as_str() {
        SVELTEKIT_PLUGIN => Ok(Box::new(SvelteKitAssets::from_descriptor(descriptor))),
        other => Err(ConfigError::UnknownPlugin(other.to_string())),
    }
}

/// Serves a SvelteKit build directory, answering unknown paths with the
/// single-page-app fallback page.
#[derive(Debug, Clone)]
pub struct SvelteKitAssets {
    root: PathBuf,
    fallback: String,
}

impl SvelteKitAssets {
    pub fn new(root: impl Into<PathBuf>, fallback: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            fallback: fallback.into(),
        }
    }

    pub fn from_descriptor(descriptor: &PluginDescriptor) -> Self {
        Self::new(descriptor.root.clone(), descriptor.fallback.clone())
    }
}

impl DevPlugin for SvelteKitAssets {
    fn id(&self) -> &str {
        SVELTEKIT_PLUGIN
    }

    fn name(&self) -> &str {
        "SvelteKit"
    }

    fn configure(&self, router: Router) -> Router {
        if !self.root.is_dir() {
            tracing::warn!(
                "Asset directory {} not found; build the frontend first",
                self.root.display()
            );
            return router;
        }

        tracing::info!("Serving frontend assets from {}", self.root.display());
        let assets = ServeDir::new(&self.root).fallback(ServeFile::new(self.root.join(&self.fallback)));
        router.fallback_service(assets)
    }
}

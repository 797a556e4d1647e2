use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Name of the SvelteKit integration plugin
pub const SVELTEKIT_PLUGIN: &str = "sveltekit";

/// Plugins the dev server knows how to activate
pub const BUILTIN_PLUGINS: &[&str] = &[SVELTEKIT_PLUGIN];

/// A framework integration to activate in the dev server
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginDescriptor {
    /// Plugin identifier
    pub name: String,

    /// Directory holding the built frontend assets
    #[serde(default = "default_root")]
    pub root: PathBuf,

    /// Page served for paths with no matching asset
    #[serde(default = "default_fallback")]
    pub fallback: String,
}

fn default_root() -> PathBuf {
    PathBuf::from("build")
}

fn default_fallback() -> String {
    "index.html".to_string()
}

impl PluginDescriptor {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            root: default_root(),
            fallback: default_fallback(),
        }
    }

    /// The SvelteKit plugin with its default asset layout
    pub fn sveltekit() -> Self {
        Self::new(SVELTEKIT_PLUGIN)
    }

    pub fn is_builtin(&self) -> bool {
        BUILTIN_PLUGINS.contains(&self.name.as_str())
    }
}

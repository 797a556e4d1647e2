use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use axum::http::StatusCode;
use axum::{middleware, Router};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use wx_core::ResolvedConfig;

use crate::forward::{proxy_middleware, ProxyState};
use crate::plugin::{plugin_for, DevPlugin};

/// Development server: plugins behind the proxy middleware
pub struct DevServer {
    config: Arc<ResolvedConfig>,
    plugins: Vec<Box<dyn DevPlugin>>,
    proxy: Arc<ProxyState>,
}

impl DevServer {
    /// Create a server and register every plugin the configuration names
    pub fn new(config: ResolvedConfig) -> Result<Self> {
        let timeout = Duration::from_secs(config.server().proxy_timeout_secs);
        let proxy = ProxyState::new(config.proxy().clone(), timeout)?;
        let mut server = Self {
            config: Arc::new(config),
            plugins: Vec::new(),
            proxy: Arc::new(proxy),
        };

        let descriptors = server.config.plugins().to_vec();
        for descriptor in &descriptors {
            server.register_plugin(plugin_for(descriptor)?);
        }

        Ok(server)
    }

    /// Register a plugin with the server
    pub fn register_plugin(&mut self, plugin: Box<dyn DevPlugin>) {
        tracing::info!("Registering plugin: {}", plugin.name());
        self.plugins.push(plugin);
    }

    /// Build the router: plugin services, proxy middleware in front, tracing outermost
    pub fn router(&self) -> Router {
        let mut router = Router::new().fallback(not_found);
        for plugin in &self.plugins {
            tracing::debug!("Configuring plugin: {}", plugin.id());
            router = plugin.configure(router);
        }

        for (prefix, rule) in self.proxy.table().iter() {
            tracing::info!(
                "Proxy {} -> {}{}",
                prefix,
                rule.target,
                if rule.change_origin { " (changeOrigin)" } else { "" }
            );
        }

        router
            .layer(middleware::from_fn_with_state(
                self.proxy.clone(),
                proxy_middleware,
            ))
            .layer(TraceLayer::new_for_http())
    }

    /// Bind the configured address and serve until Ctrl-C
    pub async fn serve(self) -> Result<()> {
        let server = self.config.server();
        let listener = TcpListener::bind((server.host.as_str(), server.port))
            .await
            .with_context(|| format!("Could not bind {}:{}", server.host, server.port))?;

        self.serve_on(listener, shutdown_signal()).await
    }

    /// Serve on an already-bound listener until `shutdown` resolves
    pub async fn serve_on<F>(self, listener: TcpListener, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        tracing::info!("Dev server listening on http://{}", listener.local_addr()?);

        axum::serve(listener, self.router())
            .with_graceful_shutdown(shutdown)
            .await
            .context("Dev server failed")?;

        tracing::info!("Dev server stopped");
        Ok(())
    }

    pub fn config(&self) -> &ResolvedConfig {
        &self.config
    }

    pub fn plugins(&self) -> &[Box<dyn DevPlugin>] {
        &self.plugins
    }
}

async fn not_found() -> StatusCode {
    StatusCode::NOT_FOUND
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
}

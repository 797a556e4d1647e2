//! HTTP surface of the geocoding backend.
//!
//! Every path and method is answered by the same handler, so the dev server
//! can forward `/weather?...` (or anything else) here unchanged.

use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{
    extract::{RawQuery, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Router,
};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use wx_core::BackendConfig;

use crate::client::CensusGeocoder;
use crate::types::{GeocodeError, GeocodeQuery, LocateParams, QueryDefaults};

/// Shared, read-only state for backend handlers
#[derive(Debug, Clone)]
pub struct BackendState {
    pub geocoder: CensusGeocoder,
    pub defaults: QueryDefaults,
}

impl BackendState {
    pub fn from_config(config: &BackendConfig) -> Result<Self, GeocodeError> {
        Ok(Self {
            geocoder: CensusGeocoder::from_config(config)?,
            defaults: QueryDefaults::from(config),
        })
    }
}

/// Build the backend router
pub fn router(state: Arc<BackendState>) -> Router {
    Router::new()
        .fallback(locate)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

async fn locate(
    State(state): State<Arc<BackendState>>,
    RawQuery(raw): RawQuery,
) -> Result<String, GeocodeError> {
    let params = LocateParams::from_query(raw.as_deref().unwrap_or_default());
    let query = GeocodeQuery::from_params(params, &state.defaults)?;

    let message = match state.geocoder.locate(&query).await? {
        Some(coords) => format!(
            "Coordinates for '{}': Latitude: {:.6}, Longitude: {:.6}",
            query.address,
            coords.latitude(),
            coords.longitude()
        ),
        None => format!("No coordinates found for '{}'", query.address),
    };
    Ok(message)
}

impl GeocodeError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            GeocodeError::MissingAddress => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for GeocodeError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = ?self, "Geocode request failed");
        }
        (status, format!("{}\n", self)).into_response()
    }
}

/// Bind the configured address and serve until Ctrl-C
pub async fn serve(config: &BackendConfig) -> Result<()> {
    let state = BackendState::from_config(config).context("Failed to set up geocoder")?;
    let listener = TcpListener::bind((config.host.as_str(), config.port))
        .await
        .with_context(|| format!("Could not bind {}:{}", config.host, config.port))?;

    tracing::info!("Backend listening on {}", listener.local_addr()?);

    axum::serve(listener, router(Arc::new(state)))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Backend server failed")?;

    tracing::info!("Backend stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
}

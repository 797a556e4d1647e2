//! Forward geocoding: one-line US address to coordinates.
//! Uses the US Census Bureau geocoder - free, no API key required.

use crate::retry::{with_retry, RetryConfig};
use crate::types::{CensusResponse, Coordinates, GeocodeError, GeocodeQuery};
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;
use url::Url;
use wx_core::BackendConfig;

const USER_AGENT: &str = concat!("wx/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Clone)]
pub struct CensusGeocoder {
    client: Arc<Client>,
    endpoint: Url,
    retry: RetryConfig,
}

impl CensusGeocoder {
    pub fn new(endpoint: &str, timeout: Duration, retry: RetryConfig) -> Result<Self, GeocodeError> {
        let endpoint = Url::parse(endpoint)?;
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(GeocodeError::Client)?;

        Ok(Self {
            client: Arc::new(client),
            endpoint,
            retry,
        })
    }

    pub fn from_config(config: &BackendConfig) -> Result<Self, GeocodeError> {
        Self::new(
            &config.geocoder_url,
            Duration::from_secs(config.timeout_secs),
            RetryConfig::from(&config.retry),
        )
    }

    /// Full request URL for `query`
    pub fn request_url(&self, query: &GeocodeQuery) -> Url {
        let mut url = self.endpoint.clone();
        url.query_pairs_mut()
            .clear()
            .append_pair("address", &query.address)
            .append_pair("benchmark", &query.benchmark)
            .append_pair("format", &query.format);
        url
    }

    /// Look up `query`, returning the first match's coordinates.
    ///
    /// `Ok(None)` means the geocoder answered but found no match. The upstream
    /// status code is not inspected: whatever body comes back must decode as a
    /// geocoder response.
    pub async fn locate(&self, query: &GeocodeQuery) -> Result<Option<Coordinates>, GeocodeError> {
        let url = self.request_url(query);
        tracing::debug!("Geocoding request: {}", url);

        let response = with_retry(&self.retry, || self.client.get(url.clone()).send())
            .await
            .map_err(|e| {
                tracing::warn!("Geocoder unreachable: {}", e);
                GeocodeError::Connect(e)
            })?;

        let status = response.status();
        let body = response.bytes().await.map_err(|e| {
            tracing::warn!("Geocoder body read failed: {}", e);
            GeocodeError::Read(e)
        })?;

        let parsed: CensusResponse = serde_json::from_slice::<Option<CensusResponse>>(&body)
            .map_err(|e| {
                tracing::debug!("Geocoder returned {} with undecodable body: {}", status, e);
                GeocodeError::Parse(e)
            })?
            .unwrap_or_default();

        let coords = parsed.first_match();
        match coords {
            Some(c) => tracing::info!(
                "Geocoded '{}' to {:.6}, {:.6}",
                query.address,
                c.latitude(),
                c.longitude()
            ),
            None => tracing::info!("No match for '{}'", query.address),
        }
        Ok(coords)
    }
}

use serde::{Deserialize, Deserializer, Serialize};
use wx_core::BackendConfig;

/// Raw query parameters accepted by the backend
#[derive(Debug, Clone, Default)]
pub struct LocateParams {
    pub address: Option<String>,
    pub benchmark: Option<String>,
    pub format: Option<String>,
}

impl LocateParams {
    /// Parse a raw query string. A repeated key keeps its first value.
    pub fn from_query(raw: &str) -> Self {
        let mut params = Self::default();
        for (key, value) in url::form_urlencoded::parse(raw.as_bytes()) {
            let slot = match key.as_ref() {
                "address" => &mut params.address,
                "benchmark" => &mut params.benchmark,
                "format" => &mut params.format,
                _ => continue,
            };
            if slot.is_none() {
                *slot = Some(value.into_owned());
            }
        }
        params
    }
}

/// Values substituted for empty `benchmark` and `format` parameters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryDefaults {
    pub benchmark: String,
    pub format: String,
}

impl From<&BackendConfig> for QueryDefaults {
    fn from(config: &BackendConfig) -> Self {
        Self {
            benchmark: config.default_benchmark.clone(),
            format: config.default_format.clone(),
        }
    }
}

/// A one-line address lookup against the Census geocoder
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeocodeQuery {
    pub address: String,
    pub benchmark: String,
    pub format: String,
}

impl GeocodeQuery {
    /// Build a query from request parameters. Empty values count as missing.
    pub fn from_params(params: LocateParams, defaults: &QueryDefaults) -> Result<Self, GeocodeError> {
        let non_empty = |v: Option<String>| v.filter(|s| !s.is_empty());

        let address = non_empty(params.address).ok_or(GeocodeError::MissingAddress)?;

        Ok(Self {
            address,
            benchmark: non_empty(params.benchmark).unwrap_or_else(|| defaults.benchmark.clone()),
            format: non_empty(params.format).unwrap_or_else(|| defaults.format.clone()),
        })
    }
}

/// Geographic coordinates as the Census geocoder reports them
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Coordinates {
    /// Longitude
    #[serde(default, deserialize_with = "null_as_default")]
    pub x: f64,
    /// Latitude
    #[serde(default, deserialize_with = "null_as_default")]
    pub y: f64,
}

impl Coordinates {
    pub fn latitude(&self) -> f64 {
        self.y
    }

    pub fn longitude(&self) -> f64 {
        self.x
    }
}

/// JSON `null` decodes the same as an absent field.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Subset of the geocoder response we read
#[derive(Debug, Default, Deserialize)]
pub(crate) struct CensusResponse {
    #[serde(default, deserialize_with = "null_as_default")]
    pub result: CensusResult,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct CensusResult {
    #[serde(default, rename = "addressMatches", deserialize_with = "null_as_default")]
    pub address_matches: Vec<AddressMatch>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct AddressMatch {
    #[serde(default, deserialize_with = "null_as_default")]
    pub coordinates: Coordinates,
}

impl CensusResponse {
    pub fn first_match(&self) -> Option<Coordinates> {
        self.result.address_matches.first().map(|m| m.coordinates)
    }
}

/// Geocoding errors. The display text is what HTTP clients see.
#[derive(Debug, thiserror::Error)]
pub enum GeocodeError {
    #[error("Address parameter is missing")]
    MissingAddress,
    #[error("Failed to connect to geocoding API")]
    Connect(#[source] reqwest::Error),
    #[error("Failed to read response")]
    Read(#[source] reqwest::Error),
    #[error("Failed to parse JSON")]
    Parse(#[source] serde_json::Error),
    #[error("Invalid geocoder URL: {0}")]
    InvalidEndpoint(#[from] url::ParseError),
    #[error("Failed to build HTTP client: {0}")]
    Client(reqwest::Error),
}

//! Vehicle data HTTP client implementation

use std::fmt;
use std::time::Duration;

use mecar_core::Snapshot;
use reqwest::{Client, StatusCode};
use tracing::{debug, instrument};
use url::Url;

use crate::error::{ClientError, Result};

/// Production endpoint of the vehicle data API
pub const DEFAULT_BASE_URL: &str = "https://api.mercedes-benz.com/vehicledata/v2/";

/// Default request timeout
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
/// Default connection timeout
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Telemetry containers exposed by the vehicle data API
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Container {
    FuelStatus,
    ElectricVehicle,
    VehicleLockStatus,
    VehicleStatus,
}

impl Container {
    /// Path segment of the container
    pub fn path(self) -> &'static str {
        match self {
            Container::FuelStatus => "fuelstatus",
            Container::ElectricVehicle => "electricvehicle",
            Container::VehicleLockStatus => "vehiclelockstatus",
            Container::VehicleStatus => "vehiclestatus",
        }
    }

    /// Look up a container by its path segment
    pub fn from_path(path: &str) -> Option<Self> {
        [
            Container::FuelStatus,
            Container::ElectricVehicle,
            Container::VehicleLockStatus,
            Container::VehicleStatus,
        ]
        .into_iter()
        .find(|c| c.path() == path)
    }
}

impl fmt::Display for Container {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}

/// Vehicle data REST API client
///
/// Every request is bounded by the configured timeout so a hung call
/// cannot stall the caller indefinitely.
#[derive(Debug, Clone)]
pub struct MeClient {
    client: Client,
    base_url: Url,
}

impl MeClient {
    /// Create a new client without authentication
    ///
    /// # Arguments
    /// * `base_url` - Base URL of the API (e.g., "https://api.mercedes-benz.com/vehicledata/v2/")
    pub fn new(base_url: &str) -> Result<Self> {
        Self::with_config(base_url, DEFAULT_TIMEOUT, DEFAULT_CONNECT_TIMEOUT)
    }

    /// Create a new client with custom timeouts
    pub fn with_config(
        base_url: &str,
        timeout: Duration,
        connect_timeout: Duration,
    ) -> Result<Self> {
        Self::with_options(base_url, None, timeout, connect_timeout)
    }

    /// Create a new client that sends a bearer token with every request.
    pub fn with_bearer_token(base_url: &str, token: &str) -> Result<Self> {
        Self::with_options(
            base_url,
            Some(token),
            DEFAULT_TIMEOUT,
            DEFAULT_CONNECT_TIMEOUT,
        )
    }

    /// Create a new client with an optional bearer token and custom timeouts
    pub fn with_options(
        base_url: &str,
        token: Option<&str>,
        timeout: Duration,
        connect_timeout: Duration,
    ) -> Result<Self> {
        let mut builder = Client::builder()
            .timeout(timeout)
            .connect_timeout(connect_timeout);

        if let Some(token) = token {
            let mut headers = reqwest::header::HeaderMap::new();
            let header_value =
                reqwest::header::HeaderValue::from_str(&format!("Bearer {}", token))
                    .map_err(|e| ClientError::InvalidToken(e.to_string()))?;
            headers.insert(reqwest::header::AUTHORIZATION, header_value);
            builder = builder.default_headers(headers);
        }

        let client = builder.build()?;

        // Relative joins drop the last segment unless the base ends with '/'
        let base_url = if base_url.ends_with('/') {
            Url::parse(base_url)?
        } else {
            Url::parse(&format!("{}/", base_url))?
        };

        Ok(Self { client, base_url })
    }

    /// Get the base URL
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// URL of a container for a vehicle
    pub fn container_url(&self, vin: &str, container: Container) -> Result<Url> {
        Ok(self
            .base_url
            .join(&format!("vehicles/{}/containers/{}", vin, container.path()))?)
    }

    // =========================================================================
    // Container Reads
    // =========================================================================

    /// Fetch one telemetry container
    ///
    /// `204 No Content` means the vehicle has no data for this container and
    /// yields an empty snapshot.
    #[instrument(skip(self))]
    pub async fn container(&self, vin: &str, container: Container) -> Result<Snapshot> {
        let url = self.container_url(vin, container)?;
        debug!("Fetching {} from {}", container, url);

        let response = self.client.get(url).send().await?;
        self.handle_response(response).await
    }

    /// Fuel tank level and liquid range
    pub async fn fuel_status(&self, vin: &str) -> Result<Snapshot> {
        self.container(vin, Container::FuelStatus).await
    }

    /// State of charge and electric range
    pub async fn electro_status(&self, vin: &str) -> Result<Snapshot> {
        self.container(vin, Container::ElectricVehicle).await
    }

    /// Lock status of doors, deck lid and fuel flap
    pub async fn lock_status(&self, vin: &str) -> Result<Snapshot> {
        self.container(vin, Container::VehicleLockStatus).await
    }

    /// Doors, windows, sunroof and interior lights
    pub async fn vehicle_status(&self, vin: &str) -> Result<Snapshot> {
        self.container(vin, Container::VehicleStatus).await
    }

    // =========================================================================
    // Helper Methods
    // =========================================================================

    /// Handle response and deserialize the snapshot
    async fn handle_response(&self, response: reqwest::Response) -> Result<Snapshot> {
        let status = response.status();

        if status == StatusCode::NO_CONTENT {
            return Ok(Snapshot::default());
        }

        if status.is_success() {
            let bytes = response.bytes().await?;
            if bytes.is_empty() {
                return Ok(Snapshot::default());
            }
            serde_json::from_slice(&bytes).map_err(|e| ClientError::ParseError(e.to_string()))
        } else {
            Err(self.extract_error(response, status).await)
        }
    }

    /// Extract error from failed response, keeping whatever body came along
    async fn extract_error(&self, response: reqwest::Response, status: StatusCode) -> ClientError {
        let body = match response.text().await {
            Ok(text) if !text.trim().is_empty() => Some(
                serde_json::from_str::<serde_json::Value>(&text)
                    .unwrap_or(serde_json::Value::String(text)),
            ),
            _ => None,
        };

        ClientError::server_error(status.as_u16(), body)
    }
}

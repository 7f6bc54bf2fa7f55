//! VehicleBackend implementation over the REST client

use async_trait::async_trait;
use mecar_core::{ApiError, ApiResult, Snapshot, VehicleBackend};

use crate::client::MeClient;
use crate::error::ClientError;

impl From<ClientError> for ApiError {
    fn from(err: ClientError) -> Self {
        if err.is_timeout() {
            return ApiError::Timeout;
        }
        match err {
            ClientError::ServerError { status, body } => ApiError::http(status, body),
            ClientError::ParseError(msg) => ApiError::Malformed(msg),
            other => ApiError::Transport(other.to_string()),
        }
    }
}

#[async_trait]
impl VehicleBackend for MeClient {
    async fn fuel_status(&self, vin: &str) -> ApiResult<Snapshot> {
        Ok(MeClient::fuel_status(self, vin).await?)
    }

    async fn electro_status(&self, vin: &str) -> ApiResult<Snapshot> {
        Ok(MeClient::electro_status(self, vin).await?)
    }

    async fn lock_status(&self, vin: &str) -> ApiResult<Snapshot> {
        Ok(MeClient::lock_status(self, vin).await?)
    }

    async fn vehicle_status(&self, vin: &str) -> ApiResult<Snapshot> {
        Ok(MeClient::vehicle_status(self, vin).await?)
    }
}

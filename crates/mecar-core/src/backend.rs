//! VehicleBackend trait - the source of vehicle telemetry

use async_trait::async_trait;

use crate::error::ApiResult;
use crate::telemetry::Snapshot;

/// Source of vehicle telemetry, keyed by VIN.
///
/// Implemented by the vendor REST client and by test doubles. Every call
/// returns a (possibly empty) snapshot or an [`ApiError`].
///
/// [`ApiError`]: crate::error::ApiError
#[async_trait]
pub trait VehicleBackend: Send + Sync {
    /// Fuel tank level and liquid range
    async fn fuel_status(&self, vin: &str) -> ApiResult<Snapshot>;

    /// State of charge and electric range
    async fn electro_status(&self, vin: &str) -> ApiResult<Snapshot>;

    /// Door, deck lid and fuel flap lock status
    async fn lock_status(&self, vin: &str) -> ApiResult<Snapshot>;

    /// Doors, windows, sunroof and interior lights
    async fn vehicle_status(&self, vin: &str) -> ApiResult<Snapshot>;
}

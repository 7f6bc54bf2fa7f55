//! Per-vehicle poll loop
//!
//! A cycle fetches battery, lock and vehicle status in sequence and maps each
//! snapshot onto the services. Failures are classified and logged; the next
//! cycle is always scheduled one polling interval after the previous one
//! finished, so cycles of one vehicle never overlap.

use std::sync::Arc;

use mecar_core::{AccessoryError, ApiError, ErrorClass, VehicleBackend};
use thiserror::Error;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument};

use crate::config::{AccessoryConfig, BatterySource};
use crate::mapping;
use crate::services::CarServices;

/// Result of one poll cycle
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    Completed,
    Failed(ErrorClass),
}

#[derive(Debug, Error)]
enum CycleError {
    #[error(transparent)]
    Api(#[from] ApiError),

    #[error(transparent)]
    Accessory(#[from] AccessoryError),
}

impl CycleError {
    fn classify(&self) -> ErrorClass {
        match self {
            CycleError::Api(e) => e.classify(),
            CycleError::Accessory(e) => ErrorClass::Other(e.to_string()),
        }
    }
}

/// Drives the services of one vehicle from the vendor API
pub struct Poller {
    backend: Arc<dyn VehicleBackend>,
    config: AccessoryConfig,
    services: CarServices,
}

impl Poller {
    pub fn new(backend: Arc<dyn VehicleBackend>, config: AccessoryConfig, services: CarServices) -> Self {
        Self {
            backend,
            config,
            services,
        }
    }

    pub fn config(&self) -> &AccessoryConfig {
        &self.config
    }

    pub fn services(&self) -> &CarServices {
        &self.services
    }

    /// Run a single cycle; errors are logged, never returned
    #[instrument(skip(self), fields(vin = %self.config.vin))]
    pub async fn poll_once(&self) -> CycleOutcome {
        match self.refresh().await {
            Ok(()) => CycleOutcome::Completed,
            Err(err) => {
                let class = err.classify();
                error!(accessory = %self.config.display_name(), "An error occurred while polling the vehicle API");
                error!(accessory = %self.config.display_name(), error = %class, "Poll cycle failed");
                CycleOutcome::Failed(class)
            }
        }
    }

    async fn refresh(&self) -> Result<(), CycleError> {
        let vin = self.config.vin.as_str();
        let source = self.config.battery_source();

        let battery = match source {
            BatterySource::Fuel => self.backend.fuel_status(vin).await?,
            BatterySource::Electric => self.backend.electro_status(vin).await?,
        };
        debug!(?source, observed_at = ?battery.latest_observation(), snapshot = ?battery, "Battery status");
        let reading = mapping::battery_reading(&battery, source, self.config.max_range);
        self.services.apply_battery(&reading)?;

        let lock = self.backend.lock_status(vin).await?;
        debug!(observed_at = ?lock.latest_observation(), snapshot = ?lock, "Lock status");
        self.services.apply_lock(mapping::lock_state(&lock))?;

        let status = self.backend.vehicle_status(vin).await?;
        debug!(observed_at = ?status.latest_observation(), snapshot = ?status, "Vehicle status");
        self.services.apply_doors(mapping::door_state(&status))?;
        self.services.apply_windows(mapping::window_state(&status))?;
        self.services.apply_lights(mapping::lights_on(&status))?;

        Ok(())
    }

    /// Poll until `shutdown` is cancelled.
    ///
    /// Cancellation is honoured both between cycles and while a cycle is in
    /// flight; an interrupted cycle leaves already-applied values in place.
    pub async fn run(self, shutdown: CancellationToken) {
        let interval = self.config.polling_interval();
        info!(
            accessory = %self.config.display_name(),
            interval_ms = self.config.polling,
            "Starting poll loop"
        );

        loop {
            tokio::select! {
                biased;
                _ = shutdown.cancelled() => break,
                _ = self.poll_once() => {}
            }

            debug!(accessory = %self.config.display_name(), next_in_ms = self.config.polling, "Next poll scheduled");
            tokio::select! {
                biased;
                _ = shutdown.cancelled() => break,
                _ = tokio::time::sleep(interval) => {}
            }
        }

        info!(accessory = %self.config.display_name(), "Poll loop stopped");
    }

    /// Run the loop on a background task
    pub fn spawn(self, shutdown: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(self.run(shutdown))
    }
}
